//! Command-line definition

use clap::{Parser, Subcommand};
use serde_json::Value;
use stitch_client::Credential;

/// Top-level command line.
#[derive(Debug, Parser)]
#[command(name = "stitch-cli")]
#[command(about = "Command-line client for a Stitch app")]
#[command(version)]
pub struct Cli {
    /// Path to the client configuration file
    #[arg(long, global = true, env = "STITCH_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in, replacing any current session
    Login {
        #[command(subcommand)]
        provider: LoginProvider,
    },

    /// Call a server-side function
    Call {
        /// Function name
        name: String,

        /// JSON arguments: an array is the argument list, any other value
        /// is the single argument
        #[arg(value_parser = parse_arguments)]
        arguments: Option<FunctionArguments>,
    },

    /// Show the logged-in user
    #[command(name = "whoami")]
    WhoAmI,

    /// End the session
    Logout,
}

#[derive(Debug, Subcommand)]
pub enum LoginProvider {
    /// Anonymous user; reuses the current session if there is one
    Anon,

    /// Email/password user
    Userpass { username: String, password: String },

    /// User API key
    ApiKey { key: String },

    /// Server API key
    ServerApiKey { key: String },
}

impl LoginProvider {
    pub fn into_credential(self) -> Credential {
        match self {
            LoginProvider::Anon => Credential::Anonymous,
            LoginProvider::Userpass { username, password } => Credential::UserPassword {
                username,
                password: password.into(),
            },
            LoginProvider::ApiKey { key } => Credential::UserApiKey { key: key.into() },
            LoginProvider::ServerApiKey { key } => Credential::ServerApiKey { key: key.into() },
        }
    }
}

/// Parsed function arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArguments(pub Vec<Value>);

fn parse_arguments(raw: &str) -> Result<FunctionArguments, String> {
    let parsed: Value = serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    Ok(FunctionArguments(match parsed {
        Value::Array(arguments) => arguments,
        single => vec![single],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("stitch-cli").chain(args.iter().copied()))
    }

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_is_accepted_after_the_subcommand() {
        let cli = parse(&["whoami", "--config", "/etc/stitch.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/stitch.toml"));
        assert!(matches!(cli.command, Commands::WhoAmI));
    }

    #[test]
    fn login_providers_map_to_credentials() {
        let cli = parse(&["login", "userpass", "ada@example.com", "hunter2"]).unwrap();
        let Commands::Login { provider } = cli.command else {
            panic!("expected login, got {:?}", cli.command);
        };
        match provider.into_credential() {
            Credential::UserPassword { username, password } => {
                assert_eq!(username, "ada@example.com");
                assert_eq!(password.expose(), "hunter2");
            }
            other => panic!("unexpected credential: {other:?}"),
        }

        let cli = parse(&["login", "server-api-key", "k"]).unwrap();
        let Commands::Login { provider } = cli.command else {
            panic!("expected login, got {:?}", cli.command);
        };
        assert!(matches!(
            provider.into_credential(),
            Credential::ServerApiKey { .. }
        ));
    }

    #[test]
    fn call_arguments_accept_array_or_single_value() {
        match parse(&["call", "sum", "[1,2]"]).unwrap().command {
            Commands::Call { name, arguments } => {
                assert_eq!(name, "sum");
                assert_eq!(arguments, Some(FunctionArguments(vec![json!(1), json!(2)])));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        match parse(&["call", "echo", r#"{"a":1}"#]).unwrap().command {
            Commands::Call { arguments, .. } => {
                assert_eq!(arguments, Some(FunctionArguments(vec![json!({"a": 1})])));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        match parse(&["call", "ping"]).unwrap().command {
            Commands::Call { arguments, .. } => assert!(arguments.is_none()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_command_lines() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
        assert!(parse(&["login", "userpass", "ada"]).is_err());
        assert!(parse(&["login", "github"]).is_err());
        assert!(parse(&["call", "sum", "[1,"]).is_err());
    }
}
