//! Command execution against a `StitchClient`

use anyhow::{Context, Result};
use serde_json::{Value, json};
use stitch_client::{AuthInfo, StitchClient};
use tracing::info;

use crate::cli::Commands;

/// Run one command and return what should be printed.
pub async fn run(client: &StitchClient, command: Commands) -> Result<Value> {
    match command {
        Commands::Login { provider } => {
            let credential = provider.into_credential();
            let provider = credential.provider_type();
            let info = client
                .login(credential)
                .await
                .with_context(|| format!("login with {provider} failed"))?;
            Ok(summary(&info))
        }
        Commands::Call { name, arguments } => {
            let arguments = arguments.map(|a| a.0).unwrap_or_default();
            info!(function = %name, arguments = arguments.len(), "calling function");
            client
                .call_function_raw(&name, &arguments)
                .await
                .with_context(|| format!("function {name} failed"))
        }
        Commands::WhoAmI => Ok(client
            .current_auth_info()
            .await
            .map_or_else(logged_out, |info| summary(&info))),
        Commands::Logout => {
            client.logout().await;
            Ok(logged_out())
        }
    }
}

/// Who is logged in. Tokens are never printed.
fn summary(info: &AuthInfo) -> Value {
    json!({
        "logged_in": true,
        "user_id": info.user_id,
        "device_id": info.device_id,
        "provider": info.logged_in_provider_name,
        "profile": info.user_profile,
    })
}

fn logged_out() -> Value {
    json!({ "logged_in": false })
}
