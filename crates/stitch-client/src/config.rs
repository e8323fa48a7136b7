//! Client configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! `STITCH_BASE_URL` and `STITCH_APP_ID` override the file so one config can
//! be pointed at another deployment without editing it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use stitch_auth::{FileStorage, MemoryStorage, SessionFields, Storage};

/// Root configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Deployment root, e.g. `https://stitch.mongodb.com`.
    pub base_url: String,
    pub client_app_id: String,
    /// Applied to every request that does not set its own timeout.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    /// Where the session is persisted. In-memory when absent.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
    #[serde(default)]
    pub device: DeviceConfig,
    /// Field names read from the session renewal response.
    #[serde(default)]
    pub session_fields: SessionFields,
    #[serde(default)]
    pub proactive_refresh: ProactiveRefreshConfig,
}

/// Device details reported with every login.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceConfig {
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub platform_version: Option<String>,
}

/// Background renewal of access tokens that are about to expire
#[derive(Debug, Clone, Deserialize)]
pub struct ProactiveRefreshConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_refresh_interval")]
    pub interval_secs: u64,
    /// Renew when the access token expires within this many seconds.
    #[serde(default = "default_refresh_threshold")]
    pub threshold_secs: u64,
}

impl Default for ProactiveRefreshConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            interval_secs: default_refresh_interval(),
            threshold_secs: default_refresh_threshold(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_refresh_threshold() -> u64 {
    300
}

impl ClientConfig {
    /// Configuration with defaults for everything but the deployment and app.
    pub fn new(base_url: impl Into<String>, client_app_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_app_id: client_app_id.into(),
            request_timeout_secs: default_timeout(),
            storage_path: None,
            device: DeviceConfig::default(),
            session_fields: SessionFields::default(),
            proactive_refresh: ProactiveRefreshConfig::default(),
        }
    }

    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ClientConfig = toml::from_str(&contents)?;

        if let Ok(base_url) = std::env::var("STITCH_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(app_id) = std::env::var("STITCH_APP_ID") {
            config.client_app_id = app_id;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check field values the type system cannot.
    pub fn validate(&self) -> common::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.client_app_id.trim().is_empty() {
            return Err(common::Error::Config(
                "client_app_id must not be empty".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(common::Error::Config(
                "request_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.proactive_refresh.enabled && self.proactive_refresh.interval_secs == 0 {
            return Err(common::Error::Config(
                "proactive_refresh.interval_secs must be greater than 0".into(),
            ));
        }

        for (name, value) in [
            ("session_fields.access_token", &self.session_fields.access_token),
            ("session_fields.refresh_token", &self.session_fields.refresh_token),
        ] {
            if value.is_empty() {
                return Err(common::Error::Config(format!("{name} must not be empty")));
            }
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Storage selected by `storage_path`.
    pub fn storage(&self) -> Arc<dyn Storage> {
        match &self.storage_path {
            Some(path) => Arc::new(FileStorage::new(path)),
            None => Arc::new(MemoryStorage::new()),
        }
    }

    /// Resolve config file path from CLI arg or STITCH_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("STITCH_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("stitch.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn clear_overrides() {
        unsafe {
            remove_env("STITCH_BASE_URL");
            remove_env("STITCH_APP_ID");
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("stitch.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn minimal_toml() -> &'static str {
        r#"
base_url = "https://stitch.mongodb.com"
client_app_id = "todo-abcde"
"#
    }

    #[test]
    fn test_load_minimal_config_applies_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, minimal_toml());

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "https://stitch.mongodb.com");
        assert_eq!(config.client_app_id, "todo-abcde");
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert!(config.storage_path.is_none());
        assert_eq!(config.session_fields, SessionFields::default());
        assert!(config.proactive_refresh.enabled);
        assert_eq!(config.proactive_refresh.interval_secs, 60);
        assert_eq!(config.proactive_refresh.threshold_secs, 300);
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
base_url = "http://localhost:9090"
client_app_id = "todo-abcde"
request_timeout_secs = 15
storage_path = "/var/lib/stitch/session.json"

[device]
app_version = "2.1.0"
platform = "linux"

[session_fields]
access_token = "accessToken"
refresh_token = "refreshToken"

[proactive_refresh]
enabled = false
threshold_secs = 120
"#,
        );

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(
            config.storage_path.as_deref(),
            Some(Path::new("/var/lib/stitch/session.json"))
        );
        assert_eq!(config.device.app_version.as_deref(), Some("2.1.0"));
        assert_eq!(config.device.platform.as_deref(), Some("linux"));
        assert!(config.device.platform_version.is_none());
        assert_eq!(config.session_fields.access_token, "accessToken");
        assert_eq!(config.session_fields.refresh_token, "refreshToken");
        assert!(!config.proactive_refresh.enabled);
        assert_eq!(config.proactive_refresh.interval_secs, 60);
        assert_eq!(config.proactive_refresh.threshold_secs, 120);
    }

    #[test]
    fn test_load_missing_file() {
        let result = ClientConfig::load(Path::new("/nonexistent/path/stitch.toml"));
        assert!(matches!(result, Err(common::Error::Io(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        let result = ClientConfig::load(&path);
        assert!(matches!(result, Err(common::Error::Toml(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, minimal_toml());

        unsafe {
            set_env("STITCH_BASE_URL", "http://127.0.0.1:8080");
            set_env("STITCH_APP_ID", "staging-xyz");
        }
        let config = ClientConfig::load(&path).unwrap();
        clear_overrides();

        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.client_app_id, "staging-xyz");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        clear_overrides();
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
base_url = "stitch.mongodb.com"
client_app_id = "todo-abcde"
"#,
        );

        let err = ClientConfig::load(&path).unwrap_err().to_string();
        assert!(
            err.contains("base_url must start with http"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_empty_app_id_rejected() {
        let config = ClientConfig::new("https://stitch.mongodb.com", " ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ClientConfig::new("https://stitch.mongodb.com", "todo-abcde");
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err(), "request_timeout_secs = 0 must be rejected");
    }

    #[test]
    fn test_zero_refresh_interval_rejected_only_when_enabled() {
        let mut config = ClientConfig::new("https://stitch.mongodb.com", "todo-abcde");
        config.proactive_refresh.interval_secs = 0;
        assert!(config.validate().is_err());

        config.proactive_refresh.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_session_field_rejected() {
        let mut config = ClientConfig::new("https://stitch.mongodb.com", "todo-abcde");
        config.session_fields.access_token = String::new();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("session_fields.access_token"), "got: {err}");
    }

    #[test]
    fn test_storage_follows_storage_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::new("https://stitch.mongodb.com", "todo-abcde");
        config.storage_path = Some(dir.path().join("session.json"));

        let storage = config.storage();
        assert!(storage.load().unwrap().is_none());
        storage.clear().unwrap();
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = ClientConfig::resolve_path(Some("/custom/stitch.toml"));
        assert_eq!(path, PathBuf::from("/custom/stitch.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("STITCH_CONFIG", "/env/stitch.toml") };
        let path = ClientConfig::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/stitch.toml"));
        unsafe { remove_env("STITCH_CONFIG") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("STITCH_CONFIG") };
        let path = ClientConfig::resolve_path(None);
        assert_eq!(path, PathBuf::from("stitch.toml"));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("STITCH_CONFIG", "/env/should-lose.toml") };
        let path = ClientConfig::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over STITCH_CONFIG env var"
        );
        unsafe { remove_env("STITCH_CONFIG") };
    }
}
