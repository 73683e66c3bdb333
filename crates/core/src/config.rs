//! Configuration for the KonataBlog client
//!
//! Settings are layered the same way everywhere: built-in defaults, then an
//! optional TOML/YAML file, then `KONATA_*` environment variables
//! (`KONATA_API__BASE_URL`, `KONATA_AUTH__VARIANT`, `KONATA_STATE_DIR`, ...).

use crate::CoreResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the persisted credential inside the state directory
pub const TOKEN_FILE_NAME: &str = "auth_token";

/// How the stored credential is rendered into the `Authorization` header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthVariant {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// `Authorization: <token>`
    Raw,
}

/// Top-level client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Backend API settings
    pub api: ApiSettings,

    /// Credential handling
    pub auth: AuthSettings,

    /// Degraded mode when the backend cannot be reached
    pub offline: OfflineSettings,

    /// Directory for persisted state (token, logs)
    pub state_dir: PathBuf,
}

/// Backend API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to
    pub base_url: String,

    /// Per-request deadline in seconds (0 disables the deadline)
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,
}

/// Credential handling settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Header rendering for the stored token
    #[serde(default)]
    pub variant: AuthVariant,

    /// Overrides the token location (defaults to `<state_dir>/auth_token`)
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

/// Offline fallback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineSettings {
    /// Serve canned demo responses when the backend is unreachable
    pub enabled: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            auth: AuthSettings::default(),
            offline: OfflineSettings::default(),
            state_dir: default_state_dir(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_secs: 30,
            user_agent: format!("konata-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for OfflineSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// State directory from `KONATA_STATE_DIR`, falling back to the platform data dir
pub fn default_state_dir() -> PathBuf {
    std::env::var("KONATA_STATE_DIR").map_or_else(
        |_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("konata")
        },
        PathBuf::from,
    )
}

impl ClientSettings {
    /// Load settings from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value fails to parse
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        let defaults = Self::default();
        let timeout_secs = i64::try_from(defaults.api.timeout_secs).unwrap_or(i64::MAX);

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.api.base_url)?
            .set_default("api.timeout_secs", timeout_secs)?
            .set_default("api.user_agent", defaults.api.user_agent)?
            .set_default("auth.variant", "bearer")?
            .set_default("offline.enabled", defaults.offline.enabled)?
            .set_default(
                "state_dir",
                defaults.state_dir.to_string_lossy().to_string(),
            )?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("KONATA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Location of the persisted credential
    pub fn token_path(&self) -> PathBuf {
        self.auth
            .token_file
            .clone()
            .unwrap_or_else(|| self.state_dir.join(TOKEN_FILE_NAME))
    }

    /// Per-request deadline, `None` when disabled
    pub const fn request_timeout(&self) -> Option<std::time::Duration> {
        match self.api.timeout_secs {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = ClientSettings::default();
        assert_eq!(settings.api.base_url, "http://localhost:8080/api");
        assert_eq!(settings.api.timeout_secs, 30);
        assert_eq!(settings.auth.variant, AuthVariant::Bearer);
        assert!(settings.offline.enabled);
        assert_eq!(
            settings.token_path(),
            settings.state_dir.join(TOKEN_FILE_NAME)
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
state_dir = "/tmp/konata-test"

[api]
base_url = "https://blog.example.com/api"
timeout_secs = 0

[auth]
variant = "raw"
token_file = "/tmp/konata-test/token"

[offline]
enabled = false
"#
        )
        .unwrap();

        let settings = ClientSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.api.base_url, "https://blog.example.com/api");
        assert_eq!(settings.auth.variant, AuthVariant::Raw);
        assert!(!settings.offline.enabled);
        assert!(settings.request_timeout().is_none());
        assert_eq!(
            settings.token_path(),
            PathBuf::from("/tmp/konata-test/token")
        );
    }

    #[test]
    fn test_request_timeout() {
        let settings = ClientSettings::default();
        assert_eq!(
            settings.request_timeout(),
            Some(std::time::Duration::from_secs(30))
        );
    }
}
