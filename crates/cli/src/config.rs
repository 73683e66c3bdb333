//! CLI configuration utilities

use anyhow::{Context, Result};
use konata_core::ClientSettings;
use std::path::{Path, PathBuf};

/// Load layered settings and apply command-line overrides
pub fn load_settings(
    path: Option<&Path>,
    state_dir: Option<PathBuf>,
    no_fallback: bool,
) -> Result<ClientSettings> {
    let mut settings = ClientSettings::load(path).with_context(|| match path {
        Some(path) => format!("loading settings from {}", path.display()),
        None => "loading settings".to_string(),
    })?;

    if let Some(state_dir) = state_dir {
        settings.state_dir = state_dir;
    }
    if no_fallback {
        settings.offline.enabled = false;
    }

    Ok(settings)
}

/// Effective settings rendered as TOML
pub fn render_settings(settings: &ClientSettings) -> Result<String> {
    toml::to_string_pretty(settings).context("rendering settings")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_win_over_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "state_dir = \"/from/file\"\n[api]\nbase_url = \"https://blog.example.com/api\"\n[offline]\nenabled = true"
        )
        .unwrap();

        let settings =
            load_settings(Some(file.path()), Some(PathBuf::from("/from/flag")), true).unwrap();

        assert_eq!(settings.api.base_url, "https://blog.example.com/api");
        assert_eq!(settings.state_dir, PathBuf::from("/from/flag"));
        assert!(!settings.offline.enabled);
        assert_eq!(
            settings.token_path(),
            PathBuf::from("/from/flag").join("auth_token")
        );
    }

    #[test]
    fn test_render_settings_is_valid_toml() {
        let settings = ClientSettings::default();
        let rendered = render_settings(&settings).unwrap();
        assert!(rendered.contains("base_url = \"http://localhost:8080/api\""));
        assert!(rendered.contains("[offline]"));
    }
}
