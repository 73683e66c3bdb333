use anyhow::Result;
use konata_core::tracing::{InstrumentationConfig, init_tracing};
use std::io::IsTerminal;
use std::path::Path;
use tracing::Level;

/// Log file written inside the state directory
const LOG_FILE_NAME: &str = "konata.log";

/// Initialize logging for the CLI
pub fn init_logging(level: Option<Level>, state_dir: &Path, no_file_log: bool) -> Result<()> {
    let config = instrumentation_config(level, state_dir, no_file_log);
    init_tracing(&config)
}

fn instrumentation_config(
    level: Option<Level>,
    state_dir: &Path,
    no_file_log: bool,
) -> InstrumentationConfig {
    let mut config = InstrumentationConfig::from_env();

    if let Some(level) = level {
        config.log_level = level.as_str().to_lowercase();
    }

    if no_file_log {
        config.log_file = None;
    } else if config.log_file.is_none() {
        config.log_file = Some(state_dir.join(LOG_FILE_NAME));
    }

    config.ansi = std::io::stderr().is_terminal();
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_level_and_state_dir_log_file() {
        let config = instrumentation_config(Some(Level::DEBUG), Path::new("/tmp/konata"), false);
        assert_eq!(config.log_level, "debug");
        if std::env::var_os("KONATA_LOG_FILE").is_none() {
            assert_eq!(
                config.log_file.as_deref(),
                Some(Path::new("/tmp/konata/konata.log"))
            );
        }
    }

    #[test]
    fn test_no_file_log_disables_file_output() {
        let config = instrumentation_config(None, Path::new("/tmp/konata"), true);
        assert!(config.log_file.is_none());
    }
}
