//! Configuration commands.

use std::path::Path;

use crate::config::{CalendarBackend, ClientConfig};
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
///
/// Secret references are printed as written, never resolved.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration, resolving credentials along the way.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.sync.validate().map_err(ClientError::Config)?;

    if let Some(ref outlook) = config.outlook {
        let provider = outlook
            .to_provider_config()
            .map_err(|e| ClientError::Config(format!("invalid [outlook] section: {}", e)))?;
        println!("Outlook credentials resolve ({}).", provider.token_path.display());
    }
    if let Some(ref google) = config.google {
        let provider = google
            .to_provider_config()
            .map_err(|e| ClientError::Config(format!("invalid [google] section: {}", e)))?;
        println!("Google credentials resolve ({}).", provider.token_path.display());
    }

    let configured = match config.calendar {
        CalendarBackend::Outlook => config.outlook.is_some(),
        CalendarBackend::Google => config.google.is_some(),
    };
    if configured {
        println!("Backend: {}", config.calendar);
    } else {
        println!(
            "Backend {} has no [{}] section; sync will not be able to run.",
            config.calendar, config.calendar
        );
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> ClientResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
