pub mod types;

use std::path::{Path, PathBuf};

use crate::error::{AzrgError, Result};
use types::Settings;

/// Load settings from the XDG config file and the process environment.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&config_path(), |key| std::env::var(key).ok())
}

/// Load settings from `path` (if it exists), then overlay `lookup`.
pub fn load_settings_from<F>(path: &Path, lookup: F) -> Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            AzrgError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?
    } else {
        Settings::default()
    };

    settings.apply_env(lookup);
    Ok(settings)
}

/// Return XDG config dir (~/.config/azrg-mcp/)
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("azrg-mcp")
}

/// Return the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use types::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("config.toml"), |_| None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.subscription_id, "");
        assert_eq!(settings.resource_manager_endpoint, DEFAULT_RESOURCE_MANAGER_ENDPOINT);
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "subscription_id = \"sub-file\"\napi_version = \"2022-10-01\"\n",
        )
        .unwrap();

        let settings = load_settings_from(&path, |_| None).unwrap();
        assert_eq!(settings.subscription_id, "sub-file");
        assert_eq!(settings.api_version, "2022-10-01");
        assert_eq!(settings.authority_host, DEFAULT_AUTHORITY_HOST);
    }

    #[test]
    fn environment_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "subscription_id = \"sub-file\"\n").unwrap();

        let vars = env(&[
            (ENV_SUBSCRIPTION_ID, "sub-123"),
            (ENV_RESOURCE_MANAGER_ENDPOINT, "https://management.usgovcloudapi.net/"),
        ]);
        let settings = load_settings_from(&path, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.subscription_id, "sub-123");
        assert_eq!(
            settings.resource_manager_endpoint,
            "https://management.usgovcloudapi.net/"
        );
    }

    #[test]
    fn empty_environment_value_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "subscription_id = \"sub-file\"\n").unwrap();

        let vars = env(&[(ENV_SUBSCRIPTION_ID, "")]);
        let settings = load_settings_from(&path, |k| vars.get(k).cloned()).unwrap();
        assert_eq!(settings.subscription_id, "sub-file");
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "subscription_id = [").unwrap();

        let err = load_settings_from(&path, |_| None).unwrap_err();
        assert!(matches!(err, AzrgError::Config(_)));
    }
}
