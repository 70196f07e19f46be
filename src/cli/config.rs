use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use super::SettingsArgs;
use crate::config::{Settings, DEFAULT_API_URL, DEFAULT_CLICK_ID_COOKIE, DEFAULT_SESSION_COOKIE};

pub const CONFIG_FILENAME: &str = ".dub-component.toml";
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8787";

/// On-disk configuration; every key is optional and overridden by flags/env.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub session_cookie: Option<String>,
    #[serde(default)]
    pub click_id_cookie: Option<String>,
}

pub fn load_config_from_path(path: impl AsRef<Path>) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
    let config: FileConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.as_ref().display()))?;
    Ok(config)
}

/// Explicit `--config` must exist; the default file is optional.
fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    match explicit {
        Some(path) => load_config_from_path(path),
        None if Path::new(CONFIG_FILENAME).exists() => load_config_from_path(CONFIG_FILENAME),
        None => Ok(FileConfig::default()),
    }
}

/// Layer flags/env over the file config over built-in defaults.
pub fn merge_settings(file: FileConfig, args: &SettingsArgs) -> Settings {
    let pick = |flag: &Option<String>, file: Option<String>, default: &str| {
        flag.clone()
            .or(file)
            .unwrap_or_else(|| default.to_string())
    };

    Settings {
        api_key: pick(&args.api_key, file.api_key, ""),
        api_url: pick(&args.api_url, file.api_url, DEFAULT_API_URL),
        session_cookie: pick(&args.session_cookie, file.session_cookie, DEFAULT_SESSION_COOKIE),
        click_id_cookie: pick(
            &args.click_id_cookie,
            file.click_id_cookie,
            DEFAULT_CLICK_ID_COOKIE,
        ),
    }
}

pub fn resolve_settings(args: &SettingsArgs) -> Result<Settings> {
    let file = load_file_config(args.config.as_deref())?;
    let settings = merge_settings(file, args);
    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// API key with all but the last four characters masked.
pub fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
api_key = "dub_abc"
api_url = "https://api.example.com"
session_cookie = "sess"
click_id_cookie = "cid"
"#;
        let config: FileConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("dub_abc"));
        assert_eq!(config.api_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(config.session_cookie.as_deref(), Some("sess"));
        assert_eq!(config.click_id_cookie.as_deref(), Some("cid"));
    }

    #[test]
    fn test_load_config_not_found() {
        let result = load_config_from_path("/nonexistent/.dub-component.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = \"from_file\"").unwrap();

        let config = load_config_from_path(file.path()).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("from_file"));
        assert_eq!(config.api_url, None);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_key = ").unwrap();

        let err = load_config_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig {
            api_key: Some("file_key".into()),
            api_url: Some("https://file.example".into()),
            ..Default::default()
        };
        let args = SettingsArgs {
            api_key: Some("flag_key".into()),
            ..Default::default()
        };

        let settings = merge_settings(file, &args);
        assert_eq!(settings.api_key, "flag_key");
        assert_eq!(settings.api_url, "https://file.example");
        assert_eq!(settings.session_cookie, "mc_dub");
        assert_eq!(settings.click_id_cookie, "dub_id");
    }

    #[test]
    fn test_resolve_requires_api_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "api_url = \"https://api.dub.co\"").unwrap();
        let args = SettingsArgs {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        assert!(resolve_settings(&args).is_err());
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("dub_1234567"), "*******4567");
        assert_eq!(redact("abc"), "***");
    }
}
