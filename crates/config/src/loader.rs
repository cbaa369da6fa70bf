use std::path::{Path, PathBuf};

use {secrecy::Secret, tracing::debug};

use crate::{
    env_subst::substitute_env,
    error::{Error, Result},
    schema::SlackntellConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "slackntell.toml",
    "slackntell.yaml",
    "slackntell.yml",
    "slackntell.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<SlackntellConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load config from `explicit` when given, otherwise from the standard
/// locations, then apply `SLACKNTELL_*` environment overrides.
///
/// Search order without an explicit path:
/// 1. `./slackntell.{toml,yaml,yml,json}`
/// 2. `~/.config/slackntell/slackntell.{toml,yaml,yml,json}`
///
/// A missing file yields the defaults; a file that fails to parse is an error.
pub fn load(explicit: Option<&Path>) -> Result<SlackntellConfig> {
    let mut config = match explicit.map(Path::to_path_buf).or_else(find_config_file) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found, using defaults");
            SlackntellConfig::default()
        },
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/slackntell/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "slackntell").map(|d| d.config_dir().to_path_buf())
}

/// Overlay `SLACKNTELL_*` environment variables onto `config`.
pub fn apply_env_overrides(config: &mut SlackntellConfig) -> Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

fn apply_env_overrides_with(
    config: &mut SlackntellConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(v) = lookup("SLACKNTELL_SLACK_TOKEN") {
        config.slack.token = Secret::new(v);
    }
    if let Some(v) = lookup("SLACKNTELL_SLACK_APP_TOKEN") {
        config.slack.app_token = Secret::new(v);
    }
    if let Some(v) = lookup("SLACKNTELL_SELF_USER_ID") {
        config.slack.self_user_id = Some(v).filter(|s| !s.trim().is_empty());
    }
    if let Some(v) = lookup("SLACKNTELL_SMTP_HOST") {
        config.smtp.host = v;
    }
    if let Some(v) = lookup("SLACKNTELL_SMTP_PORT") {
        config.smtp.port = v.trim().parse().map_err(|_| Error::InvalidEnv {
            name: "SLACKNTELL_SMTP_PORT".into(),
            value: v.clone(),
        })?;
    }
    if let Some(v) = lookup("SLACKNTELL_SMTP_USERNAME") {
        config.smtp.username = v;
    }
    if let Some(v) = lookup("SLACKNTELL_SMTP_PASSWORD") {
        config.smtp.password = Secret::new(v);
    }
    if let Some(v) = lookup("SLACKNTELL_SMTP_FROM") {
        config.smtp.from = v;
    }
    if let Some(v) = lookup("SLACKNTELL_SMTP_TO") {
        config.smtp.to = v;
    }
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> Result<SlackntellConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => Err(Error::UnsupportedFormat {
            extension: ext.into(),
        }),
    }
}
