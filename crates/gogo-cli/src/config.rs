use std::{
    env, fs,
    path::{Path, PathBuf},
};

use color_eyre::{eyre::WrapErr, Result};
use dirs::{config_dir, home_dir};
use gogo_storage::{ConfigLocator, PASSWORD_FILE_NAME};
use serde::{Deserialize, Serialize};

/// Overrides the configuration file; no search happens when set.
pub const CONFIG_ENV: &str = "GOGO_CONFIG";
/// Overrides the password file location.
pub const PASSWORD_FILE_ENV: &str = "GOGO_PASSWORD_FILE";

/// User-level settings loaded from `~/.config/gogo/settings.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Settings {
    /// Where the encrypted password is kept (default `~/.gogopasswd`).
    pub password_file: Option<PathBuf>,
    /// Fallback configuration used when the working directory has none (default `~/.gogo.yaml`).
    pub home_config: Option<PathBuf>,
    /// Character(s) used to pad passwords to 32 bytes (default `x`).
    pub filler: Option<String>,
}

/// Load settings from the default path; if missing, return defaults.
pub fn load() -> Result<Settings> {
    match default_path() {
        Some(path) => load_from_path(path),
        None => Ok(Settings::default()),
    }
}

/// Load settings from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = fs::read_to_string(path)
        .wrap_err_with(|| format!("could not read {}", path.display()))?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings =
        toml::from_str(&contents).wrap_err_with(|| format!("could not parse {}", path.display()))?;
    Ok(settings)
}

/// Resolve the default settings path (platform aware).
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("gogo").join("settings.toml"))
}

/// Concrete file locations for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub locator: ConfigLocator,
    pub password_file: PathBuf,
}

/// Resolve file locations from the process environment.
pub fn resolve(settings: &Settings) -> Result<Paths> {
    let current_dir = env::current_dir().wrap_err("could not get current folder")?;
    let overrides = Overrides {
        config: env::var_os(CONFIG_ENV).map(PathBuf::from),
        password_file: env::var_os(PASSWORD_FILE_ENV).map(PathBuf::from),
    };
    resolve_with(settings, &current_dir, home_dir(), overrides)
}

#[derive(Debug, Default)]
struct Overrides {
    config: Option<PathBuf>,
    password_file: Option<PathBuf>,
}

fn resolve_with(
    settings: &Settings,
    current_dir: &Path,
    home: Option<PathBuf>,
    overrides: Overrides,
) -> Result<Paths> {
    let password_file = match overrides
        .password_file
        .or_else(|| settings.password_file.clone())
    {
        Some(path) => path,
        None => home
            .as_ref()
            .map(|home| home.join(PASSWORD_FILE_NAME))
            .ok_or_else(|| color_eyre::eyre::eyre!("could not determine home directory"))?,
    };

    let mut locator = ConfigLocator::new(current_dir, home);
    if let Some(fallback) = &settings.home_config {
        locator = locator.with_fallback(fallback);
    }
    if let Some(explicit) = overrides.config {
        locator = locator.with_explicit(explicit);
    }

    Ok(Paths {
        locator,
        password_file,
    })
}
