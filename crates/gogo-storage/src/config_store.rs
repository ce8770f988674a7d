use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use gogo_core::{Configuration, GogoError, Variables};
use tracing::{debug, instrument};

use crate::{
    atomic::{self, Access},
    cipher::AuthenticatedCipher,
    key_provider::{KeyMaterial, KeyProvider},
};

/// File name of the configuration, both in the working directory and in the home directory.
pub const CONFIG_FILE_NAME: &str = ".gogo.yaml";

/// Where to look for the configuration file.
///
/// An explicit path wins; otherwise the working directory copy is preferred over the home one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocator {
    explicit: Option<PathBuf>,
    local: PathBuf,
    fallback: Option<PathBuf>,
}

impl ConfigLocator {
    /// Look in `current_dir`, then in `home_dir` when one is known.
    pub fn new(current_dir: impl AsRef<Path>, home_dir: Option<PathBuf>) -> Self {
        Self {
            explicit: None,
            local: current_dir.as_ref().join(CONFIG_FILE_NAME),
            fallback: home_dir.map(|home| home.join(CONFIG_FILE_NAME)),
        }
    }

    /// Replace the home fallback with a specific file.
    pub fn with_fallback(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback = Some(path.into());
        self
    }

    /// Use exactly this file and nothing else.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// The working-directory file, which `init` creates.
    pub fn local_path(&self) -> &Path {
        &self.local
    }

    pub fn locate(&self) -> Result<PathBuf, GogoError> {
        let candidates: Vec<&PathBuf> = match &self.explicit {
            Some(explicit) => vec![explicit],
            None => std::iter::once(&self.local)
                .chain(self.fallback.as_ref())
                .collect(),
        };

        if let Some(found) = candidates.iter().find(|path| path.is_file()) {
            debug!(path = %found.display(), "using configuration file");
            return Ok((*found).clone());
        }

        Err(GogoError::ConfigNotFound {
            searched: candidates
                .iter()
                .map(|path| path.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Result of `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

/// Write a bootstrap configuration for `environment` at `path` unless a file is already there.
pub fn init(path: &Path, environment: &str) -> Result<InitOutcome, GogoError> {
    if environment.is_empty() {
        return Err(GogoError::MissingEnvironment);
    }
    let body = to_yaml(&Configuration::bootstrap(environment))?;
    if atomic::write_new(path, body.as_bytes(), Access::Shared)? {
        Ok(InitOutcome::Created(path.to_path_buf()))
    } else {
        Ok(InitOutcome::AlreadyExists(path.to_path_buf()))
    }
}

/// A located `.gogo.yaml` plus the key provider needed to read and write encrypted values.
pub struct ConfigStore<P: KeyProvider> {
    path: PathBuf,
    keys: P,
}

impl<P: KeyProvider> ConfigStore<P> {
    pub fn new(path: impl Into<PathBuf>, keys: P) -> Self {
        Self {
            path: path.into(),
            keys,
        }
    }

    /// Locate the configuration file and bind a store to it.
    pub fn open(locator: &ConfigLocator, keys: P) -> Result<Self, GogoError> {
        Ok(Self::new(locator.locate()?, keys))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> &P {
        &self.keys
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Configuration, GogoError> {
        let contents = fs::read_to_string(&self.path).map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                GogoError::ConfigNotFound {
                    searched: self.path.display().to_string(),
                }
            } else {
                GogoError::io(format!("could not read {}", self.path.display()), err)
            }
        })?;

        if contents.trim().is_empty() {
            return Ok(Configuration::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| GogoError::ConfigParse {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize `config` and atomically replace the file.
    #[instrument(skip_all, fields(path = %self.path.display()))]
    pub fn save(&self, config: &Configuration) -> Result<(), GogoError> {
        let body = to_yaml(config)?;
        atomic::write_atomic(&self.path, body.as_bytes())?;
        debug!(values = config.value_count(), "configuration saved");
        Ok(())
    }

    /// Plaintext variables of `name`. Unknown environments yield an empty set.
    #[instrument(skip(self))]
    pub fn get_environment(&self, name: &str) -> Result<Variables, GogoError> {
        if name.is_empty() {
            return Err(GogoError::MissingEnvironment);
        }
        let config = self.load()?;
        let vars = config.envs.get(name).cloned().unwrap_or_default();
        if !config.encrypted || vars.is_empty() {
            return Ok(vars);
        }

        let cipher = AuthenticatedCipher::new(self.require_key()?.as_bytes())?;
        vars.into_iter()
            .map(|(name, blob)| cipher.decrypt(&blob).map(|value| (name, value)))
            .collect()
    }

    /// Add or replace `key` in `environment`, encrypting it when the store is encrypted.
    #[instrument(skip(self, value))]
    pub fn add_variable(
        &self,
        environment: &str,
        key: &str,
        value: &str,
    ) -> Result<(), GogoError> {
        if environment.is_empty() {
            return Err(GogoError::MissingEnvironment);
        }
        validate_variable_name(key)?;

        let mut config = self.load()?;
        let stored = if config.encrypted {
            AuthenticatedCipher::new(self.require_key()?.as_bytes())?.encrypt(value)?
        } else {
            value.to_string()
        };
        config
            .envs
            .entry(environment.to_string())
            .or_default()
            .insert(key.to_string(), stored);
        self.save(&config)
    }

    pub(crate) fn require_key(&self) -> Result<KeyMaterial, GogoError> {
        self.keys.load_key()?.ok_or(GogoError::PasswordNotConfigured)
    }
}

fn to_yaml(config: &Configuration) -> Result<String, GogoError> {
    serde_yaml::to_string(config)
        .map_err(|e| GogoError::configuration(format!("could not serialize configuration: {e}")))
}

fn validate_variable_name(name: &str) -> Result<(), GogoError> {
    let reason = if name.is_empty() {
        "variable name must not be empty"
    } else if name.contains('=') || name.contains('\0') {
        "variable name must not contain '=' or NUL"
    } else {
        return Ok(());
    };
    Err(GogoError::InvalidVariable {
        reason: reason.to_string(),
    })
}
