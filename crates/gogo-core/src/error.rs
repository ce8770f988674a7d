use thiserror::Error;

/// Errors produced while loading, decrypting or persisting gogo configuration.
///
/// Every variant is recoverable: callers report it and carry on (or exit non-zero).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GogoError {
    /// Neither the local nor the home configuration file exists.
    #[error("could not find any .gogo.yaml (searched {searched})")]
    ConfigNotFound { searched: String },
    /// The configuration file exists but is not valid YAML of the expected shape.
    #[error("could not parse {path}: {reason}")]
    ConfigParse { path: String, reason: String },
    /// An operation needed an environment name and got an empty one.
    #[error("environment required")]
    MissingEnvironment,
    #[error("invalid variable: {reason}")]
    InvalidVariable { reason: String },
    /// Bad key length, empty padding filler and similar setup mistakes.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },
    /// The password file could not be opened with this machine's identity.
    #[error("password store {path} is corrupt or was created on another machine: {reason}")]
    CorruptPasswordStore { path: String, reason: String },
    /// Wrong key, tampered ciphertext or malformed ciphertext.
    #[error("authentication failed: {reason}")]
    AuthenticationFailure { reason: String },
    #[error("no password configured; run `gogo --encrypt` to set one")]
    PasswordNotConfigured,
    #[error("could not read machine id: {reason}")]
    HostIdentity { reason: String },
    #[error("{context}: {reason}")]
    Io { context: String, reason: String },
}

impl GogoError {
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn authentication(reason: impl Into<String>) -> Self {
        Self::AuthenticationFailure {
            reason: reason.into(),
        }
    }

    /// Wrap an I/O failure with a short description of what was being attempted.
    pub fn io<E: ToString>(context: impl Into<String>, err: E) -> Self {
        Self::Io {
            context: context.into(),
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for GogoError {
    fn from(err: std::io::Error) -> Self {
        Self::io("i/o error", err)
    }
}
