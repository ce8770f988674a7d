use std::{
    fmt, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use gogo_core::GogoError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, instrument};

use crate::{
    atomic::{self, Access},
    cipher::{AuthenticatedCipher, KEY_LEN},
};

/// File name of the password store inside the user's home directory.
pub const PASSWORD_FILE_NAME: &str = ".gogopasswd";
/// Filler used to pad passwords to the key length.
pub const DEFAULT_FILLER: &str = "x";
/// Application id mixed into the machine id so other tools do not derive the same identifier.
const APP_ID: &str = "gogo";

/// 256-bit key used to encrypt configuration values.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl KeyMaterial {
    /// Key for `raw_password`, right-padded with `filler` and cut to exactly 32 bytes.
    pub fn from_password(raw_password: &str, filler: &str) -> Result<Self, GogoError> {
        Self::from_bytes(&pad(raw_password.as_bytes(), filler.as_bytes(), KEY_LEN)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GogoError> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            GogoError::configuration(format!(
                "key must be exactly {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

// Never print key bytes.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

/// Result of a create-once password write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    /// A password was already stored; nothing was written.
    AlreadyExists,
}

/// Source of the key protecting configuration values (password file in production; memory in
/// tests).
pub trait KeyProvider {
    /// The configured key, or `None` when no password has been set up yet.
    fn load_key(&self) -> Result<Option<KeyMaterial>, GogoError>;

    /// Store a password for later use. Never replaces an existing one.
    fn save_password(&self, raw_password: &str) -> Result<SaveOutcome, GogoError>;
}

/// Stable per-host identifier used to wrap the stored password.
pub trait MachineIdentity {
    fn machine_identifier(&self) -> Result<[u8; KEY_LEN], GogoError>;
}

/// Host identity backed by the OS machine id (`/etc/machine-id`, `IOPlatformUUID`,
/// `MachineGuid`), scoped to this application with HMAC-SHA256.
#[derive(Debug, Clone)]
pub struct MachineUidIdentity {
    app_id: String,
}

impl MachineUidIdentity {
    pub fn new() -> Self {
        Self {
            app_id: APP_ID.to_string(),
        }
    }
}

impl Default for MachineUidIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineIdentity for MachineUidIdentity {
    fn machine_identifier(&self) -> Result<[u8; KEY_LEN], GogoError> {
        let machine_id = machine_uid::get().map_err(|e| GogoError::HostIdentity {
            reason: e.to_string(),
        })?;
        protect(machine_id.trim(), &self.app_id)
    }
}

/// First 32 hex characters of `HMAC-SHA256(key = machine_id, msg = app_id)`.
fn protect(machine_id: &str, app_id: &str) -> Result<[u8; KEY_LEN], GogoError> {
    if machine_id.is_empty() {
        return Err(GogoError::HostIdentity {
            reason: "machine id is empty".to_string(),
        });
    }
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(machine_id.as_bytes())
        .map_err(|e| GogoError::HostIdentity {
            reason: e.to_string(),
        })?;
    mac.update(app_id.as_bytes());
    let digest = hex::encode(mac.finalize().into_bytes());

    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(&digest.as_bytes()[..KEY_LEN]);
    Ok(out)
}

/// Fixed identity for tests and for callers that manage host binding themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedIdentity(pub [u8; KEY_LEN]);

impl MachineIdentity for FixedIdentity {
    fn machine_identifier(&self) -> Result<[u8; KEY_LEN], GogoError> {
        Ok(self.0)
    }
}

/// Password kept in a single file, encrypted under the machine identifier.
pub struct PasswordFile<I: MachineIdentity> {
    path: PathBuf,
    identity: I,
    filler: String,
}

impl<I: MachineIdentity> PasswordFile<I> {
    pub fn new(path: impl Into<PathBuf>, identity: I) -> Self {
        Self {
            path: path.into(),
            identity,
            filler: DEFAULT_FILLER.to_string(),
        }
    }

    pub fn with_filler(mut self, filler: impl Into<String>) -> Self {
        self.filler = filler.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, reason: impl fmt::Display) -> GogoError {
        GogoError::CorruptPasswordStore {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl<I: MachineIdentity> KeyProvider for PasswordFile<I> {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn load_key(&self) -> Result<Option<KeyMaterial>, GogoError> {
        let blob = match fs::read_to_string(&self.path) {
            Ok(blob) => blob,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no password file");
                return Ok(None);
            }
            Err(err) => {
                return Err(GogoError::io(
                    format!("could not read {}", self.path.display()),
                    err,
                ))
            }
        };

        // The stored password is raw key bytes; truncation may have split a UTF-8 sequence.
        let machine_key = self.identity.machine_identifier()?;
        let padded = AuthenticatedCipher::new(&machine_key)?
            .decrypt_bytes(&blob)
            .map_err(|e| self.corrupt(e))?;
        let key = KeyMaterial::from_bytes(&padded).map_err(|e| self.corrupt(e))?;
        Ok(Some(key))
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn save_password(&self, raw_password: &str) -> Result<SaveOutcome, GogoError> {
        if self.path.exists() {
            debug!("password file already present, leaving it untouched");
            return Ok(SaveOutcome::AlreadyExists);
        }

        let key = KeyMaterial::from_password(raw_password, &self.filler)?;
        let machine_key = self.identity.machine_identifier()?;
        let blob = AuthenticatedCipher::new(&machine_key)?.encrypt_bytes(key.as_bytes())?;
        if atomic::write_new(&self.path, blob.as_bytes(), Access::Private)? {
            debug!("password file created");
            Ok(SaveOutcome::Created)
        } else {
            Ok(SaveOutcome::AlreadyExists)
        }
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
}

impl InMemoryKeyProvider {
    /// Provider that already holds `raw_password` (padded with the default filler).
    pub fn with_password(raw_password: &str) -> Result<Self, GogoError> {
        let provider = Self::default();
        provider.save_password(raw_password)?;
        Ok(provider)
    }
}

impl KeyProvider for InMemoryKeyProvider {
    fn load_key(&self) -> Result<Option<KeyMaterial>, GogoError> {
        let guard = self
            .inner
            .lock()
            .map_err(|err| GogoError::configuration(format!("lock poisoned: {err}")))?;
        Ok(guard.clone())
    }

    fn save_password(&self, raw_password: &str) -> Result<SaveOutcome, GogoError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| GogoError::configuration(format!("lock poisoned: {err}")))?;
        if guard.is_some() {
            return Ok(SaveOutcome::AlreadyExists);
        }
        *guard = Some(KeyMaterial::from_password(raw_password, DEFAULT_FILLER)?);
        Ok(SaveOutcome::Created)
    }
}

/// Right-pad `input` with repetitions of `filler`, then cut to exactly `len` bytes.
///
/// Inputs of `len` bytes or more are truncated, so two long passwords sharing a prefix map to the
/// same key. The cut may fall inside a multi-byte character.
pub fn pad(input: &[u8], filler: &[u8], len: usize) -> Result<Vec<u8>, GogoError> {
    if filler.is_empty() {
        return Err(GogoError::configuration("padding filler must not be empty"));
    }
    Ok(input
        .iter()
        .chain(filler.iter().cycle())
        .take(len)
        .copied()
        .collect())
}
