//! Bulk moves between plaintext and encrypted configurations.
//!
//! The new configuration is built completely in memory and written with a single atomic save,
//! so a failure on any value leaves the file exactly as it was.

use gogo_core::{Configuration, EncryptionState, GogoError, Transition, Variables};
use tracing::{info, instrument};

use crate::{
    cipher::AuthenticatedCipher,
    config_store::ConfigStore,
    key_provider::{KeyMaterial, KeyProvider},
};

/// Encrypted copy of a plaintext configuration.
pub fn encrypt_configuration(
    config: &Configuration,
    key: &KeyMaterial,
) -> Result<Configuration, GogoError> {
    if config.encrypted {
        return Err(GogoError::configuration("configuration is already encrypted"));
    }
    let cipher = AuthenticatedCipher::new(key.as_bytes())?;
    map_values(config, true, |value| cipher.encrypt(value))
}

/// Plaintext copy of an encrypted configuration. Fails on the first value that does not open.
pub fn decrypt_configuration(
    config: &Configuration,
    key: &KeyMaterial,
) -> Result<Configuration, GogoError> {
    if !config.encrypted {
        return Err(GogoError::configuration("configuration is not encrypted"));
    }
    let cipher = AuthenticatedCipher::new(key.as_bytes())?;
    map_values(config, false, |value| cipher.decrypt(value))
}

fn map_values<F>(config: &Configuration, encrypted: bool, f: F) -> Result<Configuration, GogoError>
where
    F: Fn(&str) -> Result<String, GogoError>,
{
    let envs = config
        .envs
        .iter()
        .map(|(env, vars)| {
            let vars = vars
                .iter()
                .map(|(name, value)| f(value).map(|value| (name.clone(), value)))
                .collect::<Result<Variables, GogoError>>()?;
            Ok((env.clone(), vars))
        })
        .collect::<Result<_, GogoError>>()?;
    Ok(Configuration { encrypted, envs })
}

impl<P: KeyProvider> ConfigStore<P> {
    /// Plaintext → Encrypted. `ask_password` is called only when no password is stored yet.
    #[instrument(skip_all, fields(path = %self.path().display()))]
    pub fn encrypt<F>(&self, ask_password: F) -> Result<Transition, GogoError>
    where
        F: FnOnce() -> Result<String, GogoError>,
    {
        let config = self.load()?;
        if config.state() == EncryptionState::Encrypted {
            info!("configuration already encrypted");
            return Ok(Transition::AlreadyEncrypted);
        }

        let key = self.obtain_key(ask_password)?;
        let encrypted = encrypt_configuration(&config, &key)?;
        self.save(&encrypted)?;
        info!(values = encrypted.value_count(), "configuration encrypted");
        Ok(Transition::Encrypted {
            values: encrypted.value_count(),
        })
    }

    /// Encrypted → Plaintext. With a lost password this fails with `AuthenticationFailure`
    /// before anything is written.
    #[instrument(skip_all, fields(path = %self.path().display()))]
    pub fn decrypt<F>(&self, ask_password: F) -> Result<Transition, GogoError>
    where
        F: FnOnce() -> Result<String, GogoError>,
    {
        let config = self.load()?;
        if config.state() == EncryptionState::Plaintext {
            info!("configuration already plaintext");
            return Ok(Transition::AlreadyPlaintext);
        }

        let key = self.obtain_key(ask_password)?;
        let decrypted = decrypt_configuration(&config, &key)?;
        self.save(&decrypted)?;
        info!(values = decrypted.value_count(), "configuration decrypted");
        Ok(Transition::Decrypted {
            values: decrypted.value_count(),
        })
    }

    fn obtain_key<F>(&self, ask_password: F) -> Result<KeyMaterial, GogoError>
    where
        F: FnOnce() -> Result<String, GogoError>,
    {
        if let Some(key) = self.keys().load_key()? {
            return Ok(key);
        }
        let password = ask_password()?;
        self.keys().save_password(&password)?;
        self.require_key()
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use super::*;
    use crate::{
        config_store::CONFIG_FILE_NAME,
        key_provider::{FixedIdentity, InMemoryKeyProvider, PasswordFile, PASSWORD_FILE_NAME},
    };

    const PLAIN: &str = "encrypted: false\nenvs:\n  dev:\n    A: secret1\n    B: secret2\n";

    fn seed(dir: &std::path::Path, contents: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE_NAME);
        fs::write(&path, contents).expect("seed config");
        path
    }

    fn never_asked() -> Result<String, GogoError> {
        panic!("password prompt must not run")
    }

    #[test]
    fn encrypt_then_decrypt_restores_original() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = seed(dir.path(), PLAIN);
        let store = ConfigStore::new(&path, InMemoryKeyProvider::default());
        let original = store.load().expect("load");

        let outcome = store.encrypt(|| Ok("pw".to_string())).expect("encrypt");
        assert_eq!(outcome, Transition::Encrypted { values: 2 });

        let encrypted = store.load().expect("load");
        assert!(encrypted.encrypted);
        assert_ne!(encrypted.envs["dev"]["A"], "secret1");
        assert!(!fs::read_to_string(&path).expect("read").contains("secret"));

        let outcome = store.decrypt(never_asked).expect("decrypt");
        assert_eq!(outcome, Transition::Decrypted { values: 2 });
        assert_eq!(store.load().expect("load"), original);
    }

    #[test]
    fn encrypting_an_encrypted_store_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = seed(
            dir.path(),
            "encrypted: true\nenvs:\n  dev:\n    A: ciphertextX\n",
        );
        let before = fs::read(&path).expect("read");

        let store = ConfigStore::new(&path, InMemoryKeyProvider::default());
        assert_eq!(
            store.encrypt(never_asked).expect("encrypt"),
            Transition::AlreadyEncrypted
        );
        assert_eq!(fs::read(&path).expect("read"), before);
    }

    #[test]
    fn decrypting_a_plaintext_store_leaves_file_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = seed(dir.path(), PLAIN);
        let before = fs::read(&path).expect("read");

        let store = ConfigStore::new(&path, InMemoryKeyProvider::default());
        assert_eq!(
            store.decrypt(never_asked).expect("decrypt"),
            Transition::AlreadyPlaintext
        );
        assert_eq!(fs::read(&path).expect("read"), before);
    }

    #[test]
    fn wrong_password_aborts_decrypt_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = seed(dir.path(), PLAIN);
        ConfigStore::new(&path, InMemoryKeyProvider::with_password("right").expect("keys"))
            .encrypt(never_asked)
            .expect("encrypt");
        let before = fs::read(&path).expect("read");

        let store = ConfigStore::new(&path, InMemoryKeyProvider::default());
        let err = store
            .decrypt(|| Ok("wrong".to_string()))
            .expect_err("wrong password");
        assert!(matches!(err, GogoError::AuthenticationFailure { .. }));
        assert_eq!(fs::read(&path).expect("read"), before);
    }

    #[test]
    fn one_bad_value_aborts_the_whole_decrypt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = seed(dir.path(), PLAIN);
        let keys = InMemoryKeyProvider::with_password("pw").expect("keys");
        let store = ConfigStore::new(&path, keys);
        store.encrypt(never_asked).expect("encrypt");

        let mut config = store.load().expect("load");
        config
            .envs
            .get_mut("dev")
            .expect("dev")
            .insert("C".into(), "not-a-ciphertext".into());
        store.save(&config).expect("save");
        let before = fs::read(&path).expect("read");

        assert!(matches!(
            store.decrypt(never_asked),
            Err(GogoError::AuthenticationFailure { .. })
        ));
        assert_eq!(fs::read(&path).expect("read"), before);
    }

    #[test]
    fn prompt_failure_aborts_encrypt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = seed(dir.path(), PLAIN);
        let before = fs::read(&path).expect("read");

        let store = ConfigStore::new(&path, InMemoryKeyProvider::default());
        let err = store
            .encrypt(|| Err(GogoError::io("could not read password", "stdin closed")))
            .expect_err("prompt failed");
        assert!(matches!(err, GogoError::Io { .. }));
        assert_eq!(fs::read(&path).expect("read"), before);
    }

    #[test]
    fn first_encrypt_persists_password_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = seed(dir.path(), PLAIN);
        let password_path = dir.path().join(PASSWORD_FILE_NAME);
        let keys = PasswordFile::new(&password_path, FixedIdentity([7; 32]));
        let store = ConfigStore::new(&path, keys);

        store.encrypt(|| Ok("hunter2".to_string())).expect("encrypt");
        assert!(password_path.exists());

        // a second process on the same machine reads the values without prompting
        let same_machine = PasswordFile::new(&password_path, FixedIdentity([7; 32]));
        let reader = ConfigStore::new(&path, same_machine);
        let dev = reader.get_environment("dev").expect("get");
        assert_eq!(dev["A"], "secret1");
        assert_eq!(dev["B"], "secret2");
    }

    #[test]
    fn non_ascii_password_round_trips_through_password_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = seed(dir.path(), PLAIN);
        let password_path = dir.path().join(PASSWORD_FILE_NAME);
        let keys = || PasswordFile::new(&password_path, FixedIdentity([7; 32]));

        let store = ConfigStore::new(&path, keys());
        let original = store.load().expect("load");
        let outcome = store
            .encrypt(|| Ok("pässwort✓".to_string()))
            .expect("encrypt");
        assert_eq!(outcome, Transition::Encrypted { values: 2 });

        let reopened = ConfigStore::new(&path, keys());
        assert_eq!(
            reopened.decrypt(never_asked).expect("decrypt"),
            Transition::Decrypted { values: 2 }
        );
        assert_eq!(reopened.load().expect("load"), original);
    }

    #[test]
    fn pure_transitions_reject_wrong_starting_state() {
        let key = KeyMaterial::from_bytes(&[b'k'; 32]).expect("key");
        let plain = Configuration::default();
        assert!(decrypt_configuration(&plain, &key).is_err());

        let encrypted = encrypt_configuration(&plain, &key).expect("encrypt empty");
        assert!(encrypted.encrypted);
        assert!(encrypt_configuration(&encrypted, &key).is_err());
    }
}
