//! File-backed storage for gogo with values encrypted at rest.
//! AES-256-GCM protects both the configuration values and the password file; the password file
//! itself is bound to the host through its machine id.

mod atomic;
pub mod cipher;
pub mod config_store;
pub mod key_provider;
pub mod transition;

pub use cipher::AuthenticatedCipher;
pub use config_store::{
    init as init_config, ConfigLocator, ConfigStore, InitOutcome, CONFIG_FILE_NAME,
};
pub use key_provider::{
    pad, FixedIdentity, InMemoryKeyProvider, KeyMaterial, KeyProvider, MachineIdentity,
    MachineUidIdentity, PasswordFile, SaveOutcome, PASSWORD_FILE_NAME,
};
