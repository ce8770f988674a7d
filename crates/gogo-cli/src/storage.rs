use color_eyre::Result;
use gogo_storage::{ConfigStore, MachineIdentity, MachineUidIdentity, PasswordFile};
use tracing::debug;

use crate::config::{Paths, Settings};

/// Password store bound to this machine's identity.
pub fn password_file(paths: &Paths, settings: &Settings) -> PasswordFile<MachineUidIdentity> {
    keyed_password_file(paths, settings, MachineUidIdentity::new())
}

/// Locate `.gogo.yaml` and bind it to the machine-bound password store.
pub fn open_store(
    paths: &Paths,
    settings: &Settings,
) -> Result<ConfigStore<PasswordFile<MachineUidIdentity>>> {
    let store = ConfigStore::open(&paths.locator, password_file(paths, settings))?;
    debug!(path = %store.path().display(), "opened configuration");
    Ok(store)
}

fn keyed_password_file<I: MachineIdentity>(
    paths: &Paths,
    settings: &Settings,
    identity: I,
) -> PasswordFile<I> {
    let keys = PasswordFile::new(&paths.password_file, identity);
    match &settings.filler {
        Some(filler) => keys.with_filler(filler.clone()),
        None => keys,
    }
}

/// Helper for tests to open a store with a fixed machine identity.
#[cfg(test)]
pub fn test_store(
    paths: &Paths,
    settings: &Settings,
) -> Result<ConfigStore<PasswordFile<gogo_storage::FixedIdentity>>> {
    let keys = keyed_password_file(paths, settings, gogo_storage::FixedIdentity([42; 32]));
    Ok(ConfigStore::open(&paths.locator, keys)?)
}
