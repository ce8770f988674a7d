//! Core model for gogo: the environment configuration, its encryption state and the error type
//! shared by the storage and CLI crates. Kept free of crypto and I/O dependencies.

pub mod config;
pub mod error;

pub use config::{Configuration, EncryptionState, Transition, Variables};
pub use error::GogoError;
