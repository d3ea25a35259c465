//! BioGate RPC - application context and CLI orchestrator
//!
//! This crate wires the store, vault, verifier and gate together and
//! provides the `biogate` binary.

pub mod commands;
pub mod config;
pub mod context;
pub mod registry;

pub use config::AppConfig;
pub use context::AppContext;
pub use registry::{PrincipalRegistry, RegistryError};
