#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod context;
pub mod digest;
pub mod engine;
pub mod error;
pub mod modules;
pub mod pdn;
pub mod push;
pub mod registration;
pub mod signal;
pub mod socket;
pub mod tokenizer;
pub mod urc;

#[cfg(test)]
mod test_helpers;

pub use config::Config;
pub use context::ModuleContext;
pub use digest::{NoUrc, SharedEngine, UrcDigester};
pub use engine::{Engine, Ingested};
pub use error::{AtError, Error, PacketStatus};
pub use modules::{Module, ModuleParams};
pub use socket::{DataAccessMode, SocketHandle, SocketSession, SocketState};
pub use urc::{Notification, Notifications};
