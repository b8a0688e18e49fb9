//! Internal implementation modules for `wheelhouse-core`.
//!
//! Callers should go through the re-exports in the crate root rather than
//! importing these modules directly.

pub mod commands;
pub mod config;
pub mod mirror;
pub mod net;
pub mod resolver;
pub mod runtime;
pub mod store;
pub mod tooling;
