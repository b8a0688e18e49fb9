pub mod context;
pub mod settings;

pub use settings::{Config, EnvSnapshot, MirrorConfig, NetworkConfig};
