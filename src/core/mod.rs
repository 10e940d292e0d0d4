//! Platform-independent types, configuration and the trait seams

pub mod config;
pub mod models;
pub mod platform;
pub mod store;

pub use platform::{ChatPlatform, Summarizer};
pub use store::{ConfigStore, PersistedConfig};
