//! Storage module for the key/value backing store and configuration.

pub mod codec;
pub mod config;
pub mod kv;
pub mod schema;

pub use config::{AppConfig, ConfigError, TrackerSettings};
pub use kv::{DurableStore, KvStore, StorageError};
