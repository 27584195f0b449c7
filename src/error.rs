//! Error types for the fallible edges of the engine.
//!
//! Nothing here reaches the render path: the [`crate::diagram::Diagram`] facade
//! logs these and falls back to defaults.

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Invalid topology JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid persisted layout: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Store is not hydrated yet; write to {0} rejected")]
    NotHydrated(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}
