use thiserror::Error;

/// Errors raised while discovering tiles in their backing store
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The tile directory (or an entry inside it) could not be read
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    /// The configured tile location is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// A tile filename does not follow the `<row>n|s<col>e|w` convention
    #[error("Couldn't parse tile name {name:?}: {reason}")]
    InvalidTileName { name: String, reason: &'static str },
}

/// Errors produced while materializing a single tile
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// The source image could not be opened or decoded
    #[error("Failed to decode {source_name}: {message}")]
    Decode {
        source_name: String,
        message: String,
    },
}

/// Errors from the display surface collaborator
#[derive(Debug, Clone, Error)]
pub enum SurfaceError {
    /// The platform event loop could not be created or run
    #[error("Event loop error: {0}")]
    EventLoop(String),

    /// The window or its presentation surface could not be created
    #[error("Window error: {0}")]
    Window(String),

    /// The pixel buffer could not be acquired or presented
    #[error("Buffer error: {0}")]
    Buffer(String),

    /// The display has been torn down
    #[error("Display surface is closed")]
    Closed,
}
