//! Custom error types for the protocol engine.

use thiserror::Error;

/// Convenience alias for results using the engine error type.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Top-level error for server startup and connection handling.
///
/// Protocol-level failures (malformed frames, illegal commands, validation
/// and range errors) are not represented here. Those are answered on the
/// wire with an `ERROR:<tag>` frame and never abort the connection; only
/// configuration and I/O problems do.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
