//! Error types for the framesink core library

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for framesink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while streaming frames to an encoder
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration rejected before any process was launched
    #[error("invalid encoding config: {0}")]
    InvalidConfig(String),

    /// The encoder executable could not be spawned
    #[error("failed to launch encoder {path:?}: {source}")]
    Launch {
        /// Executable path or command name that failed to spawn
        path: PathBuf,
        /// Underlying spawn error
        #[source]
        source: std::io::Error,
    },

    /// A frame's byte length disagrees with the configured frame size
    #[error("frame payload is {actual} bytes, expected {expected} (rgb24, 3 bytes per pixel)")]
    ShapeMismatch {
        /// Expected payload length in bytes
        expected: usize,
        /// Actual payload length in bytes
        actual: usize,
    },

    /// The OS failed writing frame bytes to the encoder's input pipe
    #[error("failed to write frame to encoder pipe: {0}")]
    PipeWrite(#[source] std::io::Error),

    /// The encoder process reported failure on exit
    #[error("encoder exited with code {exit_code}:\n{diagnostics}")]
    EncoderExit {
        /// Process exit code (-1 when terminated by a signal)
        exit_code: i32,
        /// Captured diagnostic output, verbatim
        diagnostics: String,
    },

    /// The encoder did not exit within the configured bound after end-of-stream
    #[error("encoder did not exit within {timeout:?} after end of stream")]
    FinishTimeout {
        /// How long the close path waited before killing the process
        timeout: Duration,
    },

    /// Operation attempted on a session that cannot accept it
    #[error("session is {state} and cannot accept this operation")]
    InvalidState {
        /// State the session was in when the operation was rejected
        state: SessionState,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
