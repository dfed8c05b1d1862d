//! Framesink Core - Managed frame-streaming encoder pipeline
//!
//! This crate streams raw RGB24 frames into an external command-line video
//! encoder (an FFmpeg-compatible invocation surface) and owns everything the
//! encoder itself does not: the subprocess lifecycle, the byte-exact frame
//! transport, and failure recovery.
//!
//! # Architecture
//!
//! - [`EncodingConfig`] — immutable parameter bundle, validated once at
//!   session open
//! - [`FrameBuffer`] — one validated `width*height*3`-byte RGB24 payload
//! - [`EncoderProcessHandle`] — owns one encoder process: launch, exclusive
//!   input-pipe writes, diagnostic capture, shutdown
//! - [`StreamingSession`] — the `Idle → Open → Closed | Failed` state
//!   machine sequencing frames through a handle
//!
//! # Example
//!
//! ```no_run
//! use framesink_core::{EncodingConfig, FrameBuffer, StreamingSession};
//!
//! #[tokio::main]
//! async fn main() -> framesink_core::Result<()> {
//!     let config = EncodingConfig {
//!         output_path: "out.mkv".into(),
//!         width: 640,
//!         height: 480,
//!         ..Default::default()
//!     };
//!
//!     let mut session = StreamingSession::new(config);
//!     session.open().await?;
//!     for _ in 0..30 {
//!         let frame = FrameBuffer::solid(640, 480, [0, 128, 255]);
//!         session.push_frame(&frame).await?;
//!     }
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod frame;
pub mod process;
pub mod session;

mod error;

pub use config::{EncodingConfig, Quality};
pub use error::{Error, Result};
pub use frame::FrameBuffer;
pub use process::EncoderProcessHandle;
pub use session::{SessionState, StreamingSession};
