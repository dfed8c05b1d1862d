//! Streaming session orchestration
//!
//! A [`StreamingSession`] drives a sequence of frames through one encoder
//! process. Lifecycle: `Idle → Open → Closed | Failed`; no transition leaves
//! `Closed` or `Failed`, and a session is never reused for a second file.

use std::fmt;
use std::mem;
use std::time::Duration;

use crate::config::EncodingConfig;
use crate::error::{Error, Result};
use crate::frame::FrameBuffer;
use crate::process::EncoderProcessHandle;

/// Observable lifecycle state of a [`StreamingSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, encoder not launched yet
    Idle,
    /// Encoder running, frames accepted
    Open,
    /// Output finalized successfully
    Closed,
    /// A fatal error occurred; the session rejects all further operations
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Open => "open",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Internal state; the handle only exists while the session is open.
enum Inner {
    Idle,
    Open(EncoderProcessHandle),
    Closed,
    Failed,
}

/// One frame-streaming encoding session.
///
/// Owns exactly one [`EncoderProcessHandle`] while open. Frames are
/// delivered to the encoder in exactly the order pushed; nothing is
/// reordered or buffered beyond the pipe transport.
pub struct StreamingSession {
    config: EncodingConfig,
    inner: Inner,
    frame_size: usize,
    frames_pushed: u64,
    bytes_sent: u64,
}

impl StreamingSession {
    /// Create an idle session for the given configuration.
    ///
    /// Nothing is validated or launched until [`open`](Self::open).
    pub fn new(config: EncodingConfig) -> Self {
        Self {
            config,
            inner: Inner::Idle,
            frame_size: 0,
            frames_pushed: 0,
            bytes_sent: 0,
        }
    }

    /// Validate the configuration and launch the encoder process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] (session stays idle; fix the config
    /// and build a new session), [`Error::Launch`] (session is failed), or
    /// [`Error::InvalidState`] when the session is not idle.
    pub async fn open(&mut self) -> Result<()> {
        let state = self.state();
        if state != SessionState::Idle {
            return Err(Error::InvalidState { state });
        }
        self.config.validate()?;
        let handle = match EncoderProcessHandle::launch(&self.config) {
            Ok(handle) => handle,
            Err(err) => {
                self.inner = Inner::Failed;
                return Err(err);
            }
        };
        self.frame_size = self.config.frame_size();
        self.inner = Inner::Open(handle);
        Ok(())
    }

    /// Push one frame to the encoder.
    ///
    /// The byte-length gate runs before any bytes reach the pipe, so a
    /// rejected frame leaves the transmitted stream intact and the session
    /// open. A pipe failure is fatal: the encoder is killed and the session
    /// transitions to failed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the session is open,
    /// [`Error::ShapeMismatch`] for a wrong-sized frame, or
    /// [`Error::PipeWrite`] on transport failure.
    pub async fn push_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        let result = match &mut self.inner {
            Inner::Open(handle) => {
                if frame.len() != self.frame_size {
                    return Err(Error::ShapeMismatch {
                        expected: self.frame_size,
                        actual: frame.len(),
                    });
                }
                handle.write_frame(frame.as_bytes()).await
            }
            _ => {
                return Err(Error::InvalidState {
                    state: self.state(),
                })
            }
        };

        match result {
            Ok(()) => {
                self.frames_pushed += 1;
                self.bytes_sent += frame.len() as u64;
                Ok(())
            }
            Err(err) => {
                self.fail().await;
                Err(err)
            }
        }
    }

    /// Finalize the output: close the pipe, wait for the encoder to exit,
    /// and check its exit status.
    ///
    /// Idempotent once the session has reached a terminal state: a second
    /// call returns `Ok(())` without touching the (already terminated)
    /// process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] when the session was never opened,
    /// [`Error::EncoderExit`] when the encoder reports failure, or
    /// [`Error::FinishTimeout`] when it does not exit within the configured
    /// bound (the process is killed in that case).
    pub async fn close(&mut self) -> Result<()> {
        match self.state() {
            SessionState::Open => {}
            SessionState::Closed | SessionState::Failed => return Ok(()),
            state @ SessionState::Idle => return Err(Error::InvalidState { state }),
        }

        if let Inner::Open(handle) = mem::replace(&mut self.inner, Inner::Closed) {
            let timeout = Duration::from_millis(self.config.finish_timeout_ms);
            if let Err(err) = handle.finish(timeout).await {
                self.inner = Inner::Failed;
                return Err(err);
            }
            tracing::info!(
                frames = self.frames_pushed,
                bytes = self.bytes_sent,
                output = %self.config.output_path.display(),
                "encoding session closed"
            );
        }
        Ok(())
    }

    /// Abandon the stream: kill the encoder immediately and mark the
    /// session failed. No partial-output guarantee is made afterwards.
    ///
    /// Best-effort; a no-op unless the session is open.
    pub async fn abort(&mut self) {
        if self.state() == SessionState::Open {
            self.fail().await;
        }
    }

    /// Open the session, push every frame in order, then close.
    ///
    /// An empty sequence still opens and closes, producing a zero-frame
    /// file per encoder behavior. Any error abandons the stream (the
    /// encoder is killed) and is returned as-is.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`open`](Self::open),
    /// [`push_frame`](Self::push_frame) or [`close`](Self::close).
    pub async fn write_all<I>(&mut self, frames: I) -> Result<()>
    where
        I: IntoIterator<Item = FrameBuffer>,
    {
        self.open().await?;
        for frame in frames {
            if let Err(err) = self.push_frame(&frame).await {
                self.abort().await;
                return Err(err);
            }
        }
        self.close().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.inner {
            Inner::Idle => SessionState::Idle,
            Inner::Open(_) => SessionState::Open,
            Inner::Closed => SessionState::Closed,
            Inner::Failed => SessionState::Failed,
        }
    }

    /// Number of frames accepted and fully written to the pipe.
    pub fn frames_pushed(&self) -> u64 {
        self.frames_pushed
    }

    /// Total frame bytes written to the pipe.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// The session's configuration.
    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// Kill the encoder and transition to failed. The handle is consumed,
    /// so termination happens at most once.
    async fn fail(&mut self) {
        if let Inner::Open(mut handle) = mem::replace(&mut self.inner, Inner::Failed) {
            handle.kill().await;
        }
    }
}
