//! Encoder process lifecycle
//!
//! [`EncoderProcessHandle`] owns exactly one external encoder process: it
//! launches it with a fixed rawvideo argument template, holds the only write
//! end of its input pipe, and captures its diagnostic stream.
//!
//! The diagnostic stream must be drained for the whole process lifetime: the
//! encoder blocks writing stderr once the OS buffer fills, while the caller
//! blocks writing frames, and neither side can make progress. The drain task
//! starts before `launch` returns and runs until the process exits.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;

use crate::config::EncodingConfig;
use crate::error::{Error, Result};

/// Handle to a running external encoder process.
///
/// Created by [`EncoderProcessHandle::launch`], terminated exactly once by
/// [`finish`](EncoderProcessHandle::finish) or
/// [`kill`](EncoderProcessHandle::kill), never reused.
#[derive(Debug)]
pub struct EncoderProcessHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    diagnostics: Arc<Mutex<Vec<String>>>,
    drain_task: JoinHandle<()>,
    pid: Option<u32>,
}

impl EncoderProcessHandle {
    /// Launch the external encoder for the given configuration.
    ///
    /// The process reads raw RGB24 frames from its standard input and writes
    /// the encoded file to `config.output_path`. Standard output is unused
    /// and attached to null; standard error is piped into the diagnostic
    /// buffer by a background task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Launch`] when the executable cannot be found or
    /// spawned.
    pub fn launch(config: &EncodingConfig) -> Result<Self> {
        let mut command = Command::new(&config.encoder_path);
        command
            .arg("-y")
            .args(["-f", "rawvideo"])
            .args(["-vcodec", "rawvideo"])
            .args(["-s", &config.size_arg()])
            .args(["-pix_fmt", "rgb24"])
            .args(["-r", &config.frame_rate.to_string()])
            .args(["-i", "-"])
            .arg("-an")
            .args(["-vcodec", &config.codec])
            .args(["-crf", &config.quality.crf().to_string()])
            .args(["-preset", &config.preset])
            .arg(&config.output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| Error::Launch {
            path: config.encoder_path.clone(),
            source,
        })?;

        let pid = child.id();
        // Both pipes exist: the command requested them and spawn succeeded.
        let stdin = child.stdin.take().ok_or_else(|| Error::Launch {
            path: config.encoder_path.clone(),
            source: std::io::Error::other("encoder stdin was not captured"),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| Error::Launch {
            path: config.encoder_path.clone(),
            source: std::io::Error::other("encoder stderr was not captured"),
        })?;

        let diagnostics = Arc::new(Mutex::new(Vec::new()));
        let buffer = diagnostics.clone();
        let drain_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(target: "framesink::encoder", "{}", line);
                if let Ok(mut buffer) = buffer.lock() {
                    buffer.push(line);
                }
            }
        });

        tracing::info!(
            pid,
            encoder = %config.encoder_path.display(),
            output = %config.output_path.display(),
            size = %config.size_arg(),
            "launched encoder process"
        );

        Ok(Self {
            child,
            stdin: Some(stdin),
            diagnostics,
            drain_task,
            pid,
        })
    }

    /// Write one frame's bytes to the encoder's input pipe.
    ///
    /// Loops until every byte is written; a short write is not a success.
    /// Blocking here is the intended backpressure when the encoder is slower
    /// than the producer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PipeWrite`] when the pipe is closed, the process has
    /// exited, or the OS write fails.
    pub async fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            Error::PipeWrite(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "encoder input pipe already closed",
            ))
        })?;
        stdin.write_all(bytes).await.map_err(Error::PipeWrite)
    }

    /// Close the input pipe and wait for the encoder to exit.
    ///
    /// Dropping the write end signals end-of-stream; the wait is bounded by
    /// `timeout`, after which the process is killed. The diagnostic drain
    /// task is joined before the exit status is inspected, so
    /// [`Error::EncoderExit`] always carries the complete stderr text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FinishTimeout`] when the encoder does not exit in
    /// time, or [`Error::EncoderExit`] when it exits with a non-zero code.
    pub async fn finish(mut self, timeout: Duration) -> Result<()> {
        // End-of-stream: the encoder flushes and exits once its input closes.
        drop(self.stdin.take());

        let status = match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                tracing::warn!(pid = self.pid, ?timeout, "encoder wedged after end of stream, killing");
                let _ = self.child.kill().await;
                self.drain_task.abort();
                return Err(Error::FinishTimeout { timeout });
            }
        };

        let _ = (&mut self.drain_task).await;

        if status.success() {
            tracing::info!(pid = self.pid, "encoder finished");
            Ok(())
        } else {
            Err(Error::EncoderExit {
                exit_code: status.code().unwrap_or(-1),
                diagnostics: self.diagnostics(),
            })
        }
    }

    /// Force immediate termination. Best-effort; never fails.
    pub async fn kill(&mut self) {
        tracing::warn!(pid = self.pid, "killing encoder process");
        drop(self.stdin.take());
        let _ = self.child.kill().await;
        self.drain_task.abort();
    }

    /// OS process id, absent once the process has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// Diagnostic output captured so far, one line per entry, joined
    /// verbatim.
    pub fn diagnostics(&self) -> String {
        match self.diagnostics.lock() {
            Ok(lines) => lines.join("\n"),
            Err(_) => String::new(),
        }
    }
}
