//! End-to-end tests for `StreamingSession` against stub encoders.
//!
//! The stubs substitute for the external encoder binary (the injection
//! point is `EncodingConfig::encoder_path`), so these tests observe the
//! byte-exact transport and the session state machine without FFmpeg.

#![cfg(unix)]

mod stub;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use framesink_core::{EncodingConfig, Error, FrameBuffer, Quality, SessionState, StreamingSession};

const WIDTH: u32 = 64;
const HEIGHT: u32 = 48;
const FRAME_SIZE: usize = (WIDTH * HEIGHT * 3) as usize;

fn config(encoder_path: PathBuf, dir: &Path) -> EncodingConfig {
    EncodingConfig {
        output_path: dir.join("out.mkv"),
        width: WIDTH,
        height: HEIGHT,
        frame_rate: 30.0,
        quality: Quality::Lossless,
        preset: "fast".to_string(),
        encoder_path,
        ..Default::default()
    }
}

/// A frame whose payload is distinct per index, to catch reordering or loss.
fn patterned_frame(index: usize) -> FrameBuffer {
    let pixels: Vec<u8> = (0..FRAME_SIZE)
        .map(|offset| ((index * 31 + offset) % 251) as u8)
        .collect();
    FrameBuffer::from_rgb(pixels, WIDTH, HEIGHT).unwrap()
}

#[tokio::test]
async fn test_write_all_delivers_bytes_in_push_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(stub::cat_stub(dir.path()), dir.path());
    let output_path = config.output_path.clone();

    let frames: Vec<FrameBuffer> = (0..10).map(patterned_frame).collect();
    let expected: Vec<u8> = frames
        .iter()
        .flat_map(|frame| frame.as_bytes().to_vec())
        .collect();

    let mut session = StreamingSession::new(config);
    session.write_all(frames).await.unwrap();

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.frames_pushed(), 10);
    assert_eq!(session.bytes_sent(), (10 * FRAME_SIZE) as u64);
    assert_eq!(fs::read(&output_path).unwrap(), expected);
}

#[tokio::test]
async fn test_write_all_with_empty_sequence_still_produces_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(stub::cat_stub(dir.path()), dir.path());
    let output_path = config.output_path.clone();

    let mut session = StreamingSession::new(config);
    session.write_all(Vec::new()).await.unwrap();

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(session.frames_pushed(), 0);
    assert_eq!(fs::read(&output_path).unwrap().len(), 0);
}

#[tokio::test]
async fn test_shape_mismatch_is_rejected_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(stub::cat_stub(dir.path()), dir.path());
    let output_path = config.output_path.clone();

    let mut session = StreamingSession::new(config);
    session.open().await.unwrap();

    // Valid frame of the wrong shape for this session
    let wrong = FrameBuffer::solid(8, 8, [1, 2, 3]);
    let err = session.push_frame(&wrong).await.unwrap_err();
    match err {
        Error::ShapeMismatch { expected, actual } => {
            assert_eq!(expected, FRAME_SIZE);
            assert_eq!(actual, 8 * 8 * 3);
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }

    // No bytes were transmitted and the session is still usable
    assert_eq!(session.bytes_sent(), 0);
    assert_eq!(session.state(), SessionState::Open);

    let good = patterned_frame(0);
    session.push_frame(&good).await.unwrap();
    session.close().await.unwrap();

    assert_eq!(fs::read(&output_path).unwrap(), good.as_bytes());
}

#[tokio::test]
async fn test_push_after_close_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(stub::cat_stub(dir.path()), dir.path());

    let mut session = StreamingSession::new(config);
    session.open().await.unwrap();
    session.push_frame(&patterned_frame(0)).await.unwrap();
    session.close().await.unwrap();

    let err = session.push_frame(&patterned_frame(1)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            state: SessionState::Closed
        }
    ));
    assert_eq!(session.frames_pushed(), 1);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(stub::cat_stub(dir.path()), dir.path());

    let mut session = StreamingSession::new(config);
    session.open().await.unwrap();
    session.close().await.unwrap();
    // Second close must not error or touch process termination again
    session.close().await.unwrap();
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_open_with_missing_encoder_fails_with_launch_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path().join("no-such-encoder"), dir.path());

    let mut session = StreamingSession::new(config);
    let err = session.open().await.unwrap_err();
    assert!(matches!(err, Error::Launch { .. }));
    assert_eq!(session.state(), SessionState::Failed);

    // Failed sessions reject everything afterwards
    let err = session.push_frame(&patterned_frame(0)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidState {
            state: SessionState::Failed
        }
    ));
}

#[tokio::test]
async fn test_encoder_failure_surfaces_exit_code_and_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(stub::failing_stub(dir.path()), dir.path());

    let mut session = StreamingSession::new(config);
    session.open().await.unwrap();
    session.push_frame(&patterned_frame(0)).await.unwrap();

    let err = session.close().await.unwrap_err();
    match err {
        Error::EncoderExit {
            exit_code,
            diagnostics,
        } => {
            assert_eq!(exit_code, 3);
            assert!(
                diagnostics.contains("kaboom: simulated encoder failure"),
                "diagnostics not captured verbatim: {diagnostics:?}"
            );
        }
        other => panic!("expected EncoderExit, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Failed);

    // close() stays idempotent after the failure
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_encoder_killed_mid_stream_fails_push_then_close_does_not_hang() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(stub::early_exit_stub(dir.path()), dir.path());
    // Larger than any OS pipe buffer, so the write cannot complete without
    // a reader on the other end.
    config.width = 640;
    config.height = 480;

    let mut session = StreamingSession::new(config);
    session.open().await.unwrap();

    let frame = FrameBuffer::solid(640, 480, [0, 0, 0]);
    let err = session.push_frame(&frame).await.unwrap_err();
    assert!(matches!(err, Error::PipeWrite(_)), "got {err:?}");
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.bytes_sent(), 0);

    let start = Instant::now();
    session.close().await.unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_close_times_out_on_wedged_encoder() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(stub::wedged_stub(dir.path()), dir.path());
    config.finish_timeout_ms = 500;

    let mut session = StreamingSession::new(config);
    session.open().await.unwrap();
    session.push_frame(&patterned_frame(0)).await.unwrap();

    let start = Instant::now();
    let err = session.close().await.unwrap_err();
    assert!(matches!(err, Error::FinishTimeout { .. }), "got {err:?}");
    assert!(
        start.elapsed() < Duration::from_secs(10),
        "close did not respect the timeout bound"
    );
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn test_abort_kills_encoder_and_fails_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(stub::cat_stub(dir.path()), dir.path());

    let mut session = StreamingSession::new(config);
    session.open().await.unwrap();
    session.push_frame(&patterned_frame(0)).await.unwrap();

    session.abort().await;
    assert_eq!(session.state(), SessionState::Failed);

    let err = session.push_frame(&patterned_frame(1)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_write_all_propagates_encoder_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(stub::failing_stub(dir.path()), dir.path());

    let mut session = StreamingSession::new(config);
    let frames: Vec<FrameBuffer> = (0..3).map(patterned_frame).collect();
    let err = session.write_all(frames).await.unwrap_err();
    assert!(matches!(err, Error::EncoderExit { exit_code: 3, .. }));
    assert_eq!(session.state(), SessionState::Failed);
}
