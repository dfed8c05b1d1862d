//! Framesink - Stream raw RGB24 frames into an external video encoder
//!
//! # Usage
//!
//! ```bash
//! # Encode tightly-packed RGB24 frames read from stdin
//! some-producer | framesink encode --width 640 --height 480 -o out.mkv
//!
//! # Encode a synthetic test pattern (no input material required)
//! framesink test-pattern --width 320 --height 240 --frames 90 -o pattern.mkv
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use framesink_core::{EncodingConfig, FrameBuffer, Quality, StreamingSession};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Framesink - stream raw frames to an external encoder
#[derive(Parser)]
#[command(name = "framesink")]
#[command(author, version)]
#[command(about = "Stream raw RGB24 frames into an external video encoder")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Encoding parameters shared by every subcommand.
#[derive(Args)]
struct EncoderArgs {
    /// Output file path
    #[arg(short, long)]
    output: PathBuf,

    /// Frame width in pixels
    #[arg(long)]
    width: u32,

    /// Frame height in pixels
    #[arg(long)]
    height: u32,

    /// Frames per second
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Codec identifier passed to the encoder
    #[arg(long, default_value = "libx264")]
    codec: String,

    /// Constant rate factor 0-51; omit for lossless output
    #[arg(long)]
    crf: Option<u8>,

    /// Encoder speed/quality preset
    #[arg(long, default_value = "veryslow")]
    preset: String,

    /// Encoder executable (path or PATH-resolved command name)
    #[arg(long, default_value = "ffmpeg")]
    encoder: PathBuf,
}

impl EncoderArgs {
    fn to_config(&self) -> EncodingConfig {
        EncodingConfig {
            output_path: self.output.clone(),
            width: self.width,
            height: self.height,
            frame_rate: self.fps,
            codec: self.codec.clone(),
            quality: match self.crf {
                Some(value) => Quality::Crf(value),
                None => Quality::Lossless,
            },
            preset: self.preset.clone(),
            encoder_path: self.encoder.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Encode tightly-packed RGB24 frames read from standard input
    Encode {
        #[command(flatten)]
        args: EncoderArgs,
    },

    /// Encode a synthetic moving test pattern
    TestPattern {
        #[command(flatten)]
        args: EncoderArgs,

        /// Number of frames to generate
        #[arg(long, default_value_t = 90)]
        frames: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    match cli.command {
        Command::Encode { args } => encode_stdin(&args).await,
        Command::TestPattern { args, frames } => encode_test_pattern(&args, frames).await,
    }
}

/// Read frames from stdin and stream them to the encoder.
async fn encode_stdin(args: &EncoderArgs) -> Result<()> {
    let config = args.to_config();
    let frame_size = config.frame_size();
    let output = config.output_path.clone();

    let mut session = StreamingSession::new(config);
    session.open().await.context("failed to open session")?;
    tracing::info!(frame_size, "reading rgb24 frames from stdin");

    let mut stdin = tokio::io::stdin();
    let mut buffer = vec![0u8; frame_size];
    loop {
        let got_frame = match read_frame(&mut stdin, &mut buffer).await {
            Ok(got_frame) => got_frame,
            Err(err) => {
                session.abort().await;
                return Err(err);
            }
        };
        if !got_frame {
            break;
        }
        let frame = FrameBuffer::from_rgb(buffer.clone(), args.width, args.height)?;
        if let Err(err) = session.push_frame(&frame).await {
            session.abort().await;
            return Err(err).context("failed to push frame");
        }
    }

    session.close().await.context("encoder failed")?;
    println!(
        "wrote {} frames ({} bytes) to {}",
        session.frames_pushed(),
        session.bytes_sent(),
        output.display()
    );
    Ok(())
}

/// Generate a moving gradient and stream it to the encoder.
async fn encode_test_pattern(args: &EncoderArgs, frames: u32) -> Result<()> {
    let config = args.to_config();
    let output = config.output_path.clone();

    let mut session = StreamingSession::new(config);
    session.open().await.context("failed to open session")?;
    tracing::info!(frames, "generating test pattern");

    for index in 0..frames {
        let frame = pattern_frame(args.width, args.height, index)?;
        if let Err(err) = session.push_frame(&frame).await {
            session.abort().await;
            return Err(err).context("failed to push frame");
        }
    }

    session.close().await.context("encoder failed")?;
    println!("wrote {} test-pattern frames to {}", frames, output.display());
    Ok(())
}

/// Read exactly one frame into `buffer`.
///
/// Returns `Ok(false)` on a clean end-of-stream at a frame boundary; input
/// ending mid-frame is an error.
async fn read_frame(reader: &mut (impl AsyncRead + Unpin), buffer: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buffer.len() {
        let count = reader
            .read(&mut buffer[filled..])
            .await
            .context("failed to read frame from stdin")?;
        if count == 0 {
            if filled == 0 {
                return Ok(false);
            }
            bail!(
                "input ended mid-frame: got {} of {} bytes",
                filled,
                buffer.len()
            );
        }
        filled += count;
    }
    Ok(true)
}

fn pattern_frame(width: u32, height: u32, index: u32) -> Result<FrameBuffer> {
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height {
        for x in 0..width {
            let r = (x.wrapping_add(index) % 256) as u8;
            let g = (y.wrapping_add(index) % 256) as u8;
            let b = ((x + y) % 256) as u8;
            pixels.extend_from_slice(&[r, g, b]);
        }
    }
    Ok(FrameBuffer::from_rgb(pixels, width, height)?)
}
