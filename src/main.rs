//! Binary entrypoint for BlockCam's reduction tools.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use blockcam::config::Configuration;
use blockcam::{Backend, BlockSize, Color, Reducer, ScanningParameters, SourceImage};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "blockcam", about = "Pixellate images and find content edges")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured reduction backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replace every block of pixels with its average color
    Pixellate {
        input: PathBuf,
        output: PathBuf,
        /// Block side length in pixels
        #[arg(short, long)]
        block_size: Option<u32>,
    },
    /// Report the bounding box of all non-background pixels
    Edges {
        input: PathBuf,
        /// Background color as R,G,B[,A] or #rrggbb[aa]
        #[arg(short, long)]
        background: Option<Color>,
        /// Per-channel difference still treated as background
        #[arg(short, long)]
        tolerance: Option<u8>,
        /// Write the content region to this file
        #[arg(long, value_name = "FILE")]
        crop: Option<PathBuf>,
    },
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("blockcam={}", level).parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("naga=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = Configuration::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        cfg.backend = backend;
    }
    let cfg = cfg.validated().context("validating configuration")?;
    info!(
        backend = %cfg.backend,
        timeout = %humantime::format_duration(cfg.dispatch_timeout),
        "starting"
    );

    let reducer = Reducer::new(&cfg.reducer_config()).context("initializing reducer")?;
    info!(backend = %reducer.active_backend(), "reducer ready");

    match cli.command {
        Command::Pixellate {
            input,
            output,
            block_size,
        } => {
            let block_size = match block_size {
                Some(n) => BlockSize::new(n)?,
                None => cfg.pixellate.block_size,
            };
            let image = SourceImage::open(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let started = Instant::now();
            let pixellation = reducer.pixellate(&image, block_size)?;
            info!(
                blocks = pixellation.grid().len(),
                elapsed = ?started.elapsed(),
                "pixellated {}",
                input.display()
            );
            pixellation
                .to_rgba_image()
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
        }
        Command::Edges {
            input,
            background,
            tolerance,
            crop,
        } => {
            let params = ScanningParameters::new(
                background.unwrap_or(cfg.edges.background),
                tolerance.unwrap_or(cfg.edges.tolerance),
            )?;
            let image = SourceImage::open(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let extents = reducer.find_edges(&image, &params)?;
            if extents.is_empty() {
                println!("no content found");
                return Ok(());
            }
            println!(
                "top={} left={} bottom={} right={}",
                extents.top, extents.left, extents.bottom, extents.right
            );
            if let Some(path) = crop {
                let region = extents
                    .crop(&image)
                    .context("content region lies outside the image")?;
                region
                    .as_rgba()
                    .save(&path)
                    .with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), "wrote cropped content");
            }
        }
    }
    Ok(())
}
