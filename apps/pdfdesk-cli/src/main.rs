//! PDF desk command line
//!
//! Runs one desk operation against the backend and writes the result into
//! the output directory.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use pdfdesk_client::{Artifact, Desk};
use pdfdesk_core::{CompressionLevel, DeskConfig, SplitMode, TaskTracker};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfdesk")]
#[command(version, about = "Compress, convert, merge, split and organize PDFs")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding the configuration
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Directory the result is written to
    #[arg(short, long, global = true, default_value = ".")]
    out: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compress PDFs into one archive
    Compress {
        /// screen, ebook, printer or prepress
        #[arg(short, long, default_value = "screen")]
        level: CompressionLevel,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Merge PDFs in the given order
    Merge {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Split one PDF into parts
    Split {
        file: PathBuf,

        /// Number of parts of roughly equal page count
        #[arg(long, conflicts_with = "max_size_mb")]
        parts: Option<u32>,

        /// Largest allowed part size in megabytes
        #[arg(long)]
        max_size_mb: Option<f64>,
    },
    /// Reorder and rotate the pages of one PDF
    Organize {
        file: PathBuf,

        /// New page order, e.g. "3,1,2"
        #[arg(long)]
        order: Option<String>,

        /// Rotate a page clockwise, e.g. "2:90". Repeatable.
        #[arg(long = "rotate")]
        rotations: Vec<String>,
    },
    /// Convert documents and images
    Convert {
        /// Target format; every file becomes a PDF when omitted
        #[arg(long)]
        to: Option<String>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn split_mode(parts: Option<u32>, max_size_mb: Option<f64>) -> anyhow::Result<SplitMode> {
    match (parts, max_size_mb) {
        (Some(parts), None) => Ok(SplitMode::Parts { parts }),
        (None, Some(max_size_mb)) => Ok(SplitMode::Size { max_size_mb }),
        (None, None) => bail!("Choose a split mode: --parts or --max-size-mb"),
        (Some(_), Some(_)) => bail!("--parts and --max-size-mb are exclusive"),
    }
}

fn parse_order(order: &str) -> anyhow::Result<Vec<u32>> {
    order
        .split(',')
        .map(|p| {
            p.trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid page number in order: {:?}", p))
        })
        .collect()
}

/// "page:degrees" to (page, quarter turns)
fn parse_rotation(arg: &str) -> anyhow::Result<(u32, u16)> {
    let (page, degrees) = arg
        .split_once(':')
        .with_context(|| format!("Rotation must look like PAGE:DEGREES, got {:?}", arg))?;
    let page: u32 = page.trim().parse().context("Invalid page number")?;
    let degrees: u16 = degrees.trim().parse().context("Invalid rotation")?;
    if degrees % 90 != 0 {
        bail!("Rotation must be a multiple of 90, got {}", degrees);
    }
    Ok((page, (degrees / 90) % 4))
}

fn report(tracker: &TaskTracker) {
    match tracker.summary() {
        Some(summary) => eprintln!("{}\n{}", tracker.status(), summary.describe()),
        None => eprintln!("{:>3.0}% {}", tracker.percent(), tracker.status()),
    }
}

fn load_config(args: &Args) -> anyhow::Result<DeskConfig> {
    let mut config = match &args.config {
        Some(path) => DeskConfig::from_file(path)?,
        None => DeskConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    Ok(config)
}

async fn run(args: Args, cancel: CancellationToken) -> anyhow::Result<Artifact> {
    let desk = Desk::new(load_config(&args)?)?;
    tracing::info!(base_url = %desk.config().base_url, "Using backend");

    let artifact = match args.command {
        Command::Compress { level, files } => {
            desk.compress(&files, level, &cancel, report).await?
        }
        Command::Merge { files } => desk.merge(&files).await?,
        Command::Split {
            file,
            parts,
            max_size_mb,
        } => desk.split(file, split_mode(parts, max_size_mb)?).await?,
        Command::Organize {
            file,
            order,
            rotations,
        } => {
            let order = order.as_deref().map(parse_order).transpose()?;
            let rotations = rotations
                .iter()
                .map(|r| parse_rotation(r))
                .collect::<anyhow::Result<Vec<_>>>()?;
            desk.organize(file, |layout| {
                if let Some(order) = &order {
                    layout.reorder(order)?;
                }
                for &(page, turns) in &rotations {
                    for _ in 0..turns {
                        layout.rotate(page).ok_or_else(|| {
                            pdfdesk_core::ValidationError::InvalidOrder(format!(
                                "page {} does not exist",
                                page
                            ))
                        })?;
                    }
                }
                Ok(())
            })
            .await?
        }
        Command::Convert { to, files } => desk.convert(&files, to.as_deref()).await?,
    };
    Ok(artifact)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let out = args.out.clone();
    let artifact = run(args, cancel).await?;
    let saved = artifact
        .save_in(&out)
        .await
        .with_context(|| format!("Failed to write into {}", out.display()))?;
    println!("{}", saved.display());
    Ok(())
}
