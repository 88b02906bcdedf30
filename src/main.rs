use clap::{Parser, Subcommand};
use image_preview::imaging::ResizeSpec;
use image_preview::{PreviewOutcome, PreviewPipeline, SourceImage, config, output};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "image-preview")]
#[command(about = "Resize an image and compare JPEG, WebP and PNG previews")]
#[command(long_about = "\
Resize an image and compare JPEG, WebP and PNG previews

The source is scaled down to a maximum width (keeping its aspect ratio),
sharpened, then encoded in every format in parallel. Each candidate is
scored against the resized image with SSIM (1.0 = identical).

Set RUST_LOG=debug to trace each pipeline step.

Run 'image-preview gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate and score previews for one image
    Preview(PreviewArgs),
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct PreviewArgs {
    /// Source image
    file: PathBuf,

    /// Widest allowed output, in pixels (overrides config)
    #[arg(long)]
    max_width: Option<u32>,

    /// Encoding quality from 0.0 to 1.0 (overrides config)
    #[arg(long)]
    quality: Option<f32>,

    /// Path to a config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write every candidate into this directory under its suggested name
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Preview(args) => preview(args),
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn preview(args: PreviewArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let mut preview_config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::PreviewConfig::default(),
    };
    if let Some(max_width) = args.max_width {
        preview_config.max_width = max_width;
    }
    if let Some(quality) = args.quality {
        preview_config.encoding.quality = quality;
    }
    preview_config.validate()?;

    init_thread_pool(&preview_config.processing);

    let source = SourceImage::from_path(&args.file)?;
    let outcome = PreviewPipeline::from_config(&preview_config)
        .generate_previews(&source, ResizeSpec::new(preview_config.max_width))?;

    if args.json {
        println!("{}", output::report_json(&outcome)?);
    } else {
        output::print_report(&outcome);
    }

    if let Some(dir) = &args.save_dir {
        save_candidates(&outcome, dir)?;
    }

    if outcome.has_candidates() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(2))
    }
}

/// Write each scored candidate under its suggested download name.
fn save_candidates(outcome: &PreviewOutcome, dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for result in &outcome.report().results {
        let path = dir.join(result.candidate.suggested_filename());
        std::fs::write(&path, &result.candidate.bytes)?;
        tracing::info!(path = %path.display(), "saved candidate");
    }
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
