use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};

use paperview::{
    MupdfEngine, PageSlot, SourceLocator, Status, Surface, ViewMode, Viewer, ViewerConfig,
};

/// Render pages of a PDF document to PNG files.
#[derive(Parser)]
#[command(name = "paperview", version, about)]
struct Cli {
    /// Path to the PDF document
    input: PathBuf,

    /// Page to show (1-indexed)
    #[arg(short, long)]
    page: Option<usize>,

    /// Zoom, e.g. "1.5" or "150%"
    #[arg(short, long)]
    zoom: Option<String>,

    /// Clockwise rotation in degrees (multiple of 90)
    #[arg(short, long, default_value_t = 0)]
    rotate: u16,

    /// Render every page instead of just one
    #[arg(long)]
    continuous: bool,

    /// Output directory for PNG files
    #[arg(short, long, default_value = "out")]
    out: PathBuf,

    /// Viewer configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = WriteLogger::init(
        LevelFilter::Info,
        Config::default(),
        fs::File::create("paperview.log").context("failed to create log file")?,
    );

    if cli.rotate % 90 != 0 {
        bail!("--rotate must be a multiple of 90");
    }

    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    if let Some(page) = cli.page {
        config.initial_page = page;
    }
    if cli.continuous {
        config.view_mode = ViewMode::Continuous;
    }

    let mut viewer = Viewer::new(Arc::new(MupdfEngine::new()), config);

    if let Some(zoom) = &cli.zoom {
        viewer
            .set_zoom_text(zoom)
            .context("invalid --zoom value")?;
    }
    for _ in 0..(cli.rotate / 90) % 4 {
        viewer.rotate_clockwise();
    }

    viewer.load_document(SourceLocator::Path(cli.input.clone()));
    viewer.wait_until_settled(Duration::from_secs(cli.timeout));

    match viewer.status() {
        Status::Ready => {}
        Status::Failed(reason) => bail!("{}: {reason}", cli.input.display()),
        _ => bail!("timed out rendering {}", cli.input.display()),
    }

    if let Some(title) = viewer.title() {
        info!("document title: {title}");
    }

    fs::create_dir_all(&cli.out)
        .with_context(|| format!("failed to create {}", cli.out.display()))?;

    let mut written = 0;
    for (page, slot) in viewer.surfaces() {
        match slot {
            PageSlot::Ready(surface) => {
                let path = cli.out.join(format!("page-{page:03}.png"));
                write_png(surface, &path)?;
                written += 1;
            }
            PageSlot::Failed(reason) => eprintln!("page {page}: {reason}"),
            PageSlot::Pending => {}
        }
    }

    println!(
        "{written} page(s) of {} written to {}",
        viewer.page_count(),
        cli.out.display()
    );

    Ok(())
}

fn write_png(surface: &Surface, path: &Path) -> Result<()> {
    let image =
        image::RgbImage::from_raw(surface.width, surface.height, surface.pixels.clone())
            .context("surface buffer size mismatch")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
