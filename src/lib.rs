//! Tilewatch: tiled object detection for large images.
//!
//! Images dropped into a watched folder (or uploaded over HTTP) are cut into
//! overlapping model-sized tiles, each tile is sent to an inference backend,
//! and the per-tile detections are shifted back into the coordinates of the
//! original image and saved as JSON.
//!
//! # Modules
//!
//! - [`detection`]: Bounding boxes, detections and their JSON form
//! - [`tiling`]: The tile grid and the local-to-global stitcher
//! - [`backend`]: The inference backend seam and the external-process backend
//! - [`orchestrator`]: Running a backend over a whole image, tiled or not
//! - [`ingest`]: Watch events, filtering, dispatch and the serial event loop
//! - [`config`]: Detector settings from YAML, flags and environment
//! - `server` / `remote`: The HTTP upload endpoint and its client
//! - [`error`]: Error types for tilewatch operations

pub mod backend;
pub mod config;
pub mod detection;
pub mod error;
pub mod ingest;
pub mod orchestrator;
#[cfg(feature = "remote")]
pub mod remote;
#[cfg(feature = "server")]
pub mod server;
pub mod tiling;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use config::DetectorConfig;
use ingest::{is_allowed_image, Dispatch, FolderWatcher, IngestHandler, LocalDispatch};

pub use error::TilewatchError;

/// Name of the multipart field that carries an uploaded image.
pub const IMAGE_FIELD: &str = "img";

/// The tilewatch CLI application.
#[derive(Parser)]
#[command(name = "tilewatch")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Watch a folder and write detections for every image written into it.
    Watch(WatchArgs),

    /// Serve the detection endpoint over HTTP.
    #[cfg(feature = "server")]
    Serve(ServeArgs),

    /// Run detection once on an image or on every image in a directory.
    Detect(DetectArgs),

    /// Upload one image to a detection server and print the status code.
    #[cfg(feature = "remote")]
    Post(PostArgs),
}

/// Options shared by every subcommand that builds a detector.
#[derive(clap::Args, Debug, Default)]
struct DetectorArgs {
    /// YAML file with detector settings. Flags override its values.
    #[arg(long, env = "TILEWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Edge length of a tile in pixels.
    #[arg(long, env = "TILEWATCH_SEGMENT_SIZE")]
    segment_size: Option<u32>,

    /// Fraction of a tile shared with its neighbour, in [0, 1).
    #[arg(long, env = "TILEWATCH_OVERLAP_PORTION")]
    overlap_portion: Option<f64>,

    /// Detections scoring below this are dropped.
    #[arg(long, env = "TILEWATCH_CONFIDENCE_THRESHOLD")]
    confidence_threshold: Option<f64>,

    /// Send whole images to the backend instead of tiles.
    #[arg(long, env = "TILEWATCH_NO_TILING")]
    no_tiling: bool,

    /// Detector program run once per tile.
    #[arg(long, env = "TILEWATCH_BACKEND_CMD")]
    backend_cmd: Option<String>,

    /// Argument passed to the detector program (repeatable).
    #[arg(long = "backend-arg", allow_hyphen_values = true)]
    backend_args: Vec<String>,
}

impl DetectorArgs {
    /// Layers the flags over the config file (if any) over the defaults.
    fn resolve(&self) -> Result<DetectorConfig, TilewatchError> {
        let mut config = match &self.config {
            Some(path) => DetectorConfig::from_yaml_file(path)?,
            None => DetectorConfig::default(),
        };

        if let Some(segment_size) = self.segment_size {
            config.segment_size = segment_size;
        }
        if let Some(overlap_portion) = self.overlap_portion {
            config.overlap_portion = overlap_portion;
        }
        if let Some(threshold) = self.confidence_threshold {
            config.confidence_threshold = threshold;
        }
        if self.no_tiling {
            config.tiling = false;
        }
        if let Some(command) = &self.backend_cmd {
            config.backend.command = Some(command.clone());
            config.backend.args = self.backend_args.clone();
        } else if !self.backend_args.is_empty() {
            config.backend.args = self.backend_args.clone();
        }

        Ok(config)
    }
}

/// Arguments for the watch subcommand.
#[derive(clap::Args)]
struct WatchArgs {
    /// Folder to watch for new images.
    #[arg(long, default_value = ".")]
    source: PathBuf,

    /// Folder the JSON detections are written to.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Upload images to this detection server instead of running a backend.
    #[cfg(feature = "remote")]
    #[arg(long, env = "TILEWATCH_URL")]
    url: Option<url::Url>,

    /// Also watch subfolders.
    #[arg(long)]
    recursive: bool,

    #[command(flatten)]
    detector: DetectorArgs,
}

/// Arguments for the serve subcommand.
#[cfg(feature = "server")]
#[derive(clap::Args)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:8000", env = "TILEWATCH_BIND")]
    bind: std::net::SocketAddr,

    /// Save uploaded images into this folder.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Save detections for each upload into this folder.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Largest accepted request body in bytes.
    #[arg(long, default_value_t = server::DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    #[command(flatten)]
    detector: DetectorArgs,
}

/// Arguments for the detect subcommand.
#[derive(clap::Args)]
struct DetectArgs {
    /// Image file, or a directory searched recursively for images.
    path: PathBuf,

    /// Folder the JSON detections are written to.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    #[command(flatten)]
    detector: DetectorArgs,
}

/// Arguments for the post subcommand.
#[cfg(feature = "remote")]
#[derive(clap::Args)]
struct PostArgs {
    /// Image to upload.
    #[arg(long)]
    source: PathBuf,

    /// Detection server URL.
    #[arg(long, env = "TILEWATCH_URL")]
    url: url::Url,
}

/// Run the tilewatch CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), TilewatchError> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Some(Commands::Watch(args)) => run_watch(args),
        #[cfg(feature = "server")]
        Some(Commands::Serve(args)) => run_serve(args),
        Some(Commands::Detect(args)) => run_detect(args),
        #[cfg(feature = "remote")]
        Some(Commands::Post(args)) => run_post(args),
        None => {
            println!("tilewatch {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Tiled object detection for large images.");
            println!();
            println!("Run 'tilewatch --help' for usage information.");
            Ok(())
        }
    }
}

fn init_logging() {
    // A second init (e.g. from an embedding binary) is not an error.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()
        .ok();
}

/// Ctrl+C ends the process at once, without waiting for in-flight work.
fn install_interrupt_handler() -> Result<(), TilewatchError> {
    ctrlc::set_handler(|| {
        println!("Exiting.");
        std::process::exit(0);
    })?;
    Ok(())
}

/// Execute the watch subcommand.
fn run_watch(args: WatchArgs) -> Result<(), TilewatchError> {
    let dispatcher = watch_dispatcher(&args)?;
    std::fs::create_dir_all(&args.output)?;

    install_interrupt_handler()?;
    let watcher = FolderWatcher::new(&args.source, args.recursive)?;
    println!("Press CTRL+C to exit.");

    let mut handler = IngestHandler::new(dispatcher, &args.output);
    ingest::run_event_loop(watcher.events(), &mut handler);
    Ok(())
}

fn watch_dispatcher(args: &WatchArgs) -> Result<Box<dyn Dispatch>, TilewatchError> {
    #[cfg(feature = "remote")]
    if let Some(url) = &args.url {
        let client = remote::RemoteClient::new(url.clone());
        log::info!("Sending images to {}", client.url());
        return Ok(Box::new(ingest::RemoteDispatch::new(client)));
    }

    let detector = args.detector.resolve()?.build_detector()?;
    log::info!("Using backend '{}'", detector.backend_name());
    Ok(Box::new(LocalDispatch::new(detector)))
}

/// Execute the serve subcommand.
#[cfg(feature = "server")]
fn run_serve(args: ServeArgs) -> Result<(), TilewatchError> {
    let detector = args.detector.resolve()?.build_detector()?;
    let config = server::ServerConfig {
        input_dir: args.input,
        output_dir: args.output,
        max_upload_bytes: args.max_upload_bytes,
    };

    install_interrupt_handler()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(args.bind, detector, config))
}

/// Execute the detect subcommand.
fn run_detect(args: DetectArgs) -> Result<(), TilewatchError> {
    let detector = args.detector.resolve()?.build_detector()?;
    let images = collect_images(&args.path)?;
    std::fs::create_dir_all(&args.output)?;

    let mut handler = IngestHandler::new(LocalDispatch::new(detector), &args.output);
    for image in &images {
        handler.process(image);
    }

    let stats = handler.stats();
    println!(
        "Processed {} image(s): {} completed, {} failed",
        images.len(),
        stats.completed,
        stats.failed
    );

    if stats.failed > 0 {
        return Err(TilewatchError::BatchFailed {
            failed: stats.failed,
            total: images.len(),
        });
    }
    Ok(())
}

/// A single image, or every image below a directory in path order.
fn collect_images(path: &Path) -> Result<Vec<PathBuf>, TilewatchError> {
    if !path.is_dir() {
        if !is_allowed_image(path) {
            return Err(TilewatchError::UnsupportedFileType {
                path: path.to_path_buf(),
            });
        }
        return Ok(vec![path.to_path_buf()]);
    }

    let mut images = Vec::new();
    for entry in walkdir::WalkDir::new(path).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && is_allowed_image(entry.path()) {
            images.push(entry.path().to_path_buf());
        }
    }
    Ok(images)
}

/// Execute the post subcommand.
#[cfg(feature = "remote")]
fn run_post(args: PostArgs) -> Result<(), TilewatchError> {
    let client = remote::RemoteClient::new(args.url);
    let status = client.post_file(&args.source)?;
    println!("{}", status);
    Ok(())
}
