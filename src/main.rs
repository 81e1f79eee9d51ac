use clap::{Args, Parser, Subcommand};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use walkdir::WalkDir;

use photo_finisher::{
    AccentColor, Album, AssetStore, Compositor, FinishError, FinisherConfig, FinishingCoordinator,
    LocationData, Photo, PhotoIndex, SettingsPublisher, SortOrder, WatermarkRequest, WatermarkSettings,
};

/// Watermark captured photos and manage the album
#[derive(Debug, Parser)]
#[command(name = "photo-finisher", version, about)]
struct Cli {
    /// Configuration file (JSON); defaults to the platform config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watermark a single image and print the output path
    Watermark {
        input: PathBuf,
        #[command(flatten)]
        overlay: OverlayArgs,
        /// Date line (defaults to now)
        #[arg(long)]
        date: Option<String>,
    },
    /// Finish files (or folders of images) and save them to the album
    Capture {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        overlay: OverlayArgs,
        /// Save originals without a watermark
        #[arg(long)]
        no_watermark: bool,
    },
    /// List album photos page by page
    List {
        #[arg(long)]
        ascending: bool,
        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Delete photos from the album by id
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Debug, Args)]
struct OverlayArgs {
    /// Accent color (#RRGGBB, #RRGGBBAA or rgba(r, g, b, a))
    #[arg(long, default_value = "#FFD700")]
    color: AccentColor,
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    latitude: Option<f64>,
    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    longitude: Option<f64>,
    /// Address line shown under the coordinates
    #[arg(long)]
    address: Option<String>,
}

impl OverlayArgs {
    fn location(&self) -> Option<LocationData> {
        let (lat, lon) = (self.latitude?, self.longitude?);
        Some(LocationData::from_coordinates(lat, lon, self.address.clone()))
    }
}

/// Image extensions picked up when walking folders
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "tif", "tiff"];

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("❌ {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = FinisherConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Watermark {
            input,
            overlay,
            date,
        } => {
            let compositor = Compositor::from_config(&config);
            let location = overlay.location();
            let request = WatermarkRequest {
                source: input,
                date: date.unwrap_or_else(|| {
                    chrono::Local::now().format(&config.date_format).to_string()
                }),
                location: location.as_ref().map(|l| l.formatted.clone()),
                address: location.and_then(|l| l.address),
                accent_color: overlay.color,
            };
            let output = tokio::task::spawn_blocking(move || compositor.composite(&request)).await??;
            println!("{}", output.display());
        }
        Command::Capture {
            paths,
            overlay,
            no_watermark,
        } => {
            let store = open_album(&config)?;
            let index = Arc::new(PhotoIndex::new(store.clone(), config.page_size));
            let publisher = SettingsPublisher::new(WatermarkSettings {
                enabled: !no_watermark,
                accent_color: overlay.color,
            });
            if let Some(location) = overlay.location() {
                publisher.publish_location(location);
            }
            let coordinator = FinishingCoordinator::new(
                Arc::new(Compositor::from_config(&config)),
                store,
                index,
                publisher.subscribe(),
                &config,
            );
            capture_all(&coordinator, collect_images(&paths)).await;
        }
        Command::List { ascending, pages } => {
            let store = open_album(&config)?;
            let index = PhotoIndex::new(store, config.page_size);
            index.refresh(SortOrder::from_ascending(ascending)).await?;
            for _ in 1..pages {
                if index.load_more().await?.is_none() {
                    break;
                }
            }
            for photo in index.photos() {
                let taken = chrono::DateTime::from_timestamp_millis(photo.creation_time)
                    .map(|t| t.with_timezone(&chrono::Local).format(&config.date_format).to_string())
                    .unwrap_or_default();
                println!("{}\t{}\t{}\t{}", photo.id, taken, photo.filename, photo.uri);
            }
            if index.has_more() {
                println!("… more photos available (use --pages)");
            }
        }
        Command::Delete { ids } => {
            let store = open_album(&config)?;
            let index = PhotoIndex::new(store, config.page_size);
            index.delete(&ids).await?;
            println!("🗑️  Deleted {} photos", ids.len());
        }
    }

    Ok(())
}

fn open_album(config: &FinisherConfig) -> Result<Arc<dyn AssetStore>, Box<dyn std::error::Error>> {
    let album = Album::open(&config.db_path, &config.album_dir)?;
    log::info!("🎨 Album has {} photos", album.photo_count()?);
    Ok(Arc::new(album))
}

/// Expand folders into the image files they contain
fn collect_images(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for root in paths {
        if root.is_file() {
            files.push(root.clone());
            continue;
        }
        log::info!("🔍 Scanning folder: {}", root.display());
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_image = path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.to_string_lossy().to_lowercase())
                    .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
            if is_image {
                files.push(path.to_path_buf());
            }
        }
    }
    files
}

/// Feed every file through the coordinator.
///
/// The coordinator drops work above its ceiling; a batch import would rather
/// wait, so on a drop we let the oldest in-flight finish and try again.
async fn capture_all(coordinator: &FinishingCoordinator, files: Vec<PathBuf>) {
    let mut pending = VecDeque::new();
    let (mut finished, mut failed) = (0usize, 0usize);

    let mut tally = |outcome: Result<Result<Photo, FinishError>, tokio::task::JoinError>| match outcome {
        Ok(Ok(photo)) => {
            finished += 1;
            log::debug!("Saved as {:?}", photo);
        }
        Ok(Err(err)) => {
            failed += 1;
            log::warn!("⚠️  {}", err);
        }
        Err(err) => {
            failed += 1;
            log::warn!("⚠️  Finishing task panicked: {}", err);
        }
    };

    for file in files {
        loop {
            match coordinator.submit(file.clone()) {
                Ok(handle) => {
                    pending.push_back(handle);
                    break;
                }
                Err(FinishError::Dropped { .. }) => match pending.pop_front() {
                    Some(handle) => tally(handle.await),
                    None => tokio::task::yield_now().await,
                },
                Err(err) => {
                    tally(Ok(Err(err)));
                    break;
                }
            }
        }
    }
    while let Some(handle) = pending.pop_front() {
        tally(handle.await);
    }

    let diag = coordinator.diagnostics();
    println!(
        "✅ Capture complete! Finished {}, failed {} ({} saved without watermark after errors).",
        finished, failed, diag.fallbacks
    );
    if let Some(latest) = coordinator.latest_photo().borrow().as_ref() {
        println!("📸 Latest photo: {} ({})", latest.id, latest.uri);
    }
}
