use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use media_scanner::VideoScanner;
use std::path::PathBuf;
use std::sync::Arc;
use thumb_cache::ThumbnailCache;
use tracing_subscriber::EnvFilter;
use video_index::{VideoLibrary, VideoRecord};

#[derive(Parser)]
#[command(name = "vidvault")]
#[command(about = "Index local videos and keep a queryable library with cached thumbnails")]
struct Cli {
    /// Library database path (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Thumbnail cache directory (defaults to the platform cache directory)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory tree and reconcile it into the library
    Scan {
        /// Root directory to walk
        path: PathBuf,
    },

    /// List indexed videos, newest additions first
    List {
        #[arg(short, long, default_value = "50")]
        limit: i64,
    },

    /// List recently played videos
    Recent {
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Search file names
    Search {
        query: String,
    },

    /// List distinct folders holding indexed videos
    Folders,

    /// Mark or unmark a video as a favorite
    Favorite {
        id: i64,

        /// Remove the favorite flag instead of setting it
        #[arg(long)]
        unset: bool,
    },

    /// Record a playback event and print the file path
    Play {
        id: i64,

        /// Resume position in milliseconds
        #[arg(short, long, default_value = "0")]
        position: i64,
    },

    /// Show library and cache totals
    Stats,

    /// Delete every cached thumbnail
    ClearThumbs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let library = Arc::new(match &cli.db {
        Some(path) => VideoLibrary::open(path)?,
        None => VideoLibrary::open_default()?,
    });
    let thumbnails = Arc::new(match &cli.cache_dir {
        Some(dir) => ThumbnailCache::with_dir(dir.clone())?,
        None => ThumbnailCache::new()?,
    });

    match cli.command {
        Commands::Scan { path } => {
            let scanner = VideoScanner::new(library.clone(), thumbnails);
            let count = scanner
                .scan_directory(&path, None)
                .await
                .with_context(|| format!("scan of {} failed", path.display()))?;
            println!("Indexed {} videos from {}", count, path.display());
        }
        Commands::List { limit } => {
            let mut videos = library.all()?;
            videos.truncate(limit.max(0) as usize);
            print_records(&videos);
        }
        Commands::Recent { limit } => {
            print_records(&library.recent(limit)?);
        }
        Commands::Search { query } => {
            let videos = library.search(&query)?;
            if videos.is_empty() {
                println!("No matches for \"{query}\"");
            } else {
                print_records(&videos);
            }
        }
        Commands::Folders => {
            for folder in library.folders()? {
                println!("{folder}");
            }
        }
        Commands::Favorite { id, unset } => {
            library.set_favorite(id, !unset)?;
            println!("Video {} {}", id, if unset { "unfavorited" } else { "favorited" });
        }
        Commands::Play { id, position } => {
            let video = library
                .get_by_id(id)?
                .with_context(|| format!("no video with id {id}"))?;
            library.record_play_event(id, position, video_index::now_ms())?;
            println!("{}", video.file_path);
        }
        Commands::Stats => {
            println!("Library: {}", library.path().display());
            println!("  Videos:    {}", library.count()?);
            println!("  Folders:   {}", library.folders()?.len());
            println!(
                "  Thumbnail cache: {:.1} MiB",
                thumbnails.total_size() as f64 / (1024.0 * 1024.0)
            );
        }
        Commands::ClearThumbs => {
            let removed = thumbnails.clear_all();
            println!("Removed {removed} cached thumbnails");
        }
    }

    Ok(())
}

fn print_records(videos: &[VideoRecord]) {
    for v in videos {
        let mins = v.duration_ms / 60_000;
        let secs = (v.duration_ms % 60_000) / 1000;
        let star = if v.is_favorite { "*" } else { " " };
        println!(
            "{:>5} {} {:>3}:{:02} {:>4}x{:<4} {}",
            v.id, star, mins, secs, v.width, v.height, v.file_path
        );
    }
}
