use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use minibili::{
    AudioQuality, Bilibili, BatchProgressDisplay, ClientConfig, Credential, DownloadConfig,
    FavoriteListContentOrder, LoginConfig, SimpleProgressDisplay, VideoDownloader, VideoId,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "minibili-cli")]
#[command(about = "CLI for minibili - Bilibili favorites, audio and QR login", long_about = None)]
struct Cli {
    /// SESSDATA cookie (can also be set via BILI_SESSDATA env var)
    #[arg(long, env = "BILI_SESSDATA", default_value = "", hide_env_values = true)]
    sessdata: String,

    /// bili_jct cookie
    #[arg(long, env = "BILI_JCT", default_value = "", hide_env_values = true)]
    bili_jct: String,

    /// DedeUserID cookie
    #[arg(long, env = "BILI_DEDEUSERID", default_value = "")]
    dedeuserid: String,

    /// buvid3 cookie
    #[arg(long, env = "BILI_BUVID3", default_value = "")]
    buvid3: String,

    /// Output directory for downloads
    #[arg(short, long, default_value = "downloads")]
    output: PathBuf,

    /// Maximum concurrent downloads
    #[arg(short = 'j', long, default_value_t = 3)]
    concurrency: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Quality {
    #[value(name = "64k")]
    K64,
    #[value(name = "132k")]
    K132,
    #[value(name = "192k")]
    K192,
    Dolby,
    HiRes,
}

impl From<Quality> for AudioQuality {
    fn from(q: Quality) -> Self {
        match q {
            Quality::K64 => AudioQuality::K64,
            Quality::K132 => AudioQuality::K132,
            Quality::K192 => AudioQuality::K192,
            Quality::Dolby => AudioQuality::Dolby,
            Quality::HiRes => AudioQuality::HiRes,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Order {
    Mtime,
    View,
    Pubtime,
}

impl From<Order> for FavoriteListContentOrder {
    fn from(o: Order) -> Self {
        match o {
            Order::Mtime => FavoriteListContentOrder::MTime,
            Order::View => FavoriteListContentOrder::View,
            Order::Pubtime => FavoriteListContentOrder::PubTime,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Log in by scanning a QR code and print the session cookies
    Login {
        /// Seconds to wait for confirmation (0 waits until the code expires)
        #[arg(long, default_value_t = 300)]
        timeout: u64,
    },
    /// List video favorite folders
    Favorites {
        /// User id (defaults to the logged-in user)
        #[arg(long)]
        uid: Option<u64>,
    },
    /// Show the content of a favorite folder
    Favorite {
        /// Folder media id
        media_id: u64,

        /// Page number (20 entries per page)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Search keyword
        #[arg(short, long)]
        keyword: Option<String>,

        #[arg(long, value_enum, default_value_t = Order::Mtime)]
        order: Order,

        /// List every video instead of one page
        #[arg(long)]
        all: bool,
    },
    /// Print the title of a video (BV code or AV number)
    Title { video: String },
    /// Resolve the download URL of a music-area audio
    AudioUrl { auid: u64 },
    /// Download the audio track of a video
    DownloadAudio {
        /// BV code or AV number
        video: String,

        /// Page number, 1-based
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Audio quality (best available if omitted)
        #[arg(short, long, value_enum)]
        quality: Option<Quality>,

        /// File name inside the output directory
        #[arg(long)]
        filename: Option<String>,
    },
    /// Download the audio of every video in a favorite folder
    DownloadFavorite {
        /// Folder media id
        media_id: u64,

        /// Download at most this many videos
        #[arg(long)]
        max: Option<usize>,

        #[arg(short, long, value_enum)]
        quality: Option<Quality>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let credential = Credential {
        buvid3: cli.buvid3.clone(),
        ..Credential::new(&cli.sessdata, &cli.bili_jct, &cli.dedeuserid)
    };
    let login_config = match &cli.command {
        Commands::Login { timeout } => LoginConfig {
            timeout: (*timeout > 0).then(|| Duration::from_secs(*timeout)),
            ..Default::default()
        },
        _ => LoginConfig::default(),
    };
    let download_config = DownloadConfig {
        max_concurrent: cli.concurrency,
        output_dir: cli.output.clone(),
    };
    let mut bili = Bilibili::with_config(
        credential,
        &ClientConfig::default(),
        login_config,
        download_config,
    )?;

    match cli.command {
        Commands::Login { .. } => {
            let credential = bili.login().await?;
            println!("✅ Logged in as {}", credential.dedeuserid);
            println!("export BILI_SESSDATA='{}'", credential.sessdata);
            println!("export BILI_JCT='{}'", credential.bili_jct);
            println!("export BILI_DEDEUSERID='{}'", credential.dedeuserid);
            if !credential.buvid3.is_empty() {
                println!("export BILI_BUVID3='{}'", credential.buvid3);
            }
        }
        Commands::Favorites { uid } => {
            let folders = bili.get_favorite_lists(uid).await?;
            println!("{} folders:", folders.count);
            for folder in &folders.list {
                println!(
                    "{:>12}  {} ({} videos){}",
                    folder.id,
                    folder.title,
                    folder.media_count,
                    if folder.is_private() { " [private]" } else { "" }
                );
            }
        }
        Commands::Favorite {
            media_id,
            page,
            keyword,
            order,
            all,
        } => {
            let mut favorite = bili.favorite_list(media_id);
            let medias = if all {
                favorite.get_videos().await?
            } else {
                favorite.get_info().await?;
                favorite
                    .get_content(page, keyword.as_deref(), order.into())
                    .await?
                    .medias
            };
            if let Some(info) = favorite.info() {
                println!("{} - {} ({} items)", info.title, info.upper.name, info.media_count);
            }
            for media in &medias {
                println!(
                    "{}  {}  [{}] {}s",
                    media.bvid, media.title, media.upper.name, media.duration
                );
            }
        }
        Commands::Title { video } => {
            println!("{}", bili.get_video_title(&video).await?);
        }
        Commands::AudioUrl { auid } => {
            let url = bili.get_audio_download_url(auid).await?;
            println!("{}", url.url().unwrap_or_default());
        }
        Commands::DownloadAudio {
            video,
            page,
            quality,
            filename,
        } => {
            let video = bili.video(VideoId::parse(&video)?);
            let mut downloader = VideoDownloader::with_downloader(
                video,
                bili.output_dir(),
                bili.downloader().clone(),
            );
            let progress = SimpleProgressDisplay::default().into_callback();
            let result = downloader
                .download_audio(
                    page.saturating_sub(1),
                    quality.map(Into::into),
                    filename.as_deref(),
                    Some(&progress),
                )
                .await?;
            println!("✅ Downloaded: {} ({})", result.title, result.quality);
            println!("   Path: {}", result.path.display());
        }
        Commands::DownloadFavorite {
            media_id,
            max,
            quality,
        } => {
            let display = BatchProgressDisplay::new();
            let progress = BatchProgressDisplay::new().into_callback();
            let result = bili
                .download_favorite_list(media_id, max, quality.map(Into::into), Some(&progress))
                .await?;
            display.finish(&result);
            println!("   Directory: {}", result.directory.display());
        }
    }

    Ok(())
}
