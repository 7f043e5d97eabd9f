//! # minibili
//!
//! A small Rust client for the Bilibili web API: QR login, favorite lists,
//! music-area audio, video titles and audio downloads.
//!
//! ## Quick Start
//!
//! The easiest way to use this library is through the [`Bilibili`] struct:
//!
//! ```rust,no_run
//! use minibili::{Bilibili, Credential};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Log in by scanning the QR code printed to the terminal
//!     let mut bili = Bilibili::new(Credential::default())?;
//!     bili.login().await?;
//!
//!     // Browse favorite lists
//!     let folders = bili.get_favorite_lists(None).await?;
//!     let first = &folders.list[0];
//!     let videos = bili.favorite_list(first.id).get_videos().await?;
//!     println!("{}: {} videos", first.title, videos.len());
//!
//!     // Download the audio of a whole folder
//!     let result = bili.download_favorite_list(first.id, Some(10), None, None).await?;
//!     println!("Downloaded {} of {}", result.successful.len(), result.total());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **QR-code login** producing a reusable [`Credential`]
//! - **Favorite lists**: folders, paged content, every video in a folder
//! - **Audio**: music-area song info and download URLs
//! - **Video**: titles and DASH audio streams (64K to Hi-Res), WBI-signed
//! - **Downloads** with progress callbacks and a shared concurrency limit
//!
//! ## Low-Level APIs
//!
//! For more control, you can use the lower-level APIs directly:
//!
//! - [`ApiClient`] / [`Api`] - Raw requests with cookies and WBI signing
//! - [`Downloader`] - Streaming file downloads
//! - [`bvid`] - BV/AV conversion

pub mod api;
pub mod audio;
mod bilibili;
pub mod bvid;
pub mod config;
pub mod credential;
pub mod downloader;
pub mod error;
pub mod favorite_list;
pub mod login;
pub mod models;
pub mod progress;
pub mod video;

// Main interface (recommended)
pub use bilibili::Bilibili;

// Resources
pub use audio::{get_audio_download_url, Audio};
pub use bvid::{av2bv, bv2av, VideoId};
pub use credential::Credential;
pub use favorite_list::{
    get_video_favorite_list, get_video_favorite_list_content, FavoriteList,
    FavoriteListContentOrder,
};
pub use login::{QrCodeLogin, QrLoginEvent};
pub use video::{get_video_title, Video};

// Downloads
pub use downloader::{
    download_favorite_list_audios, sanitize_filename, BatchDownloadResult,
    BatchProgressCallback, DownloadResult, DownloadStatus, DownloadTask, Downloader,
    FavoriteListDownloader, ProgressCallback, VideoDownloader,
};
pub use progress::{format_size, BatchProgressDisplay, SimpleProgressDisplay};

// Low-level APIs
pub use api::{Api, ApiClient};
pub use config::{ClientConfig, DownloadConfig, Endpoints, LoginConfig};
pub use error::{BiliError, Result};
pub use models::{AudioQuality, AudioStream};
