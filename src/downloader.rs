//! File downloads: single files, bounded batches, video audio and whole
//! favorite lists.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use futures_util::StreamExt;
use reqwest::Response;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::bvid::VideoId;
use crate::credential::Credential;
use crate::error::{BiliError, Result};
use crate::favorite_list::FavoriteList;
use crate::models::video::best_stream;
use crate::models::AudioQuality;
use crate::video::Video;

/// Downloads allowed in flight when nothing else is configured.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Lifecycle of a [`DownloadTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl DownloadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Pending => "pending",
            DownloadStatus::Downloading => "downloading",
            DownloadStatus::Completed => "completed",
            DownloadStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one file transfer, handed to progress callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTask {
    pub url: String,
    pub filepath: PathBuf,
    /// Final path component of `filepath`.
    pub filename: String,
    /// From Content-Length; 0 when the server does not send it.
    pub total_size: u64,
    pub downloaded: u64,
    pub status: DownloadStatus,
    pub error: Option<String>,
}

impl DownloadTask {
    pub fn new<P: Into<PathBuf>>(url: &str, filepath: P) -> Self {
        let filepath = filepath.into();
        let filename = filepath
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            url: url.to_string(),
            filepath,
            filename,
            total_size: 0,
            downloaded: 0,
            status: DownloadStatus::Pending,
            error: None,
        }
    }

    /// Completed fraction in `0.0..=1.0`, if the size is known.
    pub fn fraction(&self) -> Option<f64> {
        if self.total_size == 0 {
            return None;
        }
        Some((self.downloaded as f64 / self.total_size as f64).min(1.0))
    }
}

/// Called on every status change and after every chunk.
pub type ProgressCallback = Arc<dyn Fn(&DownloadTask) + Send + Sync>;

/// Called after each item of a batch with `(current, total, title)`.
pub type BatchProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

fn notify(progress: Option<&ProgressCallback>, task: &DownloadTask) {
    if let Some(callback) = progress {
        callback(task);
    }
}

/// Result of a single audio download.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Path to the downloaded file.
    pub path: PathBuf,
    /// Quality that was actually used.
    pub quality: AudioQuality,
    /// File size in bytes.
    pub size: u64,
    /// Video title.
    pub title: String,
}

/// Result of a batch download (favorite list).
#[derive(Debug, Clone, Default)]
pub struct BatchDownloadResult {
    /// Output directory.
    pub directory: PathBuf,
    /// Successfully downloaded items.
    pub successful: Vec<DownloadResult>,
    /// Failed item titles with error messages.
    pub failed: Vec<(String, String)>,
}

impl BatchDownloadResult {
    /// Total number of items attempted.
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    /// Check if every item was downloaded successfully.
    pub fn all_successful(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Streams URLs to disk with a shared concurrency limit.
///
/// Clones share the limit, so one `Downloader` handed to several callers
/// never runs more than `max_concurrent` transfers at once.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: ApiClient,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new(ApiClient::default(), DEFAULT_MAX_CONCURRENT)
    }
}

impl Downloader {
    /// A `max_concurrent` of 0 is treated as 1.
    pub fn new(client: ApiClient, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            client,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Download `url` to `path`, creating parent directories.
    ///
    /// On failure the task is reported as `Failed`, any partial file is
    /// removed and the error is returned.
    pub async fn download_single<P: AsRef<Path>>(
        &self,
        url: &str,
        path: P,
        progress: Option<&ProgressCallback>,
    ) -> Result<DownloadTask> {
        let mut task = DownloadTask::new(url, path.as_ref());
        notify(progress, &task);

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| BiliError::Download(e.to_string()))?;

        task.status = DownloadStatus::Downloading;
        notify(progress, &task);

        let result = match self.open(&task.url).await {
            Ok(response) => self.write_body(response, &mut task, progress).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                task.status = DownloadStatus::Completed;
                info!("Downloaded {} ({} bytes)", task.filepath.display(), task.downloaded);
                notify(progress, &task);
                Ok(task)
            }
            Err(e) => {
                task.status = DownloadStatus::Failed;
                task.error = Some(e.to_string());
                warn!("Download of {} failed: {}", task.filename, e);
                notify(progress, &task);
                Err(e)
            }
        }
    }

    /// Download every `(url, path)` pair, at most `max_concurrent` at a time.
    ///
    /// Results are in input order.
    pub async fn download_batch(
        &self,
        tasks: &[(String, PathBuf)],
        progress: Option<&ProgressCallback>,
    ) -> Vec<Result<DownloadTask>> {
        let downloads = tasks
            .iter()
            .map(|(url, path)| self.download_single(url, path, progress));
        join_all(downloads).await
    }

    async fn open(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        let response = self.client.http().get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BiliError::Http {
                status,
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn write_body(
        &self,
        response: Response,
        task: &mut DownloadTask,
        progress: Option<&ProgressCallback>,
    ) -> Result<()> {
        task.total_size = response.content_length().unwrap_or(0);
        if let Some(parent) = task.filepath.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&task.filepath).await?;
        let written = async {
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk: Bytes = chunk?;
                file.write_all(&chunk).await?;
                task.downloaded += chunk.len() as u64;
                notify(progress, task);
            }
            file.flush().await?;
            Ok::<(), BiliError>(())
        }
        .await;

        if written.is_err() {
            drop(file);
            if let Err(e) = tokio::fs::remove_file(&task.filepath).await {
                debug!("Could not remove partial file {}: {}", task.filepath.display(), e);
            }
        }
        written
    }
}

/// Replace characters that are invalid in file names.
pub fn sanitize_filename(name: &str) -> String {
    name.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
        .trim()
        .to_string()
}

/// Downloads the audio track of a single video.
#[derive(Debug, Clone)]
pub struct VideoDownloader {
    video: Video,
    download_dir: PathBuf,
    downloader: Downloader,
}

impl VideoDownloader {
    pub fn new<P: Into<PathBuf>>(video: Video, download_dir: P) -> Self {
        Self::with_downloader(video, download_dir, Downloader::default())
    }

    pub fn with_downloader<P: Into<PathBuf>>(
        video: Video,
        download_dir: P,
        downloader: Downloader,
    ) -> Self {
        Self {
            video,
            download_dir: download_dir.into(),
            downloader,
        }
    }

    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Download the audio of page `page_index` (0-based).
    ///
    /// Uses `quality` if given, otherwise the best stream offered. The file
    /// is named `{title}_p{page}_{QUALITY}.m4a` unless `filename` is set.
    ///
    /// # Errors
    ///
    /// `QualityNotFound` if the requested quality is not offered, `NoData`
    /// if the page has no audio at all.
    pub async fn download_audio(
        &mut self,
        page_index: usize,
        quality: Option<AudioQuality>,
        filename: Option<&str>,
        progress: Option<&ProgressCallback>,
    ) -> Result<DownloadResult> {
        let streams = self.video.get_audio_streams(page_index).await?;
        let stream = match quality {
            Some(quality) => streams
                .iter()
                .filter(|s| s.quality == quality)
                .max_by_key(|s| s.bandwidth)
                .ok_or_else(|| BiliError::QualityNotFound(quality.to_string()))?,
            None => best_stream(&streams).ok_or_else(|| {
                BiliError::NoData(format!("no audio stream for {}", self.video.id()))
            })?,
        };
        let (url, quality) = (stream.url.clone(), stream.quality);

        let title = self.video.get_title().await?;
        let filename = match filename {
            Some(name) => name.to_string(),
            None => format!(
                "{}_p{}_{}.m4a",
                sanitize_filename(&title),
                page_index + 1,
                quality
            ),
        };
        let path = self.download_dir.join(filename);

        let task = self
            .downloader
            .download_single(&url, &path, progress)
            .await?;
        Ok(DownloadResult {
            path,
            quality,
            size: task.downloaded,
            title,
        })
    }
}

/// Downloads the audio of every video in a favorite list.
#[derive(Debug, Clone)]
pub struct FavoriteListDownloader {
    favorite_list: FavoriteList,
    download_dir: PathBuf,
    downloader: Downloader,
}

impl FavoriteListDownloader {
    pub fn new<P: Into<PathBuf>>(favorite_list: FavoriteList, download_dir: P) -> Self {
        let downloader = Downloader::new(favorite_list.client().clone(), DEFAULT_MAX_CONCURRENT);
        Self::with_downloader(favorite_list, download_dir, downloader)
    }

    pub fn with_downloader<P: Into<PathBuf>>(
        favorite_list: FavoriteList,
        download_dir: P,
        downloader: Downloader,
    ) -> Self {
        Self {
            favorite_list,
            download_dir: download_dir.into(),
            downloader,
        }
    }

    pub fn favorite_list(&self) -> &FavoriteList {
        &self.favorite_list
    }

    /// Download the first page's audio of each video, one video at a time.
    ///
    /// Per-video failures are collected in the result; only failing to list
    /// the folder is an error.
    pub async fn download_all_audios(
        &mut self,
        max_videos: Option<usize>,
        quality: Option<AudioQuality>,
        progress: Option<&BatchProgressCallback>,
    ) -> Result<BatchDownloadResult> {
        let videos = self.favorite_list.get_videos_limited(max_videos).await?;
        let total = videos.len();
        info!(
            "Downloading audio of {} videos from favorite list {}",
            total,
            self.favorite_list.media_id()
        );

        let mut result = BatchDownloadResult {
            directory: self.download_dir.clone(),
            ..Default::default()
        };

        for (i, media) in videos.into_iter().enumerate() {
            if media.is_invalid() {
                result
                    .failed
                    .push((media.title.clone(), "Video is no longer available".to_string()));
            } else {
                let id = if media.bvid.is_empty() {
                    VideoId::Aid(media.id)
                } else {
                    VideoId::Bvid(media.bvid.clone())
                };
                let video = Video::with_client(
                    self.favorite_list.client().clone(),
                    id,
                    self.favorite_list.credential().clone(),
                );
                let mut video_downloader = VideoDownloader::with_downloader(
                    video,
                    &self.download_dir,
                    self.downloader.clone(),
                );
                match video_downloader.download_audio(0, quality, None, None).await {
                    Ok(download) => result.successful.push(download),
                    Err(e) => {
                        warn!("Skipping {}: {}", media.title, e);
                        result.failed.push((media.title.clone(), e.to_string()));
                    }
                }
            }

            if let Some(callback) = progress {
                callback(i + 1, total, &media.title);
            }
        }

        Ok(result)
    }
}

/// Download the audio of every video in favorite list `media_id`.
pub async fn download_favorite_list_audios<P: Into<PathBuf>>(
    client: &ApiClient,
    media_id: u64,
    credential: &Credential,
    download_dir: P,
    max_videos: Option<usize>,
    quality: Option<AudioQuality>,
    progress: Option<&BatchProgressCallback>,
) -> Result<BatchDownloadResult> {
    let favorite_list = FavoriteList::with_client(client.clone(), media_id, credential.clone());
    let mut downloader = FavoriteListDownloader::new(favorite_list, download_dir);
    downloader
        .download_all_audios(max_videos, quality, progress)
        .await
}
