//! High-level entry point tying the client, credential and settings together.

use std::path::{Path, PathBuf};

use crate::api::ApiClient;
use crate::audio::Audio;
use crate::bvid::VideoId;
use crate::config::{ClientConfig, DownloadConfig, LoginConfig};
use crate::credential::Credential;
use crate::downloader::{
    BatchDownloadResult, BatchProgressCallback, DownloadResult, Downloader,
    FavoriteListDownloader, ProgressCallback, VideoDownloader,
};
use crate::error::Result;
use crate::favorite_list::{get_video_favorite_list, FavoriteList};
use crate::login::QrCodeLogin;
use crate::models::{AudioDownloadUrl, AudioQuality, FavoriteFolderList};
use crate::video::Video;

/// Main Bilibili interface.
///
/// Holds one shared [`ApiClient`], the session [`Credential`] and the login
/// and download settings, and hands out resource objects bound to them.
///
/// # Example
///
/// ```rust,no_run
/// use minibili::{Bilibili, Credential};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let bili = Bilibili::new(Credential::new("sessdata", "bili_jct", "12345"))?;
///
///     // List folders of the logged-in user
///     let folders = bili.get_favorite_lists(None).await?;
///     for folder in &folders.list {
///         println!("{} {}", folder.id, folder.title);
///     }
///
///     // Download the best audio of a video
///     let result = bili.download_audio("BV1GJ411x7h7", None, None).await?;
///     println!("Downloaded: {}", result.path.display());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Bilibili {
    client: ApiClient,
    credential: Credential,
    login_config: LoginConfig,
    downloader: Downloader,
    /// Default output directory for downloads.
    output_dir: PathBuf,
}

impl Bilibili {
    /// Create an instance with default client settings.
    pub fn new(credential: Credential) -> Result<Self> {
        Self::with_config(
            credential,
            &ClientConfig::default(),
            LoginConfig::default(),
            DownloadConfig::default(),
        )
    }

    pub fn with_config(
        credential: Credential,
        client_config: &ClientConfig,
        login_config: LoginConfig,
        download_config: DownloadConfig,
    ) -> Result<Self> {
        let client = ApiClient::new(client_config)?;
        Ok(Self::with_client(client, credential, login_config, download_config))
    }

    pub fn with_client(
        client: ApiClient,
        credential: Credential,
        login_config: LoginConfig,
        download_config: DownloadConfig,
    ) -> Self {
        let downloader = Downloader::new(client.clone(), download_config.max_concurrent);
        Self {
            client,
            credential,
            login_config,
            downloader,
            output_dir: download_config.output_dir,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Replace the session, e.g. after a QR login.
    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = credential;
    }

    /// Set the output directory for downloads.
    pub fn set_output_dir<P: AsRef<Path>>(&mut self, path: P) {
        self.output_dir = path.as_ref().to_path_buf();
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    // ==================
    // LOGIN
    // ==================

    /// A QR login flow using this client and the configured poll settings.
    pub fn qr_login(&self) -> QrCodeLogin {
        QrCodeLogin::with_client(self.client.clone(), self.login_config.clone())
    }

    /// Run the terminal QR login and keep the resulting credential.
    pub async fn login(&mut self) -> Result<&Credential> {
        let credential = self.qr_login().auto_login().await?;
        self.credential = credential;
        Ok(&self.credential)
    }

    // ==================
    // RESOURCES
    // ==================

    pub fn favorite_list(&self, media_id: u64) -> FavoriteList {
        FavoriteList::with_client(self.client.clone(), media_id, self.credential.clone())
    }

    pub fn audio(&self, auid: u64) -> Audio {
        Audio::with_client(self.client.clone(), auid, self.credential.clone())
    }

    pub fn video(&self, id: VideoId) -> Video {
        Video::with_client(self.client.clone(), id, self.credential.clone())
    }

    /// Video folders of `uid`, or of the logged-in user when `None`.
    pub async fn get_favorite_lists(&self, uid: Option<u64>) -> Result<FavoriteFolderList> {
        get_video_favorite_list(&self.client, uid, &self.credential).await
    }

    /// Title of a video given as BV code or AV number.
    pub async fn get_video_title(&self, video: &str) -> Result<String> {
        self.video(VideoId::parse(video)?).get_title().await
    }

    pub async fn get_audio_download_url(&self, auid: u64) -> Result<AudioDownloadUrl> {
        self.audio(auid).get_download_url().await
    }

    // ==================
    // DOWNLOADING
    // ==================

    /// Download the first page's audio of a video to the output directory.
    pub async fn download_audio(
        &self,
        video: &str,
        quality: Option<AudioQuality>,
        progress: Option<&ProgressCallback>,
    ) -> Result<DownloadResult> {
        let video = self.video(VideoId::parse(video)?);
        let mut downloader =
            VideoDownloader::with_downloader(video, &self.output_dir, self.downloader.clone());
        downloader.download_audio(0, quality, None, progress).await
    }

    /// Download the audio of every video in a favorite list.
    pub async fn download_favorite_list(
        &self,
        media_id: u64,
        max_videos: Option<usize>,
        quality: Option<AudioQuality>,
        progress: Option<&BatchProgressCallback>,
    ) -> Result<BatchDownloadResult> {
        let mut downloader = FavoriteListDownloader::with_downloader(
            self.favorite_list(media_id),
            &self.output_dir,
            self.downloader.clone(),
        );
        downloader
            .download_all_audios(max_videos, quality, progress)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use crate::error::BiliError;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{header, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bili_for(server: &MockServer, credential: Credential) -> Bilibili {
        let client = ApiClient::with_endpoints(Endpoints::with_base(server.uri())).unwrap();
        Bilibili::with_client(client, credential, LoginConfig::default(), DownloadConfig::default())
    }

    #[test]
    fn test_defaults() {
        let bili = Bilibili::new(Credential::default()).unwrap();
        assert_eq!(bili.output_dir(), Path::new("downloads"));
        assert_eq!(bili.downloader().max_concurrent(), 3);
        assert!(bili.credential().is_empty());
    }

    #[tokio::test]
    async fn test_resources_share_credential() {
        let server = MockServer::start().await;
        Mock::given(path("/x/v3/fav/folder/created/list-all"))
            .and(query_param("up_mid", "27"))
            .and(header("cookie", "SESSDATA=s; bili_jct=j; DedeUserID=27"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "data": {"count": 0, "list": null}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let bili = bili_for(&server, Credential::new("s", "j", "27"));
        let folders = bili.get_favorite_lists(None).await.unwrap();
        assert_eq!(folders.count, 0);
        assert!(folders.list.is_empty());
        assert_eq!(bili.favorite_list(5).media_id(), 5);
        assert_eq!(bili.audio(7).auid(), 7);
    }

    #[tokio::test]
    async fn test_get_video_title_rejects_bad_id() {
        let server = MockServer::start().await;
        let bili = bili_for(&server, Credential::default());
        let err = bili.get_video_title("not-a-video").await.unwrap_err();
        assert!(matches!(err, BiliError::InvalidVideoId(_)));
    }

    #[test]
    fn test_set_output_dir() {
        let dir = tempdir().unwrap();
        let mut bili = Bilibili::new(Credential::default()).unwrap();
        bili.set_output_dir(dir.path());
        assert_eq!(bili.output_dir(), dir.path());
        bili.set_credential(Credential::new("a", "b", "1"));
        assert_eq!(bili.credential().uid().unwrap(), 1);
    }
}
