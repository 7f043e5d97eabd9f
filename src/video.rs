//! Videos: metadata, titles and DASH audio streams.

use tracing::debug;

use crate::api::ApiClient;
use crate::bvid::VideoId;
use crate::credential::Credential;
use crate::error::{BiliError, Result};
use crate::models::video::{best_stream, PlayUrl};
use crate::models::{AudioStream, VideoInfo};

const VIEW: &str = "/x/web-interface/view";
const PLAYURL: &str = "/x/player/wbi/playurl";

/// DASH with HDR, 4K, Dolby audio, Dolby vision, 8K and AV1 flags set.
const FNVAL_ALL_DASH: u32 = 4048;

/// Fetch the title of a video.
pub async fn get_video_title(
    client: &ApiClient,
    id: VideoId,
    credential: &Credential,
) -> Result<String> {
    let mut video = Video::with_client(client.clone(), id, credential.clone());
    video.get_title().await
}

/// A video identified by BV code or AV number.
///
/// # Example
///
/// ```rust,no_run
/// use minibili::{Credential, Video, VideoId};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut video = Video::new(VideoId::parse("BV1GJ411x7h7")?, Credential::default());
///     println!("{}", video.get_title().await?);
///     if let Some(best) = video.get_best_audio_stream(0).await? {
///         println!("{} {}", best.quality, best.url);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Video {
    id: VideoId,
    client: ApiClient,
    credential: Credential,
    info: Option<VideoInfo>,
}

impl Video {
    pub fn new(id: VideoId, credential: Credential) -> Self {
        Self::with_client(ApiClient::default(), id, credential)
    }

    pub fn with_client(client: ApiClient, id: VideoId, credential: Credential) -> Self {
        Self {
            id,
            client,
            credential,
            info: None,
        }
    }

    pub fn id(&self) -> &VideoId {
        &self.id
    }

    /// Metadata from the last `get_info` call.
    pub fn info(&self) -> Option<&VideoInfo> {
        self.info.as_ref()
    }

    /// Fetch video metadata.
    pub async fn get_info(&mut self) -> Result<VideoInfo> {
        let (key, value) = self.id.query_param();
        let info: VideoInfo = self
            .client
            .get(self.client.api_url(VIEW))
            .param(key, value)
            .credential(&self.credential)
            .result_as()
            .await?;
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Title, fetching metadata on first use.
    pub async fn get_title(&mut self) -> Result<String> {
        Ok(self.cached_info().await?.title.clone())
    }

    /// All audio tracks of page `page_index` (0-based).
    pub async fn get_audio_streams(&mut self, page_index: usize) -> Result<Vec<AudioStream>> {
        let (cid, bvid, pages) = {
            let info = self.cached_info().await?;
            (info.page_cid(page_index), info.bvid.clone(), info.pages.len())
        };
        let cid = cid.ok_or_else(|| {
            BiliError::NoData(format!(
                "{} has no page {} ({} pages)",
                self.id,
                page_index + 1,
                pages
            ))
        })?;
        let (key, value) = if bvid.is_empty() {
            self.id.query_param()
        } else {
            ("bvid", bvid)
        };

        let play: PlayUrl = self
            .client
            .get(self.client.api_url(PLAYURL))
            .param(key, value)
            .param("cid", cid)
            .param("fnval", FNVAL_ALL_DASH)
            .param("fnver", 0)
            .param("fourk", 1)
            .credential(&self.credential)
            .wbi(true)
            .result_as()
            .await?;

        let streams = play.audio_streams();
        debug!("{} page {}: {} audio streams", self.id, page_index + 1, streams.len());
        Ok(streams)
    }

    /// Highest-quality audio track of page `page_index`, if any.
    pub async fn get_best_audio_stream(&mut self, page_index: usize) -> Result<Option<AudioStream>> {
        let streams = self.get_audio_streams(page_index).await?;
        Ok(best_stream(&streams).cloned())
    }

    async fn cached_info(&mut self) -> Result<&VideoInfo> {
        if self.info.is_none() {
            self.get_info().await?;
        }
        self.info
            .as_ref()
            .ok_or_else(|| BiliError::NoData(format!("no info for {}", self.id)))
    }
}
