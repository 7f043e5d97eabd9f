//! Music-area audio (AU numbers).

use crate::api::ApiClient;
use crate::credential::Credential;
use crate::error::{BiliError, Result};
use crate::models::{AudioDownloadUrl, AudioInfo};

const SONG_INFO: &str = "/audio/music-service-c/web/song/info";
const SONG_URL: &str = "/audio/music-service-c/web/url";

/// Resolve the download URL of audio `auid`.
///
/// # Errors
///
/// Returns `NoData` when the response lists no CDN URL.
pub async fn get_audio_download_url(
    client: &ApiClient,
    auid: u64,
    credential: &Credential,
) -> Result<AudioDownloadUrl> {
    let url: AudioDownloadUrl = client
        .get(client.www_url(SONG_URL))
        .param("sid", auid)
        .param("privilege", 2)
        .param("quality", 2)
        .credential(credential)
        .result_as()
        .await?;
    if url.url().is_none() {
        return Err(BiliError::NoData(format!("no download URL for au{}", auid)));
    }
    Ok(url)
}

/// An audio identified by its AU number.
#[derive(Debug, Clone)]
pub struct Audio {
    auid: u64,
    client: ApiClient,
    credential: Credential,
    info: Option<AudioInfo>,
    download_url: Option<AudioDownloadUrl>,
}

impl Audio {
    pub fn new(auid: u64, credential: Credential) -> Self {
        Self::with_client(ApiClient::default(), auid, credential)
    }

    pub fn with_client(client: ApiClient, auid: u64, credential: Credential) -> Self {
        Self {
            auid,
            client,
            credential,
            info: None,
            download_url: None,
        }
    }

    pub fn auid(&self) -> u64 {
        self.auid
    }

    pub fn info(&self) -> Option<&AudioInfo> {
        self.info.as_ref()
    }

    pub fn download_url(&self) -> Option<&AudioDownloadUrl> {
        self.download_url.as_ref()
    }

    /// Fetch song metadata.
    pub async fn get_info(&mut self) -> Result<AudioInfo> {
        let info: AudioInfo = self
            .client
            .get(self.client.www_url(SONG_INFO))
            .param("sid", self.auid)
            .credential(&self.credential)
            .result_as()
            .await?;
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Resolve the download URL.
    pub async fn get_download_url(&mut self) -> Result<AudioDownloadUrl> {
        let url = get_audio_download_url(&self.client, self.auid, &self.credential).await?;
        self.download_url = Some(url.clone());
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use serde_json::json;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::with_endpoints(Endpoints::with_base(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_get_info() {
        let server = MockServer::start().await;
        Mock::given(path(SONG_INFO))
            .and(query_param("sid", "15664"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "msg": "success",
                "data": {"id": 15664, "title": "song", "uname": "up", "duration": 240,
                         "bvid": "BV1xx411c7mD", "statistic": {"play": 1}}
            })))
            .mount(&server)
            .await;

        let mut audio = Audio::with_client(client_for(&server), 15664, Credential::default());
        let info = audio.get_info().await.unwrap();
        assert_eq!(info.title, "song");
        assert_eq!(info.duration, 240);
        assert_eq!(audio.info().unwrap().uname, "up");
    }

    #[tokio::test]
    async fn test_get_download_url() {
        let server = MockServer::start().await;
        Mock::given(path(SONG_URL))
            .and(query_param("sid", "15664"))
            .and(query_param("privilege", "2"))
            .and(query_param("quality", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "msg": "success",
                "data": {"sid": 15664, "type": 1, "timeout": 10800, "size": 100,
                         "cdns": ["https://cdn.example/15664.m4a"]}
            })))
            .mount(&server)
            .await;

        let mut audio = Audio::with_client(client_for(&server), 15664, Credential::default());
        let url = audio.get_download_url().await.unwrap();
        assert_eq!(url.url(), Some("https://cdn.example/15664.m4a"));
        assert!(audio.download_url().is_some());
    }

    #[tokio::test]
    async fn test_download_url_error_code() {
        let server = MockServer::start().await;
        Mock::given(path(SONG_URL))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 72000000, "msg": "参数错误", "data": null
            })))
            .mount(&server)
            .await;

        let err = get_audio_download_url(&client_for(&server), 1, &Credential::default())
            .await
            .unwrap_err();
        assert_eq!(err.api_code(), Some(72000000));
    }

    #[tokio::test]
    async fn test_download_url_without_cdn() {
        let server = MockServer::start().await;
        Mock::given(path(SONG_URL))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "data": {"sid": 1, "cdns": null}
            })))
            .mount(&server)
            .await;

        let err = get_audio_download_url(&client_for(&server), 1, &Credential::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BiliError::NoData(_)));
    }
}
