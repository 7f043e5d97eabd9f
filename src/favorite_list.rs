//! Favorite lists (folders).

use std::fmt;

use tracing::debug;

use crate::api::ApiClient;
use crate::credential::Credential;
use crate::error::Result;
use crate::models::{FavoriteContent, FavoriteFolder, FavoriteFolderList, FavoriteMedia};

const FOLDER_INFO: &str = "/x/v3/fav/folder/info";
const FOLDER_LIST_ALL: &str = "/x/v3/fav/folder/created/list-all";
const RESOURCE_LIST: &str = "/x/v3/fav/resource/list";

/// Entries per content page (the API maximum).
pub const PAGE_SIZE: u32 = 20;

/// Sort order of folder content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FavoriteListContentOrder {
    /// Most recently favorited first.
    #[default]
    MTime,
    /// Most played first.
    View,
    /// Newest upload first.
    PubTime,
}

impl FavoriteListContentOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FavoriteListContentOrder::MTime => "mtime",
            FavoriteListContentOrder::View => "view",
            FavoriteListContentOrder::PubTime => "pubtime",
        }
    }
}

impl fmt::Display for FavoriteListContentOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// List the video folders created by `uid`.
///
/// With `uid = None` the credential's own `DedeUserID` is used.
pub async fn get_video_favorite_list(
    client: &ApiClient,
    uid: Option<u64>,
    credential: &Credential,
) -> Result<FavoriteFolderList> {
    let uid = match uid {
        Some(uid) => uid,
        None => credential.uid()?,
    };
    client
        .get(client.api_url(FOLDER_LIST_ALL))
        .param("up_mid", uid)
        .param("type", 2)
        .credential(credential)
        .result_as()
        .await
}

/// One page (1-based) of a folder's content.
pub async fn get_video_favorite_list_content(
    client: &ApiClient,
    media_id: u64,
    page: u32,
    keyword: Option<&str>,
    order: FavoriteListContentOrder,
    credential: &Credential,
) -> Result<FavoriteContent> {
    let mut api = client
        .get(client.api_url(RESOURCE_LIST))
        .param("media_id", media_id)
        .param("pn", page.max(1))
        .param("ps", PAGE_SIZE)
        .param("order", order)
        .param("type", 0)
        .param("tid", 0)
        .credential(credential);
    if let Some(keyword) = keyword.filter(|k| !k.is_empty()) {
        api = api.param("keyword", keyword);
    }
    api.result_as().await
}

/// A favorite folder identified by its media id.
///
/// # Example
///
/// ```rust,no_run
/// use minibili::{Credential, FavoriteList};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut fav = FavoriteList::new(1052622027, Credential::default());
///     let info = fav.get_info().await?;
///     println!("{} ({} items)", info.title, info.media_count);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FavoriteList {
    media_id: u64,
    client: ApiClient,
    credential: Credential,
    info: Option<FavoriteFolder>,
    content: Option<FavoriteContent>,
}

impl FavoriteList {
    pub fn new(media_id: u64, credential: Credential) -> Self {
        Self::with_client(ApiClient::default(), media_id, credential)
    }

    pub fn with_client(client: ApiClient, media_id: u64, credential: Credential) -> Self {
        Self {
            media_id,
            client,
            credential,
            info: None,
            content: None,
        }
    }

    pub fn media_id(&self) -> u64 {
        self.media_id
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Folder info from the last `get_info` call.
    pub fn info(&self) -> Option<&FavoriteFolder> {
        self.info.as_ref()
    }

    /// Page from the last `get_content` call.
    pub fn content(&self) -> Option<&FavoriteContent> {
        self.content.as_ref()
    }

    /// Fetch folder metadata.
    pub async fn get_info(&mut self) -> Result<FavoriteFolder> {
        let info: FavoriteFolder = self
            .client
            .get(self.client.api_url(FOLDER_INFO))
            .param("media_id", self.media_id)
            .credential(&self.credential)
            .result_as()
            .await?;
        self.info = Some(info.clone());
        Ok(info)
    }

    /// Fetch one page of content.
    pub async fn get_content(
        &mut self,
        page: u32,
        keyword: Option<&str>,
        order: FavoriteListContentOrder,
    ) -> Result<FavoriteContent> {
        let content = get_video_favorite_list_content(
            &self.client,
            self.media_id,
            page,
            keyword,
            order,
            &self.credential,
        )
        .await?;
        self.content = Some(content.clone());
        Ok(content)
    }

    /// Every video in the folder, walking pages until `has_more` is false.
    pub async fn get_videos(&mut self) -> Result<Vec<FavoriteMedia>> {
        self.get_videos_limited(None).await
    }

    /// Like [`get_videos`](Self::get_videos), but stops requesting pages once
    /// `limit` videos are collected.
    pub async fn get_videos_limited(&mut self, limit: Option<usize>) -> Result<Vec<FavoriteMedia>> {
        let mut videos = Vec::new();
        let mut page = 1;
        loop {
            let content = get_video_favorite_list_content(
                &self.client,
                self.media_id,
                page,
                None,
                FavoriteListContentOrder::MTime,
                &self.credential,
            )
            .await?;
            debug!(
                "Favorite list {} page {}: {} entries",
                self.media_id,
                page,
                content.medias.len()
            );

            let has_more = content.has_more && !content.medias.is_empty();
            if self.info.is_none() && content.info.id != 0 {
                self.info = Some(content.info.clone());
            }
            videos.extend(content.medias.into_iter().filter(|m| m.is_video()));

            if let Some(limit) = limit {
                if videos.len() >= limit {
                    videos.truncate(limit);
                    break;
                }
            }
            if !has_more {
                break;
            }
            page += 1;
        }
        Ok(videos)
    }
}
