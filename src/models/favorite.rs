//! Favorite-list (folder) models.

use serde::{Deserialize, Serialize};

use super::common::{null_default, CntInfo, Upper};

/// Media type of a favorited video.
pub const MEDIA_TYPE_VIDEO: i32 = 2;

/// Folder metadata from `fav/folder/info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FavoriteFolder {
    /// Full media id (`fid` followed by the last two digits of the owner's uid).
    pub id: u64,
    pub fid: u64,
    pub mid: u64,
    pub attr: i64,
    pub title: String,
    pub cover: String,
    pub upper: Upper,
    pub cnt_info: CntInfo,
    pub intro: String,
    pub ctime: i64,
    pub mtime: i64,
    pub media_count: u32,
    pub fav_state: i32,
}

impl FavoriteFolder {
    /// Folders with bit 0 of `attr` set are private.
    pub fn is_private(&self) -> bool {
        self.attr & 1 == 1
    }
}

/// A user's folders from `fav/folder/created/list-all`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FavoriteFolderList {
    pub count: u32,
    #[serde(deserialize_with = "null_default")]
    pub list: Vec<FavoriteFolder>,
}

/// One entry of a folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FavoriteMedia {
    /// aid for videos, auid for audio.
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: i32,
    pub title: String,
    pub cover: String,
    pub intro: String,
    /// Number of pages (parts).
    pub page: u32,
    pub duration: u64,
    pub upper: Upper,
    /// Bit 0 set when the media has been taken down.
    pub attr: i64,
    pub cnt_info: CntInfo,
    pub link: String,
    pub ctime: i64,
    pub pubtime: i64,
    pub fav_time: i64,
    pub bvid: String,
}

impl FavoriteMedia {
    pub fn is_video(&self) -> bool {
        self.kind == MEDIA_TYPE_VIDEO
    }

    /// Invalid (deleted) entries are still listed with title "已失效视频".
    pub fn is_invalid(&self) -> bool {
        self.attr & 1 == 1
    }
}

/// One page of folder content from `fav/resource/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FavoriteContent {
    pub info: FavoriteFolder,
    #[serde(deserialize_with = "null_default")]
    pub medias: Vec<FavoriteMedia>,
    pub has_more: bool,
}
