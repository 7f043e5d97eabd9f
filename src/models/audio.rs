//! Music-area audio models.

use serde::{Deserialize, Serialize};

use super::common::null_default;

/// Song metadata from `music-service-c/web/song/info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioInfo {
    /// AU number.
    pub id: u64,
    pub uid: u64,
    pub uname: String,
    pub author: String,
    pub title: String,
    pub cover: String,
    pub intro: String,
    pub lyric: String,
    /// Seconds.
    pub duration: u64,
    pub passtime: i64,
    pub curtime: i64,
    /// Linked video, 0 when none.
    pub aid: u64,
    pub bvid: String,
    pub cid: u64,
}

/// A quality offered for an audio.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioQualityInfo {
    #[serde(rename = "type")]
    pub kind: i32,
    pub desc: String,
    pub size: u64,
    pub bps: String,
    pub tag: String,
    pub require: i32,
    pub requiredesc: String,
}

/// Resolved download location from `music-service-c/web/url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioDownloadUrl {
    pub sid: u64,
    #[serde(rename = "type")]
    pub kind: i32,
    pub info: String,
    /// Seconds until the URLs expire.
    pub timeout: u64,
    pub size: u64,
    #[serde(deserialize_with = "null_default")]
    pub cdns: Vec<String>,
    #[serde(deserialize_with = "null_default")]
    pub qualities: Vec<AudioQualityInfo>,
    pub title: String,
    pub cover: String,
}

impl AudioDownloadUrl {
    /// Primary CDN URL.
    pub fn url(&self) -> Option<&str> {
        self.cdns.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_download_url_parse() {
        let url: AudioDownloadUrl = serde_json::from_value(json!({
            "sid": 15664, "type": 2, "info": "", "timeout": 10800, "size": 9216000,
            "cdns": ["https://upos.example/a.m4a", "https://backup.example/a.m4a"],
            "qualities": null, "title": "song", "cover": ""
        }))
        .unwrap();
        assert_eq!(url.url(), Some("https://upos.example/a.m4a"));
        assert!(url.qualities.is_empty());
        assert_eq!(url.size, 9216000);
    }

    #[test]
    fn test_download_url_without_cdns() {
        let url: AudioDownloadUrl = serde_json::from_value(json!({"sid": 1})).unwrap();
        assert_eq!(url.url(), None);
    }
}
