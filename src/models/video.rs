//! Video and DASH audio stream models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::common::{null_default, Upper};

/// One page (part) of a video.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoPage {
    pub cid: u64,
    /// 1-based page number.
    pub page: u32,
    pub part: String,
    pub duration: u64,
}

/// Video metadata from `web-interface/view`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoInfo {
    pub bvid: String,
    pub aid: u64,
    /// cid of the first page.
    pub cid: u64,
    pub title: String,
    pub desc: String,
    pub pic: String,
    pub duration: u64,
    pub owner: Upper,
    #[serde(deserialize_with = "null_default")]
    pub pages: Vec<VideoPage>,
}

impl VideoInfo {
    /// cid of the page at `index` (0-based). Falls back to the top-level cid
    /// for the first page when the page list is missing.
    pub fn page_cid(&self, index: usize) -> Option<u64> {
        match self.pages.get(index) {
            Some(page) => Some(page.cid),
            None if index == 0 && self.pages.is_empty() && self.cid != 0 => Some(self.cid),
            None => None,
        }
    }
}

/// DASH audio track ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioQuality {
    #[serde(rename = "64K")]
    K64,
    #[serde(rename = "132K")]
    K132,
    #[serde(rename = "192K")]
    K192,
    #[serde(rename = "DOLBY")]
    Dolby,
    #[serde(rename = "HI_RES")]
    HiRes,
}

impl AudioQuality {
    /// All qualities, best first.
    pub fn all() -> &'static [AudioQuality] {
        &[
            AudioQuality::HiRes,
            AudioQuality::Dolby,
            AudioQuality::K192,
            AudioQuality::K132,
            AudioQuality::K64,
        ]
    }

    /// Numeric id used by the play URL API.
    pub fn id(&self) -> u32 {
        match self {
            AudioQuality::K64 => 30216,
            AudioQuality::K132 => 30232,
            AudioQuality::K192 => 30280,
            AudioQuality::Dolby => 30250,
            AudioQuality::HiRes => 30251,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::all().iter().copied().find(|q| q.id() == id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioQuality::K64 => "64K",
            AudioQuality::K132 => "132K",
            AudioQuality::K192 => "192K",
            AudioQuality::Dolby => "DOLBY",
            AudioQuality::HiRes => "HI_RES",
        }
    }

    /// Higher is better.
    pub fn rank(&self) -> u8 {
        match self {
            AudioQuality::K64 => 0,
            AudioQuality::K132 => 1,
            AudioQuality::K192 => 2,
            AudioQuality::Dolby => 3,
            AudioQuality::HiRes => 4,
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AudioQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::all()
            .iter()
            .copied()
            .find(|q| q.name() == normalized)
            .ok_or_else(|| format!("unknown audio quality: {}", s))
    }
}

/// A downloadable audio track of a video page.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioStream {
    pub quality: AudioQuality,
    pub url: String,
    pub backup_urls: Vec<String>,
    pub bandwidth: u64,
    pub codecs: String,
}

/// Raw DASH audio entry. The API sends both camelCase and snake_case copies
/// of the URL fields; only the camelCase ones are read.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DashAudio {
    pub id: u32,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "backupUrl", deserialize_with = "null_default")]
    pub backup_url: Vec<String>,
    pub bandwidth: u64,
    pub codecs: String,
}

impl DashAudio {
    fn into_stream(self) -> Option<AudioStream> {
        let quality = AudioQuality::from_id(self.id)?;
        if self.base_url.is_empty() {
            return None;
        }
        Some(AudioStream {
            quality,
            url: self.base_url,
            backup_urls: self.backup_url,
            bandwidth: self.bandwidth,
            codecs: self.codecs,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DashDolby {
    #[serde(deserialize_with = "null_default")]
    pub audio: Vec<DashAudio>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct DashFlac {
    pub audio: Option<DashAudio>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Dash {
    #[serde(deserialize_with = "null_default")]
    pub audio: Vec<DashAudio>,
    pub dolby: Option<DashDolby>,
    pub flac: Option<DashFlac>,
}

/// `data` of `player/wbi/playurl`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PlayUrl {
    pub dash: Option<Dash>,
}

impl PlayUrl {
    /// Every audio track (plain, Dolby, Hi-Res) with a known quality.
    pub fn audio_streams(self) -> Vec<AudioStream> {
        let Some(dash) = self.dash else {
            return Vec::new();
        };
        let dolby = dash.dolby.map(|d| d.audio).unwrap_or_default();
        let flac = dash.flac.and_then(|f| f.audio);

        dash.audio
            .into_iter()
            .chain(dolby)
            .chain(flac)
            .filter_map(DashAudio::into_stream)
            .collect()
    }
}

/// Best stream: highest quality, then highest bandwidth.
pub fn best_stream(streams: &[AudioStream]) -> Option<&AudioStream> {
    streams
        .iter()
        .max_by_key(|s| (s.quality.rank(), s.bandwidth))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_playurl() -> PlayUrl {
        serde_json::from_value(json!({
            "dash": {
                "audio": [
                    {"id": 30216, "baseUrl": "https://cdn/64.m4s", "base_url": "https://cdn/64.m4s",
                     "backupUrl": ["https://bak/64.m4s"], "backup_url": ["https://bak/64.m4s"],
                     "bandwidth": 67000, "codecs": "mp4a.40.2"},
                    {"id": 30280, "baseUrl": "https://cdn/192.m4s", "backupUrl": null,
                     "bandwidth": 190000, "codecs": "mp4a.40.2"},
                    {"id": 30232, "baseUrl": "https://cdn/132.m4s", "bandwidth": 130000}
                ],
                "dolby": {"type": 0, "audio": null},
                "flac": {"display": true, "audio": {"id": 30251, "baseUrl": "https://cdn/flac.m4s",
                         "bandwidth": 900000, "codecs": "fLaC"}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_audio_streams_collects_all_tracks() {
        let streams = sample_playurl().audio_streams();
        assert_eq!(streams.len(), 4);
        assert_eq!(streams[0].quality, AudioQuality::K64);
        assert_eq!(streams[0].backup_urls, vec!["https://bak/64.m4s".to_string()]);
        assert!(streams[1].backup_urls.is_empty());
        assert_eq!(streams[3].quality, AudioQuality::HiRes);
    }

    #[test]
    fn test_best_stream_prefers_hi_res() {
        let streams = sample_playurl().audio_streams();
        let best = best_stream(&streams).unwrap();
        assert_eq!(best.quality, AudioQuality::HiRes);
        assert_eq!(best.url, "https://cdn/flac.m4s");

        let plain: Vec<AudioStream> = streams
            .into_iter()
            .filter(|s| s.quality != AudioQuality::HiRes)
            .collect();
        assert_eq!(best_stream(&plain).unwrap().quality, AudioQuality::K192);
        assert!(best_stream(&[]).is_none());
    }

    #[test]
    fn test_no_dash() {
        let play: PlayUrl = serde_json::from_value(json!({"durl": []})).unwrap();
        assert!(play.audio_streams().is_empty());
    }

    #[test]
    fn test_quality_parse() {
        assert_eq!("hi-res".parse::<AudioQuality>().unwrap(), AudioQuality::HiRes);
        assert_eq!("192k".parse::<AudioQuality>().unwrap(), AudioQuality::K192);
        assert!("320K".parse::<AudioQuality>().is_err());
        assert_eq!(AudioQuality::from_id(30250), Some(AudioQuality::Dolby));
        assert_eq!(AudioQuality::Dolby.to_string(), "DOLBY");
    }

    #[test]
    fn test_page_cid() {
        let info = VideoInfo {
            cid: 11,
            pages: vec![
                VideoPage { cid: 11, page: 1, ..Default::default() },
                VideoPage { cid: 22, page: 2, ..Default::default() },
            ],
            ..Default::default()
        };
        assert_eq!(info.page_cid(1), Some(22));
        assert_eq!(info.page_cid(2), None);

        let bare = VideoInfo { cid: 5, ..Default::default() };
        assert_eq!(bare.page_cid(0), Some(5));
        assert_eq!(bare.page_cid(1), None);
    }
}
