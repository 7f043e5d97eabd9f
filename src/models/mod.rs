//! Data models for Bilibili API responses.
//!
//! Only the fields this crate uses are modelled; everything else in the
//! payload is ignored. Missing fields fall back to their defaults.

pub mod audio;
pub mod common;
pub mod favorite;
pub mod video;

// Re-exports for convenience
pub use audio::{AudioDownloadUrl, AudioInfo, AudioQualityInfo};
pub use common::{CntInfo, Upper};
pub use favorite::{FavoriteContent, FavoriteFolder, FavoriteFolderList, FavoriteMedia};
pub use video::{AudioQuality, AudioStream, VideoInfo, VideoPage};
