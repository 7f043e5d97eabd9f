//! WBI request signing.
//!
//! Some endpoints reject requests whose query lacks a `wts` timestamp and a
//! `w_rid` digest. The digest is the MD5 of the sorted, percent-encoded query
//! followed by a "mixin key" derived from two keys published by the nav
//! endpoint.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use md5::{Digest, Md5};

/// How long fetched keys are reused before asking the nav endpoint again.
pub const KEY_TTL: Duration = Duration::from_secs(3600);

const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22, 25,
    54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

/// Characters the server strips from values before hashing.
const FILTERED_CHARS: [char; 5] = ['!', '\'', '(', ')', '*'];

/// Cached mixin key.
#[derive(Debug, Clone)]
pub(crate) struct WbiKeys {
    pub mixin_key: String,
    pub fetched_at: Instant,
}

impl WbiKeys {
    pub fn new(mixin_key: String) -> Self {
        Self {
            mixin_key,
            fetched_at: Instant::now(),
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < KEY_TTL
    }
}

/// Extract a key from an `img_url`/`sub_url`: the file name without extension.
pub fn key_from_url(url: &str) -> String {
    let name = url.rsplit('/').next().unwrap_or(url);
    name.split('.').next().unwrap_or(name).to_string()
}

/// Shuffle `img_key + sub_key` through the fixed table and keep 32 chars.
pub fn mixin_key(img_key: &str, sub_key: &str) -> String {
    let raw: Vec<char> = format!("{}{}", img_key, sub_key).chars().collect();
    MIXIN_KEY_ENC_TAB
        .iter()
        .filter_map(|&i| raw.get(i))
        .take(32)
        .collect()
}

/// Current unix time in seconds.
pub fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Build the signed query string (`...&wts=..&w_rid=..`).
pub fn sign(params: &[(String, String)], mixin_key: &str, wts: u64) -> String {
    let mut params: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (k.clone(), v.replace(FILTERED_CHARS, "")))
        .collect();
    params.push(("wts".to_string(), wts.to_string()));
    params.sort_by(|a, b| a.0.cmp(&b.0));

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Md5::digest(format!("{}{}", query, mixin_key).as_bytes());
    format!("{}&w_rid={}", query, hex::encode(digest))
}
