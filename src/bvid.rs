//! Video identifiers and BV/AV conversion.

use std::fmt;
use std::str::FromStr;

use crate::error::{BiliError, Result};

const XOR_CODE: u64 = 23442827791579;
const MASK_CODE: u64 = 2251799813685247;
const MAX_AID: u64 = 1 << 51;
const BASE: u64 = 58;
const ALPHABET: &[u8; 58] = b"FcwAPNKTMug3GV5Lj7EJnHpWsx4tb8haYeviqBz6rkCy12mUSDQX9RdoZf";
/// Position in the 9-char body that receives each base-58 digit.
const ENCODE_MAP: [usize; 9] = [8, 7, 0, 5, 1, 3, 2, 4, 6];
const PREFIX: &str = "BV1";

/// Convert an AV number to its BV code.
pub fn av2bv(aid: u64) -> Result<String> {
    if aid == 0 || aid >= MAX_AID {
        return Err(BiliError::InvalidVideoId(format!("av{}", aid)));
    }
    let mut body = [0u8; 9];
    let mut tmp = (MAX_AID | aid) ^ XOR_CODE;
    for &pos in &ENCODE_MAP {
        body[pos] = ALPHABET[(tmp % BASE) as usize];
        tmp /= BASE;
    }
    // ALPHABET is ASCII
    Ok(format!("{}{}", PREFIX, String::from_utf8_lossy(&body)))
}

/// Convert a BV code to its AV number.
pub fn bv2av(bvid: &str) -> Result<u64> {
    let invalid = || BiliError::InvalidVideoId(bvid.to_string());
    let body = bvid
        .get(..3)
        .filter(|p| p.eq_ignore_ascii_case(PREFIX))
        .and_then(|_| bvid.get(3..))
        .filter(|b| b.len() == 9)
        .ok_or_else(invalid)?
        .as_bytes();

    let mut tmp: u64 = 0;
    for &pos in ENCODE_MAP.iter().rev() {
        let digit = ALPHABET
            .iter()
            .position(|&c| c == body[pos])
            .ok_or_else(invalid)?;
        tmp = tmp * BASE + digit as u64;
    }
    Ok((tmp & MASK_CODE) ^ XOR_CODE)
}

/// A video identifier: BV code or AV number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VideoId {
    Bvid(String),
    Aid(u64),
}

impl VideoId {
    /// Parse `BV1xx411c7mD`, `av170001`, `AV170001` or `170001`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let prefix = s.get(..2).unwrap_or_default();
        if prefix.eq_ignore_ascii_case("bv") {
            bv2av(s)?;
            return Ok(VideoId::Bvid(format!("BV{}", &s[2..])));
        }
        let digits = if prefix.eq_ignore_ascii_case("av") {
            &s[2..]
        } else {
            s
        };
        match digits.parse::<u64>() {
            Ok(aid) if aid > 0 => Ok(VideoId::Aid(aid)),
            _ => Err(BiliError::InvalidVideoId(s.to_string())),
        }
    }

    /// BV form, converting if needed.
    pub fn bvid(&self) -> Result<String> {
        match self {
            VideoId::Bvid(bvid) => Ok(bvid.clone()),
            VideoId::Aid(aid) => av2bv(*aid),
        }
    }

    /// AV form, converting if needed.
    pub fn aid(&self) -> Result<u64> {
        match self {
            VideoId::Bvid(bvid) => bv2av(bvid),
            VideoId::Aid(aid) => Ok(*aid),
        }
    }

    /// The query parameter that identifies this video.
    pub fn query_param(&self) -> (&'static str, String) {
        match self {
            VideoId::Bvid(bvid) => ("bvid", bvid.clone()),
            VideoId::Aid(aid) => ("aid", aid.to_string()),
        }
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoId::Bvid(bvid) => f.write_str(bvid),
            VideoId::Aid(aid) => write!(f, "av{}", aid),
        }
    }
}

impl FromStr for VideoId {
    type Err = BiliError;

    fn from_str(s: &str) -> Result<Self> {
        VideoId::parse(s)
    }
}

impl From<u64> for VideoId {
    fn from(aid: u64) -> Self {
        VideoId::Aid(aid)
    }
}
