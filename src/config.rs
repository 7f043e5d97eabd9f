//! Client, login and download configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Desktop browser user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0";

/// Referer required by the API and the media CDN.
pub const DEFAULT_REFERER: &str = "https://www.bilibili.com/";

/// Base URLs of the three hosts the client talks to.
///
/// Overridable so tests can point every request at a mock server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// `api.bilibili.com`: favorites, video info, play URLs, nav.
    pub api: String,
    /// `passport.bilibili.com`: QR login.
    pub passport: String,
    /// `www.bilibili.com`: music-area audio.
    pub www: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api: "https://api.bilibili.com".to_string(),
            passport: "https://passport.bilibili.com".to_string(),
            www: "https://www.bilibili.com".to_string(),
        }
    }
}

impl Endpoints {
    /// Use a single base URL for every host.
    pub fn with_base<S: Into<String>>(base: S) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self {
            api: base.clone(),
            passport: base.clone(),
            www: base,
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub referer: String,
    /// Whole-request timeout. Does not apply to download bodies.
    #[serde(with = "secs")]
    pub timeout: Duration,
    #[serde(with = "secs")]
    pub connect_timeout: Duration,
    pub endpoints: Endpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: DEFAULT_REFERER.to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            endpoints: Endpoints::default(),
        }
    }
}

/// QR login polling settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    #[serde(with = "secs")]
    pub poll_interval: Duration,
    /// Total time to wait for confirmation. `None` waits until the QR code
    /// itself expires.
    #[serde(with = "opt_secs")]
    pub timeout: Option<Duration>,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Download settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub max_concurrent: usize,
    pub output_dir: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            output_dir: PathBuf::from("downloads"),
        }
    }
}

mod secs {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    /// Seconds as a non-negative, finite number.
    pub fn from_f64<E: Error>(secs: f64) -> Result<Duration, E> {
        Duration::try_from_secs_f64(secs).map_err(E::custom)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        from_f64(f64::deserialize(d)?)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(d)?
            .map(super::secs::from_f64)
            .transpose()
    }
}
