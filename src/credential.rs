//! Login credential.

use serde::{Deserialize, Serialize};

use crate::error::{BiliError, Result};

/// Session cookies identifying a logged-in user.
///
/// Every field may be empty. Operations that need a particular cookie check
/// for it up front and fail with [`BiliError::MissingCredential`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// `SESSDATA` session token.
    pub sessdata: String,
    /// `bili_jct` CSRF token.
    pub bili_jct: String,
    /// `DedeUserID`, the numeric user id as a string.
    pub dedeuserid: String,
    /// Refresh token handed out by QR login.
    pub ac_time_value: String,
    /// `buvid3` device cookie.
    pub buvid3: String,
}

impl Credential {
    /// Create a credential from the three core cookies.
    pub fn new<S1, S2, S3>(sessdata: S1, bili_jct: S2, dedeuserid: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            sessdata: sessdata.into(),
            bili_jct: bili_jct.into(),
            dedeuserid: dedeuserid.into(),
            ..Default::default()
        }
    }

    pub fn has_sessdata(&self) -> bool {
        !self.sessdata.is_empty()
    }

    pub fn has_bili_jct(&self) -> bool {
        !self.bili_jct.is_empty()
    }

    pub fn has_dedeuserid(&self) -> bool {
        !self.dedeuserid.is_empty()
    }

    pub fn require_sessdata(&self) -> Result<()> {
        if self.has_sessdata() {
            Ok(())
        } else {
            Err(BiliError::MissingCredential("SESSDATA"))
        }
    }

    pub fn require_bili_jct(&self) -> Result<()> {
        if self.has_bili_jct() {
            Ok(())
        } else {
            Err(BiliError::MissingCredential("bili_jct"))
        }
    }

    pub fn require_dedeuserid(&self) -> Result<()> {
        if self.has_dedeuserid() {
            Ok(())
        } else {
            Err(BiliError::MissingCredential("DedeUserID"))
        }
    }

    /// Numeric user id from `DedeUserID`.
    pub fn uid(&self) -> Result<u64> {
        self.require_dedeuserid()?;
        self.dedeuserid
            .trim()
            .parse()
            .map_err(|_| BiliError::MissingCredential("DedeUserID"))
    }

    /// True when no cookie is set at all.
    pub fn is_empty(&self) -> bool {
        self.cookies().next().is_none()
    }

    /// Non-empty cookies as `(name, value)` pairs.
    pub fn cookies(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("SESSDATA", self.sessdata.as_str()),
            ("bili_jct", self.bili_jct.as_str()),
            ("DedeUserID", self.dedeuserid.as_str()),
            ("buvid3", self.buvid3.as_str()),
        ]
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
    }

    /// Value for a `Cookie` request header, `None` if nothing is set.
    pub fn cookie_header(&self) -> Option<String> {
        let header = self
            .cookies()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            None
        } else {
            Some(header)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_require_fields() {
        let cred = Credential::new("sess", "", "42");
        assert_ok!(cred.require_sessdata());
        assert_ok!(cred.require_dedeuserid());
        match cred.require_bili_jct() {
            Err(BiliError::MissingCredential(field)) => assert_eq!(field, "bili_jct"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_cookie_header_skips_empty() {
        let cred = Credential::new("sess%2C1", "", "42");
        assert_eq!(
            cred.cookie_header().as_deref(),
            Some("SESSDATA=sess%2C1; DedeUserID=42")
        );
        assert_eq!(Credential::default().cookie_header(), None);
        assert!(Credential::default().is_empty());
    }

    #[test]
    fn test_uid() {
        assert_eq!(assert_ok!(Credential::new("", "", "123456").uid()), 123456);
        assert_err!(Credential::new("", "", "abc").uid());
        assert_err!(Credential::default().uid());
    }
}
