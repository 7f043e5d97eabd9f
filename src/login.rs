//! QR-code login.
//!
//! The web client asks the passport service for a QR link, shows it, and
//! polls until the mobile app has scanned and confirmed it. The final poll
//! carries the session cookies in a cross-domain URL.

use qrcode::render::unicode;
use qrcode::QrCode;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::api::{check_code, read_json, ApiClient};
use crate::config::LoginConfig;
use crate::credential::Credential;
use crate::error::{BiliError, Result};

const QRCODE_GENERATE: &str = "/x/passport-login/web/qrcode/generate";
const QRCODE_POLL: &str = "/x/passport-login/web/qrcode/poll";
const LOGIN_REFERER: &str = "https://passport.bilibili.com/login";

/// Poll status: QR code not scanned yet.
pub const CODE_NOT_SCANNED: i64 = 86101;
/// Poll status: scanned, waiting for confirmation in the app.
pub const CODE_SCANNED: i64 = 86090;
/// Poll status: QR code expired.
pub const CODE_EXPIRED: i64 = 86038;
/// Poll status: confirmed.
pub const CODE_SUCCESS: i64 = 0;

/// State reported by one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum QrLoginEvent {
    /// Waiting for the app to scan the code.
    Scan,
    /// Scanned, waiting for the user to confirm.
    Confirm,
    /// The code expired.
    Timeout,
    /// Confirmed; the session is ready.
    Done(Credential),
}

/// QR-code login flow.
///
/// # Example
///
/// ```rust,no_run
/// use minibili::QrCodeLogin;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut login = QrCodeLogin::new();
///     let credential = login.auto_login().await?;
///     println!("Logged in as {}", credential.dedeuserid);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct QrCodeLogin {
    client: ApiClient,
    config: LoginConfig,
    qr_key: Option<String>,
    credential: Option<Credential>,
}

impl Default for QrCodeLogin {
    fn default() -> Self {
        Self::new()
    }
}

impl QrCodeLogin {
    pub fn new() -> Self {
        Self::with_client(ApiClient::default(), LoginConfig::default())
    }

    pub fn with_client(client: ApiClient, config: LoginConfig) -> Self {
        Self {
            client,
            config,
            qr_key: None,
            credential: None,
        }
    }

    /// Keep polling until the code itself expires, with no overall timeout.
    pub fn wait_forever(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Key of the current QR code, once generated.
    pub fn qr_key(&self) -> Option<&str> {
        self.qr_key.as_deref()
    }

    /// Credential from a successful login.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Request a new QR code. Returns the link to encode.
    pub async fn generate_qr_code(&mut self) -> Result<String> {
        let data = self
            .client
            .get(self.client.passport_url(QRCODE_GENERATE))
            .header("Referer", LOGIN_REFERER)
            .result()
            .await?;

        let link = data.get("url").and_then(|v| v.as_str()).unwrap_or("");
        let key = data.get("qrcode_key").and_then(|v| v.as_str()).unwrap_or("");
        if link.is_empty() || key.is_empty() {
            return Err(BiliError::NoData(format!("QR code info missing: {}", data)));
        }

        debug!("Generated QR code, key {}", key);
        self.qr_key = Some(key.to_string());
        self.credential = None;
        Ok(link.to_string())
    }

    /// Render `link` as a QR code with Unicode half blocks.
    pub fn render_qr_code(link: &str) -> Result<String> {
        let code = QrCode::new(link.as_bytes()).map_err(|e| BiliError::QrRender(e.to_string()))?;
        Ok(code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .quiet_zone(true)
            .build())
    }

    /// Print the QR code to stdout.
    pub fn display_qr_code(link: &str) -> Result<()> {
        println!("{}", Self::render_qr_code(link)?);
        println!("Scan the QR code with the Bilibili mobile app to log in");
        Ok(())
    }

    /// Poll once.
    ///
    /// # Errors
    ///
    /// `NoData` if no QR code was generated yet; `QrLogin` for a status code
    /// this client does not recognise.
    pub async fn check_login_status(&mut self) -> Result<QrLoginEvent> {
        let key = self
            .qr_key
            .clone()
            .ok_or_else(|| BiliError::NoData("generate a QR code first".to_string()))?;

        let response = self
            .client
            .get(self.client.passport_url(QRCODE_POLL))
            .param("qrcode_key", &key)
            .header("Referer", LOGIN_REFERER)
            .send()
            .await?;

        let cookies: Vec<(String, String)> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let envelope = check_code(read_json(response).await?)?;
        let data = envelope.get("data").cloned().unwrap_or(Value::Null);

        let code = data.get("code").and_then(|c| c.as_i64()).unwrap_or(-1);
        let event = match code {
            CODE_NOT_SCANNED => QrLoginEvent::Scan,
            CODE_SCANNED => QrLoginEvent::Confirm,
            CODE_EXPIRED => QrLoginEvent::Timeout,
            CODE_SUCCESS => {
                let mut credential = parse_credential(&data)?;
                fill_from_cookies(&mut credential, &cookies);
                self.credential = Some(credential.clone());
                QrLoginEvent::Done(credential)
            }
            other => {
                let message = data
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown status")
                    .to_string();
                return Err(BiliError::QrLogin {
                    code: other,
                    message,
                });
            }
        };
        Ok(event)
    }

    /// Poll until the login completes, the code expires, or the configured
    /// timeout passes.
    ///
    /// Polls at least once; the last wait is cut short at the deadline.
    pub async fn login(&mut self) -> Result<Credential> {
        let started = Instant::now();
        let mut attempt = 0u32;
        let mut last_event = None;

        loop {
            let mut wait = self.config.poll_interval;
            if let Some(timeout) = self.config.timeout {
                let elapsed = started.elapsed();
                if attempt > 0 && elapsed >= timeout {
                    warn!("QR login timed out after {} polls", attempt);
                    return Err(BiliError::LoginTimeout(timeout));
                }
                wait = wait.min(timeout.saturating_sub(elapsed));
            }
            sleep(wait).await;
            attempt += 1;

            let event = self.check_login_status().await?;
            match &event {
                QrLoginEvent::Scan => debug!("Waiting for scan (attempt {})", attempt),
                QrLoginEvent::Confirm => {
                    if last_event != Some(QrLoginEvent::Confirm) {
                        info!("QR code scanned, confirm the login on your phone");
                    }
                }
                QrLoginEvent::Timeout => {
                    warn!("QR code expired");
                    return Err(BiliError::QrCodeExpired);
                }
                QrLoginEvent::Done(credential) => {
                    info!("Logged in as {}", credential.dedeuserid);
                    return Ok(credential.clone());
                }
            }
            last_event = Some(event);
        }
    }

    /// Generate, display and wait for confirmation.
    pub async fn auto_login(&mut self) -> Result<Credential> {
        let link = self.generate_qr_code().await?;
        Self::display_qr_code(&link)?;
        self.login().await
    }
}

/// Build a credential from the `data` of a successful poll.
///
/// Cookie values are taken from the cross-domain URL query as-is, without
/// percent-decoding, which is the form the cookies are sent in.
pub fn parse_credential(data: &Value) -> Result<Credential> {
    let url = data
        .get("url")
        .and_then(|u| u.as_str())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| BiliError::NoData(format!("login URL missing: {}", data)))?;

    let mut credential = Credential {
        ac_time_value: data
            .get("refresh_token")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string(),
        ..Default::default()
    };

    let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "SESSDATA" => credential.sessdata = value.to_string(),
            "bili_jct" => credential.bili_jct = value.to_string(),
            "DedeUserID" => credential.dedeuserid = value.to_string(),
            _ => {}
        }
    }

    if !credential.has_sessdata() {
        return Err(BiliError::NoData("SESSDATA missing from login URL".to_string()));
    }
    Ok(credential)
}

fn fill_from_cookies(credential: &mut Credential, cookies: &[(String, String)]) {
    for (name, value) in cookies {
        let field = match name.as_str() {
            "SESSDATA" => &mut credential.sessdata,
            "bili_jct" => &mut credential.bili_jct,
            "DedeUserID" => &mut credential.dedeuserid,
            "buvid3" => &mut credential.buvid3,
            _ => continue,
        };
        if field.is_empty() {
            *field = value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use std::time::Duration;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SUCCESS_URL: &str = "https://passport.biligame.com/x/passport-login/web/crossDomain?DedeUserID=123&DedeUserID__ckMd5=abc&Expires=1700000000&SESSDATA=aa%2C1700000000%2Cbb&bili_jct=csrf&gourl=https%3A%2F%2Fwww.bilibili.com";

    fn poll_body(code: i64, url: &str) -> Value {
        json!({
            "code": 0,
            "message": "0",
            "data": {"url": url, "refresh_token": if code == 0 { "refresh" } else { "" },
                     "timestamp": 0, "code": code, "message": ""}
        })
    }

    async fn setup(server: &MockServer, timeout: Option<Duration>) -> QrCodeLogin {
        Mock::given(method("GET"))
            .and(path(QRCODE_GENERATE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "message": "0",
                "data": {"url": "https://account.bilibili.com/h5/account-h5/auth/scan-web?qrcode_key=k1",
                         "qrcode_key": "k1"}
            })))
            .mount(server)
            .await;

        let client = ApiClient::with_endpoints(Endpoints::with_base(server.uri())).unwrap();
        let config = LoginConfig {
            poll_interval: Duration::from_millis(10),
            timeout,
        };
        let mut login = QrCodeLogin::with_client(client, config);
        login.generate_qr_code().await.unwrap();
        login
    }

    #[test]
    fn test_parse_credential() {
        let data = json!({"url": SUCCESS_URL, "refresh_token": "refresh", "code": 0});
        let cred = parse_credential(&data).unwrap();
        assert_eq!(cred.sessdata, "aa%2C1700000000%2Cbb");
        assert_eq!(cred.bili_jct, "csrf");
        assert_eq!(cred.dedeuserid, "123");
        assert_eq!(cred.ac_time_value, "refresh");
    }

    #[test]
    fn test_parse_credential_without_url() {
        assert!(matches!(
            parse_credential(&json!({"url": ""})),
            Err(BiliError::NoData(_))
        ));
        assert!(parse_credential(&json!({"url": "https://x/?gourl=y"})).is_err());
    }

    #[test]
    fn test_fill_from_cookies_keeps_url_values() {
        let mut cred = Credential::new("from_url", "", "");
        fill_from_cookies(
            &mut cred,
            &[
                ("SESSDATA".into(), "from_cookie".into()),
                ("bili_jct".into(), "jct".into()),
                ("other".into(), "x".into()),
            ],
        );
        assert_eq!(cred.sessdata, "from_url");
        assert_eq!(cred.bili_jct, "jct");
    }

    #[test]
    fn test_render_qr_code() {
        let rendered = QrCodeLogin::render_qr_code("https://example.com/?k=1").unwrap();
        assert!(rendered.lines().count() > 10);
    }

    #[tokio::test]
    async fn test_generate_qr_code() {
        let server = MockServer::start().await;
        let login = setup(&server, None).await;
        assert_eq!(login.qr_key(), Some("k1"));
    }

    #[tokio::test]
    async fn test_check_before_generate() {
        let mut login = QrCodeLogin::new();
        assert!(matches!(
            login.check_login_status().await,
            Err(BiliError::NoData(_))
        ));
    }

    #[tokio::test]
    async fn test_login_waits_then_succeeds() {
        let server = MockServer::start().await;
        let mut login = setup(&server, Some(Duration::from_secs(10))).await;

        Mock::given(path(QRCODE_POLL))
            .and(query_param("qrcode_key", "k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(86101, "")))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(path(QRCODE_POLL))
            .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(86090, "")))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(path(QRCODE_POLL))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "buvid3=device; Path=/")
                    .set_body_json(poll_body(0, SUCCESS_URL)),
            )
            .mount(&server)
            .await;

        let cred = login.login().await.unwrap();
        assert_eq!(cred.dedeuserid, "123");
        assert_eq!(cred.buvid3, "device");
        assert_eq!(login.credential(), Some(&cred));
    }

    #[tokio::test]
    async fn test_login_expired() {
        let server = MockServer::start().await;
        let mut login = setup(&server, None).await;
        Mock::given(path(QRCODE_POLL))
            .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(86038, "")))
            .mount(&server)
            .await;

        assert!(matches!(login.login().await, Err(BiliError::QrCodeExpired)));
    }

    #[tokio::test]
    async fn test_login_timeout() {
        let server = MockServer::start().await;
        let mut login = setup(&server, Some(Duration::from_millis(100))).await;
        Mock::given(path(QRCODE_POLL))
            .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(86101, "")))
            .mount(&server)
            .await;

        match login.login().await {
            Err(BiliError::LoginTimeout(t)) => assert_eq!(t, Duration::from_millis(100)),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_shorter_than_interval_still_polls() {
        let server = MockServer::start().await;
        let client = ApiClient::with_endpoints(Endpoints::with_base(server.uri())).unwrap();
        let config = LoginConfig {
            poll_interval: Duration::from_secs(10),
            timeout: Some(Duration::from_millis(50)),
        };
        let mut login = QrCodeLogin::with_client(client, config);
        Mock::given(path(QRCODE_GENERATE))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "data": {"url": "https://x/?qrcode_key=k2", "qrcode_key": "k2"}
            })))
            .mount(&server)
            .await;
        Mock::given(path(QRCODE_POLL))
            .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(86101, "")))
            .expect(1)
            .mount(&server)
            .await;
        login.generate_qr_code().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), login.login())
            .await
            .expect("login slept past its deadline");
        assert!(matches!(result, Err(BiliError::LoginTimeout(_))));
    }

    #[tokio::test]
    async fn test_unknown_status_code() {
        let server = MockServer::start().await;
        let mut login = setup(&server, None).await;
        Mock::given(path(QRCODE_POLL))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "data": {"code": 86000, "message": "weird", "url": ""}
            })))
            .mount(&server)
            .await;

        match login.check_login_status().await {
            Err(BiliError::QrLogin { code, message }) => {
                assert_eq!(code, 86000);
                assert_eq!(message, "weird");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
