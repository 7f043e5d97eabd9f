//! Low-level request layer for the Bilibili web API.
//!
//! [`ApiClient`] owns the pooled HTTP client and the configured hosts.
//! [`Api`] is a one-shot request builder: set parameters, attach a
//! [`Credential`], optionally WBI-sign, then read the decoded JSON.

pub mod wbi;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::config::{ClientConfig, Endpoints};
use crate::credential::Credential;
use crate::error::{BiliError, Result};

use self::wbi::WbiKeys;

/// Shared HTTP client for all API and download requests.
///
/// Cheap to clone; clones share the connection pool and the WBI key cache.
///
/// # Example
///
/// ```rust,no_run
/// use minibili::ApiClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = ApiClient::default();
///     let data = client
///         .get(client.api_url("/x/web-interface/view"))
///         .param("bvid", "BV1GJ411x7h7")
///         .result()
///         .await?;
///     println!("{}", data["title"]);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
    timeout: Duration,
    wbi_keys: Arc<RwLock<Option<WbiKeys>>>,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(&ClientConfig::default()).expect("Failed to create HTTP client")
    }
}

impl ApiClient {
    /// Create a client from configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(referer) = HeaderValue::from_str(&config.referer) {
            headers.insert(REFERER, referer);
        }

        // No overall timeout on the client itself: download bodies may take
        // minutes. API calls get `timeout` per request instead.
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
            timeout: config.timeout,
            wbi_keys: Arc::new(RwLock::new(None)),
        })
    }

    /// Default configuration with different hosts.
    pub fn with_endpoints(endpoints: Endpoints) -> Result<Self> {
        Self::new(&ClientConfig {
            endpoints,
            ..Default::default()
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// The underlying reqwest client (carries the User-Agent and Referer).
    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api, path)
    }

    pub fn passport_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.passport, path)
    }

    pub fn www_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.www, path)
    }

    pub fn get<S: Into<String>>(&self, url: S) -> Api<'_> {
        Api::new(self, Method::GET, url.into())
    }

    pub fn post<S: Into<String>>(&self, url: S) -> Api<'_> {
        Api::new(self, Method::POST, url.into())
    }

    /// Mixin key for WBI signing, fetched from the nav endpoint when the
    /// cached one is missing or stale.
    async fn wbi_mixin_key(&self) -> Result<String> {
        {
            let cache = self.wbi_keys.read().await;
            if let Some(keys) = cache.as_ref().filter(|k| k.is_fresh()) {
                return Ok(keys.mixin_key.clone());
            }
        }

        // nav answers -101 for anonymous users but still carries wbi_img.
        let url = self.api_url("/x/web-interface/nav");
        debug!("GET {}", url);
        let response = self.client.get(&url).timeout(self.timeout).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("HTTP {} from {}", status, url);
            return Err(BiliError::Http { status, url });
        }
        let nav = read_json(response).await?;
        let img_url = nav
            .pointer("/data/wbi_img/img_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BiliError::NoData("wbi_img.img_url".to_string()))?;
        let sub_url = nav
            .pointer("/data/wbi_img/sub_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| BiliError::NoData("wbi_img.sub_url".to_string()))?;

        let mixin_key = wbi::mixin_key(&wbi::key_from_url(img_url), &wbi::key_from_url(sub_url));
        debug!("Refreshed WBI keys");

        let mut cache = self.wbi_keys.write().await;
        *cache = Some(WbiKeys::new(mixin_key.clone()));
        Ok(mixin_key)
    }
}

/// A single API request.
#[derive(Debug)]
pub struct Api<'a> {
    client: &'a ApiClient,
    method: Method,
    url: String,
    params: Vec<(String, String)>,
    data: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    credential: Option<&'a Credential>,
    wbi: bool,
}

impl<'a> Api<'a> {
    fn new(client: &'a ApiClient, method: Method, url: String) -> Self {
        Self {
            client,
            method,
            url,
            params: Vec::new(),
            data: Vec::new(),
            headers: Vec::new(),
            credential: None,
            wbi: false,
        }
    }

    /// Add a query parameter.
    pub fn param<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Add several query parameters.
    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: ToString,
        V: ToString,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.to_string(), v.to_string())));
        self
    }

    /// Add a form field (sent as the POST body).
    pub fn form<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.data.push((key.to_string(), value.to_string()));
        self
    }

    pub fn header<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Send the credential's cookies with the request.
    pub fn credential(mut self, credential: &'a Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Sign the query with WBI.
    pub fn wbi(mut self, wbi: bool) -> Self {
        self.wbi = wbi;
        self
    }

    /// Send the request and check the HTTP status.
    pub async fn send(self) -> Result<Response> {
        let mut url = self.url;
        let mut request = if self.wbi {
            let mixin_key = self.client.wbi_mixin_key().await?;
            let query = wbi::sign(&self.params, &mixin_key, wbi::timestamp());
            url = format!("{}?{}", url, query);
            self.client.client.request(self.method.clone(), &url)
        } else {
            self.client
                .client
                .request(self.method.clone(), &url)
                .query(&self.params)
        };
        debug!("{} {} params: {:?}", self.method, url, self.params);

        request = request.timeout(self.client.timeout);
        if self.method == Method::POST {
            request = request.form(&self.data);
        }
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(cookie) = self.credential.and_then(|c| c.cookie_header()) {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("HTTP {} from {}", status, url);
            return Err(BiliError::Http { status, url });
        }
        Ok(response)
    }

    /// Send and decode the body as JSON without looking at `code`.
    pub async fn json(self) -> Result<Value> {
        let response = self.send().await?;
        read_json(response).await
    }

    /// Send and return the whole envelope (`code`, `message`, `data`).
    ///
    /// # Errors
    ///
    /// Returns `Api { code, message }` if `code` is non-zero.
    pub async fn envelope(self) -> Result<Value> {
        let value = self.json().await?;
        check_code(value)
    }

    /// Send and return the `data` field (`Null` when absent).
    pub async fn result(self) -> Result<Value> {
        let mut envelope = self.envelope().await?;
        Ok(envelope
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Send and decode the `data` field into `T`.
    pub async fn result_as<T: DeserializeOwned>(self) -> Result<T> {
        let data = self.result().await?;
        Ok(serde_json::from_value(data)?)
    }
}

/// Read a response body as JSON, logging a preview of anything else.
pub(crate) async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await?;
    match serde_json::from_str(&text) {
        Ok(value) => Ok(value),
        Err(e) => {
            let preview: String = text.chars().take(500).collect();
            error!("Failed to parse response (status {}): {}", status, preview);
            Err(BiliError::Parse(e))
        }
    }
}

/// Turn a non-zero `code` in the envelope into an error.
pub(crate) fn check_code(value: Value) -> Result<Value> {
    let code = value.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
    if code != 0 {
        let message = value
            .get("message")
            .or_else(|| value.get("msg"))
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        error!("Bilibili API error {}: {}", code, message);
        return Err(BiliError::Api { code, message });
    }
    Ok(value)
}
