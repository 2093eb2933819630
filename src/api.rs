// API client module: a small blocking HTTP client for the 0x45.st service.
// Every operation is exactly one request/response round trip. Local
// preconditions (API key present, expiry within bounds) are checked before
// anything is handed to the transport.

use crate::config::Settings;
use crate::error::{ClientError, Result, TransportError};
use crate::expiry;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    Bytes(Vec<u8>),
}

/// A fully built request, ready to be sent by a [`Transport`].
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    /// Bearer token for the `Authorization` header, if any.
    pub bearer: Option<String>,
    pub body: Body,
}

impl ApiRequest {
    /// Value of a query parameter, if it was set.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and raw body of a response. Decoding happens in [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Performs one HTTP exchange. Implemented over reqwest for real use and by
/// in-memory fakes in tests.
pub trait Transport {
    fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError>;
}

/// [`Transport`] backed by a reqwest blocking client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("0x45-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(Box::new(e)))?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        let mut req = self.client.request(request.method, &request.url);
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            req = req.bearer_auth(token);
        }
        req = match request.body {
            Body::Empty => req,
            Body::Json(value) => req.json(&value),
            Body::Bytes(bytes) => req
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
        };

        let res = req.send()?;
        let status = res.status();
        let body = res.text()?;
        Ok(ApiResponse { status, body })
    }
}

/// Every successful response is wrapped as `{"success": ..., "data": ...}`.
/// Only `data` is read; the status code already carries success.
#[derive(Deserialize, Debug)]
struct Envelope<T> {
    data: T,
}

/// Options for [`ApiClient::upload`]. Empty strings are treated as unset.
#[derive(Debug, Default, Clone)]
pub struct UploadOptions {
    pub filename: Option<String>,
    pub ext: Option<String>,
    pub expires: Option<String>,
    pub private: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UploadResult {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub raw_url: String,
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub delete_url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub private: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone)]
pub struct ShortenOptions {
    pub url: String,
    pub title: Option<String>,
    pub expires: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShortenResult {
    pub id: String,
    pub short_url: String,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub delete_url: String,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub last_click: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Which collection a listing targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Pastes,
    Urls,
}

impl ListKind {
    fn path(&self) -> &'static str {
        match self {
            ListKind::Pastes => "/pastes",
            ListKind::Urls => "/urls",
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListKind::Pastes => "pastes",
            ListKind::Urls => "urls",
        })
    }
}

impl FromStr for ListKind {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pastes" => Ok(ListKind::Pastes),
            "urls" => Ok(ListKind::Urls),
            other => Err(ClientError::Validation(format!(
                "invalid list type '{}' (expected 'pastes' or 'urls')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    ExpiresAt,
    Clicks,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::ExpiresAt => "expires_at",
            SortKey::Clicks => "clicks",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created_at" => Ok(SortKey::CreatedAt),
            "expires_at" => Ok(SortKey::ExpiresAt),
            "clicks" => Ok(SortKey::Clicks),
            other => Err(ClientError::Validation(format!(
                "invalid sort key '{}' (expected created_at, expires_at or clicks)",
                other
            ))),
        }
    }
}

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub kind: ListKind,
    pub page: u32,
    pub limit: u32,
    pub sort: SortKey,
}

impl ListQuery {
    /// First page of `kind`, ten items, newest first.
    pub fn new(kind: ListKind) -> Self {
        ListQuery {
            kind,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort: SortKey::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.page == 0 {
            return Err(ClientError::Validation("page must be at least 1".into()));
        }
        if self.limit == 0 {
            return Err(ClientError::Validation("limit must be at least 1".into()));
        }
        Ok(())
    }
}

/// One entry of a listing. Pastes carry `filename` and `size`, URLs carry
/// `short_url` and `clicks`; the rest is shared.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ListItem {
    pub id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub short_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub clicks: Option<u64>,
    #[serde(default)]
    pub delete_url: Option<String>,
}

/// One page of a paginated listing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// ceil(total / limit), and never less than one.
    pub fn page_count(&self) -> u64 {
        page_count(self.total, self.limit)
    }
}

pub type ListResult = Page<ListItem>;

pub fn page_count(total: u64, limit: u32) -> u64 {
    let limit = u64::from(limit.max(1));
    total.div_ceil(limit).max(1)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DeleteResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeyRequest {
    pub email: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KeyResult {
    #[serde(default)]
    pub success: bool,
    pub message: String,
}

/// Click statistics for a shortened URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UrlStats {
    pub id: String,
    pub url: String,
    pub short_url: String,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub last_click: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Client for the paste/shortener API: the base URL, an optional API key,
/// and the transport used to reach the service.
pub struct ApiClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient<HttpTransport> {
    /// Build a client over HTTP using the resolved settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(ApiClient::with_transport(
            HttpTransport::new()?,
            settings.api_url(),
            settings.api_key(),
        ))
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(transport: T, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        ApiClient {
            transport,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload `content` as a paste. Private uploads require an API key.
    pub fn upload(&self, content: Vec<u8>, opts: &UploadOptions) -> Result<UploadResult> {
        if opts.private && !self.has_api_key() {
            return Err(ClientError::private_upload_requires_key());
        }
        let expires = non_empty(&opts.expires);
        self.check_expiry(expires)?;

        let mut query = Vec::new();
        if let Some(filename) = non_empty(&opts.filename) {
            query.push(("filename", filename.to_string()));
        }
        if let Some(ext) = non_empty(&opts.ext) {
            query.push(("ext", ext.trim_start_matches('.').to_string()));
        }
        if let Some(expires) = expires {
            query.push(("expires", expires.to_string()));
        }
        if opts.private {
            query.push(("private", "true".to_string()));
        }

        let envelope: Envelope<UploadResult> =
            self.call(Method::POST, "/upload", query, Body::Bytes(content), true)?;
        Ok(envelope.data)
    }

    /// Shorten `opts.url`. Requires an API key.
    pub fn shorten(&self, opts: &ShortenOptions) -> Result<ShortenResult> {
        self.require_api_key()?;
        let target = opts.url.trim();
        reqwest::Url::parse(target)
            .map_err(|e| ClientError::Validation(format!("invalid URL '{}': {}", target, e)))?;
        let expires = non_empty(&opts.expires);
        self.check_expiry(expires)?;

        let mut body = json!({ "url": target });
        if let Some(title) = non_empty(&opts.title) {
            body["title"] = json!(title);
        }
        if let Some(expires) = expires {
            body["expires"] = json!(expires);
        }

        let envelope: Envelope<ShortenResult> =
            self.call(Method::POST, "/shorten", Vec::new(), Body::Json(body), true)?;
        Ok(envelope.data)
    }

    /// Fetch one page of pastes or URLs. Requires an API key.
    pub fn list(&self, query: &ListQuery) -> Result<ListResult> {
        self.require_api_key()?;
        query.validate()?;
        let params = vec![
            ("page", query.page.to_string()),
            ("limit", query.limit.to_string()),
            ("sort", query.sort.as_str().to_string()),
        ];
        let envelope: Envelope<ListResult> =
            self.call(Method::GET, query.kind.path(), params, Body::Empty, true)?;
        Ok(envelope.data)
    }

    /// Delete a paste or URL by its delete ID. Requires an API key.
    pub fn delete(&self, delete_id: &str) -> Result<DeleteResult> {
        self.require_api_key()?;
        let id = path_segment(delete_id)?;
        self.call(Method::DELETE, &format!("/{}", id), Vec::new(), Body::Empty, true)
    }

    /// Ask the service to issue a new API key. Never sends credentials.
    pub fn request_api_key(&self, req: &KeyRequest) -> Result<KeyResult> {
        if req.email.trim().is_empty() || req.name.trim().is_empty() {
            return Err(ClientError::Validation("email and name are required".into()));
        }
        let body = json!({ "email": req.email.trim(), "name": req.name.trim() });
        self.call(Method::POST, "/api-key", Vec::new(), Body::Json(body), false)
    }

    /// Click statistics for a shortened URL. Requires an API key.
    pub fn url_stats(&self, id: &str) -> Result<UrlStats> {
        self.require_api_key()?;
        let id = path_segment(id)?;
        let envelope: Envelope<UrlStats> = self.call(
            Method::GET,
            &format!("/url/{}/stats", id),
            Vec::new(),
            Body::Empty,
            true,
        )?;
        Ok(envelope.data)
    }

    /// Change when a shortened URL expires. Requires an API key.
    pub fn update_url_expiration(&self, id: &str, expires: &str) -> Result<ShortenResult> {
        self.require_api_key()?;
        let id = path_segment(id)?;
        self.check_expiry(Some(expires.trim()))?;
        let body = json!({ "expires_in": expires.trim() });
        let envelope: Envelope<ShortenResult> = self.call(
            Method::PUT,
            &format!("/url/{}/expire", id),
            Vec::new(),
            Body::Json(body),
            true,
        )?;
        Ok(envelope.data)
    }

    fn require_api_key(&self) -> Result<()> {
        if self.has_api_key() {
            Ok(())
        } else {
            Err(ClientError::missing_api_key())
        }
    }

    fn check_expiry(&self, expires: Option<&str>) -> Result<()> {
        if let Some(expires) = expires {
            expiry::validate(expires, self.has_api_key())?;
        }
        Ok(())
    }

    /// Send one request and decode the JSON body of a 2xx response.
    fn call<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Vec<(&'static str, String)>,
        body: Body,
        authenticated: bool,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, authenticated, "sending request");

        let request = ApiRequest {
            method,
            url,
            query,
            bearer: if authenticated { self.api_key.clone() } else { None },
            body,
        };
        let response = self.transport.send(request).map_err(ClientError::Transport)?;
        debug!(status = %response.status, bytes = response.body.len(), "received response");

        if !response.status.is_success() {
            return Err(ClientError::Remote {
                status: response.status,
                body: response.body.trim().to_string(),
            });
        }
        Ok(serde_json::from_str(&response.body)?)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// IDs are interpolated into the path, so they must be a single segment.
fn path_segment(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains(['/', '?', '#']) || id.contains(char::is_whitespace) {
        return Err(ClientError::Validation(format!("invalid id '{}'", id)));
    }
    Ok(id)
}
