use bytes::Bytes;
use http::{
    HeaderName, HeaderValue, Method, Request, StatusCode,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use smol_str::SmolStr;
use url::Url;

use crate::AuthorizationToken;
use crate::error::{
    ApiError, ApiResult, AuthError, ClientError, DecodeError, EncodeError, TransportError,
};
use crate::form::MultipartForm;
use crate::http_client::HttpClient;
use crate::normalize;
use crate::types::Record;

/// Per-request options (auth, query string, extra headers).
#[derive(Debug, Default, Clone)]
pub struct CallOptions {
    /// Optional Authorization to apply.
    pub auth: Option<AuthorizationToken>,
    /// Query parameters, appended in order.
    pub query: Vec<(SmolStr, SmolStr)>,
    /// Extra headers to attach to this request.
    pub extra_headers: Vec<(HeaderName, HeaderValue)>,
}

/// Request body.
#[derive(Debug, Clone)]
pub enum Body {
    /// No body
    Empty,
    /// Pre-serialized JSON
    Json(Vec<u8>),
    /// Multipart form
    Form(MultipartForm),
}

impl Body {
    /// Serialize a value as a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, EncodeError> {
        Ok(Body::Json(serde_json::to_vec(value)?))
    }
}

/// Extension trait that starts a stateless call from any [`HttpClient`].
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use dhartirakshak_common::api::ApiExt;
///
/// let http = reqwest::Client::new();
/// let base = url::Url::parse("https://dhartirakshak-backend.carnate.in")?;
/// let resp = http.api(base).get("api/newsagriculture").await?;
/// println!("{} records", resp.records()?.len());
/// # Ok(())
/// # }
/// ```
pub trait ApiExt: HttpClient {
    /// Start building a call against the given base URL.
    fn api(&self, base: Url) -> ApiCall<'_, Self>
    where
        Self: Sized,
    {
        ApiCall {
            client: self,
            base,
            opts: CallOptions::default(),
        }
    }
}

impl<T: HttpClient> ApiExt for T {}

/// Stateless API call builder.
pub struct ApiCall<'a, C: HttpClient> {
    pub(crate) client: &'a C,
    pub(crate) base: Url,
    pub(crate) opts: CallOptions,
}

impl<'a, C: HttpClient> ApiCall<'a, C> {
    /// Apply Authorization to this call.
    pub fn auth(mut self, token: impl Into<AuthorizationToken>) -> Self {
        self.opts.auth = Some(token.into());
        self
    }
    /// Apply a bearer token when one is present.
    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.opts.auth = token.map(AuthorizationToken::from);
        self
    }
    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<SmolStr>, value: impl Into<SmolStr>) -> Self {
        self.opts.query.push((key.into(), value.into()));
        self
    }
    /// Add an extra header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.opts.extra_headers.push((name, value));
        self
    }
    /// Replace the builder's options entirely.
    pub fn with_options(mut self, opts: CallOptions) -> Self {
        self.opts = opts;
        self
    }

    /// `GET path`
    pub async fn get(self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::GET, path, Body::Empty).await
    }

    /// `DELETE path`
    pub async fn delete(self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::DELETE, path, Body::Empty).await
    }

    /// `POST path` with a JSON body.
    pub async fn post_json<T: Serialize + ?Sized>(
        self,
        path: &str,
        body: &T,
    ) -> ApiResult<ApiResponse> {
        let body = Body::json(body)?;
        self.send(Method::POST, path, body).await
    }

    /// `POST path` with an empty JSON object, the shape the action endpoints
    /// (`activate`, `mark-trending`, `approve`, ...) expect.
    pub async fn post_empty(self, path: &str) -> ApiResult<ApiResponse> {
        self.send(Method::POST, path, Body::Json(b"{}".to_vec()))
            .await
    }

    /// `POST path` with a multipart form.
    pub async fn post_form(self, path: &str, form: MultipartForm) -> ApiResult<ApiResponse> {
        self.send(Method::POST, path, Body::Form(form)).await
    }

    /// `PUT path` with a multipart form.
    pub async fn put_form(self, path: &str, form: MultipartForm) -> ApiResult<ApiResponse> {
        self.send(Method::PUT, path, Body::Form(form)).await
    }

    /// Send the request and map non-success statuses to errors.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip(self, method, body), fields(method = %method)))]
    pub async fn send(self, method: Method, path: &str, body: Body) -> ApiResult<ApiResponse> {
        let http_request = build_http_request(&self.base, method, path, body, &self.opts)?;

        let http_response = self
            .client
            .send_http(http_request)
            .await
            .map_err(|e| TransportError::Other(Box::new(e)))?;

        process_response(http_response)
    }
}

/// Resolve `path` against `base`, keeping any path prefix the base carries.
pub fn join_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let mut full = url.path().trim_end_matches('/').to_owned();
    let tail = path.trim_start_matches('/');
    if !tail.is_empty() {
        full.push('/');
        full.push_str(tail);
    }
    url.set_path(&full);
    url.set_query(None);
    url
}

/// Build an HTTP request given base URL, path, body and options.
pub fn build_http_request(
    base: &Url,
    method: Method,
    path: &str,
    body: Body,
    opts: &CallOptions,
) -> Result<Request<Vec<u8>>, TransportError> {
    let mut url = join_url(base, path);
    if !opts.query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in &opts.query {
            pairs.append_pair(k, v);
        }
    }

    let mut builder = Request::builder()
        .method(method)
        .uri(url.as_str())
        .header(ACCEPT, "application/json");

    if let Some(token) = &opts.auth {
        let hv = HeaderValue::from_str(&token.header_value()).map_err(|e| {
            TransportError::InvalidRequest(format!("Invalid authorization token: {}", e))
        })?;
        builder = builder.header(AUTHORIZATION, hv);
    }

    for (name, value) in &opts.extra_headers {
        builder = builder.header(name, value);
    }

    let body = match body {
        Body::Empty => Vec::new(),
        Body::Json(bytes) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            bytes
        }
        Body::Form(form) => {
            builder = builder.header(CONTENT_TYPE, form.content_type());
            form.encode()
        }
    };

    Ok(builder.body(body)?)
}

/// Turn an HTTP response into an [`ApiResponse`], or the matching error.
///
/// 401 and 403 become [`AuthError`]s carrying the server message; every
/// other non-2xx status becomes an [`ApiError`].
#[inline]
pub fn process_response(http_response: http::Response<Vec<u8>>) -> ApiResult<ApiResponse> {
    let status = http_response.status();
    let buffer = Bytes::from(http_response.into_body());

    if status.is_success() {
        return Ok(ApiResponse::new(buffer, status));
    }

    let err = ApiError::from_body(status, buffer);
    let message = err.message.as_deref().map(SmolStr::new);
    match status.as_u16() {
        401 => Err(ClientError::Auth(AuthError::Unauthorized(message))),
        403 => Err(ClientError::Auth(AuthError::Forbidden(message))),
        _ => Err(err.into()),
    }
}

/// Successful response that owns the response buffer.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    buffer: Bytes,
    status: StatusCode,
}

impl ApiResponse {
    /// Create a new response from a buffer and status code
    pub fn new(buffer: Bytes, status: StatusCode) -> Self {
        Self { buffer, status }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the raw buffer
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    /// Decode the body as JSON. An empty body is `null`.
    pub fn json(&self) -> Result<Value, DecodeError> {
        if self.buffer.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&self.buffer)?)
    }

    /// Decode the body into a concrete type.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        Ok(serde_json::from_slice(&self.buffer)?)
    }

    /// Decode a list response, applying [`normalize::records`].
    pub fn records(&self) -> Result<Vec<Record>, DecodeError> {
        Ok(normalize::records(self.json()?))
    }

    /// Decode a single-object response, applying [`normalize::single_payload`].
    pub fn single(&self) -> Result<Value, DecodeError> {
        Ok(normalize::single_payload(self.json()?))
    }
}
