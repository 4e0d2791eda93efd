//! Stateless API client bound to one base URL.

use serde_json::Value;
use url::Url;

use dhartirakshak_common::api::{ApiCall, ApiExt};
use dhartirakshak_common::http_client::HttpClient;
use dhartirakshak_common::{ApiResult, ClientError};

use crate::resource::public::PublicApi;
use crate::resource::settings::SettingsApi;
use crate::resource::{
    ADVERTISEMENTS, BANNERS, CATEGORIES, EPAPERS, NEWS, RESEARCH, Resource, ResourceSpec,
    TRENDING_NEWS,
};

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://dhartirakshak-backend.carnate.in";

/// Client for the publishing API.
///
/// Holds no session state: every admin method takes the bearer token it
/// should send. Token lifecycle lives in [`crate::session::AuthSession`].
#[derive(Debug, Clone)]
pub struct DhartiClient<C> {
    http: C,
    base: Url,
}

impl<C> DhartiClient<C> {
    /// Create a client over the given transport and base URL.
    pub fn new(http: C, base: Url) -> Self {
        Self { http, base }
    }

    /// Base URL every path is resolved against.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Underlying transport.
    pub fn http(&self) -> &C {
        &self.http
    }
}

impl DhartiClient<reqwest::Client> {
    /// Client for the production host with a default `reqwest` transport.
    pub fn default_reqwest() -> Self {
        match Url::parse(DEFAULT_BASE_URL) {
            Ok(base) => Self::new(reqwest::Client::new(), base),
            Err(_) => unreachable!("DEFAULT_BASE_URL is a valid URL"),
        }
    }

    /// Client with a `reqwest` transport for a custom base URL.
    pub fn with_base(base: &str) -> ApiResult<Self> {
        let base = Url::parse(base)
            .map_err(|e| ClientError::invalid(format!("invalid base URL {base:?}: {e}")))?;
        Ok(Self::new(reqwest::Client::new(), base))
    }
}

impl<C: HttpClient> DhartiClient<C> {
    /// Start a raw call against the base URL.
    pub fn call(&self) -> ApiCall<'_, C> {
        self.http.api(self.base.clone())
    }
}

impl<C: HttpClient + Clone> DhartiClient<C> {
    /// Admin resource described by `spec`.
    pub fn resource(&self, spec: &'static ResourceSpec) -> Resource<C> {
        Resource::new(self.clone(), spec)
    }

    /// Admin agriculture news.
    pub fn news(&self) -> Resource<C> {
        self.resource(&NEWS)
    }

    /// Admin trending news.
    pub fn trending_news(&self) -> Resource<C> {
        self.resource(&TRENDING_NEWS)
    }

    /// Admin banners.
    pub fn banners(&self) -> Resource<C> {
        self.resource(&BANNERS)
    }

    /// Admin advertisements.
    pub fn advertisements(&self) -> Resource<C> {
        self.resource(&ADVERTISEMENTS)
    }

    /// Admin e-papers.
    pub fn epapers(&self) -> Resource<C> {
        self.resource(&EPAPERS)
    }

    /// Admin categories.
    pub fn categories(&self) -> Resource<C> {
        self.resource(&CATEGORIES)
    }

    /// Create a category (`POST api/admin/category`, JSON `{category}`).
    pub async fn create_category(&self, token: &str, name: &str) -> ApiResult<Value> {
        self.categories().create_named(token, name).await
    }

    /// Admin research moderation.
    pub fn research(&self) -> Resource<C> {
        self.resource(&RESEARCH)
    }

    /// Business settings, admin and public.
    pub fn settings(&self) -> SettingsApi<C> {
        SettingsApi::new(self.clone())
    }

    /// Unauthenticated read endpoints and research submission.
    pub fn public(&self) -> PublicApi<C> {
        PublicApi::new(self.clone())
    }
}
