//! Unauthenticated read endpoints under `api/`.

use serde_json::Value;

use dhartirakshak_common::http_client::HttpClient;
use dhartirakshak_common::normalize::RecordExt;
use dhartirakshak_common::{ApiResult, ItemId, Record};

use crate::client::DhartiClient;
use crate::resource::IntoForm;
use crate::resource::drafts::ResearchSubmission;

/// Public site reads, plus research submission.
#[derive(Debug, Clone)]
pub struct PublicApi<C> {
    client: DhartiClient<C>,
}

impl<C: HttpClient> PublicApi<C> {
    /// Wrap a client.
    pub fn new(client: DhartiClient<C>) -> Self {
        Self { client }
    }

    async fn list(&self, path: &str) -> ApiResult<Vec<Record>> {
        Ok(self.client.call().get(path).await?.records()?)
    }

    async fn one(&self, path: &str) -> ApiResult<Value> {
        Ok(self.client.call().get(path).await?.single()?)
    }

    /// Published agriculture news.
    pub async fn news(&self) -> ApiResult<Vec<Record>> {
        self.list("api/newsagriculture").await
    }

    /// Items currently marked trending.
    pub async fn trending(&self) -> ApiResult<Vec<Record>> {
        self.list("api/trending-news-only").await
    }

    /// Ticker text for the trending items, in server order.
    ///
    /// Items with none of the headline fields are skipped.
    pub async fn ticker(&self) -> ApiResult<Vec<String>> {
        Ok(self
            .trending()
            .await?
            .iter()
            .filter_map(|r| r.headline().map(str::to_owned))
            .collect())
    }

    /// Banners for the home page carousel.
    pub async fn banners(&self) -> ApiResult<Vec<Record>> {
        self.list("api/banners").await
    }

    /// Active advertisements.
    pub async fn advertisements(&self) -> ApiResult<Vec<Record>> {
        self.list("api/advertisement").await
    }

    /// Content categories.
    pub async fn categories(&self) -> ApiResult<Vec<Record>> {
        self.list("api/category").await
    }

    /// Category labels, blanks dropped.
    pub async fn category_names(&self) -> ApiResult<Vec<String>> {
        Ok(self
            .categories()
            .await?
            .iter()
            .map(|r| r.display_name().to_owned())
            .filter(|n| !n.is_empty())
            .collect())
    }

    /// E-paper issues.
    pub async fn epapers(&self) -> ApiResult<Vec<Record>> {
        self.list("api/all-epapers").await
    }

    /// One e-paper issue.
    pub async fn epaper(&self, id: &ItemId) -> ApiResult<Value> {
        self.one(&format!("api/all-epapers/{id}")).await
    }

    /// Approved research.
    pub async fn research(&self) -> ApiResult<Vec<Record>> {
        self.list("api/researches").await
    }

    /// One research entry.
    pub async fn research_item(&self, id: &ItemId) -> ApiResult<Value> {
        self.one(&format!("api/researches/{id}")).await
    }

    /// Submit research for moderation. The token is sent when present.
    #[tracing::instrument(level = "debug", skip_all, fields(authenticated = token.is_some()))]
    pub async fn submit_research(
        &self,
        token: Option<&str>,
        submission: ResearchSubmission,
    ) -> ApiResult<Value> {
        submission.validate_create()?;
        let resp = self
            .client
            .call()
            .bearer(token)
            .post_form("api/researches", submission.into_form())
            .await?;
        Ok(resp.single()?)
    }
}
