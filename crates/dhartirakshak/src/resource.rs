//! Admin resource catalogue.
//!
//! Every admin page of the publishing backend talks to one collection under
//! `api/admin/<path>` with the same handful of verbs. Rather than a type per
//! collection, each one is a [`ResourceSpec`] constant describing its path and
//! which verbs it supports, and [`Resource`] turns a spec into requests.
//!
//! | Spec | Path | Extra |
//! |---|---|---|
//! | [`NEWS`] | `newsagriculture` | update is `PUT {id}` |
//! | [`TRENDING_NEWS`] | `trending-news` | update is `POST {id}` + `_method=PUT`, trending flag |
//! | [`BANNERS`] | `banner` | no update |
//! | [`ADVERTISEMENTS`] | `advertisement` | update is `POST update/{id}` |
//! | [`EPAPERS`] | `all-epapers` | create and delete only |
//! | [`CATEGORIES`] | `category` | JSON create |
//! | [`RESEARCH`] | `researches` | pending list, approve and reject |

use serde_json::{Value, json};

use dhartirakshak_common::http_client::HttpClient;
use dhartirakshak_common::{ApiResult, ClientError, ItemId, MultipartForm, Record};

use crate::client::DhartiClient;

pub mod drafts;
pub mod public;
pub mod settings;

pub use drafts::IntoForm;

/// How a resource accepts updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStyle {
    /// `PUT {id}` with a multipart body
    Put,
    /// `POST {id}` with a multipart body carrying `_method=PUT`
    MethodOverride,
    /// `POST update/{id}` with a multipart body
    UpdatePath,
    /// No update endpoint
    Unsupported,
}

/// How a resource accepts creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStyle {
    /// `POST` with a multipart body
    Multipart,
    /// `POST` with a JSON object holding one named string field
    JsonName(&'static str),
}

/// A boolean field flipped through a pair of action endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    /// Record field holding the flag
    pub field: &'static str,
    /// Action that sets the flag
    pub on: &'static str,
    /// Action that clears the flag
    pub off: &'static str,
    /// Notification after a successful set
    pub on_message: &'static str,
    /// Notification after a successful clear
    pub off_message: &'static str,
    /// Notification when either call fails
    pub failure_message: &'static str,
}

impl FlagSpec {
    /// Action path segment for the target value.
    pub fn action(&self, value: bool) -> &'static str {
        if value { self.on } else { self.off }
    }

    /// Success notification for the target value.
    pub fn success_message(&self, value: bool) -> &'static str {
        if value { self.on_message } else { self.off_message }
    }
}

/// Static description of one admin collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpec {
    /// Plural label used in messages, e.g. `"trending news"`
    pub label: &'static str,
    /// Path below the base URL, e.g. `"api/admin/trending-news"`
    pub path: &'static str,
    /// Create style, `None` when the collection cannot be created into
    pub create: Option<CreateStyle>,
    /// Update style
    pub update: UpdateStyle,
    /// Fields an update may carry; empty means any
    pub update_fields: &'static [&'static str],
    /// Whether `{id}/activate` and `{id}/deactivate` exist
    pub activatable: bool,
    /// Whether `DELETE {id}` exists
    pub deletable: bool,
    /// Whether `{id}/approve` and `{id}/reject` exist
    pub moderated: bool,
    /// Sub-path listing items awaiting moderation
    pub pending_path: Option<&'static str>,
    /// Optimistically toggled flag, if any
    pub flag: Option<FlagSpec>,
}

/// Agriculture news.
pub const NEWS: ResourceSpec = ResourceSpec {
    label: "news",
    path: "api/admin/newsagriculture",
    create: Some(CreateStyle::Multipart),
    update: UpdateStyle::Put,
    update_fields: &["title", "description", "heading", "image"],
    activatable: true,
    deletable: true,
    moderated: false,
    pending_path: None,
    flag: None,
};

/// Trending news, the ticker items.
pub const TRENDING_NEWS: ResourceSpec = ResourceSpec {
    label: "trending news",
    path: "api/admin/trending-news",
    create: Some(CreateStyle::Multipart),
    update: UpdateStyle::MethodOverride,
    update_fields: &["title", "description", "image"],
    activatable: true,
    deletable: true,
    moderated: false,
    pending_path: None,
    flag: Some(FlagSpec {
        field: "is_trending",
        on: "mark-trending",
        off: "unmark-trending",
        on_message: "Marked as trending",
        off_message: "Unmarked trending",
        failure_message: "Update trending failed",
    }),
};

/// Home page banners.
pub const BANNERS: ResourceSpec = ResourceSpec {
    label: "banners",
    path: "api/admin/banner",
    create: Some(CreateStyle::Multipart),
    update: UpdateStyle::Unsupported,
    update_fields: &[],
    activatable: true,
    deletable: true,
    moderated: false,
    pending_path: None,
    flag: None,
};

/// Advertisements.
pub const ADVERTISEMENTS: ResourceSpec = ResourceSpec {
    label: "advertisements",
    path: "api/admin/advertisement",
    create: Some(CreateStyle::Multipart),
    update: UpdateStyle::UpdatePath,
    update_fields: &[],
    activatable: true,
    deletable: true,
    moderated: false,
    pending_path: None,
    flag: None,
};

/// E-paper PDFs.
pub const EPAPERS: ResourceSpec = ResourceSpec {
    label: "e-papers",
    path: "api/admin/all-epapers",
    create: Some(CreateStyle::Multipart),
    update: UpdateStyle::Unsupported,
    update_fields: &[],
    activatable: false,
    deletable: true,
    moderated: false,
    pending_path: None,
    flag: None,
};

/// Content categories.
pub const CATEGORIES: ResourceSpec = ResourceSpec {
    label: "categories",
    path: "api/admin/category",
    create: Some(CreateStyle::JsonName("category")),
    update: UpdateStyle::Unsupported,
    update_fields: &[],
    activatable: false,
    deletable: false,
    moderated: false,
    pending_path: None,
    flag: None,
};

/// User submitted research.
pub const RESEARCH: ResourceSpec = ResourceSpec {
    label: "research",
    path: "api/admin/researches",
    create: None,
    update: UpdateStyle::Unsupported,
    update_fields: &[],
    activatable: false,
    deletable: false,
    moderated: true,
    pending_path: Some("pending"),
    flag: None,
};

/// Request methods for one admin collection.
///
/// Every method is a single request and takes the bearer token to send. None
/// of them keep state; [`crate::controller::ListController`] does that.
#[derive(Debug, Clone)]
pub struct Resource<C> {
    client: DhartiClient<C>,
    spec: &'static ResourceSpec,
    pending: bool,
}

impl<C> Resource<C> {
    /// Bind a spec to a client.
    pub fn new(client: DhartiClient<C>, spec: &'static ResourceSpec) -> Self {
        Self {
            client,
            spec,
            pending: false,
        }
    }

    /// The collection's description.
    pub fn spec(&self) -> &'static ResourceSpec {
        self.spec
    }

    /// The same collection, listing the moderation queue instead.
    ///
    /// Only [`list`](Self::list) changes; mutations still address the main
    /// path.
    pub fn pending(self) -> ApiResult<Self> {
        if self.spec.pending_path.is_none() {
            return Err(self.unsupported("a pending list"));
        }
        Ok(Self {
            pending: true,
            ..self
        })
    }

    /// True when this handle lists the moderation queue.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn list_path(&self) -> String {
        match (self.pending, self.spec.pending_path) {
            (true, Some(sub)) => format!("{}/{}", self.spec.path, sub),
            _ => self.spec.path.to_owned(),
        }
    }

    fn item_path(&self, id: &ItemId) -> String {
        format!("{}/{}", self.spec.path, id)
    }

    fn unsupported(&self, what: &str) -> ClientError {
        ClientError::invalid(format!("{} has no {what}", self.spec.label))
    }
}

impl<C: HttpClient> Resource<C> {
    /// Fetch the whole collection, normalized.
    #[tracing::instrument(level = "debug", skip(self, token), fields(resource = self.spec.label))]
    pub async fn list(&self, token: &str) -> ApiResult<Vec<Record>> {
        let resp = self.client.call().auth(token).get(&self.list_path()).await?;
        Ok(resp.records()?)
    }

    /// Create from a prepared multipart form.
    pub async fn create(&self, token: &str, form: MultipartForm) -> ApiResult<Value> {
        if self.spec.create != Some(CreateStyle::Multipart) {
            return Err(self.unsupported("multipart create"));
        }
        let resp = self
            .client
            .call()
            .auth(token)
            .post_form(self.spec.path, form)
            .await?;
        Ok(resp.single()?)
    }

    /// Validate a draft, then create from it.
    pub async fn create_from<D: IntoForm>(&self, token: &str, draft: D) -> ApiResult<Value> {
        draft.validate_create()?;
        self.create(token, draft.into_form()).await
    }

    /// Create from a single name, for collections that take JSON
    /// (`{"category": "Seeds"}`).
    pub async fn create_named(&self, token: &str, name: &str) -> ApiResult<Value> {
        let Some(CreateStyle::JsonName(field)) = self.spec.create else {
            return Err(self.unsupported("named create"));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::invalid(format!("{} is required", capitalize(field))));
        }
        let resp = self
            .client
            .call()
            .auth(token)
            .post_json(self.spec.path, &json!({ field: name }))
            .await?;
        Ok(resp.single()?)
    }

    /// Update one item from a multipart form.
    ///
    /// Fields outside the collection's update whitelist are dropped before
    /// sending.
    pub async fn update(&self, token: &str, id: &ItemId, form: MultipartForm) -> ApiResult<Value> {
        let form = if self.spec.update_fields.is_empty() {
            form
        } else {
            form.retain_fields(self.spec.update_fields)
        };
        let call = self.client.call().auth(token);
        let resp = match self.spec.update {
            UpdateStyle::Put => call.put_form(&self.item_path(id), form).await?,
            UpdateStyle::MethodOverride => {
                call.post_form(&self.item_path(id), form.text("_method", "PUT"))
                    .await?
            }
            UpdateStyle::UpdatePath => {
                call.post_form(&format!("{}/update/{}", self.spec.path, id), form)
                    .await?
            }
            UpdateStyle::Unsupported => return Err(self.unsupported("update")),
        };
        Ok(resp.single()?)
    }

    /// Validate a draft, then update from it.
    pub async fn update_from<D: IntoForm>(&self, token: &str, id: &ItemId, draft: D) -> ApiResult<Value> {
        draft.validate_update()?;
        self.update(token, id, draft.into_form()).await
    }

    /// `DELETE {id}`
    pub async fn delete(&self, token: &str, id: &ItemId) -> ApiResult<Value> {
        if !self.spec.deletable {
            return Err(self.unsupported("delete"));
        }
        let resp = self.client.call().auth(token).delete(&self.item_path(id)).await?;
        Ok(resp.json()?)
    }

    /// `POST {id}/{action}` with an empty JSON object.
    #[tracing::instrument(level = "debug", skip(self, token, id), fields(resource = self.spec.label, id = %id))]
    pub async fn action(&self, token: &str, id: &ItemId, action: &str) -> ApiResult<Value> {
        let path = format!("{}/{}", self.item_path(id), action);
        let resp = self.client.call().auth(token).post_empty(&path).await?;
        Ok(resp.json()?)
    }

    /// Make an item visible.
    pub async fn activate(&self, token: &str, id: &ItemId) -> ApiResult<Value> {
        if !self.spec.activatable {
            return Err(self.unsupported("activate"));
        }
        self.action(token, id, "activate").await
    }

    /// Hide an item.
    pub async fn deactivate(&self, token: &str, id: &ItemId) -> ApiResult<Value> {
        if !self.spec.activatable {
            return Err(self.unsupported("deactivate"));
        }
        self.action(token, id, "deactivate").await
    }

    /// Approve a submission.
    pub async fn approve(&self, token: &str, id: &ItemId) -> ApiResult<Value> {
        if !self.spec.moderated {
            return Err(self.unsupported("approve"));
        }
        self.action(token, id, "approve").await
    }

    /// Reject a submission.
    pub async fn reject(&self, token: &str, id: &ItemId) -> ApiResult<Value> {
        if !self.spec.moderated {
            return Err(self.unsupported("reject"));
        }
        self.action(token, id, "reject").await
    }

    /// Set or clear the collection's toggle flag server-side.
    pub async fn set_flag(&self, token: &str, id: &ItemId, value: bool) -> ApiResult<Value> {
        let Some(flag) = self.spec.flag else {
            return Err(self.unsupported("toggle flag"));
        };
        self.action(token, id, flag.action(value)).await
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_actions() {
        let flag = TRENDING_NEWS.flag.unwrap();
        assert_eq!(flag.action(true), "mark-trending");
        assert_eq!(flag.action(false), "unmark-trending");
        assert_eq!(flag.success_message(true), "Marked as trending");
        assert_eq!(flag.success_message(false), "Unmarked trending");
    }

    #[test]
    fn pending_only_where_listed() {
        let client = DhartiClient::new((), url::Url::parse("https://host").unwrap());
        let research = Resource::new(client.clone(), &RESEARCH).pending().unwrap();
        assert!(research.is_pending());
        assert_eq!(research.list_path(), "api/admin/researches/pending");
        assert!(Resource::new(client, &NEWS).pending().is_err());
    }

    #[test]
    fn capitalize_field_names() {
        assert_eq!(capitalize("category"), "Category");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn item_paths() {
        let client = DhartiClient::new((), url::Url::parse("https://host").unwrap());
        let banners = Resource::new(client, &BANNERS);
        assert_eq!(banners.item_path(&ItemId::from(7u64)), "api/admin/banner/7");
        assert_eq!(banners.list_path(), "api/admin/banner");
    }
}
