//! The publishing API is not consistent about where it puts things. List
//! endpoints answer with a bare array, `{data: [...]}` or `{data: {data:
//! [...]}}`; records name their id `id`, `_id` or something resource
//! specific; categories call their label `category`, `name` or `title`.
//!
//! Every such fallback lives here, with a fixed precedence, and is applied
//! once where a response enters the client.

use serde_json::Value;
use smol_str::SmolStr;

use crate::types::{ItemId, Record};

/// Keys tried, in order, when resolving a record's identifier.
pub const ID_KEYS: &[&str] = &["id", "_id", "trending_news_id", "news_id", "uuid"];

/// Keys tried, in order, for a human readable label (categories in particular).
pub const NAME_KEYS: &[&str] = &["category", "name", "title"];

/// Keys tried, in order, for ticker text on trending items.
pub const HEADLINE_KEYS: &[&str] = &["description", "headline", "name", "text"];

/// Pull the list out of a list response.
///
/// Precedence: the body itself if it is an array, then `data` if that is an
/// array, then `data.data`. Anything else is an empty list.
pub fn list_payload(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(Value::Object(mut inner)) => match inner.remove("data") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            },
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// [`list_payload`], keeping only the object entries.
pub fn records(body: Value) -> Vec<Record> {
    list_payload(body)
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

/// Unwrap a single-object response: `data` when it is an object, else the body.
pub fn single_payload(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert("data".to_owned(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// First key in `keys` holding a non-empty string.
pub fn first_text<'r>(record: &'r Record, keys: &[&str]) -> Option<&'r str> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
}

/// Accessors for the loosely shaped records the API returns.
pub trait RecordExt {
    /// Identifier by [`ID_KEYS`] precedence.
    fn item_id(&self) -> Option<ItemId>;
    /// Label by [`NAME_KEYS`] precedence, empty when nothing matches.
    fn display_name(&self) -> &str;
    /// Ticker text by [`HEADLINE_KEYS`] precedence.
    fn headline(&self) -> Option<&str>;
    /// A string field, empty when absent.
    fn text(&self, key: &str) -> &str;
    /// A boolean field using the API's truthiness: `true`, non-zero numbers,
    /// and the strings `"1"`/`"true"` are set; everything else is unset.
    fn flag(&self, key: &str) -> bool;
    /// Overwrite a boolean field.
    fn set_flag(&mut self, key: &str, value: bool);
}

impl RecordExt for Record {
    fn item_id(&self) -> Option<ItemId> {
        ID_KEYS
            .iter()
            .filter_map(|k| self.get(*k))
            .find_map(ItemId::from_value)
    }

    fn display_name(&self) -> &str {
        first_text(self, NAME_KEYS).unwrap_or("")
    }

    fn headline(&self) -> Option<&str> {
        first_text(self, HEADLINE_KEYS)
    }

    fn text(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or("")
    }

    fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => matches!(s.as_str(), "1" | "true"),
            _ => false,
        }
    }

    fn set_flag(&mut self, key: &str, value: bool) {
        self.insert(key.to_owned(), Value::Bool(value));
    }
}

/// Token, user and message out of a login or signup response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthPayload {
    /// Bearer token, `data.token` before top-level `token`.
    pub token: Option<SmolStr>,
    /// User object, `data.user` before top-level `user`.
    pub user: Option<Value>,
    /// Server message, if any.
    pub message: Option<String>,
}

impl AuthPayload {
    /// Apply the token/user/message precedence to a response body.
    pub fn from_body(body: &Value) -> Self {
        let data = body.get("data");
        let token = data
            .and_then(|d| d.get("token"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| body.get("token").and_then(Value::as_str).filter(|s| !s.is_empty()))
            .map(SmolStr::new);
        let user = data
            .and_then(|d| d.get("user"))
            .filter(|u| !u.is_null())
            .or_else(|| body.get("user").filter(|u| !u.is_null()))
            .cloned();
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        Self {
            token,
            user,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn list_payload_precedence() {
        assert_eq!(list_payload(json!([1, 2])), vec![json!(1), json!(2)]);
        assert_eq!(list_payload(json!({"data": [3]})), vec![json!(3)]);
        assert_eq!(list_payload(json!({"data": {"data": [4]}})), vec![json!(4)]);
        assert!(list_payload(json!({"data": "nope"})).is_empty());
        assert!(list_payload(json!(null)).is_empty());
        assert!(list_payload(json!({"items": [1]})).is_empty());
    }

    #[test]
    fn records_skip_non_objects() {
        let out = records(json!({"data": [{"id": 1}, 2, "x", {"id": 3}]}));
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].item_id(), Some(ItemId::from(3u64)));
    }

    #[test]
    fn id_precedence_skips_blank() {
        let r = rec(json!({"id": "", "_id": null, "trending_news_id": 9, "uuid": "u"}));
        assert_eq!(r.item_id(), Some(ItemId::from(9u64)));
        let r = rec(json!({"title": "no id"}));
        assert_eq!(r.item_id(), None);
    }

    #[test]
    fn name_and_headline_precedence() {
        let r = rec(json!({"name": "Seeds", "title": "ignored"}));
        assert_eq!(r.display_name(), "Seeds");
        let r = rec(json!({"category": "", "title": "Fertiliser"}));
        assert_eq!(r.display_name(), "Fertiliser");
        assert_eq!(rec(json!({})).display_name(), "");

        let r = rec(json!({"headline": "Monsoon early", "text": "x"}));
        assert_eq!(r.headline(), Some("Monsoon early"));
    }

    #[test]
    fn flag_truthiness() {
        let r = rec(json!({"a": true, "b": 1, "c": "1", "d": 0, "e": "0", "f": null}));
        assert!(r.flag("a") && r.flag("b") && r.flag("c"));
        assert!(!r.flag("d") && !r.flag("e") && !r.flag("f") && !r.flag("missing"));
    }

    #[test]
    fn auth_payload_prefers_nested() {
        let body = json!({
            "message": "Welcome",
            "token": "outer",
            "data": {"token": "inner", "user": {"email": "a@b.c"}}
        });
        let p = AuthPayload::from_body(&body);
        assert_eq!(p.token.as_deref(), Some("inner"));
        assert_eq!(p.user, Some(json!({"email": "a@b.c"})));
        assert_eq!(p.message.as_deref(), Some("Welcome"));

        let p = AuthPayload::from_body(&json!({"token": "flat", "user": {"id": 1}}));
        assert_eq!(p.token.as_deref(), Some("flat"));
        assert_eq!(p.user, Some(json!({"id": 1})));
        assert!(p.message.is_none());
    }

    #[test]
    fn single_payload_unwraps_data_object() {
        assert_eq!(single_payload(json!({"data": {"id": 1}})), json!({"id": 1}));
        assert_eq!(single_payload(json!({"id": 2})), json!({"id": 2}));
        assert_eq!(single_payload(json!({"data": [1]})), json!({"data": [1]}));
    }
}
