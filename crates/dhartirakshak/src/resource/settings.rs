//! Business settings: integration keys stored server-side as `{key, value}`
//! rows, where `value` is a small JSON object.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use smol_str::SmolStr;

use dhartirakshak_common::http_client::HttpClient;
use dhartirakshak_common::normalize;
use dhartirakshak_common::{ApiResult, ClientError};

use crate::client::DhartiClient;

const ADMIN_PATH: &str = "api/admin/business-settings";
const PUBLIC_PATH: &str = "api/business-settings";

/// One stored setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingEntry {
    /// Setting name, e.g. `weather_api`
    pub key: SmolStr,
    /// Setting payload
    #[serde(default)]
    pub value: Value,
}

/// The settings the admin panel knows how to edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// `google_maps`: `{api_key}`
    GoogleMaps,
    /// `payment_keys`: `{razorpay_key_id, razorpay_key_secret}`
    PaymentKeys,
    /// `weather_api`: `{api_key}`
    WeatherApi,
}

impl SettingKey {
    /// Every known key.
    pub const ALL: [SettingKey; 3] = [Self::GoogleMaps, Self::PaymentKeys, Self::WeatherApi];

    /// Stored key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleMaps => "google_maps",
            Self::PaymentKeys => "payment_keys",
            Self::WeatherApi => "weather_api",
        }
    }

    /// Notification after a successful save.
    pub fn saved_message(&self) -> &'static str {
        match self {
            Self::GoogleMaps => "Google Maps settings saved",
            Self::PaymentKeys => "Payment settings saved",
            Self::WeatherApi => "Weather API settings saved",
        }
    }

    /// Notification after a failed save.
    pub fn failed_message(&self) -> &'static str {
        match self {
            Self::GoogleMaps => "Failed to save Google Maps settings",
            Self::PaymentKeys => "Failed to save payment settings",
            Self::WeatherApi => "Failed to save Weather API settings",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ClientError::invalid(format!("unknown setting {s:?}")))
    }
}

/// Typed view over the known settings. Missing values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusinessSettings {
    /// Google Maps API key
    pub google_maps_key: String,
    /// Razorpay key id
    pub razorpay_key_id: String,
    /// Razorpay key secret
    pub razorpay_key_secret: String,
    /// OpenWeatherMap API key
    pub weather_api_key: String,
}

impl BusinessSettings {
    /// Pick the known keys out of stored rows. Later rows win.
    pub fn from_entries(entries: &[SettingEntry]) -> Self {
        let mut out = Self::default();
        for entry in entries {
            let field = |name: &str| {
                entry
                    .value
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_owned()
            };
            match entry.key.parse::<SettingKey>() {
                Ok(SettingKey::GoogleMaps) => out.google_maps_key = field("api_key"),
                Ok(SettingKey::PaymentKeys) => {
                    out.razorpay_key_id = field("razorpay_key_id");
                    out.razorpay_key_secret = field("razorpay_key_secret");
                }
                Ok(SettingKey::WeatherApi) => out.weather_api_key = field("api_key"),
                Err(_) => {}
            }
        }
        out
    }

    /// Payload to store under `key`.
    pub fn value_for(&self, key: SettingKey) -> Value {
        match key {
            SettingKey::GoogleMaps => json!({ "api_key": self.google_maps_key }),
            SettingKey::PaymentKeys => json!({
                "razorpay_key_id": self.razorpay_key_id,
                "razorpay_key_secret": self.razorpay_key_secret,
            }),
            SettingKey::WeatherApi => json!({ "api_key": self.weather_api_key }),
        }
    }

    /// Weather key, when one is set.
    pub fn weather_key(&self) -> Option<&str> {
        Some(self.weather_api_key.as_str()).filter(|k| !k.is_empty())
    }
}

fn entries(body: Value) -> Vec<SettingEntry> {
    normalize::list_payload(body)
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

/// Admin and public business settings endpoints.
#[derive(Debug, Clone)]
pub struct SettingsApi<C> {
    client: DhartiClient<C>,
}

impl<C: HttpClient> SettingsApi<C> {
    /// Wrap a client.
    pub fn new(client: DhartiClient<C>) -> Self {
        Self { client }
    }

    /// Every stored row (admin).
    pub async fn list(&self, token: &str) -> ApiResult<Vec<SettingEntry>> {
        let resp = self.client.call().auth(token).get(ADMIN_PATH).await?;
        Ok(entries(resp.json()?))
    }

    /// Typed view of the stored rows (admin).
    pub async fn load(&self, token: &str) -> ApiResult<BusinessSettings> {
        let entries = self.list(token).await?;
        Ok(BusinessSettings::from_entries(&entries))
    }

    /// Store one row (admin).
    #[tracing::instrument(level = "debug", skip(self, token, value))]
    pub async fn save(&self, token: &str, key: &str, value: Value) -> ApiResult<Value> {
        if key.trim().is_empty() {
            return Err(ClientError::invalid("Setting key is required"));
        }
        let resp = self
            .client
            .call()
            .auth(token)
            .post_json(ADMIN_PATH, &json!({ "key": key, "value": value }))
            .await?;
        Ok(resp.json()?)
    }

    /// Store one known key from a typed view (admin).
    pub async fn save_known(
        &self,
        token: &str,
        key: SettingKey,
        settings: &BusinessSettings,
    ) -> ApiResult<Value> {
        self.save(token, key.as_str(), settings.value_for(key)).await
    }

    /// Publicly readable rows.
    pub async fn public_list(&self) -> ApiResult<Vec<SettingEntry>> {
        let resp = self.client.call().get(PUBLIC_PATH).await?;
        Ok(entries(resp.json()?))
    }

    /// Weather key from the public settings, if the admin has set one.
    pub async fn public_weather_key(&self) -> ApiResult<Option<String>> {
        let entries = self.public_list().await?;
        let settings = BusinessSettings::from_entries(&entries);
        Ok(settings.weather_key().map(str::to_owned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_view_defaults_to_empty() {
        let rows = entries(json!([
            {"key": "google_maps", "value": {"api_key": "gm"}},
            {"key": "payment_keys", "value": {"razorpay_key_id": "rk"}},
            {"key": "something_else", "value": 3},
            {"no_key": true}
        ]));
        assert_eq!(rows.len(), 3);
        let s = BusinessSettings::from_entries(&rows);
        assert_eq!(s.google_maps_key, "gm");
        assert_eq!(s.razorpay_key_id, "rk");
        assert_eq!(s.razorpay_key_secret, "");
        assert_eq!(s.weather_key(), None);
    }

    #[test]
    fn wrapped_rows_are_accepted() {
        let rows = entries(json!({"data": [{"key": "weather_api", "value": {"api_key": "ow"}}]}));
        assert_eq!(BusinessSettings::from_entries(&rows).weather_key(), Some("ow"));
    }

    #[test]
    fn payloads_per_key() {
        let s = BusinessSettings {
            razorpay_key_id: "id".into(),
            razorpay_key_secret: "secret".into(),
            ..Default::default()
        };
        assert_eq!(
            s.value_for(SettingKey::PaymentKeys),
            json!({"razorpay_key_id": "id", "razorpay_key_secret": "secret"})
        );
        assert_eq!(s.value_for(SettingKey::WeatherApi), json!({"api_key": ""}));
        assert_eq!("weather_api".parse::<SettingKey>().unwrap(), SettingKey::WeatherApi);
        assert!("maps".parse::<SettingKey>().is_err());
    }
}
