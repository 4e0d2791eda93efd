//! OpenWeatherMap lookups for the weather widget.
//!
//! Current conditions come from `data/2.5/weather` in metric units; city
//! search and reverse lookup from the `geo/1.0` geocoding API. Every call
//! needs an API key, which the site keeps in the `weather_api` business
//! setting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use url::Url;

use dhartirakshak_common::api::{ApiCall, ApiExt};
use dhartirakshak_common::http_client::HttpClient;
use dhartirakshak_common::session::SessionStore;
use dhartirakshak_common::{ApiResult, ClientError};

/// OpenWeatherMap API host.
pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Country code appended to city queries unless configured otherwise.
pub const DEFAULT_COUNTRY: &str = "IN";

/// City shown before the user picks one.
pub const DEFAULT_CITY: &str = "Indore";

/// Name used when reverse lookup finds nothing.
pub const FALLBACK_PLACE: &str = "My Location";

/// Default result cap for city search.
pub const SEARCH_LIMIT: u32 = 10;

/// Current conditions, as much of the response as the widget shows.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CurrentWeather {
    /// Place name OpenWeatherMap resolved
    pub name: String,
    /// Temperatures, humidity and pressure
    pub main: MainReadings,
    /// Condition summaries, most relevant first
    pub weather: Vec<Condition>,
    /// Wind
    pub wind: Wind,
}

impl CurrentWeather {
    /// First condition's description, e.g. `"light rain"`.
    pub fn summary(&self) -> Option<&str> {
        self.weather.first().map(|c| c.description.as_str())
    }
}

/// `main` block of a weather response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MainReadings {
    /// Temperature, °C
    pub temp: f64,
    /// Felt temperature, °C
    pub feels_like: f64,
    /// Relative humidity, %
    pub humidity: f64,
    /// Pressure, hPa
    pub pressure: f64,
}

/// One entry of the `weather` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Condition {
    /// Group, e.g. `Rain`
    pub main: String,
    /// Detail, e.g. `light rain`
    pub description: String,
    /// Icon code
    pub icon: String,
}

/// `wind` block of a weather response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Wind {
    /// Speed, m/s
    pub speed: f64,
}

/// Geocoding result. Entries without coordinates are not results.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GeoLocation {
    /// Place name
    #[serde(default)]
    pub name: String,
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
    /// ISO country code
    #[serde(default)]
    pub country: String,
    /// State or province
    #[serde(default)]
    pub state: Option<String>,
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coords {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
}

impl Coords {
    fn check(lat: f64, lon: f64) -> ApiResult<Self> {
        if lat.is_finite() && lon.is_finite() {
            Ok(Self { lat, lon })
        } else {
            Err(ClientError::invalid("Invalid coordinates"))
        }
    }
}

/// OpenWeatherMap client.
#[derive(Debug, Clone)]
pub struct WeatherClient<C> {
    http: C,
    base: Url,
    api_key: Option<SmolStr>,
    country: SmolStr,
}

impl<C> WeatherClient<C> {
    /// Client against the public OpenWeatherMap host. A blank key counts
    /// as missing.
    pub fn new(http: C, api_key: Option<impl Into<SmolStr>>) -> Self {
        let base = match Url::parse(OPENWEATHER_BASE_URL) {
            Ok(url) => url,
            Err(_) => unreachable!("OPENWEATHER_BASE_URL is a valid URL"),
        };
        Self {
            http,
            base,
            api_key: api_key.map(Into::into).filter(|k: &SmolStr| !k.trim().is_empty()),
            country: SmolStr::new_static(DEFAULT_COUNTRY),
        }
    }

    /// Point at another host.
    pub fn with_base(mut self, base: Url) -> Self {
        self.base = base;
        self
    }

    /// Country code appended to city queries. Empty sends the bare name.
    pub fn with_country(mut self, country: impl Into<SmolStr>) -> Self {
        self.country = country.into();
        self
    }

    /// True when an API key is set.
    pub fn has_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn place(&self, name: &str) -> String {
        if self.country.is_empty() {
            name.to_owned()
        } else {
            format!("{name},{}", self.country)
        }
    }
}

impl<C: HttpClient> WeatherClient<C> {
    fn call(&self) -> ApiResult<ApiCall<'_, C>> {
        let key = self
            .api_key
            .clone()
            .ok_or_else(|| ClientError::invalid("Missing weather API key"))?;
        Ok(self.http.api(self.base.clone()).query("appid", key))
    }

    /// Current conditions for a city.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn current_by_city(&self, city: &str) -> ApiResult<CurrentWeather> {
        let call = self.call()?;
        let resp = call
            .query("q", self.place(city))
            .query("units", "metric")
            .get("data/2.5/weather")
            .await?;
        Ok(resp.parse()?)
    }

    /// Current conditions at a point.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn current_by_coords(&self, lat: f64, lon: f64) -> ApiResult<CurrentWeather> {
        let call = self.call()?;
        let at = Coords::check(lat, lon)?;
        let resp = call
            .query("lat", at.lat.to_string())
            .query("lon", at.lon.to_string())
            .query("units", "metric")
            .get("data/2.5/weather")
            .await?;
        Ok(resp.parse()?)
    }

    /// Current conditions for a saved location: its coordinates when known,
    /// else its city name.
    pub async fn current_for(&self, location: &SavedLocation) -> ApiResult<CurrentWeather> {
        match location.coords {
            Some(c) => self.current_by_coords(c.lat, c.lon).await,
            None => self.current_by_city(&location.city).await,
        }
    }

    /// Cities matching `query`. A blank query returns nothing without a call.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn search_cities(&self, query: &str, limit: u32) -> ApiResult<Vec<GeoLocation>> {
        let call = self.call()?;
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let resp = call
            .query("q", self.place(query))
            .query("limit", limit.to_string())
            .get("geo/1.0/direct")
            .await?;
        Ok(locations(resp.json()?))
    }

    /// Places near a point, nearest first.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn reverse_lookup(&self, lat: f64, lon: f64, limit: u32) -> ApiResult<Vec<GeoLocation>> {
        let call = self.call()?;
        let at = Coords::check(lat, lon)?;
        let resp = call
            .query("lat", at.lat.to_string())
            .query("lon", at.lon.to_string())
            .query("limit", limit.to_string())
            .get("geo/1.0/reverse")
            .await?;
        Ok(locations(resp.json()?))
    }

    /// Name a point for saving: the nearest place, or [`FALLBACK_PLACE`]
    /// when lookup fails or finds nothing.
    pub async fn locate(&self, lat: f64, lon: f64) -> ApiResult<SavedLocation> {
        let at = Coords::check(lat, lon)?;
        let city = match self.reverse_lookup(lat, lon, 1).await {
            Ok(found) => found
                .into_iter()
                .next()
                .map(|g| g.name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| FALLBACK_PLACE.to_owned()),
            Err(err) => {
                tracing::debug!(error = %err, "reverse lookup failed");
                FALLBACK_PLACE.to_owned()
            }
        };
        Ok(SavedLocation {
            city,
            coords: Some(at),
        })
    }
}

// Non-array bodies and malformed entries are dropped.
fn locations(body: Value) -> Vec<GeoLocation> {
    match body {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// The widget's chosen place, persisted between runs.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedLocation {
    /// Display name
    pub city: String,
    /// Exact point, when chosen from search or geolocation
    pub coords: Option<Coords>,
}

impl Default for SavedLocation {
    fn default() -> Self {
        Self {
            city: DEFAULT_CITY.to_owned(),
            coords: None,
        }
    }
}

impl SavedLocation {
    /// Store key for the city name.
    pub const CITY_KEY: &'static str = "weather_city";
    /// Store key for the coordinates.
    pub const COORDS_KEY: &'static str = "weather_city_coords";

    /// Location picked from a search result.
    pub fn from_geo(place: &GeoLocation) -> Self {
        Self {
            city: place.name.clone(),
            coords: Some(Coords {
                lat: place.lat,
                lon: place.lon,
            }),
        }
    }

    /// Load from a store, defaulting to [`DEFAULT_CITY`].
    pub async fn load<S>(store: &Arc<S>) -> Self
    where
        S: SessionStore<SmolStr, Value> + ?Sized,
    {
        let city = store
            .get(&SmolStr::new_static(Self::CITY_KEY))
            .await
            .and_then(|v| v.as_str().map(str::to_owned))
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CITY.to_owned());
        let coords = store
            .get(&SmolStr::new_static(Self::COORDS_KEY))
            .await
            .and_then(|v| serde_json::from_value(v).ok());
        Self { city, coords }
    }

    /// Persist to a store. A location without coordinates removes any
    /// previously saved ones.
    pub async fn save<S>(&self, store: &Arc<S>) -> ApiResult<()>
    where
        S: SessionStore<SmolStr, Value> + ?Sized,
    {
        store
            .set(
                SmolStr::new_static(Self::CITY_KEY),
                Value::String(self.city.clone()),
            )
            .await?;
        let key = SmolStr::new_static(Self::COORDS_KEY);
        match self.coords {
            Some(c) => {
                let value = serde_json::to_value(c)
                    .map_err(|e| ClientError::Encode(e.into()))?;
                store.set(key, value).await?
            }
            None => store.del(&key).await?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhartirakshak_common::session::MemorySessionStore;
    use serde_json::json;

    #[test]
    fn country_suffix() {
        let w = WeatherClient::new((), Some("k"));
        assert_eq!(w.place("Pune"), "Pune,IN");
        let w = w.with_country("");
        assert_eq!(w.place("Pune"), "Pune");
    }

    #[test]
    fn blank_key_is_missing() {
        assert!(!WeatherClient::new((), Some("  ")).has_key());
        assert!(!WeatherClient::new((), None::<&str>).has_key());
    }

    #[test]
    fn non_array_geocoding_is_empty() {
        assert!(locations(json!({"cod": "400"})).is_empty());
        let found = locations(json!([{"name": "Indore", "lat": 22.7, "lon": 75.8, "country": "IN"}, 5]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Indore");
    }

    #[test]
    fn weather_tolerates_missing_blocks() {
        let w: CurrentWeather = serde_json::from_value(json!({
            "name": "Bhopal",
            "main": {"temp": 31.5},
            "weather": [{"main": "Clouds", "description": "broken clouds"}]
        }))
        .unwrap();
        assert_eq!(w.main.temp, 31.5);
        assert_eq!(w.summary(), Some("broken clouds"));
        assert_eq!(w.wind.speed, 0.0);
    }

    #[tokio::test]
    async fn saved_location_round_trip() {
        let store = Arc::new(MemorySessionStore::<SmolStr, Value>::default());
        assert_eq!(SavedLocation::load(&store).await, SavedLocation::default());

        let place = GeoLocation {
            name: "Nashik".into(),
            lat: 19.99,
            lon: 73.78,
            ..Default::default()
        };
        SavedLocation::from_geo(&place).save(&store).await.unwrap();
        let loaded = SavedLocation::load(&store).await;
        assert_eq!(loaded.city, "Nashik");
        assert_eq!(loaded.coords, Some(Coords { lat: 19.99, lon: 73.78 }));

        SavedLocation::default().save(&store).await.unwrap();
        assert_eq!(SavedLocation::load(&store).await.coords, None);
    }
}
