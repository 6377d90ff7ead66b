//! Current weather via Open-Meteo.
//!
//! Two calls per lookup: the geocoding API resolves a free-form city name
//! (Russian names included), then the forecast API returns current
//! conditions. No API key required.

use bumblebot_core::error::RetrievalError;
use serde::Deserialize;
use tracing::debug;

const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Current conditions for one resolved location.
#[derive(Debug, Clone)]
pub struct WeatherReport {
    /// Resolved place name, as the geocoder spells it
    pub location: String,

    /// Country of the resolved place
    pub country: String,

    /// Air temperature, °C
    pub temperature: f64,

    /// Apparent temperature, °C
    pub feels_like: f64,

    /// Relative humidity, percent
    pub humidity: f64,

    /// Wind speed, km/h
    pub wind_speed: f64,

    /// WMO weather interpretation code
    pub weather_code: u8,
}

impl WeatherReport {
    /// Human-readable condition for the WMO code.
    pub fn condition(&self) -> &'static str {
        match self.weather_code {
            0 => "ясно",
            1..=3 => "переменная облачность",
            45 | 48 => "туман",
            51..=57 => "морось",
            61..=67 => "дождь",
            71..=77 => "снег",
            80..=82 => "ливень",
            85 | 86 => "снегопад",
            95..=99 => "гроза",
            _ => "без осадков",
        }
    }

    /// Render the report as a Telegram-ready message.
    pub fn format(&self) -> String {
        format!(
            "🌤 Погода в {}, {}:\n\
             🌡 Температура: {:.1}°C (ощущается как {:.1}°C)\n\
             ☁️ {}\n\
             💧 Влажность: {:.0}%\n\
             💨 Ветер: {:.1} км/ч",
            self.location,
            self.country,
            self.temperature,
            self.feels_like,
            self.condition(),
            self.humidity,
            self.wind_speed
        )
    }
}

/// Open-Meteo client.
pub struct WeatherClient {
    client: reqwest::Client,
    geocoding_url: String,
    forecast_url: String,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            geocoding_url: GEOCODING_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
        }
    }

    /// Point both endpoints at a different host. Used by tests.
    pub fn with_base_urls(
        mut self,
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
    ) -> Self {
        self.geocoding_url = geocoding_url.into();
        self.forecast_url = forecast_url.into();
        self
    }

    /// Current weather for a free-form city name.
    pub async fn current(&self, city: &str) -> Result<WeatherReport, RetrievalError> {
        let place = self.geocode(city).await?;
        debug!(city, lat = place.latitude, lon = place.longitude, "Geocoded");

        let response = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", place.latitude.to_string()),
                ("longitude", place.longitude.to_string()),
                (
                    "current",
                    "temperature_2m,apparent_temperature,relative_humidity_2m,wind_speed_10m,weather_code"
                        .to_string(),
                ),
            ])
            .send()
            .await
            .map_err(|e| RetrievalError::Http(e.to_string()))?;

        let forecast: ForecastResponse = response.json().await.map_err(|e| {
            RetrievalError::MalformedResponse {
                origin: "open-meteo".into(),
                reason: e.to_string(),
            }
        })?;

        Ok(WeatherReport {
            location: place.name,
            country: place.country.unwrap_or_default(),
            temperature: forecast.current.temperature_2m,
            feels_like: forecast.current.apparent_temperature,
            humidity: forecast.current.relative_humidity_2m,
            wind_speed: forecast.current.wind_speed_10m,
            weather_code: forecast.current.weather_code,
        })
    }

    async fn geocode(&self, city: &str) -> Result<GeocodingResult, RetrievalError> {
        let response = self
            .client
            .get(&self.geocoding_url)
            .query(&[("name", city), ("count", "1"), ("language", "ru")])
            .send()
            .await
            .map_err(|e| RetrievalError::Http(e.to_string()))?;

        let parsed: GeocodingResponse = response.json().await.map_err(|e| {
            RetrievalError::MalformedResponse {
                origin: "open-meteo geocoding".into(),
                reason: e.to_string(),
            }
        })?;

        parsed
            .results
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::LocationNotFound(city.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<GeocodingResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    apparent_temperature: f64,
    relative_humidity_2m: f64,
    wind_speed_10m: f64,
    weather_code: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(code: u8) -> WeatherReport {
        WeatherReport {
            location: "Москва".into(),
            country: "Россия".into(),
            temperature: -3.2,
            feels_like: -7.8,
            humidity: 86.0,
            wind_speed: 12.4,
            weather_code: code,
        }
    }

    #[test]
    fn wmo_codes_map_to_conditions() {
        assert_eq!(report(0).condition(), "ясно");
        assert_eq!(report(2).condition(), "переменная облачность");
        assert_eq!(report(63).condition(), "дождь");
        assert_eq!(report(73).condition(), "снег");
        assert_eq!(report(96).condition(), "гроза");
        assert_eq!(report(200).condition(), "без осадков");
    }

    #[test]
    fn formatted_report_is_complete() {
        let rendered = report(71).format();
        assert!(rendered.contains("Погода в Москва, Россия"));
        assert!(rendered.contains("-3.2°C"));
        assert!(rendered.contains("ощущается как -7.8°C"));
        assert!(rendered.contains("снег"));
        assert!(rendered.contains("86%"));
        assert!(rendered.contains("12.4 км/ч"));
    }

    #[test]
    fn geocoding_response_parses() {
        let raw = r#"{"results":[{"name":"Казань","latitude":55.78,"longitude":49.12,"country":"Россия"}]}"#;
        let parsed: GeocodingResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.results[0].name, "Казань");
    }

    #[test]
    fn empty_geocoding_response_parses() {
        let parsed: GeocodingResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }

    #[test]
    fn forecast_response_parses() {
        let raw = r#"{"current":{"temperature_2m":21.5,"apparent_temperature":20.0,"relative_humidity_2m":55,"wind_speed_10m":8.2,"weather_code":1}}"#;
        let parsed: ForecastResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.current.weather_code, 1);
    }
}
