use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::FetchError,
    model::Sample,
    provider::{response_body, unix_to_utc},
};

use super::WeatherProvider;

const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org";
const KELVIN_OFFSET: f64 = 273.15;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENWEATHER_API_BASE)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }
}

// Temperatures are requested in the API's standard units (Kelvin).
#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
}

fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn fetch(&self, location: &str) -> Result<Sample, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("q", location), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let body = response_body(res).await?;
        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;

        let condition = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| w.main)
            .ok_or(FetchError::MissingField("weather[0].main"))?;

        let timestamp = unix_to_utc(parsed.dt)?;
        debug!(location, kelvin = parsed.main.temp, "openweather response parsed");

        Ok(Sample::new(
            location,
            kelvin_to_celsius(parsed.main.temp),
            kelvin_to_celsius(parsed.main.feels_like),
            condition,
            timestamp,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_body(temp: f64, weather: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "name": "Delhi",
            "dt": 1_700_000_000,
            "main": { "temp": temp, "feels_like": temp + 2.0, "humidity": 40 },
            "weather": weather,
        })
    }

    #[tokio::test]
    async fn fetch_converts_kelvin_to_celsius() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Delhi"))
            .and(query_param("appid", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body(
                310.15,
                serde_json::json!([{ "main": "Clear", "description": "clear sky" }]),
            )))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), &server.uri());
        let sample = provider.fetch("Delhi").await.unwrap();

        assert_eq!(sample.location, "Delhi");
        assert!((sample.temperature_c - 37.0).abs() < 1e-9);
        assert!((sample.feels_like_c - 39.0).abs() < 1e-9);
        assert_eq!(sample.condition, "Clear");
        assert_eq!(sample.timestamp.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn fetch_fails_on_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(404).set_body_string("city not found"))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), &server.uri());
        let err = provider.fetch("Atlantis").await.unwrap_err();

        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn fetch_fails_without_condition() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(current_body(300.0, serde_json::json!([]))),
            )
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), &server.uri());
        let err = provider.fetch("Delhi").await.unwrap_err();

        assert!(matches!(err, FetchError::MissingField(_)));
    }

    #[tokio::test]
    async fn fetch_fails_on_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "dt": 1 })))
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::with_base_url("KEY".into(), &server.uri());
        let err = provider.fetch("Delhi").await.unwrap_err();

        assert!(matches!(err, FetchError::Parse(_)));
    }
}
