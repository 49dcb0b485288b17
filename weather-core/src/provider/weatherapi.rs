use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::FetchError,
    model::Sample,
    provider::{response_body, unix_to_utc},
};

use super::WeatherProvider;

const WEATHERAPI_BASE: &str = "http://api.weatherapi.com";

#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiProvider {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, WEATHERAPI_BASE)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Self {
        Self { api_key, base_url: base_url.trim_end_matches('/').to_string(), http: Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    condition: WaCondition,
    last_updated_epoch: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    current: WaCurrent,
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    async fn fetch(&self, location: &str) -> Result<Sample, FetchError> {
        let url = format!("{}/v1/current.json", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("q", location)])
            .send()
            .await?;

        let body = response_body(res).await?;
        let parsed: WaResponse = serde_json::from_str(&body)?;

        let epoch = parsed
            .current
            .last_updated_epoch
            .ok_or(FetchError::MissingField("current.last_updated_epoch"))?;

        Ok(Sample::new(
            location,
            parsed.current.temp_c,
            parsed.current.feelslike_c,
            parsed.current.condition.text,
            unix_to_utc(epoch)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_reads_celsius_fields() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .and(query_param("q", "Mumbai"))
            .and(query_param("key", "KEY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "location": { "name": "Mumbai", "country": "India" },
                "current": {
                    "temp_c": 31.5,
                    "feelslike_c": 36.0,
                    "humidity": 70,
                    "wind_kph": 12.0,
                    "condition": { "text": "Partly cloudy" },
                    "last_updated_epoch": 1_700_000_100
                }
            })))
            .mount(&server)
            .await;

        let provider = WeatherApiProvider::with_base_url("KEY".into(), &server.uri());
        let sample = provider.fetch("Mumbai").await.unwrap();

        assert_eq!(sample.location, "Mumbai");
        assert_eq!(sample.temperature_c, 31.5);
        assert_eq!(sample.feels_like_c, 36.0);
        assert_eq!(sample.condition, "Partly cloudy");
        assert_eq!(sample.timestamp.timestamp(), 1_700_000_100);
    }

    #[tokio::test]
    async fn fetch_requires_observation_time() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current": {
                    "temp_c": 20.0,
                    "feelslike_c": 19.0,
                    "condition": { "text": "Mist" }
                }
            })))
            .mount(&server)
            .await;

        let provider = WeatherApiProvider::with_base_url("KEY".into(), &server.uri());
        let err = provider.fetch("Mumbai").await.unwrap_err();

        assert!(matches!(err, FetchError::MissingField("current.last_updated_epoch")));
    }

    #[tokio::test]
    async fn fetch_reports_rejected_key() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/current.json"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key invalid"))
            .mount(&server)
            .await;

        let provider = WeatherApiProvider::with_base_url("BAD".into(), &server.uri());
        let err = provider.fetch("Mumbai").await.unwrap_err();

        assert!(err.to_string().contains("API key invalid"));
    }
}
