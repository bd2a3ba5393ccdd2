// Poetry Engine — Weather (Open-Meteo)
// Current conditions for the configured coordinate. No API key required.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::WeatherSource;
use crate::atoms::types::WeatherReport;
use crate::engine::config::LocationConfig;
use crate::engine::http::{send_with_retry, CircuitBreaker};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

static WEATHER_CIRCUIT: LazyLock<CircuitBreaker> = LazyLock::new(|| CircuitBreaker::new(3, 300));

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentConditions,
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    temperature_2m: f64,
    weather_code: i64,
    wind_speed_10m: f64,
    relative_humidity_2m: f64,
}

/// WMO weather interpretation code → plain-language description.
pub fn describe_weather_code(code: i64) -> String {
    let text = match code {
        0 => "clear sky",
        1 => "mainly clear",
        2 => "partly cloudy",
        3 => "overcast",
        45 => "fog",
        48 => "depositing rime fog",
        51 => "light drizzle",
        53 => "moderate drizzle",
        55 => "dense drizzle",
        61 => "slight rain",
        63 => "moderate rain",
        65 => "heavy rain",
        71 => "slight snow",
        73 => "moderate snow",
        75 => "heavy snow",
        80 => "slight rain showers",
        81 => "moderate rain showers",
        82 => "violent rain showers",
        85 => "slight snow showers",
        86 => "heavy snow showers",
        95 => "thunderstorm",
        96 => "thunderstorm with slight hail",
        99 => "thunderstorm with heavy hail",
        other => return format!("code {}", other),
    };
    text.to_string()
}

pub struct OpenMeteoWeather {
    client: Client,
    location: LocationConfig,
}

impl OpenMeteoWeather {
    pub fn new(location: &LocationConfig) -> Self {
        OpenMeteoWeather {
            client: Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_default(),
            location: location.clone(),
        }
    }

    fn forecast_url(&self) -> String {
        format!(
            "{}?latitude={}&longitude={}&current=temperature_2m,weather_code,wind_speed_10m,relative_humidity_2m&timezone={}",
            OPEN_METEO_URL,
            self.location.lat,
            self.location.lon,
            urlencoding::encode(&self.location.timezone)
        )
    }
}

fn report_from_json(raw: &str) -> EngineResult<WeatherReport> {
    let parsed: ForecastResponse = serde_json::from_str(raw)
        .map_err(|e| EngineError::provider("open-meteo", format!("unexpected response: {}", e)))?;
    let c = parsed.current;
    Ok(WeatherReport {
        description: describe_weather_code(c.weather_code),
        temperature: c.temperature_2m,
        wind: c.wind_speed_10m,
        humidity: c.relative_humidity_2m,
    })
}

#[async_trait]
impl WeatherSource for OpenMeteoWeather {
    async fn fetch_weather(&self) -> EngineResult<WeatherReport> {
        let url = self.forecast_url();
        let response = send_with_retry(&WEATHER_CIRCUIT, "open-meteo", || self.client.get(&url)).await?;
        let report = report_from_json(&response.text().await?)?;
        info!("[weather] {}", report.context_line());
        Ok(report)
    }
}
