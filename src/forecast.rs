//! Next-day temperature forecast providers.
//!
//! The controller charges for *tomorrow's* weather, not today's. The real
//! provider queries the OpenWeatherMap 3-hourly forecast, averages the
//! daytime samples, and discounts the temperature when a sunny afternoon is
//! expected (passive solar gain substitutes for stored heat).

use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, Timelike};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Daytime hours averaged for tomorrow's temperature estimate.
const TEMPERATURE_HOURS: [u32; 6] = [6, 9, 12, 15, 18, 21];
/// Early-afternoon hours whose cloud cover drives the sun correction.
const SUNSHINE_HOURS: [u32; 2] = [12, 15];

/// A corrected next-day temperature estimate.
#[derive(Debug, Clone, Copy)]
pub struct Forecast {
    /// Expected average temperature for tomorrow, sun-corrected (°C).
    pub corrected_temperature: f64,
}

/// Transient failure obtaining a forecast.
///
/// All variants degrade to the documented fallback: the previous charge
/// target is retained and the refresh is retried on the next eligible tick.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Transport-level failure reaching the weather service.
    #[error("forecast request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The response did not contain a usable sample for a required hour.
    #[error("forecast has no sample near {hour}:00 tomorrow")]
    MissingSample {
        /// Hour of day that could not be matched.
        hour: u32,
    },
    /// The response body did not match the expected schema.
    #[error("unexpected forecast response: {0}")]
    Schema(String),
}

/// Source of tomorrow's forecast, consulted around the midnight refresh.
pub trait ForecastProvider {
    /// Returns the corrected temperature estimate for the day after `today`.
    ///
    /// `sun_weight_zk` is the configured correction weight: degrees added
    /// per 100 % expected sunshine.
    ///
    /// # Errors
    ///
    /// Returns a [`ForecastError`] on any transient failure.
    fn tomorrow_forecast(&self, today: NaiveDate, sun_weight_zk: f64)
        -> Result<Forecast, ForecastError>;
}

/// OpenWeatherMap 3-hourly forecast response (the fields we consume).
#[derive(Debug, Deserialize)]
struct OwmResponse {
    list: Vec<OwmSample>,
}

#[derive(Debug, Deserialize)]
struct OwmSample {
    /// Sample time as a unix timestamp (UTC).
    dt: i64,
    main: OwmMain,
    clouds: OwmClouds,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    /// Cloud cover percentage: 0 = clear sky, 100 = overcast.
    all: f64,
}

/// Forecast provider backed by the OpenWeatherMap city forecast API.
pub struct OwmForecast {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    location_id: u64,
}

impl OwmForecast {
    /// Default API endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openweathermap.org/data/2.5/forecast";

    /// Creates a provider for the given city id.
    ///
    /// Requests carry a bounded timeout so a stalled weather service
    /// cannot stall a control tick past it.
    pub fn new(api_key: impl Into<String>, location_id: u64) -> Self {
        Self::with_base_url(api_key, location_id, Self::DEFAULT_BASE_URL)
    }

    /// Creates a provider against a custom endpoint (tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        location_id: u64,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            location_id,
        }
    }

    fn fetch(&self) -> Result<OwmResponse, ForecastError> {
        let response = self
            .client
            .get(&self.base_url)
            .timeout(Duration::from_secs(20))
            .query(&[
                ("id", self.location_id.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()?
            .error_for_status()?;
        let body: OwmResponse = response.json()?;
        if body.list.is_empty() {
            return Err(ForecastError::Schema("empty forecast list".to_string()));
        }
        Ok(body)
    }
}

/// Picks the sample closest to `hour:00` on `date`, within half the 3 h grid.
fn sample_near<'a>(
    samples: &'a [OwmSample],
    date: NaiveDate,
    hour: u32,
) -> Result<&'a OwmSample, ForecastError> {
    let mut best: Option<(&OwmSample, i64)> = None;
    for s in samples {
        let Some(at) = DateTime::from_timestamp(s.dt, 0) else {
            continue;
        };
        let local = at.naive_utc();
        if local.date() != date {
            continue;
        }
        let distance = (i64::from(local.hour()) * 60 + i64::from(local.minute())
            - i64::from(hour) * 60)
            .abs();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((s, distance));
        }
    }
    match best {
        Some((s, d)) if d <= 90 => Ok(s),
        _ => Err(ForecastError::MissingSample { hour }),
    }
}

impl ForecastProvider for OwmForecast {
    fn tomorrow_forecast(
        &self,
        today: NaiveDate,
        sun_weight_zk: f64,
    ) -> Result<Forecast, ForecastError> {
        let tomorrow = today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| ForecastError::Schema("date overflow".to_string()))?;
        let body = self.fetch()?;

        let mut temp_sum = 0.0;
        for hour in TEMPERATURE_HOURS {
            temp_sum += sample_near(&body.list, tomorrow, hour)?.main.temp;
        }
        let temp_avg = temp_sum / TEMPERATURE_HOURS.len() as f64;

        let mut cloud_sum = 0.0;
        for hour in SUNSHINE_HOURS {
            cloud_sum += sample_near(&body.list, tomorrow, hour)?.clouds.all;
        }
        let sun_avg = 100.0 - cloud_sum / SUNSHINE_HOURS.len() as f64;

        let corrected = temp_avg + sun_avg * sun_weight_zk / 100.0;
        info!(
            "tomorrow averages {temp_avg:.0}°C with {sun_avg:.0}% afternoon sunshine, \
             corrected temperature {corrected:.0}°C"
        );
        Ok(Forecast {
            corrected_temperature: corrected,
        })
    }
}

/// Provider returning a fixed temperature (simulation, tests).
#[derive(Debug, Clone, Copy)]
pub struct FixedForecast {
    /// Temperature returned as already corrected.
    pub temperature: f64,
}

impl ForecastProvider for FixedForecast {
    fn tomorrow_forecast(
        &self,
        _today: NaiveDate,
        _sun_weight_zk: f64,
    ) -> Result<Forecast, ForecastError> {
        Ok(Forecast {
            corrected_temperature: self.temperature,
        })
    }
}

/// Provider that always fails (fallback-path tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingForecast;

impl ForecastProvider for FailingForecast {
    fn tomorrow_forecast(
        &self,
        _today: NaiveDate,
        _sun_weight_zk: f64,
    ) -> Result<Forecast, ForecastError> {
        Err(ForecastError::Schema("forecast unavailable".to_string()))
    }
}
