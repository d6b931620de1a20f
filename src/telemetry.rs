//! Fire-and-forget telemetry publication.
//!
//! Each tick the controller publishes the current tariff label and setpoint
//! for external dashboards. A failed publish is logged and dropped; the next
//! tick naturally retries with fresh data.

use std::fmt;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;

/// Tariff label published alongside the setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffLabel {
    /// Night tariff active.
    Night,
    /// Day tariff.
    Day,
}

impl TariffLabel {
    /// Builds a label from the tariff-active flag.
    pub fn from_active(tariff_active: bool) -> Self {
        if tariff_active {
            Self::Night
        } else {
            Self::Day
        }
    }

    /// Wire representation, `"N"` or `"T"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Night => "N",
            Self::Day => "T",
        }
    }
}

impl fmt::Display for TariffLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure publishing a telemetry sample. Never propagated past the loop.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Transport-level failure reaching the endpoint.
    #[error("telemetry publish failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The endpoint rejected the sample.
    #[error("telemetry endpoint returned {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },
}

/// Sink accepting `(tariff, setpoint)` pairs once per tick.
pub trait TelemetrySink {
    /// Publishes one sample.
    ///
    /// # Errors
    ///
    /// Returns a [`TelemetryError`] on failure; the control loop logs it and
    /// carries on.
    fn publish(&mut self, label: TariffLabel, setpoint_pct: f64) -> Result<(), TelemetryError>;
}

/// Sink POSTing samples as JSON to a configured endpoint.
pub struct HttpTelemetry {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpTelemetry {
    /// Creates a sink for the given endpoint URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            url: url.into(),
        }
    }
}

impl TelemetrySink for HttpTelemetry {
    fn publish(&mut self, label: TariffLabel, setpoint_pct: f64) -> Result<(), TelemetryError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(Duration::from_secs(5))
            .json(&json!({
                "tariff": label.as_str(),
                // one decimal, matching the console and log output
                "setpoint_pct": (setpoint_pct * 10.0).round() / 10.0,
            }))
            .send()?;
        if !response.status().is_success() {
            return Err(TelemetryError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Sink that discards everything (simulation without an endpoint).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn publish(&mut self, _label: TariffLabel, _setpoint_pct: f64) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Sink collecting samples in memory (tests, simulation reports).
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    /// Published samples in order.
    pub samples: Vec<(TariffLabel, f64)>,
}

impl TelemetrySink for RecordingTelemetry {
    fn publish(&mut self, label: TariffLabel, setpoint_pct: f64) -> Result<(), TelemetryError> {
        self.samples.push((label, setpoint_pct));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_wire_format() {
        assert_eq!(TariffLabel::from_active(true).as_str(), "N");
        assert_eq!(TariffLabel::from_active(false).as_str(), "T");
        assert_eq!(TariffLabel::Night.to_string(), "N");
    }

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingTelemetry::default();
        sink.publish(TariffLabel::Night, 60.0).unwrap();
        sink.publish(TariffLabel::Day, 0.0).unwrap();
        assert_eq!(sink.samples.len(), 2);
        assert_eq!(sink.samples[0], (TariffLabel::Night, 60.0));
        assert_eq!(sink.samples[1], (TariffLabel::Day, 0.0));
    }

    #[test]
    fn null_sink_accepts_everything() {
        let mut sink = NullTelemetry;
        assert!(sink.publish(TariffLabel::Day, 42.0).is_ok());
    }
}
