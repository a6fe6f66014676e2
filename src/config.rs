use std::env;
use std::ops::RangeInclusive;

use crate::engine::pricing::PricingPolicy;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub event_buffer_size: usize,
    pub rng_seed: Option<u64>,
    pub average_speed_kmh: f64,
    pub cancellation_fee: f64,
    pub peak_hours: Vec<RangeInclusive<u32>>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let peak_hours = match env::var("PEAK_HOURS") {
            Ok(raw) => parse_peak_hours(&raw)?,
            Err(_) => PricingPolicy::default().peak_hours,
        };

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 8000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            rng_seed: parse_optional("RNG_SEED")?,
            average_speed_kmh: parse_or_default("AVERAGE_SPEED_KMH", 30.0)?,
            cancellation_fee: parse_or_default("CANCELLATION_FEE", 50.0)?,
            peak_hours,
        };

        if !(config.average_speed_kmh.is_finite() && config.average_speed_kmh > 0.0) {
            return Err(AppError::Internal(
                "invalid AVERAGE_SPEED_KMH: must be a positive number".to_string(),
            ));
        }
        if !(config.cancellation_fee.is_finite() && config.cancellation_fee >= 0.0) {
            return Err(AppError::Internal(
                "invalid CANCELLATION_FEE: must be a non-negative number".to_string(),
            ));
        }

        Ok(config)
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            average_speed_kmh: self.average_speed_kmh,
            cancellation_fee: self.cancellation_fee,
            peak_hours: self.peak_hours.clone(),
            ..PricingPolicy::default()
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(key)?.unwrap_or(default))
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}

/// Parses a comma separated list of inclusive hour bands, e.g. `8-10,17-20`.
pub fn parse_peak_hours(raw: &str) -> Result<Vec<RangeInclusive<u32>>, AppError> {
    let invalid = |reason: String| AppError::Internal(format!("invalid PEAK_HOURS: {reason}"));

    raw.split(',')
        .map(str::trim)
        .filter(|band| !band.is_empty())
        .map(|band| {
            let (start, end) = band
                .split_once('-')
                .ok_or_else(|| invalid(format!("band `{band}` is not `start-end`")))?;
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|err| invalid(format!("band `{band}`: {err}")))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|err| invalid(format!("band `{band}`: {err}")))?;

            if start > end || end > 23 {
                return Err(invalid(format!("band `{band}` must satisfy start <= end <= 23")));
            }

            Ok(start..=end)
        })
        .collect()
}
