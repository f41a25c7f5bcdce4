//! Weather-station response parsing and median aggregation.
//!
//! Stations report independently and a single faulty sensor is common, so
//! the summary uses medians. Records that are malformed are skipped one by
//! one; only an empty result fails the whole fetch.

use alloc::vec::Vec;
use core::fmt::Write;

use heapless::{String as HeaplessString, Vec as HeaplessVec};
use log::{debug, info, warn};
use serde_json::Value;

use crate::{
    fetch::FetchError,
    status::{StatusMessage, format_message},
};

pub const FLAP_MESSAGE_BYTES: usize = 16;
pub const MAX_FLAP_MESSAGES: usize = 4;
pub const QUERY_PATH_BYTES: usize = 256;

const KNOTS_TO_MPH: f64 = 1.151;

pub type FlapMessage = HeaplessString<FLAP_MESSAGE_BYTES>;
pub type FlapMessages = HeaplessVec<FlapMessage, MAX_FLAP_MESSAGES>;

/// Latest-observation query against the station API.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeatherQuery {
    pub token: &'static str,
    pub latitude: f32,
    pub longitude: f32,
    pub radius_miles: u16,
    pub within_minutes: u16,
    pub limit: u8,
}

impl WeatherQuery {
    pub const fn new(token: &'static str, latitude: f32, longitude: f32) -> Self {
        Self {
            token,
            latitude,
            longitude,
            radius_miles: 4,
            within_minutes: 30,
            limit: 20,
        }
    }

    pub const fn with_radius_miles(mut self, radius_miles: u16) -> Self {
        self.radius_miles = radius_miles;
        self
    }

    pub const fn with_limit(mut self, limit: u8) -> Self {
        self.limit = limit;
        self
    }

    pub fn path(&self) -> HeaplessString<QUERY_PATH_BYTES> {
        let mut path = HeaplessString::new();
        let _ = write!(
            path,
            "/v2/stations/latest?&token={}&within={}&units=english&vars=air_temp,wind_speed\
             &varsoperator=and&radius={:.6},{:.6},{}&limit={}&fields=stid",
            self.token,
            self.within_minutes,
            self.latitude,
            self.longitude,
            self.radius_miles,
            self.limit
        );
        path
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub air_temp: f64,
    pub wind_speed: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeatherSummary {
    pub stations: usize,
    pub median_air_temp: f64,
    /// Knots, as reported by the stations.
    pub median_wind_speed: f64,
}

impl WeatherSummary {
    pub fn air_temp_f(&self) -> i32 {
        self.median_air_temp as i32
    }

    pub fn wind_speed_mph(&self) -> i32 {
        (self.median_wind_speed * KNOTS_TO_MPH) as i32
    }

    /// Texts rotated on the flaps.
    pub fn flap_messages(&self) -> FlapMessages {
        let mut messages = FlapMessages::new();
        let mut temp = FlapMessage::new();
        let _ = write!(temp, "{} f", self.air_temp_f());
        let mut wind = FlapMessage::new();
        let _ = write!(wind, "{} mph", self.wind_speed_mph());
        let _ = messages.push(temp);
        let _ = messages.push(wind);
        messages
    }

    pub fn summary_line(&self) -> StatusMessage {
        format_message(format_args!(
            "Data: {} f {} mph ({} stations)",
            self.air_temp_f(),
            self.wind_speed_mph(),
            self.stations
        ))
    }
}

/// Parses a raw response body and aggregates it.
pub fn summarize_response(body: &[u8]) -> Result<WeatherSummary, FetchError> {
    let json: Value = serde_json::from_slice(body).map_err(|err| {
        warn!("weather: error parsing response: {}", err);
        FetchError::Malformed
    })?;
    let observations = extract_observations(&json)?;
    summarize(&observations)
}

/// Collects every station that reports both a numeric air temperature and a
/// numeric wind speed.
pub fn extract_observations(json: &Value) -> Result<Vec<Observation>, FetchError> {
    let Some(stations) = json.get("STATION").and_then(Value::as_array) else {
        warn!("weather: parse error, STATION is not an array");
        return Err(FetchError::Malformed);
    };

    let mut observations = Vec::with_capacity(stations.len());
    for (index, station) in stations.iter().enumerate() {
        match station_observation(station) {
            Ok(observation) => observations.push(observation),
            Err(reason) => debug!("weather: station {} skipped: {}", index, reason),
        }
    }
    Ok(observations)
}

fn station_observation(station: &Value) -> Result<Observation, &'static str> {
    if !station.is_object() {
        return Err("bad station item");
    }
    let observations = station
        .get("OBSERVATIONS")
        .filter(|value| value.is_object())
        .ok_or("bad station observations")?;

    let air_temp = observation_value(observations, "air_temp_value_1")?;
    let wind_speed = observation_value(observations, "wind_speed_value_1")?;
    Ok(Observation {
        air_temp,
        wind_speed,
    })
}

fn observation_value(observations: &Value, key: &str) -> Result<f64, &'static str> {
    let entry = observations
        .get(key)
        .filter(|value| value.is_object())
        .ok_or("missing observation")?;
    entry
        .get("value")
        .and_then(Value::as_f64)
        .ok_or("non-numeric observation")
}

/// Median of `values`; sorts in place. Even counts average the two central
/// values.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len().is_multiple_of(2) {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Sorted set of the readings; repeated values count once toward the median.
fn distinct_values(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.collect();
    values.sort_unstable_by(f64::total_cmp);
    values.dedup();
    values
}

pub fn summarize(observations: &[Observation]) -> Result<WeatherSummary, FetchError> {
    let mut temps = distinct_values(observations.iter().map(|obs| obs.air_temp));
    let mut winds = distinct_values(observations.iter().map(|obs| obs.wind_speed));

    let (Some(median_air_temp), Some(median_wind_speed)) =
        (median(&mut temps), median(&mut winds))
    else {
        info!("weather: no data found");
        return Err(FetchError::NoData);
    };

    let summary = WeatherSummary {
        stations: observations.len(),
        median_air_temp,
        median_wind_speed,
    };
    info!(
        "weather: medians from {} stations: temp={}F wind_speed={} knots",
        summary.stations, summary.median_air_temp as i32, summary.median_wind_speed as i32
    );
    Ok(summary)
}
