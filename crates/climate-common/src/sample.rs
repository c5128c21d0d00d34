//! Sample data model: geolocated observations and per-variable scaling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, OverlayResult};

/// One set of variable readings at a sample location.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleValues {
    /// Surface temperature in °C.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
    /// Eastward wind component in m/s.
    pub wind_u: f32,
    /// Northward wind component in m/s.
    pub wind_v: f32,
    /// Precipitation in mm.
    pub precipitation: f32,
    /// Shortwave radiation in W/m².
    pub sunlight: f32,
}

/// A single geolocated observation. Immutable once fetched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Latitude in decimal degrees, positive north.
    pub latitude: f64,
    /// Longitude in decimal degrees, positive east.
    pub longitude: f64,
    pub values: SampleValues,
}

/// The variables the engine can visualize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClimateVariable {
    Temperature,
    Humidity,
    WindSpeed,
    Precipitation,
    Sunlight,
}

impl ClimateVariable {
    pub const ALL: [ClimateVariable; 5] = [
        ClimateVariable::Temperature,
        ClimateVariable::Humidity,
        ClimateVariable::WindSpeed,
        ClimateVariable::Precipitation,
        ClimateVariable::Sunlight,
    ];

    /// Display unit for legends and pick readouts.
    pub fn unit(&self) -> &'static str {
        match self {
            ClimateVariable::Temperature => "°C",
            ClimateVariable::Humidity => "%",
            ClimateVariable::WindSpeed => " m/s",
            ClimateVariable::Precipitation => " mm",
            ClimateVariable::Sunlight => " W/m²",
        }
    }

    /// Fixed normalization range for this variable.
    pub fn fixed_range(&self) -> NormalizationRange {
        match self {
            ClimateVariable::Temperature => NormalizationRange::new(-40.0, 50.0),
            ClimateVariable::Humidity => NormalizationRange::new(0.0, 100.0),
            ClimateVariable::WindSpeed => NormalizationRange::new(0.0, 30.0),
            ClimateVariable::Precipitation => NormalizationRange::new(0.0, 10.0),
            ClimateVariable::Sunlight => NormalizationRange::new(0.0, 1000.0),
        }
    }

    /// Extract this variable's scalar from a reading. Wind speed is the
    /// magnitude of the (u, v) components.
    pub fn value_of(&self, values: &SampleValues) -> f32 {
        match self {
            ClimateVariable::Temperature => values.temperature,
            ClimateVariable::Humidity => values.humidity,
            ClimateVariable::WindSpeed => values.wind_u.hypot(values.wind_v),
            ClimateVariable::Precipitation => values.precipitation,
            ClimateVariable::Sunlight => values.sunlight,
        }
    }

    /// Round to one decimal and append the unit, e.g. "23.4°C".
    pub fn format_value(&self, value: f32) -> String {
        let rounded = (value * 10.0).round() / 10.0;
        format!("{}{}", rounded, self.unit())
    }
}

impl std::str::FromStr for ClimateVariable {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(ClimateVariable::Temperature),
            "humidity" => Ok(ClimateVariable::Humidity),
            "windSpeed" | "wind-speed" | "wind" => Ok(ClimateVariable::WindSpeed),
            "precipitation" => Ok(ClimateVariable::Precipitation),
            "sunlight" => Ok(ClimateVariable::Sunlight),
            other => Err(OverlayError::InvalidConfig(format!(
                "unknown variable: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClimateVariable::Temperature => "temperature",
            ClimateVariable::Humidity => "humidity",
            ClimateVariable::WindSpeed => "windSpeed",
            ClimateVariable::Precipitation => "precipitation",
            ClimateVariable::Sunlight => "sunlight",
        };
        write!(f, "{}", name)
    }
}

/// Value range used to normalize a variable into [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationRange {
    pub min: f32,
    pub max: f32,
}

impl NormalizationRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Min/max over a sample set for the given variable.
    pub fn from_samples(samples: &SampleSet, variable: ClimateVariable) -> Self {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for sample in samples.iter() {
            let v = variable.value_of(&sample.values);
            min = min.min(v);
            max = max.max(v);
        }
        Self { min, max }
    }

    /// Normalize a value into [0, 1], clamped.
    ///
    /// A degenerate range (min == max) maps every value to the midpoint
    /// 0.5 so a constant field renders as the ramp's middle color.
    pub fn normalize(&self, value: f32) -> f32 {
        if self.max <= self.min {
            return 0.5;
        }
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// Wire shape of a single sample as served by the data backend.
///
/// Two response flavors exist: scalar readings
/// (`{lat, lon, temperature, humidity, windSpeed, precipitation,
/// sunlight}`) and wind components (`{lat, lon, u, v, speed}`). Both
/// deserialize here; when `u`/`v` are absent the scalar `windSpeed` is
/// stored as a pure eastward component.
#[derive(Debug, Deserialize)]
struct WireSample {
    lat: f64,
    lon: f64,
    #[serde(default)]
    temperature: f32,
    #[serde(default)]
    humidity: f32,
    #[serde(rename = "windSpeed", default)]
    wind_speed: f32,
    #[serde(default)]
    precipitation: f32,
    #[serde(default)]
    sunlight: f32,
    #[serde(default)]
    u: Option<f32>,
    #[serde(default)]
    v: Option<f32>,
}

impl From<WireSample> for Sample {
    fn from(w: WireSample) -> Self {
        let (wind_u, wind_v) = match (w.u, w.v) {
            (Some(u), Some(v)) => (u, v),
            _ => (w.wind_speed, 0.0),
        };
        Sample {
            latitude: w.lat,
            longitude: w.lon,
            values: SampleValues {
                temperature: w.temperature,
                humidity: w.humidity,
                wind_u,
                wind_v,
                precipitation: w.precipitation,
                sunlight: w.sunlight,
            },
        }
    }
}

/// Envelope of a global fetch: `{data, timestamp, count}`.
#[derive(Debug, Deserialize)]
struct FetchEnvelope {
    data: Vec<WireSample>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// An immutable, non-empty collection of samples for one time slice.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    samples: Vec<Sample>,
    fetched_at: Option<DateTime<Utc>>,
}

impl SampleSet {
    /// Build a sample set. Fails with `InsufficientData` on an empty
    /// input; zero samples cannot be indexed or rendered.
    pub fn new(samples: Vec<Sample>) -> OverlayResult<Self> {
        if samples.is_empty() {
            return Err(OverlayError::InsufficientData);
        }
        Ok(Self {
            samples,
            fetched_at: None,
        })
    }

    /// Parse a fetch response envelope.
    pub fn from_json(json: &str) -> OverlayResult<Self> {
        let envelope: FetchEnvelope = serde_json::from_str(json)?;
        let mut set = Self::new(envelope.data.into_iter().map(Sample::from).collect())?;
        set.fetched_at = envelope.timestamp;
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: construction rejects empty sets.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn get(&self, id: usize) -> Option<&Sample> {
        self.samples.get(id)
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Every Nth sample, for glyph thinning. A stride of 1 keeps all.
    pub fn thinned(&self, stride: usize) -> impl Iterator<Item = (usize, &Sample)> {
        let stride = stride.max(1);
        self.samples
            .iter()
            .enumerate()
            .filter(move |(i, _)| i % stride == 0)
    }
}
