//! Visualization configuration surface presented to the host application.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{OverlayError, OverlayResult};
use crate::sample::ClimateVariable;

/// Which hour of the day to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourSelection {
    /// The most recent fetch, outside any hourly series.
    Live,
    /// A specific hour of day, 0-23.
    At(u8),
}

impl HourSelection {
    pub fn hour(&self) -> Option<u8> {
        match self {
            HourSelection::Live => None,
            HourSelection::At(h) => Some(*h),
        }
    }
}

impl std::str::FromStr for HourSelection {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("live") {
            return Ok(HourSelection::Live);
        }
        let hour: u8 = s
            .parse()
            .map_err(|_| OverlayError::InvalidConfig(format!("invalid hour: {}", s)))?;
        if hour > 23 {
            return Err(OverlayError::InvalidConfig(format!(
                "hour out of range: {}",
                hour
            )));
        }
        Ok(HourSelection::At(hour))
    }
}

impl Serialize for HourSelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HourSelection::Live => serializer.serialize_str("live"),
            HourSelection::At(h) => serializer.serialize_u8(*h),
        }
    }
}

impl<'de> Deserialize<'de> for HourSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HourVisitor;

        impl<'de> Visitor<'de> for HourVisitor {
            type Value = HourSelection;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an hour 0-23 or the string \"live\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                if v > 23 {
                    return Err(E::custom(format!("hour out of range: {}", v)));
                }
                Ok(HourSelection::At(v as u8))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(HourVisitor)
    }
}

/// Configuration for one visualization request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualizationConfig {
    /// The variable to render.
    pub variable: ClimateVariable,
    /// Layer opacity, 0-100.
    pub opacity: u8,
    /// Sample thinning stride for the vector-field renderer, >= 1.
    pub resolution: usize,
    /// Hour of day or live data.
    pub hour: HourSelection,
}

impl VisualizationConfig {
    pub fn new(variable: ClimateVariable) -> Self {
        Self {
            variable,
            opacity: 80,
            resolution: 1,
            hour: HourSelection::Live,
        }
    }

    pub fn validate(&self) -> OverlayResult<()> {
        if self.opacity > 100 {
            return Err(OverlayError::InvalidConfig(format!(
                "opacity out of range: {}",
                self.opacity
            )));
        }
        if self.resolution == 0 {
            return Err(OverlayError::InvalidConfig(
                "resolution must be at least 1".into(),
            ));
        }
        if let HourSelection::At(h) = self.hour {
            if h > 23 {
                return Err(OverlayError::InvalidConfig(format!(
                    "hour out of range: {}",
                    h
                )));
            }
        }
        Ok(())
    }

    /// Opacity as an alpha in [0, 1].
    pub fn alpha(&self) -> f32 {
        f32::from(self.opacity.min(100)) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_selection_parses_live_and_numbers() {
        assert_eq!("live".parse::<HourSelection>().unwrap(), HourSelection::Live);
        assert_eq!("LIVE".parse::<HourSelection>().unwrap(), HourSelection::Live);
        assert_eq!("0".parse::<HourSelection>().unwrap(), HourSelection::At(0));
        assert_eq!("23".parse::<HourSelection>().unwrap(), HourSelection::At(23));
        assert!("24".parse::<HourSelection>().is_err());
        assert!("noon".parse::<HourSelection>().is_err());
    }

    #[test]
    fn hour_selection_serde_round_trip() {
        let live: HourSelection = serde_json::from_str("\"live\"").unwrap();
        assert_eq!(live, HourSelection::Live);
        let at: HourSelection = serde_json::from_str("14").unwrap();
        assert_eq!(at, HourSelection::At(14));
        assert!(serde_json::from_str::<HourSelection>("99").is_err());

        assert_eq!(serde_json::to_string(&HourSelection::Live).unwrap(), "\"live\"");
        assert_eq!(serde_json::to_string(&HourSelection::At(7)).unwrap(), "7");
    }

    #[test]
    fn config_validation() {
        let mut config = VisualizationConfig::new(ClimateVariable::Temperature);
        assert!(config.validate().is_ok());

        config.opacity = 101;
        assert!(config.validate().is_err());
        config.opacity = 100;
        assert!(config.validate().is_ok());

        config.resolution = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn alpha_maps_percent_to_unit_interval() {
        let mut config = VisualizationConfig::new(ClimateVariable::Humidity);
        config.opacity = 50;
        assert!((config.alpha() - 0.5).abs() < 1e-6);
        config.opacity = 0;
        assert_eq!(config.alpha(), 0.0);
        config.opacity = 100;
        assert_eq!(config.alpha(), 1.0);
    }
}
