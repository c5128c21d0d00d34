//! Wind glyph placement.
//!
//! Wind is not rasterized: the renderer emits a thinned list of
//! oriented glyphs and the display host draws them (billboards,
//! sprites, whatever fits the scene). Rotation and scale come from the
//! sample's (u, v) components; color comes from the banded wind-speed
//! ramp so glyphs read as discrete speed classes.

use climate_common::{ClimateVariable, Rgba, SampleSet};

use crate::ramp::ramp_for;

/// Glyph scale at zero wind...
const BASE_SCALE: f32 = 0.5;
/// ...growing by up to this much as speed saturates the fixed range.
const SCALE_GROWTH: f32 = 1.5;

/// One oriented glyph, ready for the display host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Math-convention rotation: `atan2(v, u)`, 0 = east, counter-
    /// clockwise positive.
    pub rotation_radians: f32,
    /// Wind speed in m/s.
    pub speed: f32,
    /// Display scale factor, monotone in speed and saturating.
    pub scale: f32,
    pub color: Rgba,
}

/// Speed and rotation from wind components.
pub fn speed_rotation(u: f32, v: f32) -> (f32, f32) {
    (u.hypot(v), v.atan2(u))
}

/// Saturating scale: linear in speed up to the top of the fixed wind
/// range, constant beyond it.
fn scale_for(speed: f32) -> f32 {
    let range = ClimateVariable::WindSpeed.fixed_range();
    BASE_SCALE + SCALE_GROWTH * range.normalize(speed)
}

/// Place one glyph per `resolution`-th sample.
///
/// `resolution` is the thinning stride from the configuration surface:
/// 1 keeps every sample, larger values trade density for render cost.
/// No interpolation happens between samples.
pub fn place_glyphs(samples: &SampleSet, resolution: usize) -> Vec<PlacedGlyph> {
    let ramp = ramp_for(ClimateVariable::WindSpeed);
    let range = ClimateVariable::WindSpeed.fixed_range();

    samples
        .thinned(resolution)
        .map(|(_, sample)| {
            let (speed, rotation_radians) = speed_rotation(sample.values.wind_u, sample.values.wind_v);
            PlacedGlyph {
                latitude: sample.latitude,
                longitude: sample.longitude,
                rotation_radians,
                speed,
                scale: scale_for(speed),
                color: ramp.color_at(range.normalize(speed)),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::{Sample, SampleSet, SampleValues};

    fn wind_sample(lat: f64, lon: f64, u: f32, v: f32) -> Sample {
        Sample {
            latitude: lat,
            longitude: lon,
            values: SampleValues {
                wind_u: u,
                wind_v: v,
                ..SampleValues::default()
            },
        }
    }

    #[test]
    fn speed_and_rotation_from_components() {
        let (speed, rotation) = speed_rotation(3.0, 4.0);
        assert!((speed - 5.0).abs() < 1e-6);
        assert!((rotation - 0.9272952).abs() < 1e-5);

        let (_, east) = speed_rotation(10.0, 0.0);
        assert!(east.abs() < 1e-6);
        let (_, north) = speed_rotation(0.0, 10.0);
        assert!((north - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn scale_is_monotone_and_saturates() {
        let mut last = 0.0;
        for speed in [0.0f32, 5.0, 10.0, 20.0, 30.0] {
            let s = scale_for(speed);
            assert!(s >= last);
            last = s;
        }
        assert_eq!(scale_for(0.0), BASE_SCALE);
        assert_eq!(scale_for(30.0), BASE_SCALE + SCALE_GROWTH);
        // Beyond the range the scale stops growing.
        assert_eq!(scale_for(90.0), scale_for(30.0));
    }

    #[test]
    fn glyphs_carry_speed_band_colors() {
        let samples = SampleSet::new(vec![
            wind_sample(0.0, 0.0, 1.0, 0.0),   // calm band
            wind_sample(10.0, 10.0, 15.0, 0.0), // moderate band
            wind_sample(20.0, 20.0, 28.0, 0.0), // strong band
        ])
        .unwrap();

        let glyphs = place_glyphs(&samples, 1);
        assert_eq!(glyphs.len(), 3);
        let ramp = ramp_for(ClimateVariable::WindSpeed);
        assert_eq!(glyphs[0].color, ramp.color_at(0.0));
        assert_eq!(glyphs[1].color, ramp.color_at(0.5));
        assert_eq!(glyphs[2].color, ramp.color_at(1.0));
        assert_ne!(glyphs[0].color, glyphs[1].color);
        assert_ne!(glyphs[1].color, glyphs[2].color);
    }

    #[test]
    fn resolution_thins_the_field() {
        let samples = SampleSet::new(
            (0..20)
                .map(|i| wind_sample(i as f64, 0.0, 5.0, 5.0))
                .collect(),
        )
        .unwrap();

        assert_eq!(place_glyphs(&samples, 1).len(), 20);
        assert_eq!(place_glyphs(&samples, 4).len(), 5);
        // Stride zero behaves like 1 instead of dividing by zero.
        assert_eq!(place_glyphs(&samples, 0).len(), 20);
    }
}
