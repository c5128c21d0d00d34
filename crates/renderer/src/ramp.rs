//! Color ramps mapping normalized values to RGBA colors.
//!
//! Each variable gets one fixed ramp. Temperature, humidity,
//! precipitation and sunlight use continuous piecewise-linear
//! interpolation between anchor colors; wind speed uses discrete bands
//! (the vector-field renderer colors glyphs by speed class, and the
//! raster rendition keeps the same class boundaries).

use climate_common::{ClimateVariable, Rgba};

/// How colors between anchors are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    /// Piecewise-linear blend between neighboring anchors.
    Linear,
    /// The greatest anchor at or below `t` wins; hard band edges.
    Step,
}

/// An anchor color at a normalized position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampStop {
    pub t: f32,
    pub color: Rgba,
}

/// A deterministic mapping from `t` in [0, 1] to a color.
///
/// Pure and stateless: the same input always produces the same color,
/// which is what makes golden-image tests possible.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<RampStop>,
    interpolation: Interpolation,
}

impl ColorRamp {
    /// Build a ramp from anchors in ascending `t` order. Linear ramps
    /// are expected to anchor t=0 and t=1 explicitly.
    pub fn new(stops: Vec<RampStop>, interpolation: Interpolation) -> Self {
        debug_assert!(stops.len() >= 2);
        debug_assert!(stops.windows(2).all(|w| w[0].t < w[1].t));
        Self {
            stops,
            interpolation,
        }
    }

    /// Color at a normalized position, clamped into [0, 1].
    ///
    /// `color_at(0.0)` is exactly the first anchor color and
    /// `color_at(1.0)` exactly the last.
    pub fn color_at(&self, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);

        let first = self.stops[0];
        if t <= first.t {
            return first.color;
        }

        match self.interpolation {
            Interpolation::Step => {
                let mut current = first.color;
                for stop in &self.stops {
                    if t >= stop.t {
                        current = stop.color;
                    } else {
                        break;
                    }
                }
                current
            }
            Interpolation::Linear => {
                for pair in self.stops.windows(2) {
                    let (low, high) = (pair[0], pair[1]);
                    if t <= high.t {
                        let f = (t - low.t) / (high.t - low.t);
                        return lerp_color(low.color, high.color, f);
                    }
                }
                self.stops[self.stops.len() - 1].color
            }
        }
    }

    pub fn stops(&self) -> &[RampStop] {
        &self.stops
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }
}

/// Linear color interpolation with rounding.
fn lerp_color(a: Rgba, b: Rgba, t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let lerp_u8 =
        |x: u8, y: u8| -> u8 { ((x as f32) * (1.0 - t) + (y as f32) * t).round() as u8 };
    Rgba::new(
        lerp_u8(a.r, b.r),
        lerp_u8(a.g, b.g),
        lerp_u8(a.b, b.b),
        lerp_u8(a.a, b.a),
    )
}

/// Overlay colors render slightly translucent so the globe's terrain
/// stays visible underneath.
const RAMP_ALPHA: u8 = 200;

fn stop(t: f32, r: u8, g: u8, b: u8) -> RampStop {
    RampStop {
        t,
        color: Rgba::new(r, g, b, RAMP_ALPHA),
    }
}

/// The fixed ramp for a variable.
pub fn ramp_for(variable: ClimateVariable) -> ColorRamp {
    match variable {
        // Blue -> cyan -> green -> yellow -> red.
        ClimateVariable::Temperature => ColorRamp::new(
            vec![
                stop(0.0, 0, 0, 255),
                stop(0.25, 0, 255, 255),
                stop(0.5, 0, 255, 0),
                stop(0.75, 255, 255, 0),
                stop(1.0, 255, 0, 0),
            ],
            Interpolation::Linear,
        ),
        // Dry blue-black up to saturated white-blue.
        ClimateVariable::Humidity => ColorRamp::new(
            vec![stop(0.0, 0, 0, 255), stop(1.0, 255, 255, 255)],
            Interpolation::Linear,
        ),
        // Calm / moderate / strong bands.
        ClimateVariable::WindSpeed => ColorRamp::new(
            vec![
                stop(0.0, 0, 200, 0),
                stop(1.0 / 3.0, 255, 165, 0),
                stop(2.0 / 3.0, 255, 0, 0),
            ],
            Interpolation::Step,
        ),
        // Pale green-blue to deep blue.
        ClimateVariable::Precipitation => ColorRamp::new(
            vec![stop(0.0, 0, 200, 100), stop(1.0, 0, 0, 255)],
            Interpolation::Linear,
        ),
        // Yellow to deep orange.
        ClimateVariable::Sunlight => ColorRamp::new(
            vec![stop(0.0, 255, 255, 0), stop(1.0, 255, 76, 0)],
            Interpolation::Linear,
        ),
    }
}
