//! Deterministic sample generators for tests across the workspace.

use crate::sample::{Sample, SampleSet, SampleValues};

/// A single sample at the given location with default readings.
pub fn sample_at(latitude: f64, longitude: f64) -> Sample {
    Sample {
        latitude,
        longitude,
        values: SampleValues::default(),
    }
}

/// The three-point temperature scenario used throughout the tests:
/// (0,0) at 10°C, (0,90) at 30°C, (0,-90) at -10°C. Over the range
/// [-10, 30] these normalize to 0.5, 1.0 and 0.0.
pub fn three_point_temperature() -> SampleSet {
    let mk = |lon: f64, temperature: f32| Sample {
        latitude: 0.0,
        longitude: lon,
        values: SampleValues {
            temperature,
            ..SampleValues::default()
        },
    };
    SampleSet::new(vec![mk(0.0, 10.0), mk(90.0, 30.0), mk(-90.0, -10.0)])
        .expect("three samples")
}

/// A deterministic global grid of synthetic readings, one sample every
/// `step` degrees. Values follow simple latitudinal/longitudinal
/// patterns so renders are reproducible without random noise.
pub fn global_grid(step: usize) -> SampleSet {
    let step = step.max(1) as i32;
    let mut samples = Vec::new();
    let mut lat = -90i32;
    while lat <= 90 {
        let mut lon = -180i32;
        while lon <= 180 {
            let latf = lat as f32;
            let lonf = lon as f32;
            let temperature = 30.0 - latf.abs() * 0.6;
            let humidity = (70.0 - latf.abs() * 0.2 + 10.0 * (lonf.to_radians() * 2.0).sin())
                .clamp(0.0, 100.0);
            let wind_u = 5.0 + 5.0 * (latf.to_radians() * 4.0).cos();
            let wind_v = 3.0 * (lonf.to_radians()).sin();
            let precipitation = (4.0 * (-((latf / 15.0).powi(2))).exp()).max(0.0);
            let sunlight = (1000.0 * latf.to_radians().cos()).max(0.0);
            samples.push(Sample {
                latitude: lat as f64,
                longitude: lon as f64,
                values: SampleValues {
                    temperature,
                    humidity,
                    wind_u,
                    wind_v,
                    precipitation,
                    sunlight,
                },
            });
            lon += step;
        }
        lat += step;
    }
    SampleSet::new(samples).expect("grid is non-empty")
}
