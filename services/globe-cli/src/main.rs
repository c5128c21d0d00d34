//! Command-line overlay renderer.
//!
//! Loads samples from a JSON file or the HTTP backend, runs the full
//! visualization pipeline (mask, index, composite, install) and writes
//! the resulting frame as a PNG. Wind glyph placements can be dumped as
//! JSON for inspection.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use climate_common::{
    ClimateVariable, HourSelection, OverlayResult, SampleSet, VisualizationConfig,
};
use engine::{HttpSampleSource, SampleSource, SourceResponse, Visualizer};
use landmask::GeoJsonFileSource;
use renderer::{place_glyphs, png, CompositeOptions, RangeSelection};

#[derive(Parser, Debug)]
#[command(name = "globe-cli")]
#[command(about = "Render climate sample overlays to PNG")]
struct Args {
    /// JSON sample file ({"data": [{lat, lon, ...}]})
    #[arg(long)]
    samples: Option<PathBuf>,

    /// Backend base URL, e.g. http://localhost:5000/api
    #[arg(long, env = "CLIMATE_API_URL")]
    url: Option<String>,

    /// GeoJSON land boundaries; omitted = render everything
    #[arg(long)]
    boundaries: Option<PathBuf>,

    /// Variable to render
    #[arg(long, default_value = "temperature")]
    variable: String,

    /// Layer opacity, 0-100
    #[arg(long, default_value_t = 80)]
    opacity: u8,

    /// Sample thinning stride for wind glyphs
    #[arg(long, default_value_t = 1)]
    resolution: usize,

    /// Hour of day (0-23) or "live"
    #[arg(long, default_value = "live")]
    hour: String,

    /// Output width in pixels
    #[arg(long, default_value_t = 1024)]
    width: usize,

    /// Output height in pixels
    #[arg(long, default_value_t = 512)]
    height: usize,

    /// Gaussian blur sigma in pixels
    #[arg(long)]
    blur: Option<f32>,

    /// Normalize against the observed min/max instead of the fixed
    /// per-variable range
    #[arg(long)]
    observed_range: bool,

    /// Render value-scaled point markers instead of a filled raster
    #[arg(long)]
    markers: bool,

    /// Output PNG path
    #[arg(long, default_value = "overlay.png")]
    out: PathBuf,

    /// Write wind glyph placements as JSON
    #[arg(long)]
    glyphs_out: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Serves one preloaded sample set for every request, so file-based
/// runs exercise the same pipeline as live ones.
struct StaticSource {
    set: SampleSet,
}

#[async_trait]
impl SampleSource for StaticSource {
    async fn fetch_live(&self) -> OverlayResult<SourceResponse> {
        Ok(SourceResponse::Samples(self.set.clone()))
    }

    async fn fetch_hour(&self, _hour: u8) -> OverlayResult<SourceResponse> {
        self.fetch_live().await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let variable: ClimateVariable = args
        .variable
        .parse()
        .with_context(|| format!("unsupported variable: {}", args.variable))?;
    let hour: HourSelection = args.hour.parse().context("invalid --hour")?;

    let samples = load_samples(&args).await?;
    info!(count = samples.len(), "samples loaded");

    let options = CompositeOptions {
        range: if args.observed_range {
            RangeSelection::Observed
        } else {
            RangeSelection::Fixed
        },
        blur_sigma: args.blur,
    };

    let image = if args.markers {
        renderer::composite_markers(&samples, variable, args.width, args.height, &options)?
    } else {
        let boundaries = args
            .boundaries
            .as_ref()
            .map(|path| Arc::new(GeoJsonFileSource::new(path)) as Arc<dyn landmask::BoundarySource>);

        let source = Arc::new(StaticSource {
            set: samples.clone(),
        });
        let mut visualizer = Visualizer::new(source, boundaries, args.width, args.height)?;
        visualizer.set_composite_options(options);

        let mut config = VisualizationConfig::new(variable);
        config.opacity = args.opacity;
        config.resolution = args.resolution;
        config.hour = hour;
        visualizer.visualize(config).await?;

        let layer = visualizer
            .active_layer()
            .context("no layer installed after visualization")?;
        layer
            .image()
            .context("active layer has no backing image")?
            .clone()
    };

    let encoded = png::encode(&image)?;
    std::fs::write(&args.out, &encoded)
        .with_context(|| format!("writing {}", args.out.display()))?;
    info!(
        path = %args.out.display(),
        width = image.width(),
        height = image.height(),
        bytes = encoded.len(),
        "overlay written"
    );

    if let Some(path) = &args.glyphs_out {
        write_glyphs(&samples, args.resolution, path)?;
    }

    Ok(())
}

async fn load_samples(args: &Args) -> Result<SampleSet> {
    if let Some(path) = &args.samples {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        return Ok(SampleSet::from_json(&json)?);
    }

    if let Some(url) = &args.url {
        let source = HttpSampleSource::new(url.clone())?;
        return match source.fetch_live().await? {
            SourceResponse::Samples(set) => Ok(set),
            SourceResponse::Raster { .. } => bail!("backend returned a raster, expected samples"),
        };
    }

    bail!("either --samples or --url is required")
}

fn write_glyphs(samples: &SampleSet, resolution: usize, path: &PathBuf) -> Result<()> {
    let glyphs = place_glyphs(samples, resolution);
    let records: Vec<serde_json::Value> = glyphs
        .iter()
        .map(|g| {
            serde_json::json!({
                "lat": g.latitude,
                "lon": g.longitude,
                "rotation": g.rotation_radians,
                "speed": g.speed,
                "scale": g.scale,
                "color": [g.color.r, g.color.g, g.color.b, g.color.a],
            })
        })
        .collect();

    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    info!(count = glyphs.len(), path = %path.display(), "wind glyphs written");
    Ok(())
}
