//! Sample source collaborator.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use climate_common::{GeoRect, OverlayError, OverlayResult, RasterImage, SampleSet};

/// What a fetch produced: raw scattered samples for client-side
/// compositing, or a ready-made raster for direct display. The
/// pipeline installs both through the same path.
#[derive(Debug)]
pub enum SourceResponse {
    Samples(SampleSet),
    Raster {
        image: RasterImage,
        rectangle: GeoRect,
    },
}

/// Supplies climate observations, live or per hour of day.
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// The most recent global data.
    async fn fetch_live(&self) -> OverlayResult<SourceResponse>;

    /// Data for a specific hour of day (0-23).
    async fn fetch_hour(&self, hour: u8) -> OverlayResult<SourceResponse>;
}

/// Default fetch timeout. A slow backend surfaces as a recoverable
/// `Timeout` error, never as a hung pipeline.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP sample source speaking the climate backend's JSON API:
/// `GET {base}/weather/global?sample=true[&hour=H]` returning
/// `{data: [{lat, lon, temperature, ...}], timestamp, count}`.
#[derive(Debug, Clone)]
pub struct HttpSampleSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSampleSource {
    pub fn new(base_url: impl Into<String>) -> OverlayResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> OverlayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OverlayError::FetchFailed(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch(&self, url: &str) -> OverlayResult<SourceResponse> {
        debug!(url, "fetching samples");
        let response = self.client.get(url).send().await.map_err(map_reqwest)?;
        if !response.status().is_success() {
            return Err(OverlayError::FetchFailed(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }
        let body = response.text().await.map_err(map_reqwest)?;
        Ok(SourceResponse::Samples(SampleSet::from_json(&body)?))
    }
}

fn map_reqwest(err: reqwest::Error) -> OverlayError {
    if err.is_timeout() {
        OverlayError::Timeout
    } else {
        OverlayError::FetchFailed(err.to_string())
    }
}

#[async_trait]
impl SampleSource for HttpSampleSource {
    async fn fetch_live(&self) -> OverlayResult<SourceResponse> {
        let url = format!("{}/weather/global?sample=true", self.base_url);
        self.fetch(&url).await
    }

    async fn fetch_hour(&self, hour: u8) -> OverlayResult<SourceResponse> {
        let url = format!("{}/weather/global?sample=true&hour={}", self.base_url, hour);
        self.fetch(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let source = HttpSampleSource::new("http://localhost:5000/api/").unwrap();
        assert_eq!(source.base_url, "http://localhost:5000/api");
    }
}
