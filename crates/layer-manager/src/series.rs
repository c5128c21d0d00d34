//! Hourly frame series for time scrubbing.
//!
//! One series is built per metric-selection event: 24 slots, each
//! pending until its frame is computed or fetched. Frames store raw
//! pixels, not display resources: a display handle is minted when a
//! frame is actually installed, so scrubbing back and forth never
//! violates the one-live-resource rule.

use climate_common::RasterImage;

/// A single hour's frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Not yet computed or fetched.
    Pending,
    /// Realized pixels plus a display label like "3PM".
    Ready { image: RasterImage, label: String },
}

impl Frame {
    pub fn is_ready(&self) -> bool {
        matches!(self, Frame::Ready { .. })
    }
}

/// 12-hour clock label for an hour of day: 0 -> "12AM", 13 -> "1PM".
pub fn format_hour(hour: u8) -> String {
    match hour {
        0 => "12AM".to_string(),
        h if h < 12 => format!("{}AM", h),
        12 => "12PM".to_string(),
        h => format!("{}PM", h - 12),
    }
}

/// Ordered hour-of-day -> frame mapping with a current-hour pointer.
#[derive(Debug)]
pub struct HourlySeries {
    frames: Vec<Frame>,
    current: Option<u8>,
}

impl HourlySeries {
    pub const HOURS: usize = 24;

    /// A series with every hour pending.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::Pending; Self::HOURS],
            current: None,
        }
    }

    /// Realize one hour's frame.
    pub fn set_frame(&mut self, hour: u8, image: RasterImage) {
        if let Some(slot) = self.frames.get_mut(hour as usize) {
            *slot = Frame::Ready {
                image,
                label: format_hour(hour),
            };
        }
    }

    pub fn frame(&self, hour: u8) -> Option<&Frame> {
        self.frames.get(hour as usize)
    }

    pub fn is_ready(&self, hour: u8) -> bool {
        self.frame(hour).map(Frame::is_ready).unwrap_or(false)
    }

    /// Hours still waiting on data.
    pub fn pending_hours(&self) -> Vec<u8> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.is_ready())
            .map(|(h, _)| h as u8)
            .collect()
    }

    /// Move the current-hour pointer.
    ///
    /// Returns the realized frame image when hour `hour` is ready; the
    /// caller installs it through the normal slot path. Returns `None`
    /// when the frame is still pending; the pointer moves anyway and
    /// the previously displayed frame stays up until the new one is
    /// materialized and installed.
    pub fn select(&mut self, hour: u8) -> Option<&RasterImage> {
        if hour as usize >= Self::HOURS {
            return None;
        }
        self.current = Some(hour);
        match &self.frames[hour as usize] {
            Frame::Ready { image, .. } => Some(image),
            Frame::Pending => None,
        }
    }

    pub fn current(&self) -> Option<u8> {
        self.current
    }
}

impl Default for HourlySeries {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raster(tag: u8) -> RasterImage {
        let mut image = RasterImage::new(2, 2).unwrap();
        image.put_pixel(0, 0, climate_common::Rgba::new(tag, 0, 0, 255));
        image
    }

    #[test]
    fn hour_labels_use_a_12_hour_clock() {
        assert_eq!(format_hour(0), "12AM");
        assert_eq!(format_hour(5), "5AM");
        assert_eq!(format_hour(11), "11AM");
        assert_eq!(format_hour(12), "12PM");
        assert_eq!(format_hour(13), "1PM");
        assert_eq!(format_hour(23), "11PM");
    }

    #[test]
    fn selecting_a_ready_hour_returns_its_frame() {
        let mut series = HourlySeries::new();
        series.set_frame(7, raster(7));

        let image = series.select(7).expect("frame is ready");
        assert_eq!(image.pixel(0, 0).r, 7);
        assert_eq!(series.current(), Some(7));
    }

    #[test]
    fn selecting_a_pending_hour_moves_the_pointer_but_yields_nothing() {
        let mut series = HourlySeries::new();
        series.set_frame(3, raster(3));

        assert!(series.select(9).is_none());
        assert_eq!(series.current(), Some(9));
        // The hour 3 frame is untouched and still selectable.
        assert!(series.select(3).is_some());
    }

    #[test]
    fn set_frame_attaches_the_label() {
        let mut series = HourlySeries::new();
        series.set_frame(15, raster(1));
        match series.frame(15) {
            Some(Frame::Ready { label, .. }) => assert_eq!(label, "3PM"),
            other => panic!("expected ready frame, got {:?}", other),
        }
    }

    #[test]
    fn pending_hours_shrink_as_frames_realize() {
        let mut series = HourlySeries::new();
        assert_eq!(series.pending_hours().len(), 24);
        series.set_frame(0, raster(0));
        series.set_frame(12, raster(12));
        let pending = series.pending_hours();
        assert_eq!(pending.len(), 22);
        assert!(!pending.contains(&0));
        assert!(!pending.contains(&12));
    }

    #[test]
    fn out_of_range_hours_are_ignored() {
        let mut series = HourlySeries::new();
        series.set_frame(24, raster(1));
        assert!(series.select(24).is_none());
        assert_eq!(series.current(), None);
    }
}
