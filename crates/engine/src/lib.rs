//! Orchestration of the visualization pipeline.
//!
//! Glues the collaborators together: fetch samples (or a pre-rendered
//! frame) from the sample source, rasterize off the interactive thread,
//! and install the result into the layer slot under the generation-
//! counter discipline. Also answers the display host's pick queries.

pub mod host;
pub mod pipeline;
pub mod source;

pub use host::DisplayHost;
pub use pipeline::Visualizer;
pub use source::{HttpSampleSource, SampleSource, SourceResponse};
