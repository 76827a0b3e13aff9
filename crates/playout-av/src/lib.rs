//! # playout-av
//!
//! Output pipeline planning for live channels.
//!
//! Given a channel's ingest and one of its declared outputs, the planner
//! produces an [`EncodePlan`]: typed input, audio, video and mux stages.
//! Plans are pure data. [`EncodePlan::to_task_args`] renders one into the
//! argument groups the render worker consumes.
//!
//! ## Features
//!
//! - `tracing` - Log planning decisions and per-output failures
//!
//! ## Example
//!
//! ```
//! use playout_av::{plan_output, MuxStage};
//! use playout_common::{Ingest, Output, Rendition};
//!
//! let ingest = Ingest {
//!     url: "rtmp://ingest/live/news".into(),
//!     protocol: "rtmp".into(),
//! };
//! let output = Output {
//!     name: "web".into(),
//!     output_type: "hls".into(),
//!     destination: "https://cdn.example/news/index.m3u8".into(),
//!     passthrough: false,
//!     renditions: vec![Rendition {
//!         width: 1280,
//!         height: 720,
//!         bitrate: 4000,
//!         fps: 0,
//!         codec: "h264".into(),
//!     }],
//! };
//!
//! let plan = plan_output(&ingest, false, &output)?;
//! assert!(matches!(plan.mux, MuxStage::Hls(_)));
//! println!("{}", plan.to_task_args().normalized());
//! # Ok::<(), playout_av::Error>(())
//! ```

mod error;
pub mod plan;
pub mod planner;
pub mod render;

pub use error::{Error, Result};
pub use plan::{
    AudioStage, EncodePlan, HlsMux, HlsPackaging, InputStage, MuxStage, PlaylistMode, VideoStage,
};
pub use planner::{plan_channel, plan_output, OutputPlan, PlanOutcome, HLS_SEGMENT_SECONDS};
pub use render::{normalize, TaskArgs};
