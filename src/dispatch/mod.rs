//! Hand-off of encode work to the render worker.
//!
//! The render worker (VT) runs the actual encoder processes. This module
//! only describes work and submits it; whether a task succeeded is judged by
//! the HTTP status alone.

mod vt;

pub use vt::VtClient;

use async_trait::async_trait;
use playout_av::TaskArgs;
use playout_common::Result;
use serde::{Deserialize, Serialize};

/// Request to play a scheduled programme into a channel's ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayRequest {
    pub destination: String,
    /// Video URLs in play order.
    pub videos: Vec<String>,
    pub width: u32,
    pub height: u32,
    /// Video bitrate in kb/s.
    pub bitrate: u32,
}

/// A long-running live encode, one per planned channel output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub args: String,
    #[serde(rename = "srcArgs")]
    pub src_args: String,
    #[serde(rename = "srcURL")]
    pub src_url: String,
    #[serde(rename = "dstArgs")]
    pub dst_args: String,
    #[serde(rename = "dstURL")]
    pub dst_url: String,
}

impl Task {
    pub fn new(id: impl Into<String>, args: TaskArgs) -> Self {
        Self {
            id: id.into(),
            args: args.args,
            src_args: args.src_args,
            src_url: args.src_url,
            dst_args: args.dst_args,
            dst_url: args.dst_url,
        }
    }
}

/// Something that can run encode work.
#[async_trait]
pub trait RenderDispatch: Send + Sync {
    /// Play a programme's videos into a destination.
    async fn play(&self, request: &PlayRequest) -> Result<()>;

    /// Start a live encode.
    async fn submit_live(&self, task: &Task) -> Result<()>;
}
