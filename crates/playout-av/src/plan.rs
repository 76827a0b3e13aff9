//! Structured encode plans.
//!
//! A plan is an ordered set of typed stages. It is only turned into encoder
//! arguments by [`crate::render`], at the point where it is handed to the
//! render worker.

use playout_common::VideoCodec;
use serde::{Deserialize, Serialize};

/// Fully resolved instructions for delivering one output of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodePlan {
    /// Options applied before any input.
    pub global: Vec<String>,
    pub input: InputStage,
    /// Number of times the whole input is mapped into the output.
    pub maps: usize,
    /// Stream-copy everything; no audio or video stage is present.
    pub copy: bool,
    pub audio: Option<AudioStage>,
    pub video: Vec<VideoStage>,
    pub mux: MuxStage,
}

impl EncodePlan {
    /// Whether any stage re-encodes media.
    pub fn transcodes(&self) -> bool {
        !self.copy && (self.audio.is_some() || !self.video.is_empty())
    }
}

/// How the ingest is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputStage {
    pub url: String,
    /// Explicit demuxer; `None` lets the reader probe.
    pub demuxer: Option<String>,
    /// Read at native frame rate.
    pub realtime: bool,
    /// Extra loops over the input; `None` reads it once.
    pub stream_loop: Option<u32>,
}

/// Audio encode, applied once regardless of rendition count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStage {
    pub encoder: String,
    pub sample_rate: u32,
}

impl Default for AudioStage {
    fn default() -> Self {
        Self {
            encoder: "aac".to_string(),
            sample_rate: 48_000,
        }
    }
}

/// Video encode of one rendition, bound to output video stream `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStage {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub codec: VideoCodec,
    pub pixel_format: String,
    /// Output frame rate; `None` keeps the source rate.
    pub fps: Option<u32>,
}

/// Container and delivery of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MuxStage {
    /// Raw RTP to a single destination.
    Rtp { destination: String },
    /// FLV container, used for RTMP delivery.
    Flv { destination: String },
    Hls(HlsMux),
}

impl MuxStage {
    pub fn destination(&self) -> &str {
        match self {
            Self::Rtp { destination } | Self::Flv { destination } => destination,
            Self::Hls(hls) => &hls.destination,
        }
    }
}

/// Playlist behaviour of an HLS output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistMode {
    /// Rolling live playlist.
    Continuous,
    /// Segments are only appended, so viewers can seek back (DVR).
    Event,
}

/// HLS segmenting and upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlsMux {
    pub destination: String,
    pub segment_seconds: u32,
    pub fmp4: bool,
    /// HTTP method used to upload playlists and segments.
    pub method: String,
    pub playlist: PlaylistMode,
    /// Packaging for transcoded outputs; `None` on stream-copy.
    pub packaging: Option<HlsPackaging>,
}

/// Segment alignment and windowing applied when the output is transcoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlsPackaging {
    /// Fixed GOP length in frames.
    pub gop_frames: u32,
    pub scene_cut: bool,
    pub window_size: u32,
    /// One adaptation set per media kind, e.g. `id=0,streams=v`.
    pub adaptation_sets: Vec<String>,
    pub remove_at_exit: bool,
}

impl Default for HlsPackaging {
    fn default() -> Self {
        Self {
            gop_frames: 120,
            scene_cut: false,
            window_size: 5,
            adaptation_sets: vec!["id=0,streams=v".to_string(), "id=1,streams=a".to_string()],
            remove_at_exit: true,
        }
    }
}
