//! Core type definitions for channels, ingests, outputs, and renditions.
//!
//! Channel configuration arrives as free text (from the API or the store), so
//! every enum here parses with [`std::str::FromStr`] and the planner decides
//! what an unparseable value means. All enums serialize in lowercase.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Provisioned but not broadcasting.
    #[default]
    Pending,
    /// Output plans are being submitted.
    Starting,
    /// At least one output is live.
    Running,
    /// Outputs are being torn down.
    Stopping,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
        }
    }
}

impl FromStr for ChannelStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "starting" => Ok(Self::Starting),
            "running" => Ok(Self::Running),
            "stopping" => Ok(Self::Stopping),
            _ => Err(format!("Invalid channel status: {}", s)),
        }
    }
}

/// Kind of channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// Continuous, schedule-driven channel.
    #[default]
    Linear,
    /// Channel that only exists for the duration of an event.
    Event,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Event => write!(f, "event"),
        }
    }
}

impl FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "event" => Ok(Self::Event),
            _ => Err(format!("Invalid channel type: {}", s)),
        }
    }
}

/// Protocol of a channel ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestProtocol {
    Rtmp,
    Rtp,
    Rtsp,
    Hls,
    Srt,
}

impl IngestProtocol {
    /// Demuxer used to read this ingest.
    ///
    /// RTMP carries FLV and has to be demuxed explicitly; the rest are read by
    /// the demuxer of the same name (SRT carries MPEG-TS).
    pub fn demuxer(&self) -> &'static str {
        match self {
            Self::Rtmp => "flv",
            Self::Rtp => "rtp",
            Self::Rtsp => "rtsp",
            Self::Hls => "hls",
            Self::Srt => "mpegts",
        }
    }
}

impl fmt::Display for IngestProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rtmp => write!(f, "rtmp"),
            Self::Rtp => write!(f, "rtp"),
            Self::Rtsp => write!(f, "rtsp"),
            Self::Hls => write!(f, "hls"),
            Self::Srt => write!(f, "srt"),
        }
    }
}

impl FromStr for IngestProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rtmp" => Ok(Self::Rtmp),
            "rtp" => Ok(Self::Rtp),
            "rtsp" => Ok(Self::Rtsp),
            "hls" => Ok(Self::Hls),
            "srt" => Ok(Self::Srt),
            _ => Err(format!("unknown ingest protocol: {}", s)),
        }
    }
}

/// Delivery protocol of a channel output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Rtp,
    Rtmp,
    Hls,
    /// Declared in channel configs but not supported by the planner.
    Dash,
    /// Declared in channel configs but not supported by the planner.
    Cmaf,
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rtp => write!(f, "rtp"),
            Self::Rtmp => write!(f, "rtmp"),
            Self::Hls => write!(f, "hls"),
            Self::Dash => write!(f, "dash"),
            Self::Cmaf => write!(f, "cmaf"),
        }
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rtp" => Ok(Self::Rtp),
            "rtmp" => Ok(Self::Rtmp),
            "hls" => Ok(Self::Hls),
            "dash" => Ok(Self::Dash),
            "cmaf" => Ok(Self::Cmaf),
            _ => Err("unknown output type".to_string()),
        }
    }
}

/// Video codec of a rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
}

impl VideoCodec {
    /// Get the ffmpeg encoder name.
    pub fn encoder(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::H265 => "libx265",
        }
    }

    /// Encoder profile pinned for this codec.
    pub fn profile(&self) -> &'static str {
        "main"
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "h264"),
            Self::H265 => write!(f, "h265"),
        }
    }
}

impl FromStr for VideoCodec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "h264" => Ok(Self::H264),
            "h265" | "hevc" => Ok(Self::H265),
            _ => Err(format!("unknown codec: {}", s)),
        }
    }
}

// ============================================================================
// Channel configuration
// ============================================================================

/// Where a channel's live feed comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingest {
    pub url: String,
    /// Free-text protocol name, parsed as an [`IngestProtocol`] when planning.
    pub protocol: String,
}

/// One resolution/bitrate/codec variant of an output.
///
/// The position of a rendition inside [`Output::renditions`] is the index
/// used to bind its encode parameters to an output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendition {
    pub width: u32,
    pub height: u32,
    /// Video bitrate in kb/s.
    pub bitrate: u32,
    /// Frame rate; 0 keeps the source rate.
    #[serde(default)]
    pub fps: u32,
    /// Free-text codec name, parsed as a [`VideoCodec`] when planning.
    pub codec: String,
}

/// A destination a channel is delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub name: String,
    /// Free-text output type, parsed as an [`OutputType`] when planning.
    #[serde(rename = "type")]
    pub output_type: String,
    pub destination: String,
    #[serde(default)]
    pub passthrough: bool,
    #[serde(default)]
    pub renditions: Vec<Rendition>,
}
