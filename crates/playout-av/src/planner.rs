//! Planning of channel outputs.

use playout_common::{Ingest, IngestProtocol, Output, OutputType, Rendition, VideoCodec};
use serde::Serialize;

use crate::plan::{
    AudioStage, EncodePlan, HlsMux, HlsPackaging, InputStage, MuxStage, PlaylistMode, VideoStage,
};
use crate::{Error, Result};

/// HLS segment length in seconds.
pub const HLS_SEGMENT_SECONDS: u32 = 4;

const PIXEL_FORMAT: &str = "yuv420p";

/// Plan one output of a channel.
///
/// Pure and deterministic: the same ingest, DVR flag and output always give
/// an identical plan. The output type is resolved first, so `dash` and
/// `cmaf` fail as not implemented whatever their renditions look like.
pub fn plan_output(ingest: &Ingest, dvr: bool, output: &Output) -> Result<EncodePlan> {
    let kind: OutputType = output
        .output_type
        .parse()
        .map_err(|_| Error::UnknownOutputType(output.output_type.clone()))?;
    if matches!(kind, OutputType::Dash | OutputType::Cmaf) {
        return Err(Error::NotImplemented(kind.to_string()));
    }
    if output.destination.trim().is_empty() {
        return Err(Error::MissingDestination);
    }

    let plan = if output.passthrough {
        EncodePlan {
            global: global_args(),
            input: InputStage {
                url: ingest.url.clone(),
                demuxer: None,
                realtime: false,
                stream_loop: None,
            },
            maps: 0,
            copy: true,
            audio: None,
            video: Vec::new(),
            mux: mux_stage(kind, &output.destination, dvr, false),
        }
    } else {
        let protocol: IngestProtocol = ingest
            .protocol
            .parse()
            .map_err(|_| Error::UnknownIngest(ingest.protocol.clone()))?;
        let video = output
            .renditions
            .iter()
            .enumerate()
            .map(|(index, rendition)| video_stage(index, rendition))
            .collect::<Result<Vec<_>>>()?;

        EncodePlan {
            global: global_args(),
            input: InputStage {
                url: ingest.url.clone(),
                demuxer: Some(protocol.demuxer().to_string()),
                realtime: true,
                stream_loop: Some(1),
            },
            maps: output.renditions.len().max(1),
            copy: false,
            audio: Some(AudioStage::default()),
            video,
            mux: mux_stage(kind, &output.destination, dvr, true),
        }
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        output = %output.name,
        kind = %kind,
        renditions = plan.video.len(),
        passthrough = plan.copy,
        "Planned output"
    );

    Ok(plan)
}

fn global_args() -> Vec<String> {
    vec!["-hide_banner".to_string()]
}

fn video_stage(index: usize, rendition: &Rendition) -> Result<VideoStage> {
    let codec: VideoCodec = rendition.codec.parse().map_err(|_| Error::UnknownCodec {
        index,
        codec: rendition.codec.clone(),
    })?;
    if rendition.width == 0 || rendition.height == 0 {
        return Err(Error::invalid_rendition(index, "width and height must be non-zero"));
    }
    if rendition.bitrate == 0 {
        return Err(Error::invalid_rendition(index, "bitrate must be non-zero"));
    }

    Ok(VideoStage {
        index,
        width: rendition.width,
        height: rendition.height,
        bitrate_kbps: rendition.bitrate,
        codec,
        pixel_format: PIXEL_FORMAT.to_string(),
        fps: (rendition.fps > 0).then_some(rendition.fps),
    })
}

fn mux_stage(kind: OutputType, destination: &str, dvr: bool, transcoded: bool) -> MuxStage {
    let destination = destination.to_string();
    match kind {
        OutputType::Rtp => MuxStage::Rtp { destination },
        OutputType::Rtmp => MuxStage::Flv { destination },
        // dash and cmaf are rejected before any stage is built
        OutputType::Hls | OutputType::Dash | OutputType::Cmaf => MuxStage::Hls(HlsMux {
            destination,
            segment_seconds: HLS_SEGMENT_SECONDS,
            fmp4: true,
            method: "PUT".to_string(),
            playlist: if dvr {
                PlaylistMode::Event
            } else {
                PlaylistMode::Continuous
            },
            packaging: transcoded.then(HlsPackaging::default),
        }),
    }
}

/// Outcome of planning one output of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPlan {
    pub name: String,
    pub destination: String,
    #[serde(flatten)]
    pub outcome: PlanOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PlanOutcome {
    Planned { plan: EncodePlan },
    Failed { error: String },
}

impl OutputPlan {
    pub fn plan(&self) -> Option<&EncodePlan> {
        match &self.outcome {
            PlanOutcome::Planned { plan } => Some(plan),
            PlanOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            PlanOutcome::Planned { .. } => None,
            PlanOutcome::Failed { error } => Some(error),
        }
    }
}

/// Plan every output of a channel independently.
///
/// A failing output is reported in place; its siblings are still planned.
pub fn plan_channel(ingest: &Ingest, dvr: bool, outputs: &[Output]) -> Vec<OutputPlan> {
    outputs
        .iter()
        .map(|output| {
            let outcome = match plan_output(ingest, dvr, output) {
                Ok(plan) => PlanOutcome::Planned { plan },
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(output = %output.name, error = %e, "Output planning failed");
                    PlanOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            OutputPlan {
                name: output.name.clone(),
                destination: output.destination.clone(),
                outcome,
            }
        })
        .collect()
}
