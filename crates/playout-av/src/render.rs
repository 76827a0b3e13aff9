//! Rendering plans into encoder arguments.
//!
//! The render worker takes arguments in three groups (global, source,
//! destination) plus the two URLs. Rendering is the only place the
//! instruction syntax exists.

use serde::{Deserialize, Serialize};

use crate::plan::{EncodePlan, HlsMux, MuxStage, PlaylistMode, VideoStage};

/// Arguments of one encode, grouped the way the render worker expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskArgs {
    pub args: String,
    pub src_args: String,
    pub src_url: String,
    pub dst_args: String,
    pub dst_url: String,
}

impl TaskArgs {
    /// Single-line instruction with whitespace collapsed.
    pub fn normalized(&self) -> String {
        normalize(&format!(
            "{} {} -i {} {} {}",
            self.args,
            self.src_args,
            quote(&self.src_url),
            self.dst_args,
            quote(&self.dst_url)
        ))
    }
}

/// Collapse every run of whitespace (including Unicode space separators and
/// newlines) into a single space and trim the ends.
pub fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn quote(token: &str) -> String {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        format!("\"{}\"", token)
    } else {
        token.to_string()
    }
}

fn join(tokens: &[String]) -> String {
    tokens.iter().map(|t| quote(t)).collect::<Vec<_>>().join(" ")
}

impl EncodePlan {
    /// Render the plan into worker task arguments.
    pub fn to_task_args(&self) -> TaskArgs {
        TaskArgs {
            args: join(&self.global),
            src_args: join(&self.source_tokens()),
            src_url: self.input.url.clone(),
            dst_args: join(&self.destination_tokens()),
            dst_url: self.mux.destination().to_string(),
        }
    }

    fn source_tokens(&self) -> Vec<String> {
        let mut t = Vec::new();
        if self.input.realtime {
            t.push("-re".to_string());
        }
        if let Some(loops) = self.input.stream_loop {
            t.extend(["-stream_loop".to_string(), loops.to_string()]);
        }
        if let Some(demuxer) = &self.input.demuxer {
            t.extend(["-f".to_string(), demuxer.clone()]);
        }
        t
    }

    fn destination_tokens(&self) -> Vec<String> {
        let mut t = Vec::new();
        for _ in 0..self.maps {
            t.extend(["-map".to_string(), "0".to_string()]);
        }
        if self.copy {
            t.extend(["-c".to_string(), "copy".to_string()]);
        }
        if let Some(audio) = &self.audio {
            t.extend([
                "-c:a".to_string(),
                audio.encoder.clone(),
                "-ar".to_string(),
                audio.sample_rate.to_string(),
            ]);
        }
        for stage in &self.video {
            video_tokens(stage, &mut t);
        }
        mux_tokens(&self.mux, &mut t);
        t
    }
}

fn video_tokens(v: &VideoStage, t: &mut Vec<String>) {
    let i = v.index;
    let mut push = |flag: &str, value: String| {
        t.push(format!("-{}:v:{}", flag, i));
        t.push(value);
    };
    push(
        "filter",
        format!(
            "scale=w={}:h={}:force_original_aspect_ratio=decrease",
            v.width, v.height
        ),
    );
    push("b", format!("{}k", v.bitrate_kbps));
    push("c", v.codec.encoder().to_string());
    push("s", format!("{}x{}", v.width, v.height));
    push("profile", v.codec.profile().to_string());
    push("pix_fmt", v.pixel_format.clone());
    if let Some(fps) = v.fps {
        push("r", fps.to_string());
    }
}

fn mux_tokens(mux: &MuxStage, t: &mut Vec<String>) {
    match mux {
        MuxStage::Rtp { .. } => t.extend(["-f".to_string(), "rtp".to_string()]),
        MuxStage::Flv { .. } => t.extend(["-f".to_string(), "flv".to_string()]),
        MuxStage::Hls(hls) => hls_tokens(hls, t),
    }
}

fn hls_tokens(hls: &HlsMux, t: &mut Vec<String>) {
    let mut flag = |name: &str, value: String| {
        t.push(format!("-{}", name));
        t.push(value);
    };
    let bool_flag = |b: bool| if b { "1" } else { "0" }.to_string();

    match &hls.packaging {
        Some(p) => {
            flag("keyint_min", p.gop_frames.to_string());
            flag("g", p.gop_frames.to_string());
            // a threshold of 0 turns scene-cut keyframes off
            flag("sc_threshold", if p.scene_cut { "40" } else { "0" }.to_string());
            flag("use_timeline", "1".to_string());
            flag("use_template", "1".to_string());
            flag("window_size", p.window_size.to_string());
            flag("adaptation_sets", p.adaptation_sets.join(" "));
            flag("hls_playlist", "1".to_string());
            flag("seg_duration", hls.segment_seconds.to_string());
            flag("streaming", "1".to_string());
            flag("remove_at_exit", bool_flag(p.remove_at_exit));
            if hls.playlist == PlaylistMode::Event {
                flag("hls_playlist_type", "event".to_string());
            }
            flag("method", hls.method.clone());
            flag("f", "hls".to_string());
        }
        None => {
            flag("f", "hls".to_string());
            flag("hls_time", hls.segment_seconds.to_string());
            if hls.playlist == PlaylistMode::Event {
                flag("hls_playlist_type", "event".to_string());
            }
            if hls.fmp4 {
                flag("hls_segment_type", "fmp4".to_string());
            }
            flag("method", hls.method.clone());
        }
    }
}
