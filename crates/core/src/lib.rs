//! Core library for the Line Visualiser application.
//!
//! The crate turns a sound signal from one of three interchangeable sources
//! (an uploaded audio file, an uploaded video's audio track, or a live
//! microphone) into animated line patterns. Each module owns a distinct
//! subsystem: source selection and switching, loudness metering, the
//! measurement mechanisms underneath it, and the loudness-to-geometry
//! mapping. Platform concerns (decoding, capture, the drawing surface, the
//! status display) stay behind traits so the whole pipeline runs headless in
//! tests and the command line demo.

pub mod analysis;
pub mod config;
pub mod error;
pub mod frame;
pub mod media;
pub mod meter;
pub mod pattern;
pub mod render;
pub mod source;
pub mod status;

pub use analysis::{EnvelopeFollower, SpectrumTap, FFT_SIZE};
pub use config::{AppConfig, AudioConfig};
pub use error::{LineVizError, Result};
pub use frame::{FrameStats, Visualizer, BACKGROUND, TRAIL_ALPHA};
pub use media::{
    AudioHandle, MediaHandle, MediaKind, MediaLoader, MicHandle, VideoHandle, AUDIO_EXTENSIONS,
    LARGE_FILE_BYTES, VIDEO_EXTENSIONS,
};
pub use meter::{LevelMeter, Mechanism, SMOOTHING};
pub use pattern::{
    group_count, map_range, LineGroup, PatternGenerator, ScaleContext, BASE_STROKE_OPTIONS,
    LEVEL_GATE, REFERENCE_CANVAS_SIZE,
};
pub use render::{DrawSurface, DrawnLine, MemorySurface, Point};
pub use source::{
    AudioSourceState, ContextState, SourceController, Transport, UploadTicket, FADE_OUT_SECONDS,
};
pub use status::{MemorySink, NullSink, StatusSink, StatusUpdate};
