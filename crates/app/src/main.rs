use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use line_visualiser_core::media::{classify, exceeds_size_advisory};
use line_visualiser_core::{
    AppConfig, AudioHandle, LineVizError, MediaHandle, MediaLoader, MemorySurface, MicHandle,
    StatusSink, StatusUpdate, VideoHandle, Visualizer,
};
use tracing_subscriber::EnvFilter;

const FRAME_RATE: f32 = 60.0;

fn main() -> line_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo {
            seconds,
            width,
            height,
            config,
        } => run_demo(seconds, width, height, config.as_deref()),
        Commands::Render {
            input,
            width,
            height,
        } => run_render(&input, width, height),
        Commands::Probe { input } => run_probe(&input),
    }
}

/// Drives the full pipeline with a synthetic amplitude-modulated tone, so the
/// visual response can be inspected without any input file.
fn run_demo(
    seconds: f32,
    width: f32,
    height: f32,
    config: Option<&Path>,
) -> line_visualiser_core::Result<()> {
    let config = match config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let sample_rate = config.audio.sample_rate;
    tracing::info!(seconds, width, height, sample_rate, "starting synthetic demo");

    let mut viz = Visualizer::new(Box::new(TracingSink), width, height);
    let controller = viz.controller();
    let (ticket, _) = controller.begin_upload("demo-tone.wav", 0)?;
    controller.finish_upload(
        ticket,
        Ok(MediaHandle::Audio(AudioHandle {
            name: "demo-tone.wav".into(),
            sample_rate,
            duration_seconds: seconds,
        })),
    )?;
    controller.resume_context();
    for command in controller.start() {
        tracing::debug!(?command, "transport");
    }

    let mut surface = MemorySurface::new(width, height);
    let frames = (seconds * FRAME_RATE) as usize;
    let block_len = (sample_rate as f32 / FRAME_RATE) as usize;
    let mut drawn_total = 0_usize;

    for frame in 0..frames {
        let start = frame as f32 / FRAME_RATE;
        let block: Vec<f32> = (0..block_len)
            .map(|index| {
                let t = start + index as f32 / sample_rate as f32;
                let envelope = 0.5 * (1.0 + (TAU * 0.25 * t).sin());
                (TAU * 220.0 * t).sin() * envelope
            })
            .collect();

        viz.controller().push_samples(&block)?;
        let stats = viz.tick(&mut surface);
        let drawn = surface.take_line_count();
        drawn_total += drawn;
        if frame % FRAME_RATE as usize == 0 {
            tracing::info!(
                frame,
                level = stats.level,
                groups = stats.groups,
                lines = drawn,
                "frame"
            );
        }
    }

    tracing::info!(drawn_total, "demo finished");
    Ok(())
}

/// Uploads a WAV file through the decode boundary and plays it through the
/// visualiser, frame by frame.
fn run_render(input: &Path, width: f32, height: f32) -> line_visualiser_core::Result<()> {
    let size_bytes = std::fs::metadata(input)?.len();
    let mut loader = WavLoader::default();
    let mut viz = Visualizer::new(Box::new(TracingSink), width, height);

    let controller = viz.controller();
    let (kind, commands) = controller.upload_file(&mut loader, input, size_bytes)?;
    tracing::info!(?kind, "media loaded");
    for command in commands {
        tracing::debug!(?command, "transport");
    }
    controller.resume_context();
    for command in controller.start() {
        tracing::debug!(?command, "transport");
    }

    let sample_rate = loader.sample_rate.max(1);
    let samples = loader.take_samples();
    let block_len = ((sample_rate as f32 / FRAME_RATE) as usize).max(1);
    let mut surface = MemorySurface::new(width, height);
    let mut peak_level = 0.0_f32;
    let mut drawn_total = 0_usize;

    for (frame, block) in samples.chunks(block_len).enumerate() {
        viz.controller().push_samples(block)?;
        let stats = viz.tick(&mut surface);
        peak_level = peak_level.max(stats.level);
        drawn_total += surface.take_line_count();
        if frame % FRAME_RATE as usize == 0 {
            tracing::info!(
                second = frame / FRAME_RATE as usize,
                level = stats.level,
                groups = stats.groups,
                "frame"
            );
        }
    }

    tracing::info!(peak_level, drawn_total, "render finished");
    Ok(())
}

/// Reports whether a file would be accepted for upload, without decoding it.
fn run_probe(input: &Path) -> line_visualiser_core::Result<()> {
    let name = input
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    match classify(name) {
        Ok(kind) => tracing::info!(%name, ?kind, "recognised"),
        Err(err) => {
            tracing::error!(%err, "rejected");
            return Err(err);
        }
    }

    if let Ok(metadata) = std::fs::metadata(input) {
        if exceeds_size_advisory(metadata.len()) {
            let size_mb = metadata.len() as f64 / (1024.0 * 1024.0);
            tracing::warn!(size_mb, "large file, loading may take time");
        }
    }
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Status sink that forwards updates to the log.
struct TracingSink;

impl StatusSink for TracingSink {
    fn publish(&mut self, update: StatusUpdate) {
        match update {
            StatusUpdate::Loading { name } => tracing::info!(%name, "loading"),
            StatusUpdate::Loaded { name, kind } => tracing::info!(%name, ?kind, "loaded"),
            StatusUpdate::LargeFile { name, size_mb } => {
                tracing::warn!(%name, size_mb, "large file, loading may take time");
            }
            StatusUpdate::Listening => tracing::info!("microphone listening"),
            StatusUpdate::MicrophoneStopped => tracing::info!("microphone stopped"),
            StatusUpdate::SwitchedToFile => tracing::info!("switched to file mode"),
            StatusUpdate::Error { message } => tracing::error!(%message, "source error"),
        }
    }
}

/// WAV-backed implementation of the decode boundary. Decoded samples are
/// downmixed to mono and kept for the caller to stream frame by frame.
#[derive(Default)]
struct WavLoader {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl WavLoader {
    fn take_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }
}

impl MediaLoader for WavLoader {
    fn decode_audio(&mut self, path: &Path) -> line_visualiser_core::Result<AudioHandle> {
        let mut reader =
            hound::WavReader::open(path).map_err(|err| LineVizError::Load(err.to_string()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let raw: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|err| LineVizError::Load(err.to_string()))?,
            hound::SampleFormat::Int => {
                let full_scale = (1_i64 << (spec.bits_per_sample as u32 - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|sample| sample.map(|value| value as f32 / full_scale))
                    .collect::<Result<_, _>>()
                    .map_err(|err| LineVizError::Load(err.to_string()))?
            }
        };

        let samples: Vec<f32> = raw
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        let duration_seconds = samples.len() as f32 / spec.sample_rate.max(1) as f32;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.sample_rate = spec.sample_rate;
        self.samples = samples;
        Ok(AudioHandle {
            name,
            sample_rate: spec.sample_rate,
            duration_seconds,
        })
    }

    fn decode_video(&mut self, _path: &Path) -> line_visualiser_core::Result<VideoHandle> {
        Err(LineVizError::Load(
            "video decoding is not available in the command line build".into(),
        ))
    }

    fn open_microphone(&mut self) -> line_visualiser_core::Result<MicHandle> {
        Err(LineVizError::Permission(
            "no capture device in the command line build".into(),
        ))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive line drawing visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the pipeline with a synthetic amplitude-modulated tone.
    Demo {
        /// How long to run, in seconds.
        #[arg(short, long, default_value_t = 5.0)]
        seconds: f32,
        #[arg(long, default_value_t = 800.0)]
        width: f32,
        #[arg(long, default_value_t = 800.0)]
        height: f32,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Visualise a WAV file through the full upload and playback path.
    Render {
        /// Path to the WAV file to visualise.
        input: PathBuf,
        #[arg(long, default_value_t = 800.0)]
        width: f32,
        #[arg(long, default_value_t = 800.0)]
        height: f32,
    },
    /// Check whether a file would be accepted for upload.
    Probe {
        input: PathBuf,
    },
}
