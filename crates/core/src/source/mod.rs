//! Source selection and switching.
//!
//! The controller owns the active [`AudioSourceState`] and the [`LevelMeter`]
//! wiring. Switching rules mirror how the sources behave for a user: a new
//! upload pauses whatever file is playing, the microphone overrides (but does
//! not discard) the loaded file, and any load failure lands on the silent
//! source so the frame loop always has a valid loudness reading.

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::analysis::{EnvelopeFollower, SpectrumTap, FFT_SIZE};
use crate::media::{self, AudioHandle, MediaHandle, MediaKind, MediaLoader, MicHandle, VideoHandle};
use crate::meter::{lock_ignoring_poison, LevelMeter, Mechanism};
use crate::status::{StatusSink, StatusUpdate};
use crate::Result;

/// Fade applied when file audio stops, instead of an abrupt cut.
pub const FADE_OUT_SECONDS: f32 = 0.5;

/// The signal source currently feeding the meter. Exactly one is active.
#[derive(Debug)]
pub enum AudioSourceState {
    /// Fallback zero-amplitude generator; the initial state.
    Silent,
    FileAudio {
        handle: AudioHandle,
        is_playing: bool,
    },
    FileVideo {
        handle: VideoHandle,
        is_playing: bool,
        /// Spectrum analysis node. Created lazily on the first successful
        /// video activation and shared with the meter.
        tap: Arc<Mutex<SpectrumTap>>,
    },
    Microphone {
        handle: MicHandle,
        is_capturing: bool,
    },
}

/// Playback/capture command for the platform layer to carry out. The
/// controller records the state change; the adapter owns the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transport {
    Play { looped: bool },
    Pause,
    Stop,
    FadeOut { seconds: f32 },
    StartCapture,
    StopCapture,
}

/// Process-wide audio context. Starts suspended; the platform marks it
/// running once its user-gesture resume completes. There is no teardown
/// within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Suspended,
    Running,
}

/// Token for an in-flight upload. Completions whose token no longer matches
/// the controller's generation are discarded, so a superseded upload can
/// never disturb the source that replaced it.
#[must_use = "complete the upload with SourceController::finish_upload"]
#[derive(Debug)]
pub struct UploadTicket {
    generation: u64,
    kind: MediaKind,
    name: String,
}

impl UploadTicket {
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// State machine governing which source is active and how the meter is wired.
pub struct SourceController {
    active: AudioSourceState,
    /// File-dimension state preserved while the microphone overrides it, so
    /// switching back needs no re-upload.
    shelved: Option<AudioSourceState>,
    meter: LevelMeter,
    envelope: Arc<Mutex<EnvelopeFollower>>,
    video_tap: Option<Arc<Mutex<SpectrumTap>>>,
    context: ContextState,
    generation: u64,
    sink: Box<dyn StatusSink>,
}

impl SourceController {
    pub fn new(sink: Box<dyn StatusSink>) -> Self {
        let envelope = Arc::new(Mutex::new(EnvelopeFollower::new()));
        let mut meter = LevelMeter::new();
        meter.rewire(Mechanism::Envelope(envelope.clone()));
        Self {
            active: AudioSourceState::Silent,
            shelved: None,
            meter,
            envelope,
            video_tap: None,
            context: ContextState::Suspended,
            generation: 0,
            sink,
        }
    }

    pub fn active(&self) -> &AudioSourceState {
        &self.active
    }

    pub fn shelved(&self) -> Option<&AudioSourceState> {
        self.shelved.as_ref()
    }

    pub fn meter(&self) -> &LevelMeter {
        &self.meter
    }

    pub fn context(&self) -> ContextState {
        self.context
    }

    /// True while the active source is actually playing or capturing.
    pub fn is_active(&self) -> bool {
        match &self.active {
            AudioSourceState::Silent => false,
            AudioSourceState::FileAudio { is_playing, .. } => *is_playing,
            AudioSourceState::FileVideo { is_playing, .. } => *is_playing,
            AudioSourceState::Microphone { is_capturing, .. } => *is_capturing,
        }
    }

    /// Marks the audio context as running. Called by the platform once its
    /// user-gesture resume completes; until then level reads are degraded.
    pub fn resume_context(&mut self) {
        if self.context == ContextState::Running {
            return;
        }
        self.context = ContextState::Running;
        // Reattach the analyser now that the context is awake.
        self.wire_meter_for_active();
    }

    /// Routes a waveform block from the active stream into the meter.
    pub fn push_samples(&mut self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.meter.ingest(samples)
    }

    /// Advances the smoothed loudness by one frame and returns it.
    ///
    /// Returns exactly zero while the audio context is still suspended: the
    /// signal may be attached but its readings are degraded, and silence is
    /// the contract rather than an error.
    pub fn update_level(&mut self) -> f32 {
        if self.context == ContextState::Suspended {
            return 0.0;
        }
        self.meter.update()
    }

    /// Last smoothed loudness without advancing it.
    pub fn level(&self) -> f32 {
        if self.context == ContextState::Suspended {
            return 0.0;
        }
        self.meter.level()
    }

    /// Validates and registers a new upload.
    ///
    /// Unrecognised extensions are rejected before any decode attempt, with
    /// exactly one error status and no state change. A valid upload pauses
    /// the current file playback (returned as transport commands), bumps the
    /// generation so any older in-flight upload becomes stale, and hands back
    /// the ticket the decode completion must present.
    pub fn begin_upload(
        &mut self,
        file_name: &str,
        size_bytes: u64,
    ) -> Result<(UploadTicket, Vec<Transport>)> {
        let kind = match media::classify(file_name) {
            Ok(kind) => kind,
            Err(err) => {
                self.sink.publish(StatusUpdate::Error {
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        if media::exceeds_size_advisory(size_bytes) {
            self.sink.publish(StatusUpdate::LargeFile {
                name: file_name.to_string(),
                size_mb: size_bytes as f64 / (1024.0 * 1024.0),
            });
        }
        self.sink.publish(StatusUpdate::Loading {
            name: file_name.to_string(),
        });

        let commands = self.pause_active_playback();
        self.generation += 1;
        let ticket = UploadTicket {
            generation: self.generation,
            kind,
            name: file_name.to_string(),
        };
        Ok((ticket, commands))
    }

    /// Applies a decode completion.
    ///
    /// Stale tickets (superseded by a newer upload) are discarded without
    /// touching the active source. A current failure surfaces one error
    /// status and falls back to [`AudioSourceState::Silent`]; if the
    /// microphone is the active source it stays active and only the file
    /// slot falls back. A current success installs the handle with playback
    /// off until an explicit start.
    pub fn finish_upload(&mut self, ticket: UploadTicket, outcome: Result<MediaHandle>) -> Result<()> {
        if ticket.generation != self.generation {
            return Ok(());
        }

        match outcome {
            Ok(handle) => {
                self.install_handle(handle);
                Ok(())
            }
            Err(err) => {
                self.sink.publish(StatusUpdate::Error {
                    message: err.to_string(),
                });
                self.fall_back_to_silent();
                Err(err)
            }
        }
    }

    /// Synchronous upload convenience: validate, decode through the loader,
    /// and activate in one call.
    pub fn upload_file(
        &mut self,
        loader: &mut dyn MediaLoader,
        path: &Path,
        size_bytes: u64,
    ) -> Result<(MediaKind, Vec<Transport>)> {
        let name = path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_string();
        let (ticket, commands) = self.begin_upload(&name, size_bytes)?;
        let kind = ticket.kind;
        let outcome = match kind {
            MediaKind::Audio => loader.decode_audio(path).map(MediaHandle::Audio),
            MediaKind::Video => loader.decode_video(path).map(MediaHandle::Video),
        };
        self.finish_upload(ticket, outcome)?;
        Ok((kind, commands))
    }

    /// Switches to the microphone.
    ///
    /// A permission failure aborts with the prior state untouched. On success
    /// the current file source is paused and shelved, the meter follows the
    /// mic's waveform envelope regardless of any video tap, and the context
    /// counts as resumed since capture is user-initiated.
    pub fn activate_microphone(
        &mut self,
        loader: &mut dyn MediaLoader,
    ) -> Result<Vec<Transport>> {
        if matches!(self.active, AudioSourceState::Microphone { .. }) {
            return Ok(Vec::new());
        }

        let handle = match loader.open_microphone() {
            Ok(handle) => handle,
            Err(err) => {
                self.sink.publish(StatusUpdate::Error {
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        let commands = self.pause_active_playback();
        let previous = std::mem::replace(
            &mut self.active,
            AudioSourceState::Microphone {
                handle,
                is_capturing: false,
            },
        );
        if !matches!(previous, AudioSourceState::Silent) {
            self.shelved = Some(previous);
        }
        self.context = ContextState::Running;
        self.wire_meter_for_active();
        Ok(commands)
    }

    /// Returns to the shelved file source (or silence) from the microphone.
    pub fn deactivate_microphone(&mut self) -> Vec<Transport> {
        let is_capturing = match &self.active {
            AudioSourceState::Microphone { is_capturing, .. } => *is_capturing,
            _ => return Vec::new(),
        };

        let commands = if is_capturing {
            vec![Transport::StopCapture]
        } else {
            Vec::new()
        };
        self.active = self.shelved.take().unwrap_or(AudioSourceState::Silent);
        self.wire_meter_for_active();

        let update = match &self.active {
            AudioSourceState::FileAudio { .. } | AudioSourceState::FileVideo { .. } => {
                StatusUpdate::SwitchedToFile
            }
            _ => StatusUpdate::MicrophoneStopped,
        };
        self.sink.publish(update);
        commands
    }

    /// Flips the active source between playing/capturing and stopped.
    ///
    /// File audio stops with a short fade rather than a hard cut; video
    /// playback is continuous-loop; the silent source ignores transport.
    pub fn toggle_playback(&mut self) -> Vec<Transport> {
        match &mut self.active {
            AudioSourceState::Silent => Vec::new(),
            AudioSourceState::FileAudio { is_playing, .. } => {
                if *is_playing {
                    *is_playing = false;
                    vec![Transport::FadeOut {
                        seconds: FADE_OUT_SECONDS,
                    }]
                } else {
                    *is_playing = true;
                    vec![Transport::Play { looped: false }]
                }
            }
            AudioSourceState::FileVideo { is_playing, .. } => {
                if *is_playing {
                    *is_playing = false;
                    vec![Transport::Pause]
                } else {
                    *is_playing = true;
                    vec![Transport::Play { looped: true }]
                }
            }
            AudioSourceState::Microphone { is_capturing, .. } => {
                if *is_capturing {
                    *is_capturing = false;
                    vec![Transport::StopCapture]
                } else {
                    *is_capturing = true;
                    self.sink.publish(StatusUpdate::Listening);
                    vec![Transport::StartCapture]
                }
            }
        }
    }

    /// Starts the active source if it is stopped.
    pub fn start(&mut self) -> Vec<Transport> {
        if self.is_active() {
            Vec::new()
        } else {
            self.toggle_playback()
        }
    }

    /// Stops the active source if it is playing or capturing.
    pub fn stop(&mut self) -> Vec<Transport> {
        if self.is_active() {
            self.toggle_playback()
        } else {
            Vec::new()
        }
    }

    fn pause_active_playback(&mut self) -> Vec<Transport> {
        match &mut self.active {
            AudioSourceState::FileAudio { is_playing, .. } if *is_playing => {
                *is_playing = false;
                vec![Transport::Stop]
            }
            AudioSourceState::FileVideo { is_playing, .. } if *is_playing => {
                *is_playing = false;
                vec![Transport::Pause]
            }
            _ => Vec::new(),
        }
    }

    fn install_handle(&mut self, handle: MediaHandle) {
        let name = handle.name().to_string();
        let kind = handle.kind();
        let state = match handle {
            MediaHandle::Audio(handle) => AudioSourceState::FileAudio {
                handle,
                is_playing: false,
            },
            MediaHandle::Video(handle) => {
                let tap = self
                    .video_tap
                    .get_or_insert_with(|| Arc::new(Mutex::new(SpectrumTap::new(FFT_SIZE))))
                    .clone();
                AudioSourceState::FileVideo {
                    handle,
                    is_playing: false,
                    tap,
                }
            }
        };

        if matches!(self.active, AudioSourceState::Microphone { .. }) {
            self.shelved = Some(state);
        } else {
            self.active = state;
            self.wire_meter_for_active();
        }
        self.sink.publish(StatusUpdate::Loaded { name, kind });
    }

    fn fall_back_to_silent(&mut self) {
        if matches!(self.active, AudioSourceState::Microphone { .. }) {
            self.shelved = Some(AudioSourceState::Silent);
        } else {
            self.active = AudioSourceState::Silent;
            self.wire_meter_for_active();
        }
    }

    fn wire_meter_for_active(&mut self) {
        // Teardown first: no tick may observe the old and new mechanism at
        // once.
        self.meter.rewire(Mechanism::None);
        let mechanism = match &self.active {
            AudioSourceState::FileVideo { tap, .. } => Mechanism::Spectrum(tap.clone()),
            AudioSourceState::Silent
            | AudioSourceState::FileAudio { .. }
            | AudioSourceState::Microphone { .. } => {
                lock_ignoring_poison(&self.envelope).reset();
                Mechanism::Envelope(self.envelope.clone())
            }
        };
        self.meter.rewire(mechanism);
    }
}

impl fmt::Debug for SourceController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceController")
            .field("active", &self.active)
            .field("shelved", &self.shelved)
            .field("context", &self.context)
            .field("generation", &self.generation)
            .finish()
    }
}
