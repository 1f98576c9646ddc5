use std::sync::{Arc, Mutex, PoisonError};

use crate::analysis::{EnvelopeFollower, SpectrumTap};
use crate::Result;

/// Fixed exponential smoothing coefficient applied to every mechanism.
pub const SMOOTHING: f32 = 0.8;

/// The measurement mechanism currently feeding the meter.
///
/// Handles are shared with the source controller, which is the only writer:
/// it swaps the whole variant on a source switch, so readers never observe a
/// half-rewired mechanism.
#[derive(Debug, Clone)]
pub enum Mechanism {
    /// Nothing wired; the meter reads zero.
    None,
    /// Time-domain envelope follower over the active waveform stream.
    Envelope(Arc<Mutex<EnvelopeFollower>>),
    /// Frequency-bin snapshot of the active video's audio track.
    Spectrum(Arc<Mutex<SpectrumTap>>),
}

/// Normalises raw signal energy into a smoothed loudness scalar in [0, 1].
#[derive(Debug)]
pub struct LevelMeter {
    smoothing: f32,
    smoothed: f32,
    mechanism: Mechanism,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            smoothing: SMOOTHING,
            smoothed: 0.0,
            mechanism: Mechanism::None,
        }
    }

    /// Swaps the mechanism feeding the meter. Smoothing state carries across
    /// the swap so a source switch decays rather than jumping.
    pub fn rewire(&mut self, mechanism: Mechanism) {
        self.mechanism = mechanism;
    }

    pub fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    /// Routes a waveform block to whichever mechanism is wired.
    pub fn ingest(&mut self, samples: &[f32]) -> Result<()> {
        match &self.mechanism {
            Mechanism::None => Ok(()),
            Mechanism::Envelope(follower) => {
                lock_ignoring_poison(follower).process_block(samples);
                Ok(())
            }
            Mechanism::Spectrum(tap) => lock_ignoring_poison(tap).push_block(samples),
        }
    }

    /// Advances the smoothed level by one frame and returns it.
    ///
    /// Call once per animation frame; use [`LevelMeter::level`] for re-reads
    /// within the same frame. Always in [0, 1], zero when nothing is wired.
    pub fn update(&mut self) -> f32 {
        let instant = match &self.mechanism {
            Mechanism::None => 0.0,
            Mechanism::Envelope(follower) => lock_ignoring_poison(follower).instant(),
            Mechanism::Spectrum(tap) => lock_ignoring_poison(tap).average(),
        };
        let instant = if instant.is_finite() {
            instant.clamp(0.0, 1.0)
        } else {
            0.0
        };

        self.smoothed =
            (self.smoothing * self.smoothed + (1.0 - self.smoothing) * instant).clamp(0.0, 1.0);
        self.smoothed
    }

    /// Last smoothed level without advancing it.
    pub fn level(&self) -> f32 {
        self.smoothed
    }
}

pub(crate) fn lock_ignoring_poison<T>(shared: &Arc<Mutex<T>>) -> std::sync::MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
