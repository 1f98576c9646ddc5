use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::Result;

/// Window length used by the spectrum tap. Matches the bin resolution of the
/// analyser node the tap stands in for.
pub const FFT_SIZE: usize = 1024;

/// Upper bound on buffered samples awaiting analysis. Older samples are
/// discarded once the backlog exceeds this.
const MAX_PENDING: usize = FFT_SIZE * 4;

/// Running amplitude measure over a pushed waveform stream.
///
/// The instantaneous value is the RMS of the most recent block; smoothing is
/// the meter's job, so the follower itself keeps no further state.
#[derive(Debug, Default)]
pub struct EnvelopeFollower {
    instant: f32,
}

impl EnvelopeFollower {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes a block of samples and updates the instantaneous amplitude.
    pub fn process_block(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        self.instant = compute_rms(samples).clamp(0.0, 1.0);
    }

    /// Latest instantaneous amplitude in [0, 1].
    pub fn instant(&self) -> f32 {
        self.instant
    }

    pub fn reset(&mut self) {
        self.instant = 0.0;
    }
}

/// Frequency-bin magnitude snapshot over a pushed waveform stream.
///
/// Buffers incoming samples and refreshes a byte-magnitude bin array on every
/// full Hann-windowed FFT frame, with 50% overlap between frames. Bins use the
/// 8-bit range an analyser node reports, so consumers normalise by 255.
pub struct SpectrumTap {
    fft_size: usize,
    planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
    pending: Vec<f32>,
    bins: Vec<u8>,
}

impl SpectrumTap {
    pub fn new(fft_size: usize) -> Self {
        Self {
            fft_size,
            planner: RealFftPlanner::new(),
            fft: None,
            pending: Vec::with_capacity(fft_size * 2),
            bins: vec![0; fft_size / 2 + 1],
        }
    }

    /// Consumes a block of samples, running as many overlapped analysis
    /// frames as the backlog allows.
    pub fn push_block(&mut self, samples: &[f32]) -> Result<()> {
        self.pending.extend_from_slice(samples);
        if self.pending.len() > MAX_PENDING {
            let excess = self.pending.len() - MAX_PENDING;
            self.pending.drain(0..excess);
        }

        while self.pending.len() >= self.fft_size {
            self.analyse_window()?;
            self.pending.drain(0..self.fft_size / 2);
        }
        Ok(())
    }

    /// Most recent frequency-bin magnitudes, one byte per bin.
    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    /// Mean bin magnitude normalised by 255, in [0, 1].
    pub fn average(&self) -> f32 {
        let sum: u32 = self.bins.iter().map(|&b| u32::from(b)).sum();
        sum as f32 / self.bins.len() as f32 / 255.0
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.bins.fill(0);
    }

    fn analyse_window(&mut self) -> Result<()> {
        let size = self.fft_size;
        let rebuild = self
            .fft
            .as_ref()
            .map(|fft| fft.size != size)
            .unwrap_or(true);

        if rebuild {
            let plan = self.planner.plan_fft_forward(size);
            let scratch = plan.make_scratch_vec();
            let spectrum = plan.make_output_vec();
            let input = plan.make_input_vec();
            self.fft = Some(FftResources {
                size,
                plan,
                scratch,
                spectrum,
                input,
            });
        }

        let fft = self.fft.as_mut().expect("fft resources must exist");
        for (index, value) in self.pending[..size].iter().enumerate() {
            fft.input[index] = *value * hann_value(index, size);
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        // Single-sided amplitude with the Hann coherent gain folded in, so a
        // full-scale sine lands near the top of the byte range.
        let scale = 4.0 / size as f32;
        for (slot, bin) in self.bins.iter_mut().zip(fft.spectrum.iter()) {
            let amplitude = (bin.norm() * scale).clamp(0.0, 1.0);
            *slot = (amplitude * 255.0).round() as u8;
        }
        Ok(())
    }
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for SpectrumTap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumTap")
            .field("fft_size", &self.fft_size)
            .field("pending", &self.pending.len())
            .field("bins", &self.bins.len())
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

pub(crate) fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_constant_block() {
        let samples = vec![0.5_f32; 256];
        assert!((compute_rms(&samples) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn hann_is_zero_at_edges_and_one_at_centre() {
        assert!(hann_value(0, FFT_SIZE).abs() < 0.01);
        assert!(hann_value(FFT_SIZE - 1, FFT_SIZE).abs() < 0.01);
        assert!((hann_value(FFT_SIZE / 2, FFT_SIZE) - 1.0).abs() < 0.01);
    }

    #[test]
    fn follower_tracks_block_amplitude() {
        let mut follower = EnvelopeFollower::new();
        follower.process_block(&[0.5; 128]);
        assert!((follower.instant() - 0.5).abs() < 1e-6);

        follower.process_block(&[]);
        assert!((follower.instant() - 0.5).abs() < 1e-6);

        follower.reset();
        assert_eq!(follower.instant(), 0.0);
    }

    #[test]
    fn follower_clamps_hot_signals() {
        let mut follower = EnvelopeFollower::new();
        follower.process_block(&[100.0; 64]);
        assert_eq!(follower.instant(), 1.0);
    }

    #[test]
    fn tap_stays_silent_for_zero_input() {
        let mut tap = SpectrumTap::new(FFT_SIZE);
        tap.push_block(&vec![0.0; FFT_SIZE * 2]).unwrap();
        assert!(tap.bins().iter().all(|&b| b == 0));
        assert_eq!(tap.average(), 0.0);
    }

    #[test]
    fn tap_reports_energy_for_a_sine() {
        let mut tap = SpectrumTap::new(FFT_SIZE);
        let samples: Vec<f32> = (0..FFT_SIZE * 2)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / 48_000.0).sin() * 0.9)
            .collect();
        tap.push_block(&samples).unwrap();

        assert!(tap.bins().iter().any(|&b| b > 0));
        let average = tap.average();
        assert!(average > 0.0 && average <= 1.0);
    }

    #[test]
    fn tap_bins_stay_in_byte_range_for_hot_input() {
        let mut tap = SpectrumTap::new(FFT_SIZE);
        let samples: Vec<f32> = (0..FFT_SIZE * 2)
            .map(|i| (i as f32 * 0.3).sin() * 50.0)
            .collect();
        tap.push_block(&samples).unwrap();
        assert!(tap.average() <= 1.0);
    }

    #[test]
    fn tap_backlog_is_bounded() {
        let mut tap = SpectrumTap::new(FFT_SIZE);
        tap.push_block(&vec![0.1; FFT_SIZE * 32]).unwrap();
        assert!(tap.pending.len() < FFT_SIZE);
    }

    #[test]
    fn tap_reset_clears_the_snapshot() {
        let mut tap = SpectrumTap::new(FFT_SIZE);
        let samples: Vec<f32> = (0..FFT_SIZE).map(|i| (i as f32 * 0.2).sin()).collect();
        tap.push_block(&samples).unwrap();
        tap.reset();
        assert!(tap.bins().iter().all(|&b| b == 0));
    }
}
