use crate::pattern::{PatternGenerator, ScaleContext};
use crate::render::DrawSurface;
use crate::source::SourceController;
use crate::status::StatusSink;

/// Paper background the canvas is washed with each frame.
pub const BACKGROUND: [u8; 3] = [247, 241, 219];

/// Wash opacity; low enough that earlier strokes linger as a trail.
pub const TRAIL_ALPHA: f32 = 25.0 / 255.0;

/// What one tick produced, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    pub level: f32,
    pub groups: usize,
}

/// Ties the source controller, meter, and pattern generator into the
/// once-per-display-frame loop.
pub struct Visualizer {
    controller: SourceController,
    pattern: PatternGenerator,
    scale: ScaleContext,
}

impl Visualizer {
    pub fn new(sink: Box<dyn StatusSink>, width: f32, height: f32) -> Self {
        Self {
            controller: SourceController::new(sink),
            pattern: PatternGenerator::new(),
            scale: ScaleContext::derive(width, height),
        }
    }

    pub fn controller(&mut self) -> &mut SourceController {
        &mut self.controller
    }

    pub fn scale(&self) -> &ScaleContext {
        &self.scale
    }

    /// Re-derives the scale context after a surface resize.
    pub fn resize(&mut self, width: f32, height: f32) {
        self.scale = ScaleContext::derive(width, height);
    }

    /// Runs one animation frame: wash the canvas, advance the loudness once,
    /// and draw the gated line groups.
    pub fn tick(&mut self, surface: &mut dyn DrawSurface) -> FrameStats {
        surface.clear_with_fade(BACKGROUND, TRAIL_ALPHA);
        let level = self.controller.update_level();
        let groups = self
            .pattern
            .render(surface, level, self.controller.is_active(), &self.scale);
        FrameStats { level, groups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioHandle, MediaHandle};
    use crate::render::MemorySurface;
    use crate::status::MemorySink;

    fn visualizer_with_loaded_audio() -> Visualizer {
        let mut viz = Visualizer::new(Box::new(MemorySink::new()), 800.0, 800.0);
        let ctl = viz.controller();
        let (ticket, _) = ctl.begin_upload("tone.wav", 1_000).unwrap();
        ctl.finish_upload(
            ticket,
            Ok(MediaHandle::Audio(AudioHandle {
                name: "tone.wav".into(),
                sample_rate: 48_000,
                duration_seconds: 1.0,
            })),
        )
        .unwrap();
        viz
    }

    #[test]
    fn a_loud_playing_source_draws_groups() {
        let mut viz = visualizer_with_loaded_audio();
        viz.controller().resume_context();
        viz.controller().start();

        let mut surface = MemorySurface::new(800.0, 800.0);
        for _ in 0..20 {
            viz.controller().push_samples(&[0.9; 800]).unwrap();
            viz.tick(&mut surface);
        }

        let stats = {
            viz.controller().push_samples(&[0.9; 800]).unwrap();
            viz.tick(&mut surface)
        };
        assert!(stats.level > 0.5);
        assert!(stats.groups > 0);
        assert!(!surface.lines.is_empty());
        assert!(surface.washes > 0);
    }

    #[test]
    fn a_stopped_source_washes_but_draws_nothing() {
        let mut viz = visualizer_with_loaded_audio();
        viz.controller().resume_context();

        let mut surface = MemorySurface::new(800.0, 800.0);
        viz.controller().push_samples(&[0.9; 800]).unwrap();
        let stats = viz.tick(&mut surface);

        assert_eq!(stats.groups, 0, "playback has not started");
        assert!(surface.lines.is_empty());
        assert_eq!(surface.washes, 1);
    }

    #[test]
    fn resize_rescales_the_pattern_context() {
        let mut viz = Visualizer::new(Box::new(MemorySink::new()), 800.0, 800.0);
        assert!((viz.scale().scale_factor - 1.0).abs() < 1e-6);

        viz.resize(400.0, 1200.0);
        assert!((viz.scale().scale_factor - 0.5).abs() < 1e-6);
    }
}
