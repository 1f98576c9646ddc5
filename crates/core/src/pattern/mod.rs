//! Loudness-to-geometry mapping.
//!
//! A single loudness scalar parameterises everything drawn in a frame: how
//! many line groups appear, how long and dense each group is, and how far
//! apart its parallel strokes sit. Every group is independently randomised on
//! purpose; the organic, non-repeating texture comes from never sharing
//! random state between frames or groups.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::render::{DrawSurface, Point};

/// Canvas size the visual design was tuned against; everything scales
/// relative to it.
pub const REFERENCE_CANVAS_SIZE: f32 = 800.0;

/// Brush thicknesses before scaling.
pub const BASE_STROKE_OPTIONS: [f32; 5] = [0.4, 0.8, 1.0, 2.0, 3.5];

/// Levels at or below this draw nothing, even while a source is active.
pub const LEVEL_GATE: f32 = 0.001;

/// Incline shared by every line group.
const INCLINE_DEGREES: f32 = 30.0;

/// Size-derived drawing parameters, recomputed on every resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleContext {
    pub base_size: f32,
    pub scale_factor: f32,
    pub stroke_options: [f32; 5],
}

impl ScaleContext {
    pub fn derive(width: f32, height: f32) -> Self {
        let base_size = width.min(height).max(0.0);
        let scale_factor = base_size / REFERENCE_CANVAS_SIZE;
        let stroke_options = BASE_STROKE_OPTIONS.map(|weight| weight * scale_factor);
        Self {
            base_size,
            scale_factor,
            stroke_options,
        }
    }
}

/// Linear range mapping.
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min)
}

/// Number of line groups a frame draws: zero unless a source is actually
/// playing or capturing and the level clears the gate, then scaled up with
/// loudness.
pub fn group_count(level: f32, is_active: bool) -> usize {
    if !is_active || level <= LEVEL_GATE {
        return 0;
    }
    map_range(level, 0.0, 1.0, 1.0, 8.0).floor() as usize
}

/// One randomised cluster of parallel inclined strokes. Ephemeral: sampled,
/// drawn, discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct LineGroup {
    pub origin: Point,
    pub end: Point,
    pub spacing: f32,
    /// Stroke weight per line; the length doubles as the line count.
    pub weights: Vec<f32>,
}

impl LineGroup {
    /// Samples a group for the given loudness inside centred canvas bounds.
    ///
    /// Louder means more lines, longer lines, and wider spacing between
    /// them; lengths scale with the canvas, counts and spacing do not.
    pub fn sample(rng: &mut impl Rng, level: f32, ctx: &ScaleContext, bounds: (f32, f32)) -> Self {
        let (width, height) = bounds;

        let min_lines = map_range(level, 0.0, 1.0, 5.0, 15.0);
        let max_lines = map_range(level, 0.0, 1.0, 15.0, 50.0);
        let min_length = map_range(level, 0.0, 1.0, 50.0, 150.0) * ctx.scale_factor;
        let max_length = map_range(level, 0.0, 1.0, 150.0, 300.0) * ctx.scale_factor;
        let min_spacing = map_range(level, 0.0, 1.0, 2.0, 6.0);
        let max_spacing = map_range(level, 0.0, 1.0, 6.0, 12.0);

        let origin = Point::new(
            rng.gen_range(-width / 2.0..width / 2.0),
            rng.gen_range(-height / 2.0..height / 2.0),
        );
        let sign_x: f32 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let sign_y: f32 = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let length = rng.gen_range(min_length..max_length);

        let incline = INCLINE_DEGREES.to_radians().tan();
        let end = Point::new(
            origin.x + length * sign_x,
            origin.y + length * incline * sign_y,
        );

        let count = rng.gen_range(min_lines..max_lines).floor() as usize;
        let spacing = rng.gen_range(min_spacing..max_spacing);
        let weights = (0..count)
            .map(|_| ctx.stroke_options[rng.gen_range(0..ctx.stroke_options.len())])
            .collect();

        Self {
            origin,
            end,
            spacing,
            weights,
        }
    }

    pub fn count(&self) -> usize {
        self.weights.len()
    }

    /// Draws the group: each stroke is the base segment translated along the
    /// incline's normal axis by its index times the group spacing.
    pub fn emit(&self, surface: &mut dyn DrawSurface) {
        let dx = self.end.x - self.origin.x;
        let dy = self.end.y - self.origin.y;
        let length = (dx * dx + dy * dy).sqrt();
        if length <= f32::EPSILON {
            return;
        }
        let normal = (-dy / length, dx / length);

        for (index, weight) in self.weights.iter().enumerate() {
            let offset = index as f32 * self.spacing;
            surface.draw_line(
                Point::new(self.origin.x + normal.0 * offset, self.origin.y + normal.1 * offset),
                Point::new(self.end.x + normal.0 * offset, self.end.y + normal.1 * offset),
                *weight,
            );
        }
    }
}

/// Emits the loudness-gated line groups for one frame.
#[derive(Debug)]
pub struct PatternGenerator {
    rng: SmallRng,
}

impl Default for PatternGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternGenerator {
    pub fn new() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Draws this frame's line groups and returns how many were drawn.
    /// Geometry is not retained after the call.
    pub fn render(
        &mut self,
        surface: &mut dyn DrawSurface,
        level: f32,
        is_active: bool,
        ctx: &ScaleContext,
    ) -> usize {
        let (width, height) = surface.size();
        if width <= 0.0 || height <= 0.0 {
            return 0;
        }

        let groups = group_count(level, is_active);
        for _ in 0..groups {
            LineGroup::sample(&mut self.rng, level, ctx, (width, height)).emit(surface);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemorySurface;

    #[test]
    fn gate_blocks_near_silence_even_when_active() {
        assert_eq!(group_count(0.0005, true), 0);
        assert_eq!(group_count(0.0, true), 0);
    }

    #[test]
    fn inactive_sources_draw_nothing_at_any_level() {
        assert_eq!(group_count(0.9, false), 0);
    }

    #[test]
    fn group_count_scales_with_loudness() {
        assert_eq!(group_count(0.5, true), 4);
        assert_eq!(group_count(0.002, true), 1);
        assert_eq!(group_count(1.0, true), 8);
    }

    #[test]
    fn render_draws_the_gated_group_count() {
        let mut generator = PatternGenerator::from_seed(7);
        let ctx = ScaleContext::derive(800.0, 600.0);
        let mut surface = MemorySurface::new(800.0, 600.0);

        assert_eq!(generator.render(&mut surface, 0.0005, true, &ctx), 0);
        assert!(surface.lines.is_empty());

        assert_eq!(generator.render(&mut surface, 0.5, true, &ctx), 4);
        assert!(!surface.lines.is_empty());
    }

    #[test]
    fn scale_context_follows_the_smaller_dimension() {
        let ctx = ScaleContext::derive(800.0, 400.0);
        assert_eq!(ctx.base_size, 400.0);
        assert!((ctx.scale_factor - 0.5).abs() < 1e-6);
        assert!((ctx.stroke_options[4] - 1.75).abs() < 1e-6);
    }

    #[test]
    fn doubling_the_canvas_doubles_lengths_but_not_counts_or_spacing() {
        let ctx = ScaleContext::derive(800.0, 800.0);
        let doubled = ScaleContext::derive(1600.0, 1600.0);

        for (a, b) in ctx.stroke_options.iter().zip(doubled.stroke_options.iter()) {
            assert!((b - a * 2.0).abs() < 1e-6);
        }

        let mut rng_a = SmallRng::seed_from_u64(42);
        let mut rng_b = SmallRng::seed_from_u64(42);
        let group = LineGroup::sample(&mut rng_a, 0.6, &ctx, (800.0, 800.0));
        let group_doubled = LineGroup::sample(&mut rng_b, 0.6, &doubled, (1600.0, 1600.0));

        let span = |g: &LineGroup| {
            let dx = g.end.x - g.origin.x;
            let dy = g.end.y - g.origin.y;
            (dx * dx + dy * dy).sqrt()
        };
        let ratio = span(&group_doubled) / span(&group);
        assert!((ratio - 2.0).abs() < 1e-3, "span ratio was {ratio}");

        assert_eq!(group.count(), group_doubled.count());
        assert!((group.spacing - group_doubled.spacing).abs() < 1e-4);
    }

    #[test]
    fn sampled_parameters_stay_inside_their_design_ranges() {
        let ctx = ScaleContext::derive(800.0, 800.0);
        let mut rng = SmallRng::seed_from_u64(3);

        for level in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let group = LineGroup::sample(&mut rng, level, &ctx, (800.0, 800.0));

            let min_lines = map_range(level, 0.0, 1.0, 5.0, 15.0).floor() as usize;
            let max_lines = map_range(level, 0.0, 1.0, 15.0, 50.0).ceil() as usize;
            assert!(group.count() >= min_lines && group.count() <= max_lines);

            let min_spacing = map_range(level, 0.0, 1.0, 2.0, 6.0);
            let max_spacing = map_range(level, 0.0, 1.0, 6.0, 12.0);
            assert!(group.spacing >= min_spacing && group.spacing < max_spacing);

            for weight in &group.weights {
                assert!(ctx
                    .stroke_options
                    .iter()
                    .any(|option| (option - weight).abs() < 1e-6));
            }
        }
    }

    #[test]
    fn strokes_share_the_incline_and_step_along_its_normal() {
        let ctx = ScaleContext::derive(800.0, 800.0);
        let mut rng = SmallRng::seed_from_u64(11);
        let group = LineGroup::sample(&mut rng, 0.7, &ctx, (800.0, 800.0));

        let mut surface = MemorySurface::new(800.0, 800.0);
        group.emit(&mut surface);
        assert_eq!(surface.lines.len(), group.count());

        let incline = INCLINE_DEGREES.to_radians().tan();
        for line in &surface.lines {
            let dx = line.to.x - line.from.x;
            let dy = line.to.y - line.from.y;
            assert!(((dy / dx).abs() - incline).abs() < 1e-3);
        }

        // Consecutive strokes sit one spacing apart.
        if surface.lines.len() >= 2 {
            let a = surface.lines[0];
            let b = surface.lines[1];
            let dx = b.from.x - a.from.x;
            let dy = b.from.y - a.from.y;
            let gap = (dx * dx + dy * dy).sqrt();
            assert!((gap - group.spacing).abs() < 1e-3);
        }
    }

    #[test]
    fn degenerate_surfaces_draw_nothing() {
        let mut generator = PatternGenerator::from_seed(1);
        let ctx = ScaleContext::derive(0.0, 0.0);
        let mut surface = MemorySurface::new(0.0, 0.0);
        assert_eq!(generator.render(&mut surface, 0.8, true, &ctx), 0);
    }
}
