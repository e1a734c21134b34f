//! Quantitative value to heatmap color mapping for focus mode.
//!
//! # Invariants
//! - All intermediate intensities stay within `[0, 1]`.
//! - `enhance_contrast` is continuous, non-decreasing, and fixes 0, 0.5, 1.
//! - Higher intensity is always greener; there is no per-tag polarity.
//! - Absence is resolved before this module is reached; `NO_DATA_COLOR` is
//!   only used by the cell renderer.

use crate::model::color::Rgb;

/// Fill for days without a record.
pub const NO_DATA_COLOR: Rgb = Rgb::new(0xE0, 0xE0, 0xE0);
/// Intensity 0.
pub const LOW_COLOR: Rgb = Rgb::new(0xF4, 0x43, 0x36);
/// Intensity 0.5.
pub const MID_COLOR: Rgb = Rgb::new(0xFF, 0xEB, 0x3B);
/// Intensity 1.
pub const HIGH_COLOR: Rgb = Rgb::new(0x4C, 0xAF, 0x50);

/// Position of `value` within `[min, max]`, clamped to `[0, 1]`.
///
/// A degenerate range (`max <= min`) maps to 1 at or above `max`, else 0.
/// `NaN` inputs map to 0.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() || min.is_nan() || max.is_nan() {
        return 0.0;
    }
    if max <= min {
        return if value >= max { 1.0 } else { 0.0 };
    }

    let ratio = (value - min) / (max - min);
    if ratio.is_nan() {
        return 0.0;
    }
    ratio.clamp(0.0, 1.0)
}

/// Pushes intensities away from the midpoint so small differences read.
///
/// `n < 0.5`: `0.5 * sqrt(2n)`; otherwise `0.5 + 0.5 * (2(n - 0.5))^2`.
pub fn enhance_contrast(n: f64) -> f64 {
    let n = if n.is_nan() { 0.0 } else { n.clamp(0.0, 1.0) };
    if n < 0.5 {
        0.5 * (n * 2.0).sqrt()
    } else {
        let upper = (n - 0.5) * 2.0;
        0.5 + 0.5 * upper * upper
    }
}

/// Red -> yellow -> green interpolation of an intensity.
pub fn color_for(intensity: f64) -> Rgb {
    let intensity = if intensity.is_nan() {
        0.0
    } else {
        intensity.clamp(0.0, 1.0)
    };

    if intensity <= 0.5 {
        LOW_COLOR.lerp(MID_COLOR, intensity * 2.0)
    } else {
        MID_COLOR.lerp(HIGH_COLOR, (intensity - 0.5) * 2.0)
    }
}

/// Full focus-mode pipeline: normalize, enhance, then color.
///
/// Returns the enhanced intensity alongside the color.
pub fn heat_color(value: f64, min: f64, max: f64) -> (f64, Rgb) {
    let intensity = enhance_contrast(normalize(value, min, max));
    (intensity, color_for(intensity))
}
