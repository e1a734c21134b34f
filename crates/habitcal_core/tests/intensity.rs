use habitcal_core::render::intensity::{HIGH_COLOR, LOW_COLOR, MID_COLOR};
use habitcal_core::{color_for, enhance_contrast, heat_color, normalize, Rgb};

const EPSILON: f64 = 1e-4;

#[test]
fn contrast_fixes_boundaries_and_midpoint() {
    assert_eq!(enhance_contrast(0.0), 0.0);
    assert_eq!(enhance_contrast(0.5), 0.5);
    assert_eq!(enhance_contrast(1.0), 1.0);
}

#[test]
fn contrast_is_non_decreasing() {
    let mut previous = enhance_contrast(0.0);
    for step in 1..=1000 {
        let current = enhance_contrast(f64::from(step) / 1000.0);
        assert!(
            current >= previous,
            "enhance_contrast decreased at step {step}: {previous} -> {current}"
        );
        assert!((0.0..=1.0).contains(&current));
        previous = current;
    }
}

#[test]
fn normalize_clamps_outside_declared_range() {
    let (min, max) = (1.0, 10.0);
    assert_eq!(normalize(min - 5.0, min, max), 0.0);
    assert_eq!(normalize(max + 5.0, min, max), 1.0);
    assert_eq!(normalize(min, min, max), 0.0);
    assert_eq!(normalize(max, min, max), 1.0);
}

#[test]
fn lower_half_interpolates_red_to_yellow() {
    assert_eq!(color_for(0.25), LOW_COLOR.lerp(MID_COLOR, 0.5));
    assert_eq!(color_for(0.5), MID_COLOR);
}

#[test]
fn value_in_upper_range_maps_between_yellow_and_green() {
    // min=1, max=10, value=8.5
    let normalized = normalize(8.5, 1.0, 10.0);
    assert!((normalized - 0.8333).abs() < EPSILON);

    let enhanced = enhance_contrast(normalized);
    assert!((enhanced - 0.7222).abs() < EPSILON);

    let t = (enhanced - 0.5) * 2.0;
    assert!((t - 0.4444).abs() < EPSILON);

    let color = color_for(enhanced);
    assert_eq!(color, MID_COLOR.lerp(HIGH_COLOR, t));
    assert_eq!(color, Rgb::new(175, 208, 68));

    let (intensity, piped) = heat_color(8.5, 1.0, 10.0);
    assert!((intensity - enhanced).abs() < f64::EPSILON);
    assert_eq!(piped, color);
}

#[test]
fn out_of_range_stored_values_render_at_the_extremes() {
    assert_eq!(heat_color(-40.0, 1.0, 10.0).1, LOW_COLOR);
    assert_eq!(heat_color(400.0, 1.0, 10.0).1, HIGH_COLOR);
}
