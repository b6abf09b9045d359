use crate::{LEVEL_HISTORY_CAPACITY, LevelHistory, MIN_LEVEL_DB, level};

/// WHAT: Silence maps to the floor level
/// WHY: log10(0) is -inf and must never reach the meter
#[test]
fn given_all_zero_buffer_when_metering_then_floor() {
    for len in [1, 7, 100, 4096] {
        let silence = vec![0.0f32; len];
        assert_eq!(level(&silence), MIN_LEVEL_DB, "length {}", len);
    }
}

/// WHAT: Empty buffer maps to the floor level
/// WHY: A tick with no captured samples still produces one sample
#[test]
fn given_empty_buffer_when_metering_then_floor() {
    assert_eq!(level(&[]), MIN_LEVEL_DB);
}

/// WHAT: Level is independent of buffer length for constant amplitude
/// WHY: Tick timing varies, so buffers arrive in different sizes
#[test]
fn given_constant_amplitude_when_metering_different_lengths_then_same_level() {
    // Given: Two constant 0.5 buffers of different lengths
    let short = vec![0.5f32; 100];
    let long = vec![0.5f32; 1000];

    // When: Metering both
    let short_level = level(&short);
    let long_level = level(&long);

    // Then: Both match 10 * log10(0.25)
    let expected = 10.0 * 0.25f32.log10();
    assert!((short_level - long_level).abs() < 1e-4);
    assert!((short_level - expected).abs() < 1e-4);
}

/// WHAT: Full-scale signal meters at 0
/// WHY: Anchors the top of the scale used by the UI
#[test]
fn given_full_scale_square_wave_when_metering_then_zero() {
    let square: Vec<f32> = (0..480).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
    assert!(level(&square).abs() < 1e-4);
}

/// WHAT: Non-finite input clamps to the floor
/// WHY: A glitching driver must not poison the history with NaN
#[test]
fn given_non_finite_samples_when_metering_then_floor() {
    assert_eq!(level(&[0.1, f32::NAN, 0.2]), MIN_LEVEL_DB);
    assert_eq!(level(&[f32::INFINITY]), MIN_LEVEL_DB);
}

/// WHAT: Extremely quiet input never drops below the floor
/// WHY: The meter scale is bounded at -160
#[test]
fn given_subnormal_signal_when_metering_then_not_below_floor() {
    let whisper = vec![1e-30f32; 64];
    assert_eq!(level(&whisper), MIN_LEVEL_DB);
}

/// WHAT: History keeps the most recent 50 samples in order
/// WHY: The visualization scrolls oldest to newest
#[test]
fn given_sixty_samples_when_pushing_then_latest_fifty_remain_in_order() {
    // Given: An empty history
    let mut history = LevelHistory::default();

    // When: Appending 60 samples
    for i in 0..60 {
        history.push(-(i as f32));
    }

    // Then: Samples 10..60 remain, oldest first
    assert_eq!(history.len(), LEVEL_HISTORY_CAPACITY);
    let expected: Vec<f32> = (10..60).map(|i| -(i as f32)).collect();
    assert_eq!(history.to_vec(), expected);
    assert_eq!(history.latest(), Some(-59.0));
}

/// WHAT: Clearing empties the history
/// WHY: A new recording starts with a blank meter
#[test]
fn given_filled_history_when_clearing_then_empty() {
    let mut history = LevelHistory::with_capacity(3);
    history.push(-10.0);
    history.push(-20.0);

    history.clear();

    assert!(history.is_empty());
    assert_eq!(history.latest(), None);
}
