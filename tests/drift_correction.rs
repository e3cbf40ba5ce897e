use std::time::Duration;

use listenalong::playback::{Confidence, CorrectionDecision, DriftCorrector, ProjectedTarget};

fn target(position: f64) -> ProjectedTarget {
    ProjectedTarget {
        position,
        confidence: Confidence::Projected,
    }
}

fn decide_fresh(corrector: &DriftCorrector, actual: f64, tgt: f64) -> CorrectionDecision {
    corrector.decide(actual, &target(tgt), true, false, None, 100_000.0)
}

#[test]
fn test_large_gap_hard_seeks() {
    // Snapshot taken 2s ago at 100.0 projects to 102.0; playback still at
    // 100.0 is two seconds adrift.
    let corrector = DriftCorrector::new();
    match decide_fresh(&corrector, 100.0, 102.0) {
        CorrectionDecision::HardSeek { position } => assert_eq!(position, 102.0),
        other => panic!("expected hard seek, got {:?}", other),
    }
}

#[test]
fn test_small_gap_is_left_alone() {
    let corrector = DriftCorrector::new();
    assert_eq!(
        decide_fresh(&corrector, 101.95, 102.0),
        CorrectionDecision::NoOp
    );
}

#[test]
fn test_mid_gap_nudges_rate_up_when_behind() {
    let corrector = DriftCorrector::new();
    match decide_fresh(&corrector, 101.5, 102.0) {
        CorrectionDecision::SoftNudge { rate, duration } => {
            assert!(rate > 1.0, "behind playback must speed up, got {}", rate);
            assert!(rate <= 1.15);
            assert!(duration >= Duration::from_millis(200));
            assert!(duration <= Duration::from_millis(1_000));
        }
        other => panic!("expected soft nudge, got {:?}", other),
    }
}

#[test]
fn test_mid_gap_nudges_rate_down_when_ahead() {
    let corrector = DriftCorrector::new();
    match decide_fresh(&corrector, 102.5, 102.0) {
        CorrectionDecision::SoftNudge { rate, .. } => {
            assert!(rate < 1.0, "ahead playback must slow down, got {}", rate);
            assert!(rate >= 1.0 / 1.15 - 1e-9);
        }
        other => panic!("expected soft nudge, got {:?}", other),
    }
}

#[test]
fn test_gap_exactly_at_small_threshold_is_left_alone() {
    let corrector = DriftCorrector::new();
    assert_eq!(
        decide_fresh(&corrector, 100.0, 100.1),
        CorrectionDecision::NoOp
    );
}

#[test]
fn test_gap_exactly_at_large_threshold_still_nudges() {
    let corrector = DriftCorrector::new();
    assert!(matches!(
        decide_fresh(&corrector, 100.0, 101.0),
        CorrectionDecision::SoftNudge { .. }
    ));
}

#[test]
fn test_gap_just_above_large_threshold_seeks() {
    let corrector = DriftCorrector::new();
    assert!(matches!(
        decide_fresh(&corrector, 100.0, 101.001),
        CorrectionDecision::HardSeek { .. }
    ));
}

#[test]
fn test_paused_mid_gap_seeks_instead_of_nudging() {
    // A rate change cannot act on a paused timeline, and a paused seek is
    // inaudible anyway.
    let corrector = DriftCorrector::new();
    assert!(matches!(
        corrector.decide(101.5, &target(102.0), false, false, None, 100_000.0),
        CorrectionDecision::HardSeek { .. }
    ));
}

#[test]
fn test_cooldown_suppresses_even_large_gaps() {
    let corrector = DriftCorrector::new();
    let now = 100_000.0;
    let recent = Some(now - 100.0);
    assert_eq!(
        corrector.decide(50.0, &target(102.0), true, false, recent, now),
        CorrectionDecision::NoOp
    );
}

#[test]
fn test_elapsed_cooldown_allows_corrections() {
    let corrector = DriftCorrector::new();
    let now = 100_000.0;
    let old = Some(now - 400.0);
    assert!(matches!(
        corrector.decide(50.0, &target(102.0), true, false, old, now),
        CorrectionDecision::HardSeek { .. }
    ));
}

#[test]
fn test_settling_seek_suppresses_corrections() {
    let corrector = DriftCorrector::new();
    assert_eq!(
        corrector.decide(50.0, &target(102.0), true, true, None, 100_000.0),
        CorrectionDecision::NoOp
    );
}

#[test]
fn test_invalid_positions_decide_nothing() {
    let corrector = DriftCorrector::new();
    assert_eq!(
        decide_fresh(&corrector, f64::NAN, 102.0),
        CorrectionDecision::NoOp
    );
    assert_eq!(
        decide_fresh(&corrector, -3.0, 102.0),
        CorrectionDecision::NoOp
    );
    assert_eq!(
        decide_fresh(&corrector, 100.0, f64::NAN),
        CorrectionDecision::NoOp
    );
}

#[test]
fn test_nudge_duration_scales_with_gap() {
    let corrector = DriftCorrector::new();
    let short = match decide_fresh(&corrector, 101.7, 102.0) {
        CorrectionDecision::SoftNudge { duration, .. } => duration,
        other => panic!("expected soft nudge, got {:?}", other),
    };
    let long = match decide_fresh(&corrector, 101.2, 102.0) {
        CorrectionDecision::SoftNudge { duration, .. } => duration,
        other => panic!("expected soft nudge, got {:?}", other),
    };
    assert_eq!(short, Duration::from_millis(300));
    assert_eq!(long, Duration::from_millis(800));
}

#[test]
fn test_nudge_duration_floor() {
    let corrector = DriftCorrector::new();
    match decide_fresh(&corrector, 101.85, 102.0) {
        CorrectionDecision::SoftNudge { duration, .. } => {
            assert_eq!(duration, Duration::from_millis(200));
        }
        other => panic!("expected soft nudge, got {:?}", other),
    }
}

#[test]
fn test_nudge_rate_scales_with_gap() {
    let corrector = DriftCorrector::new();
    let gentle = match decide_fresh(&corrector, 101.8, 102.0) {
        CorrectionDecision::SoftNudge { rate, .. } => rate,
        other => panic!("expected soft nudge, got {:?}", other),
    };
    let firm = match decide_fresh(&corrector, 101.0, 102.0) {
        CorrectionDecision::SoftNudge { rate, .. } => rate,
        other => panic!("expected soft nudge, got {:?}", other),
    };
    assert!(gentle < firm);
    assert!((firm - 1.15).abs() < 1e-9);
}

#[test]
fn test_nudge_rate_floor() {
    let corrector = DriftCorrector::new();
    match decide_fresh(&corrector, 101.89, 102.0) {
        CorrectionDecision::SoftNudge { rate, .. } => {
            assert!((rate - 1.02).abs() < 1e-9);
        }
        other => panic!("expected soft nudge, got {:?}", other),
    }
}

#[test]
fn test_custom_thresholds() {
    let corrector = DriftCorrector::new().with_thresholds(0.5, 3.0);
    assert_eq!(
        decide_fresh(&corrector, 101.6, 102.0),
        CorrectionDecision::NoOp
    );
    assert!(matches!(
        decide_fresh(&corrector, 100.0, 102.0),
        CorrectionDecision::SoftNudge { .. }
    ));
    assert!(matches!(
        decide_fresh(&corrector, 98.0, 102.0),
        CorrectionDecision::HardSeek { .. }
    ));
}
