//! Integration tests for the detection pipeline.
//!
//! Runs the full pipeline on synthetic three-depth stations with known
//! cooling events.

use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use coldpulse_rs::detection::{merge_overlaps, subpulse_boundaries};
use coldpulse_rs::{
    CandidateStrategy, DetectionConfig, DetectionError, DurationLimit, IntervalSet,
    ProgressObserver, PulseDetector, PulseKind, Stage, TemperatureGrid,
};
use ndarray::Array2;

const DEPTHS: [f64; 3] = [2.0, 10.0, 20.0];
const N_SAMPLES: usize = 100;
const DT_MINUTES: i64 = 10;

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 2, 1, 0, 0, 0).unwrap()
}

/// Bottom temperature: 23.5 °C with a V-shaped 2 °C cooling centred on t = 44.
fn v_shaped_event() -> Vec<f64> {
    (0..N_SAMPLES)
        .map(|t| {
            let distance = (t as f64 - 44.0).abs();
            if distance < 4.0 {
                23.5 - 0.5 * (4.0 - distance)
            } else {
                23.5
            }
        })
        .collect()
}

/// Grid with `cold` at the reference end and warmer, steady layers elsewhere.
fn station_grid(cold: &[f64], kind: PulseKind) -> TemperatureGrid {
    let n = cold.len();
    let times = (0..n)
        .map(|i| start_time() + Duration::minutes(DT_MINUTES * i as i64))
        .collect();
    let mut values = Array2::from_elem((3, n), 23.8);
    let (cold_row, warm_row) = match kind {
        PulseKind::Bot => (2, 0),
        PulseKind::Top => (0, 2),
    };
    for (t, &v) in cold.iter().enumerate() {
        values[[cold_row, t]] = v;
        values[[warm_row, t]] = 24.0;
    }
    TemperatureGrid::new(DEPTHS.to_vec(), times, values).unwrap()
}

#[test]
fn test_single_bottom_pulse_metrics() {
    let _ = env_logger::builder().is_test(true).try_init();
    let grid = station_grid(&v_shaped_event(), PulseKind::Bot);
    let config = DetectionConfig::unfiltered(PulseKind::Bot, -2.0);
    let output = PulseDetector::new(config).run(&grid, None).unwrap();

    assert_eq!(output.n_pulses(), 1);
    let pulse = &output.pulses[0];
    // Starts on the last 23.5 °C sample before cooling, ends once 23.5 °C returns
    assert_eq!((pulse.start, pulse.end), (40, 48));
    assert_eq!(pulse.n_subpulses, 1);
    // Deficits 0, 0.5, 1, 1.5, 2, 1.5, 1, 0.5 over 10-minute steps
    assert_relative_eq!(pulse.dch, 4.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(pulse.drop, -2.0, epsilon = 1e-12);
    assert_relative_eq!(pulse.min_temp, 21.5, epsilon = 1e-12);
    assert_relative_eq!(pulse.duration_seconds, 8.0 * 600.0);
    assert_eq!(pulse.start_time, start_time() + Duration::minutes(400));

    assert_relative_eq!(output.reference_depth(), 20.0);
    assert_relative_eq!(output.threshold.as_ref().unwrap().value, -2.0);
    assert_relative_eq!(output.series.dch[44], 1.0 / 3.0, epsilon = 1e-12);
    assert!(output.series.dch[48].is_nan());
}

#[test]
fn test_default_filters_keep_clear_pulse() {
    let grid = station_grid(&v_shaped_event(), PulseKind::Bot);
    let config = DetectionConfig::builder()
        .with_fixed_threshold(-2.0)
        .build()
        .unwrap();
    let output = PulseDetector::new(config).run(&grid, None).unwrap();

    assert_eq!(output.n_pulses(), 1);
    assert_eq!((output.pulses[0].start, output.pulses[0].end), (40, 48));
    assert_relative_eq!(output.total_dch(), 4.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn test_no_cooling_gives_empty_tables() {
    let grid = station_grid(&[23.5; N_SAMPLES], PulseKind::Bot);
    let config = DetectionConfig::unfiltered(PulseKind::Bot, -2.0);
    let output = PulseDetector::new(config).run(&grid, None).unwrap();

    assert!(output.is_empty());
    assert!(output.subpulses.is_empty());
    assert_eq!(output.series.dch.len(), N_SAMPLES);
    assert!(output.series.dch.iter().all(|v| v.is_nan()));

    // A stable stratification passes a zero threshold but never drops
    let output = PulseDetector::new(DetectionConfig::default())
        .run(&grid, None)
        .unwrap();
    assert!(output.is_empty());
}

#[test]
fn test_top_pulse_mirrors_bottom_pulse() {
    let event = v_shaped_event();
    let bot = PulseDetector::new(DetectionConfig::unfiltered(PulseKind::Bot, -2.0))
        .run(&station_grid(&event, PulseKind::Bot), None)
        .unwrap();
    let top = PulseDetector::new(DetectionConfig::unfiltered(PulseKind::Top, -2.0))
        .run(&station_grid(&event, PulseKind::Top), None)
        .unwrap();

    assert_relative_eq!(top.reference_depth(), 2.0);
    assert_eq!(top.n_pulses(), bot.n_pulses());
    for (a, b) in top.pulses.iter().zip(&bot.pulses) {
        assert_eq!((a.start, a.end), (b.start, b.end));
        assert_relative_eq!(a.dch, b.dch, epsilon = 1e-12);
        assert_relative_eq!(a.drop, b.drop, epsilon = 1e-12);
    }
}

/// Several Gaussian coolings with a semidiurnal-like wobble.
fn multi_event_series(n: usize) -> Vec<f64> {
    let centres = [60.0, 180.0, 310.0];
    (0..n)
        .map(|t| {
            let t = t as f64;
            let cooling: f64 = centres
                .iter()
                .map(|c| 2.5 * (-((t - c) / 12.0).powi(2)).exp())
                .sum();
            23.5 - cooling + 0.1 * (t * std::f64::consts::TAU / 12.0).sin()
        })
        .collect()
}

#[test]
fn test_pulse_tables_are_consistent() {
    let grid = station_grid(&multi_event_series(400), PulseKind::Bot);
    let config = DetectionConfig::unfiltered(PulseKind::Bot, -2.0);
    let output = PulseDetector::new(config).run(&grid, None).unwrap();
    assert!(!output.is_empty());

    for pair in output.pulses.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
    for pulse in &output.pulses {
        assert!(pulse.start < pulse.end);
        assert!(pulse.dch >= 0.0);
        assert!(pulse.drop <= 0.0);

        // Subpulses tile the pulse exactly
        let subs: Vec<_> = output.subpulses_of(pulse.pulse_id).collect();
        assert_eq!(subs.len(), pulse.n_subpulses);
        assert_eq!(subs[0].start, pulse.start);
        assert_eq!(subs[subs.len() - 1].end, pulse.end);
        for pair in subs.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let dch: f64 = subs.iter().map(|s| s.dch).sum();
        assert_relative_eq!(dch, pulse.dch, epsilon = 1e-9);
        assert!(subs.iter().all(|s| s.dch >= 0.0 && s.drop <= 0.0));
    }
}

#[test]
fn test_subpulse_boundaries_cover_interval() {
    let temps = multi_event_series(400);
    let bounds = subpulse_boundaries(&temps, 150, 210);
    assert_eq!(bounds[0], 150);
    assert_eq!(bounds[bounds.len() - 1], 210);
    assert!(bounds.windows(2).all(|w| w[0] < w[1]));
    assert!(bounds.len() > 2);
}

#[test]
fn test_merge_is_order_independent() {
    let a = IntervalSet::from_pairs(&[(2, 6), (5, 9), (20, 25), (24, 30)]).unwrap();
    let b = IntervalSet::from_pairs(&[(24, 30), (5, 9), (20, 25), (2, 6)]).unwrap();
    let merged = merge_overlaps(&a, 40);
    assert_eq!(merged, merge_overlaps(&b, 40));
    assert_eq!(merged, IntervalSet::from_pairs(&[(2, 9), (20, 30)]).unwrap());
    assert_eq!(merge_overlaps(&merged, 40), merged);
}

#[test]
fn test_missing_column_blanks_detection() {
    let mut event = v_shaped_event();
    event[44] = f64::NAN;
    let grid = station_grid(&event, PulseKind::Bot);
    let config = DetectionConfig::unfiltered(PulseKind::Bot, -2.0);
    let output = PulseDetector::new(config).run(&grid, None).unwrap();

    assert!(output.phi[44].is_nan());
    assert!(output.grid.values().column(44).iter().all(|v| v.is_nan()));
}

#[test]
fn test_invalid_reference_depth() {
    let grid = station_grid(&v_shaped_event(), PulseKind::Bot);
    let config = DetectionConfig::builder()
        .with_reference_depth(15.0)
        .build()
        .unwrap();
    let err = PulseDetector::new(config).run(&grid, None).unwrap_err();
    assert!(matches!(err, DetectionError::InvalidConfiguration(_)));
}

#[test]
fn test_crossed_duration_bounds_in_mixed_units() {
    let grid = station_grid(&v_shaped_event(), PulseKind::Bot);
    // 120 minutes is 12 samples at 10-minute sampling
    let config = DetectionConfig::builder()
        .with_fixed_threshold(-2.0)
        .with_min_duration(Some(DurationLimit::Minutes(120.0)))
        .with_max_duration(Some(DurationLimit::Samples(5)))
        .build()
        .unwrap();
    let err = PulseDetector::new(config).run(&grid, None).unwrap_err();
    assert!(matches!(err, DetectionError::InvalidConfiguration(_)));
}

#[test]
fn test_climatology_threshold_without_source() {
    let grid = station_grid(&v_shaped_event(), PulseKind::Bot);
    let config = DetectionConfig::builder()
        .with_climatology_threshold(166.4, -22.3)
        .build()
        .unwrap();
    let err = PulseDetector::new(config).run(&grid, None).unwrap_err();
    assert!(matches!(err, DetectionError::ResourceUnavailable(_)));
}

#[test]
fn test_baseline_strategy_needs_long_record() {
    let grid = station_grid(&v_shaped_event(), PulseKind::Bot);
    let config = DetectionConfig::builder()
        .with_candidate_strategy(CandidateStrategy::BaselineAnomaly)
        .build()
        .unwrap();
    let err = PulseDetector::new(config).run(&grid, None).unwrap_err();
    assert!(matches!(err, DetectionError::InsufficientData(_)));
}

/// 70 days of 10-minute data. The bottom (23.5 °C) sits under a colder
/// 23.2 °C layer except during one V-shaped cooling centred on `centre`.
fn seasonal_record_with_event(centre: usize) -> TemperatureGrid {
    let n = 70 * 144;
    let times = (0..n)
        .map(|i| start_time() + Duration::minutes(DT_MINUTES * i as i64))
        .collect();
    let mut values = Array2::zeros((3, n));
    for t in 0..n {
        let distance = (t as f64 - centre as f64).abs();
        values[[0, t]] = 24.0;
        values[[1, t]] = 23.2;
        values[[2, t]] = if distance < 4.0 {
            23.5 - 0.5 * (4.0 - distance)
        } else {
            23.5
        };
    }
    TemperatureGrid::new(DEPTHS.to_vec(), times, values).unwrap()
}

#[test]
fn test_baseline_anomaly_finds_event() {
    let centre = 35 * 144 + 44;
    let grid = seasonal_record_with_event(centre);
    let config = DetectionConfig::builder()
        .with_candidate_strategy(CandidateStrategy::BaselineAnomaly)
        .build()
        .unwrap();
    let mut recorder = RecordingObserver::default();
    let output = PulseDetector::new(config)
        .with_observer(&mut recorder)
        .run(&grid, None)
        .unwrap();

    // The baseline is built while the threshold stage is reported
    let stages: Vec<Stage> = recorder.stages.iter().map(|(s, _)| *s).collect();
    let threshold_at = stages.iter().position(|s| *s == Stage::Threshold).unwrap();
    let candidates_at = stages.iter().position(|s| *s == Stage::Candidates).unwrap();
    assert!(threshold_at < candidates_at);

    assert!(output.threshold.is_none());
    assert_eq!(output.n_pulses(), 1);
    let pulse = &output.pulses[0];
    assert_eq!((pulse.start, pulse.end), (centre - 4, centre + 4));
    assert_eq!(pulse.n_subpulses, 1);
    assert_relative_eq!(pulse.dch, 4.0 / 3.0, epsilon = 1e-9);
    assert_relative_eq!(pulse.drop, -2.0, epsilon = 1e-12);
    assert_relative_eq!(pulse.min_temp, 21.5, epsilon = 1e-12);
}

#[derive(Default)]
struct RecordingObserver {
    stages: Vec<(Stage, f64)>,
}

impl ProgressObserver for RecordingObserver {
    fn on_stage(&mut self, stage: Stage, fraction: f64) {
        self.stages.push((stage, fraction));
    }
}

#[test]
fn test_observer_sees_every_stage_in_order() {
    let grid = station_grid(&v_shaped_event(), PulseKind::Bot);
    let mut recorder = RecordingObserver::default();
    let output = PulseDetector::new(DetectionConfig::unfiltered(PulseKind::Bot, -2.0))
        .with_observer(&mut recorder)
        .run(&grid, None)
        .unwrap();
    assert_eq!(output.n_pulses(), 1);

    let stages: Vec<Stage> = recorder.stages.iter().map(|(s, _)| *s).collect();
    assert_eq!(stages.first(), Some(&Stage::Preparing));
    assert_eq!(stages.last(), Some(&Stage::Done));
    assert!(stages.contains(&Stage::Candidates));
    assert!(stages.contains(&Stage::Metrics));
    assert!(recorder.stages.windows(2).all(|w| w[0].1 < w[1].1));
    assert_relative_eq!(recorder.stages.last().unwrap().1, 1.0);
}
