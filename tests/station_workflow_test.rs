//! Integration tests for the file-based workflow.
//!
//! Station directory and configuration file in, pulse tables out, with both
//! fixed and climatology thresholds.

use std::fs;
use std::path::Path;

use approx::assert_relative_eq;
use chrono::{Duration, TimeZone, Utc};
use coldpulse_rs::config::read_config_file;
use coldpulse_rs::io::{read_station_directory, write_detection_tables};
use coldpulse_rs::{
    ClimatologySource, LogProgress, PulseDetector, ReferenceClimatology, StationInfo,
    ThresholdSource,
};
use ndarray::Array4;
use tempfile::tempdir;

const N_SAMPLES: usize = 100;

fn bottom_event(t: usize) -> f64 {
    let distance = (t as f64 - 44.0).abs();
    if distance < 4.0 {
        23.5 - 0.5 * (4.0 - distance)
    } else {
        23.5
    }
}

/// Write one CSV per depth for station `ST01` at 166.45E, 22.30S.
fn write_station(dir: &Path) {
    let t0 = Utc.with_ymd_and_hms(2019, 2, 1, 0, 0, 0).unwrap();
    let layers: [(f64, fn(usize) -> f64); 3] =
        [(2.0, |_| 24.0), (10.0, |_| 23.8), (20.0, bottom_event)];
    for (depth, temperature) in layers {
        let mut body = String::from("time,temperature\n");
        for i in 0..N_SAMPLES {
            let time = t0 + Duration::minutes(10 * i as i64);
            body.push_str(&format!(
                "{},{:.3}\n",
                time.format("%Y-%m-%d %H:%M:%S"),
                temperature(i)
            ));
        }
        fs::write(dir.join(format!("ST01_166.45_-22.30_{}_.csv", depth)), body).unwrap();
    }
}

#[test]
fn test_config_and_directory_to_tables() {
    let _ = env_logger::builder().is_test(true).try_init();
    let data = tempdir().unwrap();
    write_station(data.path());

    let config_path = data.path().join("detection.cfg");
    fs::write(
        &config_path,
        "# bottom pulses, fixed threshold\nkind: bot\nthreshold: -2.0\nmin_stsi: off\n",
    )
    .unwrap();
    let config = read_config_file(&config_path).unwrap();
    assert_eq!(config.threshold, ThresholdSource::Fixed(-2.0));

    let grid = read_station_directory(data.path()).unwrap();
    assert_eq!(grid.depths(), &[2.0, 10.0, 20.0]);
    assert_eq!(grid.n_times(), N_SAMPLES);
    assert_eq!(grid.station().unwrap().location_id, "ST01");

    let output = PulseDetector::new(config)
        .with_observer(LogProgress::new("ST01"))
        .run(&grid, None)
        .unwrap();
    assert_eq!(output.n_pulses(), 1);
    assert_relative_eq!(output.pulses[0].dch, 4.0 / 3.0, epsilon = 1e-9);

    let out_dir = data.path().join("results");
    let written = write_detection_tables(&out_dir, "ST01_bot", &output).unwrap();
    assert_eq!(written.len(), 3);
    assert!(written[0].ends_with("ST01_bot_pulse_stats.csv"));
    assert!(written[1].ends_with("ST01_bot_subpulse_stats.csv"));

    let pulses = fs::read_to_string(&written[0]).unwrap();
    assert_eq!(pulses.lines().count(), 2);
    assert!(pulses.lines().nth(1).unwrap().starts_with("0,40,48,"));

    let series = fs::read_to_string(&written[2]).unwrap();
    assert_eq!(series.lines().count(), N_SAMPLES + 1);
}

/// Two monthly profiles, linear in depth: −0.1 °C/m and −0.05 °C/m.
fn linear_climatology() -> ReferenceClimatology {
    let levels = vec![0.0, 10.0, 20.0, 30.0];
    let mut temperature = Array4::zeros((2, 4, 2, 2));
    for (k, &z) in levels.iter().enumerate() {
        for j in 0..2 {
            for i in 0..2 {
                temperature[[0, k, j, i]] = 25.0 - 0.1 * z;
                temperature[[1, k, j, i]] = 24.0 - 0.05 * z;
            }
        }
    }
    ReferenceClimatology::new(vec![166.0, 167.0], vec![-23.0, -22.0], levels, temperature)
        .unwrap()
}

#[test]
fn test_climatology_threshold_from_station_position() {
    let data = tempdir().unwrap();
    write_station(data.path());
    let grid = read_station_directory(data.path()).unwrap();

    let config_path = data.path().join("detection.cfg");
    fs::write(&config_path, "threshold: climatology\nmin_stsi: none\n").unwrap();
    let config = read_config_file(&config_path).unwrap();
    assert_eq!(config.threshold, ThresholdSource::Climatology { position: None });

    let climatology = linear_climatology();
    let source: &dyn ClimatologySource = &climatology;
    let output = PulseDetector::new(config).run(&grid, Some(source)).unwrap();

    // φ of a linear profile is −gradient · var(depths), var([2, 10, 20]) = 488/9
    let var = 488.0 / 9.0;
    let (a, b) = (-0.1 * var, -0.05 * var);
    let mean = 0.5 * (a + b);
    let std = 0.5 * (b - a);
    let estimate = output.threshold.as_ref().unwrap();
    assert_relative_eq!(estimate.mean, mean, epsilon = 1e-9);
    assert_relative_eq!(estimate.std, std, epsilon = 1e-9);
    assert_relative_eq!(estimate.value, mean - std, epsilon = 1e-9);
    assert_eq!(estimate.reference_cell, Some((166.0, -22.0)));
    assert!(!estimate.low_confidence);

    assert_eq!(output.n_pulses(), 1);
    assert_eq!((output.pulses[0].start, output.pulses[0].end), (41, 48));
}

#[test]
fn test_far_station_is_low_confidence() {
    let data = tempdir().unwrap();
    write_station(data.path());
    let grid = read_station_directory(data.path())
        .unwrap()
        .with_station(StationInfo::new("FAR", 170.0, -15.0));

    let config = coldpulse_rs::DetectionConfig::builder()
        .with_station_climatology_threshold()
        .with_min_stsi(None)
        .build()
        .unwrap();
    let climatology = linear_climatology();
    let output = PulseDetector::new(config)
        .run(&grid, Some(&climatology))
        .unwrap();
    let estimate = output.threshold.unwrap();
    assert!(estimate.low_confidence);
    assert!(estimate.distance_km.unwrap() > 100.0);
}
