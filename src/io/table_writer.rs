//! CSV export of detection results.
//!
//! Missing values (NaN) are written as empty fields. Timestamps use RFC 3339.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::metrics::{DetectionOutput, PulseRecord, SubpulseRecord};

/// Error type for table output.
#[derive(Debug, Error)]
pub enum TableWriteError {
    /// IO error writing file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Series lengths disagree with the time axis
    #[error("Length mismatch: {0}")]
    LengthMismatch(String),
}

fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{:.6}", v)
    }
}

/// Write the pulse table.
pub fn write_pulse_table<W: Write>(out: &mut W, pulses: &[PulseRecord]) -> Result<(), TableWriteError> {
    writeln!(
        out,
        "pulse_id,start,end,start_time,end_time,n_subpulses,dch,drop,min_temp,duration_seconds"
    )?;
    for p in pulses {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            p.pulse_id,
            p.start,
            p.end,
            p.start_time.to_rfc3339(),
            p.end_time.to_rfc3339(),
            p.n_subpulses,
            fmt_value(p.dch),
            fmt_value(p.drop),
            fmt_value(p.min_temp),
            p.duration_seconds
        )?;
    }
    Ok(())
}

/// Write the subpulse table.
pub fn write_subpulse_table<W: Write>(
    out: &mut W,
    subpulses: &[SubpulseRecord],
) -> Result<(), TableWriteError> {
    writeln!(
        out,
        "pulse_id,pulse_start,pulse_end,start,end,dch,drop,min_temp,duration"
    )?;
    for s in subpulses {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            s.pulse_id,
            s.pulse_start,
            s.pulse_end,
            s.start,
            s.end,
            fmt_value(s.dch),
            fmt_value(s.drop),
            fmt_value(s.min_temp),
            s.duration
        )?;
    }
    Ok(())
}

/// Write φ and the annotated pulse series, one row per timestep.
pub fn write_series_csv<W: Write>(out: &mut W, output: &DetectionOutput) -> Result<(), TableWriteError> {
    let times = output.grid.times();
    let series = &output.series;
    let n = times.len();
    for (name, len) in [
        ("phi", output.phi.len()),
        ("dch", series.dch.len()),
        ("pulse_temperature", series.pulse_temperature.len()),
        ("drop", series.drop.len()),
        ("min_temperature", series.min_temperature.len()),
    ] {
        if len != n {
            return Err(TableWriteError::LengthMismatch(format!(
                "{} has {} values for {} timesteps",
                name, len, n
            )));
        }
    }

    let reference = output.grid.row(output.reference);
    writeln!(
        out,
        "time,phi,reference_temperature,dch,pulse_temperature,drop,min_temperature"
    )?;
    for t in 0..n {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            times[t].to_rfc3339(),
            fmt_value(output.phi[t]),
            fmt_value(reference[t]),
            fmt_value(series.dch[t]),
            fmt_value(series.pulse_temperature[t]),
            fmt_value(series.drop[t]),
            fmt_value(series.min_temperature[t])
        )?;
    }
    Ok(())
}

fn write_file<F>(path: &Path, body: F) -> Result<(), TableWriteError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), TableWriteError>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    body(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write `<name>_pulse_stats.csv`, `<name>_subpulse_stats.csv` and
/// `<name>_series.csv` into `dir` (created if needed).
///
/// Returns the written paths in that order.
pub fn write_detection_tables(
    dir: &Path,
    name: &str,
    output: &DetectionOutput,
) -> Result<Vec<PathBuf>, TableWriteError> {
    fs::create_dir_all(dir)?;

    let pulse_path = dir.join(format!("{}_pulse_stats.csv", name));
    let subpulse_path = dir.join(format!("{}_subpulse_stats.csv", name));
    let series_path = dir.join(format!("{}_series.csv", name));

    write_file(&pulse_path, |w| write_pulse_table(w, &output.pulses))?;
    write_file(&subpulse_path, |w| write_subpulse_table(w, &output.subpulses))?;
    write_file(&series_path, |w| write_series_csv(w, output))?;

    info!(
        "Wrote {} pulses and {} subpulses to {}",
        output.pulses.len(),
        output.subpulses.len(),
        dir.display()
    );
    Ok(vec![pulse_path, subpulse_path, series_path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pulse() -> PulseRecord {
        let t0 = Utc.with_ymd_and_hms(2021, 2, 3, 4, 0, 0).unwrap();
        PulseRecord {
            pulse_id: 0,
            start: 3,
            end: 9,
            start_time: t0,
            end_time: t0 + chrono::Duration::hours(1),
            n_subpulses: 2,
            dch: 1.25,
            drop: -0.5,
            min_temp: 21.0,
            duration_seconds: 3600.0,
        }
    }

    #[test]
    fn test_pulse_table_layout() {
        let mut buf = Vec::new();
        write_pulse_table(&mut buf, &[pulse()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("pulse_id,start,end"));
        assert!(lines[1].starts_with("0,3,9,2021-02-03T04:00:00+00:00"));
        assert!(lines[1].contains(",1.250000,-0.500000,21.000000,3600"));
    }

    #[test]
    fn test_subpulse_table_nan_is_empty() {
        let row = SubpulseRecord {
            pulse_id: 1,
            pulse_start: 0,
            pulse_end: 4,
            start: 0,
            end: 4,
            dch: 0.0,
            drop: f64::NAN,
            min_temp: 20.0,
            duration: 4,
        };
        let mut buf = Vec::new();
        write_subpulse_table(&mut buf, &[row]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().nth(1), Some("1,0,4,0,4,0.000000,,20.000000,4"));
    }

    #[test]
    fn test_empty_tables_have_header_only() {
        let mut buf = Vec::new();
        write_pulse_table(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }
}
