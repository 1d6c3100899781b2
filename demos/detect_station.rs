//! Station Cold-Pulse Detection Example
//!
//! Reads a station directory of per-depth CSV files, runs bottom- or
//! top-pulse detection and writes the pulse and subpulse tables.
//!
//! This example:
//! 1. Loads the detection settings from a `key: value` configuration file
//!    (defaults when none is given)
//! 2. Assembles the depth series onto a common time grid
//! 3. Runs detection with progress logging
//! 4. Writes `<station>_<kind>_pulse_stats.csv`, `_subpulse_stats.csv` and
//!    `_series.csv`
//!
//! With the `netcdf` feature a reference climatology file can be given for
//! `threshold: climatology`.
//!
//! ## Run
//!
//! ```bash
//! RUST_LOG=info cargo run --release --example detect_station -- data/BOU results detection.cfg
//! RUST_LOG=info cargo run --release --features netcdf --example detect_station -- \
//!     data/BOU results detection.cfg reference_temperature.nc
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};

use coldpulse_rs::config::read_config_file;
use coldpulse_rs::io::{read_station_directory, write_detection_tables};
use coldpulse_rs::{ClimatologySource, DetectionConfig, LogProgress, PulseDetector};

fn usage() -> ! {
    eprintln!("usage: detect_station <station_dir> <output_dir> [config_file] [climatology.nc]");
    std::process::exit(2);
}

#[cfg(feature = "netcdf")]
fn load_climatology(path: Option<&Path>) -> Result<Option<Box<dyn ClimatologySource>>, Box<dyn Error>> {
    match path {
        Some(p) => {
            let source = coldpulse_rs::io::NetCDFClimatology::open(p)?;
            Ok(Some(Box::new(source)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "netcdf"))]
fn load_climatology(path: Option<&Path>) -> Result<Option<Box<dyn ClimatologySource>>, Box<dyn Error>> {
    if path.is_some() {
        return Err("reading a climatology file needs the `netcdf` feature".into());
    }
    Ok(None)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        usage();
    }
    let station_dir = PathBuf::from(&args[0]);
    let output_dir = PathBuf::from(&args[1]);

    let config = match args.get(2) {
        Some(path) => read_config_file(Path::new(path))?,
        None => DetectionConfig::default(),
    };
    let climatology = load_climatology(args.get(3).map(Path::new))?;

    println!("Cold-pulse detection");
    println!("====================");
    println!("  Station directory: {}", station_dir.display());
    println!("  Pulse kind:        {}", config.kind);
    println!("  Threshold:         {:?}", config.threshold);
    println!();

    let grid = read_station_directory(&station_dir)?;
    let name = grid
        .station()
        .map(|s| s.location_id.clone())
        .unwrap_or_else(|| "station".to_string());
    println!(
        "  Loaded {} depths × {} samples (dt = {:.0} s)",
        grid.n_depths(),
        grid.n_times(),
        grid.dt_seconds()
    );

    let kind = config.kind;
    let output = PulseDetector::new(config)
        .with_observer(LogProgress::new(&name))
        .run(&grid, climatology.as_deref())?;

    println!();
    println!("  {}", output.summary_line());
    for pulse in &output.pulses {
        println!(
            "    #{:<3} {} → {}  {} subpulses  DCH {:>7.3} °C·h  drop {:>6.2} °C",
            pulse.pulse_id,
            pulse.start_time.format("%Y-%m-%d %H:%M"),
            pulse.end_time.format("%Y-%m-%d %H:%M"),
            pulse.n_subpulses,
            pulse.dch,
            pulse.drop
        );
    }

    let written = write_detection_tables(&output_dir, &format!("{}_{}", name, kind), &output)?;
    println!();
    for path in written {
        println!("  Wrote {}", path.display());
    }
    Ok(())
}
