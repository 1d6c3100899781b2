//! I/O utilities for reading station records and writing detection results.
//!
//! This module provides:
//! - **Station records**: one CSV file per logger depth, assembled onto a
//!   common time grid
//! - **Result tables**: pulse and subpulse statistics and annotated series
//!   as CSV
//! - **NetCDF I/O**: CF-style result output and reference climatology input
//!   (requires `netcdf` feature)
//!
//! # File Formats
//!
//! ## Station Files
//!
//! ```text
//! # BOU_166.45_-22.30_25_.csv
//! time,temperature
//! 2019-01-01T00:00:00Z,24.31
//! 2019-01-01T00:10:00Z,24.29
//! ```
//!
//! ## Pulse Tables
//!
//! ```text
//! pulse_id,start,end,start_time,end_time,n_subpulses,dch,drop,min_temp,duration_seconds
//! 0,412,530,2019-01-03T20:40:00+00:00,2019-01-04T16:20:00+00:00,2,3.118000,-1.420000,22.870000,70800
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use coldpulse_rs::io::{read_station_directory, write_detection_tables};
//!
//! let grid = read_station_directory(Path::new("data/BOU"))?;
//! let output = detector.run(&grid, None)?;
//! write_detection_tables(Path::new("results"), "BOU_bot", &output)?;
//! ```

#[cfg(feature = "netcdf")]
mod netcdf_io;
mod station_reader;
mod table_writer;

#[cfg(feature = "netcdf")]
pub use netcdf_io::{
    is_valid_f64, read_climatology, write_detection_netcdf, NetCDFClimatology, NetCDFError,
    NetCDFWriterConfig, FILL_VALUE_F64,
};
pub use station_reader::{
    assemble_grid, parse_station_csv, parse_station_file_name, parse_timestamp,
    read_station_directory, read_station_file, StationFileError, StationFileName, StationSeries,
};
pub use table_writer::{
    write_detection_tables, write_pulse_table, write_series_csv, write_subpulse_table,
    TableWriteError,
};
