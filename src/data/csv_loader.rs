//! CSV loading and cleaning for historical race results
//!
//! Required columns: driver, constructor, circuit, grid, position. A weather
//! column is used when present; otherwise every row defaults to Dry and rows
//! on wet-prone circuits are re-drawn from a fixed distribution. That draw is
//! the only randomness in cleaning and comes from the shared seeded context.

use polars::prelude::*;
use std::path::Path;

use crate::data::tables::{WET_PRONE_CIRCUITS, WET_PRONE_WEATHER};
use crate::error::PipelineError;
use crate::models::{RaceRecord, Weather};
use crate::sampling::RandomContext;
use tracing::info;

/// Columns that must be present in the input schema
pub const REQUIRED_COLUMNS: &[&str] = &["driver", "constructor", "circuit", "grid", "position"];

/// Summary of one cleaning pass
#[derive(Debug, Clone)]
pub struct CleaningReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    /// True when the input had no weather column and defaults were assigned
    pub weather_synthesized: bool,
}

/// Load, validate and clean a tabular race-results file
///
/// Rows missing identity fields, with grid < 1, or with a finishing position
/// outside 1..=20 are dropped, never coerced.
pub fn load_race_records(
    path: &Path,
    ctx: &mut RandomContext,
) -> Result<(Vec<RaceRecord>, CleaningReport), PipelineError> {
    if !path.exists() {
        return Err(PipelineError::DataSource(path.display().to_string()));
    }

    let df = CsvReadOptions::default()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    for col in REQUIRED_COLUMNS {
        if df.column(col).is_err() {
            return Err(PipelineError::Schema((*col).to_string()));
        }
    }

    let driver_col = df.column("driver")?.cast(&DataType::String)?;
    let constructor_col = df.column("constructor")?.cast(&DataType::String)?;
    let circuit_col = df.column("circuit")?.cast(&DataType::String)?;
    // Non-strict cast mirrors numeric coercion: unparseable cells become null
    // and the row is dropped below.
    let grid_col = df.column("grid")?.cast(&DataType::Int64)?;
    let position_col = df.column("position")?.cast(&DataType::Int64)?;

    let drivers = driver_col.str()?;
    let constructors = constructor_col.str()?;
    let circuits = circuit_col.str()?;
    let grids = grid_col.i64()?;
    let positions = position_col.i64()?;

    let weather_present = df.column("weather").is_ok();
    let weather_col = if weather_present {
        Some(df.column("weather")?.cast(&DataType::String)?)
    } else {
        None
    };
    let weathers = match &weather_col {
        Some(col) => Some(col.str()?),
        None => None,
    };

    let season_col = if df.column("season").is_ok() {
        Some(df.column("season")?.cast(&DataType::Int64)?)
    } else {
        None
    };
    let seasons = match &season_col {
        Some(col) => Some(col.i64()?),
        None => None,
    };

    let total_rows = df.height();
    let mut records = Vec::with_capacity(total_rows);

    for i in 0..total_rows {
        let (driver, constructor, circuit) =
            match (drivers.get(i), constructors.get(i), circuits.get(i)) {
                (Some(d), Some(co), Some(ci)) if !d.is_empty() && !co.is_empty() && !ci.is_empty() => {
                    (d, co, ci)
                }
                _ => continue,
            };

        let grid = match grids.get(i) {
            Some(g) if g > 0 => g as u32,
            _ => continue,
        };
        let position = match positions.get(i) {
            Some(p) if (1..=20).contains(&p) => p as u32,
            _ => continue,
        };

        let weather = match weathers {
            Some(col) => match col.get(i).and_then(Weather::parse) {
                Some(w) => w,
                None => continue,
            },
            // Default Dry; wet-prone circuits get a seeded re-draw.
            None => {
                if WET_PRONE_CIRCUITS.contains(&circuit) {
                    *ctx.choose_weighted(WET_PRONE_WEATHER)
                } else {
                    Weather::Dry
                }
            }
        };

        let season = seasons.and_then(|col| col.get(i)).map(|s| s as u32);

        records.push(RaceRecord {
            driver: driver.to_string(),
            constructor: constructor.to_string(),
            circuit: circuit.to_string(),
            grid,
            position,
            weather,
            season,
        });
    }

    let report = CleaningReport {
        total_rows,
        kept_rows: records.len(),
        weather_synthesized: !weather_present,
    };
    info!(
        total = report.total_rows,
        kept = report.kept_rows,
        weather_synthesized = report.weather_synthesized,
        "cleaned race results"
    );

    Ok((records, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_missing_file_is_data_source_error() {
        let mut ctx = RandomContext::from_seed(1);
        let err = load_race_records(Path::new("/nonexistent/results.csv"), &mut ctx).unwrap_err();
        assert!(matches!(err, PipelineError::DataSource(_)));
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "bad.csv",
            "driver,constructor,circuit,grid\nA,X,Monza Circuit,1\n",
        );
        let mut ctx = RandomContext::from_seed(1);
        let err = load_race_records(&path, &mut ctx).unwrap_err();
        match err {
            PipelineError::Schema(col) => assert_eq!(col, "position"),
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_rows_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut content =
            String::from("driver,constructor,circuit,grid,position,weather\n");
        // 95 valid rows and 5 with grid=0
        for i in 0..100 {
            let grid = if i < 5 { 0 } else { (i % 20) + 1 };
            content.push_str(&format!(
                "Driver {},Team {},Monza Circuit,{},{},Dry\n",
                i % 10,
                i % 4,
                grid,
                (i % 20) + 1
            ));
        }
        let path = write_csv(&dir, "results.csv", &content);
        let mut ctx = RandomContext::from_seed(1);
        let (records, report) = load_race_records(&path, &mut ctx).unwrap();
        assert_eq!(report.total_rows, 100);
        assert_eq!(records.len(), 95);
        assert!(!report.weather_synthesized);
    }

    #[test]
    fn test_position_above_twenty_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "results.csv",
            "driver,constructor,circuit,grid,position,weather\n\
             A,X,Monza Circuit,1,21,Dry\n\
             B,X,Monza Circuit,2,2,Dry\n",
        );
        let mut ctx = RandomContext::from_seed(1);
        let (records, _) = load_race_records(&path, &mut ctx).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].driver, "B");
    }

    #[test]
    fn test_weather_defaulting_is_seeded() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = String::from("driver,constructor,circuit,grid,position\n");
        for i in 0..40 {
            let circuit = if i % 2 == 0 {
                "Circuit de Spa-Francorchamps"
            } else {
                "Monza Circuit"
            };
            content.push_str(&format!("D{i},T,{circuit},{},{}\n", (i % 20) + 1, (i % 20) + 1));
        }
        let path = write_csv(&dir, "results.csv", &content);

        let mut ctx_a = RandomContext::from_seed(42);
        let (records_a, report) = load_race_records(&path, &mut ctx_a).unwrap();
        assert!(report.weather_synthesized);

        let mut ctx_b = RandomContext::from_seed(42);
        let (records_b, _) = load_race_records(&path, &mut ctx_b).unwrap();

        let weather_a: Vec<_> = records_a.iter().map(|r| r.weather).collect();
        let weather_b: Vec<_> = records_b.iter().map(|r| r.weather).collect();
        assert_eq!(weather_a, weather_b);

        // Non-wet-prone circuits stay Dry
        for record in records_a.iter().filter(|r| r.circuit == "Monza Circuit") {
            assert_eq!(record.weather, Weather::Dry);
        }
    }

    #[test]
    fn test_unparseable_numbers_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "results.csv",
            "driver,constructor,circuit,grid,position,weather\n\
             A,X,Monza Circuit,three,1,Dry\n\
             B,X,Monza Circuit,3,5,Dry\n",
        );
        let mut ctx = RandomContext::from_seed(1);
        let (records, _) = load_race_records(&path, &mut ctx).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].grid, 3);
    }
}
