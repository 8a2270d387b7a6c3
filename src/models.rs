use serde::{Deserialize, Serialize};
use std::fmt;

/// Weather condition recorded for a race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weather {
    Dry,
    Wet,
    Mixed,
}

impl Weather {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Dry => "Dry",
            Weather::Wet => "Wet",
            Weather::Mixed => "Mixed",
        }
    }

    pub fn parse(value: &str) -> Option<Weather> {
        match value {
            "Dry" => Some(Weather::Dry),
            "Wet" => Some(Weather::Wet),
            "Mixed" => Some(Weather::Mixed),
            _ => None,
        }
    }

    /// All conditions, in vocabulary-stable order
    pub fn all() -> [Weather; 3] {
        [Weather::Dry, Weather::Wet, Weather::Mixed]
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Circuit character used to condition tire strategy and encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitType {
    Street,
    Power,
    Balanced,
    Twisty,
}

impl CircuitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitType::Street => "Street",
            CircuitType::Power => "Power",
            CircuitType::Balanced => "Balanced",
            CircuitType::Twisty => "Twisty",
        }
    }
}

impl fmt::Display for CircuitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cleaned historical race result row
///
/// Rows that fail validation (grid < 1, position outside 1..=20, missing
/// identity fields) are dropped by the cleaner and never reach this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceRecord {
    pub driver: String,
    pub constructor: String,
    pub circuit: String,
    pub grid: u32,
    /// Finishing position, 1..=20 for historical rows. Serve-time rows use 0
    /// as a not-yet-raced marker; feature synthesis never reads this field,
    /// so the marker cannot leak into a prediction.
    pub position: u32,
    pub weather: Weather,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<u32>,
}

/// A race record augmented with synthesized contextual and physical signals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedFeatureRow {
    pub record: RaceRecord,
    /// Ambient temperature in °C, drawn from a circuit-keyed range
    pub temperature: f64,
    /// Relative humidity in percent; Wet > Mixed > Dry
    pub humidity: f64,
    /// Wind speed in km/h; Wet > Mixed > Dry
    pub wind_speed: f64,
    /// Track surface temperature, always above ambient
    pub track_temp: f64,
    /// Compound sequence label, e.g. "Soft → Medium"
    pub tire_strategy: String,
    /// Seasons of experience for the driver
    pub driver_experience: u32,
    /// Rolling average finishing position; lower is better
    pub recent_form: f64,
    /// Signed qualifying gap to teammate in seconds
    pub quali_gap_to_teammate: f64,
    /// Championship standing of the constructor; 10 (worst) when unknown
    pub constructor_standing: u32,
    /// Spend-to-performance ratio in 0.7..=1.0
    pub budget_efficiency: f64,
    pub circuit_type: CircuitType,
    pub drs_zones: u32,
    /// Lap length in km
    pub lap_length: f64,
    pub safety_car_laps: u32,
    /// Average pit stop time in seconds
    pub avg_pit_time: f64,
}

/// Prediction task kinds, one trained estimator each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    /// Regression over finishing position 1..=20
    Position,
    /// Binary: finish in the top 3
    Podium,
    /// Binary: finish in the top 10
    Points,
    /// Binary: finish first
    Winner,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Position => "position",
            TaskKind::Podium => "podium",
            TaskKind::Points => "points",
            TaskKind::Winner => "winner",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One grid slot submitted for prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridEntry {
    pub driver: String,
    pub constructor: String,
    pub grid: u32,
}

/// Shared race setting for a prediction batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSetting {
    pub circuit: String,
    pub weather: Weather,
}

/// Prediction for one grid slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridPrediction {
    pub driver: String,
    pub constructor: String,
    pub grid: u32,
    /// Raw regressor output before rank normalization
    pub predicted_position: f64,
    /// Rank-normalized finish: a permutation of 1..=N across the batch
    pub finish: u32,
    pub podium: bool,
    pub points: bool,
    /// Win probability, normalized over the batch; absent when the winner
    /// model was skipped at train time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win_probability: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weather_parse_round_trip() {
        for w in Weather::all() {
            assert_eq!(Weather::parse(w.as_str()), Some(w));
        }
        assert_eq!(Weather::parse("Monsoon"), None);
    }

    #[test]
    fn test_task_kind_names() {
        assert_eq!(TaskKind::Position.as_str(), "position");
        assert_eq!(TaskKind::Winner.to_string(), "winner");
    }

    #[test]
    fn test_race_record_serde() {
        let record = RaceRecord {
            driver: "Lewis Hamilton".to_string(),
            constructor: "Ferrari".to_string(),
            circuit: "Silverstone Circuit".to_string(),
            grid: 3,
            position: 1,
            weather: Weather::Mixed,
            season: Some(2024),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: RaceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.driver, "Lewis Hamilton");
        assert_eq!(back.weather, Weather::Mixed);
        assert_eq!(back.season, Some(2024));
    }
}
