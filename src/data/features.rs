//! Feature synthesis
//!
//! Derives contextual and physical signals from a cleaned race record. Each
//! sub-generator is deterministic given the shared seeded context; draws are
//! made per record in a fixed order (temperature, humidity, wind, track-temp
//! delta, tire strategy, driver fallback experience, recent form, qualifying
//! gap, budget efficiency, DRS zones, lap length, safety-car laps, pit time)
//! so a full run is reproducible end to end.

use std::collections::HashMap;

use crate::data::tables;
use crate::models::{CircuitType, EnhancedFeatureRow, RaceRecord, Weather};
use crate::sampling::RandomContext;

/// Synthesizes enhanced feature rows from cleaned records
///
/// Holds the per-driver fallback experience cache for the lifetime of one
/// run, so repeated rows for an uncurated driver agree with each other.
#[derive(Debug, Default)]
pub struct FeatureSynthesizer {
    fallback_experience: HashMap<String, u32>,
}

impl FeatureSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map one cleaned record to one enhanced row
    pub fn synthesize(&mut self, record: &RaceRecord, ctx: &mut RandomContext) -> EnhancedFeatureRow {
        let (temp_low, temp_high) = tables::temperature_range(&record.circuit);
        let temperature = ctx.uniform_int(temp_low, temp_high) as f64;

        let (humidity, wind_speed) = match record.weather {
            Weather::Wet => (ctx.uniform(80.0, 95.0), ctx.uniform(10.0, 20.0)),
            Weather::Mixed => (ctx.uniform(60.0, 85.0), ctx.uniform(5.0, 15.0)),
            Weather::Dry => (ctx.uniform(30.0, 70.0), ctx.uniform(0.0, 10.0)),
        };
        let track_temp = temperature + ctx.uniform(5.0, 25.0);

        let circuit_type = tables::circuit_type(&record.circuit);
        let tire_strategy = Self::tire_strategy(record.weather, circuit_type, ctx).to_string();

        let driver_experience = self.driver_experience(&record.driver, ctx);
        let recent_form = ctx.uniform(1.0, 20.0);
        let quali_gap_to_teammate = ctx.uniform(-1.5, 1.5);

        let constructor_standing = tables::constructor_standing(&record.constructor);
        let budget_efficiency = ctx.uniform(0.7, 1.0);

        let drs_zones = ctx.uniform_int(1, 3);
        let lap_length = ctx.uniform(3.0, 7.0);
        let safety_car_laps = ctx.poisson(3.0);
        let avg_pit_time = ctx.uniform(2.0, 4.5);

        EnhancedFeatureRow {
            record: record.clone(),
            temperature,
            humidity,
            wind_speed,
            track_temp,
            tire_strategy,
            driver_experience,
            recent_form,
            quali_gap_to_teammate,
            constructor_standing,
            budget_efficiency,
            circuit_type,
            drs_zones,
            lap_length,
            safety_car_laps,
            avg_pit_time,
        }
    }

    /// Synthesize a whole corpus in input order
    pub fn synthesize_all(
        &mut self,
        records: &[RaceRecord],
        ctx: &mut RandomContext,
    ) -> Vec<EnhancedFeatureRow> {
        records
            .iter()
            .map(|record| self.synthesize(record, ctx))
            .collect()
    }

    /// Weather- and circuit-type-conditioned compound sequence
    pub fn tire_strategy(
        weather: Weather,
        circuit_type: CircuitType,
        ctx: &mut RandomContext,
    ) -> &'static str {
        match weather {
            Weather::Wet => *ctx.choose(tables::WET_STRATEGIES),
            Weather::Mixed => *ctx.choose(tables::MIXED_STRATEGIES),
            Weather::Dry => {
                if circuit_type == CircuitType::Street {
                    *ctx.choose(tables::DRY_STREET_STRATEGIES)
                } else {
                    *ctx.choose(tables::DRY_STRATEGIES)
                }
            }
        }
    }

    /// Every tire strategy label any synthesis could emit
    ///
    /// The serve-time vocabulary must cover labels the training corpus may
    /// not have happened to draw.
    pub fn all_tire_strategies() -> Vec<&'static str> {
        let mut labels: Vec<&'static str> = Vec::new();
        for set in [
            tables::WET_STRATEGIES,
            tables::MIXED_STRATEGIES,
            tables::DRY_STREET_STRATEGIES,
            tables::DRY_STRATEGIES,
        ] {
            for label in set {
                if !labels.contains(label) {
                    labels.push(label);
                }
            }
        }
        labels
    }

    fn driver_experience(&mut self, driver: &str, ctx: &mut RandomContext) -> u32 {
        if let Some(years) = tables::lookup(tables::DRIVER_EXPERIENCE, driver) {
            return *years;
        }
        if let Some(years) = self.fallback_experience.get(driver) {
            return *years;
        }
        let (low, high) = tables::FALLBACK_EXPERIENCE;
        let years = ctx.uniform_int(low, high);
        self.fallback_experience.insert(driver.to_string(), years);
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(driver: &str, constructor: &str, circuit: &str, weather: Weather) -> RaceRecord {
        RaceRecord {
            driver: driver.to_string(),
            constructor: constructor.to_string(),
            circuit: circuit.to_string(),
            grid: 5,
            position: 5,
            weather,
            season: None,
        }
    }

    #[test]
    fn test_synthesis_is_reproducible() {
        let records = vec![
            record("Max Verstappen", "Red Bull", "Monza Circuit", Weather::Dry),
            record("Unknown Rookie", "Brabham", "Monaco Circuit", Weather::Wet),
        ];

        let mut ctx_a = RandomContext::from_seed(42);
        let rows_a = FeatureSynthesizer::new().synthesize_all(&records, &mut ctx_a);

        let mut ctx_b = RandomContext::from_seed(42);
        let rows_b = FeatureSynthesizer::new().synthesize_all(&records, &mut ctx_b);

        for (a, b) in rows_a.iter().zip(&rows_b) {
            assert_eq!(a.temperature, b.temperature);
            assert_eq!(a.humidity, b.humidity);
            assert_eq!(a.tire_strategy, b.tire_strategy);
            assert_eq!(a.driver_experience, b.driver_experience);
            assert_eq!(a.safety_car_laps, b.safety_car_laps);
        }
    }

    #[test]
    fn test_synthesis_ignores_finishing_position() {
        let raced = record("Max Verstappen", "Red Bull", "Monza Circuit", Weather::Dry);
        let mut pending = raced.clone();
        pending.position = 0;

        let mut ctx_a = RandomContext::from_seed(42);
        let row_a = FeatureSynthesizer::new().synthesize(&raced, &mut ctx_a);
        let mut ctx_b = RandomContext::from_seed(42);
        let row_b = FeatureSynthesizer::new().synthesize(&pending, &mut ctx_b);

        assert_eq!(row_a.temperature, row_b.temperature);
        assert_eq!(row_a.tire_strategy, row_b.tire_strategy);
        assert_eq!(row_a.recent_form, row_b.recent_form);
        assert_eq!(row_a.quali_gap_to_teammate, row_b.quali_gap_to_teammate);
    }

    #[test]
    fn test_weather_conditioned_ranges() {
        let mut ctx = RandomContext::from_seed(7);
        let mut synth = FeatureSynthesizer::new();

        for _ in 0..50 {
            let wet = synth.synthesize(&record("A", "X", "Imola", Weather::Wet), &mut ctx);
            assert!((80.0..95.0).contains(&wet.humidity));
            assert!((10.0..20.0).contains(&wet.wind_speed));

            let dry = synth.synthesize(&record("A", "X", "Imola", Weather::Dry), &mut ctx);
            assert!((30.0..70.0).contains(&dry.humidity));
            assert!((0.0..10.0).contains(&dry.wind_speed));
        }
    }

    #[test]
    fn test_track_temp_above_ambient() {
        let mut ctx = RandomContext::from_seed(9);
        let mut synth = FeatureSynthesizer::new();
        for _ in 0..100 {
            let row = synth.synthesize(&record("A", "X", "Hungaroring", Weather::Dry), &mut ctx);
            assert!(row.track_temp > row.temperature + 4.9);
            assert!(row.track_temp < row.temperature + 25.1);
        }
    }

    #[test]
    fn test_curated_driver_experience() {
        let mut ctx = RandomContext::from_seed(1);
        let mut synth = FeatureSynthesizer::new();
        let row = synth.synthesize(
            &record("Fernando Alonso", "Aston Martin", "Imola", Weather::Dry),
            &mut ctx,
        );
        assert_eq!(row.driver_experience, 21);
    }

    #[test]
    fn test_fallback_experience_is_cached_per_driver() {
        let mut ctx = RandomContext::from_seed(1);
        let mut synth = FeatureSynthesizer::new();
        let first = synth.synthesize(&record("J Clark", "Lotus", "Imola", Weather::Dry), &mut ctx);
        let second = synth.synthesize(&record("J Clark", "Lotus", "Monza Circuit", Weather::Dry), &mut ctx);
        assert_eq!(first.driver_experience, second.driver_experience);
        assert!((1..=15).contains(&first.driver_experience));
    }

    #[test]
    fn test_unknown_constructor_gets_worst_standing() {
        let mut ctx = RandomContext::from_seed(1);
        let mut synth = FeatureSynthesizer::new();
        let row = synth.synthesize(&record("A", "Tyrrell", "Imola", Weather::Dry), &mut ctx);
        assert_eq!(row.constructor_standing, 10);
    }

    #[test]
    fn test_street_circuits_use_street_strategy_set() {
        let mut ctx = RandomContext::from_seed(13);
        for _ in 0..50 {
            let strategy =
                FeatureSynthesizer::tire_strategy(Weather::Dry, CircuitType::Street, &mut ctx);
            assert!(tables::DRY_STREET_STRATEGIES.contains(&strategy));
            let wet = FeatureSynthesizer::tire_strategy(Weather::Wet, CircuitType::Street, &mut ctx);
            assert!(tables::WET_STRATEGIES.contains(&wet));
        }
    }

    #[test]
    fn test_all_tire_strategies_cover_every_set() {
        let all = FeatureSynthesizer::all_tire_strategies();
        for set in [
            tables::WET_STRATEGIES,
            tables::MIXED_STRATEGIES,
            tables::DRY_STREET_STRATEGIES,
            tables::DRY_STRATEGIES,
        ] {
            for label in set {
                assert!(all.contains(label));
            }
        }
        // No duplicates
        let mut dedup = all.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(dedup.len(), all.len());
    }

    #[test]
    fn test_physical_bounds() {
        let mut ctx = RandomContext::from_seed(21);
        let mut synth = FeatureSynthesizer::new();
        for _ in 0..200 {
            let row = synth.synthesize(&record("A", "X", "Somewhere", Weather::Mixed), &mut ctx);
            assert!((15.0..=25.0).contains(&row.temperature));
            assert!((1..=3).contains(&row.drs_zones));
            assert!((3.0..7.0).contains(&row.lap_length));
            assert!((2.0..4.5).contains(&row.avg_pit_time));
            assert!((0.7..1.0).contains(&row.budget_efficiency));
            assert!((-1.5..1.5).contains(&row.quali_gap_to_teammate));
        }
    }
}
