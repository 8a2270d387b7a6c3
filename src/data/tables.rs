//! Curated lookup tables
//!
//! Each table is a partial mapping with a documented default policy, kept as
//! data so tests can substitute smaller tables. Defaults: temperature falls
//! back to 15..=25 °C, driver experience to a uniform 1..=15 draw,
//! constructor standing to rank 10 (worst), circuit type to Balanced.

use crate::models::{CircuitType, Weather};

/// Ambient temperature range (°C, inclusive) keyed by circuit
pub const CIRCUIT_TEMPERATURES: &[(&str, (u32, u32))] = &[
    ("Bahrain International Circuit", (25, 35)),
    ("Jeddah Corniche Circuit", (28, 38)),
    ("Albert Park Circuit", (18, 28)),
    ("Suzuka Circuit", (15, 25)),
    ("Shanghai International Circuit", (12, 22)),
    ("Miami International Autodrome", (26, 35)),
    ("Imola", (16, 26)),
    ("Monaco Circuit", (18, 28)),
    ("Circuit de Barcelona-Catalunya", (16, 26)),
    ("Circuit Gilles Villeneuve", (12, 22)),
    ("Red Bull Ring", (14, 24)),
    ("Silverstone Circuit", (12, 22)),
    ("Hungaroring", (18, 30)),
    ("Circuit de Spa-Francorchamps", (10, 20)),
    ("Circuit Zandvoort", (12, 22)),
    ("Monza Circuit", (16, 26)),
    ("Marina Bay Street Circuit", (26, 32)),
    ("Baku City Circuit", (20, 30)),
    ("Circuit of the Americas", (18, 28)),
    ("Autódromo Hermanos Rodríguez", (16, 24)),
    ("Interlagos", (18, 28)),
    ("Las Vegas Strip Circuit", (10, 25)),
    ("Losail International Circuit", (22, 32)),
    ("Yas Marina Circuit", (24, 32)),
];

/// Fallback temperature range for circuits absent from the table
pub const FALLBACK_TEMPERATURE: (u32, u32) = (15, 25);

/// Circuits that see rain often enough to perturb a defaulted weather column
pub const WET_PRONE_CIRCUITS: &[&str] = &[
    "Circuit de Spa-Francorchamps",
    "Suzuka Circuit",
    "Interlagos",
    "Silverstone Circuit",
];

/// Weather distribution applied to wet-prone circuits when the input has no
/// weather column
pub const WET_PRONE_WEATHER: &[(Weather, f64)] = &[
    (Weather::Wet, 0.2),
    (Weather::Mixed, 0.3),
    (Weather::Dry, 0.5),
];

/// Seasons of experience for current drivers; breaks excluded
pub const DRIVER_EXPERIENCE: &[(&str, u32)] = &[
    ("Lewis Hamilton", 19),
    ("Fernando Alonso", 21),
    ("Nico Hülkenberg", 13),
    ("Max Verstappen", 11),
    ("Charles Leclerc", 7),
    ("Lando Norris", 7),
    ("George Russell", 6),
    ("Pierre Gasly", 8),
    ("Esteban Ocon", 8),
    ("Lance Stroll", 8),
    ("Yuki Tsunoda", 5),
    ("Alex Albon", 5),
    ("Carlos Sainz", 11),
    ("Oscar Piastri", 2),
    ("Kimi Antonelli", 1),
    ("Oliver Bearman", 1),
    ("Jack Doohan", 1),
    ("Gabriel Bortoleto", 1),
    ("Isack Hadjar", 1),
    ("Liam Lawson", 2),
];

/// Uniform range for drivers absent from the experience table
pub const FALLBACK_EXPERIENCE: (u32, u32) = (1, 15);

/// Constructor championship standings; both current and legacy team names
pub const CONSTRUCTOR_STANDINGS: &[(&str, u32)] = &[
    ("McLaren", 1),
    ("Ferrari", 2),
    ("Red Bull Racing", 3),
    ("Red Bull", 3),
    ("Mercedes", 4),
    ("Aston Martin", 5),
    ("Alpine", 6),
    ("Haas F1 Team", 7),
    ("Haas", 7),
    ("RB", 8),
    ("Williams", 9),
    ("Kick Sauber", 10),
    ("Sauber", 10),
];

/// Unknown constructors sit at the bottom of the order
pub const FALLBACK_STANDING: u32 = 10;

/// Circuit character; everything else is Balanced
pub const CIRCUIT_TYPES: &[(&str, CircuitType)] = &[
    ("Monaco Circuit", CircuitType::Street),
    ("Marina Bay Street Circuit", CircuitType::Street),
    ("Baku City Circuit", CircuitType::Street),
    ("Jeddah Corniche Circuit", CircuitType::Street),
    ("Las Vegas Strip Circuit", CircuitType::Street),
    ("Monza Circuit", CircuitType::Power),
    ("Silverstone Circuit", CircuitType::Balanced),
    ("Hungaroring", CircuitType::Twisty),
    ("Circuit de Spa-Francorchamps", CircuitType::Power),
];

/// Compound sequences for wet races
pub const WET_STRATEGIES: &[&str] = &[
    "Full Wet → Intermediate → Medium",
    "Intermediate → Full Wet",
    "Full Wet → Medium",
    "Intermediate → Soft",
];

/// Compound sequences for mixed conditions
pub const MIXED_STRATEGIES: &[&str] = &[
    "Intermediate → Medium → Soft",
    "Soft → Intermediate → Hard",
    "Medium → Intermediate → Soft",
];

/// Dry-condition sequences on street circuits
pub const DRY_STREET_STRATEGIES: &[&str] = &[
    "Medium → Hard",
    "Soft → Medium → Hard",
    "Hard → Medium",
    "Soft → Hard",
];

/// Dry-condition sequences on permanent circuits
pub const DRY_STRATEGIES: &[&str] = &[
    "Soft → Medium",
    "Medium → Hard",
    "Soft → Hard",
    "Medium → Medium",
];

/// Look up a value in a `(key, value)` slice table
pub fn lookup<'a, V>(table: &'a [(&str, V)], key: &str) -> Option<&'a V> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
}

/// Circuit type with the documented Balanced default
pub fn circuit_type(circuit: &str) -> CircuitType {
    lookup(CIRCUIT_TYPES, circuit)
        .copied()
        .unwrap_or(CircuitType::Balanced)
}

/// Constructor standing with the documented worst-rank default
pub fn constructor_standing(constructor: &str) -> u32 {
    lookup(CONSTRUCTOR_STANDINGS, constructor)
        .copied()
        .unwrap_or(FALLBACK_STANDING)
}

/// Temperature range for a circuit, falling back when unknown
pub fn temperature_range(circuit: &str) -> (u32, u32) {
    lookup(CIRCUIT_TEMPERATURES, circuit)
        .copied()
        .unwrap_or(FALLBACK_TEMPERATURE)
}
