use crate::db::models::Reading;

/// Arithmetic means over a set of readings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Averages {
    pub temperature: f64,
    pub humidity: f64,
    pub ethylene_level: f64,
}

impl Averages {
    /// Means of each measurement across `readings`. An empty set yields all
    /// zeros.
    pub fn of(readings: &[Reading]) -> Self {
        if readings.is_empty() {
            return Self::default();
        }

        let (temperature, humidity, ethylene_level) = readings.iter().fold(
            (0.0, 0.0, 0.0),
            |(t, h, e), r| (t + r.temperature, h + r.humidity, e + r.ethylene_level),
        );
        let n = readings.len() as f64;

        Self {
            temperature: temperature / n,
            humidity: humidity / n,
            ethylene_level: ethylene_level / n,
        }
    }
}

/// Outcome of an aggregation query: the means plus the matching rows in
/// query order.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub averages: Averages,
    pub readings: Vec<Reading>,
}

impl From<Vec<Reading>> for AggregateResult {
    fn from(readings: Vec<Reading>) -> Self {
        Self {
            averages: Averages::of(&readings),
            readings,
        }
    }
}
