//! Deterministic California-shaped data for tests, benchmarks and offline runs.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::california::{FEATURE_NAMES, TARGET_NAME};
use super::{DatasetError, DatasetSource, Table};

/// Upper cap applied to the target, mirroring the censored house values.
const TARGET_CAP: f64 = 5.00001;

/// Generate `n_rows` records with the California Housing column layout.
///
/// The target depends mostly on income and location, so trees fitted on it
/// find meaningful splits.
pub fn synthetic_table(n_rows: usize, seed: u64) -> Table {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut features = Array2::<f64>::zeros((n_rows, FEATURE_NAMES.len()));
    let mut target = Array1::<f64>::zeros(n_rows);
    for (mut row, y) in features.rows_mut().into_iter().zip(target.iter_mut()) {
        let income = rng.random_range(0.5..15.0);
        let age = rng.random_range(1.0..52.0f64).round();
        let rooms = rng.random_range(2.0..9.0);
        let bedrooms = rooms * rng.random_range(0.15..0.3);
        let population = rng.random_range(3.0..5000.0f64).round();
        let occupancy = rng.random_range(1.0..5.0);
        let latitude = rng.random_range(32.5..42.0);
        let longitude = rng.random_range(-124.3..-114.3);
        let coastal = if longitude < -121.0 { 0.6 } else { 0.0 };
        let noise = rng.random_range(-0.25..0.25);
        let value = 0.15 + 0.38 * income + coastal + 0.004 * age + noise;
        row.assign(&Array1::from(vec![
            income, age, rooms, bedrooms, population, occupancy, latitude, longitude,
        ]));
        *y = value.clamp(0.14999, TARGET_CAP);
    }
    // Shapes and names are fixed above, so construction cannot fail.
    Table::new(
        FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
        TARGET_NAME,
        features,
        target,
    )
    .unwrap_or_else(|err| unreachable!("synthetic table is well-formed: {err}"))
}

/// [`DatasetSource`] wrapper around [`synthetic_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticSource {
    pub n_rows: usize,
    pub seed: u64,
}

impl DatasetSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn load(&self) -> Result<Table, DatasetError> {
        Ok(synthetic_table(self.n_rows, self.seed))
    }
}
