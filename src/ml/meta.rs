//! Training metadata written next to the exported tree.

use std::fmt;

use ndarray::ArrayView1;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::cart::TreeValidParams;
use crate::dataset::Table;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetaError {
    #[error("column '{0}' has no values")]
    EmptyColumn(String),
}

/// Min, max and median of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl SummaryStats {
    /// Stats over `values`; the median of an even count averages the two
    /// middle values.
    pub fn from_values(values: ArrayView1<'_, f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };
        Some(Self {
            min: sorted[0],
            max: sorted[n - 1],
            median,
        })
    }
}

/// Hyperparameters as recorded in `meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedParams {
    /// `null` when the depth is unlimited.
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub random_state: u64,
}

impl From<&TreeValidParams> for RecordedParams {
    fn from(params: &TreeValidParams) -> Self {
        Self {
            max_depth: params.max_depth(),
            min_samples_leaf: params.min_samples_leaf(),
            random_state: params.random_state(),
        }
    }
}

/// Contents of `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub feature_names: Vec<String>,
    pub target: String,
    pub n_train: usize,
    pub params: RecordedParams,
    /// Keyed by feature name, in feature order.
    #[serde(with = "ordered_stats")]
    pub feature_stats: Vec<(String, SummaryStats)>,
    pub target_stats: SummaryStats,
}

impl ModelMetadata {
    /// Summarize the training table used to fit a tree with `params`.
    pub fn from_training_table(
        table: &Table,
        params: &TreeValidParams,
    ) -> Result<Self, MetaError> {
        let stats = |name: &str, values: ArrayView1<'_, f64>| {
            SummaryStats::from_values(values).ok_or_else(|| MetaError::EmptyColumn(name.to_string()))
        };
        let feature_stats = table
            .feature_names()
            .iter()
            .zip(table.features().columns())
            .map(|(name, column)| Ok((name.clone(), stats(name, column)?)))
            .collect::<Result<Vec<_>, MetaError>>()?;
        Ok(Self {
            feature_names: table.feature_names().to_vec(),
            target: table.target_name().to_string(),
            n_train: table.n_rows(),
            params: RecordedParams::from(params),
            feature_stats,
            target_stats: stats(table.target_name(), table.target())?,
        })
    }

    pub fn feature_stat(&self, name: &str) -> Option<&SummaryStats> {
        self.feature_stats
            .iter()
            .find(|(feature, _)| feature == name)
            .map(|(_, stats)| stats)
    }
}

/// `Vec<(name, stats)>` as a JSON object that keeps insertion order.
mod ordered_stats {
    use super::*;

    pub fn serialize<S: Serializer>(
        entries: &[(String, SummaryStats)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (name, stats) in entries {
            map.serialize_entry(name, stats)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, SummaryStats)>, D::Error> {
        deserializer.deserialize_map(EntriesVisitor)
    }

    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, SummaryStats)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of feature name to summary stats")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(entry) = access.next_entry::<String, SummaryStats>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }
}
