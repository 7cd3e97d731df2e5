use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::compare::delta::{Delta, DeltaTolerances, MetricKind};
use crate::compare::metrics::first_last_delta;
use crate::results::{BenchmarkRun, OperationMap, INDEX_ASSET_KEY};

/// Per-key collections whose keys may differ from run to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyedGroup {
    Endpoint,
    AssetSize,
    AssetTime,
    DatabaseOperation,
    SerializationOperation,
    BusinessLogicOperation,
    ConcurrentOperation,
}

impl KeyedGroup {
    pub const ALL: [KeyedGroup; 7] = [
        KeyedGroup::Endpoint,
        KeyedGroup::AssetSize,
        KeyedGroup::AssetTime,
        KeyedGroup::DatabaseOperation,
        KeyedGroup::SerializationOperation,
        KeyedGroup::BusinessLogicOperation,
        KeyedGroup::ConcurrentOperation,
    ];

    pub fn title(self) -> &'static str {
        match self {
            KeyedGroup::Endpoint => "Endpoints",
            KeyedGroup::AssetSize => "Asset sizes",
            KeyedGroup::AssetTime => "Asset load times",
            KeyedGroup::DatabaseOperation => "Database operations",
            KeyedGroup::SerializationOperation => "Serialization operations",
            KeyedGroup::BusinessLogicOperation => "Business logic operations",
            KeyedGroup::ConcurrentOperation => "Concurrent operations",
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            KeyedGroup::AssetSize => MetricKind::Size,
            _ => MetricKind::Time,
        }
    }

    /// Keys this group has in `run`, in no particular order.
    fn keys(self, run: &BenchmarkRun) -> Vec<String> {
        match self {
            KeyedGroup::Endpoint => run
                .endpoints
                .iter()
                .flatten()
                .map(|ep| ep.path.clone())
                .collect(),
            KeyedGroup::AssetSize | KeyedGroup::AssetTime => {
                let Some(frontend) = &run.frontend else {
                    return Vec::new();
                };
                frontend
                    .index_html
                    .iter()
                    .map(|_| INDEX_ASSET_KEY.to_string())
                    .chain(frontend.assets.iter().map(|a| a.path.clone()))
                    .collect()
            }
            _ => self
                .operations(run)
                .map(|ops| ops.keys().cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// The value under `key` in `run`, or `None` when the run lacks it.
    pub fn value(self, run: &BenchmarkRun, key: &str) -> Option<f64> {
        match self {
            KeyedGroup::Endpoint => run.endpoint_response_ms(key),
            KeyedGroup::AssetSize => run.asset(key).map(|a| a.size_kb),
            KeyedGroup::AssetTime => run.asset(key).map(|a| a.response_ms),
            _ => self.operations(run)?.get(key).map(|op| op.duration_ms),
        }
    }

    fn operations(self, run: &BenchmarkRun) -> Option<&OperationMap> {
        let response = run.benchmark_response()?;
        match self {
            KeyedGroup::DatabaseOperation => response.database.as_ref(),
            KeyedGroup::SerializationOperation => response.serialization.as_ref(),
            KeyedGroup::BusinessLogicOperation => response.business_logic.as_ref(),
            KeyedGroup::ConcurrentOperation => response.concurrent.as_ref(),
            _ => None,
        }
    }
}

/// One key of a keyed group across all compared runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedRow {
    pub group: KeyedGroup,
    pub key: String,
    /// One entry per run, oldest first; `None` where the run lacks the key.
    pub values: Vec<Option<f64>>,
    /// Present only when both the first and the last run carry the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Delta>,
}

/// Sorted union of the group's keys over every run.
pub fn union_keys(group: KeyedGroup, runs: &[BenchmarkRun]) -> Vec<String> {
    runs.iter()
        .flat_map(|run| group.keys(run))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reconcile one group: a row per key in the union, in key order.
pub fn reconcile(
    group: KeyedGroup,
    runs: &[BenchmarkRun],
    tolerances: &DeltaTolerances,
) -> Vec<KeyedRow> {
    union_keys(group, runs)
        .into_iter()
        .map(|key| {
            let values: Vec<Option<f64>> = runs.iter().map(|r| group.value(r, &key)).collect();
            let delta = first_last_delta(&values, group.kind(), tolerances);
            KeyedRow {
                group,
                key,
                values,
                delta,
            }
        })
        .collect()
}
