use serde::{Deserialize, Serialize};

/// What a metric measures; decides its direction and noise tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Milliseconds. Lower is better.
    Time,
    /// Kilobytes. Lower is better.
    Size,
    /// Requests per second. Higher is better.
    Throughput,
}

impl MetricKind {
    pub fn higher_is_better(self) -> bool {
        matches!(self, MetricKind::Throughput)
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::Time => "ms",
            MetricKind::Size => "KB",
            MetricKind::Throughput => "req/s",
        }
    }
}

/// Direction of a first-to-last change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaKind {
    Improvement,
    Regression,
    NoChange,
    /// Both ends measured zero.
    NoData,
}

impl std::fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeltaKind::Improvement => "improvement",
            DeltaKind::Regression => "regression",
            DeltaKind::NoChange => "no change",
            DeltaKind::NoData => "no data",
        };
        write!(f, "{s}")
    }
}

/// Change of one metric between the first and last run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub first: f64,
    pub last: f64,
    /// `last - first`, sign as measured.
    pub difference: f64,
    /// `difference / first * 100`; `None` when `first` is zero.
    pub percent_change: Option<f64>,
    pub kind: DeltaKind,
}

/// Absolute changes at or below which a delta is reported as no change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaTolerances {
    pub time_ms: f64,
    pub size_kb: f64,
    pub rps: f64,
}

impl Default for DeltaTolerances {
    fn default() -> Self {
        Self {
            time_ms: 0.01,
            size_kb: 0.1,
            rps: 0.1,
        }
    }
}

impl DeltaTolerances {
    pub fn for_kind(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Time => self.time_ms,
            MetricKind::Size => self.size_kb,
            MetricKind::Throughput => self.rps,
        }
    }
}

/// Compare `last` against `first` for a metric of the given kind.
pub fn compute_delta(first: f64, last: f64, kind: MetricKind, tolerances: &DeltaTolerances) -> Delta {
    let difference = last - first;
    let percent_change = (first != 0.0).then(|| difference / first * 100.0);

    let classification = if first == 0.0 && last == 0.0 {
        DeltaKind::NoData
    } else if first == 0.0 {
        // Appearing from zero: worse for costs, better for throughput.
        if kind.higher_is_better() {
            DeltaKind::Improvement
        } else {
            DeltaKind::Regression
        }
    } else if difference.abs() <= tolerances.for_kind(kind) {
        DeltaKind::NoChange
    } else if (difference < 0.0) != kind.higher_is_better() {
        DeltaKind::Improvement
    } else {
        DeltaKind::Regression
    };

    Delta {
        first,
        last,
        difference,
        percent_change,
        kind: classification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(first: f64, last: f64, kind: MetricKind) -> Delta {
        compute_delta(first, last, kind, &DeltaTolerances::default())
    }

    #[test]
    fn default_tolerances_are_pinned() {
        let t = DeltaTolerances::default();
        assert_eq!(t.time_ms, 0.01);
        assert_eq!(t.size_kb, 0.1);
        assert_eq!(t.rps, 0.1);
        assert_eq!(t.for_kind(MetricKind::Time), 0.01);
        assert_eq!(t.for_kind(MetricKind::Size), 0.1);
        assert_eq!(t.for_kind(MetricKind::Throughput), 0.1);
    }

    #[test]
    fn latency_increase_is_regression() {
        let d = delta(45.0, 600.0, MetricKind::Time);
        assert_eq!(d.difference, 555.0);
        assert_eq!(d.kind, DeltaKind::Regression);
        assert!((d.percent_change.unwrap() - 1233.333).abs() < 0.001);
    }

    #[test]
    fn latency_decrease_is_improvement() {
        let d = delta(600.0, 45.0, MetricKind::Time);
        assert_eq!(d.difference, -555.0);
        assert_eq!(d.kind, DeltaKind::Improvement);
    }

    #[test]
    fn rps_drop_is_regression() {
        let d = delta(50.0, 8.0, MetricKind::Throughput);
        assert_eq!(d.difference, -42.0);
        assert!((d.percent_change.unwrap() + 84.0).abs() < 1e-9);
        assert_eq!(d.kind, DeltaKind::Regression);
    }

    #[test]
    fn rps_rise_is_improvement() {
        assert_eq!(delta(8.0, 50.0, MetricKind::Throughput).kind, DeltaKind::Improvement);
    }

    #[test]
    fn changes_within_tolerance_are_no_change() {
        assert_eq!(delta(10.0, 10.01, MetricKind::Time).kind, DeltaKind::NoChange);
        assert_eq!(delta(10.0, 10.02, MetricKind::Time).kind, DeltaKind::Regression);
        assert_eq!(delta(100.0, 100.05, MetricKind::Size).kind, DeltaKind::NoChange);
        assert_eq!(delta(100.0, 100.25, MetricKind::Size).kind, DeltaKind::Regression);
        assert_eq!(delta(50.0, 49.95, MetricKind::Throughput).kind, DeltaKind::NoChange);
        assert_eq!(delta(50.0, 49.5, MetricKind::Throughput).kind, DeltaKind::Regression);
    }

    #[test]
    fn both_zero_is_no_data() {
        let d = delta(0.0, 0.0, MetricKind::Time);
        assert_eq!(d.kind, DeltaKind::NoData);
        assert_eq!(d.percent_change, None);
    }

    #[test]
    fn from_zero_has_no_percentage() {
        let d = delta(0.0, 12.5, MetricKind::Time);
        assert_eq!(d.kind, DeltaKind::Regression);
        assert_eq!(d.difference, 12.5);
        assert_eq!(d.percent_change, None);

        let d = delta(0.0, 12.5, MetricKind::Throughput);
        assert_eq!(d.kind, DeltaKind::Improvement);
        assert_eq!(d.percent_change, None);
    }

    #[test]
    fn custom_tolerances_apply() {
        let loose = DeltaTolerances {
            time_ms: 5.0,
            ..DeltaTolerances::default()
        };
        let d = compute_delta(100.0, 104.0, MetricKind::Time, &loose);
        assert_eq!(d.kind, DeltaKind::NoChange);
    }

    #[test]
    fn tolerances_deserialize_with_defaults() {
        let t: DeltaTolerances = serde_json::from_str(r#"{"time_ms": 1.0}"#).unwrap();
        assert_eq!(t.time_ms, 1.0);
        assert_eq!(t.size_kb, 0.1);
    }
}
