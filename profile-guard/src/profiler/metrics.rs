//! The metric registry.
//!
//! Metrics are a closed set. Each one knows its registry name, whether it is
//! computed once per table or once per column, which column types it applies
//! to, and which other metrics it is composed from.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::ColumnDataType;
use crate::error::{ProfilerError, Result};

/// Whether a metric describes the whole table or a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricScope {
    Table,
    Column,
}

/// A registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    RowCount,
    ColumnCount,
    ValuesCount,
    NullCount,
    NullProportion,
    DistinctCount,
    DistinctProportion,
    UniqueCount,
    UniqueProportion,
    Min,
    Max,
    Mean,
    Stddev,
    Sum,
    MinLength,
    MaxLength,
    MeanLength,
}

impl Metric {
    /// Every registered metric, in execution order.
    pub const ALL: [Metric; 17] = [
        Metric::RowCount,
        Metric::ColumnCount,
        Metric::ValuesCount,
        Metric::NullCount,
        Metric::NullProportion,
        Metric::DistinctCount,
        Metric::DistinctProportion,
        Metric::UniqueCount,
        Metric::UniqueProportion,
        Metric::Min,
        Metric::Max,
        Metric::Mean,
        Metric::Stddev,
        Metric::Sum,
        Metric::MinLength,
        Metric::MaxLength,
        Metric::MeanLength,
    ];

    /// Registry name of the metric.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::RowCount => "rowCount",
            Metric::ColumnCount => "columnCount",
            Metric::ValuesCount => "valuesCount",
            Metric::NullCount => "nullCount",
            Metric::NullProportion => "nullProportion",
            Metric::DistinctCount => "distinctCount",
            Metric::DistinctProportion => "distinctProportion",
            Metric::UniqueCount => "uniqueCount",
            Metric::UniqueProportion => "uniqueProportion",
            Metric::Min => "min",
            Metric::Max => "max",
            Metric::Mean => "mean",
            Metric::Stddev => "stddev",
            Metric::Sum => "sum",
            Metric::MinLength => "minLength",
            Metric::MaxLength => "maxLength",
            Metric::MeanLength => "meanLength",
        }
    }

    /// Resolves a registry name, case-insensitively.
    pub fn from_name(name: &str) -> Result<Metric> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ProfilerError::unknown_metric(name))
    }

    pub fn scope(&self) -> MetricScope {
        match self {
            Metric::RowCount | Metric::ColumnCount => MetricScope::Table,
            _ => MetricScope::Column,
        }
    }

    /// Returns true for metrics derived from other metrics after the query pass.
    pub fn is_composed(&self) -> bool {
        !self.dependencies().is_empty()
    }

    /// Metrics this one is composed from.
    pub fn dependencies(&self) -> &'static [Metric] {
        match self {
            Metric::NullProportion => &[Metric::ValuesCount, Metric::NullCount],
            Metric::DistinctProportion => &[Metric::DistinctCount, Metric::ValuesCount],
            Metric::UniqueProportion => &[Metric::UniqueCount, Metric::ValuesCount],
            _ => &[],
        }
    }

    /// Returns true if the metric can be computed for a column of this type.
    pub fn applies_to(&self, data_type: ColumnDataType) -> bool {
        match self {
            Metric::Min | Metric::Max | Metric::Mean | Metric::Stddev | Metric::Sum => {
                data_type.is_numeric()
            }
            Metric::MinLength | Metric::MaxLength | Metric::MeanLength => data_type.is_textual(),
            _ => true,
        }
    }

    /// Computes a composed metric from its inputs.
    ///
    /// Absent when an input is absent or the denominator is zero.
    pub fn compose(&self, lookup: impl Fn(Metric) -> Option<f64>) -> Option<f64> {
        let ratio = |num: Option<f64>, den: Option<f64>| match (num, den) {
            (Some(n), Some(d)) if d != 0.0 => Some(n / d),
            _ => None,
        };
        match self {
            Metric::NullProportion => {
                let nulls = lookup(Metric::NullCount);
                let total = match (lookup(Metric::ValuesCount), nulls) {
                    (Some(v), Some(n)) => Some(v + n),
                    _ => None,
                };
                ratio(nulls, total)
            }
            Metric::DistinctProportion => {
                ratio(lookup(Metric::DistinctCount), lookup(Metric::ValuesCount))
            }
            Metric::UniqueProportion => {
                ratio(lookup(Metric::UniqueCount), lookup(Metric::ValuesCount))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
