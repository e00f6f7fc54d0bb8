//! Computed profiles.
//!
//! Every statistic is optional: a metric that was not requested, is not
//! applicable to the column type, or failed to compute is simply absent.
//! Test evaluation relies on this to tell Aborted apart from Failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profiler::Metric;

/// Statistics of a single column over the sample.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_proportion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct_proportion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_proportion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_length: Option<f64>,
}

impl ColumnProfile {
    /// Creates an empty profile for the named column.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns the value computed for a column metric.
    ///
    /// Table metrics always read as absent.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::ValuesCount => self.values_count,
            Metric::NullCount => self.null_count,
            Metric::NullProportion => self.null_proportion,
            Metric::DistinctCount => self.distinct_count,
            Metric::DistinctProportion => self.distinct_proportion,
            Metric::UniqueCount => self.unique_count,
            Metric::UniqueProportion => self.unique_proportion,
            Metric::Min => self.min,
            Metric::Max => self.max,
            Metric::Mean => self.mean,
            Metric::Stddev => self.stddev,
            Metric::Sum => self.sum,
            Metric::MinLength => self.min_length,
            Metric::MaxLength => self.max_length,
            Metric::MeanLength => self.mean_length,
            Metric::RowCount | Metric::ColumnCount => None,
        }
    }

    /// Stores the value of a column metric. Table metrics are ignored.
    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::ValuesCount => &mut self.values_count,
            Metric::NullCount => &mut self.null_count,
            Metric::NullProportion => &mut self.null_proportion,
            Metric::DistinctCount => &mut self.distinct_count,
            Metric::DistinctProportion => &mut self.distinct_proportion,
            Metric::UniqueCount => &mut self.unique_count,
            Metric::UniqueProportion => &mut self.unique_proportion,
            Metric::Min => &mut self.min,
            Metric::Max => &mut self.max,
            Metric::Mean => &mut self.mean,
            Metric::Stddev => &mut self.stddev,
            Metric::Sum => &mut self.sum,
            Metric::MinLength => &mut self.min_length,
            Metric::MaxLength => &mut self.max_length,
            Metric::MeanLength => &mut self.mean_length,
            Metric::RowCount | Metric::ColumnCount => return,
        };
        *slot = value;
    }

    /// Sets a metric value, builder style.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        self.set(metric, Some(value));
        self
    }
}

/// A metric that could not be computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricError {
    /// Metric key, `metric` for table metrics or `column.metric`
    pub metric: String,
    pub message: String,
}

/// Result of profiling one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProfile {
    pub timestamp: DateTime<Utc>,
    /// Percentage used for sampling, echoed for persistence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_sample: Option<f64>,
    /// Sample query used, echoed for persistence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_count: Option<f64>,
    #[serde(default)]
    pub column_profile: Vec<ColumnProfile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_errors: Vec<MetricError>,
}

impl TableProfile {
    /// Creates an empty profile stamped at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            profile_sample: None,
            profile_query: None,
            row_count: None,
            column_count: None,
            column_profile: Vec::new(),
            metric_errors: Vec::new(),
        }
    }

    /// Sets the row count.
    pub fn with_row_count(mut self, row_count: f64) -> Self {
        self.row_count = Some(row_count);
        self
    }

    /// Sets the column count.
    pub fn with_column_count(mut self, column_count: f64) -> Self {
        self.column_count = Some(column_count);
        self
    }

    /// Appends a column profile.
    pub fn with_column(mut self, column: ColumnProfile) -> Self {
        self.column_profile.push(column);
        self
    }

    /// Returns the value computed for a table metric.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::RowCount => self.row_count,
            Metric::ColumnCount => self.column_count,
            _ => None,
        }
    }

    /// Stores the value of a table metric. Column metrics are ignored.
    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        match metric {
            Metric::RowCount => self.row_count = value,
            Metric::ColumnCount => self.column_count = value,
            _ => {}
        }
    }

    /// Looks up the profile computed for a column.
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.column_profile.iter().find(|c| c.name == name)
    }
}
