//! Runs a metric set over a sample and assembles the [`TableProfile`].

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::metrics::{Metric, MetricScope};
use crate::core::{Column, ColumnProfile, MetricError, TableProfile};
use crate::engine::{MetricRequest, QueryEngine, SampleHandle};
use crate::error::{ProfilerError, Result};
use crate::sampler::SamplingSpec;

/// A resolved metric set plus the per-metric time budget.
///
/// ```rust,ignore
/// let profiler = Profiler::from_names(&["rowCount".into(), "nullProportion".into()])?
///     .with_timeout_seconds(30);
/// // nullProportion pulls in valuesCount and nullCount
/// assert_eq!(profiler.metrics().count(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Profiler {
    metrics: BTreeSet<Metric>,
    timeout: Option<Duration>,
}

impl Profiler {
    /// The default profiler: every registered metric.
    pub fn default_profiler() -> Self {
        Self::from_metrics(Metric::ALL)
    }

    /// Builds a profiler from metric names.
    ///
    /// Fails with `UnknownMetric` on the first unregistered name. Names are
    /// deduplicated and composed metrics pull in their inputs.
    pub fn from_names(names: &[String]) -> Result<Self> {
        let metrics = names
            .iter()
            .map(|name| Metric::from_name(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_metrics(metrics))
    }

    /// Builds a profiler from metrics.
    pub fn from_metrics(metrics: impl IntoIterator<Item = Metric>) -> Self {
        let mut resolved = BTreeSet::new();
        for metric in metrics {
            resolved.insert(metric);
            resolved.extend(metric.dependencies().iter().copied());
        }
        Self {
            metrics: resolved,
            timeout: None,
        }
    }

    /// Sets the time budget of each single metric computation.
    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout = Some(Duration::from_secs(seconds));
        self
    }

    /// Resolved metrics, in execution order.
    pub fn metrics(&self) -> impl Iterator<Item = Metric> + '_ {
        self.metrics.iter().copied()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn scoped(&self, scope: MetricScope) -> impl Iterator<Item = Metric> + '_ {
        self.metrics().filter(move |m| m.scope() == scope)
    }

    /// Computes the profile of a sample.
    ///
    /// Table metrics run once and column metrics once per applicable column.
    /// A metric that fails or exceeds the budget is recorded in
    /// `metric_errors` and left absent; the rest of the profile is still
    /// computed.
    #[instrument(skip_all, fields(table = %sample.table_fqn, metrics = self.metrics.len()))]
    pub async fn execute(
        &self,
        engine: &dyn QueryEngine,
        sample: &SampleHandle,
        sampling: &SamplingSpec,
        columns: &[Column],
        timestamp: DateTime<Utc>,
    ) -> TableProfile {
        let mut profile = TableProfile::new(timestamp);
        profile.profile_sample = sampling.profile_sample();
        profile.profile_query = sampling.profile_query().map(str::to_string);

        for metric in self.scoped(MetricScope::Table) {
            let request = MetricRequest::table(metric);
            let value = self.compute(engine, sample, &request, &mut profile.metric_errors).await;
            profile.set(metric, value);
        }

        for column in columns {
            let mut column_profile = ColumnProfile::new(&column.name);
            let applicable = self
                .scoped(MetricScope::Column)
                .filter(|m| m.applies_to(column.data_type));

            let mut composed = Vec::new();
            for metric in applicable {
                if metric.is_composed() {
                    composed.push(metric);
                    continue;
                }
                let request = MetricRequest::column(metric, &column.name);
                let value = self
                    .compute(engine, sample, &request, &mut profile.metric_errors)
                    .await;
                column_profile.set(metric, value);
            }
            for metric in composed {
                let value = metric.compose(|m| column_profile.get(m));
                column_profile.set(metric, value);
            }

            profile.column_profile.push(column_profile);
        }

        debug!(
            row_count = ?profile.row_count,
            columns = profile.column_profile.len(),
            errors = profile.metric_errors.len(),
            "Profile computed"
        );
        profile
    }

    async fn compute(
        &self,
        engine: &dyn QueryEngine,
        sample: &SampleHandle,
        request: &MetricRequest,
        errors: &mut Vec<MetricError>,
    ) -> Option<f64> {
        let outcome = match self.timeout {
            Some(budget) => {
                let timed = tokio::time::timeout(budget, engine.compute(sample, request)).await;
                timed.unwrap_or_else(|_| {
                    Err(ProfilerError::MetricTimeout {
                        metric: request.key(),
                        timeout_seconds: budget.as_secs(),
                    })
                })
            }
            None => engine.compute(sample, request).await,
        };

        match outcome {
            Ok(value) => value,
            Err(err) => {
                warn!(metric = %request.key(), error = %err, "Metric computation failed");
                errors.push(MetricError {
                    metric: request.key(),
                    message: err.to_string(),
                });
                None
            }
        }
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::default_profiler()
    }
}
