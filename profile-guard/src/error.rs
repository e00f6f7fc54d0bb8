//! Error types for the profiling and validation engine.
//!
//! Every failure in the crate is a [`ProfilerError`]. The processor catches
//! errors at the narrowest scope (a metric, a test case, a table) and turns
//! them into status entries, so only configuration errors discovered before
//! the first table is processed abort a run.

use thiserror::Error;

/// The main error type for profile-guard.
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// A requested metric name is not part of the metric registry.
    #[error("Metric '{name}' is not registered")]
    UnknownMetric {
        /// The unresolved metric name
        name: String,
    },

    /// A single metric computation exceeded its time budget.
    #[error("Metric '{metric}' exceeded the timeout of {timeout_seconds}s")]
    MetricTimeout {
        /// Metric key, `metric` or `column.metric`
        metric: String,
        /// Budget that was exceeded
        timeout_seconds: u64,
    },

    /// The explicit sample query or the raw sample rows could not be fetched.
    #[error("Could not fetch sample for '{table}': {message}")]
    SampleFetch {
        /// Fully qualified name of the table
        table: String,
        /// Detailed error message
        message: String,
    },

    /// Resolve-or-create of a catalog record failed.
    #[error("Catalog lookup of {kind} '{identity}' failed: {message}")]
    CatalogLookup {
        /// Record kind (test suite, test case, test definition, table)
        kind: String,
        /// Identity that was looked up
        identity: String,
        /// Detailed error message
        message: String,
    },

    /// Persisting a processor response failed.
    #[error("Could not persist results for '{table}': {message}")]
    SinkPersist {
        /// Fully qualified name of the table
        table: String,
        /// Detailed error message
        message: String,
    },

    /// A test case parameter is missing or cannot be read as a number.
    #[error("Invalid parameter for test '{test}': {message}")]
    InvalidTestParameter {
        /// Test definition name
        test: String,
        /// Detailed error message
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error related to configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, ProfilerError>`.
pub type Result<T> = std::result::Result<T, ProfilerError>;

impl ProfilerError {
    /// Creates an unknown metric error.
    pub fn unknown_metric(name: impl Into<String>) -> Self {
        Self::UnknownMetric { name: name.into() }
    }

    /// Creates a sample fetch error.
    pub fn sample_fetch(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SampleFetch {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a catalog lookup error.
    pub fn catalog_lookup(
        kind: impl Into<String>,
        identity: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CatalogLookup {
            kind: kind.into(),
            identity: identity.into(),
            message: message.into(),
        }
    }

    /// Creates a sink persistence error.
    pub fn sink_persist(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkPersist {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid test parameter error.
    pub fn invalid_parameter(test: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTestParameter {
            test: test.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ProfilerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
