//! Logging for profiling runs.
//!
//! Everything goes through `tracing`. [`LogConfig`] decides which of the
//! processor's noisier events are emitted and how much of a sample query ends
//! up in a log line. [`setup::init_logging`] installs a subscriber for the
//! binaries embedding the crate.

/// Runtime switches for the processor's logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Log every evaluated test result at debug level
    pub log_test_details: bool,
    /// Log the sampling decision of every table
    pub log_data_operations: bool,
    /// Sample queries longer than this are cut in log lines
    pub max_query_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_test_details: false,
            log_data_operations: true,
            max_query_length: 256,
        }
    }
}

impl LogConfig {
    /// Logs everything, including full sample queries.
    pub fn verbose() -> Self {
        Self {
            log_test_details: true,
            log_data_operations: true,
            max_query_length: usize::MAX,
        }
    }

    /// Only the per-table summaries and failures.
    pub fn quiet() -> Self {
        Self {
            log_test_details: false,
            log_data_operations: false,
            max_query_length: 64,
        }
    }

    /// The part of a sample query that goes into a log line.
    pub fn loggable_query(&self, query: &str) -> String {
        truncate_field(query, self.max_query_length)
    }
}

/// Logs a test evaluation when the [`LogConfig`] asks for test details.
#[macro_export]
macro_rules! log_test {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_test_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs a sampling decision when the [`LogConfig`] asks for data operations.
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations {
            tracing::info!($($arg)*);
        }
    };
}

/// Cuts `value` to at most `max_length` bytes, on a char boundary.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        return value.to_string();
    }
    let mut end = max_length;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...(truncated)", &value[..end])
}

/// Subscriber setup.
pub mod setup {
    use tracing::Level;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    /// Levels and format of the global subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Level of every other crate, DataFusion included
        pub level: Level,
        /// Level of profile-guard itself
        pub crate_level: Level,
        /// One JSON object per event instead of the human format
        pub json_format: bool,
        /// Full filter directive, replaces both levels
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::WARN,
                crate_level: Level::INFO,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// JSON output with profile-guard at debug, for scheduled runs.
        pub fn scheduled() -> Self {
            Self {
                crate_level: Level::DEBUG,
                json_format: true,
                ..Self::default()
            }
        }

        pub fn with_crate_level(mut self, level: Level) -> Self {
            self.crate_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// The filter directive the subscriber is built with.
        pub fn directive(&self) -> String {
            match &self.env_filter {
                Some(filter) => filter.clone(),
                None => format!(
                    "{},profile_guard={}",
                    self.level.as_str().to_lowercase(),
                    self.crate_level.as_str().to_lowercase()
                ),
            }
        }
    }

    /// Installs a global `tracing` subscriber.
    ///
    /// `RUST_LOG` wins over the configured directive. Fails if a global
    /// subscriber is already installed.
    ///
    /// ```rust,no_run
    /// use profile_guard::logging::setup::{init_logging, LoggingConfig};
    ///
    /// init_logging(LoggingConfig::scheduled()).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.directive()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
        Ok(())
    }
}
