//! Read-only snapshot of a catalog table.

use serde::{Deserialize, Serialize};

use super::test_case::TestCaseParameterValue;

/// Kind of database service a table belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServiceType {
    BigQuery,
    Postgres,
    Mysql,
    Snowflake,
    Redshift,
    Sqlite,
    Trino,
    #[default]
    DataFusion,
}

impl ServiceType {
    /// Returns true for warehouses whose large tables must be profiled
    /// through a partition window instead of a full scan.
    pub fn requires_partitioning(&self) -> bool {
        matches!(self, ServiceType::BigQuery)
    }
}

/// Declared column type, as stored in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnDataType {
    Tinyint,
    Smallint,
    Int,
    Bigint,
    Float,
    Double,
    Decimal,
    Numeric,
    Number,
    Boolean,
    Char,
    Varchar,
    String,
    Text,
    Date,
    Datetime,
    Timestamp,
    Time,
    Binary,
    Array,
    Struct,
    Json,
    Unknown,
}

impl ColumnDataType {
    /// Returns true for types that support numeric aggregates.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Tinyint
                | Self::Smallint
                | Self::Int
                | Self::Bigint
                | Self::Float
                | Self::Double
                | Self::Decimal
                | Self::Numeric
                | Self::Number
        )
    }

    /// Returns true for types that support length statistics.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::Char | Self::Varchar | Self::String | Self::Text)
    }
}

/// Sampling configuration persisted on the table entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProfilerConfig {
    /// Percentage of rows to profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_sample: Option<f64>,
    /// Query whose result set is profiled instead of the table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_query: Option<String>,
}

impl TableProfilerConfig {
    /// Creates a percentage-only configuration.
    pub fn with_sample(profile_sample: f64) -> Self {
        Self {
            profile_sample: Some(profile_sample),
            profile_query: None,
        }
    }

    /// Creates a query-only configuration.
    pub fn with_query(profile_query: impl Into<String>) -> Self {
        Self {
            profile_sample: None,
            profile_query: Some(profile_query.into()),
        }
    }
}

/// Partitioning detected on the source table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePartition {
    /// Partition columns, in declaration order
    pub columns: Vec<String>,
}

/// A test stored on the table or column entity itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTest {
    /// Name of the test definition, e.g. `tableRowCountToEqual`
    pub test_definition_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub parameter_values: Vec<TestCaseParameterValue>,
}

impl EntityTest {
    /// Creates an entity test with the given parameters.
    pub fn new(
        test_definition_name: impl Into<String>,
        parameter_values: Vec<TestCaseParameterValue>,
    ) -> Self {
        Self {
            test_definition_name: test_definition_name.into(),
            description: None,
            parameter_values,
        }
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub data_type: ColumnDataType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_tests: Vec<EntityTest>,
}

impl Column {
    /// Creates a column without attached tests.
    pub fn new(name: impl Into<String>, data_type: ColumnDataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            column_tests: Vec::new(),
        }
    }

    /// Attaches a stored test to the column.
    pub fn with_test(mut self, test: EntityTest) -> Self {
        self.column_tests.push(test);
        self
    }
}

/// The logical entity under profiling.
///
/// The fully qualified name is the identity key everywhere: in test
/// identities, in catalog lookups and in persisted results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub fully_qualified_name: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_profiler_config: Option<TableProfilerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_partition: Option<TablePartition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub table_tests: Vec<EntityTest>,
}

impl Table {
    /// Creates a table snapshot with the default service type.
    pub fn new(fully_qualified_name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            fully_qualified_name: fully_qualified_name.into(),
            columns,
            service_type: ServiceType::default(),
            table_profiler_config: None,
            table_partition: None,
            table_tests: Vec::new(),
        }
    }

    /// Sets the service type.
    pub fn with_service_type(mut self, service_type: ServiceType) -> Self {
        self.service_type = service_type;
        self
    }

    /// Sets the stored profiler configuration.
    pub fn with_profiler_config(mut self, config: TableProfilerConfig) -> Self {
        self.table_profiler_config = Some(config);
        self
    }

    /// Marks the table as partitioned on the given columns.
    pub fn with_partition(mut self, columns: Vec<String>) -> Self {
        self.table_partition = Some(TablePartition { columns });
        self
    }

    /// Attaches a stored table-level test.
    pub fn with_test(mut self, test: EntityTest) -> Self {
        self.table_tests.push(test);
        self
    }

    /// Returns the last segment of the fully qualified name.
    pub fn name(&self) -> &str {
        self.fully_qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.fully_qualified_name)
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Stored sampling percentage, if any.
    pub fn stored_profile_sample(&self) -> Option<f64> {
        self.table_profiler_config
            .as_ref()
            .and_then(|c| c.profile_sample)
    }

    /// Stored sample query, if any.
    pub fn stored_profile_query(&self) -> Option<&str> {
        self.table_profiler_config
            .as_ref()
            .and_then(|c| c.profile_query.as_deref())
    }
}
