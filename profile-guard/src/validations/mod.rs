//! Declarative data quality rules evaluated against computed profiles.
//!
//! Rules form a closed set. A catalog test case names its rule by definition
//! name (`tableRowCountToEqual`, `columnValuesToBeUnique`, ...) and carries
//! its parameters as JSON values; [`TestRule::bind`] turns the pair into a
//! typed [`TestRule`] and [`TestRule::evaluate`] runs it.
//!
//! Evaluation is uniform across rules:
//!
//! 1. If a field of [`TestRuleKind::required_fields`] is absent from the
//!    profile, the result is `Aborted` and the message names the field.
//! 2. Otherwise the predicate is checked and the result is `Success` or
//!    `Failed`, with the observed value(s) reported before the expected ones.
//!
//! ```rust
//! use chrono::Utc;
//! use profile_guard::core::{TableProfile, TestCaseParameterValue, TestCaseStatus};
//! use profile_guard::validations::{ProfileRef, TestRule};
//!
//! let rule = TestRule::bind(
//!     "tableRowCountToEqual",
//!     &[TestCaseParameterValue::new("value", 100)],
//! )
//! .unwrap();
//!
//! let now = Utc::now();
//! let profile = TableProfile::new(now).with_row_count(100.0);
//! let result = rule.evaluate(ProfileRef::Table(&profile), now);
//!
//! assert_eq!(result.test_case_status, TestCaseStatus::Success);
//! assert_eq!(result.result, "Found 100.0 rows vs. the expected 100");
//! ```

pub mod assertion;
pub mod column;
pub mod format;
pub mod table;

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use crate::core::{
    ColumnProfile, EntityType, TableProfile, TestCaseParameterDefinition, TestCaseParameterValue,
    TestCaseResult, TestDefinition,
};
use crate::error::{ProfilerError, Result};
use crate::profiler::Metric;

pub use assertion::Assertion;
pub use format::ParamNumber;

use format::format_optional;

/// Parameters of an equality rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EqualsParams {
    pub value: ParamNumber,
}

/// Parameters of an inclusive range rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeParams {
    pub min: ParamNumber,
    pub max: ParamNumber,
}

/// A rule bound to its typed parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestRule {
    TableRowCountToEqual(EqualsParams),
    TableRowCountToBeBetween(RangeParams),
    TableColumnCountToEqual(EqualsParams),
    TableColumnCountToBeBetween(RangeParams),
    ColumnValuesToBeBetween(RangeParams),
    ColumnValuesToBeUnique,
    ColumnValuesToBeNotNull,
    ColumnValueLengthsToBeBetween(RangeParams),
}

/// Rule kinds, without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestRuleKind {
    TableRowCountToEqual,
    TableRowCountToBeBetween,
    TableColumnCountToEqual,
    TableColumnCountToBeBetween,
    ColumnValuesToBeBetween,
    ColumnValuesToBeUnique,
    ColumnValuesToBeNotNull,
    ColumnValueLengthsToBeBetween,
}

struct KindSpec {
    kind: TestRuleKind,
    name: &'static str,
    description: &'static str,
    entity_type: EntityType,
    parameters: &'static [(&'static str, &'static str)],
}

static REGISTRY: [KindSpec; 8] = [
    KindSpec {
        kind: TestRuleKind::TableRowCountToEqual,
        name: "tableRowCountToEqual",
        description: "This schema defines the test TableRowCountToEqual. Test the number of rows equal to a value.",
        entity_type: EntityType::Table,
        parameters: &[("value", "Expected number of rows")],
    },
    KindSpec {
        kind: TestRuleKind::TableRowCountToBeBetween,
        name: "tableRowCountToBeBetween",
        description: "This schema defines the test TableRowCountToBeBetween. Test the number of rows to between to two values.",
        entity_type: EntityType::Table,
        parameters: &[
            ("minValue", "Expected number of rows should be greater than or equal to"),
            ("maxValue", "Expected number of rows should be lower than or equal to"),
        ],
    },
    KindSpec {
        kind: TestRuleKind::TableColumnCountToEqual,
        name: "tableColumnCountToEqual",
        description: "This test defines the test TableColumnCountToEqual. Test the number of columns equal to a value.",
        entity_type: EntityType::Table,
        parameters: &[("columnCount", "Expected number of columns to equal to a value")],
    },
    KindSpec {
        kind: TestRuleKind::TableColumnCountToBeBetween,
        name: "tableColumnCountToBeBetween",
        description: "This schema defines the test TableColumnCountToBeBetween. Test the number of columns to be between min max value.",
        entity_type: EntityType::Table,
        parameters: &[
            ("minColValue", "Expected number of columns should be greater than or equal to"),
            ("maxColValue", "Expected number of columns should be lower than or equal to"),
        ],
    },
    KindSpec {
        kind: TestRuleKind::ColumnValuesToBeBetween,
        name: "columnValuesToBeBetween",
        description: "This schema defines the test ColumnValuesToBeBetween. Test the values in a column to be between minimum and maximum value.",
        entity_type: EntityType::Column,
        parameters: &[
            ("minValue", "The minimum value in the column"),
            ("maxValue", "The maximum value in the column"),
        ],
    },
    KindSpec {
        kind: TestRuleKind::ColumnValuesToBeUnique,
        name: "columnValuesToBeUnique",
        description: "This schema defines the test ColumnValuesToBeUnique. Test the values in a column to be unique.",
        entity_type: EntityType::Column,
        parameters: &[],
    },
    KindSpec {
        kind: TestRuleKind::ColumnValuesToBeNotNull,
        name: "columnValuesToBeNotNull",
        description: "This schema defines the test ColumnValuesToBeNotNull. Test the number of values in a column are not null.",
        entity_type: EntityType::Column,
        parameters: &[],
    },
    KindSpec {
        kind: TestRuleKind::ColumnValueLengthsToBeBetween,
        name: "columnValueLengthsToBeBetween",
        description: "This schema defines the test ColumnValueLengthsToBeBetween. Test the value lengths in a column to be between minimum and maximum value.",
        entity_type: EntityType::Column,
        parameters: &[
            ("minLength", "The minimum length of values in the column"),
            ("maxLength", "The maximum length of values in the column"),
        ],
    },
];

impl TestRuleKind {
    /// Every supported rule kind.
    pub const ALL: [TestRuleKind; 8] = [
        TestRuleKind::TableRowCountToEqual,
        TestRuleKind::TableRowCountToBeBetween,
        TestRuleKind::TableColumnCountToEqual,
        TestRuleKind::TableColumnCountToBeBetween,
        TestRuleKind::ColumnValuesToBeBetween,
        TestRuleKind::ColumnValuesToBeUnique,
        TestRuleKind::ColumnValuesToBeNotNull,
        TestRuleKind::ColumnValueLengthsToBeBetween,
    ];

    fn spec(&self) -> &'static KindSpec {
        // REGISTRY is declared in the same order as ALL
        &REGISTRY[*self as usize]
    }

    /// Definition name, e.g. `tableRowCountToEqual`.
    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    /// Name used in result messages, e.g. `TableRowCountToEqual`.
    pub fn display_name(&self) -> String {
        let name = self.name();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }

    pub fn description(&self) -> &'static str {
        self.spec().description
    }

    pub fn entity_type(&self) -> EntityType {
        self.spec().entity_type
    }

    /// Resolves a definition name, case-insensitively.
    pub fn from_name(name: &str) -> Option<TestRuleKind> {
        REGISTRY
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name.trim()))
            .map(|spec| spec.kind)
    }

    /// Profile fields the rule reads. The rule aborts when any is absent.
    pub fn required_fields(&self) -> &'static [Metric] {
        match self {
            TestRuleKind::TableRowCountToEqual | TestRuleKind::TableRowCountToBeBetween => {
                &[Metric::RowCount]
            }
            TestRuleKind::TableColumnCountToEqual | TestRuleKind::TableColumnCountToBeBetween => {
                &[Metric::ColumnCount]
            }
            TestRuleKind::ColumnValuesToBeBetween => &[Metric::Min, Metric::Max],
            TestRuleKind::ColumnValuesToBeUnique => &[Metric::ValuesCount, Metric::UniqueCount],
            TestRuleKind::ColumnValuesToBeNotNull => &[Metric::NullCount],
            TestRuleKind::ColumnValueLengthsToBeBetween => &[Metric::MinLength, Metric::MaxLength],
        }
    }

    /// Builds the catalog record describing this rule.
    pub fn definition(&self) -> TestDefinition {
        let spec = self.spec();
        TestDefinition {
            id: Uuid::new_v4(),
            name: spec.name.to_string(),
            description: spec.description.to_string(),
            entity_type: spec.entity_type,
            parameter_definition: spec
                .parameters
                .iter()
                .map(|(name, description)| TestCaseParameterDefinition {
                    name: name.to_string(),
                    description: description.to_string(),
                    required: true,
                })
                .collect(),
        }
    }
}

impl fmt::Display for TestRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The profile a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum ProfileRef<'a> {
    Table(&'a TableProfile),
    Column(&'a ColumnProfile),
}

impl ProfileRef<'_> {
    pub fn entity_type(&self) -> EntityType {
        match self {
            ProfileRef::Table(_) => EntityType::Table,
            ProfileRef::Column(_) => EntityType::Column,
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match self {
            ProfileRef::Table(profile) => profile.get(metric),
            ProfileRef::Column(profile) => profile.get(metric),
        }
    }
}

/// Message of a rule aborted because some of its fields are absent.
fn missing_fields(kind: TestRuleKind, observed: &[(Metric, Option<f64>)]) -> String {
    let rule = kind.display_name();
    match kind.entity_type() {
        EntityType::Table => {
            let fields: Vec<_> = observed.iter().map(|(metric, _)| metric.name()).collect();
            format!("{} should not be None for {rule}", fields.join(" & "))
        }
        EntityType::Column => {
            let fields: Vec<_> = observed
                .iter()
                .map(|(metric, _)| format!("`{}`", metric.name()))
                .collect();
            let expected = format!(
                "We expect {} to be informed on the profiler for {rule}",
                fields.join(" & ")
            );
            if observed.len() < 2 {
                return format!("{expected}.");
            }
            let got: Vec<_> = observed
                .iter()
                .map(|(metric, value)| format!("{}={}", metric.name(), format_optional(*value)))
                .collect();
            format!("{expected} but got {}.", got.join(", "))
        }
    }
}

impl TestRule {
    /// Catalog records for every supported rule.
    pub fn definitions() -> Vec<TestDefinition> {
        TestRuleKind::ALL.iter().map(|k| k.definition()).collect()
    }

    /// Binds a definition name and its parameter values into a rule.
    ///
    /// Unknown names fail with [`ProfilerError::CatalogLookup`]; missing or
    /// non numeric parameters with [`ProfilerError::InvalidTestParameter`].
    pub fn bind(definition_name: &str, params: &[TestCaseParameterValue]) -> Result<TestRule> {
        let kind = TestRuleKind::from_name(definition_name).ok_or_else(|| {
            ProfilerError::catalog_lookup(
                "testDefinition",
                definition_name,
                "test definition is not natively supported",
            )
        })?;

        let number = |name: &str| -> Result<ParamNumber> {
            let param = params
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    ProfilerError::invalid_parameter(
                        kind.name(),
                        format!("missing parameter '{name}'"),
                    )
                })?;
            ParamNumber::from_json(&param.value).ok_or_else(|| {
                ProfilerError::invalid_parameter(
                    kind.name(),
                    format!("parameter '{name}' is not numeric: {}", param.value),
                )
            })
        };
        let equals = |name: &str| number(name).map(|value| EqualsParams { value });
        let range = |min: &str, max: &str| -> Result<RangeParams> {
            Ok(RangeParams {
                min: number(min)?,
                max: number(max)?,
            })
        };

        Ok(match kind {
            TestRuleKind::TableRowCountToEqual => TestRule::TableRowCountToEqual(equals("value")?),
            TestRuleKind::TableRowCountToBeBetween => {
                TestRule::TableRowCountToBeBetween(range("minValue", "maxValue")?)
            }
            TestRuleKind::TableColumnCountToEqual => {
                TestRule::TableColumnCountToEqual(equals("columnCount")?)
            }
            TestRuleKind::TableColumnCountToBeBetween => {
                TestRule::TableColumnCountToBeBetween(range("minColValue", "maxColValue")?)
            }
            TestRuleKind::ColumnValuesToBeBetween => {
                TestRule::ColumnValuesToBeBetween(range("minValue", "maxValue")?)
            }
            TestRuleKind::ColumnValuesToBeUnique => TestRule::ColumnValuesToBeUnique,
            TestRuleKind::ColumnValuesToBeNotNull => TestRule::ColumnValuesToBeNotNull,
            TestRuleKind::ColumnValueLengthsToBeBetween => {
                TestRule::ColumnValueLengthsToBeBetween(range("minLength", "maxLength")?)
            }
        })
    }

    pub fn kind(&self) -> TestRuleKind {
        match self {
            TestRule::TableRowCountToEqual(_) => TestRuleKind::TableRowCountToEqual,
            TestRule::TableRowCountToBeBetween(_) => TestRuleKind::TableRowCountToBeBetween,
            TestRule::TableColumnCountToEqual(_) => TestRuleKind::TableColumnCountToEqual,
            TestRule::TableColumnCountToBeBetween(_) => TestRuleKind::TableColumnCountToBeBetween,
            TestRule::ColumnValuesToBeBetween(_) => TestRuleKind::ColumnValuesToBeBetween,
            TestRule::ColumnValuesToBeUnique => TestRuleKind::ColumnValuesToBeUnique,
            TestRule::ColumnValuesToBeNotNull => TestRuleKind::ColumnValuesToBeNotNull,
            TestRule::ColumnValueLengthsToBeBetween(_) => {
                TestRuleKind::ColumnValueLengthsToBeBetween
            }
        }
    }

    pub fn entity_type(&self) -> EntityType {
        self.kind().entity_type()
    }

    /// Evaluates the rule. A rule given the wrong kind of profile aborts.
    pub fn evaluate(&self, profile: ProfileRef<'_>, timestamp: DateTime<Utc>) -> TestCaseResult {
        let kind = self.kind();
        if kind.entity_type() != profile.entity_type() {
            let (expected, given) = match kind.entity_type() {
                EntityType::Column => ("column", "table"),
                EntityType::Table => ("table", "column"),
            };
            return TestCaseResult::aborted(
                timestamp,
                format!(
                    "{} is a {expected} test and cannot run against a {given} profile.",
                    kind.display_name()
                ),
            );
        }

        let observed: Vec<(Metric, Option<f64>)> = kind
            .required_fields()
            .iter()
            .map(|metric| (*metric, profile.get(*metric)))
            .collect();
        let Some(values) = observed
            .iter()
            .map(|(_, value)| *value)
            .collect::<Option<Vec<f64>>>()
        else {
            return TestCaseResult::aborted(timestamp, missing_fields(kind, &observed));
        };

        match (self, values.as_slice()) {
            (TestRule::TableRowCountToEqual(p), &[row_count]) => {
                table::row_count_to_equal(p, row_count, timestamp)
            }
            (TestRule::TableRowCountToBeBetween(p), &[row_count]) => {
                table::row_count_to_be_between(p, row_count, timestamp)
            }
            (TestRule::TableColumnCountToEqual(p), &[column_count]) => {
                table::column_count_to_equal(p, column_count, timestamp)
            }
            (TestRule::TableColumnCountToBeBetween(p), &[column_count]) => {
                table::column_count_to_be_between(p, column_count, timestamp)
            }
            (TestRule::ColumnValuesToBeBetween(p), &[min, max]) => {
                column::values_to_be_between(p, min, max, timestamp)
            }
            (TestRule::ColumnValuesToBeUnique, &[values_count, unique_count]) => {
                column::values_to_be_unique(values_count, unique_count, timestamp)
            }
            (TestRule::ColumnValuesToBeNotNull, &[null_count]) => {
                column::values_to_be_not_null(null_count, timestamp)
            }
            (TestRule::ColumnValueLengthsToBeBetween(p), &[min_length, max_length]) => {
                column::value_lengths_to_be_between(p, min_length, max_length, timestamp)
            }
            (rule, values) => TestCaseResult::aborted(
                timestamp,
                format!(
                    "{} cannot be evaluated from {} profile fields.",
                    rule.kind().display_name(),
                    values.len()
                ),
            ),
        }
    }
}

pub(crate) fn outcome(
    passed: bool,
    timestamp: DateTime<Utc>,
    message: impl Into<String>,
) -> TestCaseResult {
    if passed {
        TestCaseResult::success(timestamp, message)
    } else {
        TestCaseResult::failed(timestamp, message)
    }
}
