//! Table-level rules.
//!
//! Each check receives the observed values its rule declares in
//! [`TestRuleKind::required_fields`](super::TestRuleKind::required_fields).

use chrono::{DateTime, Utc};

use super::assertion::Assertion;
use super::format::format_observed;
use super::{outcome, EqualsParams, RangeParams};
use crate::core::TestCaseResult;

pub fn row_count_to_equal(
    params: &EqualsParams,
    row_count: f64,
    timestamp: DateTime<Utc>,
) -> TestCaseResult {
    outcome(
        Assertion::Equals(params.value.as_f64()).evaluate(row_count),
        timestamp,
        format!(
            "Found {} rows vs. the expected {}",
            format_observed(row_count),
            params.value
        ),
    )
}

pub fn row_count_to_be_between(
    params: &RangeParams,
    row_count: f64,
    timestamp: DateTime<Utc>,
) -> TestCaseResult {
    outcome(
        Assertion::between(params.min, params.max).evaluate(row_count),
        timestamp,
        format!(
            "Found {} rows vs. the expected range [{}, {}].",
            format_observed(row_count),
            params.min,
            params.max
        ),
    )
}

pub fn column_count_to_equal(
    params: &EqualsParams,
    column_count: f64,
    timestamp: DateTime<Utc>,
) -> TestCaseResult {
    outcome(
        Assertion::Equals(params.value.as_f64()).evaluate(column_count),
        timestamp,
        format!(
            "Found {} columns vs. the expected {}",
            format_observed(column_count),
            params.value
        ),
    )
}

pub fn column_count_to_be_between(
    params: &RangeParams,
    column_count: f64,
    timestamp: DateTime<Utc>,
) -> TestCaseResult {
    outcome(
        Assertion::between(params.min, params.max).evaluate(column_count),
        timestamp,
        format!(
            "Found {} columns vs. the expected range [{}, {}].",
            format_observed(column_count),
            params.min,
            params.max
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TestCaseStatus;
    use crate::validations::format::ParamNumber;
    use chrono::TimeZone;

    fn execution_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 7, 3, 0, 0, 0).unwrap()
    }

    fn equals(value: i64) -> EqualsParams {
        EqualsParams {
            value: ParamNumber::Int(value),
        }
    }

    fn range(min: i64, max: i64) -> RangeParams {
        RangeParams {
            min: ParamNumber::Int(min),
            max: ParamNumber::Int(max),
        }
    }

    #[test]
    fn test_row_count_to_equal() {
        let ok = row_count_to_equal(&equals(100), 100.0, execution_date());
        assert_eq!(
            ok,
            TestCaseResult::success(execution_date(), "Found 100.0 rows vs. the expected 100")
        );

        let ko = row_count_to_equal(&equals(50), 100.0, execution_date());
        assert_eq!(ko.test_case_status, TestCaseStatus::Failed);
        assert_eq!(ko.result, "Found 100.0 rows vs. the expected 50");
    }

    #[test]
    fn test_row_count_to_be_between() {
        let ok = row_count_to_be_between(&range(20, 120), 100.0, execution_date());
        assert_eq!(ok.test_case_status, TestCaseStatus::Success);
        assert_eq!(ok.result, "Found 100.0 rows vs. the expected range [20, 120].");

        let ko = row_count_to_be_between(&range(120, 200), 100.0, execution_date());
        assert_eq!(ko.test_case_status, TestCaseStatus::Failed);
        assert_eq!(ko.result, "Found 100.0 rows vs. the expected range [120, 200].");
    }

    #[test]
    fn test_column_count_to_equal() {
        let ok = column_count_to_equal(&equals(5), 5.0, execution_date());
        assert_eq!(ok.test_case_status, TestCaseStatus::Success);
        assert_eq!(ok.result, "Found 5.0 columns vs. the expected 5");

        let ko = column_count_to_equal(&equals(20), 5.0, execution_date());
        assert_eq!(ko.result, "Found 5.0 columns vs. the expected 20");
    }

    #[test]
    fn test_column_count_to_be_between() {
        let ok = column_count_to_be_between(&range(1, 5), 5.0, execution_date());
        assert_eq!(ok.test_case_status, TestCaseStatus::Success);
        assert_eq!(ok.result, "Found 5.0 columns vs. the expected range [1, 5].");

        let ko = column_count_to_be_between(&range(6, 10), 5.0, execution_date());
        assert_eq!(ko.test_case_status, TestCaseStatus::Failed);
    }
}
