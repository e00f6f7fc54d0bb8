//! Column-level rules.

use chrono::{DateTime, Utc};

use super::assertion::{counts_equal, Assertion};
use super::format::format_observed;
use super::{outcome, RangeParams};
use crate::core::TestCaseResult;

/// Observed `[min, max]` must lie within the expected range.
pub fn values_to_be_between(
    params: &RangeParams,
    min: f64,
    max: f64,
    timestamp: DateTime<Utc>,
) -> TestCaseResult {
    let range = Assertion::between(params.min, params.max);
    outcome(
        range.evaluate(min) && range.evaluate(max),
        timestamp,
        format!(
            "Found min={}, max={} vs. the expected min={}, max={}.",
            format_observed(min),
            format_observed(max),
            params.min,
            params.max
        ),
    )
}

pub fn values_to_be_unique(
    values_count: f64,
    unique_count: f64,
    timestamp: DateTime<Utc>,
) -> TestCaseResult {
    outcome(
        counts_equal(values_count, unique_count),
        timestamp,
        format!(
            "Found valuesCount={} vs. uniqueCount={}. \
             Both counts should be equal for column values to be unique.",
            format_observed(values_count),
            format_observed(unique_count)
        ),
    )
}

pub fn values_to_be_not_null(null_count: f64, timestamp: DateTime<Utc>) -> TestCaseResult {
    outcome(
        counts_equal(null_count, 0.0),
        timestamp,
        format!("Found nullCount={}. It should be 0.", format_observed(null_count)),
    )
}

/// Observed `[minLength, maxLength]` must lie within the expected range.
pub fn value_lengths_to_be_between(
    params: &RangeParams,
    min_length: f64,
    max_length: f64,
    timestamp: DateTime<Utc>,
) -> TestCaseResult {
    let range = Assertion::between(params.min, params.max);
    outcome(
        range.evaluate(min_length) && range.evaluate(max_length),
        timestamp,
        format!(
            "Found minLength={}, maxLength={} vs. the expected minLength={}, maxLength={}.",
            format_observed(min_length),
            format_observed(max_length),
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

    fn range(min: i64, max: i64) -> RangeParams {
        RangeParams {
            min: ParamNumber::Int(min),
            max: ParamNumber::Int(max),
        }
    }

    #[test]
    fn test_values_to_be_between() {
        let ok = values_to_be_between(&range(0, 3), 1.0, 3.0, execution_date());
        assert_eq!(
            ok,
            TestCaseResult::success(
                execution_date(),
                "Found min=1.0, max=3.0 vs. the expected min=0, max=3."
            )
        );

        let ko = values_to_be_between(&range(0, 2), 1.0, 3.0, execution_date());
        assert_eq!(ko.test_case_status, TestCaseStatus::Failed);
        assert_eq!(ko.result, "Found min=1.0, max=3.0 vs. the expected min=0, max=2.");
    }

    #[test]
    fn test_values_to_be_unique() {
        let ok = values_to_be_unique(10.0, 10.0, execution_date());
        assert_eq!(ok.test_case_status, TestCaseStatus::Success);
        assert_eq!(
            ok.result,
            "Found valuesCount=10.0 vs. uniqueCount=10.0. \
             Both counts should be equal for column values to be unique."
        );

        let ko = values_to_be_unique(10.0, 5.0, execution_date());
        assert_eq!(ko.test_case_status, TestCaseStatus::Failed);
        assert_eq!(
            ko.result,
            "Found valuesCount=10.0 vs. uniqueCount=5.0. \
             Both counts should be equal for column values to be unique."
        );
    }

    #[test]
    fn test_values_to_be_not_null() {
        let ok = values_to_be_not_null(0.0, execution_date());
        assert_eq!(ok.test_case_status, TestCaseStatus::Success);
        assert_eq!(ok.result, "Found nullCount=0.0. It should be 0.");

        let ko = values_to_be_not_null(10.0, execution_date());
        assert_eq!(ko.test_case_status, TestCaseStatus::Failed);
        assert_eq!(ko.result, "Found nullCount=10.0. It should be 0.");
    }

    #[test]
    fn test_value_lengths_to_be_between() {
        let ok = value_lengths_to_be_between(&range(2, 20), 4.0, 16.0, execution_date());
        assert_eq!(ok.test_case_status, TestCaseStatus::Success);
        assert_eq!(
            ok.result,
            "Found minLength=4.0, maxLength=16.0 vs. the expected minLength=2, maxLength=20."
        );

        let ko = value_lengths_to_be_between(&range(10, 20), 4.0, 16.0, execution_date());
        assert_eq!(ko.test_case_status, TestCaseStatus::Failed);
    }
}
