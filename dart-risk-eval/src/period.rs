use chrono::Datelike;
use chrono::NaiveDate;
use dart_persistence::ReportCode;

use crate::RiskEvalError;
use crate::RiskEvalResult;

/// Chooses the reporting-period tuple most likely to already be filed,
/// based on the current month.
#[must_use]
pub fn automatic_period(today: NaiveDate) -> (i32, ReportCode) {
    let year = today.year();
    match today.month() {
        1..=3 => (year - 1, ReportCode::Q3),
        4..=6 => (year - 1, ReportCode::Annual),
        7..=9 => (year, ReportCode::Q1),
        _ => (year, ReportCode::Half),
    }
}

pub fn manual_period(business_year: i32, report_code: i32) -> RiskEvalResult<(i32, ReportCode)> {
    if !(2000..=2030).contains(&business_year) {
        return Err(RiskEvalError::InvalidArgument(format!(
            "business_year {business_year} out of range 2000-2030"
        )));
    }
    let report_code = ReportCode::from_code(report_code)
        .map_err(|err| RiskEvalError::InvalidArgument(err.to_string()))?;
    Ok((business_year, report_code))
}

fn display_name(report_code: ReportCode) -> &'static str {
    match report_code {
        ReportCode::Annual => "사업보고서",
        ReportCode::Half => "반기보고서",
        ReportCode::Q1 => "1분기보고서",
        ReportCode::Q3 => "3분기보고서",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodInfo {
    pub business_year: i32,
    pub report_code: ReportCode,
    pub row_count: usize,
    pub display_name: String,
    pub description_ko: String,
    pub is_automatic_selection: bool,
}

/// Annotates the store's `distinctPeriods` rows with human-readable names
/// and marks whichever tuple the automatic-selection rule would pick today.
#[must_use]
pub fn describe_periods(periods: Vec<(i32, ReportCode, usize)>, today: NaiveDate) -> Vec<PeriodInfo> {
    let automatic = automatic_period(today);
    periods
        .into_iter()
        .map(|(business_year, report_code, row_count)| PeriodInfo {
            business_year,
            report_code,
            row_count,
            display_name: display_name(report_code).to_owned(),
            description_ko: format!("{business_year}년 {}", display_name(report_code)),
            is_automatic_selection: (business_year, report_code) == automatic,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn automatic_period_picks_last_year_q3_in_q1() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 15).unwrap();
        assert_eq!(automatic_period(today), (2023, ReportCode::Q3));
    }

    #[test]
    fn automatic_period_picks_this_year_half_in_q4() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        assert_eq!(automatic_period(today), (2024, ReportCode::Half));
    }

    #[test]
    fn manual_period_rejects_out_of_range_year() {
        assert!(manual_period(1999, 11011).is_err());
        assert!(manual_period(2031, 11011).is_err());
    }

    #[test]
    fn manual_period_rejects_unknown_report_code() {
        assert!(manual_period(2024, 99999).is_err());
    }

    #[test]
    fn describe_periods_flags_the_automatic_selection() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        let periods = vec![(2024, ReportCode::Half, 40), (2024, ReportCode::Q1, 38)];
        let described = describe_periods(periods, today);
        assert!(described[0].is_automatic_selection);
        assert!(!described[1].is_automatic_selection);
    }
}
