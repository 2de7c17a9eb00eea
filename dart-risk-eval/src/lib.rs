#![deny(clippy::print_stdout, clippy::print_stderr)]

use dart_persistence::FinancialStatementRow;
use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use rust_decimal_macros::dec;
use thiserror::Error;

mod amount;
mod period;

pub use crate::amount::AmountField;
pub use crate::amount::lookup_amount;
pub use crate::period::PeriodInfo;
pub use crate::period::automatic_period;
pub use crate::period::describe_periods;
pub use crate::period::manual_period;
use dart_persistence::ReportCode;

pub type RiskEvalResult<T> = Result<T, RiskEvalError>;

#[derive(Debug, Error)]
pub enum RiskEvalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskItem {
    pub item_number: u8,
    pub description: String,
    pub is_at_risk: bool,
    pub actual_value: String,
    pub threshold: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub corp_code: String,
    pub business_year: i32,
    pub report_code: ReportCode,
    pub items: Vec<RiskItem>,
}

const DATA_UNAVAILABLE: &str = "데이터 부족";

fn round4(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

fn format_pct(value: Decimal) -> String {
    format!("{}%", value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

fn missing_item(item_number: u8, description: &str, threshold: &str) -> RiskItem {
    RiskItem {
        item_number,
        description: description.to_owned(),
        is_at_risk: false,
        actual_value: DATA_UNAVAILABLE.to_owned(),
        threshold: threshold.to_owned(),
        notes: Some("필요 계정 금액을 조회할 수 없습니다".into()),
    }
}

/// `(cur - prev) / |prev| * 100`. A zero or absent `prev` never panics: it
/// yields a notes-annotated non-risk result unless the caller marks the
/// numerator-positive case as extreme risk.
fn pct_change(cur: Option<Decimal>, prev: Option<Decimal>) -> (Option<Decimal>, Option<&'static str>) {
    match (cur, prev) {
        (Some(cur), Some(prev)) if prev != Decimal::ZERO => {
            (Some(round4((cur - prev) / prev.abs() * dec!(100))), None)
        }
        (Some(_), Some(_)) => (None, Some("기준연도 값이 0이라 변동률을 계산할 수 없습니다")),
        _ => (None, None),
    }
}

/// `numerator / denominator * 100`, with a caller-controlled "positive
/// numerator over a zero denominator" extreme-risk override used by items
/// 4, 9, and 11.
fn pct_ratio(
    numerator: Option<Decimal>,
    denominator: Option<Decimal>,
) -> (Option<Decimal>, Option<&'static str>, bool) {
    match (numerator, denominator) {
        (Some(num), Some(den)) if den != Decimal::ZERO => {
            (Some(round4(num / den * dec!(100))), None, false)
        }
        (Some(num), Some(_)) if num > Decimal::ZERO => (
            None,
            Some("분모가 0이고 분자가 양수이므로 위험으로 처리합니다"),
            true,
        ),
        (Some(_), Some(_)) => (
            None,
            Some("분모가 0이라 비율을 계산할 수 없습니다"),
            false,
        ),
        _ => (None, None, false),
    }
}

#[must_use]
pub fn evaluate(
    rows: &[FinancialStatementRow],
    corp_code: &str,
    business_year: i32,
    report_code: ReportCode,
) -> RiskAssessment {
    if rows.is_empty() {
        return RiskAssessment {
            corp_code: corp_code.to_owned(),
            business_year,
            report_code,
            items: vec![RiskItem {
                item_number: 0,
                description: "재무 정보 조회".into(),
                is_at_risk: true,
                actual_value: DATA_UNAVAILABLE.into(),
                threshold: String::new(),
                notes: Some("선택한 기간에 대한 동기화된 재무제표가 없습니다".into()),
            }],
        };
    }

    let revenue_cur = lookup_amount(rows, "매출액", AmountField::ThstrmAmount);
    let revenue_prev = lookup_amount(rows, "매출액", AmountField::FrmtrmAmount);
    let operating_income_cur = lookup_amount(rows, "영업이익", AmountField::ThstrmAmount);
    let operating_income_prev = lookup_amount(rows, "영업이익", AmountField::FrmtrmAmount);
    let receivables = lookup_amount(rows, "매출채권", AmountField::ThstrmAmount);
    let payables = lookup_amount(rows, "매입채무", AmountField::ThstrmAmount);
    let operating_cash_flow = lookup_amount(rows, "영업활동으로인한현금흐름", AmountField::ThstrmAmount);
    let short_term_borrowings = lookup_amount(rows, "단기차입금", AmountField::ThstrmAmount);
    let long_term_borrowings = lookup_amount(rows, "장기차입금", AmountField::ThstrmAmount);
    let short_term_borrowings_prev = lookup_amount(rows, "단기차입금", AmountField::FrmtrmAmount);
    let long_term_borrowings_prev = lookup_amount(rows, "장기차입금", AmountField::FrmtrmAmount);
    let total_assets = lookup_amount(rows, "자산총계", AmountField::ThstrmAmount);
    let total_liabilities = lookup_amount(rows, "부채총계", AmountField::ThstrmAmount);
    let total_equity = lookup_amount(rows, "자본총계", AmountField::ThstrmAmount);
    let capital_stock = lookup_amount(rows, "자본금", AmountField::ThstrmAmount);

    let total_borrowings = add_optional(short_term_borrowings, long_term_borrowings);
    let total_borrowings_prev = add_optional(short_term_borrowings_prev, long_term_borrowings_prev);

    let items = vec![
        item_1_revenue_decline(revenue_cur, revenue_prev),
        item_2_operating_income_decline(operating_income_cur, operating_income_prev),
        item_3_receivables_turnover(revenue_cur, receivables),
        item_4_receivables_ratio(receivables, revenue_cur),
        item_5_payables_turnover(revenue_cur, payables),
        item_6_operating_loss(operating_income_cur),
        item_7_negative_operating_cash_flow(operating_cash_flow),
        item_8_borrowings_growth(total_borrowings, total_borrowings_prev),
        item_9_borrowings_to_assets(total_borrowings, total_assets),
        item_10_short_term_share(short_term_borrowings, total_borrowings),
        item_11_debt_to_equity(total_liabilities, total_equity),
        item_12_capital_impairment(total_equity, capital_stock),
    ];

    RiskAssessment {
        corp_code: corp_code.to_owned(),
        business_year,
        report_code,
        items,
    }
}

fn add_optional(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

fn item_1_revenue_decline(cur: Option<Decimal>, prev: Option<Decimal>) -> RiskItem {
    let (Some(cur), Some(prev)) = (cur, prev) else {
        return missing_item(1, "매출액 30% 이상 감소", "-30% 이하");
    };
    let (change, note) = pct_change(Some(cur), Some(prev));
    match change {
        Some(value) => RiskItem {
            item_number: 1,
            description: "매출액 30% 이상 감소".into(),
            is_at_risk: value <= dec!(-30),
            actual_value: format_pct(value),
            threshold: "-30% 이하".into(),
            notes: None,
        },
        None => RiskItem {
            item_number: 1,
            description: "매출액 30% 이상 감소".into(),
            is_at_risk: false,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "-30% 이하".into(),
            notes: note.map(str::to_owned),
        },
    }
}

fn item_2_operating_income_decline(cur: Option<Decimal>, prev: Option<Decimal>) -> RiskItem {
    let (Some(cur), Some(prev)) = (cur, prev) else {
        return missing_item(2, "영업이익 30% 이상 감소", "-30% 이하");
    };
    if prev <= Decimal::ZERO {
        return RiskItem {
            item_number: 2,
            description: "영업이익 30% 이상 감소".into(),
            is_at_risk: false,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "-30% 이하".into(),
            notes: Some("전기 영업이익이 0 이하라 변동률을 계산하지 않습니다".into()),
        };
    }
    let (change, _) = pct_change(Some(cur), Some(prev));
    let value = change.unwrap_or_default();
    RiskItem {
        item_number: 2,
        description: "영업이익 30% 이상 감소".into(),
        is_at_risk: value <= dec!(-30),
        actual_value: format_pct(value),
        threshold: "-30% 이하".into(),
        notes: None,
    }
}

fn item_3_receivables_turnover(revenue: Option<Decimal>, receivables: Option<Decimal>) -> RiskItem {
    let (Some(revenue), Some(receivables)) = (revenue, receivables) else {
        return missing_item(3, "매출채권회전율 3 이하", "3 이하");
    };
    if receivables == Decimal::ZERO {
        return RiskItem {
            item_number: 3,
            description: "매출채권회전율 3 이하".into(),
            is_at_risk: false,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "3 이하".into(),
            notes: Some("매출채권이 0이라 회전율을 계산할 수 없습니다".into()),
        };
    }
    let value = round4(revenue / receivables);
    RiskItem {
        item_number: 3,
        description: "매출채권회전율 3 이하".into(),
        is_at_risk: value <= dec!(3),
        actual_value: value.to_string(),
        threshold: "3 이하".into(),
        notes: None,
    }
}

fn item_4_receivables_ratio(receivables: Option<Decimal>, revenue: Option<Decimal>) -> RiskItem {
    let (value, note, extreme) = pct_ratio(receivables, revenue);
    match value {
        Some(value) => RiskItem {
            item_number: 4,
            description: "매출채권/매출액 비율 50% 이상".into(),
            is_at_risk: value >= dec!(50),
            actual_value: format_pct(value),
            threshold: "50% 이상".into(),
            notes: None,
        },
        None if receivables.is_none() || revenue.is_none() => {
            missing_item(4, "매출채권/매출액 비율 50% 이상", "50% 이상")
        }
        None => RiskItem {
            item_number: 4,
            description: "매출채권/매출액 비율 50% 이상".into(),
            is_at_risk: extreme,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "50% 이상".into(),
            notes: note.map(str::to_owned),
        },
    }
}

fn item_5_payables_turnover(revenue: Option<Decimal>, payables: Option<Decimal>) -> RiskItem {
    let (Some(revenue), Some(payables)) = (revenue, payables) else {
        return missing_item(5, "매입채무회전율 2 이하", "2 이하");
    };
    if payables == Decimal::ZERO {
        return RiskItem {
            item_number: 5,
            description: "매입채무회전율 2 이하".into(),
            is_at_risk: false,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "2 이하".into(),
            notes: Some("매입채무가 0이라 회전율을 계산할 수 없습니다".into()),
        };
    }
    let value = round4(revenue / payables);
    RiskItem {
        item_number: 5,
        description: "매입채무회전율 2 이하".into(),
        is_at_risk: value <= dec!(2),
        actual_value: value.to_string(),
        threshold: "2 이하".into(),
        notes: Some("매출원가 미확보로 매출액을 대용 지표로 사용한 근사치입니다".into()),
    }
}

fn item_6_operating_loss(operating_income: Option<Decimal>) -> RiskItem {
    let Some(operating_income) = operating_income else {
        return missing_item(6, "영업손실 발생", "0 미만");
    };
    RiskItem {
        item_number: 6,
        description: "영업손실 발생".into(),
        is_at_risk: operating_income < Decimal::ZERO,
        actual_value: operating_income.to_string(),
        threshold: "0 미만".into(),
        notes: None,
    }
}

fn item_7_negative_operating_cash_flow(operating_cash_flow: Option<Decimal>) -> RiskItem {
    let Some(operating_cash_flow) = operating_cash_flow else {
        return missing_item(7, "영업활동 현금흐름 음수", "0 미만");
    };
    RiskItem {
        item_number: 7,
        description: "영업활동 현금흐름 음수".into(),
        is_at_risk: operating_cash_flow < Decimal::ZERO,
        actual_value: operating_cash_flow.to_string(),
        threshold: "0 미만".into(),
        notes: None,
    }
}

fn item_8_borrowings_growth(cur: Option<Decimal>, prev: Option<Decimal>) -> RiskItem {
    let (Some(cur), Some(prev)) = (cur, prev) else {
        return missing_item(8, "총차입금 30% 이상 증가", "30% 이상");
    };
    let (change, note) = pct_change(Some(cur), Some(prev));
    match change {
        Some(value) => RiskItem {
            item_number: 8,
            description: "총차입금 30% 이상 증가".into(),
            is_at_risk: value >= dec!(30),
            actual_value: format_pct(value),
            threshold: "30% 이상".into(),
            notes: None,
        },
        None => RiskItem {
            item_number: 8,
            description: "총차입금 30% 이상 증가".into(),
            is_at_risk: false,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "30% 이상".into(),
            notes: note.map(str::to_owned),
        },
    }
}

fn item_9_borrowings_to_assets(total_borrowings: Option<Decimal>, total_assets: Option<Decimal>) -> RiskItem {
    let (value, note, extreme) = pct_ratio(total_borrowings, total_assets);
    match value {
        Some(value) => RiskItem {
            item_number: 9,
            description: "차입금/자산총계 비율 50% 이상".into(),
            is_at_risk: value >= dec!(50),
            actual_value: format_pct(value),
            threshold: "50% 이상".into(),
            notes: None,
        },
        None if total_borrowings.is_none() || total_assets.is_none() => {
            missing_item(9, "차입금/자산총계 비율 50% 이상", "50% 이상")
        }
        None => RiskItem {
            item_number: 9,
            description: "차입금/자산총계 비율 50% 이상".into(),
            is_at_risk: extreme,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "50% 이상".into(),
            notes: note.map(str::to_owned),
        },
    }
}

fn item_10_short_term_share(short_term: Option<Decimal>, total_borrowings: Option<Decimal>) -> RiskItem {
    let (Some(short_term), Some(total_borrowings)) = (short_term, total_borrowings) else {
        return missing_item(10, "단기차입금 비중 90% 이상", "90% 이상");
    };
    if total_borrowings == Decimal::ZERO {
        return RiskItem {
            item_number: 10,
            description: "단기차입금 비중 90% 이상".into(),
            is_at_risk: false,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "90% 이상".into(),
            notes: Some("총차입금이 0이라 비중을 계산할 수 없습니다".into()),
        };
    }
    let value = round4(short_term / total_borrowings * dec!(100));
    RiskItem {
        item_number: 10,
        description: "단기차입금 비중 90% 이상".into(),
        is_at_risk: value >= dec!(90),
        actual_value: format_pct(value),
        threshold: "90% 이상".into(),
        notes: None,
    }
}

fn item_11_debt_to_equity(total_liabilities: Option<Decimal>, total_equity: Option<Decimal>) -> RiskItem {
    let (Some(total_liabilities), Some(total_equity)) = (total_liabilities, total_equity) else {
        return missing_item(11, "부채비율 200% 이상", "200% 이상");
    };
    if total_equity < Decimal::ZERO {
        return RiskItem {
            item_number: 11,
            description: "부채비율 200% 이상".into(),
            is_at_risk: true,
            actual_value: format!("자본잠식 {total_equity}"),
            threshold: "200% 이상".into(),
            notes: Some("자본총계가 음수(자본잠식)".into()),
        };
    }
    let (value, note, extreme) = pct_ratio(Some(total_liabilities), Some(total_equity));
    match value {
        Some(value) => RiskItem {
            item_number: 11,
            description: "부채비율 200% 이상".into(),
            is_at_risk: value >= dec!(200),
            actual_value: format_pct(value),
            threshold: "200% 이상".into(),
            notes: None,
        },
        None => RiskItem {
            item_number: 11,
            description: "부채비율 200% 이상".into(),
            is_at_risk: extreme,
            actual_value: DATA_UNAVAILABLE.into(),
            threshold: "200% 이상".into(),
            notes: note.map(str::to_owned),
        },
    }
}

fn item_12_capital_impairment(total_equity: Option<Decimal>, capital_stock: Option<Decimal>) -> RiskItem {
    let (Some(total_equity), Some(capital_stock)) = (total_equity, capital_stock) else {
        return missing_item(12, "자본잠식", "자본총계 < 자본금");
    };
    RiskItem {
        item_number: 12,
        description: "자본잠식".into(),
        is_at_risk: total_equity < capital_stock,
        actual_value: total_equity.to_string(),
        threshold: "자본총계 < 자본금".into(),
        notes: None,
    }
}

#[cfg(test)]
mod tests {
    use dart_persistence::FsDivision;
    use dart_persistence::StatementDivision;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn row(account_name: &str, thstrm: Option<&str>, frmtrm: Option<&str>) -> FinancialStatementRow {
        FinancialStatementRow {
            corp_code: "00126380".into(),
            business_year: 2024,
            report_code: ReportCode::Annual,
            fs_division: FsDivision::Ofs,
            statement_division: StatementDivision::IncomeStatement,
            account_id: account_name.into(),
            account_name: account_name.into(),
            thstrm_nm: None,
            thstrm_amount: thstrm.map(str::to_owned),
            frmtrm_nm: None,
            frmtrm_amount: frmtrm.map(str::to_owned),
            thstrm_add_amount: None,
            frmtrm_add_amount: None,
            bfefrmtrm_nm: None,
            bfefrmtrm_amount: None,
            currency: "KRW".into(),
        }
    }

    #[test]
    fn no_rows_yields_single_synthetic_item() {
        let assessment = evaluate(&[], "00126380", 2024, ReportCode::Annual);
        assert_eq!(assessment.items.len(), 1);
        assert_eq!(assessment.items[0].item_number, 0);
        assert!(assessment.items[0].is_at_risk);
    }

    #[test]
    fn item_1_detects_fifty_percent_revenue_decline() {
        let rows = vec![row("매출액", Some("1,000,000,000"), Some("2,000,000,000"))];
        let assessment = evaluate(&rows, "00126380", 2024, ReportCode::Annual);
        let item = &assessment.items[0];
        assert_eq!(item.item_number, 1);
        assert!(item.is_at_risk);
        assert_eq!(item.actual_value, "-50.00%");
    }

    #[test]
    fn item_11_flags_capital_impairment_with_negative_equity() {
        let rows = vec![
            row("부채총계", Some("500"), None),
            row("자본총계", Some("-100"), None),
        ];
        let assessment = evaluate(&rows, "00126380", 2024, ReportCode::Annual);
        let item = assessment
            .items
            .iter()
            .find(|item| item.item_number == 11)
            .unwrap();
        assert!(item.is_at_risk);
        assert_eq!(item.actual_value, "자본잠식 -100");
        assert_eq!(item.notes.as_deref(), Some("자본총계가 음수(자본잠식)"));
    }

    #[test]
    fn item_4_treats_zero_revenue_with_positive_receivables_as_extreme_risk() {
        let rows = vec![row("매출채권", Some("100"), None), row("매출액", Some("0"), None)];
        let assessment = evaluate(&rows, "00126380", 2024, ReportCode::Annual);
        let item = assessment
            .items
            .iter()
            .find(|item| item.item_number == 4)
            .unwrap();
        assert!(item.is_at_risk);
    }

    #[test]
    fn item_3_zero_receivables_is_not_at_risk() {
        let rows = vec![row("매출채권", Some("0"), None), row("매출액", Some("100"), None)];
        let assessment = evaluate(&rows, "00126380", 2024, ReportCode::Annual);
        let item = assessment
            .items
            .iter()
            .find(|item| item.item_number == 3)
            .unwrap();
        assert!(!item.is_at_risk);
        assert_eq!(item.actual_value, DATA_UNAVAILABLE);
    }

    #[test]
    fn item_5_zero_payables_is_not_at_risk() {
        let rows = vec![row("매입채무", Some("0"), None), row("매출액", Some("100"), None)];
        let assessment = evaluate(&rows, "00126380", 2024, ReportCode::Annual);
        let item = assessment
            .items
            .iter()
            .find(|item| item.item_number == 5)
            .unwrap();
        assert!(!item.is_at_risk);
        assert_eq!(item.actual_value, DATA_UNAVAILABLE);
    }

    #[test]
    fn item_2_skips_change_computation_when_prior_operating_income_non_positive() {
        let rows = vec![row("영업이익", Some("100"), Some("-50"))];
        let assessment = evaluate(&rows, "00126380", 2024, ReportCode::Annual);
        let item = assessment
            .items
            .iter()
            .find(|item| item.item_number == 2)
            .unwrap();
        assert!(!item.is_at_risk);
        assert_eq!(item.actual_value, DATA_UNAVAILABLE);
    }

    #[test]
    fn missing_accounts_yield_data_unavailable_without_panicking() {
        let rows = vec![row("매출액", Some("100"), None)];
        let assessment = evaluate(&rows, "00126380", 2024, ReportCode::Annual);
        let item6 = assessment
            .items
            .iter()
            .find(|item| item.item_number == 6)
            .unwrap();
        assert_eq!(item6.actual_value, DATA_UNAVAILABLE);
        assert!(!item6.is_at_risk);
    }
}
