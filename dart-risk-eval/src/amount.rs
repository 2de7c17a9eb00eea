use dart_persistence::FinancialStatementRow;
use rust_decimal::Decimal;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountField {
    ThstrmAmount,
    FrmtrmAmount,
    ThstrmAddAmount,
    FrmtrmAddAmount,
}

impl AmountField {
    fn read(self, row: &FinancialStatementRow) -> Option<String> {
        match self {
            AmountField::ThstrmAmount => row.thstrm_amount.clone(),
            AmountField::FrmtrmAmount => row.frmtrm_amount.clone(),
            AmountField::ThstrmAddAmount => row.thstrm_add_amount.clone(),
            AmountField::FrmtrmAddAmount => row.frmtrm_add_amount.clone(),
        }
    }
}

/// Finds the first row whose `account_name` exactly matches and parses the
/// requested period field as an arbitrary-precision decimal. `""`, absent,
/// and `"-"` are treated as absent data, never as zero. Parse failures are
/// logged and treated as absent rather than propagated.
pub fn lookup_amount(rows: &[FinancialStatementRow], account_name: &str, field: AmountField) -> Option<Decimal> {
    let row = rows.iter().find(|row| row.account_name == account_name)?;
    let raw = field.read(row)?;
    parse_amount(&raw)
}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    let cleaned = trimmed.replace(',', "");
    match cleaned.parse::<Decimal>() {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(raw, error = %err, "failed to parse financial statement amount, treating as absent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn row(account_name: &str, thstrm: &str) -> FinancialStatementRow {
        FinancialStatementRow {
            corp_code: "00126380".into(),
            business_year: 2024,
            report_code: dart_persistence::ReportCode::Annual,
            fs_division: dart_persistence::FsDivision::Ofs,
            statement_division: dart_persistence::StatementDivision::IncomeStatement,
            account_id: "acct".into(),
            account_name: account_name.into(),
            thstrm_nm: None,
            thstrm_amount: Some(thstrm.into()),
            frmtrm_nm: None,
            frmtrm_amount: None,
            thstrm_add_amount: None,
            frmtrm_add_amount: None,
            bfefrmtrm_nm: None,
            bfefrmtrm_amount: None,
            currency: "KRW".into(),
        }
    }

    #[test]
    fn strips_commas_and_parses() {
        let rows = vec![row("매출액", "1,000,000,000")];
        assert_eq!(
            lookup_amount(&rows, "매출액", AmountField::ThstrmAmount),
            Some(dec!(1000000000))
        );
    }

    #[test]
    fn dash_and_blank_are_absent_not_zero() {
        let rows = vec![row("매출액", "-")];
        assert_eq!(lookup_amount(&rows, "매출액", AmountField::ThstrmAmount), None);
        let rows = vec![row("매출액", "")];
        assert_eq!(lookup_amount(&rows, "매출액", AmountField::ThstrmAmount), None);
    }

    #[test]
    fn unparseable_values_are_treated_as_absent() {
        let rows = vec![row("매출액", "N/A")];
        assert_eq!(lookup_amount(&rows, "매출액", AmountField::ThstrmAmount), None);
    }
}
