#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Display;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use thiserror::Error;

mod memory;

pub use crate::memory::InMemoryPersistence;

pub type CorpCode = String;
pub type ReceiptNo = String;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Owner of a partner-scoped record, modeled as a tagged variant rather than
/// two nullable columns in memory. The two-column shape is kept only at the
/// `(headquarters_id, partner_id)` storage boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerRef {
    Headquarters(i64),
    Partner(i64),
}

impl OwnerRef {
    #[must_use]
    pub fn headquarters_id(&self) -> Option<i64> {
        match self {
            OwnerRef::Headquarters(id) => Some(*id),
            OwnerRef::Partner(_) => None,
        }
    }

    #[must_use]
    pub fn partner_id(&self) -> Option<i64> {
        match self {
            OwnerRef::Headquarters(_) => None,
            OwnerRef::Partner(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOwnerType {
    Headquarters,
    Partner,
    Unknown,
}

impl Display for ProfileOwnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileOwnerType::Headquarters => write!(f, "HEADQUARTERS"),
            ProfileOwnerType::Partner => write!(f, "PARTNER"),
            ProfileOwnerType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpCodeEntry {
    pub corp_code: CorpCode,
    pub corp_name: String,
    pub corp_name_eng: Option<String>,
    pub stock_code: Option<String>,
    pub modify_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompanyProfile {
    pub id: i64,
    pub corp_code: CorpCode,
    pub corp_name: String,
    pub corp_name_eng: Option<String>,
    pub stock_code: Option<String>,
    pub stock_name: Option<String>,
    pub ceo_name: Option<String>,
    pub market_class: Option<String>,
    pub business_number: Option<String>,
    pub registration_number: Option<String>,
    pub address: Option<String>,
    pub homepage_url: Option<String>,
    pub ir_url: Option<String>,
    pub phone_number: Option<String>,
    pub fax_number: Option<String>,
    pub industry_code: Option<String>,
    pub establishment_date: Option<String>,
    pub accounting_month: Option<String>,
    pub headquarters_id: Option<i64>,
    pub partner_id: Option<i64>,
    pub user_type: Option<ProfileOwnerType>,
}

impl Default for ProfileOwnerType {
    fn default() -> Self {
        ProfileOwnerType::Unknown
    }
}

impl CompanyProfile {
    /// Count of descriptive fields present and non-empty, used to pick the
    /// canonical row among duplicate profiles for the same corp_code.
    #[must_use]
    pub fn completeness_score(&self) -> usize {
        let fields: [Option<&String>; 11] = [
            Some(&self.corp_name).filter(|v| !v.trim().is_empty()),
            self.ceo_name.as_ref(),
            self.address.as_ref(),
            self.phone_number.as_ref(),
            self.business_number.as_ref(),
            self.industry_code.as_ref(),
            self.establishment_date.as_ref(),
            self.accounting_month.as_ref(),
            self.corp_name_eng.as_ref(),
            self.stock_code.as_ref(),
            self.homepage_url.as_ref(),
        ];
        fields
            .iter()
            .filter(|field| field.is_some_and(|value| !value.trim().is_empty()))
            .count()
            + usize::from(self.fax_number.as_ref().is_some_and(|v| !v.trim().is_empty()))
    }

    pub fn validate(&self) -> PersistenceResult<()> {
        let owner_type = self.user_type.unwrap_or_default();
        if owner_type != ProfileOwnerType::Unknown
            && self.headquarters_id.is_some() == self.partner_id.is_some()
        {
            return Err(PersistenceError::Validation(
                "exactly one of headquarters_id/partner_id must be set".into(),
            ));
        }
        Ok(())
    }

    /// Fills blank fields on `self` with non-blank values from `incoming`,
    /// leaving already-populated fields untouched.
    pub fn merge_from(&mut self, incoming: &CompanyProfile) {
        macro_rules! fill {
            ($field:ident) => {
                if self.$field.is_none() {
                    self.$field = incoming.$field.clone();
                }
            };
        }
        fill!(corp_name_eng);
        fill!(stock_code);
        fill!(stock_name);
        fill!(ceo_name);
        fill!(market_class);
        fill!(business_number);
        fill!(registration_number);
        fill!(address);
        fill!(homepage_url);
        fill!(ir_url);
        fill!(phone_number);
        fill!(fax_number);
        fill!(industry_code);
        fill!(establishment_date);
        fill!(accounting_month);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    pub receipt_no: ReceiptNo,
    pub corp_code: CorpCode,
    pub corp_name: String,
    pub stock_code: Option<String>,
    pub corp_class: Option<String>,
    pub report_name: String,
    pub submitter_name: Option<String>,
    pub receipt_date: NaiveDate,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportCode {
    Annual = 11011,
    Half = 11012,
    Q1 = 11013,
    Q3 = 11014,
}

impl ReportCode {
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> PersistenceResult<Self> {
        match code {
            11011 => Ok(ReportCode::Annual),
            11012 => Ok(ReportCode::Half),
            11013 => Ok(ReportCode::Q1),
            11014 => Ok(ReportCode::Q3),
            other => Err(PersistenceError::Validation(format!(
                "unknown report_code {other}"
            ))),
        }
    }
}

impl Display for ReportCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Separate vs consolidated financial statements — the `fs_div` fetch
/// parameter. Constant across every row returned by a single
/// `get_financial_statement` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsDivision {
    Ofs,
    Cfs,
}

impl Display for FsDivision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FsDivision::Ofs => write!(f, "OFS"),
            FsDivision::Cfs => write!(f, "CFS"),
        }
    }
}

/// Sub-statement within a filing — the wire's `sj_div` (balance sheet vs
/// income statement vs ...). Varies per row within the same filing, unlike
/// `FsDivision`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatementDivision {
    BalanceSheet,
    IncomeStatement,
    ComprehensiveIncome,
    CashFlow,
    EquityChanges,
    Other(String),
}

impl Display for StatementDivision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementDivision::BalanceSheet => write!(f, "BS"),
            StatementDivision::IncomeStatement => write!(f, "IS"),
            StatementDivision::ComprehensiveIncome => write!(f, "CIS"),
            StatementDivision::CashFlow => write!(f, "CF"),
            StatementDivision::EquityChanges => write!(f, "SCE"),
            StatementDivision::Other(raw) => write!(f, "{raw}"),
        }
    }
}

impl StatementDivision {
    /// Parses a DART `sj_div` code (`BS1`, `IS2`, `CIS1`, `CF1`, `SCE1`, ...);
    /// the trailing digit only distinguishes entity structure and is not
    /// part of this axis, so it is dropped.
    #[must_use]
    pub fn from_sj_div(raw: &str) -> Self {
        let prefix = raw.trim_end_matches(|c: char| c.is_ascii_digit());
        match prefix {
            "BS" => StatementDivision::BalanceSheet,
            "IS" => StatementDivision::IncomeStatement,
            "CIS" => StatementDivision::ComprehensiveIncome,
            "CF" => StatementDivision::CashFlow,
            "SCE" => StatementDivision::EquityChanges,
            _ => StatementDivision::Other(raw.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialStatementRow {
    pub corp_code: CorpCode,
    pub business_year: i32,
    pub report_code: ReportCode,
    pub fs_division: FsDivision,
    pub statement_division: StatementDivision,
    pub account_id: String,
    pub account_name: String,
    pub thstrm_nm: Option<String>,
    pub thstrm_amount: Option<String>,
    pub frmtrm_nm: Option<String>,
    pub frmtrm_amount: Option<String>,
    pub thstrm_add_amount: Option<String>,
    pub frmtrm_add_amount: Option<String>,
    pub bfefrmtrm_nm: Option<String>,
    pub bfefrmtrm_amount: Option<String>,
    pub currency: String,
}

impl FinancialStatementRow {
    #[must_use]
    pub fn dedupe_key(&self) -> (String, StatementDivision) {
        (self.account_id.clone(), self.statement_division.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerCompany {
    pub id: String,
    pub corp_code: CorpCode,
    pub owner: OwnerRef,
    pub contract_start_date: NaiveDate,
    pub status: PartnerStatus,
    pub account_created: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[must_use]
pub fn normalize_company_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[async_trait]
pub trait CorpCodeDirectoryStore: Send + Sync {
    async fn find_by_corp_code(&self, corp_code: &str) -> PersistenceResult<Option<CorpCodeEntry>>;
    async fn find_by_corp_name_containing_ignore_case(
        &self,
        fragment: &str,
    ) -> PersistenceResult<Vec<CorpCodeEntry>>;
    /// Replaces the whole directory snapshot with `entries`; idempotent for
    /// identical upstream bytes.
    async fn replace_all(&self, entries: Vec<CorpCodeEntry>) -> PersistenceResult<()>;
}

#[async_trait]
pub trait CompanyProfileStore: Send + Sync {
    async fn find_by_corp_code(&self, corp_code: &str) -> PersistenceResult<Option<CompanyProfile>>;
    async fn find_all_by_corp_code(&self, corp_code: &str) -> PersistenceResult<Vec<CompanyProfile>>;
    async fn find_by_owner_and_corp_code(
        &self,
        owner: OwnerRef,
        corp_code: &str,
    ) -> PersistenceResult<Option<CompanyProfile>>;
    async fn upsert(&self, profile: CompanyProfile) -> PersistenceResult<CompanyProfile>;
}

#[async_trait]
pub trait DisclosureStore: Send + Sync {
    async fn exists_by_receipt_no(&self, receipt_no: &str) -> PersistenceResult<bool>;
    /// Returns `true` when a new row was inserted, `false` on a conflicting
    /// `receipt_no` that was silently ignored.
    async fn insert_if_absent(&self, disclosure: Disclosure) -> PersistenceResult<bool>;
}

#[async_trait]
pub trait FinancialStatementRowStore: Send + Sync {
    async fn find_by_corp_and_year_and_report(
        &self,
        corp_code: &str,
        business_year: i32,
        report_code: ReportCode,
    ) -> PersistenceResult<Vec<FinancialStatementRow>>;
    /// Inserts only rows whose `(account_id, statement_division)` key is not
    /// already present for the same `(corp_code, business_year, report_code)`;
    /// returns the count actually inserted.
    async fn bulk_insert(&self, rows: Vec<FinancialStatementRow>) -> PersistenceResult<usize>;
    async fn distinct_periods(&self, corp_code: &str) -> PersistenceResult<Vec<(i32, ReportCode, usize)>>;
}

#[async_trait]
pub trait PartnerCompanyStore: Send + Sync {
    async fn find_active_by_owner_and_name(
        &self,
        owner: OwnerRef,
        name: &str,
    ) -> PersistenceResult<Option<PartnerCompany>>;
    async fn find_inactive_by_owner_and_name(
        &self,
        owner: OwnerRef,
        name: &str,
    ) -> PersistenceResult<Option<PartnerCompany>>;
    async fn find_by_id(&self, id: &str) -> PersistenceResult<Option<PartnerCompany>>;
    async fn upsert(&self, partner: PartnerCompany) -> PersistenceResult<PartnerCompany>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completeness_score_counts_non_empty_fields() {
        let profile = CompanyProfile {
            corp_name: "삼성전자(주)".into(),
            ceo_name: Some("홍길동".into()),
            address: Some("서울".into()),
            ..Default::default()
        };
        assert_eq!(profile.completeness_score(), 3);
    }

    #[test]
    fn validate_rejects_both_owner_ids_set() {
        let profile = CompanyProfile {
            corp_name: "x".into(),
            headquarters_id: Some(1),
            partner_id: Some(2),
            user_type: Some(ProfileOwnerType::Headquarters),
            ..Default::default()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn validate_allows_unknown_with_no_owner() {
        let profile = CompanyProfile {
            corp_name: "x".into(),
            user_type: Some(ProfileOwnerType::Unknown),
            ..Default::default()
        };
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn merge_from_fills_only_blank_fields() {
        let mut target = CompanyProfile {
            corp_name: "x".into(),
            ceo_name: Some("existing".into()),
            ..Default::default()
        };
        let incoming = CompanyProfile {
            corp_name: "x".into(),
            ceo_name: Some("new".into()),
            address: Some("seoul".into()),
            ..Default::default()
        };
        target.merge_from(&incoming);
        assert_eq!(target.ceo_name.as_deref(), Some("existing"));
        assert_eq!(target.address.as_deref(), Some("seoul"));
    }
}
