use std::collections::HashMap;
use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::CompanyProfile;
use crate::CompanyProfileStore;
use crate::CorpCode;
use crate::CorpCodeDirectoryStore;
use crate::CorpCodeEntry;
use crate::Disclosure;
use crate::DisclosureStore;
use crate::FinancialStatementRow;
use crate::FinancialStatementRowStore;
use crate::OwnerRef;
use crate::PartnerCompany;
use crate::PartnerCompanyStore;
use crate::PartnerStatus;
use crate::PersistenceResult;
use crate::ReceiptNo;
use crate::ReportCode;
use crate::normalize_company_name;

#[derive(Default)]
struct State {
    corp_codes: HashMap<CorpCode, CorpCodeEntry>,
    profiles: HashMap<i64, CompanyProfile>,
    next_profile_id: i64,
    disclosures: HashMap<ReceiptNo, Disclosure>,
    statement_rows: HashMap<(CorpCode, i32, ReportCode), Vec<FinancialStatementRow>>,
    partners: HashMap<String, PartnerCompany>,
}

/// In-memory reference implementation of every store trait in this crate,
/// guarded by a single lock per entity family so unrelated entities never
/// contend with one another.
#[derive(Default)]
pub struct InMemoryPersistence {
    state: Mutex<State>,
}

impl InMemoryPersistence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_profile_id(state: &mut State) -> i64 {
        state.next_profile_id += 1;
        state.next_profile_id
    }
}

#[async_trait]
impl CorpCodeDirectoryStore for InMemoryPersistence {
    async fn find_by_corp_code(&self, corp_code: &str) -> PersistenceResult<Option<CorpCodeEntry>> {
        let state = self.state.lock().await;
        Ok(state.corp_codes.get(corp_code).cloned())
    }

    async fn find_by_corp_name_containing_ignore_case(
        &self,
        fragment: &str,
    ) -> PersistenceResult<Vec<CorpCodeEntry>> {
        let needle = fragment.to_lowercase();
        let state = self.state.lock().await;
        Ok(state
            .corp_codes
            .values()
            .filter(|entry| entry.corp_name.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn replace_all(&self, entries: Vec<CorpCodeEntry>) -> PersistenceResult<()> {
        let mut state = self.state.lock().await;
        state.corp_codes = entries
            .into_iter()
            .map(|entry| (entry.corp_code.clone(), entry))
            .collect();
        Ok(())
    }
}

#[async_trait]
impl CompanyProfileStore for InMemoryPersistence {
    async fn find_by_corp_code(&self, corp_code: &str) -> PersistenceResult<Option<CompanyProfile>> {
        let state = self.state.lock().await;
        Ok(highest_completeness(&state, corp_code))
    }

    async fn find_all_by_corp_code(&self, corp_code: &str) -> PersistenceResult<Vec<CompanyProfile>> {
        let state = self.state.lock().await;
        Ok(state
            .profiles
            .values()
            .filter(|profile| profile.corp_code == corp_code)
            .cloned()
            .collect())
    }

    async fn find_by_owner_and_corp_code(
        &self,
        owner: OwnerRef,
        corp_code: &str,
    ) -> PersistenceResult<Option<CompanyProfile>> {
        let state = self.state.lock().await;
        Ok(state
            .profiles
            .values()
            .find(|profile| profile.corp_code == corp_code && owner_matches(profile, owner))
            .cloned())
    }

    async fn upsert(&self, mut profile: CompanyProfile) -> PersistenceResult<CompanyProfile> {
        profile.validate()?;
        let mut state = self.state.lock().await;
        if profile.id == 0 {
            profile.id = Self::next_profile_id(&mut state);
        }
        state.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }
}

fn owner_matches(profile: &CompanyProfile, owner: OwnerRef) -> bool {
    match owner {
        OwnerRef::Headquarters(id) => profile.headquarters_id == Some(id),
        OwnerRef::Partner(id) => profile.partner_id == Some(id),
    }
}

fn highest_completeness(state: &State, corp_code: &str) -> Option<CompanyProfile> {
    state
        .profiles
        .values()
        .filter(|profile| profile.corp_code == corp_code)
        .max_by(|a, b| {
            a.completeness_score()
                .cmp(&b.completeness_score())
                .then(b.id.cmp(&a.id))
        })
        .cloned()
}

#[async_trait]
impl DisclosureStore for InMemoryPersistence {
    async fn exists_by_receipt_no(&self, receipt_no: &str) -> PersistenceResult<bool> {
        let state = self.state.lock().await;
        Ok(state.disclosures.contains_key(receipt_no))
    }

    async fn insert_if_absent(&self, disclosure: Disclosure) -> PersistenceResult<bool> {
        let mut state = self.state.lock().await;
        if state.disclosures.contains_key(&disclosure.receipt_no) {
            return Ok(false);
        }
        state
            .disclosures
            .insert(disclosure.receipt_no.clone(), disclosure);
        Ok(true)
    }
}

#[async_trait]
impl FinancialStatementRowStore for InMemoryPersistence {
    async fn find_by_corp_and_year_and_report(
        &self,
        corp_code: &str,
        business_year: i32,
        report_code: ReportCode,
    ) -> PersistenceResult<Vec<FinancialStatementRow>> {
        let state = self.state.lock().await;
        let key = (corp_code.to_owned(), business_year, report_code);
        Ok(state.statement_rows.get(&key).cloned().unwrap_or_default())
    }

    async fn bulk_insert(&self, rows: Vec<FinancialStatementRow>) -> PersistenceResult<usize> {
        let mut state = self.state.lock().await;
        let mut inserted = 0usize;
        for row in rows {
            let key = (row.corp_code.clone(), row.business_year, row.report_code);
            let existing_keys: HashSet<(String, crate::StatementDivision)> = state
                .statement_rows
                .get(&key)
                .map(|existing| existing.iter().map(FinancialStatementRow::dedupe_key).collect())
                .unwrap_or_default();
            if existing_keys.contains(&row.dedupe_key()) {
                continue;
            }
            state.statement_rows.entry(key).or_default().push(row);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn distinct_periods(&self, corp_code: &str) -> PersistenceResult<Vec<(i32, ReportCode, usize)>> {
        let state = self.state.lock().await;
        let mut periods: Vec<(i32, ReportCode, usize)> = state
            .statement_rows
            .iter()
            .filter(|((code, _, _), _)| code == corp_code)
            .map(|((_, year, report), rows)| (*year, *report, rows.len()))
            .collect();
        periods.sort_by(|a, b| b.0.cmp(&a.0).then(b.1.cmp(&a.1)));
        Ok(periods)
    }
}

#[async_trait]
impl PartnerCompanyStore for InMemoryPersistence {
    async fn find_active_by_owner_and_name(
        &self,
        owner: OwnerRef,
        name: &str,
    ) -> PersistenceResult<Option<PartnerCompany>> {
        find_by_owner_name_status(self, owner, name, PartnerStatus::Active).await
    }

    async fn find_inactive_by_owner_and_name(
        &self,
        owner: OwnerRef,
        name: &str,
    ) -> PersistenceResult<Option<PartnerCompany>> {
        find_by_owner_name_status(self, owner, name, PartnerStatus::Inactive).await
    }

    async fn find_by_id(&self, id: &str) -> PersistenceResult<Option<PartnerCompany>> {
        let state = self.state.lock().await;
        Ok(state.partners.get(id).cloned())
    }

    async fn upsert(&self, partner: PartnerCompany) -> PersistenceResult<PartnerCompany> {
        let mut state = self.state.lock().await;
        state.partners.insert(partner.id.clone(), partner.clone());
        Ok(partner)
    }
}

async fn find_by_owner_name_status(
    store: &InMemoryPersistence,
    owner: OwnerRef,
    name: &str,
    status: PartnerStatus,
) -> PersistenceResult<Option<PartnerCompany>> {
    let normalized = normalize_company_name(name);
    let state = store.state.lock().await;
    let profiles = &state.profiles;
    Ok(state
        .partners
        .values()
        .find(|partner| {
            partner.owner == owner
                && partner.status == status
                && profiles
                    .values()
                    .any(|profile| {
                        profile.corp_code == partner.corp_code
                            && normalize_company_name(&profile.corp_name) == normalized
                    })
        })
        .cloned())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    use super::*;
    use crate::FsDivision;
    use crate::ProfileOwnerType;
    use crate::StatementDivision;

    fn sample_profile(corp_code: &str, score_fields: usize) -> CompanyProfile {
        let mut profile = CompanyProfile {
            corp_code: corp_code.into(),
            corp_name: "삼성전자(주)".into(),
            user_type: Some(ProfileOwnerType::Unknown),
            ..Default::default()
        };
        if score_fields > 0 {
            profile.ceo_name = Some("CEO".into());
        }
        if score_fields > 1 {
            profile.address = Some("Seoul".into());
        }
        profile
    }

    #[tokio::test]
    async fn find_by_corp_code_picks_highest_completeness() {
        let store = InMemoryPersistence::new();
        store.upsert(sample_profile("00126380", 0)).await.unwrap();
        store.upsert(sample_profile("00126380", 2)).await.unwrap();

        let canonical = CompanyProfileStore::find_by_corp_code(&store, "00126380")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(canonical.completeness_score(), 3);
    }

    #[tokio::test]
    async fn insert_if_absent_is_idempotent_on_receipt_no() {
        let store = InMemoryPersistence::new();
        let disclosure = Disclosure {
            receipt_no: "2024000001".into(),
            corp_code: "00126380".into(),
            corp_name: "삼성전자(주)".into(),
            stock_code: Some("005930".into()),
            corp_class: None,
            report_name: "분기보고서".into(),
            submitter_name: None,
            receipt_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            remark: None,
        };
        assert!(
            store
                .insert_if_absent(disclosure.clone())
                .await
                .unwrap()
        );
        assert!(!store.insert_if_absent(disclosure).await.unwrap());
    }

    fn sample_row(account_id: &str, statement_division: StatementDivision) -> FinancialStatementRow {
        FinancialStatementRow {
            corp_code: "00126380".into(),
            business_year: 2023,
            report_code: ReportCode::Annual,
            fs_division: FsDivision::Ofs,
            statement_division,
            account_id: account_id.into(),
            account_name: "매출액".into(),
            thstrm_nm: None,
            thstrm_amount: Some("1,000,000,000".into()),
            frmtrm_nm: None,
            frmtrm_amount: None,
            thstrm_add_amount: None,
            frmtrm_add_amount: None,
            bfefrmtrm_nm: None,
            bfefrmtrm_amount: None,
            currency: "KRW".into(),
        }
    }

    #[tokio::test]
    async fn bulk_insert_skips_existing_account_keys() {
        let store = InMemoryPersistence::new();
        let row = sample_row("ifrs-full_Revenue", StatementDivision::IncomeStatement);
        let inserted_first = store.bulk_insert(vec![row.clone()]).await.unwrap();
        let inserted_second = store.bulk_insert(vec![row]).await.unwrap();
        assert_eq!(inserted_first, 1);
        assert_eq!(inserted_second, 0);
    }

    #[tokio::test]
    async fn bulk_insert_keeps_same_account_id_on_different_statement_divisions() {
        let store = InMemoryPersistence::new();
        let balance_sheet_row = sample_row("ifrs-full_Total", StatementDivision::BalanceSheet);
        let income_statement_row = sample_row("ifrs-full_Total", StatementDivision::IncomeStatement);
        let inserted = store
            .bulk_insert(vec![balance_sheet_row, income_statement_row])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
    }

    #[tokio::test]
    async fn partner_lookup_is_scoped_by_owner_and_name() {
        let store = InMemoryPersistence::new();
        store
            .upsert(sample_profile("00126380", 1))
            .await
            .unwrap();
        let now = Utc::now();
        let partner = PartnerCompany {
            id: Uuid::new_v4().to_string(),
            corp_code: "00126380".into(),
            owner: OwnerRef::Headquarters(1),
            contract_start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: PartnerStatus::Active,
            account_created: false,
            created_at: now,
            updated_at: now,
        };
        PartnerCompanyStore::upsert(&store, partner).await.unwrap();

        let found = store
            .find_active_by_owner_and_name(OwnerRef::Headquarters(1), "삼성전자(주)")
            .await
            .unwrap();
        assert!(found.is_some());

        let not_found = store
            .find_active_by_owner_and_name(OwnerRef::Headquarters(2), "삼성전자(주)")
            .await
            .unwrap();
        assert!(not_found.is_none());
    }
}
