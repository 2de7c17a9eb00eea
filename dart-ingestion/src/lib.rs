#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use chrono::Datelike;
use chrono::Duration as ChronoDuration;
use chrono::NaiveDate;
use chrono::Utc;
use dart_eds_client::EdsClient;
use dart_eds_client::EdsCompanyProfile;
use dart_event_bus::PartnerEvent;
use dart_event_bus::PartnerEventConsumer;
use dart_persistence::CompanyProfile;
use dart_persistence::CompanyProfileStore;
use dart_persistence::CorpCodeDirectoryStore;
use dart_persistence::DisclosureStore;
use dart_persistence::FinancialStatementRowStore;
use dart_persistence::FsDivision;
use dart_persistence::PersistenceError;
use dart_persistence::ProfileOwnerType;
use dart_persistence::ReportCode;
use thiserror::Error;
use tracing::info;
use tracing::info_span;
use tracing::warn;

pub type IngestionResult<T> = Result<T, IngestionError>;

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PersistenceError> for IngestionError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(msg) => IngestionError::NotFound(msg),
            PersistenceError::Validation(msg) | PersistenceError::Internal(msg) => {
                IngestionError::Internal(msg)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub statement_lookback_days: i64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            statement_lookback_days: 365,
        }
    }
}

/// Outcome of processing a single `PartnerEvent`, kept for observability and
/// test assertions; the coordinator itself never panics on a bad event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestionOutcome {
    pub skipped: bool,
    pub profile: Option<CompanyProfile>,
    pub disclosures_inserted: usize,
    pub statements_inserted: usize,
    pub aborted_reason: Option<String>,
}

pub struct IngestionCoordinator {
    eds: Arc<dyn EdsClient>,
    profiles: Arc<dyn CompanyProfileStore>,
    directory: Arc<dyn CorpCodeDirectoryStore>,
    disclosures: Arc<dyn DisclosureStore>,
    statements: Arc<dyn FinancialStatementRowStore>,
    config: CoordinatorConfig,
}

impl IngestionCoordinator {
    #[must_use]
    pub fn new(
        eds: Arc<dyn EdsClient>,
        profiles: Arc<dyn CompanyProfileStore>,
        directory: Arc<dyn CorpCodeDirectoryStore>,
        disclosures: Arc<dyn DisclosureStore>,
        statements: Arc<dyn FinancialStatementRowStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            eds,
            profiles,
            directory,
            disclosures,
            statements,
            config,
        }
    }

    /// Consumes events from `consumer` until the inbound topic closes,
    /// processing each one with `Utc::now` as the event's `today`. Events
    /// that raise unexpected errors are logged and acknowledged; no retry
    /// loop runs here, redelivery is the bus's responsibility.
    pub async fn run(&self, consumer: Arc<dyn PartnerEventConsumer>) {
        while let Some(event) = consumer.recv().await {
            let outcome = self.process_event(&event, Utc::now().date_naive()).await;
            if let Some(reason) = outcome.aborted_reason {
                warn!(reason, "partner event processing aborted after step 1");
            }
        }
    }

    /// Runs the full per-event transaction: profile reconciliation (which
    /// can abort the remaining steps), then disclosure refresh and
    /// statement refresh, each independently best-effort.
    pub async fn process_event(&self, event: &PartnerEvent, today: NaiveDate) -> IngestionOutcome {
        let Some(corp_code) = event.corp_code.clone().filter(|code| !code.is_empty()) else {
            return IngestionOutcome {
                skipped: true,
                ..Default::default()
            };
        };

        let span = info_span!("process_partner_event", corp_code = %corp_code);
        let _entered = span.enter();

        let profile = match self.reconcile_profile(&corp_code).await {
            Ok(profile) => profile,
            Err(err) => {
                return IngestionOutcome {
                    aborted_reason: Some(err.to_string()),
                    ..Default::default()
                };
            }
        };

        let disclosures_inserted = self.refresh_disclosures(&corp_code, today).await;
        let statements_inserted = self.refresh_statements(&corp_code, today).await;

        IngestionOutcome {
            skipped: false,
            profile: Some(profile),
            disclosures_inserted,
            statements_inserted,
            aborted_reason: None,
        }
    }

    async fn reconcile_profile(&self, corp_code: &str) -> IngestionResult<CompanyProfile> {
        let mut existing = self.profiles.find_all_by_corp_code(corp_code).await?;
        existing.sort_by(|a, b| {
            b.completeness_score()
                .cmp(&a.completeness_score())
                .then(a.id.cmp(&b.id))
        });
        for duplicate in existing.iter().skip(1) {
            info!(corp_code, duplicate_id = duplicate.id, "ignoring duplicate company profile");
        }

        if let Some(mut canonical) = existing.into_iter().next() {
            if lacks_required_fields(&canonical)
                && let Ok(Some(fetched)) = self.eds.get_company_profile(corp_code).await
            {
                apply_enrichment(&mut canonical, &fetched);
                canonical = self.profiles.upsert(canonical).await?;
            }
            return Ok(canonical);
        }

        if let Ok(Some(fetched)) = self.eds.get_company_profile(corp_code).await {
            let mut profile = CompanyProfile {
                corp_code: corp_code.to_owned(),
                user_type: Some(ProfileOwnerType::Unknown),
                ..Default::default()
            };
            apply_enrichment(&mut profile, &fetched);
            return Ok(self.profiles.upsert(profile).await?);
        }

        let corp_name = self
            .directory
            .find_by_corp_code(corp_code)
            .await?
            .map(|entry| entry.corp_name)
            .unwrap_or_else(|| corp_code.to_owned());
        let profile = CompanyProfile {
            corp_code: corp_code.to_owned(),
            corp_name,
            user_type: Some(ProfileOwnerType::Unknown),
            ..Default::default()
        };
        Ok(self.profiles.upsert(profile).await?)
    }

    async fn refresh_disclosures(&self, corp_code: &str, today: NaiveDate) -> usize {
        let begin = today - ChronoDuration::days(self.config.statement_lookback_days);
        let disclosures = match self.eds.search_disclosures(corp_code, begin, today).await {
            Ok(disclosures) => disclosures,
            Err(err) => {
                warn!(corp_code, error = %err, "disclosure refresh failed, continuing");
                return 0;
            }
        };
        let mut inserted = 0usize;
        for disclosure in disclosures {
            match self.disclosures.insert_if_absent(disclosure).await {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(err) => warn!(corp_code, error = %err, "disclosure insert failed"),
            }
        }
        inserted
    }

    async fn refresh_statements(&self, corp_code: &str, today: NaiveDate) -> usize {
        let mut inserted = 0usize;
        for (business_year, report_code) in default_statement_plan(today) {
            let rows = match self
                .eds
                .get_financial_statement(corp_code, business_year, report_code, FsDivision::Ofs)
                .await
            {
                Ok(rows) => rows,
                Err(err) => {
                    warn!(corp_code, business_year, %report_code, error = %err, "statement fetch failed, continuing");
                    continue;
                }
            };
            match self.statements.bulk_insert(rows).await {
                Ok(count) => inserted += count,
                Err(err) => warn!(corp_code, business_year, %report_code, error = %err, "statement insert failed"),
            }
        }
        inserted
    }
}

/// Year-ordered, fixed refresh plan: last year's annual filing, then this
/// year's three interim filings in Q3/half/Q1 order, matching the sequence
/// the upstream system walks.
#[must_use]
pub fn default_statement_plan(today: NaiveDate) -> Vec<(i32, ReportCode)> {
    let year = today.year();
    vec![
        (year - 1, ReportCode::Annual),
        (year, ReportCode::Q3),
        (year, ReportCode::Half),
        (year, ReportCode::Q1),
    ]
}

fn lacks_required_fields(profile: &CompanyProfile) -> bool {
    let fields = [
        &profile.ceo_name,
        &profile.address,
        &profile.phone_number,
        &profile.business_number,
        &profile.industry_code,
    ];
    fields.iter().any(|field| field.as_deref().is_none_or(str::is_empty))
}

fn apply_enrichment(profile: &mut CompanyProfile, fetched: &EdsCompanyProfile) {
    if !fetched.corp_name.trim().is_empty() {
        profile.corp_name = fetched.corp_name.clone();
    }
    profile.corp_name_eng = fetched.corp_name_eng.clone().or_else(|| profile.corp_name_eng.clone());
    profile.stock_code = fetched.stock_code.clone().or_else(|| profile.stock_code.clone());
    profile.stock_name = fetched.stock_name.clone().or_else(|| profile.stock_name.clone());
    profile.ceo_name = fetched.ceo_name.clone().or_else(|| profile.ceo_name.clone());
    profile.market_class = fetched.market_class.clone().or_else(|| profile.market_class.clone());
    profile.business_number = fetched
        .business_number
        .clone()
        .or_else(|| profile.business_number.clone());
    profile.registration_number = fetched
        .registration_number
        .clone()
        .or_else(|| profile.registration_number.clone());
    profile.address = fetched.address.clone().or_else(|| profile.address.clone());
    profile.homepage_url = fetched.homepage_url.clone().or_else(|| profile.homepage_url.clone());
    profile.ir_url = fetched.ir_url.clone().or_else(|| profile.ir_url.clone());
    profile.phone_number = fetched.phone_number.clone().or_else(|| profile.phone_number.clone());
    profile.fax_number = fetched.fax_number.clone().or_else(|| profile.fax_number.clone());
    profile.industry_code = fetched.industry_code.clone().or_else(|| profile.industry_code.clone());
    profile.establishment_date = fetched
        .establishment_date
        .clone()
        .or_else(|| profile.establishment_date.clone());
    profile.accounting_month = fetched
        .accounting_month
        .clone()
        .or_else(|| profile.accounting_month.clone());
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use dart_event_bus::PartnerEventAction;
    use dart_persistence::InMemoryPersistence;
    use pretty_assertions::assert_eq;

    use super::*;

    struct StubEdsClient {
        profile: Option<EdsCompanyProfile>,
    }

    #[async_trait]
    impl EdsClient for StubEdsClient {
        async fn fetch_corp_code_archive(&self) -> dart_eds_client::EdsResult<Vec<dart_persistence::CorpCodeEntry>> {
            Ok(Vec::new())
        }

        async fn get_company_profile(
            &self,
            corp_code: &str,
        ) -> dart_eds_client::EdsResult<Option<EdsCompanyProfile>> {
            Ok(self.profile.clone().map(|mut profile| {
                profile.corp_code = corp_code.to_owned();
                profile
            }))
        }

        async fn search_disclosures(
            &self,
            _corp_code: &str,
            _begin: NaiveDate,
            _end: NaiveDate,
        ) -> dart_eds_client::EdsResult<Vec<dart_persistence::Disclosure>> {
            Ok(Vec::new())
        }

        async fn get_financial_statement(
            &self,
            _corp_code: &str,
            _business_year: i32,
            _report_code: ReportCode,
            _division: FsDivision,
        ) -> dart_eds_client::EdsResult<Vec<dart_persistence::FinancialStatementRow>> {
            Ok(Vec::new())
        }
    }

    fn coordinator(eds_profile: Option<EdsCompanyProfile>) -> (IngestionCoordinator, Arc<InMemoryPersistence>) {
        let store = Arc::new(InMemoryPersistence::new());
        let eds = Arc::new(StubEdsClient { profile: eds_profile });
        let coordinator = IngestionCoordinator::new(
            eds,
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            CoordinatorConfig::default(),
        );
        (coordinator, store)
    }

    #[tokio::test]
    async fn unknown_profile_falls_back_to_directory_then_enriches() {
        let fetched = EdsCompanyProfile {
            corp_code: "00126380".into(),
            corp_name: "삼성전자(주)".into(),
            ceo_name: Some("한종희".into()),
            address: Some("수원".into()),
            phone_number: Some("02-000-0000".into()),
            business_number: Some("1248100998".into()),
            industry_code: Some("26410".into()),
            ..Default::default()
        };
        let (coordinator, _store) = coordinator(Some(fetched));
        let event = PartnerEvent {
            corp_code: Some("00126380".into()),
            action: PartnerEventAction::PartnerCompanyRegistered,
            partner_company_id: None,
            headquarters_id: Some(1),
            timestamp: Utc::now(),
        };
        let outcome = coordinator
            .process_event(&event, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .await;
        assert!(!outcome.skipped);
        let profile = outcome.profile.unwrap();
        assert_eq!(profile.corp_name, "삼성전자(주)");
        assert_eq!(profile.ceo_name.as_deref(), Some("한종희"));
    }

    #[tokio::test]
    async fn empty_corp_code_is_skipped_without_touching_stores() {
        let (coordinator, _store) = coordinator(None);
        let event = PartnerEvent {
            corp_code: None,
            action: PartnerEventAction::PartnerCompanyRegistered,
            partner_company_id: None,
            headquarters_id: None,
            timestamp: Utc::now(),
        };
        let outcome = coordinator
            .process_event(&event, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .await;
        assert!(outcome.skipped);
    }

    #[tokio::test]
    async fn reprocessing_the_same_event_does_not_duplicate_statement_rows() {
        let (coordinator, store) = coordinator(None);
        store
            .replace_all(vec![dart_persistence::CorpCodeEntry {
                corp_code: "00126380".into(),
                corp_name: "삼성전자(주)".into(),
                corp_name_eng: None,
                stock_code: None,
                modify_date: "20240101".into(),
            }])
            .await
            .unwrap();
        let event = PartnerEvent {
            corp_code: Some("00126380".into()),
            action: PartnerEventAction::PartnerCompanyRegistered,
            partner_company_id: None,
            headquarters_id: Some(1),
            timestamp: Utc::now(),
        };
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let first = coordinator.process_event(&event, today).await;
        let second = coordinator.process_event(&event, today).await;
        assert_eq!(first.statements_inserted, 0);
        assert_eq!(second.statements_inserted, 0);
    }

    #[test]
    fn default_statement_plan_matches_the_required_order() {
        let plan = default_statement_plan(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(
            plan,
            vec![
                (2023, ReportCode::Annual),
                (2024, ReportCode::Q3),
                (2024, ReportCode::Half),
                (2024, ReportCode::Q1),
            ]
        );
    }
}
