#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono::Utc;
use dart_event_bus::EventBus;
use dart_event_bus::PartnerEvent;
use dart_event_bus::PartnerEventAction;
use dart_persistence::CompanyProfile;
use dart_persistence::CompanyProfileStore;
use dart_persistence::CorpCodeDirectoryStore;
use dart_persistence::OwnerRef;
use dart_persistence::PartnerCompany;
use dart_persistence::PartnerCompanyStore;
use dart_persistence::PartnerStatus;
use dart_persistence::PersistenceError;
use dart_persistence::ProfileOwnerType;
use thiserror::Error;
use tracing::info_span;
use tracing::warn;
use uuid::Uuid;

pub type PartnerRegistryResult<T> = Result<T, PartnerRegistryError>;

#[derive(Debug, Error)]
pub enum PartnerRegistryError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<PersistenceError> for PartnerRegistryError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(msg) => PartnerRegistryError::NotFound(msg),
            PersistenceError::Validation(msg) => PartnerRegistryError::Validation(msg),
            PersistenceError::Internal(msg) => PartnerRegistryError::Internal(msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePartnerCompanyRequest {
    pub corp_code: String,
    pub contract_start_date: NaiveDate,
    pub headquarters_id: i64,
    pub partner_id: Option<i64>,
}

impl CreatePartnerCompanyRequest {
    #[must_use]
    pub fn owner(&self) -> OwnerRef {
        match self.partner_id {
            Some(id) => OwnerRef::Partner(id),
            None => OwnerRef::Headquarters(self.headquarters_id),
        }
    }

    pub fn validate(&self) -> PartnerRegistryResult<()> {
        if self.corp_code.trim().is_empty() {
            return Err(PartnerRegistryError::Validation("corp_code cannot be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePartnerCompanyRequest {
    pub id: String,
    pub corp_code: Option<String>,
    pub contract_start_date: Option<NaiveDate>,
    pub status: Option<PartnerStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub partner: PartnerCompany,
    pub restored: bool,
}

#[async_trait]
pub trait PartnerRegistry: Send + Sync {
    async fn create_partner_company(
        &self,
        request: CreatePartnerCompanyRequest,
    ) -> PartnerRegistryResult<RegistrationOutcome>;
    async fn update_partner_company(
        &self,
        request: UpdatePartnerCompanyRequest,
    ) -> PartnerRegistryResult<PartnerCompany>;
    async fn delete_partner_company(&self, id: &str) -> PartnerRegistryResult<()>;
    async fn check_duplicate_name(
        &self,
        owner: OwnerRef,
        name: &str,
        exclude_id: Option<&str>,
    ) -> PartnerRegistryResult<bool>;
}

pub struct PartnerRegistryService {
    profiles: Arc<dyn CompanyProfileStore>,
    directory: Arc<dyn CorpCodeDirectoryStore>,
    partners: Arc<dyn PartnerCompanyStore>,
    bus: Arc<dyn EventBus>,
}

impl PartnerRegistryService {
    #[must_use]
    pub fn new(
        profiles: Arc<dyn CompanyProfileStore>,
        directory: Arc<dyn CorpCodeDirectoryStore>,
        partners: Arc<dyn PartnerCompanyStore>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            profiles,
            directory,
            partners,
            bus,
        }
    }

    async fn ensure_company_profile(
        &self,
        owner: OwnerRef,
        corp_code: &str,
    ) -> PartnerRegistryResult<CompanyProfile> {
        if let Some(profile) = self
            .profiles
            .find_by_owner_and_corp_code(owner, corp_code)
            .await?
        {
            return Ok(profile);
        }
        let Some(entry) = self.directory.find_by_corp_code(corp_code).await? else {
            return Err(PartnerRegistryError::NotFound(format!(
                "corp_code {corp_code} is not present in the corp-code directory"
            )));
        };
        let profile = CompanyProfile {
            id: 0,
            corp_code: entry.corp_code,
            corp_name: entry.corp_name,
            corp_name_eng: entry.corp_name_eng,
            stock_code: entry.stock_code,
            headquarters_id: owner.headquarters_id(),
            partner_id: owner.partner_id(),
            user_type: Some(match owner {
                OwnerRef::Headquarters(_) => ProfileOwnerType::Headquarters,
                OwnerRef::Partner(_) => ProfileOwnerType::Partner,
            }),
            ..Default::default()
        };
        Ok(self.profiles.upsert(profile).await?)
    }

    async fn publish_registered(&self, partner: &PartnerCompany) {
        let event = PartnerEvent {
            corp_code: Some(partner.corp_code.clone()),
            action: PartnerEventAction::PartnerCompanyRegistered,
            partner_company_id: Some(partner.id.clone()),
            headquarters_id: partner.owner.headquarters_id(),
            timestamp: Utc::now(),
        };
        if let Err(err) = self.bus.publish_partner_event(event).await {
            warn!(error = %err, partner_id = %partner.id, "failed to publish partner_company_registered");
        }
    }
}

#[async_trait]
impl PartnerRegistry for PartnerRegistryService {
    async fn create_partner_company(
        &self,
        request: CreatePartnerCompanyRequest,
    ) -> PartnerRegistryResult<RegistrationOutcome> {
        request.validate()?;
        let owner = request.owner();
        let span = info_span!("create_partner_company", corp_code = %request.corp_code);
        let _entered = span.enter();

        let profile = self.ensure_company_profile(owner, &request.corp_code).await?;

        if let Some(existing) = self
            .partners
            .find_active_by_owner_and_name(owner, &profile.corp_name)
            .await?
        {
            return Ok(RegistrationOutcome {
                partner: existing,
                restored: false,
            });
        }

        if let Some(mut inactive) = self
            .partners
            .find_inactive_by_owner_and_name(owner, &profile.corp_name)
            .await?
        {
            inactive.corp_code = request.corp_code.clone();
            inactive.owner = owner;
            inactive.status = PartnerStatus::Active;
            inactive.contract_start_date = request.contract_start_date;
            inactive.updated_at = Utc::now();
            let restored = self.partners.upsert(inactive).await?;
            self.publish_registered(&restored).await;
            if let Err(err) = self.bus.publish_partner_restored(restored.clone()).await {
                warn!(error = %err, partner_id = %restored.id, "failed to publish partner_company_restored");
            }
            return Ok(RegistrationOutcome {
                partner: restored,
                restored: true,
            });
        }

        let now = Utc::now();
        let partner = PartnerCompany {
            id: Uuid::new_v4().to_string(),
            corp_code: request.corp_code.clone(),
            owner,
            contract_start_date: request.contract_start_date,
            status: PartnerStatus::Active,
            account_created: false,
            created_at: now,
            updated_at: now,
        };
        let created = self.partners.upsert(partner).await?;
        self.publish_registered(&created).await;
        Ok(RegistrationOutcome {
            partner: created,
            restored: false,
        })
    }

    async fn update_partner_company(
        &self,
        request: UpdatePartnerCompanyRequest,
    ) -> PartnerRegistryResult<PartnerCompany> {
        let mut partner = self
            .partners
            .find_by_id(&request.id)
            .await?
            .ok_or_else(|| PartnerRegistryError::NotFound(format!("partner {} not found", request.id)))?;

        if let Some(corp_code) = request.corp_code
            && corp_code != partner.corp_code
        {
            self.ensure_company_profile(partner.owner, &corp_code).await?;
            partner.corp_code = corp_code;
        }
        if let Some(contract_start_date) = request.contract_start_date {
            partner.contract_start_date = contract_start_date;
        }
        if let Some(status) = request.status {
            partner.status = status;
        }
        partner.updated_at = Utc::now();
        Ok(self.partners.upsert(partner).await?)
    }

    async fn delete_partner_company(&self, id: &str) -> PartnerRegistryResult<()> {
        let mut partner = self
            .partners
            .find_by_id(id)
            .await?
            .ok_or_else(|| PartnerRegistryError::NotFound(format!("partner {id} not found")))?;
        partner.status = PartnerStatus::Inactive;
        partner.updated_at = Utc::now();
        self.partners.upsert(partner).await?;
        Ok(())
    }

    async fn check_duplicate_name(
        &self,
        owner: OwnerRef,
        name: &str,
        exclude_id: Option<&str>,
    ) -> PartnerRegistryResult<bool> {
        let found = self.partners.find_active_by_owner_and_name(owner, name).await?;
        Ok(match found {
            Some(partner) => exclude_id != Some(partner.id.as_str()),
            None => false,
        })
    }
}
