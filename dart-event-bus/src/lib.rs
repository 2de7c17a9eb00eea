#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::fmt::Display;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use dart_persistence::PartnerCompany;
use thiserror::Error;
use tracing::warn;

mod memory;

pub use crate::memory::InMemoryEventBus;

pub const INBOUND_TOPIC: &str = "partner-company-events";
pub const OUTBOUND_TOPIC: &str = "partner-company-restored";

pub type EventBusResult<T> = Result<T, EventBusError>;

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartnerEventAction {
    PartnerCompanyRegistered,
    PartnerCompanyUpdated,
    PartnerCompanyRestored,
}

impl Display for PartnerEventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PartnerEventAction::PartnerCompanyRegistered => "partner_company_registered",
            PartnerEventAction::PartnerCompanyUpdated => "partner_company_updated",
            PartnerEventAction::PartnerCompanyRestored => "partner_company_restored",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerEvent {
    pub corp_code: Option<String>,
    pub action: PartnerEventAction,
    pub partner_company_id: Option<String>,
    pub headquarters_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// Producer-side contract, decoupled from any specific broker so tests can
/// substitute an in-memory bus. A publish failure is logged and never
/// propagated to the caller as a hard error; the future is still awaited so
/// the outcome is recorded.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish_partner_event(&self, event: PartnerEvent) -> EventBusResult<()>;
    async fn publish_partner_restored(&self, partner: PartnerCompany) -> EventBusResult<()>;
}

/// Consumer-side contract for the inbound topic. Delivery is at-least-once:
/// callers must treat every `recv` as potentially a redelivery and process
/// idempotently.
#[async_trait]
pub trait PartnerEventConsumer: Send + Sync {
    async fn recv(&self) -> Option<PartnerEvent>;
}

/// Publishes `event` and logs (without aborting the caller) if the bus
/// rejects it — the fire-and-forget behavior required of Partner Registry
/// writes.
pub async fn publish_best_effort(bus: &dyn EventBus, event: PartnerEvent) {
    if let Err(err) = bus.publish_partner_event(event).await {
        warn!(error = %err, "partner event publish failed");
    }
}
