use async_trait::async_trait;
use dart_persistence::PartnerCompany;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::EventBus;
use crate::EventBusError;
use crate::EventBusResult;
use crate::PartnerEvent;
use crate::PartnerEventConsumer;

/// In-memory substitute for a durable log, built on an unbounded mpsc
/// channel for the inbound topic and a plain log for the outbound topic so
/// tests can inspect what a restore would have notified downstream.
pub struct InMemoryEventBus {
    inbound_tx: mpsc::UnboundedSender<PartnerEvent>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<PartnerEvent>>,
    outbound_log: Mutex<Vec<PartnerCompany>>,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(inbound_rx),
            outbound_log: Mutex::new(Vec::new()),
        }
    }

    pub async fn outbound_log(&self) -> Vec<PartnerCompany> {
        self.outbound_log.lock().await.clone()
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish_partner_event(&self, event: PartnerEvent) -> EventBusResult<()> {
        self.inbound_tx
            .send(event)
            .map_err(|err| EventBusError::PublishFailed(err.to_string()))
    }

    async fn publish_partner_restored(&self, partner: PartnerCompany) -> EventBusResult<()> {
        self.outbound_log.lock().await.push(partner);
        Ok(())
    }
}

#[async_trait]
impl PartnerEventConsumer for InMemoryEventBus {
    async fn recv(&self) -> Option<PartnerEvent> {
        self.inbound_rx.lock().await.recv().await
    }
}
