use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::models::Workflow;
use crate::services::lifecycle::CascadeOutcome;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving end of a bounded channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after the owning transaction committed. Delivery failures are logged only.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Event dropped after commit");
        }
    }
}

/// Facts published once a fulfillment operation has been committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderGenerated {
        workflow: Workflow,
        header_ids: Vec<i64>,
    },
    CollectionRecorded {
        workflow: Workflow,
        header_id: i64,
        import_line_id: i64,
        route_id: i64,
        quantity: Decimal,
    },
    OrderCompleted {
        workflow: Workflow,
        header_id: i64,
        pending_approval: bool,
    },
    ApprovalDecided {
        workflow: Workflow,
        header_id: i64,
        approved: bool,
        user_id: i64,
    },
    RecordsRemoved {
        workflow: Workflow,
        outcome: CascadeOutcome,
    },
}

impl Event {
    pub fn workflow(&self) -> Workflow {
        match self {
            Event::OrderGenerated { workflow, .. }
            | Event::CollectionRecorded { workflow, .. }
            | Event::OrderCompleted { workflow, .. }
            | Event::ApprovalDecided { workflow, .. }
            | Event::RecordsRemoved { workflow, .. } => *workflow,
        }
    }
}

/// Drains the event channel, logging each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        let workflow = event.workflow();
        match event {
            Event::OrderGenerated { header_ids, .. } => {
                info!(%workflow, ?header_ids, "Order generated");
            }
            Event::CollectionRecorded {
                header_id,
                import_line_id,
                route_id,
                quantity,
                ..
            } => {
                info!(%workflow, header_id, import_line_id, route_id, %quantity, "Collection recorded");
            }
            Event::OrderCompleted {
                header_id,
                pending_approval,
                ..
            } => {
                info!(%workflow, header_id, pending_approval, "Order completed");
            }
            Event::ApprovalDecided {
                header_id,
                approved,
                user_id,
                ..
            } => {
                info!(%workflow, header_id, approved, user_id, "Approval decided");
            }
            Event::RecordsRemoved { outcome, .. } => {
                info!(%workflow, ?outcome, "Records removed");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_after_receiver_closed_is_not_an_error() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        assert!(sender
            .send(Event::OrderGenerated {
                workflow: Workflow::Production,
                header_ids: vec![1],
            })
            .await
            .is_err());
        sender
            .publish(Event::OrderGenerated {
                workflow: Workflow::Production,
                header_ids: vec![1],
            })
            .await;
    }

    #[tokio::test]
    async fn process_events_stops_when_senders_drop() {
        let (sender, rx) = EventSender::channel(4);
        sender
            .send(Event::OrderCompleted {
                workflow: Workflow::Shipping,
                header_id: 3,
                pending_approval: true,
            })
            .await
            .unwrap();
        drop(sender);
        process_events(rx).await;
    }
}
