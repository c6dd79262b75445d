use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Handle used by commands and services to publish domain events.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Nonconformance events
    IncCreated { id: Uuid, sequence_number: i64 },
    IncUpdated(Uuid),
    IncDeleted(Uuid),
    IncPhotosChanged(Uuid),

    // Supplier events
    SupplierCreated(Uuid),
    SupplierUpdated(Uuid),
    SupplierDeleted(Uuid),

    // Inspection events
    CrmTokenSet {
        inspector_id: String,
    },
    InspectionImported {
        inspector_id: String,
        filename: String,
        records: usize,
    },
    InspectionAbandoned {
        inspector_id: String,
    },
    InspectionBatchSaved {
        batch_id: Uuid,
        inspector_id: String,
        records: usize,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::IncCreated { .. } => "inc_created",
            Event::IncUpdated(_) => "inc_updated",
            Event::IncDeleted(_) => "inc_deleted",
            Event::IncPhotosChanged(_) => "inc_photos_changed",
            Event::SupplierCreated(_) => "supplier_created",
            Event::SupplierUpdated(_) => "supplier_updated",
            Event::SupplierDeleted(_) => "supplier_deleted",
            Event::CrmTokenSet { .. } => "crm_token_set",
            Event::InspectionImported { .. } => "inspection_imported",
            Event::InspectionAbandoned { .. } => "inspection_abandoned",
            Event::InspectionBatchSaved { .. } => "inspection_batch_saved",
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("inc_manager.events", 1, "event" => event.name());

        match &event {
            Event::InspectionBatchSaved {
                batch_id,
                inspector_id,
                records,
            } => {
                info!(
                    batch_id = %batch_id,
                    inspector_id = %inspector_id,
                    records,
                    "Inspection batch saved"
                );
            }
            Event::IncCreated {
                id,
                sequence_number,
            } => {
                info!(inc_id = %id, sequence_number, "Nonconformance opened");
            }
            other => debug!("Received event: {:?}", other),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::SupplierCreated(id)).await.unwrap();
        sender.send(Event::SupplierDeleted(id)).await.unwrap();

        assert_eq!(rx.recv().await, Some(Event::SupplierCreated(id)));
        assert_eq!(rx.recv().await, Some(Event::SupplierDeleted(id)));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = EventSender::new(tx)
            .send(Event::IncDeleted(Uuid::nil()))
            .await
            .unwrap_err();
        assert!(err.starts_with("Failed to send event"));
    }

    #[tokio::test]
    async fn processor_exits_when_channel_closes() {
        let (tx, rx) = mpsc::channel(2);
        let handle = tokio::spawn(process_events(rx));
        tx.send(Event::CrmTokenSet {
            inspector_id: "ana".into(),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
