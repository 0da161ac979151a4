//! Shipment lifecycle orchestration over the store.
//!
//! The command router and the poll worker talk to this engine instead of
//! raw store calls. State machine per shipment:
//! `Pending --(report delivered)--> Delivered`, and `Delivered` is terminal.
//! Tracked-set membership mirrors the `Pending` state.

use std::sync::Arc;

use tracing::warn;

use crate::{
    domain::{DeliveryStatus, Shipment, ShipmentId},
    errors::Error,
    store::ShipmentStore,
    Result,
};

#[derive(Clone)]
pub struct TrackingEngine {
    store: Arc<ShipmentStore>,
}

impl TrackingEngine {
    pub fn new(store: Arc<ShipmentStore>) -> Self {
        Self { store }
    }

    /// Add a shipment as `Pending` and attach it to the tracked set.
    ///
    /// The attach cannot fail for a shipment we just created; if it does,
    /// the shipment still exists and is queryable, so this is a logged
    /// anomaly rather than an error.
    pub fn register_shipment(&self, code: &str, provider_name: &str) -> Result<ShipmentId> {
        let id = self
            .store
            .add_shipment(code, provider_name, DeliveryStatus::Pending)?;

        match self.store.add_tracking_entry(&id) {
            Ok(true) => {}
            Ok(false) => warn!(shipment_id = %id, "freshly added shipment missing during attach"),
            Err(e) => warn!(shipment_id = %id, error = %e, "failed to attach tracking entry"),
        }

        Ok(id)
    }

    /// Apply a reported status change to the shipment matching `id_or_code`.
    ///
    /// `Delivered` is terminal: any report against an already-delivered
    /// shipment is a successful no-op. Delivery removes the tracking entry
    /// via the store contract.
    pub fn report_status_change(&self, id_or_code: &str, delivered: bool) -> Result<()> {
        let shipment = self
            .store
            .find_shipment(id_or_code)?
            .ok_or_else(|| Error::NotFound(format!("shipment '{id_or_code}'")))?;

        if shipment.status == DeliveryStatus::Delivered {
            return Ok(());
        }

        let status = if delivered {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Pending
        };

        if !self.store.set_shipment_status(&shipment.id, status)? {
            // The shipment vanished between lookup and update.
            return Err(Error::NotFound(format!("shipment '{id_or_code}'")));
        }
        Ok(())
    }

    /// All shipments still awaiting delivery.
    pub fn ongoing(&self) -> Result<Vec<Shipment>> {
        self.store.list_ongoing_shipments()
    }
}
