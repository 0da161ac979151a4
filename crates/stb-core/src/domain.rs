/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Shipping provider row id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProviderId(pub i64);

/// Shipment identifier: a UUIDv4 string generated at creation.
///
/// Distinct from the carrier-issued tracking `code`, which is not required
/// to be unique.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShipmentId(pub String);

impl std::fmt::Display for ShipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery state of a shipment. `Delivered` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryStatus {
    Pending,
    Delivered,
}

impl DeliveryStatus {
    /// Integer codec used by the shipments table (0 = pending, 1 = delivered).
    pub fn to_db(self) -> i64 {
        match self {
            DeliveryStatus::Pending => 0,
            DeliveryStatus::Delivered => 1,
        }
    }

    pub fn from_db(v: i64) -> Self {
        if v == 0 {
            DeliveryStatus::Pending
        } else {
            DeliveryStatus::Delivered
        }
    }

    /// Normalize a user-supplied status token at the router boundary:
    /// "true" (case-insensitive) means delivered, anything else pending.
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("true") {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Pending
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::Delivered => "Delivered",
        }
    }
}

/// A shipping carrier registered by name and optional URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub url: Option<String>,
}

/// A tracked parcel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shipment {
    pub id: ShipmentId,
    pub code: String,
    pub provider_id: ProviderId,
    pub status: DeliveryStatus,
}

/// Membership marker: this shipment is part of the actively-monitored set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackingEntry {
    pub shipment_id: ShipmentId,
}
