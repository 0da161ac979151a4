//! Durable store for providers, shipments and the tracked set.
//!
//! One SQLite database, three tables. All access goes through a single
//! mutex-guarded connection: the command router and the poll worker share
//! the store, and a global write lock is enough for a single-tenant
//! dataset. Schema creation is idempotent and runs on every open.

use std::{
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::{
    domain::{DeliveryStatus, Provider, ProviderId, Shipment, ShipmentId, TrackingEntry},
    errors::Error,
    Result,
};

pub struct ShipmentStore {
    conn: Mutex<Connection>,
}

impl ShipmentStore {
    /// Open (or create) the on-disk database and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory store with the same schema. Backs the unit tests and any
    /// caller that wants a throwaway substitute for the on-disk store.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_provider(&self, name: &str, url: Option<&str>) -> Result<ProviderId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "provider name must not be empty".to_string(),
            ));
        }

        let conn = self.conn();
        match conn.execute(
            "INSERT INTO providers (name, url) VALUES (?1, ?2)",
            params![name, url],
        ) {
            Ok(_) => Ok(ProviderId(conn.last_insert_rowid())),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::DuplicateProvider(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn find_provider_by_name(&self, name: &str) -> Result<Option<Provider>> {
        let conn = self.conn();
        let found = conn
            .query_row(
                "SELECT id, name, url FROM providers WHERE name = ?1",
                params![name],
                provider_from_row,
            )
            .optional()?;
        Ok(found)
    }

    pub fn find_provider(&self, id: ProviderId) -> Result<Option<Provider>> {
        let conn = self.conn();
        let found = conn
            .query_row(
                "SELECT id, name, url FROM providers WHERE id = ?1",
                params![id.0],
                provider_from_row,
            )
            .optional()?;
        Ok(found)
    }

    pub fn list_providers(&self) -> Result<Vec<Provider>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, url FROM providers ORDER BY id")?;
        let rows = stmt
            .query_map([], provider_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Insert a shipment for an existing provider (referenced by name) and
    /// return its freshly generated id. No row is created when the provider
    /// is unknown.
    pub fn add_shipment(
        &self,
        code: &str,
        provider_name: &str,
        status: DeliveryStatus,
    ) -> Result<ShipmentId> {
        let conn = self.conn();
        let provider_id: i64 = conn
            .query_row(
                "SELECT id FROM providers WHERE name = ?1",
                params![provider_name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| Error::UnknownProvider(provider_name.to_string()))?;

        let id = ShipmentId(uuid::Uuid::new_v4().to_string());
        conn.execute(
            "INSERT INTO shipments (id, code, provider_id, status) VALUES (?1, ?2, ?3, ?4)",
            params![id.0, code, provider_id, status.to_db()],
        )?;
        Ok(id)
    }

    /// Resolve a shipment by id first, falling back to the first match by
    /// carrier code.
    pub fn find_shipment(&self, id_or_code: &str) -> Result<Option<Shipment>> {
        let conn = self.conn();
        if let Some(s) = conn
            .query_row(
                "SELECT id, code, provider_id, status FROM shipments WHERE id = ?1",
                params![id_or_code],
                shipment_from_row,
            )
            .optional()?
        {
            return Ok(Some(s));
        }
        let by_code = conn
            .query_row(
                "SELECT id, code, provider_id, status FROM shipments WHERE code = ?1 LIMIT 1",
                params![id_or_code],
                shipment_from_row,
            )
            .optional()?;
        Ok(by_code)
    }

    pub fn list_shipments(&self) -> Result<Vec<Shipment>> {
        self.query_shipments("SELECT id, code, provider_id, status FROM shipments ORDER BY rowid")
    }

    pub fn list_ongoing_shipments(&self) -> Result<Vec<Shipment>> {
        self.query_shipments(
            "SELECT id, code, provider_id, status FROM shipments WHERE status = 0 ORDER BY rowid",
        )
    }

    fn query_shipments(&self, sql: &str) -> Result<Vec<Shipment>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], shipment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Update a shipment's status. Returns false when the id is unknown.
    ///
    /// A transition to `Delivered` removes the tracking entry in the same
    /// transaction, so the tracked set never retains a delivered shipment.
    pub fn set_shipment_status(&self, id: &ShipmentId, status: DeliveryStatus) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE shipments SET status = ?1 WHERE id = ?2",
            params![status.to_db(), id.0],
        )?;
        if changed == 0 {
            return Ok(false);
        }
        if status == DeliveryStatus::Delivered {
            tx.execute(
                "DELETE FROM tracking_entries WHERE shipment_id = ?1",
                params![id.0],
            )?;
        }
        tx.commit()?;
        Ok(true)
    }

    /// Add a shipment to the tracked set. Returns false when the shipment
    /// does not exist; re-adding an already-tracked shipment succeeds.
    pub fn add_tracking_entry(&self, id: &ShipmentId) -> Result<bool> {
        let conn = self.conn();
        let exists = conn
            .query_row(
                "SELECT 1 FROM shipments WHERE id = ?1",
                params![id.0],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(false);
        }
        conn.execute(
            "INSERT OR IGNORE INTO tracking_entries (shipment_id) VALUES (?1)",
            params![id.0],
        )?;
        Ok(true)
    }

    /// Remove a shipment from the tracked set. Idempotent.
    pub fn remove_tracking_entry(&self, id: &ShipmentId) -> Result<bool> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM tracking_entries WHERE shipment_id = ?1",
            params![id.0],
        )?;
        Ok(true)
    }

    pub fn list_tracking_entries(&self) -> Result<Vec<TrackingEntry>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT shipment_id FROM tracking_entries ORDER BY rowid")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TrackingEntry {
                    shipment_id: ShipmentId(row.get(0)?),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS providers (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            url  TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS shipments (
            id          TEXT PRIMARY KEY,
            code        TEXT NOT NULL,
            provider_id INTEGER NOT NULL,
            status      INTEGER NOT NULL,
            FOREIGN KEY (provider_id) REFERENCES providers(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tracking_entries (
            shipment_id TEXT PRIMARY KEY,
            FOREIGN KEY (shipment_id) REFERENCES shipments(id)
        )",
        [],
    )?;
    Ok(())
}

fn provider_from_row(row: &Row<'_>) -> rusqlite::Result<Provider> {
    Ok(Provider {
        id: ProviderId(row.get(0)?),
        name: row.get(1)?,
        url: row.get(2)?,
    })
}

fn shipment_from_row(row: &Row<'_>) -> rusqlite::Result<Shipment> {
    Ok(Shipment {
        id: ShipmentId(row.get(0)?),
        code: row.get(1)?,
        provider_id: ProviderId(row.get(2)?),
        status: DeliveryStatus::from_db(row.get(3)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_provider(name: &str) -> ShipmentStore {
        let store = ShipmentStore::open_in_memory().unwrap();
        store.add_provider(name, Some("https://example.test")).unwrap();
        store
    }

    #[test]
    fn schema_creation_is_idempotent() {
        let store = ShipmentStore::open_in_memory().unwrap();
        create_tables(&store.conn()).unwrap();
    }

    #[test]
    fn duplicate_provider_name_is_rejected() {
        let store = store_with_provider("DHL");
        let err = store.add_provider("DHL", None).unwrap_err();
        assert!(matches!(err, Error::DuplicateProvider(name) if name == "DHL"));

        let with_name: Vec<_> = store
            .list_providers()
            .unwrap()
            .into_iter()
            .filter(|p| p.name == "DHL")
            .collect();
        assert_eq!(with_name.len(), 1);
    }

    #[test]
    fn empty_provider_name_is_rejected() {
        let store = ShipmentStore::open_in_memory().unwrap();
        assert!(matches!(
            store.add_provider("  ", None),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn providers_list_in_insertion_order() {
        let store = ShipmentStore::open_in_memory().unwrap();
        store.add_provider("DHL", None).unwrap();
        store.add_provider("UPS", Some("https://ups.test")).unwrap();
        let names: Vec<_> = store
            .list_providers()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["DHL", "UPS"]);
    }

    #[test]
    fn add_shipment_with_unknown_provider_creates_nothing() {
        let store = ShipmentStore::open_in_memory().unwrap();
        let err = store
            .add_shipment("C1", "Nowhere", DeliveryStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownProvider(name) if name == "Nowhere"));
        assert!(store.list_shipments().unwrap().is_empty());
    }

    #[test]
    fn find_shipment_by_id_then_by_code() {
        let store = store_with_provider("DHL");
        let id = store
            .add_shipment("C1", "DHL", DeliveryStatus::Pending)
            .unwrap();

        let by_id = store.find_shipment(&id.0).unwrap().unwrap();
        let by_code = store.find_shipment("C1").unwrap().unwrap();
        assert_eq!(by_id, by_code);
        assert_eq!(by_id.id, id);
        assert!(store.find_shipment("no-such").unwrap().is_none());
    }

    #[test]
    fn shipment_ids_are_unique_even_for_same_code() {
        let store = store_with_provider("DHL");
        let a = store
            .add_shipment("C1", "DHL", DeliveryStatus::Pending)
            .unwrap();
        let b = store
            .add_shipment("C1", "DHL", DeliveryStatus::Pending)
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list_shipments().unwrap().len(), 2);
    }

    #[test]
    fn delivered_shipment_leaves_ongoing_and_tracking() {
        let store = store_with_provider("DHL");
        let id = store
            .add_shipment("C1", "DHL", DeliveryStatus::Pending)
            .unwrap();
        assert!(store.add_tracking_entry(&id).unwrap());
        assert_eq!(store.list_ongoing_shipments().unwrap().len(), 1);
        assert_eq!(store.list_tracking_entries().unwrap().len(), 1);

        assert!(store
            .set_shipment_status(&id, DeliveryStatus::Delivered)
            .unwrap());
        assert!(store.list_ongoing_shipments().unwrap().is_empty());
        assert!(store.list_tracking_entries().unwrap().is_empty());
    }

    #[test]
    fn set_status_on_unknown_id_returns_false() {
        let store = ShipmentStore::open_in_memory().unwrap();
        let missing = ShipmentId("missing".to_string());
        assert!(!store
            .set_shipment_status(&missing, DeliveryStatus::Delivered)
            .unwrap());
    }

    #[test]
    fn tracking_entry_requires_existing_shipment() {
        let store = ShipmentStore::open_in_memory().unwrap();
        let missing = ShipmentId("missing".to_string());
        assert!(!store.add_tracking_entry(&missing).unwrap());
        assert!(store.list_tracking_entries().unwrap().is_empty());
    }

    #[test]
    fn tracking_set_operations_are_idempotent() {
        let store = store_with_provider("DHL");
        let id = store
            .add_shipment("C1", "DHL", DeliveryStatus::Pending)
            .unwrap();

        assert!(store.add_tracking_entry(&id).unwrap());
        assert!(store.add_tracking_entry(&id).unwrap());
        assert_eq!(store.list_tracking_entries().unwrap().len(), 1);

        assert!(store.remove_tracking_entry(&id).unwrap());
        assert!(store.remove_tracking_entry(&id).unwrap());
        assert!(store.list_tracking_entries().unwrap().is_empty());
    }
}
