//! Data-store query interface and backends

mod json;
mod query;
mod rest;
pub mod rows;

pub use json::JsonStore;
pub use query::{Predicate, Query};
pub use rest::{RestStore, DEFAULT_TIMEOUT_SECS};

use crate::types::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// Collections of the backing store read by the report engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Inventory,
    Donations,
    Requests,
    MovementHeaders,
    MovementDetails,
    Users,
    Deposits,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Inventory,
        Collection::Donations,
        Collection::Requests,
        Collection::MovementHeaders,
        Collection::MovementDetails,
        Collection::Users,
        Collection::Deposits,
    ];

    /// Table name in the store schema
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Inventory => "inventario",
            Collection::Donations => "productos_donados",
            Collection::Requests => "solicitudes",
            Collection::MovementHeaders => "movimiento_inventario_cabecera",
            Collection::MovementDetails => "movimiento_inventario_detalle",
            Collection::Users => "usuarios",
            Collection::Deposits => "depositos",
        }
    }

    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.table() == table)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Predicate-filtered read access to the backing store
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Backend name for log messages
    fn name(&self) -> &str;

    /// Return every row of `collection` matching all predicates of `query`
    async fn select(&self, collection: Collection, query: &Query) -> Result<Vec<Value>>;
}

/// Select and decode rows, skipping (and logging) rows that do not decode
pub async fn select_rows<T: DeserializeOwned>(
    store: &dyn ReportStore,
    collection: Collection,
    query: &Query,
) -> Result<Vec<T>> {
    let values = store.select(collection, query).await?;
    let mut rows = Vec::with_capacity(values.len());
    for value in values {
        match serde_json::from_value(value) {
            Ok(row) => rows.push(row),
            Err(e) => log::warn!(
                "{}: skipping malformed {} row: {}",
                store.name(),
                collection,
                e
            ),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::rows::UserRow;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_collection_table_roundtrip() {
        for collection in Collection::ALL {
            assert_eq!(Collection::from_table(collection.table()), Some(collection));
        }
        assert_eq!(Collection::from_table("unknown"), None);
    }

    #[tokio::test]
    async fn test_select_rows_skips_malformed() {
        let mut tables = HashMap::new();
        tables.insert(
            Collection::Users,
            vec![
                json!({ "id": "u1", "nombre": "Ana" }),
                json!({ "nombre": "missing id" }),
                json!({ "id": 7, "nombre": "Luis" }),
            ],
        );
        let store = JsonStore::from_tables(tables);

        let rows: Vec<UserRow> = select_rows(&store, Collection::Users, &Query::new())
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "u1");
        assert_eq!(rows[1].id, "7");
    }
}
