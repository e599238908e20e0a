//! SQLite implementation of [`VersionedStore`] and [`GraphStore`].
//!
//! [`SqliteGraphStore`] persists every entity version in a SQLite database
//! with WAL mode and automatic schema migrations. Entities are stored as
//! detached JSON bodies beside `(id, version, created, expired)` columns that
//! the point-in-time queries run against.

use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tracing::info;

use tempora_core::{Component, Edge, Locator, NanoId, Node, Timestamp};

use crate::error::StorageError;
use crate::record::Record;
use crate::schema::{decode_timestamp, encode_timestamp};
use crate::traits::{GraphStore, VersionedStore};

/// Shared handle to one SQLite connection.
type SharedConnection = Arc<Mutex<Connection>>;

/// SQLite-backed store for one entity family.
///
/// Stores of one graph share a single connection, so their writes can be
/// grouped into one transaction.
pub struct SqliteStore<T> {
    conn: SharedConnection,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> SqliteStore<T> {
    fn new(conn: SharedConnection) -> Self {
        SqliteStore {
            conn,
            _record: PhantomData,
        }
    }

    fn decode(body: &str) -> Result<T, StorageError> {
        Ok(serde_json::from_str(body)?)
    }

    /// Runs a single-row `SELECT body ...` query.
    fn query_one(&self, sql: &str, args: &[&dyn ToSql]) -> Result<Option<T>, StorageError> {
        let conn = self.conn.lock();
        let body: Option<String> = conn
            .query_row(sql, args, |row| row.get(0))
            .optional()?;
        body.as_deref().map(Self::decode).transpose()
    }

    /// Runs a multi-row `SELECT body ...` query.
    fn query_many(&self, sql: &str, args: &[&dyn ToSql]) -> Result<Vec<T>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(args, |row| row.get::<_, String>(0))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(Self::decode(&row?)?);
        }
        Ok(result)
    }

    fn query_ids(&self, sql: &str) -> Result<Vec<NanoId>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(NanoId::new(row?));
        }
        Ok(ids)
    }
}

impl<T: Record> VersionedStore<T> for SqliteStore<T> {
    fn save(&mut self, value: &T) -> Result<T, StorageError> {
        let stored = value.detach();
        let locator = stored.locator();
        let body = serde_json::to_string(&stored)?;
        let expired = stored.expired().as_ref().map(encode_timestamp);
        let sql = format!(
            "INSERT INTO {} (id, version, created, expired, body) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id, version) DO UPDATE SET
                 created = excluded.created, expired = excluded.expired, body = excluded.body",
            T::TABLE
        );
        self.conn.lock().execute(
            &sql,
            params![
                locator.id.as_str(),
                locator.version,
                encode_timestamp(&stored.created()),
                expired,
                body
            ],
        )?;
        Ok(stored)
    }

    fn find_all(&self, id: &NanoId) -> Result<Vec<T>, StorageError> {
        let sql = format!("SELECT body FROM {} WHERE id = ?1 ORDER BY version", T::TABLE);
        self.query_many(&sql, &[&id.as_str()])
    }

    fn find(&self, locator: &Locator) -> Result<Option<T>, StorageError> {
        let sql = format!("SELECT body FROM {} WHERE id = ?1 AND version = ?2", T::TABLE);
        self.query_one(&sql, &[&locator.id.as_str(), &locator.version])
    }

    fn delete(&mut self, id: &NanoId) -> Result<bool, StorageError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", T::TABLE);
        let removed = self.conn.lock().execute(&sql, params![id.as_str()])?;
        Ok(removed > 0)
    }

    fn all_ids(&self) -> Result<Vec<NanoId>, StorageError> {
        self.query_ids(&format!("SELECT DISTINCT id FROM {} ORDER BY id", T::TABLE))
    }

    fn load_all(&self) -> Result<Vec<T>, StorageError> {
        let sql = format!("SELECT body FROM {} ORDER BY id, version", T::TABLE);
        self.query_many(&sql, &[])
    }

    fn find_active(&self, id: &NanoId) -> Result<Option<T>, StorageError> {
        let sql = format!(
            "SELECT body FROM {} WHERE id = ?1 AND expired IS NULL ORDER BY version DESC LIMIT 1",
            T::TABLE
        );
        self.query_one(&sql, &[&id.as_str()])
    }

    fn find_at(&self, id: &NanoId, timestamp: Timestamp) -> Result<Option<T>, StorageError> {
        let sql = format!(
            "SELECT body FROM {} WHERE id = ?1 AND created <= ?2
               AND (expired IS NULL OR expired > ?2)
             ORDER BY version DESC LIMIT 1",
            T::TABLE
        );
        self.query_one(&sql, &[&id.as_str(), &encode_timestamp(&timestamp)])
    }

    fn all_active_ids(&self) -> Result<Vec<NanoId>, StorageError> {
        self.query_ids(&format!(
            "SELECT DISTINCT id FROM {} WHERE expired IS NULL ORDER BY id",
            T::TABLE
        ))
    }
}

/// Node, edge, and component stores over one SQLite database.
pub struct SqliteGraphStore {
    conn: SharedConnection,
    nodes: SqliteStore<Node>,
    edges: SqliteStore<Edge>,
    components: SqliteStore<Component>,
}

impl SqliteGraphStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        info!(path, "opened sqlite graph store");
        Ok(SqliteGraphStore::from_connection(conn))
    }

    /// Opens an in-memory SQLite database.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteGraphStore::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        let conn = Arc::new(Mutex::new(conn));
        SqliteGraphStore {
            nodes: SqliteStore::new(conn.clone()),
            edges: SqliteStore::new(conn.clone()),
            components: SqliteStore::new(conn.clone()),
            conn,
        }
    }
}

impl GraphStore for SqliteGraphStore {
    type Nodes = SqliteStore<Node>;
    type Edges = SqliteStore<Edge>;
    type Components = SqliteStore<Component>;

    fn nodes(&self) -> &Self::Nodes {
        &self.nodes
    }

    fn nodes_mut(&mut self) -> &mut Self::Nodes {
        &mut self.nodes
    }

    fn edges(&self) -> &Self::Edges {
        &self.edges
    }

    fn edges_mut(&mut self) -> &mut Self::Edges {
        &mut self.edges
    }

    fn components(&self) -> &Self::Components {
        &self.components
    }

    fn components_mut(&mut self) -> &mut Self::Components {
        &mut self.components
    }

    /// Wraps `f` in `BEGIN IMMEDIATE` / `COMMIT`, rolling back on error.
    fn atomically<R, F>(&mut self, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut Self) -> Result<R, StorageError>,
    {
        self.conn.lock().execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(value) => {
                self.conn.lock().execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                self.conn.lock().execute_batch("ROLLBACK")?;
                Err(e)
            }
        }
    }
}
