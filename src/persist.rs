// used for persistence
use rusqlite::{Connection, OptionalExtension, Row, params};

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::datatype::TypeTag;
use crate::error::{AnnexError, Result};
use crate::registry::TableDescriptor;
use crate::store::AttributeRow;

/// A key/tag/raw-value triple ready for insertion.
pub type EncodedEntry = (String, TypeTag, Option<String>);

// ------------- Persistence -------------

/// The storage collaborator: indexed point lookups, the atomic upsert
/// primitive, bulk replace, anti-join queries, and schema probes, all over a
/// single SQLite connection. Callers share a `Storage` behind an `Arc`; the
/// connection itself is serialized by a mutex.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AnnexError::Lock(e.to_string()))
    }

    /// Run a closure against the raw connection. The parent tables belong to
    /// an external collaborator; this is the seam through which they are
    /// created and populated.
    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.conn()?;
        Ok(f(&conn)?)
    }

    /// Create the attribute table for an entity type if it does not exist.
    ///
    /// The unique `(foreign key, key)` index backs the atomic upsert; without
    /// it `ON CONFLICT` has nothing to target.
    pub fn ensure_attribute_table(&self, descriptor: &TableDescriptor) -> Result<()> {
        let table = descriptor.attribute_table();
        let fk = descriptor.foreign_key();
        self.conn()?.execute_batch(&format!(
            r#"
            create table if not exists "{table}" (
                id integer primary key autoincrement,
                "{fk}" integer not null,
                key text not null,
                type text not null default 'string',
                value text null,
                created_at text not null,
                updated_at text not null
            );
            create unique index if not exists "{table}_{fk}_key"
                on "{table}" ("{fk}", key);
            "#
        ))?;
        Ok(())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "select 1 from sqlite_master where type = 'table' and name = ?1",
        )?;
        Ok(stmt.exists(params![name])?)
    }

    pub fn fetch(
        &self,
        descriptor: &TableDescriptor,
        parent: i64,
        key: &str,
    ) -> Result<Option<AttributeRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            r#"select id, "{fk}", key, type, value, created_at, updated_at
                from "{table}" where "{fk}" = ?1 and key = ?2"#,
            table = descriptor.attribute_table(),
            fk = descriptor.foreign_key(),
        ))?;
        Ok(stmt
            .query_row(params![parent, key], row_to_attribute)
            .optional()?)
    }

    pub fn exists(&self, descriptor: &TableDescriptor, parent: i64, key: &str) -> Result<bool> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            r#"select 1 from "{table}" where "{fk}" = ?1 and key = ?2"#,
            table = descriptor.attribute_table(),
            fk = descriptor.foreign_key(),
        ))?;
        Ok(stmt.exists(params![parent, key])?)
    }

    /// Atomic conditional upsert keyed by `(parent, key)`: insert when the
    /// key is absent, update type/value/updated_at in place when it exists.
    /// Returns the row as stored.
    pub fn upsert(
        &self,
        descriptor: &TableDescriptor,
        parent: i64,
        key: &str,
        tag: TypeTag,
        raw: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<AttributeRow> {
        let table = descriptor.attribute_table();
        let fk = descriptor.foreign_key();
        let conn = self.conn()?;
        {
            let mut stmt = conn.prepare_cached(&format!(
                r#"insert into "{table}" ("{fk}", key, type, value, created_at, updated_at)
                    values (?1, ?2, ?3, ?4, ?5, ?5)
                    on conflict ("{fk}", key) do update set
                        type = excluded.type,
                        value = excluded.value,
                        updated_at = excluded.updated_at"#,
            ))?;
            stmt.execute(params![parent, key, tag.as_str(), raw, now])?;
        }
        let mut stmt = conn.prepare_cached(&format!(
            r#"select id, "{fk}", key, type, value, created_at, updated_at
                from "{table}" where "{fk}" = ?1 and key = ?2"#,
        ))?;
        Ok(stmt.query_row(params![parent, key], row_to_attribute)?)
    }

    /// Replace every attribute of a parent with the supplied entries, inside
    /// one transaction so readers on this storage never observe the
    /// intermediate empty state. Returns the number of rows inserted.
    pub fn replace_all(
        &self,
        descriptor: &TableDescriptor,
        parent: i64,
        entries: &[EncodedEntry],
        now: NaiveDateTime,
    ) -> Result<usize> {
        let table = descriptor.attribute_table();
        let fk = descriptor.foreign_key();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            &format!(r#"delete from "{table}" where "{fk}" = ?1"#),
            params![parent],
        )?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(&format!(
                r#"insert into "{table}" ("{fk}", key, type, value, created_at, updated_at)
                    values (?1, ?2, ?3, ?4, ?5, ?5)"#,
            ))?;
            for (key, tag, raw) in entries {
                inserted += stmt.execute(params![parent, key, tag.as_str(), raw, now])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn delete_key(
        &self,
        descriptor: &TableDescriptor,
        parent: i64,
        key: &str,
    ) -> Result<usize> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            r#"delete from "{table}" where "{fk}" = ?1 and key = ?2"#,
            table = descriptor.attribute_table(),
            fk = descriptor.foreign_key(),
        ))?;
        Ok(stmt.execute(params![parent, key])?)
    }

    /// Parents owning an attribute row with the given key, optionally further
    /// restricted to an exact match on the raw stored value.
    pub fn matching_parents(
        &self,
        descriptor: &TableDescriptor,
        key: &str,
        raw_value: Option<&str>,
    ) -> Result<Vec<i64>> {
        let parent = descriptor.parent_table();
        let table = descriptor.attribute_table();
        let fk = descriptor.foreign_key();
        let conn = self.conn()?;
        let mut ids = Vec::new();
        match raw_value {
            Some(raw) => {
                let mut stmt = conn.prepare_cached(&format!(
                    r#"select p.id from "{parent}" p where exists (
                        select 1 from "{table}" m
                        where m."{fk}" = p.id and m.key = ?1 and m.value = ?2
                    ) order by p.id"#,
                ))?;
                let rows = stmt.query_map(params![key, raw], |row| row.get(0))?;
                for id in rows {
                    ids.push(id?);
                }
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    r#"select p.id from "{parent}" p where exists (
                        select 1 from "{table}" m
                        where m."{fk}" = p.id and m.key = ?1
                    ) order by p.id"#,
                ))?;
                let rows = stmt.query_map(params![key], |row| row.get(0))?;
                for id in rows {
                    ids.push(id?);
                }
            }
        }
        Ok(ids)
    }

    /// Count attribute rows whose foreign key matches no parent row.
    pub fn count_orphans(&self, descriptor: &TableDescriptor) -> Result<u64> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(&format!(
            r#"select count(*) from "{table}" m where not exists (
                select 1 from "{parent}" p where p.id = m."{fk}"
            )"#,
            table = descriptor.attribute_table(),
            parent = descriptor.parent_table(),
            fk = descriptor.foreign_key(),
        ))?;
        Ok(stmt.query_row([], |row| row.get(0))?)
    }

    /// Delete orphaned attribute rows in batches of `batch_size`, so a large
    /// backlog never holds the write lock for one long statement. Returns the
    /// total number of rows deleted.
    pub fn delete_orphans(&self, descriptor: &TableDescriptor, batch_size: usize) -> Result<u64> {
        // A zero limit deletes nothing, which would keep the loop from ever
        // reaching its exit test.
        let batch_size = batch_size.max(1);
        let sql = format!(
            r#"delete from "{table}" where rowid in (
                select m.rowid from "{table}" m where not exists (
                    select 1 from "{parent}" p where p.id = m."{fk}"
                ) limit ?1
            )"#,
            table = descriptor.attribute_table(),
            parent = descriptor.parent_table(),
            fk = descriptor.foreign_key(),
        );
        let mut total: u64 = 0;
        loop {
            let deleted = {
                let conn = self.conn()?;
                let mut stmt = conn.prepare_cached(&sql)?;
                stmt.execute(params![batch_size as i64])?
            };
            total += deleted as u64;
            debug!(deleted, total, "orphan batch removed");
            if deleted < batch_size {
                break;
            }
        }
        Ok(total)
    }
}

fn row_to_attribute(row: &Row) -> rusqlite::Result<AttributeRow> {
    let tag: String = row.get(3)?;
    Ok(AttributeRow {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        key: row.get(2)?,
        tag: TypeTag::parse(&tag),
        raw_value: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
