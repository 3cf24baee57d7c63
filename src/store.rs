//! The attribute store protocol.
//!
//! An [`AttributeStore`] is scoped to one parent entity: it owns that
//! parent's slice of the attribute table and exposes get/set/has/remove plus
//! the bulk operations. Values flow through [`crate::datatype::classify`] on
//! the way in and [`crate::codec`] in both directions.

use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::clock::Clock;
use crate::codec;
use crate::datatype::{AttrValue, TypeTag, classify};
use crate::error::Result;
use crate::persist::{EncodedEntry, Storage};
use crate::registry::TableDescriptor;

/// One persisted attribute row, as stored.
///
/// `raw_value` is NULL exactly when the original value was null, and its text
/// is decodable under `tag`. At most one live row exists per
/// `(parent_id, key)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRow {
    pub id: i64,
    pub parent_id: i64,
    pub key: String,
    pub tag: TypeTag,
    pub raw_value: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl AttributeRow {
    /// Decode the stored value under its declared tag.
    pub fn value(&self) -> Result<AttrValue> {
        codec::decode(self.raw_value.as_deref(), self.tag).map_err(|e| e.keyed(&self.key))
    }
}

/// A predicate over the parent-entity collection: parents owning an attribute
/// row with `key`, and optionally an exact match on the raw stored text (not
/// the decoded value).
#[derive(Debug, Clone)]
pub struct HasAttribute {
    key: String,
    raw_value: Option<String>,
}

impl HasAttribute {
    pub fn key(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            raw_value: None,
        }
    }

    pub fn with_raw_value(mut self, raw: &str) -> Self {
        self.raw_value = Some(raw.to_owned());
        self
    }
}

/// Attribute storage scoped to a single parent entity.
pub struct AttributeStore {
    storage: Arc<Storage>,
    descriptor: Arc<TableDescriptor>,
    parent: i64,
    clock: Arc<dyn Clock>,
}

impl AttributeStore {
    pub fn new(
        storage: Arc<Storage>,
        descriptor: Arc<TableDescriptor>,
        parent: i64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            descriptor,
            parent,
            clock,
        }
    }

    pub fn parent(&self) -> i64 {
        self.parent
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    /// Get the value stored under `key`.
    ///
    /// A missing key with a non-null `default` yields the default after a
    /// round trip through the codec (tagged by `tag_hint` or by inference),
    /// so the caller sees the same shape a stored value would have; nothing
    /// is persisted. A missing key without a default yields `Null`.
    pub fn get(
        &self,
        key: &str,
        default: Option<&AttrValue>,
        tag_hint: Option<TypeTag>,
    ) -> Result<AttrValue> {
        if let Some(row) = self.storage.fetch(&self.descriptor, self.parent, key)? {
            return row.value();
        }
        match default {
            Some(value) if !value.is_null() => {
                let tag = tag_hint.unwrap_or_else(|| classify(value));
                let raw = codec::encode(value, tag);
                codec::decode(raw.as_deref(), tag).map_err(|e| e.keyed(key))
            }
            _ => Ok(AttrValue::Null),
        }
    }

    /// Set `key` to `value`, inferring the tag. Insert-or-update in one
    /// atomic storage operation; exactly one row exists for the key
    /// afterwards regardless of concurrent setters.
    pub fn set(&self, key: &str, value: &AttrValue) -> Result<AttributeRow> {
        let tag = classify(value);
        let raw = codec::encode(value, tag);
        debug!(parent = self.parent, key, %tag, "set attribute");
        self.storage.upsert(
            &self.descriptor,
            self.parent,
            key,
            tag,
            raw.as_deref(),
            self.clock.now(),
        )
    }

    /// Apply [`set`](Self::set) per entry. Each key updates atomically on its
    /// own; there is no atomicity across entries.
    pub fn set_many<'a, I>(&self, entries: I) -> Result<&Self>
    where
        I: IntoIterator<Item = (&'a str, &'a AttrValue)>,
    {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(self)
    }

    /// Replace this parent's attributes with exactly the supplied entries:
    /// afterwards the supplied keys exist and no others do. Returns the
    /// number of rows written.
    pub fn sync<'a, I>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a AttrValue)>,
    {
        let now = self.clock.now();
        let encoded: Vec<EncodedEntry> = entries
            .into_iter()
            .map(|(key, value)| {
                let tag = classify(value);
                (key.to_owned(), tag, codec::encode(value, tag))
            })
            .collect();
        debug!(parent = self.parent, entries = encoded.len(), "sync attributes");
        self.storage
            .replace_all(&self.descriptor, self.parent, &encoded, now)
    }

    /// Whether a row exists for `key`, regardless of its value.
    pub fn has(&self, key: &str) -> Result<bool> {
        self.storage.exists(&self.descriptor, self.parent, key)
    }

    /// Delete the row for `key`; returns the number of rows removed (0 or 1).
    pub fn remove(&self, key: &str) -> Result<usize> {
        debug!(parent = self.parent, key, "remove attribute");
        self.storage.delete_key(&self.descriptor, self.parent, key)
    }
}

/// Ids of parents matching a [`HasAttribute`] predicate, in ascending order.
pub fn filter_parents(
    storage: &Storage,
    descriptor: &TableDescriptor,
    predicate: &HasAttribute,
) -> Result<Vec<i64>> {
    storage.matching_parents(descriptor, &predicate.key, predicate.raw_value.as_deref())
}

/// Capability interface for entities that carry attributes.
///
/// An entity owns an [`AttributeStore`] scoped to its id and exposes it
/// through this trait; the provided methods are the public attribute surface.
pub trait AttributeCapable {
    fn attributes(&self) -> &AttributeStore;

    fn get_attribute(
        &self,
        key: &str,
        default: Option<&AttrValue>,
        tag_hint: Option<TypeTag>,
    ) -> Result<AttrValue> {
        self.attributes().get(key, default, tag_hint)
    }

    fn set_attribute(&self, key: &str, value: &AttrValue) -> Result<AttributeRow> {
        self.attributes().set(key, value)
    }

    fn set_attributes<'a, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a AttrValue)>,
    {
        self.attributes().set_many(entries).map(|_| ())
    }

    fn sync_attributes<'a, I>(&self, entries: I) -> Result<usize>
    where
        I: IntoIterator<Item = (&'a str, &'a AttrValue)>,
    {
        self.attributes().sync(entries)
    }

    fn has_attribute(&self, key: &str) -> Result<bool> {
        self.attributes().has(key)
    }

    fn remove_attribute(&self, key: &str) -> Result<usize> {
        self.attributes().remove(key)
    }
}
