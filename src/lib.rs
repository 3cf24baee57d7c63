//! Annex – schema-less key/value attributes attached to relational entities.
//!
//! Annex keeps an auxiliary *attribute table* next to each parent-entity
//! table: arbitrary named values stored as rows of
//! `(parent id, key, type tag, serialized value)`, with automatic type
//! inference on write and typed decoding on read. No foreign key is enforced
//! against the parent table, so a batch reconciler restores referential
//! integrity when parents are deleted out-of-band.
//!
//! ## Modules
//! * [`datatype`] – The closed [`datatype::TypeTag`] vocabulary, the
//!   [`datatype::AttrValue`] runtime value, and the ordered
//!   [`datatype::classify`] inference rules.
//! * [`codec`] – Pure `encode`/`decode` between runtime values and the stored
//!   text form, keyed on the type tag.
//! * [`registry`] – Explicit mapping from an entity-type name to its
//!   [`registry::TableDescriptor`] (parent table, attribute table, foreign
//!   key).
//! * [`persist`] – SQLite storage collaborator: schema creation, the atomic
//!   upsert primitive, bulk replace, and anti-join queries.
//! * [`store`] – The [`store::AttributeStore`] protocol scoped to one parent,
//!   the [`store::HasAttribute`] filter predicate, and the
//!   [`store::AttributeCapable`] capability trait.
//! * [`reconcile`] – Confirmation-gated, batched cleanup of orphaned
//!   attribute rows.
//! * [`clock`] – Injectable time source for row timestamps.
//! * [`settings`] – File/environment configuration for the batch tool.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use annex::clock::SystemClock;
//! use annex::datatype::AttrValue;
//! use annex::persist::Storage;
//! use annex::registry::TypeRegistry;
//! use annex::store::AttributeStore;
//!
//! let storage = Arc::new(Storage::open_in_memory().unwrap());
//! let mut registry = TypeRegistry::new();
//! let books = registry.register_conventional("book").unwrap();
//! storage.ensure_attribute_table(&books).unwrap();
//!
//! let attrs = AttributeStore::new(storage, books, 1, Arc::new(SystemClock));
//! attrs.set("color", &AttrValue::from("red")).unwrap();
//! assert_eq!(attrs.get("color", None, None).unwrap(), AttrValue::from("red"));
//! ```

pub mod clock;
pub mod codec;
pub mod datatype;
pub mod error;
pub mod persist;
pub mod reconcile;
pub mod registry;
pub mod settings;
pub mod store;
