//! The entity-type registry.
//!
//! Every attribute table belongs to exactly one parent-entity type. Instead
//! of deriving table names by reflecting over class names at call time, each
//! type is registered up front as a [`TableDescriptor`] and looked up by its
//! entity name. Descriptor names are interpolated into SQL, so they are
//! validated as plain identifiers at construction.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{AnnexError, Result};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Names of the tables and columns that make up one entity type's attribute
/// storage: the parent table, the auxiliary attribute table, and the foreign
/// key column pointing from the latter to the former.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    entity: String,
    parent_table: String,
    attribute_table: String,
    foreign_key: String,
}

impl TableDescriptor {
    pub fn new(
        entity: &str,
        parent_table: &str,
        attribute_table: &str,
        foreign_key: &str,
    ) -> Result<Self> {
        for name in [entity, parent_table, attribute_table, foreign_key] {
            if !IDENTIFIER.is_match(name) {
                return Err(AnnexError::Configuration(format!(
                    "'{}' is not a valid identifier",
                    name
                )));
            }
        }
        Ok(Self {
            entity: entity.to_owned(),
            parent_table: parent_table.to_owned(),
            attribute_table: attribute_table.to_owned(),
            foreign_key: foreign_key.to_owned(),
        })
    }

    /// Derive the conventional names for an entity: `book` gets the parent
    /// table `books`, the attribute table `book_meta` and the foreign key
    /// `book_id`.
    pub fn conventional(entity: &str) -> Result<Self> {
        Self::new(
            entity,
            &pluralize(entity),
            &format!("{}_meta", entity),
            &format!("{}_id", entity),
        )
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }
    pub fn parent_table(&self) -> &str {
        &self.parent_table
    }
    pub fn attribute_table(&self) -> &str {
        &self.attribute_table
    }
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }
}

/// Basic English pluralization, covering the table names that occur in
/// practice: trailing consonant + `y` becomes `ies`, sibilant endings take
/// `es`, everything else takes `s`.
fn pluralize(noun: &str) -> String {
    if let Some(stem) = noun.strip_suffix('y') {
        let penultimate = stem.chars().last();
        if penultimate.is_some_and(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{}ies", stem);
        }
    }
    if noun.ends_with('s')
        || noun.ends_with('x')
        || noun.ends_with('z')
        || noun.ends_with("ch")
        || noun.ends_with("sh")
    {
        return format!("{}es", noun);
    }
    format!("{}s", noun)
}

/// Keeper of registered entity types, looked up by entity name.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    kept: HashMap<String, Arc<TableDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self {
            kept: HashMap::new(),
        }
    }

    pub fn register(&mut self, descriptor: TableDescriptor) -> Arc<TableDescriptor> {
        let kept = Arc::new(descriptor);
        self.kept.insert(kept.entity().to_owned(), Arc::clone(&kept));
        kept
    }

    /// Register an entity under its conventional names.
    pub fn register_conventional(&mut self, entity: &str) -> Result<Arc<TableDescriptor>> {
        Ok(self.register(TableDescriptor::conventional(entity)?))
    }

    /// Resolve an entity name to its descriptor. An unregistered name is a
    /// configuration error, not a panic.
    pub fn resolve(&self, entity: &str) -> Result<Arc<TableDescriptor>> {
        self.kept.get(entity).cloned().ok_or_else(|| {
            AnnexError::Configuration(format!("entity type '{}' is not registered", entity))
        })
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}
