//! Orphan reconciliation.
//!
//! Attribute rows reference their parent without an enforced foreign key, so
//! parents deleted out-of-band leave orphaned rows behind. The reconciler
//! finds them with an anti-join and deletes them in bounded batches. This is
//! a point-in-time repair, not a maintained constraint: new orphans can
//! appear again before the next run.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AnnexError, Result};
use crate::persist::Storage;
use crate::registry::TypeRegistry;

/// The external confirmation signal for the irreversible delete. Deletion
/// runs only when the caller has obtained an affirmative answer; a withheld
/// confirmation turns the run into a counting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Granted,
    Withheld,
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Orphaned rows deleted (with confirmation) or counted (without).
    pub orphans: u64,
    /// Whether the rows were actually deleted.
    pub deleted: bool,
}

pub struct OrphanReconciler {
    storage: Arc<Storage>,
    registry: Arc<TypeRegistry>,
    batch_size: usize,
}

impl OrphanReconciler {
    pub fn new(storage: Arc<Storage>, registry: Arc<TypeRegistry>, batch_size: usize) -> Self {
        Self {
            storage,
            registry,
            batch_size,
        }
    }

    /// Reconcile the attribute table of `entity` against its parent table.
    ///
    /// Preconditions are reported, recoverable failures: an unregistered
    /// entity is a `Configuration` error and a missing attribute or parent
    /// table is a `Schema` error; nothing is mutated in either case.
    pub fn reconcile(&self, entity: &str, confirmation: Confirmation) -> Result<Reconciliation> {
        let descriptor = self.registry.resolve(entity)?;
        if !self.storage.table_exists(descriptor.attribute_table())? {
            return Err(AnnexError::Schema(format!(
                "attribute table '{}' does not exist",
                descriptor.attribute_table()
            )));
        }
        if !self.storage.table_exists(descriptor.parent_table())? {
            return Err(AnnexError::Schema(format!(
                "parent table '{}' does not exist",
                descriptor.parent_table()
            )));
        }

        if confirmation == Confirmation::Withheld {
            let orphans = self.storage.count_orphans(&descriptor)?;
            warn!(
                entity,
                orphans, "confirmation withheld, counted orphans only"
            );
            return Ok(Reconciliation {
                orphans,
                deleted: false,
            });
        }

        let orphans = self.storage.delete_orphans(&descriptor, self.batch_size)?;
        info!(
            entity,
            table = descriptor.attribute_table(),
            orphans,
            "orphaned attribute rows deleted"
        );
        Ok(Reconciliation {
            orphans,
            deleted: true,
        })
    }
}
