// ⚖️ Reconciler - create / update-if-changed / no-op decisions
// The load-bearing rule: an unchanged record performs no write at all, so
// updated_at cannot move on a no-op run. Change detection is a single
// shared diff helper rather than per-field bookkeeping.

use crate::error::SyncError;
use crate::mapper::LocationAttributes;
use crate::store::{Location, LocationStore};
use serde::Serialize;
use tracing::debug;

// ============================================================================
// FIELD DIFF
// ============================================================================

/// The comparable fields of a location. The code is identity, not a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocationField {
    Name,
    StartDate,
    EndDate,
}

impl LocationField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationField::Name => "name",
            LocationField::StartDate => "start_date",
            LocationField::EndDate => "end_date",
        }
    }
}

/// Compute which comparable fields differ between the persisted location
/// and the incoming attributes. Value equality throughout; an absent date
/// is distinct from any concrete date.
pub fn changed_fields(existing: &Location, incoming: &LocationAttributes) -> Vec<LocationField> {
    let mut changed = Vec::new();

    if existing.name != incoming.name {
        changed.push(LocationField::Name);
    }
    if existing.start_date != incoming.start_date {
        changed.push(LocationField::StartDate);
    }
    if existing.end_date != incoming.end_date {
        changed.push(LocationField::EndDate);
    }

    changed
}

// ============================================================================
// OUTCOME
// ============================================================================

/// What reconciling one record did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// No location with this code existed; one was created.
    Created,

    /// The location existed and the listed fields drifted; they were
    /// overwritten and updated_at moved.
    Updated(Vec<LocationField>),

    /// The location already matched. Nothing was written.
    Unchanged,
}

impl Outcome {
    pub fn is_change(&self) -> bool {
        !matches!(self, Outcome::Unchanged)
    }
}

/// Reconcile one mapped record against the store by its code.
pub fn reconcile_record(
    store: &LocationStore,
    attrs: &LocationAttributes,
) -> Result<Outcome, SyncError> {
    match store.find_by_code(&attrs.code)? {
        None => {
            store.insert(attrs)?;
            debug!(code = %attrs.code, "created location");
            Ok(Outcome::Created)
        }
        Some(existing) => {
            let diff = changed_fields(&existing, attrs);
            if diff.is_empty() {
                Ok(Outcome::Unchanged)
            } else {
                store.update(attrs)?;
                debug!(code = %attrs.code, fields = ?diff, "updated location");
                Ok(Outcome::Updated(diff))
            }
        }
    }
}

// ============================================================================
// RUN REPORT
// ============================================================================

/// Tally of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub fetched: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl SyncReport {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::Updated(_) => self.updated += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.created + self.updated > 0
    }

    pub fn summary(&self) -> String {
        format!(
            "register sync: {} records fetched, {} created, {} updated, {} unchanged",
            self.fetched, self.created, self.updated, self.unchanged
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
