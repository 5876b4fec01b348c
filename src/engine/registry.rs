//! Node Registry - identifier to live node mapping.
//!
//! Owns every live node handle, keyed by identifier:
//! - Identifier uniqueness among live nodes
//! - ReactiveSet of live identifiers (deriveds react to add/remove)
//! - The single root slot
//! - Identifier minting for nodes created without one

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use spark_signals::{signal, ReactiveSet, Signal};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::host::ElementId;
use crate::primitives::Cmp;

// =============================================================================
// Registry State
// =============================================================================

thread_local! {
    /// Map node identifier to its live handle.
    static NODES: RefCell<HashMap<String, Cmp>> = RefCell::new(HashMap::new());

    /// Set of live identifiers (for iteration and reactive observation).
    static LIVE_IDS: RefCell<ReactiveSet<String>> = RefCell::new(ReactiveSet::new());

    /// Identifier of the node attached directly to the host surface.
    static ROOT_ID: Signal<Option<String>> = signal(None);
}

// =============================================================================
// Registration
// =============================================================================

/// Store a node under its identifier.
///
/// Fails with [`Error::DuplicateIdentifier`] if the identifier is live.
pub fn register(cmp: &Cmp) -> Result<()> {
    let id = cmp.id();
    let inserted = NODES.with(|nodes| {
        let mut nodes = nodes.borrow_mut();
        if nodes.contains_key(&id) {
            return false;
        }
        nodes.insert(id.clone(), cmp.clone());
        true
    });
    if !inserted {
        return Err(Error::DuplicateIdentifier { id });
    }
    LIVE_IDS.with(|set| {
        set.borrow_mut().insert(id);
    });
    Ok(())
}

/// Remove a node's entry. Unknown identifiers are ignored, so recursive
/// teardown may visit a node more than once.
pub fn unregister(id: &str) -> Option<Cmp> {
    let removed = NODES.with(|nodes| nodes.borrow_mut().remove(id));
    if removed.is_some() {
        LIVE_IDS.with(|set| {
            set.borrow_mut().remove(id);
        });
    }
    removed
}

/// Look up a live node. Never fails.
pub fn get_cmp_by_id(id: &str) -> Option<Cmp> {
    NODES.with(|nodes| nodes.borrow().get(id).cloned())
}

pub fn is_registered(id: &str) -> bool {
    NODES.with(|nodes| nodes.borrow().contains_key(id))
}

/// Identifiers of every live node. Reading this inside a derived tracks it.
pub fn get_live_ids() -> Vec<String> {
    LIVE_IDS.with(|set| set.borrow().iter().cloned().collect())
}

pub fn node_count() -> usize {
    LIVE_IDS.with(|set| set.borrow().len())
}

/// Elements held by live nodes.
pub fn live_elements() -> HashSet<ElementId> {
    NODES.with(|nodes| nodes.borrow().values().map(Cmp::elem).collect())
}

/// A fresh identifier not used by any live node.
pub fn mint_identifier() -> String {
    loop {
        let id = format!("c-{}", Uuid::new_v4());
        if !is_registered(&id) {
            return id;
        }
    }
}

// =============================================================================
// Root Slot
// =============================================================================

pub fn get_root_id() -> Option<String> {
    ROOT_ID.with(|root| root.get())
}

/// Fails with [`Error::RootAlreadyAttached`] naming the current root when
/// the slot is taken by another node.
pub fn check_root_free(id: &str) -> Result<()> {
    match get_root_id() {
        Some(existing) if existing != id => Err(Error::RootAlreadyAttached { id: existing }),
        _ => Ok(()),
    }
}

pub fn claim_root(id: &str) -> Result<()> {
    check_root_free(id)?;
    ROOT_ID.with(|root| root.set(Some(id.to_string())));
    Ok(())
}

/// Free the root slot if `id` holds it.
pub fn release_root(id: &str) {
    if get_root_id().as_deref() == Some(id) {
        ROOT_ID.with(|root| root.set(None));
    }
}

// =============================================================================
// Reset (for testing)
// =============================================================================

/// Drop every registered node handle and free the root slot.
pub fn reset_registry() {
    let old = NODES.with(|nodes| std::mem::take(&mut *nodes.borrow_mut()));
    drop(old);
    LIVE_IDS.with(|set| set.borrow_mut().clear());
    ROOT_ID.with(|root| root.set(None));
}
