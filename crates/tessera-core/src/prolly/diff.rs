//! Diff and patch operations for Prolly Trees

use super::{Entry, ProllyTree};
use crate::value::Value;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tessera_blockstore::BlockStore;
use tracing::debug;

/// Type of change in a diff
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// Key was added
    Add,
    /// Key was removed
    Remove,
    /// Value was modified
    Modify,
}

/// A key-level change between two tree versions
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueChange {
    /// The key that changed
    pub key: Value,
    /// Type of change
    pub change_type: ChangeType,
    /// Old value (for Remove and Modify on maps)
    pub old_value: Option<Value>,
    /// New value (for Add and Modify on maps)
    pub new_value: Option<Value>,
}

impl KeyValueChange {
    /// Create an add change
    pub fn add(entry: Entry) -> Self {
        Self {
            key: entry.key,
            change_type: ChangeType::Add,
            old_value: None,
            new_value: entry.value,
        }
    }

    /// Create a remove change
    pub fn remove(entry: Entry) -> Self {
        Self {
            key: entry.key,
            change_type: ChangeType::Remove,
            old_value: entry.value,
            new_value: None,
        }
    }

    /// Create a modify change
    pub fn modify(key: Value, old: Option<Value>, new: Option<Value>) -> Self {
        Self {
            key,
            change_type: ChangeType::Modify,
            old_value: old,
            new_value: new,
        }
    }
}

/// Compute the changes that turn `base` into `other`, in key order.
///
/// Both trees are walked once, side by side. Trees with the same root ref
/// are equal and produce no changes without reading any chunk.
pub async fn diff_trees<S: BlockStore>(
    base: &ProllyTree<S>,
    other: &ProllyTree<S>,
) -> Result<Vec<KeyValueChange>> {
    let mut changes = Vec::new();
    if base.root_cid() == other.root_cid() {
        return Ok(changes);
    }

    let mut left = base.iter();
    let mut right = other.iter();
    let mut a = left.next().await?;
    let mut b = right.next().await?;

    loop {
        match (a.take(), b.take()) {
            (None, None) => break,
            (Some(old), None) => {
                changes.push(KeyValueChange::remove(old));
                a = left.next().await?;
            }
            (None, Some(new)) => {
                changes.push(KeyValueChange::add(new));
                b = right.next().await?;
            }
            (Some(old), Some(new)) => match old.key.cmp(&new.key) {
                Ordering::Less => {
                    changes.push(KeyValueChange::remove(old));
                    a = left.next().await?;
                    b = Some(new);
                }
                Ordering::Greater => {
                    changes.push(KeyValueChange::add(new));
                    a = Some(old);
                    b = right.next().await?;
                }
                Ordering::Equal => {
                    if old.value != new.value {
                        changes.push(KeyValueChange::modify(old.key, old.value, new.value));
                    }
                    a = left.next().await?;
                    b = right.next().await?;
                }
            },
        }
    }

    debug!(changes = changes.len(), "diffed trees");
    Ok(changes)
}

/// Apply a change list produced by [`diff_trees`] to `tree`
pub async fn apply_changes<S: BlockStore>(
    tree: &ProllyTree<S>,
    changes: impl IntoIterator<Item = KeyValueChange>,
) -> Result<ProllyTree<S>> {
    let mut result = tree.clone();
    for change in changes {
        result = match change.change_type {
            ChangeType::Add | ChangeType::Modify => {
                let entry = Entry {
                    key: change.key,
                    value: change.new_value,
                };
                result.set(entry).await?
            }
            ChangeType::Remove => result.remove(&change.key).await?,
        };
    }
    Ok(result)
}
