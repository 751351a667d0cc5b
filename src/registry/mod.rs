//! Fixed-capacity binding registry.
//!
//! Maps JS-visible names to owner handles and dispatch functions. A slot is
//! active iff it holds a binding, and the slot index is the token the native
//! library carries back to the trampoline. Free slots are reused lowest
//! index first.

mod binding;

pub use binding::{Binding, BindingIndex, OwnerHandle};

use crate::config::{BridgeConfig, NamePolicy};
use crate::dispatch::Dispatch;
use crate::error::{BridgeError, Result};
use std::sync::Arc;

/// Table of binding slots
pub struct BindingRegistry {
    slots: Vec<Option<Arc<Binding>>>,
    max_name_len: usize,
    name_policy: NamePolicy,
    next_generation: u64,
}

impl BindingRegistry {
    /// Create a registry with `capacity` empty slots
    pub fn new(capacity: usize, max_name_len: usize, name_policy: NamePolicy) -> Self {
        Self {
            slots: vec![None; capacity],
            max_name_len,
            name_policy,
            next_generation: 1,
        }
    }

    /// Create a registry sized and configured from `config`
    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(config.capacity, config.max_name_len, config.name_policy)
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of active bindings
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether no binding is active
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Whether every slot is active
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Apply the name rules used by both register and unregister.
    ///
    /// Names must be non-empty and free of NUL. Over-long names are cut at a
    /// char boundary or rejected, depending on the policy.
    pub fn normalize_name(&self, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(BridgeError::InvalidName("name is empty".into()));
        }
        if name.contains('\0') {
            return Err(BridgeError::InvalidName(format!(
                "name '{}' contains NUL",
                name.escape_debug()
            )));
        }
        if name.len() <= self.max_name_len {
            return Ok(name.to_string());
        }

        match self.name_policy {
            NamePolicy::Reject => Err(BridgeError::NameTooLong {
                len: name.len(),
                max: self.max_name_len,
            }),
            NamePolicy::Truncate => {
                let mut end = self.max_name_len;
                while !name.is_char_boundary(end) {
                    end -= 1;
                }
                if end == 0 {
                    return Err(BridgeError::InvalidName(format!(
                        "name '{}' truncates to nothing",
                        name
                    )));
                }
                Ok(name[..end].to_string())
            }
        }
    }

    /// Store a binding in the lowest free slot
    pub fn register(
        &mut self,
        name: &str,
        owner: OwnerHandle,
        dispatch: Arc<dyn Dispatch>,
    ) -> Result<Arc<Binding>> {
        let name = self.normalize_name(name)?;

        if self.find(&name).is_some() {
            return Err(BridgeError::DuplicateName(name));
        }

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(BridgeError::NoCapacity {
                capacity: self.slots.len(),
            })?;

        let generation = self.next_generation;
        self.next_generation += 1;

        let binding = Arc::new(Binding {
            name,
            owner,
            dispatch,
            index: BindingIndex::new(slot),
            generation,
        });
        self.slots[slot] = Some(Arc::clone(&binding));
        Ok(binding)
    }

    /// Free the slot holding `name`.
    ///
    /// Returns the removed binding, or `None` when nothing matched. Removing
    /// an unknown name is not an error.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<Binding>> {
        let name = self.normalize_name(name).ok()?;
        let index = self.find(&name)?;
        self.slots[index.get()].take()
    }

    /// Free `index` only if it still holds the given registration
    pub fn remove_exact(&mut self, index: BindingIndex, generation: u64) -> Option<Arc<Binding>> {
        if self.is_current(index, generation) {
            self.slots[index.get()].take()
        } else {
            None
        }
    }

    /// Active binding at `index`; `None` for out-of-range or free slots
    pub fn lookup(&self, index: BindingIndex) -> Option<Arc<Binding>> {
        self.slots.get(index.get())?.as_ref().map(Arc::clone)
    }

    /// Whether `index` still holds the registration stamped `generation`
    pub fn is_current(&self, index: BindingIndex, generation: u64) -> bool {
        matches!(
            self.slots.get(index.get()),
            Some(Some(binding)) if binding.generation == generation
        )
    }

    /// Slot of the active binding named `name`, after normalization
    pub fn index_of(&self, name: &str) -> Option<BindingIndex> {
        let name = self.normalize_name(name).ok()?;
        self.find(&name)
    }

    /// Active bindings in slot order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Binding>> + '_ {
        self.slots.iter().flatten()
    }

    fn find(&self, normalized: &str) -> Option<BindingIndex> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .map_or(false, |binding| binding.name == normalized)
        })
        .map(BindingIndex::new)
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("capacity", &self.capacity())
            .field("active", &self.len())
            .field("name_policy", &self.name_policy)
            .finish()
    }
}
