//! Shared mutable state of the cluster: the process registry and the
//! sidechain index counter.
//!
//! These two are the only pieces of shared mutable state in the engine.
//! Both are owned objects handed to their single consumer at construction,
//! never process globals, so independent test runs in one process cannot
//! leak state into each other.

use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::process::Child;

/// Live child-process handles, keyed by node index.
///
/// Entries appear on launch and disappear on confirmed stop; the registry
/// never holds a handle for a node known to have exited. Access goes
/// through the operations below, there is no raw iteration from outside.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    children: Mutex<HashMap<usize, Child>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly spawned child. Returns the previous handle if the
    /// index was already occupied; the caller decides what that means.
    pub fn register(&self, index: usize, child: Child) -> Option<Child> {
        self.children.lock().insert(index, child)
    }

    /// Remove and return the handle for `index`, if registered.
    pub fn take(&self, index: usize) -> Option<Child> {
        self.children.lock().remove(&index)
    }

    /// Run `f` against the registered handle for `index`.
    pub fn with_child<R>(&self, index: usize, f: impl FnOnce(&mut Child) -> R) -> Option<R> {
        self.children.lock().get_mut(&index).map(f)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.children.lock().contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.children.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.lock().is_empty()
    }

    /// Remove every handle, returning them for teardown.
    pub fn drain(&self) -> Vec<(usize, Child)> {
        self.children.lock().drain().collect()
    }

    /// Registered node indexes, sorted.
    pub fn indexes(&self) -> Vec<usize> {
        let mut indexes: Vec<usize> = self.children.lock().keys().copied().collect();
        indexes.sort_unstable();
        indexes
    }
}

/// Hands out stable sidechain indices for directory naming and debug
/// targeting.
///
/// An owned counter constructed per orchestrator, so two orchestrators in
/// one process number their sidechains independently.
#[derive(Debug, Default)]
pub struct SidechainRegistry {
    next: Mutex<usize>,
}

impl SidechainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next sidechain index, starting from 0.
    pub fn next_index(&self) -> usize {
        let mut next = self.next.lock();
        let index = *next;
        *next += 1;
        index
    }

    /// Number of indices handed out so far.
    pub fn count(&self) -> usize {
        *self.next.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidechain_indices_are_stable_and_sequential() {
        let registry = SidechainRegistry::new();
        assert_eq!(registry.next_index(), 0);
        assert_eq!(registry.next_index(), 1);
        assert_eq!(registry.next_index(), 2);
        assert_eq!(registry.count(), 3);
    }

    #[test]
    fn independent_registries_do_not_share_state() {
        let a = SidechainRegistry::new();
        let b = SidechainRegistry::new();
        a.next_index();
        a.next_index();
        assert_eq!(b.next_index(), 0);
    }

    #[tokio::test]
    async fn registry_tracks_registered_children() {
        let registry = ProcessRegistry::new();
        assert!(registry.is_empty());

        let child = tokio::process::Command::new("sleep").arg("5").spawn().unwrap();
        assert!(registry.register(3, child).is_none());
        assert!(registry.contains(3));
        assert_eq!(registry.indexes(), vec![3]);

        let mut child = registry.take(3).unwrap();
        assert!(!registry.contains(3));
        assert!(registry.take(3).is_none());
        child.kill().await.unwrap();
    }
}
