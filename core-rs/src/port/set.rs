//! Concurrent port set guarded by a read/write lock

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Set of ports safe to read while it is being populated
#[derive(Debug, Default)]
pub struct PortSet {
    inner: RwLock<HashSet<u16>>,
}

impl PortSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a port, returning `true` if it was not present
    pub fn add(&self, port: u16) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(port)
    }

    pub fn remove(&self, port: u16) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&port)
    }

    pub fn contains(&self, port: u16) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&port)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Snapshot of the members in ascending order
    pub fn to_sorted_vec(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect();
        ports.sort_unstable();
        ports
    }
}

impl FromIterator<u16> for PortSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        PortSet {
            inner: RwLock::new(iter.into_iter().collect()),
        }
    }
}
