//! Random port allocation from a free-port pool
//!
//! Draws are independent, so the same port may be handed out more than once.

use rand::Rng;
use tracing::debug;

use crate::errors::AllocationError;

/// Samples ports, with replacement, from a pool of free ports
#[derive(Debug, Clone, Copy, Default)]
pub struct PortAllocator;

impl PortAllocator {
    pub fn new() -> Self {
        PortAllocator
    }

    /// Draw `count` ports using the thread-local RNG
    ///
    /// # Example
    ///
    /// ```
    /// use podinit_core::port::PortAllocator;
    ///
    /// let ports = PortAllocator::new().allocate(&[20001, 20002], 3).unwrap();
    /// assert_eq!(ports.len(), 3);
    /// ```
    pub fn allocate(&self, available: &[u16], count: usize) -> Result<Vec<u16>, AllocationError> {
        self.allocate_with(&mut rand::thread_rng(), available, count)
    }

    /// Draw `count` ports using the given RNG
    pub fn allocate_with<R: Rng>(
        &self,
        rng: &mut R,
        available: &[u16],
        count: usize,
    ) -> Result<Vec<u16>, AllocationError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if available.is_empty() {
            return Err(AllocationError::EmptyPool);
        }

        let ports: Vec<u16> = (0..count)
            .map(|_| available[rng.gen_range(0..available.len())])
            .collect();

        let mut distinct = ports.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if distinct.len() < ports.len() {
            debug!(ports = ?ports, "Allocation contains duplicate ports");
        }

        Ok(ports)
    }
}
