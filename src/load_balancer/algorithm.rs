// src/load_balancer/algorithm.rs

/// Picks the index of the next backend out of `len` candidates.
///
/// Implementations own whatever selection state they need and must be safe
/// to call from many tasks at once.
pub trait LoadBalancer: Send + Sync {
    /// Returns an index in `0..len`. `len` is never zero.
    fn select_index(&self, len: usize) -> usize;

    fn name(&self) -> &'static str;
}
