// src/load_balancer/round_robin.rs
use crate::load_balancer::LoadBalancer;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robin over a fixed-size pool.
///
/// The counter is advanced before it is read, so a fresh balancer hands out
/// index `1 % len` first.
#[derive(Debug, Default)]
pub struct RoundRobinBalancer {
    counter: AtomicUsize,
}

impl RoundRobinBalancer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary counter value.
    pub fn starting_at(counter: usize) -> Self {
        Self {
            counter: AtomicUsize::new(counter),
        }
    }
}

impl LoadBalancer for RoundRobinBalancer {
    fn select_index(&self, len: usize) -> usize {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        counter % len
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}
