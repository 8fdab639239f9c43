// src/load_balancer/mod.rs
mod algorithm;
mod round_robin;

pub use algorithm::LoadBalancer;
pub use round_robin::RoundRobinBalancer;
