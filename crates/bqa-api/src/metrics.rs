//! Minimal prometheus registry behind `/metrics`.
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};

pub fn registry() -> Registry {
    Registry::new()
}

pub fn queries_counter(registry: &Registry) -> Result<IntCounter, prometheus::Error> {
    let counter = IntCounter::new("bqa_queries_total", "Queries received by the API")?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}
