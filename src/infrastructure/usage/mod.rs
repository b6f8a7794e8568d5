//! Usage log infrastructure

mod in_memory;

pub use in_memory::InMemoryUsageLogRepository;
