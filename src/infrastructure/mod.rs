//! Infrastructure layer - Concrete implementations

pub mod api_key;
pub mod observability;
pub mod usage;
