//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer, providing
//! concrete implementations for data persistence, caching, and existence
//! filtering.
//!
//! # Modules
//!
//! - [`cache`] - Lookup cache abstractions (Redis, in-memory, and no-op)
//! - [`gate`] - Probabilistic existence gate (RedisBloom, in-memory, and pass-through)
//! - [`persistence`] - Mapping repository implementations

pub mod cache;
pub mod gate;
pub mod persistence;
