//! Core domain entities representing the business data model.
//!
//! The service has a single entity: the [`Mapping`] between an identifier
//! and its long URL. Entities are plain data structures without business
//! logic; absence of a mapping is expressed as `Option<Mapping>` rather
//! than a sentinel value.

pub mod mapping;

pub use mapping::{Mapping, NewMapping};
