//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate create candidates before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `StaleWrite`) in
//!   addition to DB transport errors.

pub mod note_repo;
