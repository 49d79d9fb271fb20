//! Domain model for notes and their structured bodies.
//!
//! # Responsibility
//! - Define the persisted note record and its create/update inputs.
//! - Define the document tree, its HTML codec and the embedded Link Node.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId`.
//! - Link Nodes are denormalized snapshots, not foreign keys.

pub mod commands;
pub mod cover;
pub mod document;
pub mod html;
pub mod note;
pub mod note_link;
