//! Domain model for the note core.
//!
//! # Responsibility
//! - Define the single `Note` entity shared by store, list and detail layers.
//! - Own derived projections (`preview`, `is_empty`) and the timestamp codec.
//!
//! # Invariants
//! - A persisted note is identified by a positive store-assigned `NoteId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod note;
