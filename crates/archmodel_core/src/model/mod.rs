//! Meta-model domain types.
//!
//! # Responsibility
//! - Define the five node kinds, their typed attributes and relationships.
//! - Hold the pure rules: name normalization, the relationship matrix and
//!   audit event synthesis.
//!
//! # Invariants
//! - Kinds and relationship kinds are closed enums; string tags exist only at
//!   the storage and caller boundaries.
//! - Deletion is represented by soft-delete tombstones, not hard delete.

pub mod audit;
pub mod kind;
pub mod matrix;
pub mod name;
pub mod node;
pub mod relationship;
