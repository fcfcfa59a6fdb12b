//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce model rules (names, matrix, actors) before storage is touched.
//! - Translate repository failures into `ModelError`.

pub mod audit_service;
pub mod node_service;
pub mod relationship_service;
