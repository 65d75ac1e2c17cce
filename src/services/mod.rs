// src/services/mod.rs

//! Orchestration between the HTTP layer, the engine and the repository.

pub mod sessions;
pub mod submission;
