// src/engine/mod.rs

//! Adaptive selection, scoring and leveling. Everything here is synchronous
//! and free of I/O; persistence lives behind `repository`.

pub mod difficulty;
pub mod leveling;
pub mod pool;
pub mod progress;
pub mod scoring;
pub mod sequencer;
