// src/handlers/mod.rs

pub mod auth;
pub mod learner;
pub mod questions;
pub mod quiz;
