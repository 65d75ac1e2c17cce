// src/models/mod.rs

pub mod account;
pub mod attempt;
pub mod learner;
pub mod question;
