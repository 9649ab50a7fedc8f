// src/handlers/mod.rs

pub mod assessment;
pub mod photos;
pub mod questions;
pub mod seed;
