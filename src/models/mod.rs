// src/models/mod.rs

pub mod answer;
pub mod assessment;
pub mod question;
pub mod submission;
pub mod user;
