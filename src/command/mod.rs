// src/command/mod.rs

pub mod questionnaire;
