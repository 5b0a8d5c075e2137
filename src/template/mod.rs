// src/template/mod.rs

pub mod questionnaire;
pub mod registry;
