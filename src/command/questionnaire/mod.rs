// src/command/questionnaire/mod.rs

pub mod aggregate;
pub mod binder;
pub mod form;
pub mod nav;
pub mod ops;
pub mod persist;
pub mod rules;
pub mod submit;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregate::*;
pub use binder::*;
pub use form::*;
pub use nav::*;
pub use ops::*;
pub use persist::{apply_snapshot, clear, load, save, save_best_effort, to_snapshot};
pub use rules::*;
pub use submit::*;
pub use types::*;
pub use validate::*;
