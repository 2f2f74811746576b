//! Domain models for the patient registry.

mod patient;
mod visit;

pub use patient::*;
pub use visit::*;
