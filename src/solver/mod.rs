//! Constraint solving: contacts (spec §4.8) and joints (spec §4.9).

pub mod contact;
pub mod joints;

pub use contact::ContactSolverSystem;
