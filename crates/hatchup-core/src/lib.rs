//! Domain model and collaborator contracts for the HatchUp backend.
//!
//! Nothing in this crate performs IO; adapters live in
//! `hatchup-infrastructure` and `hatchup-interaction`.

pub mod analysis;
pub mod clock;
pub mod completion;
pub mod document;
pub mod error;
pub mod identity;
pub mod research;

pub use error::{HatchupError, Result};
