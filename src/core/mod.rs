//! Core model types and errors.
//!
//! The data model mirrors the NF-e fields the editor touches: header
//! metadata, one explicit [`LineItem`] shape per row, and the tagged
//! recipient [`TaxId`].

mod error;
mod types;

pub use error::*;
pub use types::*;
