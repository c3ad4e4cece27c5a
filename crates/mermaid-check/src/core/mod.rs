//! Core abstractions for diagram checking
//!
//! Everything here is independent of the parser backend: block extraction,
//! the validator contract, reports and errors.

mod artifacts;
mod error;
mod extractor;
pub mod logging;
mod report;
mod types;
mod validator;

pub use artifacts::*;
pub use error::*;
pub use extractor::*;
pub use logging::*;
pub use report::*;
pub use types::*;
pub use validator::*;
