//! Invariant checking for graphs before and after rewriting.
mod error;
mod validator;

pub use self::error::{ValidationError, ValidationErrorType};
pub use self::validator::Validator;
