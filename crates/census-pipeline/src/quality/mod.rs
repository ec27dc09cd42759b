//! Dataset validation before loading.

mod validator;

pub use validator::{Validator, validate};
