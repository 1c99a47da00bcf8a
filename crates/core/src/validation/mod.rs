//! Post-parse validation of game records

mod types;
mod validator;

pub use types::*;
pub use validator::{validate, validate_game};
