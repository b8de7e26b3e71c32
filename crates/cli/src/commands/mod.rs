//! Command implementations.

mod convert;
mod validate;

pub use convert::run_convert;
pub use validate::run_validate;
