//! Helper utilities, functions, and macros.

#[macro_use]
mod print;

#[macro_use]
mod config;

mod error;
mod framed;

pub use error::TribError;
pub use print::{logger_init, me_prefix, ME};

pub(crate) use framed::{read_frame, write_frame};
