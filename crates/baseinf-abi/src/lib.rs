//! base-inf ABI crate: contracts shared by the generation driver and engine backends.

pub mod backend;
pub mod error;
pub mod token;

pub use backend::*;
pub use error::*;
pub use token::*;
