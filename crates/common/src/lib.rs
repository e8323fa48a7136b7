//! Types shared by the Stitch client crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
