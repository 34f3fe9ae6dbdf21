//! Fetch subsystem
//!
//! The seam between the algebra and the backing SQL engine. Expressions are
//! finalized and rendered here, then handed to an `Executor`.

mod errors;
mod executor;
#[allow(clippy::module_inception)]
mod fetch;

pub use errors::{BoxError, FetchError, FetchResult};
pub use executor::{Executor, Row};
