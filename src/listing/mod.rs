//! Paginated listing of public shares and the recursive tree walk built on it.
//!
//! [`Paginator`] issues one listing request per call; [`TreeWalker`] drives it
//! across every directory of a share and flattens the result into
//! [`FileResult`]s.

mod error;
pub mod model;
mod paginator;
mod walker;

pub use error::{DecodeError, WalkError};
pub use model::{Entry, FileResult, Page};
pub use paginator::{Paginator, decode_page};
pub use walker::{ProgressCallback, TreeWalker, WalkLimits, WalkProgress};
