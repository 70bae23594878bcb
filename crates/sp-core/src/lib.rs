//! sp-core: numeric foundation for the speciation workspace.
//!
//! Contains:
//! - numeric (Real, finiteness checks, log10 helpers, scan stepping)
//! - layout (named column segments of the solver's concentration matrix)
//! - error (shared error types)

pub mod error;
pub mod layout;
pub mod numeric;

pub use error::{CoreError, CoreResult};
pub use layout::{ColumnLayout, Segment};
pub use numeric::*;
