//! Graph driver and node storage.
//!
//! [`Graph`] owns the root composite and drives it one tick at a time; the
//! arena and erased adapters underneath it are private.

pub(crate) mod arena;
mod driver;
pub mod error;
pub(crate) mod erased;
pub mod options;

pub use driver::Graph;
pub use error::GraphError;
pub use options::GraphOptions;
