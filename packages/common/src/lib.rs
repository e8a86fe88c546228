//! Shared building blocks for the tessera crates: tree visitors, the file
//! system abstraction used for reads and atomic writes, and the common error
//! type.

pub mod error;
pub mod filesystem;
pub mod visitor;

pub use error::{CommonError, CommonResult};
pub use filesystem::{FileSystem, MockFileSystem, RealFileSystem};
pub use visitor::*;
