mod durable;
mod file;
mod memory;
mod snapshot;

pub use durable::*;
pub use file::*;
pub use memory::*;
pub use snapshot::*;
