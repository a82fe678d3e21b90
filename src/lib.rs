pub mod application;
pub mod cli;
pub mod domain;
pub mod storage;

pub use application::{LedgerError, LedgerEvent, LedgerStore, PersistenceWarning};
pub use domain::*;
pub use storage::{DurableStore, FileStore, MemoryStore, StorageKeys};
