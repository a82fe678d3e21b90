// Application layer - the stateful ledger and what it reports to callers.

pub mod error;
mod events;
pub mod reporting;
mod store;

pub use error::*;
pub use events::{LedgerEvent, SubscriptionId};
pub use reporting::*;
pub use store::*;
