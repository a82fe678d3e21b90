use crate::domain::{ExpenseId, TagId, YearMonth};

use super::PersistenceWarning;

pub type SubscriptionId = u64;

/// Change notifications published by the ledger after the fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    ExpenseAdded(ExpenseId),
    ExpenseUpdated(ExpenseId),
    ExpenseDeleted(ExpenseId),
    TagAdded(TagId),
    TagUpdated(TagId),
    TagDeleted(TagId),
    ViewedMonthChanged(Option<YearMonth>),
    /// Whole state replaced by a restore
    Restored,
    PersistenceFailed(PersistenceWarning),
}

type Callback = Box<dyn FnMut(&LedgerEvent)>;

/// Registered observers, called in subscription order.
#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: SubscriptionId,
    callbacks: Vec<(SubscriptionId, Callback)>,
}

impl Subscribers {
    pub fn subscribe(&mut self, callback: Callback) -> SubscriptionId {
        self.next_id += 1;
        self.callbacks.push((self.next_id, callback));
        self.next_id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sub, _)| *sub != id);
        self.callbacks.len() != before
    }

    pub fn notify(&mut self, event: &LedgerEvent) {
        for (_, callback) in self.callbacks.iter_mut() {
            callback(event);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}
