// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use chrono::NaiveDate;
use expense_ledger::application::{LedgerEvent, LedgerStore};
use expense_ledger::domain::ExpenseDraft;
use expense_ledger::storage::MemoryStore;

/// Helper to create a fresh ledger over an empty in-memory store
pub fn test_store() -> LedgerStore<MemoryStore> {
    LedgerStore::new(MemoryStore::new())
}

/// Helper to parse a date string into NaiveDate
pub fn parse_date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Draft for an expense filed under the given tag
pub fn draft(name: &str, amount: f64, date: &str, tag_id: &str) -> ExpenseDraft {
    ExpenseDraft::new(name, amount, parse_date(date), tag_id)
}

/// Collects every event a ledger publishes
pub fn record_events(store: &mut LedgerStore<MemoryStore>) -> Rc<RefCell<Vec<LedgerEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    store.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}
