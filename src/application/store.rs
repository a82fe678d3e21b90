use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::{
    Amount, Expense, ExpenseDraft, SortDirection, SortField, Tag, TagDraft, TagId, YearMonth,
    aggregate_by_tag, expenses_in_range, sort_expenses,
};
use crate::storage::{
    DurableStore, LedgerSnapshot, LedgerState, SnapshotError, StorageKeys, decode_records,
    encode_records,
};

use super::events::Subscribers;
use super::reporting::{CategoryReport, category_report};
use super::{LedgerError, LedgerEvent, PersistenceWarning, SubscriptionId};

/// How a [`LedgerStore::restore`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The input was a valid snapshot and now is the ledger state
    Restored,
    /// The input was empty or unusable; the ledger was reset to defaults
    Defaulted,
}

/// Owns the expense and tag collections of one session.
///
/// Every mutation is validated up front and either fully applied or
/// rejected. Successful mutations are written through to the injected
/// [`DurableStore`]; write failures become [`PersistenceWarning`]s and never
/// undo the in-memory change.
pub struct LedgerStore<S: DurableStore> {
    storage: S,
    keys: StorageKeys,
    state: LedgerState,
    /// Set while storage holds collections that were unreadable and replaced
    /// by defaults in memory. The next write then stores both collections.
    out_of_sync: bool,
    viewed_month: Option<YearMonth>,
    subscribers: Subscribers,
    warnings: Vec<PersistenceWarning>,
}

impl<S: DurableStore> LedgerStore<S> {
    /// Open a ledger over `storage` using the default keys.
    pub fn new(storage: S) -> Self {
        Self::open(storage, StorageKeys::default())
    }

    /// Open a ledger, restoring whatever `storage` holds under `keys`.
    /// Unreadable or invalid data yields the default state plus a warning.
    pub fn open(storage: S, keys: StorageKeys) -> Self {
        let mut warnings = Vec::new();
        let state = load_state(&storage, &keys, &mut warnings);
        let out_of_sync = !warnings.is_empty();
        let viewed_month = load_viewed_month(&storage, &keys, &mut warnings);

        for warning in &warnings {
            warn!(key = warning.key(), "{}", warning);
        }
        info!(
            expenses = state.expenses.len(),
            tags = state.tags.len(),
            "ledger opened"
        );

        Self {
            storage,
            keys,
            state,
            out_of_sync,
            viewed_month,
            subscribers: Subscribers::default(),
            warnings,
        }
    }

    // ========================
    // Expense operations
    // ========================

    /// Validate `draft` and insert it under a fresh id.
    pub fn add_expense(&mut self, draft: &ExpenseDraft) -> Result<Expense, LedgerError> {
        let valid = draft.validate(|id| self.state.tags.contains_key(id))?;
        let id = self.fresh_id(|state, id| state.expenses.contains_key(id));
        let expense = Expense::from_valid(id, valid);

        self.state
            .expenses
            .insert(expense.id.clone(), expense.clone());
        debug!(expense_id = %expense.id, amount = %expense.amount, "expense added");

        self.persist_expenses();
        self.publish(LedgerEvent::ExpenseAdded(expense.id.clone()));
        Ok(expense)
    }

    /// Replace every field of an existing expense, keeping its id.
    pub fn update_expense(&mut self, id: &str, draft: &ExpenseDraft) -> Result<Expense, LedgerError> {
        if !self.state.expenses.contains_key(id) {
            return Err(LedgerError::expense_not_found(id));
        }
        let valid = draft.validate(|tag_id| self.state.tags.contains_key(tag_id))?;
        let expense = Expense::from_valid(id.to_string(), valid);

        self.state
            .expenses
            .insert(expense.id.clone(), expense.clone());
        debug!(expense_id = %expense.id, "expense updated");

        self.persist_expenses();
        self.publish(LedgerEvent::ExpenseUpdated(expense.id.clone()));
        Ok(expense)
    }

    /// Remove an expense, returning it. Unknown ids are reported as `NotFound`.
    pub fn delete_expense(&mut self, id: &str) -> Result<Expense, LedgerError> {
        let expense = self
            .state
            .expenses
            .remove(id)
            .ok_or_else(|| LedgerError::expense_not_found(id))?;
        debug!(expense_id = %expense.id, "expense deleted");

        self.persist_expenses();
        self.publish(LedgerEvent::ExpenseDeleted(expense.id.clone()));
        Ok(expense)
    }

    pub fn get_expense(&self, id: &str) -> Result<&Expense, LedgerError> {
        self.state
            .expenses
            .get(id)
            .ok_or_else(|| LedgerError::expense_not_found(id))
    }

    /// All expenses, in no particular order.
    pub fn expenses(&self) -> impl Iterator<Item = &Expense> {
        self.state.expenses.values()
    }

    pub fn expense_count(&self) -> usize {
        self.state.expenses.len()
    }

    // ========================
    // Tag operations
    // ========================

    /// Validate `draft` and insert it under a fresh id.
    pub fn add_tag(&mut self, draft: &TagDraft) -> Result<Tag, LedgerError> {
        let draft = draft.validate()?;
        let id = self.fresh_id(|state, id| state.tags.contains_key(id));
        let tag = Tag::from_draft(id, draft);

        self.state.tags.insert(tag.id.clone(), tag.clone());
        debug!(tag_id = %tag.id, name = %tag.name, "tag added");

        self.persist_tags();
        self.publish(LedgerEvent::TagAdded(tag.id.clone()));
        Ok(tag)
    }

    /// Replace the name and color of an existing tag, keeping its id.
    pub fn update_tag(&mut self, id: &str, draft: &TagDraft) -> Result<Tag, LedgerError> {
        if !self.state.tags.contains_key(id) {
            return Err(LedgerError::tag_not_found(id));
        }
        let draft = draft.validate()?;
        let tag = Tag::from_draft(id.to_string(), draft);

        self.state.tags.insert(tag.id.clone(), tag.clone());
        debug!(tag_id = %tag.id, name = %tag.name, "tag updated");

        self.persist_tags();
        self.publish(LedgerEvent::TagUpdated(tag.id.clone()));
        Ok(tag)
    }

    /// Remove a tag that no expense references.
    pub fn delete_tag(&mut self, id: &str) -> Result<Tag, LedgerError> {
        let tag = self
            .state
            .tags
            .get(id)
            .ok_or_else(|| LedgerError::tag_not_found(id))?;

        let expense_count = self.expenses_using_tag(id);
        if expense_count > 0 {
            return Err(LedgerError::Conflict {
                tag_id: tag.id.clone(),
                tag_name: tag.name.clone(),
                expense_count,
            });
        }

        let tag = self
            .state
            .tags
            .remove(id)
            .ok_or_else(|| LedgerError::tag_not_found(id))?;
        debug!(tag_id = %tag.id, "tag deleted");

        self.persist_tags();
        self.publish(LedgerEvent::TagDeleted(tag.id.clone()));
        Ok(tag)
    }

    pub fn get_tag(&self, id: &str) -> Result<&Tag, LedgerError> {
        self.state
            .tags
            .get(id)
            .ok_or_else(|| LedgerError::tag_not_found(id))
    }

    /// All tags ordered by name, case-insensitively.
    pub fn tags(&self) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self.state.tags.values().collect();
        tags.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        tags
    }

    /// Tags keyed by id.
    pub fn tag_map(&self) -> &HashMap<TagId, Tag> {
        &self.state.tags
    }

    /// Tags with the given name, case-insensitively, in [`tags`] order.
    /// Names are not unique, so there may be several.
    ///
    /// [`tags`]: LedgerStore::tags
    pub fn tags_named(&self, name: &str) -> Vec<&Tag> {
        let name = name.trim().to_lowercase();
        self.tags()
            .into_iter()
            .filter(|t| t.name.to_lowercase() == name)
            .collect()
    }

    /// Number of expenses referencing the tag.
    pub fn expenses_using_tag(&self, tag_id: &str) -> usize {
        self.state
            .expenses
            .values()
            .filter(|e| e.tag_id == tag_id)
            .count()
    }

    // ========================
    // Derived views
    // ========================

    /// Expenses dated within `[start, end]`, inclusive, in unspecified order.
    pub fn list_expenses_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Expense> {
        expenses_in_range(self.state.expenses.values(), start, end)
    }

    /// Expenses dated within the given month.
    pub fn expenses_in_month(&self, month: YearMonth) -> Vec<Expense> {
        let (start, end) = month.bounds();
        self.list_expenses_in_range(start, end)
    }

    /// Stable sort by date, tag name or amount.
    pub fn sort_expenses(
        &self,
        expenses: Vec<Expense>,
        field: SortField,
        direction: SortDirection,
    ) -> Vec<Expense> {
        sort_expenses(expenses, &self.state.tags, field, direction)
    }

    /// Sum of amounts per tag, with an entry for every tag.
    pub fn aggregate_by_tag(&self, expenses: &[Expense]) -> HashMap<TagId, Amount> {
        aggregate_by_tag(expenses, &self.state.tags)
    }

    pub fn category_report(&self, expenses: &[Expense]) -> CategoryReport {
        category_report(expenses, &self.state.tags)
    }

    // ========================
    // Month marker
    // ========================

    /// The month the user last looked at, if any was recorded.
    pub fn viewed_month(&self) -> Option<YearMonth> {
        self.viewed_month
    }

    pub fn set_viewed_month(&mut self, month: Option<YearMonth>) {
        if self.viewed_month == month {
            return;
        }
        self.viewed_month = month;

        let value = month.map(|m| m.to_string()).unwrap_or_default();
        let key = self.keys.viewed_month.clone();
        self.write(&key, Ok(value));
        self.publish(LedgerEvent::ViewedMonthChanged(month));
    }

    // ========================
    // Serialization
    // ========================

    /// Encode both collections as one versioned JSON document.
    pub fn serialize(&self) -> Result<String, SnapshotError> {
        LedgerSnapshot::from_state(&self.state).to_json()
    }

    /// Replace the whole state with a document produced by [`serialize`].
    ///
    /// Empty or malformed input resets the ledger to its defaults instead of
    /// failing. The result is written to storage either way.
    ///
    /// [`serialize`]: LedgerStore::serialize
    pub fn restore(&mut self, input: &[u8]) -> RestoreOutcome {
        let decoded = if input.iter().all(|b| b.is_ascii_whitespace()) {
            None
        } else {
            match LedgerSnapshot::from_json(input).and_then(LedgerSnapshot::into_state) {
                Ok(state) => Some(state),
                Err(err) => {
                    warn!(error = %err, "discarding unusable snapshot");
                    None
                }
            }
        };

        let outcome = match decoded {
            Some(state) => {
                self.state = state;
                RestoreOutcome::Restored
            }
            None => {
                self.state = LedgerState::initial();
                RestoreOutcome::Defaulted
            }
        };
        info!(
            ?outcome,
            expenses = self.state.expenses.len(),
            tags = self.state.tags.len(),
            "ledger restored"
        );

        self.persist_all();
        self.publish(LedgerEvent::Restored);
        outcome
    }

    // ========================
    // Observers and warnings
    // ========================

    /// Register a callback invoked after every change and persistence warning.
    pub fn subscribe(&mut self, callback: impl FnMut(&LedgerEvent) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(Box::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Drain the persistence warnings collected since the last call.
    pub fn take_warnings(&mut self) -> Vec<PersistenceWarning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // ========================
    // Internals
    // ========================

    fn fresh_id(&self, taken: impl Fn(&LedgerState, &str) -> bool) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if !taken(&self.state, &id) {
                return id;
            }
        }
    }

    fn persist_expenses(&mut self) {
        if self.out_of_sync {
            self.persist_all();
        } else {
            self.write_expenses();
        }
    }

    fn persist_tags(&mut self) {
        if self.out_of_sync {
            self.persist_all();
        } else {
            self.write_tags();
        }
    }

    /// Store both collections, tags first so stored expenses never point at
    /// tags that are not stored yet.
    fn persist_all(&mut self) {
        let tags_written = self.write_tags();
        let expenses_written = self.write_expenses();
        if tags_written && expenses_written {
            if self.out_of_sync {
                info!("replaced unreadable stored data with the current ledger");
            }
            self.out_of_sync = false;
        }
    }

    fn write_expenses(&mut self) -> bool {
        let value = encode_records(&self.state.sorted_expenses());
        let key = self.keys.expenses.clone();
        self.write(&key, value)
    }

    fn write_tags(&mut self) -> bool {
        let value = encode_records(&self.state.sorted_tags());
        let key = self.keys.tags.clone();
        self.write(&key, value)
    }

    fn write(&mut self, key: &str, value: Result<String, SnapshotError>) -> bool {
        let result = value
            .map_err(anyhow::Error::from)
            .and_then(|value| self.storage.set(key, &value));

        match result {
            Ok(()) => true,
            Err(err) => {
                self.report(PersistenceWarning::Write {
                    key: key.to_string(),
                    message: format!("{err:#}"),
                });
                false
            }
        }
    }

    fn report(&mut self, warning: PersistenceWarning) {
        warn!(key = warning.key(), "{}", warning);
        self.warnings.push(warning.clone());
        self.publish(LedgerEvent::PersistenceFailed(warning));
    }

    fn publish(&mut self, event: LedgerEvent) {
        self.subscribers.notify(&event);
    }
}

fn read_key<S: DurableStore>(
    storage: &S,
    key: &str,
    warnings: &mut Vec<PersistenceWarning>,
) -> Result<Option<String>, ()> {
    storage.get(key).map_err(|err| {
        warnings.push(PersistenceWarning::Read {
            key: key.to_string(),
            message: format!("{err:#}"),
        });
    })
}

fn load_state<S: DurableStore>(
    storage: &S,
    keys: &StorageKeys,
    warnings: &mut Vec<PersistenceWarning>,
) -> LedgerState {
    let Ok(stored_tags) = read_key(storage, &keys.tags, warnings) else {
        return LedgerState::initial();
    };
    let Ok(stored_expenses) = read_key(storage, &keys.expenses, warnings) else {
        return LedgerState::initial();
    };

    if stored_tags.is_none() && stored_expenses.is_none() {
        return LedgerState::initial();
    }

    let corrupt = |key: &str, err: SnapshotError| PersistenceWarning::Corrupt {
        key: key.to_string(),
        message: err.to_string(),
    };

    let tags = match stored_tags {
        Some(json) => match decode_records::<Tag>(&json) {
            Ok(tags) => tags,
            Err(err) => {
                warnings.push(corrupt(&keys.tags, err));
                return LedgerState::initial();
            }
        },
        None => crate::domain::default_tags(),
    };
    let expenses = match stored_expenses {
        Some(json) => match decode_records::<Expense>(&json) {
            Ok(expenses) => expenses,
            Err(err) => {
                warnings.push(corrupt(&keys.expenses, err));
                return LedgerState::initial();
            }
        },
        None => Vec::new(),
    };

    match LedgerState::from_records(expenses, tags) {
        Ok(state) => state,
        Err(err) => {
            warnings.push(corrupt(&keys.expenses, err));
            LedgerState::initial()
        }
    }
}

fn load_viewed_month<S: DurableStore>(
    storage: &S,
    keys: &StorageKeys,
    warnings: &mut Vec<PersistenceWarning>,
) -> Option<YearMonth> {
    let stored = read_key(storage, &keys.viewed_month, warnings).ok()??;
    if stored.trim().is_empty() {
        return None;
    }
    match stored.parse() {
        Ok(month) => Some(month),
        Err(err) => {
            warnings.push(PersistenceWarning::Corrupt {
                key: keys.viewed_month.clone(),
                message: format!("{err}"),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Field;
    use crate::storage::MemoryStore;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_fresh_ids_are_uuids() {
        let mut store = LedgerStore::new(MemoryStore::new());
        let expense = store
            .add_expense(&ExpenseDraft::new("Coffee", 1.5, day(2024, 3, 5), "1"))
            .unwrap();
        assert!(Uuid::parse_str(&expense.id).is_ok());
    }

    #[test]
    fn test_rejected_mutation_writes_nothing() {
        let mut store = LedgerStore::new(MemoryStore::new());
        let err = store
            .add_expense(&ExpenseDraft::new("Coffee", 0.0, day(2024, 3, 5), "1"))
            .unwrap_err();

        assert_eq!(err.field(), Some(Field::Amount));
        assert!(store.storage().is_empty());
    }

    #[test]
    fn test_viewed_month_unchanged_is_not_rewritten() {
        let mut store = LedgerStore::new(MemoryStore::new());
        store.set_viewed_month(None);
        assert!(store.storage().is_empty());

        let march = YearMonth::new(2024, 3);
        store.set_viewed_month(march);
        assert_eq!(
            store.storage().get("viewed-month").unwrap(),
            Some("2024-03".to_string())
        );
    }

    #[test]
    fn test_stored_expenses_without_tags_use_default_tags() {
        let mut storage = MemoryStore::new();
        storage
            .set(
                "expenses",
                r#"[{"id":"e1","name":"Bus","amount":"2.50","date":"2024-03-02","tag_id":"2"}]"#,
            )
            .unwrap();

        let mut store = LedgerStore::new(storage);
        assert!(store.take_warnings().is_empty());
        assert_eq!(store.expense_count(), 1);
        assert_eq!(store.tags().len(), 6);
    }

    #[test]
    fn test_malformed_month_marker_is_dropped() {
        let mut storage = MemoryStore::new();
        storage.set("viewed-month", "March").unwrap();

        let mut store = LedgerStore::new(storage);
        assert_eq!(store.viewed_month(), None);

        let warnings = store.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key(), "viewed-month");
    }
}
