mod common;

use anyhow::Result;
use common::{draft, record_events, test_store};
use expense_ledger::application::{LedgerEvent, LedgerStore, PersistenceWarning, RestoreOutcome};
use expense_ledger::domain::{TagDraft, YearMonth, default_tags};
use expense_ledger::storage::{DurableStore, FileStore, MemoryStore, StorageKeys};
use rust_decimal_macros::dec;
use tempfile::TempDir;

#[test]
fn test_mutations_write_through_and_reopen() -> Result<()> {
    let mut store = test_store();
    let coffee = store.add_expense(&draft("Coffee", 3.2, "2024-03-05", "1"))?;
    let travel = store.add_tag(&TagDraft::new("Travel", "#0088ff"))?;
    store.set_viewed_month(YearMonth::new(2024, 3));

    let reopened = LedgerStore::new(store.into_storage());

    assert_eq!(reopened.get_expense(&coffee.id)?, &coffee);
    assert_eq!(reopened.get_tag(&travel.id)?, &travel);
    assert_eq!(reopened.tags().len(), 7);
    assert_eq!(reopened.viewed_month(), YearMonth::new(2024, 3));

    Ok(())
}

#[test]
fn test_serialize_restore_round_trip() -> Result<()> {
    let mut store = test_store();
    store.add_expense(&draft("Coffee", 3.2, "2024-03-05", "1"))?;
    store.add_expense(&draft("Train", 19.9, "2024-03-07", "2"))?;
    store.update_tag("6", &TagDraft::new("Misc", "#abc"))?;
    let snapshot = store.serialize()?;

    let mut other = test_store();
    assert_eq!(other.restore(snapshot.as_bytes()), RestoreOutcome::Restored);

    assert_eq!(other.serialize()?, snapshot);
    let mut expected: Vec<_> = store.expenses().cloned().collect();
    let mut actual: Vec<_> = other.expenses().cloned().collect();
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    actual.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(actual, expected);
    assert_eq!(other.tag_map(), store.tag_map());

    Ok(())
}

#[test]
fn test_restore_malformed_input_yields_defaults() -> Result<()> {
    let mut source = test_store();
    source.add_expense(&draft("Coffee", 3.2, "2024-03-05", "1"))?;
    let snapshot = source.serialize()?;

    let inputs: Vec<&[u8]> = vec![
        &snapshot.as_bytes()[..snapshot.len() - 5],
        &b"not json at all"[..],
        &b"{\"version\":1}"[..],
        &b"{\"version\":1,\"expenses\":[{\"id\":\"x\"}],\"tags\":[]}"[..],
        &b"\xff\xfe\x00"[..],
        &b""[..],
    ];

    for input in inputs {
        let mut store = test_store();
        store.add_expense(&draft("Lunch", 12.0, "2024-03-05", "1"))?;

        assert_eq!(store.restore(input), RestoreOutcome::Defaulted);
        assert_eq!(store.expense_count(), 0);

        let mut tags: Vec<_> = store.tags().into_iter().cloned().collect();
        tags.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(tags, default_tags());
    }

    Ok(())
}

#[test]
fn test_restore_rejects_dangling_references() -> Result<()> {
    let mut store = test_store();
    let input = br##"{"version":1,
        "expenses":[{"id":"e1","name":"Coffee","amount":"1.50","date":"2024-03-05","tag_id":"99"}],
        "tags":[{"id":"1","name":"Food","color":"#3b5bdb"}]}"##;

    assert_eq!(store.restore(input), RestoreOutcome::Defaulted);
    assert_eq!(store.tags().len(), 6);

    Ok(())
}

#[test]
fn test_restore_accepts_tags_sharing_a_name() -> Result<()> {
    let mut store = test_store();
    let input = br##"{"version":1,
        "expenses":[{"id":"e1","name":"Novel","amount":"12.99","date":"2024-03-05","tag_id":"b"}],
        "tags":[{"id":"a","name":"Books","color":"#38d9a9"},
                {"id":"b","name":"books","color":"#3b5bdb"}]}"##;

    assert_eq!(store.restore(input), RestoreOutcome::Restored);
    assert_eq!(store.tags_named("BOOKS").len(), 2);
    assert_eq!(store.get_expense("e1")?.amount, dec!(12.99));

    Ok(())
}

#[test]
fn test_restore_persists_and_notifies() -> Result<()> {
    let mut source = test_store();
    source.add_expense(&draft("Coffee", 3.2, "2024-03-05", "1"))?;
    let snapshot = source.serialize()?;

    let mut store = test_store();
    let events = record_events(&mut store);
    store.restore(snapshot.as_bytes());

    assert_eq!(*events.borrow(), vec![LedgerEvent::Restored]);
    let reopened = LedgerStore::new(store.into_storage());
    assert_eq!(reopened.expense_count(), 1);

    Ok(())
}

#[test]
fn test_open_with_corrupt_storage_falls_back_to_defaults() -> Result<()> {
    let mut storage = MemoryStore::new();
    storage.set("expenses", "[{\"id\":")?;
    storage.set("tags", "[]")?;

    let mut store = LedgerStore::new(storage);

    assert_eq!(store.expense_count(), 0);
    assert_eq!(store.tags().len(), 6);
    let warnings = store.take_warnings();
    assert!(matches!(
        warnings.as_slice(),
        [PersistenceWarning::Corrupt { key, .. }] if key == "expenses"
    ));
    assert!(store.take_warnings().is_empty());

    Ok(())
}

#[test]
fn test_edit_after_corrupt_tags_survives_reopen() -> Result<()> {
    let mut storage = MemoryStore::new();
    storage.set("tags", "[{\"id\":")?;

    let mut store = LedgerStore::new(storage);
    assert_eq!(store.take_warnings().len(), 1);

    let coffee = store.add_expense(&draft("Coffee", 3.2, "2024-03-05", "1"))?;
    assert!(store.take_warnings().is_empty());

    let mut reopened = LedgerStore::new(store.into_storage());
    assert!(reopened.take_warnings().is_empty());
    assert_eq!(reopened.get_expense(&coffee.id)?, &coffee);
    assert_eq!(reopened.tags().len(), 6);

    Ok(())
}

#[test]
fn test_edit_after_corrupt_expenses_survives_reopen() -> Result<()> {
    let mut storage = MemoryStore::new();
    storage.set("expenses", "not json")?;

    let mut store = LedgerStore::new(storage);
    assert_eq!(store.take_warnings().len(), 1);

    let travel = store.add_tag(&TagDraft::new("Travel", "#0088ff"))?;

    let mut reopened = LedgerStore::new(store.into_storage());
    assert!(reopened.take_warnings().is_empty());
    assert_eq!(reopened.get_tag(&travel.id)?, &travel);
    assert_eq!(reopened.expense_count(), 0);

    Ok(())
}

#[test]
fn test_failed_write_keeps_in_memory_change() -> Result<()> {
    let mut store = LedgerStore::new(MemoryStore::with_quota(64));
    let events = record_events(&mut store);

    let expense = store.add_expense(&draft("Coffee", 3.2, "2024-03-05", "1"))?;

    // The edit is kept even though it could not be stored
    assert_eq!(store.get_expense(&expense.id)?, &expense);
    assert!(store.storage().get("expenses")?.is_none());

    let warnings = store.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(matches!(&warnings[0], PersistenceWarning::Write { key, .. } if key == "expenses"));

    assert_eq!(
        *events.borrow(),
        vec![
            LedgerEvent::PersistenceFailed(warnings[0].clone()),
            LedgerEvent::ExpenseAdded(expense.id.clone()),
        ]
    );

    // Once space frees up the next mutation stores everything again
    store.storage_mut().set_quota(None);
    store.add_expense(&draft("Tea", 2.0, "2024-03-06", "1"))?;
    assert!(store.take_warnings().is_empty());
    assert_eq!(LedgerStore::new(store.into_storage()).expense_count(), 2);

    Ok(())
}

#[test]
fn test_custom_keys_share_one_store() -> Result<()> {
    let mut home = LedgerStore::open(MemoryStore::new(), StorageKeys::with_prefix("home"));
    home.add_expense(&draft("Rent", 900.0, "2024-03-01", "5"))?;

    let storage = home.into_storage();
    assert!(storage.get("home.expenses")?.is_some());

    let work = LedgerStore::open(storage, StorageKeys::with_prefix("work"));
    assert_eq!(work.expense_count(), 0);

    Ok(())
}

#[test]
fn test_file_store_survives_restart() -> Result<()> {
    let dir = TempDir::new()?;

    let id = {
        let mut store = LedgerStore::new(FileStore::new(dir.path()));
        store.add_tag(&TagDraft::new("Travel", "#0088ff"))?;
        store.set_viewed_month(YearMonth::new(2024, 2));
        store.add_expense(&draft("Coffee", 3.2, "2024-02-05", "1"))?.id
    };

    let mut store = LedgerStore::new(FileStore::new(dir.path()));
    assert!(store.take_warnings().is_empty());
    assert_eq!(store.get_expense(&id)?.amount, dec!(3.2));
    assert_eq!(store.tags_named("travel").len(), 1);
    assert_eq!(store.viewed_month(), YearMonth::new(2024, 2));
    assert!(dir.path().join("expenses.json").exists());

    Ok(())
}

#[test]
fn test_clearing_viewed_month() -> Result<()> {
    let mut store = test_store();
    let events = record_events(&mut store);

    store.set_viewed_month(YearMonth::new(2024, 3));
    store.set_viewed_month(None);

    assert_eq!(
        *events.borrow(),
        vec![
            LedgerEvent::ViewedMonthChanged(YearMonth::new(2024, 3)),
            LedgerEvent::ViewedMonthChanged(None),
        ]
    );
    assert_eq!(LedgerStore::new(store.into_storage()).viewed_month(), None);

    Ok(())
}
