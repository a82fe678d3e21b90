use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Expense, ExpenseId, Tag, TagDraft, TagId, default_tags};

/// Current version of the snapshot document.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Malformed ledger data: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Invalid {kind} {id}: {reason}")]
    InvalidRecord {
        kind: &'static str,
        id: String,
        reason: String,
    },

    #[error("Expense {expense_id} references missing tag {tag_id}")]
    DanglingTag { expense_id: ExpenseId, tag_id: TagId },
}

/// The two collections a ledger owns, keyed by id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerState {
    pub expenses: HashMap<ExpenseId, Expense>,
    pub tags: HashMap<TagId, Tag>,
}

impl LedgerState {
    /// No expenses and the predefined tag set.
    pub fn initial() -> Self {
        Self {
            expenses: HashMap::new(),
            tags: default_tags().into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Build a state from decoded records, rejecting anything a ledger could
    /// not have produced: duplicate ids, invalid fields and expenses pointing
    /// at missing tags. Tags may share a name.
    pub fn from_records(expenses: Vec<Expense>, tags: Vec<Tag>) -> Result<Self, SnapshotError> {
        let mut tag_map = HashMap::with_capacity(tags.len());
        for tag in tags {
            let draft = TagDraft::new(tag.name.clone(), tag.color.clone());
            let normalized = draft.validate().map_err(|e| SnapshotError::InvalidRecord {
                kind: "tag",
                id: tag.id.clone(),
                reason: e.to_string(),
            })?;
            if normalized != draft || tag.id.is_empty() {
                return Err(SnapshotError::InvalidRecord {
                    kind: "tag",
                    id: tag.id.clone(),
                    reason: "record is not normalized".to_string(),
                });
            }
            if let Some(dup) = tag_map.insert(tag.id.clone(), tag) {
                return Err(SnapshotError::DuplicateId {
                    kind: "tag",
                    id: dup.id,
                });
            }
        }

        let mut expense_map = HashMap::with_capacity(expenses.len());
        for expense in expenses {
            expense.check().map_err(|e| SnapshotError::InvalidRecord {
                kind: "expense",
                id: expense.id.clone(),
                reason: e.to_string(),
            })?;
            if expense.id.is_empty() {
                return Err(SnapshotError::InvalidRecord {
                    kind: "expense",
                    id: expense.id.clone(),
                    reason: "missing id".to_string(),
                });
            }
            if !tag_map.contains_key(&expense.tag_id) {
                return Err(SnapshotError::DanglingTag {
                    expense_id: expense.id.clone(),
                    tag_id: expense.tag_id.clone(),
                });
            }
            if let Some(dup) = expense_map.insert(expense.id.clone(), expense) {
                return Err(SnapshotError::DuplicateId {
                    kind: "expense",
                    id: dup.id,
                });
            }
        }

        Ok(Self {
            expenses: expense_map,
            tags: tag_map,
        })
    }

    /// Expenses ordered by id, for stable serialized output.
    pub fn sorted_expenses(&self) -> Vec<Expense> {
        let mut expenses: Vec<Expense> = self.expenses.values().cloned().collect();
        expenses.sort_by(|a, b| a.id.cmp(&b.id));
        expenses
    }

    /// Tags ordered by id, for stable serialized output.
    pub fn sorted_tags(&self) -> Vec<Tag> {
        let mut tags: Vec<Tag> = self.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.id.cmp(&b.id));
        tags
    }
}

/// Self-describing document holding a complete ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub expenses: Vec<Expense>,
    pub tags: Vec<Tag>,
}

impl LedgerSnapshot {
    pub fn from_state(state: &LedgerState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            expenses: state.sorted_expenses(),
            tags: state.sorted_tags(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(input: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: LedgerSnapshot = serde_json::from_slice(input)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(snapshot)
    }

    pub fn into_state(self) -> Result<LedgerState, SnapshotError> {
        LedgerState::from_records(self.expenses, self.tags)
    }
}

/// Encode one collection as the JSON array kept under its storage key.
pub fn encode_records<T: Serialize>(records: &[T]) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(records)?)
}

/// Decode a collection written by [`encode_records`].
pub fn decode_records<T: for<'de> Deserialize<'de>>(input: &str) -> Result<Vec<T>, SnapshotError> {
    Ok(serde_json::from_str(input)?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use super::*;

    fn coffee(tag_id: &str) -> Expense {
        Expense {
            id: "e1".into(),
            name: "Coffee".into(),
            amount: dec!(1.5),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            tag_id: tag_id.into(),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = LedgerState::initial();
        assert!(state.expenses.is_empty());
        assert_eq!(state.tags.len(), 6);
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut state = LedgerState::initial();
        state.expenses.insert("e1".into(), coffee("1"));

        let json = LedgerSnapshot::from_state(&state).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["expenses"][0]["amount"], "1.5");
        assert_eq!(value["expenses"][0]["date"], "2024-03-05");
        assert_eq!(value["tags"][0]["id"], "1");
    }

    #[test]
    fn test_rejects_dangling_tag() {
        let err = LedgerState::from_records(vec![coffee("42")], default_tags()).unwrap_err();
        assert!(matches!(err, SnapshotError::DanglingTag { .. }));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let err =
            LedgerState::from_records(vec![coffee("1"), coffee("1")], default_tags()).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateId { kind: "expense", .. }));

        let mut tags = default_tags();
        tags[1].id = "1".into();
        let err = LedgerState::from_records(vec![], tags).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateId { kind: "tag", .. }));
    }

    #[test]
    fn test_rejects_invalid_records() {
        let mut expense = coffee("1");
        expense.amount = dec!(-5);
        let err = LedgerState::from_records(vec![expense], default_tags()).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidRecord { kind: "expense", .. }));

        let mut tags = default_tags();
        tags[0].color = "blue".into();
        let err = LedgerState::from_records(vec![], tags).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidRecord { kind: "tag", .. }));
    }

    #[test]
    fn test_accepts_tags_sharing_a_name() {
        let mut tags = default_tags();
        tags[1].name = "food".into();

        let state = LedgerState::from_records(vec![coffee("2")], tags).unwrap();
        assert_eq!(state.tags.len(), 6);
        assert_eq!(state.expenses["e1"].tag_id, "2");
    }

    #[test]
    fn test_amounts_survive_exactly() {
        let mut expense = coffee("1");
        expense.amount = dec!(1.005);
        let mut state = LedgerState::initial();
        state.expenses.insert(expense.id.clone(), expense);

        let json = LedgerSnapshot::from_state(&state).to_json().unwrap();
        let restored = LedgerSnapshot::from_json(json.as_bytes())
            .unwrap()
            .into_state()
            .unwrap();
        assert_eq!(restored.expenses["e1"].amount, dec!(1.005));
    }

    #[test]
    fn test_rejects_other_versions() {
        let err = LedgerSnapshot::from_json(br#"{"version":2,"expenses":[],"tags":[]}"#)
            .unwrap_err();
        assert!(matches!(err, SnapshotError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_rejects_truncated_document() {
        let state = LedgerState::initial();
        let json = LedgerSnapshot::from_state(&state).to_json().unwrap();
        let truncated = &json.as_bytes()[..json.len() / 2];

        assert!(matches!(
            LedgerSnapshot::from_json(truncated),
            Err(SnapshotError::Malformed(_))
        ));
    }
}
