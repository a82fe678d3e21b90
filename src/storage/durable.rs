use anyhow::Result;

/// Key-value string storage supplied by the host environment
/// (browser local storage, a directory on disk, an in-memory map).
///
/// Implementations report failures as errors; the ledger treats every
/// storage failure as non-fatal.
pub trait DurableStore {
    /// Read the value stored under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<S: DurableStore + ?Sized> DurableStore for Box<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// Keys under which the ledger keeps its three values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub expenses: String,
    pub tags: String,
    pub viewed_month: String,
}

impl StorageKeys {
    /// Keys sharing a common prefix, e.g. `work.expenses`.
    pub fn with_prefix(prefix: &str) -> Self {
        let defaults = Self::default();
        Self {
            expenses: format!("{prefix}.{}", defaults.expenses),
            tags: format!("{prefix}.{}", defaults.tags),
            viewed_month: format!("{prefix}.{}", defaults.viewed_month),
        }
    }
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            expenses: "expenses".to_string(),
            tags: "tags".to_string(),
            viewed_month: "viewed-month".to_string(),
        }
    }
}
