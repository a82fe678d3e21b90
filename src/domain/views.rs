use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;

use super::{Amount, Expense, Tag, TagId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Date,
    /// Name of the referenced tag, compared case-insensitively
    Tag,
    Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Tag => "tag",
            SortField::Amount => "amount",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "date" => Some(SortField::Date),
            "tag" => Some(SortField::Tag),
            "amount" => Some(SortField::Amount),
            _ => None,
        }
    }
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }

    /// Flip the direction, as a column header click does.
    pub fn toggled(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Expenses dated within `[start, end]`, both ends inclusive.
/// Order follows the input.
pub fn expenses_in_range<'a, I>(expenses: I, start: NaiveDate, end: NaiveDate) -> Vec<Expense>
where
    I: IntoIterator<Item = &'a Expense>,
{
    expenses
        .into_iter()
        .filter(|e| e.date >= start && e.date <= end)
        .cloned()
        .collect()
}

/// Stable sort of `expenses` by `field`.
///
/// Descending order compares with the operands swapped instead of reversing
/// the result, so records with equal keys keep their input order in both
/// directions. Expenses whose tag is unknown sort as if the tag name were empty.
pub fn sort_expenses(
    mut expenses: Vec<Expense>,
    tags: &HashMap<TagId, Tag>,
    field: SortField,
    direction: SortDirection,
) -> Vec<Expense> {
    let compare = |a: &Expense, b: &Expense| -> Ordering {
        match field {
            SortField::Date => a.date.cmp(&b.date),
            SortField::Amount => a.amount.cmp(&b.amount),
            SortField::Tag => tag_sort_key(tags, a).cmp(&tag_sort_key(tags, b)),
        }
    };

    match direction {
        SortDirection::Ascending => expenses.sort_by(|a, b| compare(a, b)),
        SortDirection::Descending => expenses.sort_by(|a, b| compare(b, a)),
    }
    expenses
}

fn tag_sort_key(tags: &HashMap<TagId, Tag>, expense: &Expense) -> String {
    tags.get(&expense.tag_id)
        .map(|t| t.name.to_lowercase())
        .unwrap_or_default()
}

/// Sum of amounts per tag.
///
/// Every tag in `tags` gets an entry, zero when no expense references it.
/// Expenses pointing at a tag outside `tags` still get an entry of their own,
/// so the totals always add up to the sum of all amounts. Decimal addition
/// is exact, so no rounding error builds up.
pub fn aggregate_by_tag<'a, I>(expenses: I, tags: &HashMap<TagId, Tag>) -> HashMap<TagId, Amount>
where
    I: IntoIterator<Item = &'a Expense>,
{
    let mut totals: HashMap<TagId, Amount> =
        tags.keys().map(|id| (id.clone(), Amount::ZERO)).collect();

    for expense in expenses {
        *totals.entry(expense.tag_id.clone()).or_insert(Amount::ZERO) += expense.amount;
    }

    totals
}

/// Total of all amounts.
pub fn total_amount<'a, I>(expenses: I) -> Amount
where
    I: IntoIterator<Item = &'a Expense>,
{
    expenses.into_iter().map(|e| e.amount).sum()
}
