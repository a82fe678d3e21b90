use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::domain::{Amount, Expense, Tag, TagId, aggregate_by_tag, total_amount};

/// Per-tag spending breakdown, the data behind the radar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub categories: Vec<CategorySummary>,
    pub total: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub tag_id: TagId,
    pub name: String,
    pub color: String,
    pub total: Amount,
    pub count: usize,
    /// Share of the report total, 0.0 when nothing was spent
    pub percentage: f64,
}

/// Build a report with one line per known tag, ordered by tag name.
/// Expenses whose tag is not in `tags` are counted in the total and listed
/// under their raw tag id after the known tags.
pub fn category_report(expenses: &[Expense], tags: &HashMap<TagId, Tag>) -> CategoryReport {
    let totals = aggregate_by_tag(expenses, tags);
    let total = total_amount(expenses);

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for expense in expenses {
        *counts.entry(expense.tag_id.as_str()).or_insert(0) += 1;
    }

    let percentage = |amount: Amount| {
        if total.is_zero() {
            0.0
        } else {
            (amount * Amount::ONE_HUNDRED / total)
                .to_f64()
                .unwrap_or(0.0)
        }
    };

    let mut known: Vec<&Tag> = tags.values().collect();
    known.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut categories: Vec<CategorySummary> = known
        .into_iter()
        .map(|tag| {
            let amount = totals.get(&tag.id).copied().unwrap_or(Amount::ZERO);
            CategorySummary {
                tag_id: tag.id.clone(),
                name: tag.name.clone(),
                color: tag.color.clone(),
                total: amount,
                count: counts.get(tag.id.as_str()).copied().unwrap_or(0),
                percentage: percentage(amount),
            }
        })
        .collect();

    let mut unknown: Vec<(&TagId, &Amount)> = totals
        .iter()
        .filter(|(id, _)| !tags.contains_key(*id))
        .collect();
    unknown.sort_by(|a, b| a.0.cmp(b.0));
    categories.extend(unknown.into_iter().map(|(id, amount)| CategorySummary {
        tag_id: id.clone(),
        name: id.clone(),
        color: String::new(),
        total: *amount,
        count: counts.get(id.as_str()).copied().unwrap_or(0),
        percentage: percentage(*amount),
    }));

    CategoryReport { categories, total }
}
