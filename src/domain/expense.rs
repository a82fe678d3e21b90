use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    Amount, Field, MAX_EXPENSE_AMOUNT, MAX_EXPENSE_UNITS, TagId, ValidationError, amount_from_f64,
    amount_to_f64, validate_name,
};

pub type ExpenseId = String;

/// A single dated outflow of money, filed under one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub name: String,
    /// Always positive, at most [`MAX_EXPENSE_AMOUNT`]
    pub amount: Amount,
    /// Calendar day the money was spent
    pub date: NaiveDate,
    pub tag_id: TagId,
}

impl Expense {
    /// Build an expense from an already validated draft.
    pub fn from_valid(id: ExpenseId, valid: ValidExpense) -> Self {
        Self {
            id,
            name: valid.name,
            amount: valid.amount,
            date: valid.date,
            tag_id: valid.tag_id,
        }
    }

    /// Check the invariants a stored expense must satisfy. Used when
    /// accepting records that did not go through a draft, e.g. on restore.
    pub fn check(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        check_amount(self.amount)?;
        if self.tag_id.is_empty() {
            return Err(ValidationError::new(Field::TagId, "a tag is required"));
        }
        Ok(())
    }
}

/// Caller-supplied fields for creating or replacing an expense.
///
/// Drafts come from an untrusted boundary (forms, imports), so the amount
/// is a raw float and the date may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub name: String,
    /// Amount in whole currency units
    pub amount: f64,
    pub date: Option<NaiveDate>,
    pub tag_id: TagId,
}

/// The checked, normalized form of an [`ExpenseDraft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidExpense {
    pub name: String,
    pub amount: Amount,
    pub date: NaiveDate,
    pub tag_id: TagId,
}

impl ExpenseDraft {
    pub fn new(
        name: impl Into<String>,
        amount: f64,
        date: NaiveDate,
        tag_id: impl Into<TagId>,
    ) -> Self {
        Self {
            name: name.into(),
            amount,
            date: Some(date),
            tag_id: tag_id.into(),
        }
    }

    /// Draft holding the current values of an existing expense.
    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            name: expense.name.clone(),
            amount: amount_to_f64(expense.amount),
            date: Some(expense.date),
            tag_id: expense.tag_id.clone(),
        }
    }

    /// Validate every field. Fields are checked in order name, amount,
    /// date, tag; the first failure is returned.
    pub fn validate(&self, tag_exists: impl Fn(&str) -> bool) -> Result<ValidExpense, ValidationError> {
        validate_name(&self.name)?;
        let amount = validate_amount(self.amount)?;
        let date = self
            .date
            .ok_or_else(|| ValidationError::new(Field::Date, "date is required"))?;

        if self.tag_id.is_empty() {
            return Err(ValidationError::new(Field::TagId, "a tag is required"));
        }
        if !tag_exists(&self.tag_id) {
            return Err(ValidationError::new(
                Field::TagId,
                format!("tag '{}' does not exist", self.tag_id),
            ));
        }

        Ok(ValidExpense {
            name: self.name.clone(),
            amount,
            date,
            tag_id: self.tag_id.clone(),
        })
    }

    /// Entry forms additionally refuse expenses dated after `today`.
    pub fn check_not_future(&self, today: NaiveDate) -> Result<(), ValidationError> {
        match self.date {
            Some(date) if date > today => Err(ValidationError::new(
                Field::Date,
                format!("{} is in the future", date),
            )),
            _ => Ok(()),
        }
    }
}

/// Check a raw amount and convert it into an exact [`Amount`].
pub fn validate_amount(amount: f64) -> Result<Amount, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::new(Field::Amount, "amount must be a number"));
    }
    if amount <= 0.0 {
        return Err(ValidationError::new(Field::Amount, "amount must be positive"));
    }
    if amount > MAX_EXPENSE_UNITS {
        return Err(ValidationError::new(
            Field::Amount,
            format!("amount must not exceed {}", MAX_EXPENSE_AMOUNT),
        ));
    }

    // Positive floats below 1e-28 have no decimal form
    let exact = amount_from_f64(amount)
        .filter(|exact| !exact.is_zero())
        .ok_or_else(|| ValidationError::new(Field::Amount, "amount is too small to record"))?;
    check_amount(exact)?;
    Ok(exact)
}

fn check_amount(amount: Amount) -> Result<(), ValidationError> {
    if amount <= Amount::ZERO {
        return Err(ValidationError::new(Field::Amount, "amount must be positive"));
    }
    if amount > MAX_EXPENSE_AMOUNT {
        return Err(ValidationError::new(
            Field::Amount,
            format!("amount must not exceed {}", MAX_EXPENSE_AMOUNT),
        ));
    }
    Ok(())
}
