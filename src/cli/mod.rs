use anyhow::{Context, Result, anyhow, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};

use crate::application::LedgerStore;
use crate::domain::{
    DEFAULT_TAG_COLOR, ExpenseDraft, SortDirection, SortField, TAG_PALETTE, Tag, TagDraft,
    YearMonth, format_amount,
};
use crate::storage::{DurableStore, FileStore};

/// Expense Ledger - track dated expenses by category
#[derive(Parser)]
#[command(name = "expense-ledger")]
#[command(about = "A local-first expense tracker with monthly views and category reports")]
#[command(version)]
pub struct Cli {
    /// Directory holding the ledger data
    #[arg(short = 'D', long, env = "EXPENSE_LEDGER_DATA", default_value = "expense-data")]
    pub data_dir: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Expense management commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Tag (category) management commands
    #[command(subcommand)]
    Tag(TagCommands),

    /// Show or move the month being viewed
    Month {
        #[command(subcommand)]
        action: Option<MonthCommands>,
    },

    /// Spending per tag for a month
    Report {
        /// Month to report on (YYYY-MM, defaults to the viewed month)
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record a new expense
    Add {
        /// What the money was spent on
        name: String,

        /// Amount (e.g., "4.50" or "120")
        amount: String,

        /// Tag name or id
        #[arg(short, long)]
        tag: String,

        /// Date of the expense (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Change an existing expense
    Edit {
        /// Expense id
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        amount: Option<String>,

        /// Tag name or id
        #[arg(short, long)]
        tag: Option<String>,

        /// Date of the expense (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete an expense
    Delete {
        /// Expense id
        id: String,
    },

    /// List the expenses of a month
    List {
        /// Month to list (YYYY-MM, defaults to the viewed month)
        #[arg(long)]
        month: Option<String>,

        /// Sort by: date, tag, amount
        #[arg(long, default_value = "date")]
        sort: String,

        /// Order: asc, desc
        #[arg(long, default_value = "desc")]
        order: String,
    },
}

#[derive(Subcommand)]
pub enum TagCommands {
    /// Create a new tag
    Add {
        /// Tag name
        name: String,

        /// Hex color, e.g. "#3b5bdb"
        #[arg(short, long, default_value = DEFAULT_TAG_COLOR)]
        color: String,
    },

    /// Rename or recolor a tag
    Edit {
        /// Tag name or id
        tag: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        color: Option<String>,
    },

    /// Delete a tag no expense uses
    Delete {
        /// Tag name or id
        tag: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// List all tags
    List,
}

#[derive(Subcommand, Clone)]
pub enum MonthCommands {
    /// Print the viewed month (default)
    Show,
    /// Move to the previous month
    Prev,
    /// Move to the next month, never past the current one
    Next,
    /// Jump to a month (YYYY-MM)
    Set { month: String },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let today = Local::now().date_naive();
        let mut store = LedgerStore::new(FileStore::new(&self.data_dir));

        match self.command {
            Commands::Expense(cmd) => run_expense_command(&mut store, cmd, today)?,
            Commands::Tag(cmd) => run_tag_command(&mut store, cmd)?,
            Commands::Month { action } => {
                run_month_command(&mut store, action.unwrap_or(MonthCommands::Show), today)?
            }
            Commands::Report { month } => {
                let month = resolve_month(&store, month.as_deref(), today)?;
                run_report_command(&store, month);
            }
        }

        for warning in store.take_warnings() {
            eprintln!("Warning: {}", warning);
        }
        Ok(())
    }
}

fn run_expense_command<S: DurableStore>(
    store: &mut LedgerStore<S>,
    cmd: ExpenseCommands,
    today: NaiveDate,
) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            name,
            amount,
            tag,
            date,
        } => {
            let tag_id = resolve_tag(store, &tag)?.id.clone();
            let date = match date {
                Some(date) => parse_date(&date)?,
                None => today,
            };
            let draft = ExpenseDraft::new(name, parse_amount(&amount)?, date, tag_id);
            draft.check_not_future(today)?;

            let expense = store.add_expense(&draft)?;
            println!(
                "Recorded expense: {} {} on {} ({})",
                expense.name,
                format_amount(expense.amount),
                expense.date,
                expense.id
            );
        }

        ExpenseCommands::Edit {
            id,
            name,
            amount,
            tag,
            date,
        } => {
            let mut draft = ExpenseDraft::from_expense(store.get_expense(&id)?);
            if let Some(name) = name {
                draft.name = name;
            }
            if let Some(amount) = amount {
                draft.amount = parse_amount(&amount)?;
            }
            if let Some(tag) = tag {
                draft.tag_id = resolve_tag(store, &tag)?.id.clone();
            }
            if let Some(date) = date {
                draft.date = Some(parse_date(&date)?);
            }
            draft.check_not_future(today)?;

            let expense = store.update_expense(&id, &draft)?;
            println!("Updated expense: {} ({})", expense.name, expense.id);
        }

        ExpenseCommands::Delete { id } => {
            let expense = store.delete_expense(&id)?;
            println!(
                "Deleted expense: {} {}",
                expense.name,
                format_amount(expense.amount)
            );
        }

        ExpenseCommands::List { month, sort, order } => {
            let month = resolve_month(store, month.as_deref(), today)?;
            let field = SortField::from_str(&sort)
                .ok_or_else(|| anyhow!("Invalid sort '{}'. Use date, tag or amount", sort))?;
            let direction = SortDirection::from_str(&order)
                .ok_or_else(|| anyhow!("Invalid order '{}'. Use asc or desc", order))?;

            let expenses = store.sort_expenses(store.expenses_in_month(month), field, direction);
            if expenses.is_empty() {
                println!("No expenses in {}.", month);
                return Ok(());
            }

            println!("{:<12} {:<24} {:<16} {:>12}  ID", "DATE", "NAME", "TAG", "AMOUNT");
            println!("{}", "-".repeat(72));
            for expense in &expenses {
                let tag = store
                    .get_tag(&expense.tag_id)
                    .map(|t| t.name.as_str())
                    .unwrap_or("?");
                println!(
                    "{:<12} {:<24} {:<16} {:>12}  {}",
                    expense.date,
                    expense.name,
                    tag,
                    format_amount(expense.amount),
                    expense.id
                );
            }
        }
    }
    Ok(())
}

fn run_tag_command<S: DurableStore>(store: &mut LedgerStore<S>, cmd: TagCommands) -> Result<()> {
    match cmd {
        TagCommands::Add { name, color } => {
            let tag = store.add_tag(&TagDraft::new(name, color))?;
            println!("Created tag: {} {} ({})", tag.name, tag.color, tag.id);
        }

        TagCommands::Edit { tag, name, color } => {
            let existing = resolve_tag(store, &tag)?;
            let id = existing.id.clone();
            let draft = TagDraft::new(
                name.unwrap_or_else(|| existing.name.clone()),
                color.unwrap_or_else(|| existing.color.clone()),
            );

            let tag = store.update_tag(&id, &draft)?;
            println!("Updated tag: {} {} ({})", tag.name, tag.color, tag.id);
        }

        TagCommands::Delete { tag, yes } => {
            let existing = resolve_tag(store, &tag)?;
            if !yes {
                println!(
                    "Re-run with --yes to delete tag '{}' ({})",
                    existing.name, existing.id
                );
                return Ok(());
            }
            let id = existing.id.clone();
            let tag = store.delete_tag(&id)?;
            println!("Deleted tag: {}", tag.name);
        }

        TagCommands::List => {
            println!("{:<8} {:<20} {:<10} {:>8}", "ID", "NAME", "COLOR", "USED BY");
            println!("{}", "-".repeat(50));
            for tag in store.tags() {
                println!(
                    "{:<8} {:<20} {:<10} {:>8}",
                    short_id(&tag.id),
                    tag.name,
                    tag.color,
                    store.expenses_using_tag(&tag.id)
                );
            }
            println!();
            println!("Palette: {}", TAG_PALETTE.join(" "));
        }
    }
    Ok(())
}

fn run_month_command<S: DurableStore>(
    store: &mut LedgerStore<S>,
    cmd: MonthCommands,
    today: NaiveDate,
) -> Result<()> {
    let current = resolve_month(store, None, today)?;
    let target = match cmd {
        MonthCommands::Show => current,
        MonthCommands::Prev => current
            .previous()
            .ok_or_else(|| anyhow!("No month before {}", current))?,
        MonthCommands::Next => match current.next_within(today) {
            Some(next) => next,
            None => bail!("{} is the latest month that can be viewed", current),
        },
        MonthCommands::Set { month } => {
            let month = parse_month(&month)?;
            if month.first_day() > today {
                bail!("{} has not started yet", month);
            }
            month
        }
    };

    store.set_viewed_month(Some(target));
    let count = store.expenses_in_month(target).len();
    println!("Viewing {} ({} expense(s))", target, count);
    Ok(())
}

fn run_report_command<S: DurableStore>(store: &LedgerStore<S>, month: YearMonth) {
    let expenses = store.expenses_in_month(month);
    let report = store.category_report(&expenses);

    println!("Spending for {}", month);
    println!("{:<20} {:>6} {:>14} {:>8}", "TAG", "COUNT", "TOTAL", "SHARE");
    println!("{}", "-".repeat(51));
    for category in &report.categories {
        println!(
            "{:<20} {:>6} {:>14} {:>7.1}%",
            category.name,
            category.count,
            format_amount(category.total),
            category.percentage
        );
    }
    println!("{}", "-".repeat(51));
    println!("{:<20} {:>6} {:>14}", "TOTAL", expenses.len(), format_amount(report.total));
}

/// Explicit month, else the stored viewed month, else the month of `today`.
fn resolve_month<S: DurableStore>(
    store: &LedgerStore<S>,
    month: Option<&str>,
    today: NaiveDate,
) -> Result<YearMonth> {
    match month {
        Some(month) => parse_month(month),
        None => Ok(store
            .viewed_month()
            .unwrap_or_else(|| YearMonth::containing(today))),
    }
}

/// Find a tag by exact id first, then by name.
fn resolve_tag<'a, S: DurableStore>(store: &'a LedgerStore<S>, tag: &str) -> Result<&'a Tag> {
    if let Ok(found) = store.get_tag(tag) {
        return Ok(found);
    }
    match store.tags_named(tag).as_slice() {
        [] => bail!("Unknown tag '{}'. See `tag list`", tag),
        [found] => Ok(*found),
        several => bail!(
            "{} tags are named '{}'. Use one of the ids: {}",
            several.len(),
            tag,
            several
                .iter()
                .map(|t| t.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn parse_amount(input: &str) -> Result<f64> {
    input
        .trim()
        .parse()
        .with_context(|| format!("Invalid amount '{}'. Use '4.50' or '120'", input))
}

fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", input))
}

fn parse_month(input: &str) -> Result<YearMonth> {
    Ok(input.parse::<YearMonth>()?)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
