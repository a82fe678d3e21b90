mod expense;
mod money;
mod month;
mod tag;
mod validation;
mod views;

pub use expense::*;
pub use money::*;
pub use month::*;
pub use tag::*;
pub use validation::*;
pub use views::*;
