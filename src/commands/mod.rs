//! Operations exposed to the front end. Each takes the running [`Pos`](crate::pos::Pos)
//! the way a UI command handler would and returns owned data ready to serialize.

pub mod cash_flow;
pub mod categories;
pub mod orders;
pub mod products;
pub mod reports;
pub mod settings;
