//! SQLite access, one module per table group.

pub mod booths;
pub mod goods;
pub mod ledger;
pub mod missions;
pub mod users;
