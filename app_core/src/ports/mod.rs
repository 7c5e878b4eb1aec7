// ports of core

mod database;
mod printer;

pub use database::*;
pub use printer::*;
