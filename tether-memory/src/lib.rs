mod connection;
mod database;
mod driver;
mod statement;

pub use connection::*;
pub use database::*;
pub use driver::*;
