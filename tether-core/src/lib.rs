mod as_value;
mod connection;
mod driver;
mod error;
mod executor;
mod field;
mod model;
mod populator;
mod query;
mod record;
mod relation;
mod table_ref;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use executor::*;
pub use field::*;
pub use model::*;
pub use populator::*;
pub use query::*;
pub use record::*;
pub use relation::*;
pub use table_ref::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
