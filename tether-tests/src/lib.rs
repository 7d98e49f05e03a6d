mod articles;
mod counters;
mod users;

pub use articles::Article;
pub use users::User;

use crate::{articles::articles, counters::counters, users::users};
use log::LevelFilter;
use std::env;
use tether::Connection;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

pub async fn execute_tests<C: Connection>(mut connection: C) {
    users(&mut connection).await;
    articles(&mut connection).await;
    counters(&mut connection).await;
}

/// Run `$code` with logging turned off, for statements expected to fail.
#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
