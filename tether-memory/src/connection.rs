use crate::{Database, MemoryDriver, statement::Statement};
use std::borrow::Cow;
use tether_core::{
    Connection, Context, Driver, Error, Executor, Params, QueryResult, Result, RowsAffected,
    stream::{self, Stream},
    truncate_long,
};
use url::Url;

/// Name of the database when the url does not specify one.
pub const DEFAULT_DATABASE: &str = "tether";

/// Connection owning a private in-memory database.
#[derive(Debug, Clone)]
pub struct MemoryConnection {
    database: Database,
    last_insert_id: Option<i64>,
}

impl MemoryConnection {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: Database::new(database),
            last_insert_id: None,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new(DEFAULT_DATABASE)
    }
}

impl Executor for MemoryConnection {
    fn run(
        &mut self,
        sql: String,
        params: Params,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        let result = Statement::parse(&sql)
            .and_then(|statement| self.database.execute(statement, &params));
        let items = match result {
            Ok(results) => {
                for result in &results {
                    if let QueryResult::Affected(RowsAffected {
                        last_affected_id: Some(id),
                        ..
                    }) = result
                    {
                        self.last_insert_id = Some(*id);
                    }
                }
                results.into_iter().map(Ok).collect()
            }
            Err(error) => {
                let error =
                    error.context(format!("While executing the query:\n{}", truncate_long!(sql)));
                log::error!("{:#}", error);
                vec![Err(error)]
            }
        };
        stream::iter(items)
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }
}

impl Connection for MemoryConnection {
    async fn connect(url: Cow<'static, str>) -> Result<MemoryConnection> {
        let prefix = format!("{}://", MemoryDriver::NAME);
        if !url.starts_with(&prefix) {
            let error = Error::msg(format!(
                "Expected memory connection url to start with `{}`",
                &prefix
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        let context = || format!("Error while decoding connection URL: `{}`", url);
        let parsed = Url::parse(&url).with_context(context)?;
        let database = parsed
            .host_str()
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_DATABASE);
        Ok(Self::new(database))
    }
}
