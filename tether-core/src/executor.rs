use crate::{
    Query, Result, Value,
    stream::{Stream, StreamExt, TryStreamExt},
    truncate_long,
};
use std::{future::Future, pin::pin, sync::Arc};

/// Parameters bound to a statement.
///
/// `where_eq` predicates are bound positionally, `insert` columns by name (without the
/// leading colon).
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(Vec<(String, Value)>),
}

impl Params {
    pub fn positional<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn named<K: Into<String>, V: Into<Value>>(values: impl IntoIterator<Item = (K, V)>) -> Self {
        Params::Named(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Column labels, shared by every row of one result set.
pub type RowNames = Arc<[String]>;
/// Cells of one row, in label order.
pub type Row = Box<[Value]>;

/// One raw result row: the labels of the result set and the cells of this row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    pub labels: RowNames,
    pub values: Row,
}

impl RowLabeled {
    pub fn new(labels: RowNames, values: Row) -> Self {
        Self { labels, values }
    }
    pub fn names(&self) -> &[String] {
        &self.labels
    }
    pub fn values(&self) -> &[Value] {
        &self.values
    }
    pub fn get_column(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .position(|v| v == name)
            .map(|i| &self.values[i])
    }
    /// Consume the row into `(label, value)` pairs.
    pub fn into_pairs(self) -> impl Iterator<Item = (String, Value)> {
        let labels = self.labels;
        self.values
            .into_vec()
            .into_iter()
            .enumerate()
            .map(move |(i, v)| (labels[i].clone(), v))
    }
}

/// Outcome of an `INSERT` or `DELETE`.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Rows inserted, updated or deleted. An upsert that updated counts 2.
    pub rows_affected: u64,
    /// Backend-specific last inserted identifier when available.
    pub last_affected_id: Option<i64>,
}

impl Extend<RowsAffected> for RowsAffected {
    fn extend<T: IntoIterator<Item = RowsAffected>>(&mut self, iter: T) {
        for elem in iter {
            self.rows_affected += elem.rows_affected;
            if elem.last_affected_id.is_some() {
                self.last_affected_id = elem.last_affected_id;
            }
        }
    }
}

/// Item of the stream returned by [`Executor::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Row(RowLabeled),
    Affected(RowsAffected),
}

impl From<RowLabeled> for QueryResult {
    fn from(value: RowLabeled) -> Self {
        QueryResult::Row(value)
    }
}

impl From<RowsAffected> for QueryResult {
    fn from(value: RowsAffected) -> Self {
        QueryResult::Affected(value)
    }
}

/// The connection manager boundary: everything the core needs from a database.
///
/// Implementors report a non-success execution status as a [`crate::QueryError`] carrying the
/// backend code and message.
pub trait Executor: Send {
    /// General method to send any statement and return any result type (either row or count).
    fn run(&mut self, sql: String, params: Params)
    -> impl Stream<Item = Result<QueryResult>> + Send;

    /// Identifier generated by the last insert, if any.
    fn last_insert_id(&self) -> Option<i64>;

    /// Execute the statement and stream the rows.
    fn fetch(&mut self, sql: String, params: Params) -> impl Stream<Item = Result<RowLabeled>> + Send {
        log::debug!("{}", truncate_long!(sql));
        self.run(sql, params).filter_map(|v| async move {
            match v {
                Ok(QueryResult::Row(v)) => Some(Ok(v)),
                Err(e) => Some(Err(e)),
                _ => None,
            }
        })
    }

    /// Execute the statement and collect every row.
    fn fetch_all(
        &mut self,
        sql: String,
        params: Params,
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        self.fetch(sql, params).try_collect()
    }

    /// Execute the statement and return the first row, if any.
    fn fetch_one(
        &mut self,
        sql: String,
        params: Params,
    ) -> impl Future<Output = Result<Option<RowLabeled>>> + Send {
        let stream = self.fetch(sql, params);
        async move {
            let mut stream = pin!(stream);
            stream.try_next().await
        }
    }

    /// First column of the first row, `fallback` when the statement returns no rows.
    fn fetch_scalar(
        &mut self,
        sql: String,
        params: Params,
        fallback: Value,
    ) -> impl Future<Output = Result<Value>> + Send {
        let stream = self.fetch(sql, params);
        async move {
            let mut stream = pin!(stream);
            Ok(match stream.try_next().await? {
                Some(row) => row.values.into_vec().into_iter().next().unwrap_or(fallback),
                None => fallback,
            })
        }
    }

    /// Execute the statement and return the total number of rows affected.
    fn execute(
        &mut self,
        sql: String,
        params: Params,
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        log::debug!("{}", truncate_long!(sql));
        self.run(sql, params)
            .filter_map(|v| async move {
                match v {
                    Ok(QueryResult::Affected(v)) => Some(Ok(v)),
                    Err(e) => Some(Err(e)),
                    _ => None,
                }
            })
            .try_collect()
    }

    /// Names of the tables in the current database.
    fn tables(&mut self) -> impl Future<Output = Result<Vec<String>>> + Send {
        self.fetch(Query::show_tables().compile(), Params::None)
            .map_ok(|row| row.values.first().map(Value::to_string).unwrap_or_default())
            .try_collect()
    }

    /// Column descriptions of `table`, one row per column.
    fn describe(&mut self, table: &str) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        self.fetch_all(Query::describe(table).compile(), Params::None)
    }
}
