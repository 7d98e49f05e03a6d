use crate::{Executor, Params, QueryResult, Result, stream::Stream};
use std::{borrow::Cow, future::Future};

pub trait Connection: Executor + Sized {
    /// Open a connection to the given URL.
    fn connect(url: Cow<'static, str>) -> impl Future<Output = Result<Self>>;

    /// Wrap the connection so that the text of every statement is recorded.
    fn debug(self) -> DebugConnection<Self> {
        DebugConnection::new(self)
    }
}

/// Connection recording every statement it runs, in order.
pub struct DebugConnection<C: Connection> {
    pub connection: C,
    prepared: Vec<String>,
}

impl<C: Connection> DebugConnection<C> {
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            prepared: Vec::new(),
        }
    }

    /// Statements run so far.
    pub fn prepared(&self) -> &[String] {
        &self.prepared
    }

    pub fn clear(&mut self) {
        self.prepared.clear();
    }
}

impl<C: Connection> Executor for DebugConnection<C> {
    fn run(
        &mut self,
        sql: String,
        params: Params,
    ) -> impl Stream<Item = Result<QueryResult>> + Send {
        self.prepared.push(sql.clone());
        self.connection.run(sql, params)
    }

    fn last_insert_id(&self) -> Option<i64> {
        self.connection.last_insert_id()
    }
}

impl<C: Connection> Connection for DebugConnection<C> {
    async fn connect(url: Cow<'static, str>) -> Result<Self> {
        C::connect(url).await.map(Self::new)
    }
}
