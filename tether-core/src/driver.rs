use crate::{Connection, Result};
use std::{borrow::Cow, future::Future};

pub trait Driver {
    type Connection: Connection;

    /// URL scheme accepted by `connect`, without `://`.
    const NAME: &'static str;

    fn connect(&self, url: Cow<'static, str>) -> impl Future<Output = Result<Self::Connection>> {
        Self::Connection::connect(url)
    }
}
