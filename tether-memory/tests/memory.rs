#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use tether_core::{Connection, Driver, Executor, Params, Query, QueryError, Value};
    use tether_memory::{MemoryConnection, MemoryDriver};
    use tether_tests::{execute_tests, init_logs, silent_logs};

    static MUTEX: Mutex<()> = Mutex::new(());

    #[tokio::test]
    async fn memory() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let driver = MemoryDriver::new();
        let connection = driver
            .connect("memory://tests".into())
            .await
            .expect("Could not open the database");
        assert_eq!(connection.database().name(), "tests");
        execute_tests(connection).await;
    }

    #[tokio::test]
    async fn debug_connection() {
        init_logs();
        let driver = MemoryDriver::new();
        let mut connection = driver
            .connect("memory://debug".into())
            .await
            .expect("Could not open the database")
            .debug();
        let tables = connection.tables().await.expect("Could not list tables");
        assert!(tables.is_empty());
        connection
            .execute(
                Query::insert("pages", &["id", "title"], &[]).compile(),
                Params::named([("id", Value::Null), ("title", "Home".into())]),
            )
            .await
            .expect("Could not insert a page");
        assert_eq!(connection.last_insert_id(), Some(1));
        let labels = connection
            .fetch_all(Query::show_tables().compile(), Params::None)
            .await
            .expect("Could not list tables");
        assert_eq!(labels[0].names(), ["Tables_in_debug"]);
        assert_eq!(
            connection.prepared(),
            [
                "SHOW TABLES",
                "INSERT INTO pages (id, title) VALUES(:id, :title)",
                "SHOW TABLES",
            ]
        );
        connection.clear();
        assert!(connection.prepared().is_empty());
    }

    #[tokio::test]
    async fn connect_errors() {
        init_logs();
        let result;
        silent_logs! {
            result = MemoryConnection::connect("mysql://localhost/app".into()).await;
        }
        let error = result.expect_err("Wrong scheme must be rejected");
        assert!(error.to_string().contains("memory://"), "{error}");
        let connection = MemoryConnection::connect("memory://".into())
            .await
            .expect("The database name is optional");
        assert_eq!(connection.database().name(), "tether");
    }

    #[tokio::test]
    async fn query_errors() {
        init_logs();
        let mut connection = MemoryConnection::default();
        let result;
        silent_logs! {
            result = connection
                .fetch_all(Query::select("missing").compile(), Params::None)
                .await;
        }
        let error = result.expect_err("Missing table must fail");
        let error = error
            .downcast_ref::<QueryError>()
            .expect("Expected a query error");
        assert_eq!(error.code, "42S02");
        assert_eq!(error.message, "Table 'tether.missing' doesn't exist");

        let result;
        silent_logs! {
            result = connection
                .execute("UPDATE pages SET title = 'x'".into(), Params::None)
                .await;
        }
        let error = result.expect_err("Unsupported statement must fail");
        assert_eq!(
            error.downcast_ref::<QueryError>().map(|v| v.code.as_str()),
            Some("42000")
        );
    }

    #[tokio::test]
    async fn generated_ids() {
        init_logs();
        let mut connection = MemoryConnection::default();
        let insert = Query::insert("notes", &["id", "body"], &["body"]).compile();
        for (id, body) in [(Value::Null, "one"), (Value::Int64(10), "ten"), (Value::Null, "eleven")] {
            connection
                .execute(insert.clone(), Params::named([("id", id), ("body", body.into())]))
                .await
                .expect("Could not insert a note");
        }
        assert_eq!(connection.last_insert_id(), Some(11));
        let result = connection
            .execute(
                insert.clone(),
                Params::named([("id", Value::Int64(10)), ("body", "TEN".into())]),
            )
            .await
            .expect("Could not update a note");
        assert_eq!(result.rows_affected, 2);
        let body = connection
            .fetch_scalar(
                Query::select_fields("notes", &["body"]).where_eq(&["id"]).compile(),
                Params::positional([10]),
                Value::Null,
            )
            .await
            .expect("Could not read a note");
        assert_eq!(body, Value::Varchar("TEN".into()));
        assert_eq!(connection.database().table("notes").map(|v| v.len()), Some(3));
    }

    #[tokio::test]
    async fn rejected_insert_keeps_table() {
        init_logs();
        let mut connection = MemoryConnection::default();
        connection
            .execute(
                Query::insert("notes", &["id", "body"], &[]).compile(),
                Params::named([("id", Value::Int64(1)), ("body", "one".into())]),
            )
            .await
            .expect("Could not insert a note");
        let result;
        silent_logs! {
            result = connection
                .execute(
                    Query::insert("notes", &["id", "body", "author"], &[]).compile(),
                    Params::named([
                        ("id", Value::Int64(1)),
                        ("body", "again".into()),
                        ("author", "me".into()),
                    ]),
                )
                .await;
        }
        let error = result.expect_err("Duplicate key must fail");
        assert_eq!(
            error.downcast_ref::<QueryError>().map(|v| v.code.as_str()),
            Some("23000")
        );
        let table = connection.database().table("notes").expect("Missing table");
        assert_eq!(table.columns(), ["id", "body"]);
        assert_eq!(table.len(), 1);
        let columns = connection
            .describe("notes")
            .await
            .expect("Could not describe notes");
        assert_eq!(columns.len(), 2);
    }
}
