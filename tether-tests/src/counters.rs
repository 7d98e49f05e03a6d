use crate::silent_logs;
use std::sync::LazyLock;
use tether::{Executor, Params, Query, Value};
use tokio::sync::Mutex;

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Raw statements, scalar reads and catalog queries, without any model.
pub async fn counters<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;

    // Cleanup
    silent_logs! {
        let _ = executor
            .execute(Query::delete("counters").compile(), Params::None)
            .await;
    }

    // Insert
    for (name, hits) in [("home", 10), ("about", 3), ("contact", 7)] {
        let result = executor
            .execute(
                Query::insert("counters", &["id", "name", "hits"], &["hits"]).compile(),
                Params::named([
                    ("id", Value::Null),
                    ("name", name.into()),
                    ("hits", hits.into()),
                ]),
            )
            .await
            .expect("Failed to insert counter");
        assert_eq!(result.rows_affected, 1);
    }

    // Scalar
    let hits = executor
        .fetch_scalar(
            Query::select_fields("counters", &["hits"])
                .where_eq(&["name"])
                .compile(),
            Params::positional(["about"]),
            Value::Null,
        )
        .await
        .expect("Could not read the hits of about");
    assert_eq!(hits.to_string(), "3");
    let hits = executor
        .fetch_scalar(
            Query::select_fields("counters", &["hits"])
                .where_eq(&["name"])
                .compile(),
            Params::positional(["missing"]),
            Value::Int64(-1),
        )
        .await
        .expect("Could not read the hits of a missing counter");
    assert_eq!(hits, Value::Int64(-1));

    // Order and limit
    let rows = executor
        .fetch_all(
            Query::select_fields("counters", &["name"])
                .order("hits", "desc")
                .limit(2)
                .compile(),
            Params::None,
        )
        .await
        .expect("Could not query the top counters");
    let names = rows
        .iter()
        .map(|v| v.values()[0].to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, ["home", "contact"]);
    let rows = executor
        .fetch_all(
            Query::select("counters")
                .order_by(&[("name", "asc")])
                .limit_offset(1, 5)
                .compile(),
            Params::None,
        )
        .await
        .expect("Could not query the counters page");
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].get_column("name").map(Value::to_string).as_deref(),
        Some("contact")
    );

    // Catalog
    let tables = executor.tables().await.expect("Could not list the tables");
    assert!(tables.iter().any(|v| v == "counters"), "{tables:?}");
    let columns = executor
        .describe("counters")
        .await
        .expect("Could not describe counters");
    let columns = columns
        .iter()
        .filter_map(|v| v.values().first().map(Value::to_string))
        .collect::<Vec<_>>();
    for column in ["id", "name", "hits"] {
        assert!(columns.iter().any(|v| v == column), "{columns:?}");
    }

    // Delete
    let result = executor
        .execute(
            Query::delete("counters").where_eq(&["name"]).compile(),
            Params::positional(["about"]),
        )
        .await
        .expect("Failed to delete about");
    assert_eq!(result.rows_affected, 1);
}
