use crate::{User, silent_logs};
use serde_json::json;
use std::sync::LazyLock;
use tether::{Executor, Model, Params, Query, QueryError, Value, model};
use time::{PrimitiveDateTime, macros::datetime};
use tokio::sync::Mutex;

model! {
    pub struct Article in "articles" {
        id: Int,
        title: String,
        tags: Json,
        published: DateTime,
        views: Int,
        authorId: Int,
    }
    relations {
        author: HasOne(User, "authorId"),
    }
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn articles<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;

    // Cleanup
    silent_logs! {
        let _ = executor
            .execute(Query::delete(Article::definition().table).compile(), Params::None)
            .await;
    }

    // Coercion on the way in
    let mut article = Article::new([
        ("title", Value::from("Lazy relations")),
        ("tags", json!(["orm", "rust"]).into()),
        ("published", 1_700_000_000.into()),
        ("views", "42".into()),
    ])
    .expect("Could not create the article");
    assert_eq!(
        article.record().primitive("published"),
        Some("2023-11-14 22:13:20")
    );
    assert_eq!(article.record().primitive("tags"), Some(r#"["orm","rust"]"#));
    article.save(executor).await.expect("Failed to save article");
    let id = article.get("id").expect("Could not read id");
    assert!(!id.is_null());

    // Coercion on the way out
    let found = Article::find(executor, id.clone())
        .await
        .expect("Could not query the article")
        .expect("Could not find the article");
    assert_eq!(found.get_as::<i64>("views").unwrap(), 42);
    assert_eq!(
        found.get_as::<PrimitiveDateTime>("published").unwrap(),
        datetime!(2023-11-14 22:13:20)
    );
    assert_eq!(
        found.get("tags").unwrap(),
        Value::List(vec!["orm".into(), "rust".into()])
    );
    assert_eq!(found.record().primitive("tags"), Some(r#"["orm","rust"]"#));
    let exported = found.to_json().expect("Could not export the article");
    assert_eq!(exported["title"], json!("Lazy relations"));
    assert_eq!(exported["tags"], json!(["orm", "rust"]));
    assert_eq!(exported["views"], json!(42));
    assert_eq!(exported["authorId"], json!(null));

    // Reloaded instances save back what they read
    let mut reloaded = found;
    for _ in 0..2 {
        reloaded
            .save(executor)
            .await
            .expect("Failed to save the reloaded article");
        reloaded = Article::find(executor, id.clone())
            .await
            .expect("Could not query the article")
            .expect("Could not find the article");
    }
    assert_eq!(
        reloaded.record().primitive("tags"),
        Some(r#"["orm","rust"]"#)
    );
    assert_eq!(
        reloaded.get_as::<PrimitiveDateTime>("published").unwrap(),
        datetime!(2023-11-14 22:13:20)
    );
    assert_eq!(reloaded, Article::find(executor, id.clone()).await.unwrap().unwrap());

    // Upsert
    article.set("views", 43).expect("Could not set views");
    article.save(executor).await.expect("Failed to update article");
    let found = Article::find_by(executor, &[("title", "Lazy relations".into())])
        .await
        .expect("Could not query the article by title");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get_as::<i64>("views").unwrap(), 43);
    assert_eq!(found[0].get("id").unwrap(), id);

    // Relations across models
    let author = article
        .related_one::<User, _>("author", executor)
        .await
        .expect("Could not fetch the author");
    assert!(author.is_none(), "The article has no author");
    let result = article.related_one::<Article, _>("author", executor).await;
    assert!(result.is_err(), "The author is a user, not an article");

    // Errors
    let unsaved = Article::new([("title", "Draft")]).expect("Could not create the draft");
    let result = unsaved.delete(executor).await;
    assert!(result.is_err(), "An article without id cannot be deleted");
    let result;
    silent_logs! {
        result = executor
            .execute(
                Query::insert(Article::definition().table, &["id", "title"], &[]).compile(),
                Params::named([("id", id.clone()), ("title", "Duplicate".into())]),
            )
            .await;
    }
    let error = result.expect_err("Inserting a duplicate id must fail");
    assert!(
        error.downcast_ref::<QueryError>().is_some(),
        "Unexpected error {error:#}"
    );

    article.delete(executor).await.expect("Failed to delete article");
    let found = Article::find(executor, id)
        .await
        .expect("Could not query the article");
    assert!(found.is_none());
}
