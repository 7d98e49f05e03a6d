use crate::silent_logs;
use std::sync::LazyLock;
use tether::{
    Attribute, Executor, Model, Params, Query, Related, UnknownRelationError, Value, model,
};
use time::{PrimitiveDateTime, macros::datetime};
use tokio::sync::Mutex;

model! {
    /// A user, optionally child of another user.
    pub struct User in "users" {
        id: Int,
        created: DateTime,
        name: String,
        email: String,
        parentId: Int,
        childOf: Int,
    }
    relations {
        parent: HasOne(User, "parentId"),
        children: HasMany("id", "users", "childOf", User),
    }
}

static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub async fn users<E: Executor>(executor: &mut E) {
    let _lock = MUTEX.lock().await;

    // Cleanup
    silent_logs! {
        let _ = executor
            .execute(Query::delete(User::definition().table).compile(), Params::None)
            .await;
    }

    // Insert
    let mut root = User::new([
        ("name", Value::from("root")),
        ("email", "root@example.com".into()),
        ("created", datetime!(2024-03-01 09:30:00).into()),
    ])
    .expect("Could not create root");
    root.save(executor).await.expect("Failed to save root");
    let root_id = root
        .get_as::<i64>("id")
        .expect("The id of root was not generated");

    let mut children = Vec::new();
    for name in ["alice", "bob"] {
        let mut child = User::new([
            ("name", Value::from(name)),
            ("email", format!("{name}@example.com").into()),
            ("parentId", root_id.into()),
            ("childOf", root_id.into()),
        ])
        .expect("Could not create child");
        child.save(executor).await.expect("Failed to save child");
        assert!(!child.get("id").expect("Could not read id").is_null());
        children.push(child);
    }
    let mut carol = User::new([("name", "carol")]).expect("Could not create carol");
    carol.save(executor).await.expect("Failed to save carol");

    // Has-many
    let found = root
        .related_many::<User, _>("children", executor)
        .await
        .expect("Could not fetch the children of root");
    assert_eq!(
        found
            .iter()
            .map(|v| v.get_as::<String>("name").expect("Could not read name"))
            .collect::<Vec<_>>(),
        ["alice", "bob"]
    );
    let found = carol
        .related_many::<User, _>("children", executor)
        .await
        .expect("Could not fetch the children of carol");
    assert!(found.is_empty());

    // Has-one
    let parent = children[0]
        .related_one::<User, _>("parent", executor)
        .await
        .expect("Could not fetch the parent of alice")
        .expect("Alice must have a parent");
    assert_eq!(parent.get_as::<i64>("id").unwrap(), root_id);
    assert_eq!(parent.get_as::<String>("name").unwrap(), "root");
    assert_eq!(
        parent.get_as::<PrimitiveDateTime>("created").unwrap(),
        datetime!(2024-03-01 09:30:00)
    );
    let parent = carol
        .related_one::<User, _>("parent", executor)
        .await
        .expect("Could not fetch the parent of carol");
    assert!(parent.is_none());

    // Dynamic access
    match children[1]
        .record()
        .attribute("parent", executor)
        .await
        .expect("Could not read the parent attribute")
    {
        Attribute::Related(Related::One(Some(parent))) => {
            assert_eq!(parent.get("name").unwrap(), Value::Varchar("root".into()))
        }
        other => panic!("Unexpected parent attribute {other:?}"),
    }
    assert_eq!(
        children[1]
            .record()
            .attribute("email", executor)
            .await
            .expect("Could not read the email attribute"),
        Attribute::Value(Value::Varchar("bob@example.com".into()))
    );
    let error = root
        .related("siblings", executor)
        .await
        .expect_err("Relation siblings does not exist");
    assert!(error.downcast_ref::<UnknownRelationError>().is_some());

    // Update
    children[0]
        .set("email", "alice@example.org")
        .expect("Could not set email");
    children[0]
        .save(executor)
        .await
        .expect("Failed to update alice");
    let alice = User::find(executor, children[0].get("id").unwrap())
        .await
        .expect("Could not query alice")
        .expect("Could not find alice");
    assert_eq!(alice.get_as::<String>("email").unwrap(), "alice@example.org");
    let all = User::find_by(executor, &[])
        .await
        .expect("Could not query every user");
    assert_eq!(all.len(), 4);

    // Delete
    children[1]
        .delete(executor)
        .await
        .expect("Failed to delete bob");
    let bob = User::find(executor, children[1].get("id").unwrap())
        .await
        .expect("Could not query bob");
    assert!(bob.is_none());
    let result;
    silent_logs! {
        result = children[1].delete(executor).await;
    }
    assert!(result.is_err(), "Deleting bob twice must fail");
    let found = root
        .related_many::<User, _>("children", executor)
        .await
        .expect("Could not fetch the children of root");
    assert_eq!(found.len(), 1);
    let found = User::find_by(executor, &[("name", "alice".into()), ("parentId", root_id.into())])
        .await
        .expect("Could not query alice by name");
    assert_eq!(found.len(), 1);
}
