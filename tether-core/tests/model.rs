#[cfg(test)]
mod tests {
    use serde_json::json;
    use std::{collections::VecDeque, sync::Arc};
    use tether_core::{
        Attribute, ConfigurationError, Executor, Model, Params, Populator, QueryError,
        QueryResult, Related, Result, RowLabeled, RowSet, RowsAffected, SingleRow,
        UnknownRelationError, Value, model,
        stream::{self, Stream},
    };
    use time::macros::datetime;

    model! {
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

    model! {
        struct Post in "posts" primary_key "slug" {
            slug: String,
            body: String,
            meta: Json,
        }
    }

    model! {
        struct Broken in "broken" {
            id: Int,
            parent: Int,
        }
        relations {
            parent: HasOne(Broken, "parent"),
        }
    }

    /// Executor answering each statement with the next scripted response.
    #[derive(Default)]
    struct Scripted {
        responses: VecDeque<Vec<Result<QueryResult>>>,
        queries: Vec<(String, Params)>,
        last_id: Option<i64>,
    }

    impl Scripted {
        fn rows(mut self, labels: &[&str], rows: Vec<Vec<Value>>) -> Self {
            let labels: Arc<[String]> = labels.iter().map(|v| v.to_string()).collect();
            self.responses.push_back(
                rows.into_iter()
                    .map(|v| Ok(RowLabeled::new(labels.clone(), v.into()).into()))
                    .collect(),
            );
            self
        }

        fn affected(mut self, rows_affected: u64, last_affected_id: Option<i64>) -> Self {
            self.responses.push_back(vec![Ok(RowsAffected {
                rows_affected,
                last_affected_id,
            }
            .into())]);
            self
        }

        fn error(mut self, code: &str, message: &str) -> Self {
            self.responses
                .push_back(vec![Err(QueryError::new(code, message).into())]);
            self
        }

        fn sql(&self) -> Vec<&str> {
            self.queries.iter().map(|(v, _)| v.as_str()).collect()
        }
    }

    impl Executor for Scripted {
        fn run(
            &mut self,
            sql: String,
            params: Params,
        ) -> impl Stream<Item = Result<QueryResult>> + Send {
            self.queries.push((sql, params));
            stream::iter(self.responses.pop_front().unwrap_or_default())
        }

        fn last_insert_id(&self) -> Option<i64> {
            self.last_id
        }
    }

    #[test]
    fn fresh_model_is_null() {
        let user = User::empty().unwrap();
        let data = user.refined_data().unwrap();
        assert_eq!(
            data.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            ["id", "created", "name", "email", "parentId", "childOf"]
        );
        assert!(data.iter().all(|(_, v)| v.is_null()));
        assert!(user.record().primitive_data().all(|(_, v)| v.is_none()));
    }

    #[test]
    fn set_and_get() {
        let mut user = User::new([
            ("name", Value::from("root")),
            ("parentId", "12".into()),
            ("created", "2024-01-02".into()),
            ("nickname", Value::Int64(5)),
        ])
        .unwrap();
        assert_eq!(user.get("parentId").unwrap(), Value::Int64(12));
        assert_eq!(user.record().primitive("parentId"), Some("12"));
        assert_eq!(
            user.get("created").unwrap(),
            Value::Timestamp(datetime!(2024-01-02 00:00:00))
        );
        assert_eq!(user.get("nickname").unwrap(), Value::Int64(5));
        assert_eq!(user.get("missing").unwrap(), Value::Null);
        assert!(user.has_field("email"));
        assert!(!user.has_field("nickname"));
        assert!(user.record().has("nickname"));
        assert!(user.record().has("children"));
        assert!(!user.record().has("missing"));

        user.fill([("email", "a@b.c"), ("childOf", "")]).unwrap();
        assert_eq!(user.get_as::<String>("email").unwrap(), "a@b.c");
        assert_eq!(user.get_as::<Option<i64>>("childOf").unwrap(), None);
        user.set("parentId", Value::Null).unwrap();
        assert!(user.get("parentId").unwrap().is_null());
        assert!(user.set("parentId", "twelve").is_err());
        assert_eq!(
            user.record().primitive_data().collect::<Vec<_>>(),
            [
                ("id", None),
                ("created", Some("2024-01-02 00:00:00")),
                ("name", Some("root")),
                ("email", Some("a@b.c")),
                ("parentId", None),
                ("childOf", None),
            ]
        );
    }

    #[test]
    fn export() {
        let user = User::new([
            ("id", Value::Int64(1)),
            ("name", "root".into()),
            ("created", datetime!(2024-01-02 03:04:05).into()),
        ])
        .unwrap();
        assert_eq!(
            user.to_json().unwrap(),
            json!({
                "id": 1,
                "created": "2024-01-02 03:04:05",
                "name": "root",
                "email": null,
                "parentId": null,
                "childOf": null,
            })
        );
        let post = Post::new([("meta", json!({"draft": true}))]).unwrap();
        assert_eq!(
            serde_json::to_value(post.record()).unwrap(),
            json!({"slug": null, "body": null, "meta": {"draft": true}})
        );
    }

    #[test]
    fn relation_named_like_a_field() {
        let error = Broken::empty().unwrap_err();
        let error = error
            .downcast_ref::<ConfigurationError>()
            .expect("Expected a configuration error");
        assert_eq!(error.model, "Broken");
        assert!(error.message.contains("parent"), "{}", error.message);
    }

    #[tokio::test]
    async fn has_one_without_key() {
        let mut executor = Scripted::default();
        let mut user = User::new([("name", "orphan")]).unwrap();
        let parent = user
            .related_one::<User, _>("parent", &mut executor)
            .await
            .unwrap();
        assert!(parent.is_none());
        user.set("parentId", "").unwrap();
        let parent = user.related("parent", &mut executor).await.unwrap();
        assert_eq!(parent, Related::One(None));
        assert!(executor.queries.is_empty());
    }

    #[tokio::test]
    async fn has_one() {
        let mut executor = Scripted::default()
            .rows(&["id", "name"], vec![vec![Value::Int64(3), "root".into()]])
            .rows(&["id", "name"], vec![]);
        let user = User::new([("parentId", 3)]).unwrap();
        let parent = user
            .related_one::<User, _>("parent", &mut executor)
            .await
            .unwrap()
            .expect("Expected the parent");
        assert_eq!(parent.get_as::<String>("name").unwrap(), "root");
        assert_eq!(
            executor.queries[0],
            (
                "SELECT * FROM users WHERE id = ? LIMIT 1".to_string(),
                Params::Positional(vec![Value::Int64(3)])
            )
        );
        let parent = user
            .related_one::<User, _>("parent", &mut executor)
            .await
            .unwrap();
        assert!(parent.is_none(), "Each access runs a new query");
        assert_eq!(executor.queries.len(), 2);
    }

    #[tokio::test]
    async fn has_many() {
        let mut executor = Scripted::default()
            .rows(
                &["id", "name", "childOf"],
                vec![
                    vec![Value::Int64(2), "alice".into(), "1".into()],
                    vec![Value::Int64(3), "bob".into(), "1".into()],
                ],
            )
            .rows(&["id"], vec![]);
        let user = User::new([("id", 1)]).unwrap();
        let children = user
            .related_many::<User, _>("children", &mut executor)
            .await
            .unwrap();
        assert_eq!(
            children
                .iter()
                .map(|v| v.get_as::<String>("name").unwrap())
                .collect::<Vec<_>>(),
            ["alice", "bob"]
        );
        assert_eq!(children[0].get("childOf").unwrap(), Value::Int64(1));
        let children = user
            .related_many::<User, _>("children", &mut executor)
            .await
            .unwrap();
        assert!(children.is_empty());
        assert_eq!(
            executor.sql(),
            [
                "SELECT * FROM users WHERE childOf = ?",
                "SELECT * FROM users WHERE childOf = ?"
            ]
        );

        let user = User::empty().unwrap();
        let children = user.related("children", &mut executor).await.unwrap();
        assert_eq!(children, Related::Many(vec![]));
        assert_eq!(executor.queries.len(), 2);
    }

    #[tokio::test]
    async fn relation_errors() {
        let mut executor = Scripted::default();
        let user = User::new([("id", 1), ("parentId", 2)]).unwrap();
        let error = user.related("friends", &mut executor).await.unwrap_err();
        let error = error
            .downcast_ref::<UnknownRelationError>()
            .expect("Expected an unknown relation error");
        assert_eq!(error.relation, "friends");
        assert!(
            user.related_one::<Post, _>("parent", &mut executor)
                .await
                .is_err()
        );
        assert!(executor.queries.is_empty());

        let mut executor = Scripted::default().rows(&["id"], vec![]);
        assert!(
            user.related_many::<User, _>("parent", &mut executor)
                .await
                .is_err()
        );

        let mut executor = Scripted::default().error("42S02", "Table 'app.users' doesn't exist");
        let error = user
            .related_one::<User, _>("parent", &mut executor)
            .await
            .unwrap_err();
        assert_eq!(
            error.downcast_ref::<QueryError>(),
            Some(&QueryError::new("42S02", "Table 'app.users' doesn't exist"))
        );
    }

    #[tokio::test]
    async fn attribute() {
        let mut executor = Scripted::default();
        let user = User::new([("name", "root")]).unwrap();
        assert_eq!(
            user.record().attribute("name", &mut executor).await.unwrap(),
            Attribute::Value("root".into())
        );
        assert_eq!(
            user.record().attribute("parent", &mut executor).await.unwrap(),
            Attribute::Related(Related::One(None))
        );
    }

    #[test]
    fn populators() {
        let labels: Arc<[String]> = ["id", "name", "extra"]
            .into_iter()
            .map(String::from)
            .collect();
        let row = |id: i64, name: &str| {
            RowLabeled::new(
                labels.clone(),
                Box::new([Value::Int64(id), name.into(), Value::Boolean(true)]),
            )
        };
        assert!(SingleRow(None).populate::<User>().unwrap().is_none());
        let user = User::from_rows(SingleRow(Some(row(1, "root"))))
            .unwrap()
            .expect("Expected a user");
        assert_eq!(user.get("id").unwrap(), Value::Int64(1));
        assert_eq!(user.get("extra").unwrap(), Value::Boolean(true));
        assert!(!user.has_field("extra"));

        let users = RowSet(vec![row(1, "a"), row(2, "b"), row(3, "c")])
            .populate::<User>()
            .unwrap();
        assert_eq!(
            users
                .iter()
                .map(|v| v.get_as::<i64>("id").unwrap())
                .collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert!(RowSet(vec![]).populate::<User>().unwrap().is_empty());
        let records = RowSet(vec![row(4, "d")])
            .populate_records(User::definition())
            .unwrap();
        assert!(User::try_from_record(records[0].clone()).is_ok());
        assert!(Post::try_from_record(records[0].clone()).is_err());
    }

    #[test]
    fn rows_hold_stored_values() {
        let labels: Arc<[String]> = ["slug", "body", "meta"]
            .into_iter()
            .map(String::from)
            .collect();
        let row = RowLabeled::new(
            labels,
            Box::new([
                Value::from("hello"),
                Value::Null,
                Value::Varchar(r#"{"draft":true,"tags":["a","b"]}"#.into()),
            ]),
        );
        let post = SingleRow(Some(row))
            .populate::<Post>()
            .unwrap()
            .expect("Expected a post");
        assert_eq!(
            post.record().primitive("meta"),
            Some(r#"{"draft":true,"tags":["a","b"]}"#)
        );
        assert_eq!(
            post.get("meta").unwrap(),
            Value::from(json!({"draft": true, "tags": ["a", "b"]}))
        );
        assert_eq!(post.record().primitive("body"), None);
        let copy = Post::new(
            post.record()
                .primitive_data()
                .map(|(k, v)| (k, v.map(str::to_owned))),
        )
        .unwrap();
        assert_ne!(
            copy.record().primitive("meta"),
            post.record().primitive("meta"),
            "Setting stored text on a JSON field encodes it as a string"
        );

        let labels: Arc<[String]> = ["id", "created", "parentId"]
            .into_iter()
            .map(String::from)
            .collect();
        let row = RowLabeled::new(
            labels,
            Box::new([
                Value::Int64(5),
                Value::Timestamp(datetime!(2024-01-02 03:04:05)),
                Value::Boolean(true),
            ]),
        );
        let user = User::from_rows(SingleRow(Some(row)))
            .unwrap()
            .expect("Expected a user");
        assert_eq!(user.record().primitive("id"), Some("5"));
        assert_eq!(
            user.record().primitive("created"),
            Some("2024-01-02 03:04:05")
        );
        assert_eq!(user.get("parentId").unwrap(), Value::Int64(1));
    }

    #[tokio::test]
    async fn save() {
        let mut executor = Scripted::default().affected(1, None).affected(2, None);
        executor.last_id = Some(7);
        let mut user = User::new([("name", "root")]).unwrap();
        user.save(&mut executor).await.unwrap();
        assert_eq!(user.get("id").unwrap(), Value::Int64(7));
        let (sql, params) = &executor.queries[0];
        assert_eq!(
            sql,
            "INSERT INTO users (id, created, name, email, parentId, childOf) \
             VALUES(:id, :created, :name, :email, :parentId, :childOf) \
             ON DUPLICATE KEY UPDATE created = :created, name = :name, email = :email, \
             parentId = :parentId, childOf = :childOf"
        );
        assert_eq!(
            *params,
            Params::named([
                ("id", Value::Null),
                ("created", Value::Null),
                ("name", "root".into()),
                ("email", Value::Null),
                ("parentId", Value::Null),
                ("childOf", Value::Null),
            ])
        );

        user.set("name", "renamed").unwrap();
        executor.last_id = Some(99);
        user.save(&mut executor).await.unwrap();
        assert_eq!(user.get("id").unwrap(), Value::Int64(7));
        let Params::Named(params) = &executor.queries[1].1 else {
            panic!("Expected named parameters");
        };
        assert!(params.contains(&("id".to_string(), "7".into())));
        assert!(params.contains(&("name".to_string(), "renamed".into())));

        let mut executor = Scripted::default().affected(1, Some(12));
        let mut user = User::empty().unwrap();
        user.save(&mut executor).await.unwrap();
        assert_eq!(user.get("id").unwrap(), Value::Int64(12));
    }

    #[tokio::test]
    async fn delete() {
        let mut executor = Scripted::default().affected(1, None).affected(0, None);
        let post = Post::new([("body", "text")]).unwrap();
        assert!(post.delete(&mut executor).await.is_err());
        assert!(executor.queries.is_empty());

        let post = Post::new([("slug", "hello")]).unwrap();
        post.delete(&mut executor).await.unwrap();
        assert_eq!(
            executor.queries[0],
            (
                "DELETE FROM posts WHERE slug = ?".to_string(),
                Params::Positional(vec!["hello".into()])
            )
        );
        assert!(
            post.delete(&mut executor).await.is_err(),
            "Nothing was deleted the second time"
        );
    }

    #[tokio::test]
    async fn find() {
        let mut executor = Scripted::default()
            .rows(&["slug", "body"], vec![vec!["hello".into(), "world".into()]])
            .rows(
                &["slug", "body"],
                vec![
                    vec!["a".into(), "same".into()],
                    vec!["b".into(), "same".into()],
                ],
            );
        let post = Post::find(&mut executor, "hello")
            .await
            .unwrap()
            .expect("Expected the post");
        assert_eq!(post.get_as::<String>("body").unwrap(), "world");
        let posts = Post::find_by(&mut executor, &[("body", "same".into()), ("meta", Value::Null)])
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(
            executor.sql(),
            [
                "SELECT * FROM posts WHERE slug = ? LIMIT 1",
                "SELECT * FROM posts WHERE body = ? AND meta = ?",
            ]
        );
        assert_eq!(
            executor.queries[1].1,
            Params::Positional(vec!["same".into(), Value::Null])
        );
        let post = Post::find(&mut executor, "missing").await.unwrap();
        assert!(post.is_none());
    }
}
