use crate::{
    AsValue, ConfigurationError, Error, Executor, FieldDef, Params, Populator, Query, Record,
    Related, Relation, RelationDef, Result, RowSet, SingleRow, TableRef, Value, truncate_long,
};
use std::{future::Future, ptr};

/// Static description of a model type: its table, primary key, fields and relations.
#[derive(Debug)]
pub struct ModelDef {
    /// Name of the model type, used in error messages.
    pub name: &'static str,
    pub table: TableRef,
    pub primary_key: &'static str,
    pub fields: &'static [FieldDef],
    pub relations: &'static [RelationDef],
}

impl ModelDef {
    /// Position and declaration of the field `name`.
    pub fn field(&self, name: &str) -> Option<(usize, &'static FieldDef)> {
        let fields = self.fields;
        fields.iter().enumerate().find(|(_, v)| v.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&'static Relation> {
        let relations = self.relations;
        relations
            .iter()
            .find(|v| v.name == name)
            .map(|v| &v.relation)
    }

    /// Names must be unique across fields and relations.
    pub fn validate(&self) -> Result<()> {
        let error = |message: String| {
            Error::new(ConfigurationError {
                model: self.name,
                message,
            })
        };
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|v| v.name == field.name) {
                return Err(error(format!(
                    "field `{}` is declared more than once",
                    field.name
                )));
            }
        }
        for (i, relation) in self.relations.iter().enumerate() {
            if self.field(relation.name).is_some() {
                return Err(error(format!(
                    "cannot declare relation `{}`, a field with the same name already exists",
                    relation.name
                )));
            }
            if self.relations[..i].iter().any(|v| v.name == relation.name) {
                return Err(error(format!(
                    "relation `{}` is declared more than once",
                    relation.name
                )));
            }
        }
        Ok(())
    }
}

/// A typed model, a thin wrapper over a [`Record`] of its definition.
///
/// Implement it with the [`model!`](crate::model) macro.
pub trait Model: Sized + Send + Sync {
    fn definition() -> &'static ModelDef;

    /// Wrap a record, which must have been built from [`Model::definition`].
    fn from_record(record: Record) -> Self;

    fn record(&self) -> &Record;

    fn record_mut(&mut self) -> &mut Record;

    fn into_record(self) -> Record;

    fn new<K, V>(data: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        Record::new(Self::definition(), data).map(Self::from_record)
    }

    /// Instance with every field set to `NULL`.
    fn empty() -> Result<Self> {
        Record::empty(Self::definition()).map(Self::from_record)
    }

    /// Build instances out of `populator`.
    fn from_rows<P: Populator>(populator: P) -> Result<P::Output<Self>> {
        populator.populate::<Self>()
    }

    /// Wrap a record after checking that it belongs to this model.
    fn try_from_record(record: Record) -> Result<Self> {
        if !ptr::eq(record.definition(), Self::definition()) {
            return Err(Error::msg(format!(
                "Cannot convert a `{}` record into `{}`",
                record.definition().name,
                Self::definition().name
            )));
        }
        Ok(Self::from_record(record))
    }

    fn get(&self, name: &str) -> Result<Value> {
        self.record().get(name)
    }

    fn get_as<T: AsValue>(&self, name: &str) -> Result<T> {
        self.record().get_as(name)
    }

    fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.record_mut().set(name, value)
    }

    fn fill<K, V>(&mut self, data: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.record_mut().fill(data)
    }

    fn has_field(&self, name: &str) -> bool {
        self.record().has_field(name)
    }

    fn refined_data(&self) -> Result<Vec<(&'static str, Value)>> {
        self.record().refined_data()
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.record())?)
    }

    fn related<E: Executor>(
        &self,
        name: &str,
        executor: &mut E,
    ) -> impl Future<Output = Result<Related>> + Send {
        self.record().related(name, executor)
    }

    /// Resolve the has-one relation `name` into the typed model `M`.
    fn related_one<M: Model, E: Executor>(
        &self,
        name: &str,
        executor: &mut E,
    ) -> impl Future<Output = Result<Option<M>>> + Send {
        async move {
            check_target::<M>(self.record(), name)?;
            let related = self.related(name, executor).await?.into_one()?;
            Ok(related.map(M::from_record))
        }
    }

    /// Resolve the has-many relation `name` into instances of `M`.
    fn related_many<M: Model, E: Executor>(
        &self,
        name: &str,
        executor: &mut E,
    ) -> impl Future<Output = Result<Vec<M>>> + Send {
        async move {
            check_target::<M>(self.record(), name)?;
            let related = self.related(name, executor).await?.into_many()?;
            Ok(related.into_iter().map(M::from_record).collect())
        }
    }

    /// Row whose primary key equals `key`.
    fn find<E: Executor>(
        executor: &mut E,
        key: impl Into<Value>,
    ) -> impl Future<Output = Result<Option<Self>>> + Send {
        let def = Self::definition();
        let query = Query::select(def.table)
            .where_eq(&[def.primary_key])
            .limit(1);
        let params = Params::Positional(vec![key.into()]);
        async move {
            let row = executor.fetch_one(query.compile(), params).await?;
            SingleRow(row).populate::<Self>()
        }
    }

    /// Rows matching every `(column, value)` equality.
    fn find_by<E: Executor>(
        executor: &mut E,
        conditions: &[(&str, Value)],
    ) -> impl Future<Output = Result<Vec<Self>>> + Send {
        let columns = conditions.iter().map(|(k, _)| *k).collect::<Vec<_>>();
        let query = Query::select(Self::definition().table).where_eq(&columns);
        let params = Params::Positional(conditions.iter().map(|(_, v)| v.clone()).collect());
        async move {
            let rows = executor.fetch_all(query.compile(), params).await?;
            RowSet(rows).populate::<Self>()
        }
    }

    /// Insert the instance, or update every non key field when the primary key exists.
    ///
    /// A `NULL` primary key is assigned the identifier generated by the insert.
    fn save<E: Executor>(&mut self, executor: &mut E) -> impl Future<Output = Result<()>> + Send {
        let def = Self::definition();
        let columns = def.fields.iter().map(|v| v.name).collect::<Vec<_>>();
        let update = columns
            .iter()
            .copied()
            .filter(|v| *v != def.primary_key)
            .collect::<Vec<_>>();
        let query = Query::insert(def.table, &columns, &update);
        let params = Params::named(
            self.record()
                .primitive_data()
                .map(|(k, v)| (k, v.map(str::to_owned))),
        );
        async move {
            let result = executor.execute(query.compile(), params).await?;
            if self.get(def.primary_key)?.is_null() {
                match result
                    .last_affected_id
                    .or_else(|| executor.last_insert_id())
                {
                    Some(id) => self.set(def.primary_key, id)?,
                    None => log::warn!(
                        "Saved `{}` without receiving the generated {}",
                        def.name,
                        def.primary_key
                    ),
                }
            }
            Ok(())
        }
    }

    /// Delete the row identified by the primary key of the instance.
    fn delete<E: Executor>(&self, executor: &mut E) -> impl Future<Output = Result<()>> + Send {
        let def = Self::definition();
        let key = self.get(def.primary_key);
        async move {
            let key = key?;
            if key.is_null() {
                return Err(Error::msg(format!(
                    "Cannot delete a `{}` without a {}",
                    def.name, def.primary_key
                )));
            }
            let query = Query::delete(def.table).where_eq(&[def.primary_key]);
            let sql = query.compile();
            let result = executor
                .execute(sql.clone(), Params::Positional(vec![key]))
                .await?;
            if result.rows_affected != 1 {
                let error = Error::msg(format!(
                    "The query deleted {} rows instead of the expected 1",
                    result.rows_affected
                ));
                log::error!("{:#}\n{}", error, truncate_long!(sql));
                return Err(error);
            }
            Ok(())
        }
    }
}

fn check_target<M: Model>(record: &Record, name: &str) -> Result<()> {
    let def = record.definition();
    match def.relation(name) {
        Some(relation) if !ptr::eq(relation.related(), M::definition()) => {
            Err(Error::msg(format!(
                "Relation `{name}` of `{}` resolves to `{}`, not `{}`",
                def.name,
                relation.related().name,
                M::definition().name
            )))
        }
        _ => Ok(()),
    }
}

/// Declare a model type.
///
/// ```ignore
/// model! {
///     pub struct User in "users" {
///         id: Int,
///         name: String,
///         parentId: Int,
///         childOf: Int,
///     }
///     relations {
///         parent: HasOne(User, "parentId"),
///         children: HasMany("id", "users", "childOf", User),
///     }
/// }
/// ```
///
/// The primary key is `id` unless declared with `primary_key "column"` after the table name.
#[macro_export]
macro_rules! model {
    (@primary_key) => {
        "id"
    };
    (@primary_key $pk:literal) => {
        $pk
    };
    (@relation HasOne($related:ty, $foreign_key:literal)) => {
        $crate::Relation::has_one(<$related as $crate::Model>::definition, $foreign_key)
    };
    (@relation HasMany($local_key:literal, $table:literal, $foreign_key:literal, $related:ty)) => {
        $crate::Relation::has_many(
            $local_key,
            $table,
            $foreign_key,
            <$related as $crate::Model>::definition,
        )
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident in $table:literal $(primary_key $pk:literal)? {
            $($field:ident: $kind:ident),* $(,)?
        }
        $(relations {
            $($relation:ident: $rel_kind:ident($($args:tt)*)),* $(,)?
        })?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name($crate::Record);

        impl $crate::Model for $name {
            fn definition() -> &'static $crate::ModelDef {
                static DEFINITION: $crate::ModelDef = $crate::ModelDef {
                    name: stringify!($name),
                    table: $crate::TableRef::new($table),
                    primary_key: $crate::model!(@primary_key $($pk)?),
                    fields: &[$(
                        $crate::FieldDef::new(stringify!($field), $crate::FieldKind::$kind),
                    )*],
                    relations: &[$($(
                        $crate::RelationDef::new(
                            stringify!($relation),
                            $crate::model!(@relation $rel_kind($($args)*)),
                        ),
                    )*)?],
                };
                &DEFINITION
            }

            fn from_record(record: $crate::Record) -> Self {
                Self(record)
            }

            fn record(&self) -> &$crate::Record {
                &self.0
            }

            fn record_mut(&mut self) -> &mut $crate::Record {
                &mut self.0
            }

            fn into_record(self) -> $crate::Record {
                self.0
            }
        }
    };
}
