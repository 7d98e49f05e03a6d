use crate::{
    Error, Executor, ModelDef, Params, Populator, Query, Record, Result, RowSet, SingleRow,
};

/// Descriptor producing the definition of the related model.
pub type DefinitionFn = fn() -> &'static ModelDef;

/// Declarative link from one model to another.
#[derive(Debug, Clone, Copy)]
pub enum Relation {
    /// `foreign_key` is a field of the owner holding the primary key of one related row.
    HasOne {
        related: DefinitionFn,
        foreign_key: &'static str,
    },
    /// Rows of `table` whose `foreign_key` column equals the owner's `local_key` field.
    HasMany {
        local_key: &'static str,
        table: &'static str,
        foreign_key: &'static str,
        related: DefinitionFn,
    },
}

impl Relation {
    pub const fn has_one(related: DefinitionFn, foreign_key: &'static str) -> Self {
        Relation::HasOne {
            related,
            foreign_key,
        }
    }

    pub const fn has_many(
        local_key: &'static str,
        table: &'static str,
        foreign_key: &'static str,
        related: DefinitionFn,
    ) -> Self {
        Relation::HasMany {
            local_key,
            table,
            foreign_key,
            related,
        }
    }

    /// Definition of the model this relation resolves to.
    pub fn related(&self) -> &'static ModelDef {
        match self {
            Relation::HasOne { related, .. } | Relation::HasMany { related, .. } => related(),
        }
    }

    /// Run the query resolving this relation for `owner`.
    ///
    /// An owner that cannot identify any row (empty foreign key for has-one, null local key
    /// for has-many) resolves without querying.
    pub async fn fetch<E: Executor>(&self, owner: &Record, executor: &mut E) -> Result<Related> {
        match *self {
            Relation::HasOne {
                related,
                foreign_key,
            } => {
                let def = related();
                let key = owner.get(foreign_key)?;
                if owner.is_missing_key(foreign_key, &key) {
                    return Ok(Related::One(None));
                }
                let query = Query::select(def.table)
                    .where_eq(&[def.primary_key])
                    .limit(1);
                let row = executor
                    .fetch_one(query.compile(), Params::Positional(vec![key.clone()]))
                    .await?;
                let result = SingleRow(row).populate_records(def)?;
                if result.is_none() {
                    log::warn!(
                        "`{}` references `{}` with {} = {key} but no such row exists",
                        owner.definition().name,
                        def.name,
                        def.primary_key,
                    );
                }
                Ok(Related::One(result))
            }
            Relation::HasMany {
                local_key,
                table,
                foreign_key,
                related,
            } => {
                let key = owner.get(local_key)?;
                if key.is_null() {
                    return Ok(Related::Many(Vec::new()));
                }
                let query = Query::select(table).where_eq(&[foreign_key]);
                let rows = executor
                    .fetch_all(query.compile(), Params::Positional(vec![key]))
                    .await?;
                Ok(Related::Many(RowSet(rows).populate_records(related())?))
            }
        }
    }
}

/// Named relation as declared on a model.
#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
    pub name: &'static str,
    pub relation: Relation,
}

impl RelationDef {
    pub const fn new(name: &'static str, relation: Relation) -> Self {
        Self { name, relation }
    }
}

/// Outcome of resolving a relation.
#[derive(Debug, Clone, PartialEq)]
pub enum Related {
    One(Option<Record>),
    Many(Vec<Record>),
}

impl Related {
    pub fn into_one(self) -> Result<Option<Record>> {
        match self {
            Related::One(v) => Ok(v),
            Related::Many(..) => Err(Error::msg("Expected a has-one relation, found has-many")),
        }
    }

    pub fn into_many(self) -> Result<Vec<Record>> {
        match self {
            Related::Many(v) => Ok(v),
            Related::One(..) => Err(Error::msg("Expected a has-many relation, found has-one")),
        }
    }
}
