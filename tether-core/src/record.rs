use crate::{
    AsValue, Executor, FieldKind, ModelDef, Primitive, Related, Result, RowLabeled,
    UnknownRelationError, Value,
};
use serde::{Serialize, Serializer, ser::Error as _};
use std::collections::BTreeMap;

/// Storage of one model instance: the primitive value of every declared field plus whatever
/// undeclared attributes were supplied.
#[derive(Debug, Clone)]
pub struct Record {
    def: &'static ModelDef,
    data: Box<[Primitive]>,
    unknown: BTreeMap<String, Value>,
}

/// Result of a dynamic attribute read.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Value(Value),
    Related(Related),
}

impl Record {
    /// Validate `def`, initialize every declared field to `NULL` and fill in `data`.
    pub fn new<K, V>(def: &'static ModelDef, data: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        def.validate()?;
        let mut result = Self {
            def,
            data: vec![None; def.fields.len()].into_boxed_slice(),
            unknown: Default::default(),
        };
        result.fill(data)?;
        Ok(result)
    }

    /// Hydrate a record from a result row.
    ///
    /// Cells of declared columns already hold stored values, so their text is kept as the
    /// primitive without coercion. Other columns become undeclared attributes.
    pub fn from_row(def: &'static ModelDef, row: RowLabeled) -> Result<Self> {
        let mut result = Self::empty(def)?;
        for (name, value) in row.into_pairs() {
            match def.field(&name) {
                Some((i, _)) => result.data[i] = stored_primitive(value),
                None => {
                    result.unknown.insert(name, value);
                }
            }
        }
        Ok(result)
    }

    /// A record with every declared field set to `NULL`.
    pub fn empty(def: &'static ModelDef) -> Result<Self> {
        Self::new(def, std::iter::empty::<(&str, Value)>())
    }

    pub fn definition(&self) -> &'static ModelDef {
        self.def
    }

    pub fn fill<K, V>(&mut self, data: impl IntoIterator<Item = (K, V)>) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in data {
            self.set(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Declared fields store the primitive form of `value`, anything else is kept verbatim.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let def = self.def;
        match def.field(name) {
            Some((i, field)) => self.data[i] = field.kind.to_primitive(&value)?,
            None => {
                self.unknown.insert(name.to_owned(), value);
            }
        }
        Ok(())
    }

    /// Refined value of a declared field, the verbatim value of an undeclared attribute or
    /// `NULL` when neither exists.
    pub fn get(&self, name: &str) -> Result<Value> {
        match self.def.field(name) {
            Some((i, field)) => field.kind.to_refined(self.data[i].as_deref()),
            None => Ok(self.unknown.get(name).cloned().unwrap_or_default()),
        }
    }

    pub fn get_as<T: AsValue>(&self, name: &str) -> Result<T> {
        T::try_from_value(self.get(name)?)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.def.field(name).is_some()
    }

    /// Whether `name` is a declared field, a supplied attribute or a declared relation.
    pub fn has(&self, name: &str) -> bool {
        self.has_field(name) || self.unknown.contains_key(name) || self.def.relation(name).is_some()
    }

    pub fn primitive(&self, name: &str) -> Option<&str> {
        self.def
            .field(name)
            .and_then(|(i, _)| self.data[i].as_deref())
    }

    /// Storage-ready value of every declared field, in declaration order.
    pub fn primitive_data(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> {
        self.def
            .fields
            .iter()
            .zip(&self.data)
            .map(|(field, value)| (field.name, value.as_deref()))
    }

    /// Refined value of every declared field, in declaration order.
    pub fn refined_data(&self) -> Result<Vec<(&'static str, Value)>> {
        self.def
            .fields
            .iter()
            .zip(&self.data)
            .map(|(field, value)| Ok((field.name, field.kind.to_refined(value.as_deref())?)))
            .collect()
    }

    pub fn unknown(&self) -> &BTreeMap<String, Value> {
        &self.unknown
    }

    /// Whether `value`, read from `name`, cannot identify a row.
    pub(crate) fn is_missing_key(&self, name: &str, value: &Value) -> bool {
        self.def
            .field(name)
            .map_or(value.is_null(), |(_, field)| match field.kind {
                FieldKind::String => value.is_null(),
                kind => kind.is_empty(value),
            })
    }

    /// Resolve the relation `name`. Every call issues a new query.
    pub async fn related<E: Executor>(&self, name: &str, executor: &mut E) -> Result<Related> {
        let Some(relation) = self.def.relation(name) else {
            return Err(UnknownRelationError {
                model: self.def.name,
                relation: name.into(),
            }
            .into());
        };
        relation.fetch(self, executor).await
    }

    /// Relation fetch when `name` is a declared relation, plain `get` otherwise.
    pub async fn attribute<E: Executor>(&self, name: &str, executor: &mut E) -> Result<Attribute> {
        if self.def.relation(name).is_some() {
            Ok(Attribute::Related(self.related(name, executor).await?))
        } else {
            Ok(Attribute::Value(self.get(name)?))
        }
    }
}

fn stored_primitive(value: Value) -> Primitive {
    match value {
        Value::Null => None,
        Value::Boolean(v) => Some(if v { "1" } else { "0" }.into()),
        Value::Varchar(v) => Some(v),
        v => Some(v.to_string()),
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.def, other.def) && self.data == other.data && self.unknown == other.unknown
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let data = self.refined_data().map_err(S::Error::custom)?;
        serializer.collect_map(data)
    }
}
