use crate::{Model, ModelDef, Record, Result, RowLabeled};

/// Conversion of raw result rows into model instances.
///
/// Rows are hydrated with [`Record::from_row`]: declared columns keep their stored text,
/// columns without a matching field end up as undeclared attributes.
pub trait Populator {
    /// Shape of the result, given the type of each instance.
    type Output<T>;

    fn populate_records(self, def: &'static ModelDef) -> Result<Self::Output<Record>>;

    fn populate<M: Model>(self) -> Result<Self::Output<M>>;
}

/// At most one row, populates into an optional instance.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct SingleRow(pub Option<RowLabeled>);

/// Any number of rows, populates into one instance per row in the same order.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RowSet(pub Vec<RowLabeled>);

impl Populator for SingleRow {
    type Output<T> = Option<T>;

    fn populate_records(self, def: &'static ModelDef) -> Result<Option<Record>> {
        self.0
            .map(|row| Record::from_row(def, row))
            .transpose()
    }

    fn populate<M: Model>(self) -> Result<Option<M>> {
        Ok(self.populate_records(M::definition())?.map(M::from_record))
    }
}

impl Populator for RowSet {
    type Output<T> = Vec<T>;

    fn populate_records(self, def: &'static ModelDef) -> Result<Vec<Record>> {
        self.0
            .into_iter()
            .map(|row| Record::from_row(def, row))
            .collect()
    }

    fn populate<M: Model>(self) -> Result<Vec<M>> {
        Ok(self
            .populate_records(M::definition())?
            .into_iter()
            .map(M::from_record)
            .collect())
    }
}

impl From<Option<RowLabeled>> for SingleRow {
    fn from(value: Option<RowLabeled>) -> Self {
        Self(value)
    }
}

impl From<Vec<RowLabeled>> for RowSet {
    fn from(value: Vec<RowLabeled>) -> Self {
        Self(value)
    }
}
