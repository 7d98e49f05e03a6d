use std::fmt::{self, Display, Formatter};

/// Name of a table, optionally qualified by a schema (database).
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub name: &'static str,
    pub schema: &'static str,
}

impl TableRef {
    pub const fn new(name: &'static str) -> Self {
        Self { name, schema: "" }
    }

    pub const fn with_schema(mut self, schema: &'static str) -> Self {
        self.schema = schema;
        self
    }

    pub fn full_name(&self) -> String {
        let mut result = String::new();
        if !self.schema.is_empty() {
            result.push_str(self.schema);
            result.push('.');
        }
        result.push_str(self.name);
        result
    }
}

impl Display for TableRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}
