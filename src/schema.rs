//! Column schemas for tab-separated `#db` streams
//!
//! A schema is an ordered mapping from column name to `(index, datatype)`,
//! where the index is the 0-based field position in the stream. On the wire
//! it is a single header line: `#db\tname:type\tname:type...`.

use indexmap::IndexMap;
use thiserror::Error;

/// Datatype of a single column.
///
/// `int` and `real` drive arithmetic promotion during typing; everything
/// else is a string. awk itself is untyped, so these only matter at
/// translation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Real,
    Str,
}

impl DataType {
    /// Arithmetic promotion: real wins, otherwise int.
    pub fn promote(self, other: DataType) -> DataType {
        if self == DataType::Real || other == DataType::Real {
            DataType::Real
        } else {
            DataType::Int
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DataType::Int => "int",
            DataType::Real => "real",
            DataType::Str => "str",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for DataType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(DataType::Int),
            "real" => Ok(DataType::Real),
            "str" => Ok(DataType::Str),
            other => Err(SchemaError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("missing or malformed #db header")]
    MalformedHeader,

    #[error("malformed column declaration: {0:?}")]
    MalformedColumn(String),

    #[error("unknown datatype: {0:?}")]
    UnknownType(String),

    #[error("duplicate column: {0:?}")]
    DuplicateColumn(String),
}

/// Ordered column map. Insertion order is the field order on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    columns: IndexMap<String, DataType>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, assigning it the next field index.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        datatype: DataType,
    ) -> Result<usize, SchemaError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(SchemaError::DuplicateColumn(name));
        }
        let index = self.columns.len();
        self.columns.insert(name, datatype);
        Ok(index)
    }

    /// Look up a column's `(index, datatype)`.
    pub fn get(&self, name: &str) -> Option<(usize, DataType)> {
        self.columns
            .get_full(name)
            .map(|(index, _, datatype)| (index, *datatype))
    }

    /// Columns in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, DataType)> {
        self.columns.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Parse a `#db\tname:type\t...` header line. The trailing newline, if
    /// any, is ignored.
    pub fn parse_header(line: &str) -> Result<Schema, SchemaError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.split('\t');
        if fields.next() != Some("#db") {
            return Err(SchemaError::MalformedHeader);
        }

        let mut schema = Schema::new();
        for field in fields {
            let (name, datatype) = field
                .split_once(':')
                .ok_or_else(|| SchemaError::MalformedColumn(field.to_string()))?;
            if name.is_empty() {
                return Err(SchemaError::MalformedColumn(field.to_string()));
            }
            schema.push(name, datatype.parse()?)?;
        }
        Ok(schema)
    }

    /// Render the `#db` header line for this schema (no trailing newline).
    pub fn header_line(&self) -> String {
        let mut line = String::from("#db");
        for (name, datatype) in self.iter() {
            line.push('\t');
            line.push_str(name);
            line.push(':');
            line.push_str(&datatype.to_string());
        }
        line
    }
}
