//! Tabular data for WDDX recordsets.
//!
//! A [`Table`] is a list of named fields and a list of rows; every row has one cell per
//! field. On the wire a recordset is column-major (one `field` element per column), so
//! encoding walks the table column by column and decoding zips the decoded columns back
//! into rows.
//!
//! Each field remembers the kind of its first cell. The kind is informational: later
//! cells of the same field are not required to match it.
//!
//! A [`TableSet`] groups several tables the way a data set does. It encodes as a bare
//! recordset when it holds one table and as a struct of recordsets keyed by table name
//! when it holds more; an empty set cannot be encoded.
//!
//! ## Examples
//!
//! ```rust
//! use serde_wddx::{Table, Value};
//!
//! let table = Table::from_columns([
//!     ("id", vec![Value::from(1), Value::from(2)]),
//!     ("name", vec![Value::from("a"), Value::from("b")]),
//! ])
//! .unwrap();
//!
//! assert_eq!(table.row_count(), 2);
//! assert_eq!(table.get(1, "name"), Some(&Value::from("b")));
//! ```

use crate::value::{ValueKind, RECORDSET_TOKEN, TABLESET_TOKEN};
use crate::{Error, Result, Value, WddxMap};
use serde::ser::{Error as _, SerializeMap, SerializeSeq, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A named column of a [`Table`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: Option<ValueKind>,
}

impl Field {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of the first cell in this column, if the table has rows.
    #[must_use]
    pub const fn kind(&self) -> Option<ValueKind> {
        self.kind
    }
}

/// A recordset: named fields and rows of cells.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Table {
    name: Option<String>,
    fields: Vec<Field>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Creates an empty table with no fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table with the given field names.
    ///
    /// # Errors
    ///
    /// Returns an error if a field name appears twice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_wddx::{Table, Value};
    ///
    /// let mut table = Table::with_fields(["id", "ParentItem"]).unwrap();
    /// table.push_row(vec![Value::from(0), Value::Null]).unwrap();
    /// assert_eq!(table.row_count(), 1);
    ///
    /// assert!(Table::with_fields(["id", "id"]).is_err());
    /// ```
    pub fn with_fields<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new();
        for name in names {
            table.add_field(name.into())?;
        }
        Ok(table)
    }

    /// Builds a table from `(field name, cells)` columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the columns differ in length or a field name appears twice.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut names = Vec::new();
        let mut cells = Vec::new();
        for (name, column) in columns {
            names.push(name.into());
            cells.push(column);
        }

        let row_count = cells.first().map_or(0, Vec::len);
        if let Some((name, column)) = names
            .iter()
            .zip(&cells)
            .find(|(_, column)| column.len() != row_count)
        {
            return Err(Error::type_mismatch(
                &format!("{} cells in every field", row_count),
                &format!("{} cells in field {:?}", column.len(), name),
            ));
        }

        let mut table = Table::new();
        for name in names {
            table.add_field(name)?;
        }
        table.fill_from_columns(cells, row_count);
        Ok(table)
    }

    /// Sets the table name, used as the member name inside a multi-table [`TableSet`].
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Appends a row.
    ///
    /// The first row fixes the recorded kind of every field.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not have exactly one cell per field.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.fields.len() {
            return Err(Error::type_mismatch(
                &format!("a row of {} cells", self.fields.len()),
                &format!("a row of {} cells", row.len()),
            ));
        }
        if self.rows.is_empty() {
            for (field, cell) in self.fields.iter_mut().zip(&row) {
                field.kind = Some(cell.kind());
            }
        }
        self.rows.push(row);
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }

    /// Returns the recorded kind of the named field.
    #[must_use]
    pub fn field_kind(&self, name: &str) -> Option<ValueKind> {
        self.field_index(name).and_then(|i| self.fields[i].kind)
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Returns the cell at `row` in the named field.
    #[must_use]
    pub fn get(&self, row: usize, field: &str) -> Option<&Value> {
        let index = self.field_index(field)?;
        self.rows.get(row).and_then(|cells| cells.get(index))
    }

    /// Returns the cells of the named field in row order.
    pub fn column<'a>(&'a self, field: &str) -> Option<impl Iterator<Item = &'a Value> + 'a> {
        let index = self.field_index(field)?;
        Some(self.rows.iter().filter_map(move |row| row.get(index)))
    }

    /// Converts every row into a struct keyed by field name.
    #[must_use]
    pub fn into_row_structs(self) -> Vec<Value> {
        let names: Vec<String> = self.fields.into_iter().map(|f| f.name).collect();
        self.rows
            .into_iter()
            .map(|row| Value::Struct(names.iter().cloned().zip(row).collect()))
            .collect()
    }

    fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    fn add_field(&mut self, name: String) -> Result<()> {
        if self.field_index(&name).is_some() {
            return Err(Error::type_mismatch(
                "unique field names",
                &format!("duplicate field {:?}", name),
            ));
        }
        self.fields.push(Field { name, kind: None });
        Ok(())
    }

    /// Zips equally long columns into rows. Callers check the lengths.
    fn fill_from_columns(&mut self, columns: Vec<Vec<Value>>, row_count: usize) {
        for (field, column) in self.fields.iter_mut().zip(&columns) {
            field.kind = column.first().map(Value::kind);
        }
        let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
        self.rows = (0..row_count)
            .map(|_| iters.iter_mut().filter_map(Iterator::next).collect())
            .collect();
    }

    /// Assembles a decoded recordset. Each column carries the kind of its first cell.
    pub(crate) fn from_decoded(
        columns: Vec<(String, Option<ValueKind>, Vec<Value>)>,
        row_count: usize,
    ) -> Self {
        let mut fields = Vec::with_capacity(columns.len());
        let mut iters = Vec::with_capacity(columns.len());
        for (name, kind, cells) in columns {
            fields.push(Field { name, kind });
            iters.push(cells.into_iter());
        }
        let rows = (0..row_count)
            .map(|_| iters.iter_mut().filter_map(Iterator::next).collect())
            .collect();
        Table {
            name: None,
            fields,
            rows,
        }
    }

    /// The serde-facing shape: `{ "name": string|null, "columns": { field: [cells] } }`.
    pub(crate) fn into_repr(self) -> Value {
        let mut columns: Vec<Vec<Value>> = self
            .fields
            .iter()
            .map(|_| Vec::with_capacity(self.rows.len()))
            .collect();
        for row in self.rows {
            for (column, cell) in columns.iter_mut().zip(row) {
                column.push(cell);
            }
        }

        let mut repr = WddxMap::new();
        repr.insert(
            "name".to_string(),
            self.name.map_or(Value::Null, Value::Text),
        );
        repr.insert(
            "columns".to_string(),
            Value::Struct(
                self.fields
                    .into_iter()
                    .map(|f| f.name)
                    .zip(columns.into_iter().map(Value::Array))
                    .collect(),
            ),
        );
        Value::Struct(repr)
    }

    pub(crate) fn from_repr(repr: Value) -> Result<Self> {
        let mismatch = |found: &str| Error::type_mismatch("a recordset", found);
        let mut members = match repr {
            Value::Struct(members) => members,
            other => return Err(mismatch(other.kind().as_str())),
        };

        let name = match members.remove("name") {
            Some(Value::Text(name)) => Some(name),
            Some(Value::Null) | None => None,
            Some(other) => return Err(mismatch(&format!("a {} table name", other.kind()))),
        };
        let columns = match members.remove("columns") {
            Some(Value::Struct(columns)) => columns,
            Some(other) => return Err(mismatch(&format!("{} columns", other.kind()))),
            None => WddxMap::new(),
        };

        let columns = columns
            .into_iter()
            .map(|(field, cells)| match cells {
                Value::Array(cells) => Ok((field, cells)),
                other => Err(mismatch(&format!("a {} column {:?}", other.kind(), field))),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut table = Table::from_columns(columns)?;
        table.name = name;
        Ok(table)
    }
}

impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(RECORDSET_TOKEN, &TableRepr(self))
    }
}

impl<'de> Deserialize<'de> for Table {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Table(table) => Ok(table),
            other => Table::from_repr(other).map_err(serde::de::Error::custom),
        }
    }
}

struct TableRepr<'a>(&'a Table);

impl Serialize for TableRepr<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Table", 2)?;
        state.serialize_field("name", &self.0.name)?;
        state.serialize_field("columns", &Columns(self.0))?;
        state.end()
    }
}

struct Columns<'a>(&'a Table);

impl Serialize for Columns<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.0.fields.len()))?;
        for (index, field) in self.0.fields.iter().enumerate() {
            state.serialize_entry(
                &field.name,
                &Column {
                    table: self.0,
                    index,
                },
            )?;
        }
        state.end()
    }
}

struct Column<'a> {
    table: &'a Table,
    index: usize,
}

impl Serialize for Column<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_seq(Some(self.table.rows.len()))?;
        for row in &self.table.rows {
            state.serialize_element(&row[self.index])?;
        }
        state.end()
    }
}

/// A group of tables, encoded as one recordset or as a struct of recordsets.
///
/// # Examples
///
/// ```rust
/// use serde_wddx::{to_value, Table, TableSet, Value};
///
/// let orders = Table::from_columns([("id", vec![Value::from(1)])]).unwrap().with_name("orders");
/// let items = Table::from_columns([("sku", vec![Value::from("x")])]).unwrap().with_name("items");
///
/// let single = to_value(&TableSet::from(vec![orders.clone()])).unwrap();
/// assert!(single.is_table());
///
/// let both = to_value(&TableSet::from(vec![orders, items])).unwrap();
/// let members = both.as_struct().unwrap();
/// assert!(members.get("orders").unwrap().is_table());
///
/// assert!(to_value(&TableSet::new()).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TableSet {
    tables: Vec<Table>,
}

impl TableSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: Table) {
        self.tables.push(table);
    }

    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl From<Vec<Table>> for TableSet {
    fn from(tables: Vec<Table>) -> Self {
        TableSet { tables }
    }
}

impl FromIterator<Table> for TableSet {
    fn from_iter<T: IntoIterator<Item = Table>>(iter: T) -> Self {
        TableSet {
            tables: iter.into_iter().collect(),
        }
    }
}

impl Serialize for TableSet {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_newtype_struct(TABLESET_TOKEN, &NamedTables(&self.tables))
    }
}

struct NamedTables<'a>(&'a [Table]);

impl Serialize for NamedTables<'_> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seen = Vec::with_capacity(self.0.len());
        let mut state = serializer.serialize_map(Some(self.0.len()))?;
        for (i, table) in self.0.iter().enumerate() {
            let name = table
                .name()
                .map_or_else(|| format!("Table{}", i + 1), str::to_string);
            if seen.contains(&name) {
                return Err(S::Error::custom(format!("duplicate table name {:?}", name)));
            }
            state.serialize_entry(&name, table)?;
            seen.push(name);
        }
        state.end()
    }
}
