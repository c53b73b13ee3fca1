use serde_json::Value;

/// A single spreadsheet cell as handed over by the sheet reader
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    /// Spreadsheets hand dates over as serial day counts
    Number(f64),
    Empty,
}

impl CellValue {
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
            CellValue::Empty => true,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&Value> for CellValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(text) => CellValue::Text(text.clone()),
            Value::Number(number) => match number.as_f64() {
                Some(n) => CellValue::Number(n),
                None => CellValue::Empty,
            },
            Value::Bool(b) => CellValue::Text(b.to_string()),
            // Nested structures never map onto a single column
            Value::Null | Value::Array(_) | Value::Object(_) => CellValue::Empty,
        }
    }
}

/// Column name to cell mapping for one spreadsheet row, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<CellValue>) {
        self.cells.push((column.to_string(), value.into()));
    }

    /// First non-blank cell across `aliases`, tried in order. Headers match
    /// ignoring case and surrounding whitespace.
    pub fn resolve(&self, aliases: &[&str]) -> Option<&CellValue> {
        aliases.iter().find_map(|alias| {
            self.cells
                .iter()
                .find(|(header, value)| {
                    header.trim().eq_ignore_ascii_case(alias) && !value.is_blank()
                })
                .map(|(_, value)| value)
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Builds a row from a JSON object, anything else is an empty row
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => map
                .iter()
                .map(|(column, cell)| (column.clone(), CellValue::from(cell)))
                .collect(),
            _ => Row::new(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, CellValue)>>(iter: T) -> Self {
        Row {
            cells: iter
                .into_iter()
                .map(|(column, value)| (column.into(), value))
                .collect(),
        }
    }
}
