use std::fmt;

use crate::error::{MapError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the loaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed CSV cell, guessed from its text.
/// Unique values feed a `BTreeMap`-backed colour map, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn rank(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Guess the type of a raw CSV field.
    pub fn guess(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return CellValue::Float(f);
        }
        match s {
            "true" | "True" | "TRUE" => CellValue::Bool(true),
            "false" | "False" | "FALSE" => CellValue::Bool(false),
            _ => CellValue::String(s.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Interpret the cell as a coordinate. Text with a decimal comma
    /// (`"40,4167"`) is accepted as well.
    pub fn as_coordinate(&self) -> Option<f64> {
        match self {
            CellValue::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
            other => other.as_f64(),
        }
        .filter(|v| v.is_finite())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// StationPoint – one located row
// ---------------------------------------------------------------------------

/// A row reduced to what a map needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StationPoint {
    /// Zero-based data row the point was read from.
    pub row: usize,
    pub lat: f64,
    pub lon: f64,
    /// Popup text (raw, not escaped).
    pub legend: Option<String>,
    /// Tooltip text (raw, not escaped).
    pub tooltip: Option<String>,
    /// Legend cell kept typed for colour mapping.
    pub legend_value: Option<CellValue>,
}

impl StationPoint {
    pub fn location(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }
}

// ---------------------------------------------------------------------------
// DataTable – the complete loaded file
// ---------------------------------------------------------------------------

/// A rectangular table: every row has `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        DataTable { headers, rows }
    }

    /// Number of rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn check_column(&self, index: usize) -> Result<()> {
        if index < self.width() {
            Ok(())
        } else {
            Err(MapError::ColumnOutOfRange {
                index,
                width: self.width(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_cell_types() {
        assert_eq!(CellValue::guess(""), CellValue::Null);
        assert_eq!(CellValue::guess(" 28079004 "), CellValue::Integer(28079004));
        assert_eq!(CellValue::guess("40.4238"), CellValue::Float(40.4238));
        assert_eq!(CellValue::guess("True"), CellValue::Bool(true));
        assert_eq!(
            CellValue::guess("Pza. de España"),
            CellValue::String("Pza. de España".to_string())
        );
    }

    #[test]
    fn test_coordinate_accepts_decimal_comma() {
        assert_eq!(CellValue::guess("40,4238").as_coordinate(), Some(40.4238));
        assert_eq!(CellValue::Integer(3).as_coordinate(), Some(3.0));
        assert_eq!(CellValue::guess("n/a").as_coordinate(), None);
        assert_eq!(CellValue::Null.as_coordinate(), None);
        assert_eq!(CellValue::Float(f64::NAN).as_coordinate(), None);
    }

    #[test]
    fn test_mixed_values_order_by_kind() {
        let mut values = vec![
            CellValue::String("b".into()),
            CellValue::Integer(2),
            CellValue::Null,
            CellValue::Float(0.5),
        ];
        values.sort();
        assert_eq!(values[0], CellValue::Null);
        assert_eq!(values[1], CellValue::Integer(2));
        assert_eq!(values[3], CellValue::String("b".into()));
    }

    #[test]
    fn test_column_bounds() {
        let table = DataTable::new(
            vec!["id".into(), "name".into()],
            vec![
                vec![CellValue::Integer(1), CellValue::String("a".into())],
                vec![CellValue::Integer(2), CellValue::String("a".into())],
            ],
        );
        assert_eq!(table.width(), 2);
        assert_eq!(table.len(), 2);
        assert!(table.check_column(1).is_ok());
        assert!(matches!(
            table.check_column(2),
            Err(MapError::ColumnOutOfRange { index: 2, width: 2 })
        ));
    }
}
