use std::fmt;

use log::{debug, warn};

use super::model::{DataTable, StationPoint};
use crate::error::{MapError, Result};

/// Zero-based column offsets used to build a map.
///
/// Parsed from user input such as `[3,5,6,7]`, whose entries are assigned in
/// order to latitude, longitude, legend and tooltip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub latitude: usize,
    pub longitude: usize,
    pub legend: Option<usize>,
    pub tooltip: Option<usize>,
}

impl ColumnMapping {
    pub fn new(latitude: usize, longitude: usize) -> Self {
        ColumnMapping {
            latitude,
            longitude,
            legend: None,
            tooltip: None,
        }
    }

    /// Parse a column list like `"[25, 24, 1]"`. Entries past the fourth are ignored.
    pub fn parse(spec: &str) -> Result<Self> {
        debug!("Parsing columns list: {spec}");
        let cleaned: String = spec
            .chars()
            .filter(|c| !matches!(c, '[' | ']') && !c.is_whitespace())
            .collect();

        let indices = cleaned
            .split(',')
            .filter(|tok| !tok.is_empty())
            .take(4)
            .map(|tok| {
                tok.parse::<usize>().map_err(|_| {
                    MapError::InvalidColumnSpec(format!("{spec} ('{tok}' is not a column index)"))
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        if indices.len() < 2 {
            return Err(MapError::InvalidColumnSpec(format!(
                "{spec} (latitude and longitude columns are required)"
            )));
        }

        let mapping = ColumnMapping {
            latitude: indices[0],
            longitude: indices[1],
            legend: indices.get(2).copied(),
            tooltip: indices.get(3).copied(),
        };
        debug!("Successfully parsed: {mapping}");
        Ok(mapping)
    }

    /// Every mapped index must be a valid offset into a table of `width` columns.
    pub fn validate(&self, width: usize) -> Result<()> {
        for index in self.indices() {
            if index >= width {
                return Err(MapError::ColumnOutOfRange { index, width });
            }
        }
        Ok(())
    }

    fn indices(&self) -> impl Iterator<Item = usize> {
        [Some(self.latitude), Some(self.longitude), self.legend, self.tooltip]
            .into_iter()
            .flatten()
    }
}

impl fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lat={} lon={}", self.latitude, self.longitude)?;
        if let Some(legend) = self.legend {
            write!(f, " legend={legend}")?;
        }
        if let Some(tooltip) = self.tooltip {
            write!(f, " tooltip={tooltip}")?;
        }
        Ok(())
    }
}

impl DataTable {
    /// Extract one point per row. Rows whose coordinates are missing, not
    /// numeric or out of range are logged and skipped.
    pub fn station_points(&self, mapping: &ColumnMapping) -> Result<Vec<StationPoint>> {
        mapping.validate(self.width())?;

        let mut points = Vec::with_capacity(self.len());
        for (row_no, row) in self.rows.iter().enumerate() {
            let lat = row[mapping.latitude].as_coordinate();
            let lon = row[mapping.longitude].as_coordinate();

            let (lat, lon) = match (lat, lon) {
                (Some(lat), Some(lon))
                    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) =>
                {
                    (lat, lon)
                }
                _ => {
                    warn!(
                        "Row {row_no}: location ({}, {}) is not a valid (lat, lon). Row skipped.",
                        row[mapping.latitude], row[mapping.longitude]
                    );
                    continue;
                }
            };

            let text = |idx: Option<usize>| {
                idx.map(|i| &row[i])
                    .filter(|cell| !cell.is_null())
                    .map(|cell| cell.to_string())
            };

            points.push(StationPoint {
                row: row_no,
                lat,
                lon,
                legend: text(mapping.legend),
                tooltip: text(mapping.tooltip),
                legend_value: mapping.legend.map(|i| row[i].clone()),
            });
        }

        debug!("Extracted {} of {} rows using {mapping}", points.len(), self.len());
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;
    use pretty_assertions::assert_eq;

    fn table() -> DataTable {
        let row = |name: &str, lat: &str, lon: &str| {
            vec![
                CellValue::guess(name),
                CellValue::guess(lat),
                CellValue::guess(lon),
            ]
        };
        DataTable::new(
            vec!["name".into(), "lat".into(), "lon".into()],
            vec![
                row("Retiro", "40.4144", "-3.6824"),
                row("Broken", "abc", "-3.70"),
                row("Comma", "40,4500", "-3,6900"),
                row("Outside", "140.0", "-3.70"),
                row("", "40.40", "-3.71"),
            ],
        )
    }

    #[test]
    fn test_parse_full_spec() {
        let mapping = ColumnMapping::parse("[3, 5,6 ,7]").unwrap();
        assert_eq!(
            mapping,
            ColumnMapping {
                latitude: 3,
                longitude: 5,
                legend: Some(6),
                tooltip: Some(7),
            }
        );
    }

    #[test]
    fn test_parse_partial_and_unbracketed() {
        assert_eq!(ColumnMapping::parse("25,24").unwrap(), ColumnMapping::new(25, 24));

        let mapping = ColumnMapping::parse("[1,2,0,4,9]").unwrap();
        assert_eq!(mapping.legend, Some(0));
        assert_eq!(mapping.tooltip, Some(4));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            ColumnMapping::parse("[1,x]"),
            Err(MapError::InvalidColumnSpec(_))
        ));
        assert!(matches!(
            ColumnMapping::parse("[4]"),
            Err(MapError::InvalidColumnSpec(_))
        ));
        assert!(ColumnMapping::parse("[-1,2]").is_err());
        assert!(ColumnMapping::parse("").is_err());
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mapping = ColumnMapping {
            latitude: 1,
            longitude: 2,
            legend: Some(0),
            tooltip: Some(3),
        };
        assert!(matches!(
            table().station_points(&mapping),
            Err(MapError::ColumnOutOfRange { index: 3, width: 3 })
        ));
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let mapping = ColumnMapping {
            latitude: 1,
            longitude: 2,
            legend: Some(0),
            tooltip: None,
        };
        let points = table().station_points(&mapping).unwrap();

        let names: Vec<Option<&str>> = points.iter().map(|p| p.legend.as_deref()).collect();
        assert_eq!(names, vec![Some("Retiro"), Some("Comma"), None]);
        assert_eq!(points[1].location(), (40.45, -3.69));
        assert_eq!(points[2].legend_value, Some(CellValue::Null));
    }
}
