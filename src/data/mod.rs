/// Data layer: table types, loading, and column selection.
///
/// Architecture:
/// ```text
///  stations.csv (any of the configured separators / encodings)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  probe separator × encoding → DataTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ DataTable │  headers + rows of CellValue
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ columns   │  ColumnMapping "[lat,lon,legend,tooltip]" → StationPoint list
///   └──────────┘
/// ```

pub mod columns;
pub mod loader;
pub mod model;
