use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use super::model::{CellValue, DataTable};
use crate::error::{MapError, Result};

// ---------------------------------------------------------------------------
// Read options
// ---------------------------------------------------------------------------

/// Text encodings tried when decoding a CSV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    Utf8,
    /// ISO-8859-1 / Latin-1. Every byte sequence is valid.
    Latin1,
}

impl Encoding {
    pub fn label(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Latin1 => "iso-8859-1",
        }
    }

    /// Decode raw file bytes. A UTF-8 byte order mark is dropped.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                encoding_rs::UTF_8
                    .decode_without_bom_handling_and_without_replacement(bytes)
                    .map(Cow::into_owned)
                    .ok_or_else(|| MapError::decode(self.label(), "malformed byte sequence"))
            }
            // Not WINDOWS_1252: bytes 0x80-0x9F stay C1 controls.
            Encoding::Latin1 => Ok(encoding_rs::mem::decode_latin1(bytes).into_owned()),
        }
    }
}

impl FromStr for Encoding {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Ok(Encoding::Latin1),
            _ => Err(MapError::UnknownEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = MapError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Encoding> for String {
    fn from(value: Encoding) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the first row of a file is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// First row holds the column names.
    #[default]
    Infer,
    /// No header row: columns are named by their position.
    None,
}

/// One complete read configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    pub separator: char,
    pub encoding: Encoding,
    pub header: HeaderMode,
}

impl fmt::Display for CsvOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Separator: '{}' - Encoding: {} - Header: {:?}",
            self.separator, self.encoding, self.header
        )
    }
}

// ---------------------------------------------------------------------------
// Single-configuration read
// ---------------------------------------------------------------------------

/// Load a CSV file using exactly one configuration.
pub fn load_csv_with(path: &Path, options: &CsvOptions) -> Result<DataTable> {
    let bytes = std::fs::read(path)?;
    parse_bytes(path, &bytes, options)
}

fn parse_bytes(path: &Path, bytes: &[u8], options: &CsvOptions) -> Result<DataTable> {
    let text = options.encoding.decode(bytes)?;
    if text.trim().is_empty() {
        return Err(MapError::EmptyFile(path.to_path_buf()));
    }
    parse_text(&text, options)
}

fn parse_text(text: &str, options: &CsvOptions) -> Result<DataTable> {
    let separator = u8::try_from(options.separator)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(MapError::InvalidSeparator(options.separator))?;

    // Short rows are padded, long rows are an error: that is what tells a
    // wrong separator apart from a right one.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader
        .records()
        .filter(|record| !matches!(record, Ok(r) if is_blank(r)));

    let first = match records.next() {
        Some(record) => record?,
        None => return Ok(DataTable::default()),
    };
    let width = first.len();

    let mut rows = Vec::new();
    let headers = match options.header {
        HeaderMode::Infer => first.iter().map(|h| h.trim().to_string()).collect(),
        HeaderMode::None => {
            rows.push(first.iter().map(CellValue::guess).collect());
            (0..width).map(|i| i.to_string()).collect()
        }
    };

    for record in records {
        let record = record?;
        if record.len() > width {
            return Err(MapError::TooManyFields {
                line: record.position().map_or(0, |p| p.line()),
                expected: width,
                found: record.len(),
            });
        }
        let mut row: Vec<CellValue> = record.iter().map(CellValue::guess).collect();
        row.resize(width, CellValue::Null);
        rows.push(row);
    }

    Ok(DataTable::new(headers, rows))
}

/// Empty and whitespace-only lines carry no data.
fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

// ---------------------------------------------------------------------------
// FileReader – resolves names against the data directory and probes formats
// ---------------------------------------------------------------------------

/// The table together with the configuration that produced it.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: DataTable,
    pub options: CsvOptions,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FileReader {
    data_dir: PathBuf,
    separators: Vec<char>,
    encodings: Vec<Encoding>,
    header: HeaderMode,
}

impl FileReader {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        separators: Vec<char>,
        encodings: Vec<Encoding>,
        header: HeaderMode,
    ) -> Self {
        FileReader {
            data_dir: data_dir.into(),
            separators,
            encodings,
            header,
        }
    }

    pub fn resolve(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }

    /// The first configured separator and encoding, with the configured header mode.
    pub fn default_options(&self) -> CsvOptions {
        CsvOptions {
            separator: self.separators.first().copied().unwrap_or(','),
            encoding: self.encodings.first().copied().unwrap_or(Encoding::Utf8),
            header: self.header,
        }
    }

    /// Read a file using a configuration given by the user.
    pub fn load_csv_using_conf(
        &self,
        file_name: &str,
        options: &CsvOptions,
    ) -> Result<LoadedTable> {
        let path = self.resolve(file_name);
        info!("Reading file: '{}'", path.display());

        match load_csv_with(&path, options) {
            Ok(table) => {
                info!(
                    "File successfully loaded ({} rows, {} columns).",
                    table.len(),
                    table.width()
                );
                Ok(LoadedTable {
                    table,
                    options: *options,
                    path,
                })
            }
            Err(e) => {
                error!("Error while reading csv file using the following parameters: '{e}'");
                error!("    {options}");
                Err(e)
            }
        }
    }

    /// Read a file by trying every separator/encoding combination.
    ///
    /// * a decode error moves on to the next encoding
    /// * a parse error moves on to the next separator
    /// * a single-column result is kept only as a fallback, since a wrong
    ///   separator usually parses as one wide column
    pub fn load_csv_file(&self, file_name: &str) -> Result<LoadedTable> {
        let path = self.resolve(file_name);
        let bytes = std::fs::read(&path)?;

        let mut fallback: Option<LoadedTable> = None;

        for &separator in &self.separators {
            for &encoding in &self.encodings {
                let options = CsvOptions {
                    separator,
                    encoding,
                    header: self.header,
                };
                info!("Reading file: '{}'", path.display());
                info!("    Using file separator: '{separator}'");
                info!("    Using file encoding: '{encoding}'");

                match parse_bytes(&path, &bytes, &options) {
                    Ok(table) if table.width() > 1 => {
                        info!(
                            "File successfully loaded ({} rows, {} columns).",
                            table.len(),
                            table.width()
                        );
                        return Ok(LoadedTable { table, options, path });
                    }
                    Ok(table) => {
                        debug!("    Only one column found, trying the next separator.");
                        if fallback.is_none() {
                            fallback = Some(LoadedTable {
                                table,
                                options,
                                path: path.clone(),
                            });
                        }
                        break;
                    }
                    Err(e) if e.is_encoding_error() => {
                        error!("    Decode error while reading: '{e}'");
                        error!("    Bad encoding: '{encoding}'");
                        continue;
                    }
                    Err(e) if e.is_parse_error() => {
                        error!("    Parse error while reading: '{e}'");
                        error!("    Bad separator: '{separator}'");
                        break;
                    }
                    Err(e) => {
                        error!("    Unhandled error while reading the file: '{e}'");
                        return Err(e);
                    }
                }
            }
        }

        match fallback {
            Some(loaded) => {
                info!("File loaded as a single column using {}", loaded.options);
                Ok(loaded)
            }
            None => Err(MapError::NoUsableConfiguration(path)),
        }
    }
}

impl fmt::Display for FileReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path: {}", self.data_dir.display())
    }
}
