//! Delimited source reader with encoding and delimiter auto-detection.
//!
//! Two shapes are read here:
//!
//! - metadata CSVs with a header line, turned into [`CsvRow`]s
//!   ([`read_rows`], [`parse_bytes`])
//! - metadata URI files without headers, one URI per cell ([`read_uris`])
//!
//! Untyped CSV records never leave this module; callers only see `CsvRow`.

use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// Options for reading a metadata CSV.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum number of data rows to read (`None` = all).
    pub limit: Option<usize>,
}

impl ReadOptions {
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self { limit }
    }
}

/// One data row: the cells present in the source, keyed by header, in column
/// order.
///
/// A row shorter than the header line lacks the trailing cells entirely,
/// which is different from a cell that is present but empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    /// 1-based line number in the source file.
    pub line: u64,
    cells: Vec<(String, String)>,
}

impl CsvRow {
    pub fn new(line: u64, cells: Vec<(String, String)>) -> Self {
        Self { line, cells }
    }

    /// Value of the cell under `header`, if the row has that cell.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    /// Non-empty value of the cell under `header`.
    pub fn value(&self, header: &str) -> Option<&str> {
        self.get(header).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, header: &str) -> bool {
        self.cells.iter().any(|(h, _)| h == header)
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }
}

/// Rows read from a metadata CSV, with what was detected about the file.
#[derive(Debug, Clone)]
pub struct ParsedRows {
    pub rows: Vec<CsvRow>,
    pub headers: Vec<String>,
    pub encoding: String,
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

fn reader_builder(delimiter: char, has_headers: bool) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter as u8)
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

fn decode(bytes: &[u8]) -> CsvResult<(String, String)> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(CsvError::EmptyFile);
    }
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    Ok((content.trim_start_matches('\u{feff}').to_string(), encoding))
}

/// Read a metadata CSV file.
///
/// # Example
/// ```ignore
/// let parsed = read_rows("nfts.csv", ReadOptions::with_limit(Some(10)))?;
/// println!("{} rows, delimiter '{}'", parsed.rows.len(), parsed.delimiter);
/// ```
pub fn read_rows<P: AsRef<Path>>(path: P, options: ReadOptions) -> CsvResult<ParsedRows> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes, options)
}

/// Parse metadata CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes(bytes: &[u8], options: ReadOptions) -> CsvResult<ParsedRows> {
    let (content, encoding) = decode(bytes)?;
    let delimiter = detect_delimiter(&content);
    let (headers, rows) = parse_rows(&content, delimiter, options)?;

    Ok(ParsedRows {
        rows,
        headers,
        encoding,
        delimiter,
    })
}

/// Parse CSV text with an explicit delimiter into headers and rows.
pub fn parse_rows(
    content: &str,
    delimiter: char,
    options: ReadOptions,
) -> CsvResult<(Vec<String>, Vec<CsvRow>)> {
    let mut reader = reader_builder(delimiter, true).from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        if options.limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }

        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let cells = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();

        rows.push(CsvRow::new(line, cells));
    }

    Ok((headers, rows))
}

/// Read a metadata URI file: every non-empty cell is one URI, in reading
/// order. Works for one URI per line as well as several URIs on one line.
pub fn read_uris<P: AsRef<Path>>(path: P, limit: Option<usize>) -> CsvResult<Vec<String>> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_uris(&bytes, limit)
}

/// Parse URI file bytes, see [`read_uris`].
pub fn parse_uris(bytes: &[u8], limit: Option<usize>) -> CsvResult<Vec<String>> {
    let (content, _) = decode(bytes)?;
    let delimiter = detect_delimiter(&content);
    let mut reader = reader_builder(delimiter, false).from_reader(content.as_bytes());

    let mut uris = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        for cell in record.iter().filter(|c| !c.is_empty()) {
            if limit.is_some_and(|limit| uris.len() >= limit) {
                return Ok(uris);
            }
            if cell.chars().any(|c| c.is_whitespace() || c.is_control()) {
                return Err(CsvError::InvalidData {
                    line,
                    value: cell.to_string(),
                });
            }
            uris.push(cell.to_string());
        }
    }

    Ok(uris)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(csv: &str) -> Vec<CsvRow> {
        parse_bytes(csv.as_bytes(), ReadOptions::default())
            .unwrap()
            .rows
    }

    #[test]
    fn test_simple_csv() {
        let rows = rows("name,image,type\nNFT 1,https://x/1.png,image/png\nNFT 2,https://x/2.png,image/png");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some("NFT 1"));
        assert_eq!(rows[0].get("type"), Some("image/png"));
        assert_eq!(rows[1].get("image"), Some("https://x/2.png"));
        assert_eq!(rows[0].line, 2);
    }

    #[test]
    fn test_semicolon_delimiter() {
        let parsed = parse_bytes(b"name;color\nA;red", ReadOptions::default()).unwrap();
        assert_eq!(parsed.delimiter, ';');
        assert_eq!(parsed.rows[0].get("color"), Some("red"));
    }

    #[test]
    fn test_quoted_values() {
        let rows = rows("name,description\n\"Alice\",\"Hello, World\"");

        assert_eq!(rows[0].get("name"), Some("Alice"));
        assert_eq!(rows[0].get("description"), Some("Hello, World"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let rows = rows("a,b\n1,2\n\n3,4\n,\n");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_short_row_lacks_trailing_cells() {
        let rows = rows("a,b,c\n1,,3\n4");

        assert_eq!(rows[0].get("b"), Some(""));
        assert_eq!(rows[0].value("b"), None);
        assert!(rows[0].contains("b"));

        assert!(rows[1].contains("a"));
        assert!(!rows[1].contains("b"));
        assert!(!rows[1].contains("c"));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let rows = rows("a,b\n1,2,3,4");
        assert_eq!(rows[0].cells().len(), 2);
    }

    #[test]
    fn test_limit() {
        let parsed = parse_bytes(b"a\n1\n2\n3", ReadOptions::with_limit(Some(2))).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].get("a"), Some("2"));
    }

    #[test]
    fn test_empty_csv_error() {
        let result = parse_bytes(b"", ReadOptions::default());
        assert!(matches!(result, Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert!(decoded.contains("Soci"));
    }

    #[test]
    fn test_uris_one_line_with_commas() {
        let uris = parse_uris(b"https://www.youtube.com1,https://www.youtube.com2", None).unwrap();
        assert_eq!(uris, vec!["https://www.youtube.com1", "https://www.youtube.com2"]);
    }

    #[test]
    fn test_uris_one_per_row() {
        let uris = parse_uris(b"ipfs://a\nipfs://b\n\nipfs://c\n", Some(2)).unwrap();
        assert_eq!(uris, vec!["ipfs://a", "ipfs://b"]);
    }

    #[test]
    fn test_uris_reject_invalid_cell() {
        let result = parse_uris(b"ipfs://a\nnot a uri\n", None);
        match result {
            Err(CsvError::InvalidData { line, value }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "not a uri");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
