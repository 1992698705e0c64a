//! High-level entry points combining the reader, converter, validator and
//! batch orchestrator.
//!
//! # Example
//!
//! ```rust,ignore
//! use nftmint::transform::{create_metadata_from_rows, CreateMetadataOptions, MetadataSource};
//!
//! let report = create_metadata_from_rows(CreateMetadataOptions::new(
//!     MetadataSource::File("collection.csv".into()),
//!     "out/",
//! ))?;
//! println!("Wrote {} files", report.written);
//! ```

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::converter::{convert, RowFailure};
use super::persist::{save_objects, PersistFailure};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::HeaderLayout;
use crate::error::{ConfigError, PipelineResult};
use crate::mint::{mint_all, MintConfig, MintReport, Minter};
use crate::models::{MetadataObject, MintItem};
use crate::parser::{parse_bytes, read_rows, read_uris, ParsedRows, ReadOptions};
use crate::validation::{validate_many, BatchValidationReport, MissingAttributeError, ObjectValidationError};

// =============================================================================
// Metadata creation
// =============================================================================

/// Where the metadata CSV comes from.
#[derive(Debug, Clone)]
pub enum MetadataSource {
    File(PathBuf),
    /// Raw file content, e.g. an upload.
    Bytes(Vec<u8>),
}

/// Options for [`create_metadata_from_rows`].
#[derive(Debug, Clone)]
pub struct CreateMetadataOptions {
    pub source: MetadataSource,
    /// Directory receiving `1.json`, `2.json`, ...
    pub destination: PathBuf,
    /// Maximum number of data rows to read (`None` = all).
    pub limit: Option<usize>,
    pub layout: HeaderLayout,
}

impl CreateMetadataOptions {
    /// All rows, default header layout.
    pub fn new(source: MetadataSource, destination: impl Into<PathBuf>) -> Self {
        Self {
            source,
            destination: destination.into(),
            limit: None,
            layout: HeaderLayout::default(),
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_layout(mut self, layout: HeaderLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// Validation findings of a creation run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetadataErrors {
    pub validation_errors: Vec<ObjectValidationError>,
    pub missing_attribute_errors: Vec<MissingAttributeError>,
}

impl From<BatchValidationReport> for CreateMetadataErrors {
    fn from(report: BatchValidationReport) -> Self {
        Self {
            validation_errors: report.metadata_objects_validation_errors,
            missing_attribute_errors: report.missing_attributes_errors,
        }
    }
}

/// Result of [`create_metadata_from_rows`].
///
/// Object indexes in `errors` refer to the written files: index `i` is
/// `<destination>/<i + 1>.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetadataReport {
    pub errors: CreateMetadataErrors,
    pub destination: PathBuf,
    /// Number of files written.
    pub written: usize,
    pub conversion_failures: Vec<RowFailure>,
    pub persistence_failures: Vec<PersistFailure>,
}

impl CreateMetadataReport {
    pub fn is_clean(&self) -> bool {
        self.errors.validation_errors.is_empty()
            && self.errors.missing_attribute_errors.is_empty()
            && self.conversion_failures.is_empty()
            && self.persistence_failures.is_empty()
    }
}

/// Read a metadata CSV, convert every row, validate the objects and write
/// them under the destination.
///
/// Validation problems are reported, not raised: every converted object is
/// written. Only an unreadable source fails the call.
pub fn create_metadata_from_rows(
    options: CreateMetadataOptions,
) -> PipelineResult<CreateMetadataReport> {
    let read_options = ReadOptions::with_limit(options.limit);

    log_info("Reading CSV file...");
    let parsed = match &options.source {
        MetadataSource::File(path) => read_rows(path, read_options)?,
        MetadataSource::Bytes(bytes) => parse_bytes(bytes, read_options)?,
    };
    log_parsed(&parsed);

    let conversion = convert(&parsed.rows, &options.layout);
    log_success(format!("Converted {} rows", conversion.objects.len()));
    if !conversion.failures.is_empty() {
        log_warning(format!(
            "{} rows could not be converted",
            conversion.failures.len()
        ));
        for failure in conversion.failures.iter().take(3) {
            log_info_indent(format!("line {}: {}", failure.line, failure.message), 1);
        }
    }

    log_info("Validating metadata...");
    let mut report = validate_many(&conversion.objects, &options.layout.attributes);
    report.merge_absent(conversion.absent_attributes);
    if report.metadata_objects_validation_errors.is_empty() {
        log_success("All objects valid");
    } else {
        log_warning(format!(
            "{} objects failed validation",
            report.metadata_objects_validation_errors.len()
        ));
    }
    if !report.missing_attributes_errors.is_empty() {
        log_warning(format!(
            "{} missing attribute values",
            report.missing_attributes_errors.len()
        ));
    }

    log_info(format!("Writing to {}...", options.destination.display()));
    let persisted = save_objects(&conversion.objects, &options.destination);
    log_success(format!("Wrote {} files", persisted.written));
    if !persisted.failures.is_empty() {
        log_warning(format!("{} files could not be written", persisted.failures.len()));
    }

    Ok(CreateMetadataReport {
        errors: report.into(),
        destination: options.destination,
        written: persisted.written,
        conversion_failures: conversion.failures,
        persistence_failures: persisted.failures,
    })
}

fn log_parsed(parsed: &ParsedRows) {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!(
        "Read {} rows, {} columns",
        parsed.rows.len(),
        parsed.headers.len()
    ));
}

fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

/// Load metadata objects from JSON files, or from every `*.json` in a
/// directory (sorted by name).
pub fn read_metadata_files(paths: &[PathBuf]) -> PipelineResult<Vec<(PathBuf, MetadataObject)>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect();
            entries.sort_by_key(|p| json_sort_key(p));
            files.extend(entries);
        } else {
            files.push(path.clone());
        }
    }

    files
        .into_iter()
        .map(|path| -> PipelineResult<(PathBuf, MetadataObject)> {
            let object = serde_json::from_str(&fs::read_to_string(&path)?)?;
            Ok((path, object))
        })
        .collect()
}

/// `2.json` sorts before `10.json`.
fn json_sort_key(path: &Path) -> (u64, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    (stem.parse().unwrap_or(u64::MAX), stem)
}

// =============================================================================
// Minting
// =============================================================================

/// What to mint.
#[derive(Debug, Clone)]
pub enum MintSource {
    /// `amount` tokens sharing one metadata string.
    Shared { metadata: String, amount: usize },
    /// One token per item, in order.
    Unique(Vec<MintItem>),
    /// One token per URI read from a file (see [`read_uris`]).
    UriFile { path: PathBuf, limit: Option<usize> },
}

/// Options for [`mint_batched`].
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub config: MintConfig,
    pub source: MintSource,
}

impl MintSource {
    /// Expand into the ordered list of items to mint.
    pub fn into_items(self) -> PipelineResult<Vec<MintItem>> {
        match self {
            MintSource::Shared { metadata, amount } => {
                if amount > 0 && metadata.trim().is_empty() {
                    return Err(ConfigError::MissingMetadata.into());
                }
                Ok(vec![MintItem::Uri(metadata); amount])
            }
            MintSource::Unique(items) => Ok(items),
            MintSource::UriFile { path, limit } => {
                let uris = read_uris(&path, limit)?;
                log_success(format!("Read {} metadata URIs", uris.len()));
                Ok(uris.into_iter().map(MintItem::Uri).collect())
            }
        }
    }
}

/// Mint every item of the request in batches.
///
/// Bad input fails before the first batch. Once submission started, the
/// returned report says whether every batch went through.
pub async fn mint_batched<M>(request: MintRequest, minter: &M) -> PipelineResult<MintReport>
where
    M: Minter + ?Sized,
{
    let items = request.source.into_items()?;
    let config = request.config;

    log_info(format!(
        "Minting {} items on {} in {} batches of up to {}",
        items.len(),
        config.token_id(),
        config.number_of_batches(items.len()),
        config.batch_size()
    ));

    let report = mint_all(&items, &config, minter).await;
    match &report {
        MintReport::Completed(outcomes) => {
            log_success(format!("Minted {} items", outcomes.len()));
        }
        MintReport::Aborted(failure) => {
            log_warning(format!(
                "Stopped on batch {} after minting {} items",
                failure.failed_batch,
                failure.minted.len()
            ));
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MintResult, PipelineError};
    use crate::mint::DryRunMinter;
    use crate::models::{SerialNumber, SupplyKey, TokenId};
    use crate::validation::{MissingCause, ValidationErrorKind};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const COLLECTION_CSV: &str = "\
name,creator,description,image,type,color,power,external_url
NFT 1,Hedera,first,ipfs://cid/1.png,image/png,red,9,https://nft.com/1
NFT 2,Hedera,second,ipfs://cid/2.png,image/png,blue,,
,Hedera,third,ipfs://cid/3.png,image/png,green,3,
";

    fn layout() -> HeaderLayout {
        HeaderLayout {
            attributes: vec!["color".into(), "power".into()],
            ..HeaderLayout::default()
        }
    }

    #[test]
    fn test_create_metadata_reports_and_writes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let options = CreateMetadataOptions::new(
            MetadataSource::Bytes(COLLECTION_CSV.as_bytes().to_vec()),
            dir.path(),
        )
        .with_layout(layout());

        let report = create_metadata_from_rows(options).unwrap();

        assert_eq!(report.written, 3);
        assert!(report.conversion_failures.is_empty());
        assert!(!report.is_clean());

        // Row 3 has no name.
        assert_eq!(report.errors.validation_errors.len(), 1);
        assert_eq!(report.errors.validation_errors[0].index, 2);
        assert_eq!(
            report.errors.validation_errors[0].errors.general,
            vec![ValidationErrorKind::MissingName]
        );

        // Row 2 has an empty power cell.
        assert_eq!(report.errors.missing_attribute_errors.len(), 1);
        let missing = &report.errors.missing_attribute_errors[0];
        assert_eq!((missing.index, missing.trait_type.as_str()), (1, "power"));
        assert_eq!(missing.cause, MissingCause::EmptyValue);

        let first: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("1.json")).unwrap()).unwrap();
        assert_eq!(
            first,
            json!({
                "name": "NFT 1",
                "creator": "Hedera",
                "description": "first",
                "image": "ipfs://cid/1.png",
                "type": "image/png",
                "format": "HIP412@2.0.0",
                "properties": { "external_url": "https://nft.com/1" },
                "attributes": [
                    { "trait_type": "color", "value": "red" },
                    { "trait_type": "power", "value": "9" }
                ]
            })
        );
    }

    #[test]
    fn test_create_metadata_attributes_only_from_declared_columns() {
        let dir = tempfile::tempdir().unwrap();
        let source = || MetadataSource::Bytes(COLLECTION_CSV.as_bytes().to_vec());

        let plain =
            create_metadata_from_rows(CreateMetadataOptions::new(source(), dir.path().join("plain")))
                .unwrap();
        let first: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(plain.destination.join("1.json")).unwrap(),
        )
        .unwrap();
        assert!(first.get("attributes").is_none());

        let layout = HeaderLayout::default().with_attributes(vec!["color".to_string()]);
        let inline = create_metadata_from_rows(
            CreateMetadataOptions::new(source(), dir.path().join("inline")).with_layout(layout),
        )
        .unwrap();
        let first: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(inline.destination.join("1.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(first["attributes"], json!([{ "trait_type": "color", "value": "red" }]));
    }

    #[test]
    fn test_create_metadata_short_row_reports_absent_column() {
        let dir = tempfile::tempdir().unwrap();
        let csv = "name,image,type,color,power\nNFT 1,ipfs://1.png,image/png,red\n";
        let options = CreateMetadataOptions::new(MetadataSource::Bytes(csv.into()), dir.path())
            .with_layout(layout());

        let report = create_metadata_from_rows(options).unwrap();

        let missing = &report.errors.missing_attribute_errors;
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].trait_type, "power");
        assert_eq!(missing[0].cause, MissingCause::ColumnAbsent);
    }

    #[test]
    fn test_create_metadata_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("collection.csv");
        fs::write(&csv_path, COLLECTION_CSV).unwrap();
        let out = dir.path().join("out");

        let options = CreateMetadataOptions::new(MetadataSource::File(csv_path), &out)
            .with_limit(Some(2))
            .with_layout(layout());
        let report = create_metadata_from_rows(options).unwrap();

        assert_eq!(report.written, 2);
        assert!(report.errors.validation_errors.is_empty());
        assert!(!out.join("3.json").exists());
    }

    #[test]
    fn test_create_metadata_unreadable_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let options = CreateMetadataOptions::new(
            MetadataSource::File(dir.path().join("missing.csv")),
            dir.path(),
        );
        assert!(matches!(
            create_metadata_from_rows(options),
            Err(PipelineError::Csv(_))
        ));

        let options = CreateMetadataOptions::new(MetadataSource::Bytes(b"  \n".to_vec()), dir.path());
        assert!(create_metadata_from_rows(options).is_err());
    }

    #[test]
    fn test_read_metadata_files_sorts_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for i in [10, 2, 1] {
            let object = MetadataObject::new(format!("NFT {}", i), "ipfs://x.png", "image/png");
            fs::write(
                dir.path().join(format!("{}.json", i)),
                serde_json::to_string(&object).unwrap(),
            )
            .unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let loaded = read_metadata_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = loaded
            .iter()
            .map(|(_, o)| o.name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["NFT 1", "NFT 2", "NFT 10"]);
    }

    struct CountingMinter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Minter for CountingMinter {
        async fn submit(
            &self,
            items: &[MintItem],
            _token_id: &TokenId,
            _supply_key: &SupplyKey,
        ) -> MintResult<Vec<SerialNumber>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((1..=items.len() as u64).collect())
        }
    }

    fn config(batch_size: usize) -> MintConfig {
        MintConfig::new("0.0.777", "supply-key", batch_size).unwrap()
    }

    #[tokio::test]
    async fn test_mint_shared_metadata() {
        let request = MintRequest {
            config: config(5),
            source: MintSource::Shared {
                metadata: "ipfs://meta.json".into(),
                amount: 8,
            },
        };

        let outcomes = mint_batched(request, &DryRunMinter::new())
            .await
            .unwrap()
            .into_result()
            .unwrap();

        assert_eq!(outcomes.len(), 8);
        assert_eq!(outcomes[7].serial_number, 8);
        assert!(outcomes.iter().all(|o| o.content.to_string() == "ipfs://meta.json"));
    }

    #[tokio::test]
    async fn test_mint_zero_amount_never_calls_minter() {
        let minter = CountingMinter {
            calls: AtomicUsize::new(0),
        };
        let request = MintRequest {
            config: config(5),
            source: MintSource::Shared {
                metadata: "ipfs://meta.json".into(),
                amount: 0,
            },
        };

        let report = mint_batched(request, &minter).await.unwrap();

        assert!(report.minted().is_empty());
        assert!(report.is_completed());
        assert_eq!(minter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mint_blank_shared_metadata_rejected() {
        let minter = CountingMinter {
            calls: AtomicUsize::new(0),
        };
        let request = MintRequest {
            config: config(5),
            source: MintSource::Shared {
                metadata: " ".into(),
                amount: 3,
            },
        };

        let err = mint_batched(request, &minter).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Config(ConfigError::MissingMetadata)
        ));
        assert_eq!(minter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_mint_from_uri_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uris.csv");
        fs::write(&path, "ipfs://a\nipfs://b,ipfs://c\n").unwrap();

        let request = MintRequest {
            config: config(2),
            source: MintSource::UriFile { path, limit: None },
        };
        let report = mint_batched(request, &DryRunMinter::new()).await.unwrap();

        let contents: Vec<String> = report.minted().iter().map(|o| o.content.to_string()).collect();
        assert_eq!(contents, vec!["ipfs://a", "ipfs://b", "ipfs://c"]);
    }
}
