//! California Housing dataset: download, cache and feature derivation.
//!
//! The raw StatLib file holds block-group totals. The table exposed here uses
//! per-household averages and expresses the target in units of $100,000.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use ndarray::{Array1, Array2};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use url::Url;

use super::{DatasetError, DatasetSource, Table};
use crate::{app_dirs, atomic_file, http_client};

/// Default archive location.
pub const ARCHIVE_URL: &str = "https://ndownloader.figshare.com/files/5976036";
/// SHA-256 of the archive served at [`ARCHIVE_URL`].
pub const ARCHIVE_SHA256: &str = "aaa5c9a6afe2225cc2aed2723682ae403280c4a3695a2ddda4ffb5d8215ea681";
pub const ARCHIVE_FILE_NAME: &str = "cal_housing.tgz";
pub const DATA_FILE_NAME: &str = "cal_housing.data";
/// Overrides the cache directory when no explicit data home is configured.
pub const DATA_HOME_ENV: &str = "CALTREE_DATA_HOME";

pub const FEATURE_NAMES: [&str; 8] = [
    "MedInc",
    "HouseAge",
    "AveRooms",
    "AveBedrms",
    "Population",
    "AveOccup",
    "Latitude",
    "Longitude",
];
pub const TARGET_NAME: &str = "MedHouseVal";

const RAW_FIELDS: usize = 9;
const MAX_ARCHIVE_BYTES: u64 = 64 * 1024 * 1024;

// Raw column order in `cal_housing.data`.
const LONGITUDE: usize = 0;
const LATITUDE: usize = 1;
const HOUSING_MEDIAN_AGE: usize = 2;
const TOTAL_ROOMS: usize = 3;
const TOTAL_BEDROOMS: usize = 4;
const POPULATION: usize = 5;
const HOUSEHOLDS: usize = 6;
const MEDIAN_INCOME: usize = 7;
const MEDIAN_HOUSE_VALUE: usize = 8;

/// California Housing source backed by a local file or the download cache.
#[derive(Debug, Clone)]
pub struct CaliforniaHousing {
    /// Explicit `cal_housing.data` or `.tgz`; skips the cache entirely.
    pub local_path: Option<PathBuf>,
    /// Cache directory; defaults to `$CALTREE_DATA_HOME` or `<app root>/datasets`.
    pub data_home: Option<PathBuf>,
    /// Fetch the archive on a cache miss instead of failing.
    pub download_if_missing: bool,
    /// Alternative archive URL; must be HTTPS.
    pub url: Option<String>,
}

impl Default for CaliforniaHousing {
    fn default() -> Self {
        Self {
            local_path: None,
            data_home: None,
            download_if_missing: true,
            url: None,
        }
    }
}

impl DatasetSource for CaliforniaHousing {
    fn name(&self) -> &str {
        "california_housing"
    }

    fn load(&self) -> Result<Table, DatasetError> {
        if let Some(path) = &self.local_path {
            info!("Loading California Housing from {}", path.display());
            return load_local(path);
        }
        let home = self.resolve_data_home()?;
        let data_path = home.join(DATA_FILE_NAME);
        if !data_path.is_file() {
            let archive_path = home.join(ARCHIVE_FILE_NAME);
            if !archive_path.is_file() {
                if !self.download_if_missing {
                    return Err(DatasetError::NotCached { path: archive_path });
                }
                let url = self.url.as_deref().unwrap_or(ARCHIVE_URL);
                download_archive(url, &archive_path)?;
            }
            extract_data_member(&archive_path, &data_path)?;
        }
        debug!("Reading cached {}", data_path.display());
        parse_raw_file(&data_path)
    }
}

impl CaliforniaHousing {
    fn resolve_data_home(&self) -> Result<PathBuf, DatasetError> {
        let home = match &self.data_home {
            Some(path) => path.clone(),
            None => match std::env::var(DATA_HOME_ENV) {
                Ok(value) if !value.trim().is_empty() => PathBuf::from(value.trim()),
                _ => app_dirs::datasets_dir()?,
            },
        };
        std::fs::create_dir_all(&home).map_err(|source| DatasetError::io(&home, source))?;
        Ok(home)
    }
}

fn load_local(path: &Path) -> Result<Table, DatasetError> {
    let is_archive = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tgz") || ext.eq_ignore_ascii_case("gz"));
    if !is_archive {
        return parse_raw_file(path);
    }
    let mut bytes = Vec::new();
    with_data_member(path, |member| {
        member
            .read_to_end(&mut bytes)
            .map_err(|source| DatasetError::io(path, source))
    })?;
    parse_raw_rows(BufReader::new(bytes.as_slice()), path)
}

fn parse_raw_file(path: &Path) -> Result<Table, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::io(path, source))?;
    parse_raw_rows(BufReader::new(file), path)
}

/// Parse the headerless comma-separated raw file and derive the feature table.
pub fn parse_raw_rows(reader: impl BufRead, origin: &Path) -> Result<Table, DatasetError> {
    let mut values: Vec<f64> = Vec::new();
    let mut target: Vec<f64> = Vec::new();
    let mut raw = [0.0f64; RAW_FIELDS];
    for (line_idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| DatasetError::io(origin, source))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if fields.len() != RAW_FIELDS {
            return Err(DatasetError::MalformedRow {
                path: origin.to_path_buf(),
                line: line_idx + 1,
                expected: RAW_FIELDS,
                found: fields.len(),
            });
        }
        for (field_idx, (slot, field)) in raw.iter_mut().zip(&fields).enumerate() {
            *slot = field.parse::<f64>().map_err(|_| DatasetError::ParseValue {
                path: origin.to_path_buf(),
                row: line_idx + 1,
                column: format!("field {}", field_idx + 1),
                value: field.to_string(),
            })?;
        }
        values.extend_from_slice(&derive_features(&raw));
        target.push(raw[MEDIAN_HOUSE_VALUE] / 100_000.0);
    }
    if target.is_empty() {
        return Err(DatasetError::Empty {
            path: origin.to_path_buf(),
        });
    }
    let features = Array2::from_shape_vec((target.len(), FEATURE_NAMES.len()), values)
        .map_err(|err| DatasetError::Shape(err.to_string()))?;
    Table::new(
        FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
        TARGET_NAME,
        features,
        Array1::from(target),
    )
}

fn derive_features(raw: &[f64; RAW_FIELDS]) -> [f64; 8] {
    let households = raw[HOUSEHOLDS];
    [
        raw[MEDIAN_INCOME],
        raw[HOUSING_MEDIAN_AGE],
        raw[TOTAL_ROOMS] / households,
        raw[TOTAL_BEDROOMS] / households,
        raw[POPULATION],
        raw[POPULATION] / households,
        raw[LATITUDE],
        raw[LONGITUDE],
    ]
}

fn validate_url(url: &str) -> Result<(), DatasetError> {
    let parsed = Url::parse(url).map_err(|err| DatasetError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    if parsed.scheme() != "https" {
        return Err(DatasetError::InvalidUrl {
            url: url.to_string(),
            reason: "must use https".to_string(),
        });
    }
    if parsed.host_str().is_none() {
        return Err(DatasetError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(())
}

fn download_archive(url: &str, dest: &Path) -> Result<(), DatasetError> {
    validate_url(url)?;
    info!("Downloading California Housing archive from {url}");
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp =
        tempfile::NamedTempFile::new_in(dir).map_err(|source| DatasetError::io(dir, source))?;
    let written = http_client::fetch_to_writer(
        url,
        &mut tmp,
        MAX_ARCHIVE_BYTES,
        http_client::RetryPolicy::default(),
    )
    .map_err(|err| DatasetError::Download {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    debug!("Downloaded {written} bytes");

    let actual = sha256_file(tmp.path())?;
    if actual != ARCHIVE_SHA256 {
        return Err(DatasetError::ChecksumMismatch {
            path: dest.to_path_buf(),
            expected: ARCHIVE_SHA256.to_string(),
            actual,
        });
    }
    tmp.persist(dest)
        .map_err(|err| DatasetError::io(dest, err.error))?;
    Ok(())
}

fn with_data_member<T>(
    archive_path: &Path,
    read: impl FnOnce(&mut dyn Read) -> Result<T, DatasetError>,
) -> Result<T, DatasetError> {
    let io_error = |source| DatasetError::io(archive_path, source);
    let file = File::open(archive_path).map_err(io_error)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    for entry in archive.entries().map_err(io_error)? {
        let mut entry = entry.map_err(io_error)?;
        let is_data = entry
            .path()
            .map_err(io_error)?
            .file_name()
            .is_some_and(|name| name == DATA_FILE_NAME);
        if is_data {
            return read(&mut entry);
        }
    }
    Err(DatasetError::MissingArchiveMember {
        archive: archive_path.to_path_buf(),
        member: DATA_FILE_NAME.to_string(),
    })
}

fn extract_data_member(archive_path: &Path, dest: &Path) -> Result<(), DatasetError> {
    debug!("Extracting {DATA_FILE_NAME} from {}", archive_path.display());
    with_data_member(archive_path, |member| {
        atomic_file::write_with(dest, |writer| std::io::copy(member, writer).map(|_| ()))
            .map_err(|source| DatasetError::io(dest, source))
    })
}

fn sha256_file(path: &Path) -> Result<String, DatasetError> {
    let mut file = File::open(path).map_err(|source| DatasetError::io(path, source))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|source| DatasetError::io(path, source))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
