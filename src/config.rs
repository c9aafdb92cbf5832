use crate::error::ImportError;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_BATCH_SIZE: i64 = 1000;
pub const DEFAULT_DATETIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";
pub const DEFAULT_SOURCE_TIMEZONE: &str = "America/New_York";
pub const DUPLICATES_FILE_NAME: &str = "duplicates.csv";

fn env_string(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A set but unparseable value is a configuration fault, never a silent default.
fn parse_setting<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ImportError> {
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ImportError::config(format!("{key} has an invalid value '{raw}'"))),
        None => Ok(default),
    }
}

/// Options handed to the CSV record reader.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub delimiter: u8,
    /// chrono format strings, tried in order.
    pub datetime_formats: Vec<String>,
}

impl ReaderOptions {
    pub fn from_env() -> Result<Self, ImportError> {
        Self::from_lookup(env_string)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ImportError> {
        let delimiter = match non_blank(lookup("TRIPS_DELIMITER")) {
            Some(value) => parse_delimiter(&value)?,
            None => b',',
        };

        let datetime_formats = non_blank(lookup("TRIPS_DATETIME_FORMATS"))
            .map(|value| split_formats(&value))
            .filter(|formats| !formats.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_DATETIME_FORMAT.to_string()]);

        Ok(Self {
            delimiter,
            datetime_formats,
        })
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            datetime_formats: vec![DEFAULT_DATETIME_FORMAT.to_string()],
        }
    }
}

/// Runtime configuration for one import run.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub batch_size: i64,
    pub source_timezone: String,
    /// Explicit duplicates file location; defaults to a file next to the input.
    pub duplicates_path: Option<PathBuf>,
    pub reader: ReaderOptions,
}

impl ImporterConfig {
    pub fn from_env() -> Result<Self, ImportError> {
        Self::from_lookup(env_string)
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ImportError> {
        let get = |key: &str| non_blank(lookup(key));
        Ok(Self {
            database_url: get("DATABASE_URL"),
            max_connections: parse_setting("TRIPS_DB_MAX_CONNECTIONS", get("TRIPS_DB_MAX_CONNECTIONS"), 1u32)?
                .max(1),
            batch_size: parse_setting("TRIPS_BATCH_SIZE", get("TRIPS_BATCH_SIZE"), DEFAULT_BATCH_SIZE)?,
            source_timezone: get("TRIPS_SOURCE_TIMEZONE")
                .unwrap_or_else(|| DEFAULT_SOURCE_TIMEZONE.to_string()),
            duplicates_path: get("TRIPS_DUPLICATES_PATH").map(PathBuf::from),
            reader: ReaderOptions::from_lookup(&lookup)?,
        })
    }

    /// Batch size as a positive count, or a configuration fault.
    pub fn batch_size(&self) -> Result<usize, ImportError> {
        if self.batch_size <= 0 {
            return Err(ImportError::config(format!(
                "batch size must be positive, got {}",
                self.batch_size
            )));
        }
        usize::try_from(self.batch_size)
            .map_err(|_| ImportError::config(format!("batch size {} is too large", self.batch_size)))
    }

    /// Where the duplicates side file goes for a given input file.
    ///
    /// Without an explicit path the file is `duplicates.csv` in the input
    /// file's directory. When that would be the input file itself the name
    /// becomes `<stem>.duplicates.csv`. An explicit path naming the input is
    /// returned as-is; the caller refuses to write it.
    pub fn duplicates_path_for(&self, input: &Path) -> PathBuf {
        if let Some(path) = &self.duplicates_path {
            return path.clone();
        }
        let dir = input.parent().filter(|dir| !dir.as_os_str().is_empty());
        let in_dir = |name: &str| match dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        };

        let candidate = in_dir(DUPLICATES_FILE_NAME);
        if !same_file(&candidate, input) {
            return candidate;
        }
        let stem = input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        in_dir(&format!("{stem}.{DUPLICATES_FILE_NAME}"))
    }
}

/// Compares canonical paths when both exist, the literal paths otherwise.
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            source_timezone: DEFAULT_SOURCE_TIMEZONE.to_string(),
            duplicates_path: None,
            reader: ReaderOptions::default(),
        }
    }
}

/// Accepts a single ASCII character, or the word `tab`.
pub fn parse_delimiter(value: &str) -> Result<u8, ImportError> {
    if value.eq_ignore_ascii_case("tab") || value == "\\t" {
        return Ok(b'\t');
    }
    let bytes = value.as_bytes();
    if bytes.len() == 1 && bytes[0].is_ascii() {
        return Ok(bytes[0]);
    }
    Err(ImportError::config(format!(
        "delimiter must be a single ASCII character, got '{}'",
        value
    )))
}

pub fn split_formats(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|format| !format.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_batch_size() {
        let mut config = ImporterConfig::default();
        config.batch_size = 0;
        assert!(matches!(config.batch_size(), Err(ImportError::Config(_))));
        config.batch_size = -3;
        assert!(matches!(config.batch_size(), Err(ImportError::Config(_))));
        config.batch_size = 250;
        assert_eq!(config.batch_size().unwrap(), 250);
    }

    #[test]
    fn duplicates_file_defaults_next_to_input() {
        let config = ImporterConfig::default();
        assert_eq!(
            config.duplicates_path_for(Path::new("/data/in/trips.csv")),
            PathBuf::from("/data/in/duplicates.csv")
        );
        assert_eq!(
            config.duplicates_path_for(Path::new("trips.csv")),
            PathBuf::from("duplicates.csv")
        );

        let config = ImporterConfig {
            duplicates_path: Some(PathBuf::from("/tmp/dupes.csv")),
            ..ImporterConfig::default()
        };
        assert_eq!(
            config.duplicates_path_for(Path::new("/data/in/trips.csv")),
            PathBuf::from("/tmp/dupes.csv")
        );
    }

    #[test]
    fn duplicates_file_never_targets_the_input() {
        let config = ImporterConfig::default();
        assert_eq!(
            config.duplicates_path_for(Path::new("/data/in/duplicates.csv")),
            PathBuf::from("/data/in/duplicates.duplicates.csv")
        );
        assert_eq!(
            config.duplicates_path_for(Path::new("duplicates.csv")),
            PathBuf::from("duplicates.duplicates.csv")
        );

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("duplicates.csv");
        std::fs::write(&input, "header\n").unwrap();
        let relative_to_input = dir.path().join(".").join("duplicates.csv");
        assert!(same_file(&input, &relative_to_input));
        assert_ne!(config.duplicates_path_for(&relative_to_input), relative_to_input);
    }

    fn lookup_from(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let pairs = pairs.to_vec();
        move |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn unparseable_settings_are_config_faults() {
        for pairs in [
            [("TRIPS_BATCH_SIZE", "ten")],
            [("TRIPS_DELIMITER", ";;")],
            [("TRIPS_DB_MAX_CONNECTIONS", "-1")],
        ] {
            let result = ImporterConfig::from_lookup(lookup_from(&pairs));
            assert!(
                matches!(result, Err(ImportError::Config(_))),
                "{pairs:?} should be rejected"
            );
        }
    }

    #[test]
    fn unset_or_blank_settings_use_defaults() {
        let config = ImporterConfig::from_lookup(lookup_from(&[
            ("TRIPS_BATCH_SIZE", "  "),
            ("TRIPS_DELIMITER", ";"),
        ]))
        .unwrap();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.reader.delimiter, b';');
        assert_eq!(config.source_timezone, DEFAULT_SOURCE_TIMEZONE);

        let config = ImporterConfig::from_lookup(lookup_from(&[("TRIPS_BATCH_SIZE", "250")])).unwrap();
        assert_eq!(config.batch_size, 250);
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), b',');
        assert_eq!(parse_delimiter("tab").unwrap(), b'\t');
        assert!(parse_delimiter(";;").is_err());
    }

    #[test]
    fn test_split_formats() {
        assert_eq!(
            split_formats("%Y-%m-%d %H:%M:%S | %m/%d/%Y %I:%M:%S %p|"),
            vec!["%Y-%m-%d %H:%M:%S", "%m/%d/%Y %I:%M:%S %p"]
        );
    }
}
