//! Append-only weather history in a plain-text or JSON file.
//!
//! The JSON variant keeps the whole history in a single array document, so
//! every append is a read-modify-write of the file. The new document is
//! written to a temporary file next to the destination and renamed over it,
//! which leaves the previous history intact if anything fails midway. This
//! does not protect against other processes writing the same file at the
//! same time.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    fmt::{self, Debug},
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

use crate::{
    Config,
    error::{Error, Result},
    model::{Language, Weather},
};

pub trait WeatherStorage: Send + Sync + Debug {
    /// Append one observation.
    fn save(&self, weather: &Weather) -> Result<()>;

    /// Stored observations as display lines, oldest first.
    fn entries(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryFormat {
    Plain,
    Json,
}

impl HistoryFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryFormat::Plain => "plain",
            HistoryFormat::Json => "json",
        }
    }

    pub const fn all() -> &'static [HistoryFormat] {
        &[HistoryFormat::Plain, HistoryFormat::Json]
    }

    /// `.json` files hold the array format, anything else is plain text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => HistoryFormat::Json,
            _ => HistoryFormat::Plain,
        }
    }
}

impl fmt::Display for HistoryFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for HistoryFormat {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "plain" | "text" | "txt" => Ok(HistoryFormat::Plain),
            "json" => Ok(HistoryFormat::Json),
            _ => Err(Error::UnsupportedHistoryFormat(value.to_string())),
        }
    }
}

/// One persisted observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub captured_at: DateTime<Local>,
    pub city: String,
    pub temperature: i32,
    /// Localized label, in the language configured when the record was written.
    pub weather_type: String,
    pub sunrise: DateTime<Local>,
    pub sunset: DateTime<Local>,
}

impl HistoryRecord {
    pub fn new(weather: &Weather, language: Language, captured_at: DateTime<Local>) -> Self {
        Self {
            captured_at,
            city: weather.city.clone(),
            temperature: weather.temperature,
            weather_type: weather.weather_type.label(language).to_string(),
            sunrise: weather.sunrise,
            sunset: weather.sunset,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}  {}, {}°C, {}, sunrise {}, sunset {}",
            self.captured_at.format("%Y-%m-%d %H:%M:%S"),
            self.city,
            self.temperature,
            self.weather_type,
            self.sunrise.format("%H:%M"),
            self.sunset.format("%H:%M"),
        )
    }
}

#[derive(Debug, Clone)]
pub struct PlainFileWeatherStorage {
    path: PathBuf,
    language: Language,
}

impl PlainFileWeatherStorage {
    pub fn new(path: impl Into<PathBuf>, language: Language) -> Self {
        Self {
            path: path.into(),
            language,
        }
    }
}

impl WeatherStorage for PlainFileWeatherStorage {
    fn save(&self, weather: &Weather) -> Result<()> {
        let record = HistoryRecord::new(weather, self.language, Local::now());
        let line = format!("{}\n", record.summary());

        create_parent_dir(&self.path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| io_error("open", &self.path, e))?;

        // Whole line in one write.
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| io_error("append to", &self.path, e))?;

        tracing::debug!(path = %self.path.display(), "appended plain history line");
        Ok(())
    }

    fn entries(&self) -> Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("read", &self.path, e)),
        };

        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileWeatherStorage {
    path: PathBuf,
    language: Language,
}

impl JsonFileWeatherStorage {
    pub fn new(path: impl Into<PathBuf>, language: Language) -> Self {
        Self {
            path: path.into(),
            language,
        }
    }

    /// All stored records, oldest first.
    pub fn load(&self) -> Result<Vec<HistoryRecord>> {
        self.read_array()?
            .into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    Error::storage(format!("unexpected record in {}: {e}", self.path.display()))
                })
            })
            .collect()
    }

    /// Existing elements of the history array; a missing or blank file is empty.
    fn read_array(&self) -> Result<Vec<Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("read", &self.path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Array(items)) => Ok(items),
            Ok(_) => Err(Error::storage(format!(
                "{} does not contain a JSON array",
                self.path.display()
            ))),
            Err(e) => Err(Error::storage(format!(
                "{} is not valid JSON: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_array(&self, items: &[Value]) -> Result<()> {
        // Write through symlinks to the real file, keeping its permissions.
        let target = fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone());
        let permissions = fs::metadata(&target).ok().map(|meta| meta.permissions());

        let dir = parent_dir(&target);
        create_parent_dir(&target)?;

        let tmp = NamedTempFile::new_in(dir).map_err(|e| io_error("create temporary file in", dir, e))?;
        if let Some(permissions) = permissions {
            fs::set_permissions(tmp.path(), permissions)
                .map_err(|e| io_error("set permissions on", tmp.path(), e))?;
        }
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, items)
                .map_err(|e| Error::storage(format!("failed to serialize history: {e}")))?;
            writer
                .write_all(b"\n")
                .and_then(|()| writer.flush())
                .map_err(|e| io_error("write", tmp.path(), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| io_error("sync", tmp.path(), e))?;

        tmp.persist(&target)
            .map_err(|e| io_error("replace", &target, e.error))?;
        Ok(())
    }
}

impl WeatherStorage for JsonFileWeatherStorage {
    fn save(&self, weather: &Weather) -> Result<()> {
        let mut items = self.read_array()?;

        let record = HistoryRecord::new(weather, self.language, Local::now());
        let value = serde_json::to_value(&record)
            .map_err(|e| Error::storage(format!("failed to serialize record: {e}")))?;
        items.push(value);

        self.write_array(&items)?;

        tracing::debug!(path = %self.path.display(), records = items.len(), "saved JSON history");
        Ok(())
    }

    fn entries(&self) -> Result<Vec<String>> {
        Ok(self
            .read_array()?
            .into_iter()
            .map(|value| match serde_json::from_value::<HistoryRecord>(value.clone()) {
                Ok(record) => record.summary(),
                Err(_) => value.to_string(),
            })
            .collect())
    }
}

pub fn storage_for(format: HistoryFormat, path: PathBuf, language: Language) -> Box<dyn WeatherStorage> {
    match format {
        HistoryFormat::Plain => Box::new(PlainFileWeatherStorage::new(path, language)),
        HistoryFormat::Json => Box::new(JsonFileWeatherStorage::new(path, language)),
    }
}

/// Construct the history store described by config.
pub fn storage_from_config(config: &Config) -> Result<Box<dyn WeatherStorage>> {
    Ok(storage_for(
        config.history_format()?,
        config.history_path.clone(),
        config.language()?,
    ))
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn create_parent_dir(path: &Path) -> Result<()> {
    let dir = parent_dir(path);
    fs::create_dir_all(dir).map_err(|e| io_error("create directory", dir, e))
}

fn io_error(action: &str, path: &Path, err: io::Error) -> Error {
    Error::storage(format!("failed to {action} {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WeatherType;
    use chrono::TimeZone;

    fn weather(city: &str, temperature: i32) -> Weather {
        Weather {
            temperature,
            weather_type: WeatherType::Clear,
            sunrise: Local.with_ymd_and_hms(2022, 5, 3, 4, 0, 0).unwrap(),
            sunset: Local.with_ymd_and_hms(2022, 5, 3, 20, 25, 0).unwrap(),
            city: city.to_string(),
        }
    }

    #[test]
    fn format_from_path() {
        assert_eq!(HistoryFormat::from_path(Path::new("history.json")), HistoryFormat::Json);
        assert_eq!(HistoryFormat::from_path(Path::new("a/b/HISTORY.JSON")), HistoryFormat::Json);
        assert_eq!(HistoryFormat::from_path(Path::new("history.txt")), HistoryFormat::Plain);
        assert_eq!(HistoryFormat::from_path(Path::new("history")), HistoryFormat::Plain);
    }

    #[test]
    fn format_as_str_roundtrip() {
        for format in HistoryFormat::all() {
            assert_eq!(HistoryFormat::try_from(format.as_str()).unwrap(), *format);
        }
        assert!(matches!(
            HistoryFormat::try_from("csv"),
            Err(Error::UnsupportedHistoryFormat(_))
        ));
    }

    #[test]
    fn json_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let storage = JsonFileWeatherStorage::new(&path, Language::En);

        for (i, city) in ["Kharkov", "Kyiv", "Lviv"].iter().enumerate() {
            storage.save(&weather(city, i as i32)).unwrap();
        }

        let root: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let items = root.as_array().expect("root must be an array");
        assert_eq!(items.len(), 3);

        let cities: Vec<_> = items.iter().map(|v| v["city"].as_str().unwrap()).collect();
        assert_eq!(cities, ["Kharkov", "Kyiv", "Lviv"]);
        assert_eq!(items[0]["weather_type"], "Clear");
        assert_eq!(items[2]["temperature"], 2);
    }

    #[test]
    fn json_load_returns_typed_records() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileWeatherStorage::new(dir.path().join("history.json"), Language::Ua);

        storage.save(&weather("Kharkov", 25)).unwrap();

        let records = storage.load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].weather_type, "Ясно");
        assert_eq!(records[0].sunrise, weather("Kharkov", 25).sunrise);
    }

    #[test]
    fn json_rejects_invalid_file_and_leaves_it_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let original = "[{\"city\": \"Kharkov\", ";
        fs::write(&path, original).unwrap();

        let storage = JsonFileWeatherStorage::new(&path, Language::En);
        let err = storage.save(&weather("Kyiv", 10)).unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn json_rejects_non_array_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{\"city\": \"Kharkov\"}").unwrap();

        let storage = JsonFileWeatherStorage::new(&path, Language::En);
        assert!(matches!(storage.save(&weather("Kyiv", 10)), Err(Error::Storage(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"city\": \"Kharkov\"}");
    }

    #[test]
    fn json_blank_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "  \n").unwrap();

        let storage = JsonFileWeatherStorage::new(&path, Language::En);
        storage.save(&weather("Kyiv", 10)).unwrap();

        assert_eq!(storage.load().unwrap().len(), 1);
    }

    #[test]
    fn json_keeps_foreign_elements() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "[{\"note\": \"imported\"}]").unwrap();

        let storage = JsonFileWeatherStorage::new(&path, Language::En);
        storage.save(&weather("Kyiv", 10)).unwrap();

        let entries = storage.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], "{\"note\":\"imported\"}");
        assert!(entries[1].contains("Kyiv, 10°C, Clear"));
    }

    #[cfg(unix)]
    #[test]
    fn json_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "[]").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        JsonFileWeatherStorage::new(&path, Language::En)
            .save(&weather("Kyiv", 10))
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn json_writes_through_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real.json");
        let link = dir.path().join("link.json");
        fs::write(&real, "[]").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let storage = JsonFileWeatherStorage::new(&link, Language::En);
        storage.save(&weather("Kyiv", 10)).unwrap();
        storage.save(&weather("Lviv", 12)).unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        let records = JsonFileWeatherStorage::new(&real, Language::En).load().unwrap();
        let cities: Vec<_> = records.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, ["Kyiv", "Lviv"]);
    }

    #[test]
    fn json_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("history.json");

        JsonFileWeatherStorage::new(&path, Language::En)
            .save(&weather("Kyiv", 10))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn plain_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.txt");
        let storage = PlainFileWeatherStorage::new(&path, Language::En);

        storage.save(&weather("Kharkov", 25)).unwrap();
        storage.save(&weather("Kyiv", -3)).unwrap();

        let entries = storage.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].contains("Kharkov, 25°C, Clear, sunrise 04:00, sunset 20:25"));
        assert!(entries[1].contains("Kyiv, -3°C, Clear"));
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
    }

    #[test]
    fn directory_in_place_of_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();

        let plain = PlainFileWeatherStorage::new(dir.path(), Language::En);
        assert!(matches!(plain.save(&weather("Kyiv", 1)), Err(Error::Storage(_))));

        let json = JsonFileWeatherStorage::new(dir.path(), Language::En);
        assert!(matches!(json.save(&weather("Kyiv", 1)), Err(Error::Storage(_))));
    }

    #[test]
    fn missing_file_has_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent");

        assert!(PlainFileWeatherStorage::new(&path, Language::En).entries().unwrap().is_empty());
        assert!(JsonFileWeatherStorage::new(&path, Language::En).entries().unwrap().is_empty());
    }

    #[test]
    fn storage_from_config_follows_extension() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            history_path: dir.path().join("history.log"),
            ..Config::default()
        };

        let storage = storage_from_config(&cfg).unwrap();
        storage.save(&weather("Kyiv", 1)).unwrap();

        let contents = fs::read_to_string(dir.path().join("history.log")).unwrap();
        assert!(contents.contains("Kyiv, 1°C, Clear"));
        assert!(!contents.trim_start().starts_with('['));
    }
}
