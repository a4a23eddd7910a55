use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::io::recovery::atomic_write;
use crate::model::config::AppConfig;

pub const CONFIG_FILE: &str = "config.toml";

/// Error type for configuration and data directory handling
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no data directory: set --data-dir, ARBOR_DIR, XDG_DATA_HOME or HOME")]
    NoDataDir,
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config.toml: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("could not parse config.toml: {0}")]
    EditError(#[from] toml_edit::TomlError),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ---------------------------------------------------------------------------
// Data directory
// ---------------------------------------------------------------------------

/// Pick the data directory: explicit path (flag or `ARBOR_DIR`), then
/// `$XDG_DATA_HOME/arbor`, then `$HOME/.local/share/arbor`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_data_dir_with(explicit, |k| std::env::var_os(k))
}

pub fn resolve_data_dir_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<OsString>,
) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let non_empty = |k: &str| env(k).filter(|v| !v.is_empty());
    if let Some(dir) = non_empty("ARBOR_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join("arbor"));
    }
    if let Some(home) = non_empty("HOME") {
        return Ok(PathBuf::from(home).join(".local/share/arbor"));
    }
    Err(ConfigError::NoDataDir)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn read_text(data_dir: &Path) -> Result<String, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    match fs::read_to_string(&path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(ConfigError::ReadError { path, source: e }),
    }
}

/// Parsed configuration; a missing file yields the defaults.
pub fn read_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let text = read_text(data_dir)?;
    Ok(toml::from_str(&text)?)
}

/// The raw document, for edits that keep comments and layout.
pub fn read_config_doc(data_dir: &Path) -> Result<toml_edit::DocumentMut, ConfigError> {
    Ok(read_text(data_dir)?.parse()?)
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(data_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    fs::create_dir_all(data_dir)
        .and_then(|_| atomic_write(&path, doc.to_string().as_bytes()))
        .map_err(|e| ConfigError::WriteError { path, source: e })
}

// ---------------------------------------------------------------------------
// Dotted-key access
// ---------------------------------------------------------------------------

/// Keys accepted by `config get|set`
pub const KNOWN_KEYS: &[&str] = &[
    "storage.debounce_ms",
    "logging.level",
    "logging.dir",
    "projects.default_tags",
    "projects.palette",
];

fn split_key(key: &str) -> Result<(&str, &str), ConfigError> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }
    key.split_once('.')
        .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))
}

/// Effective value of `key` rendered as TOML (defaults included).
pub fn get_value(config: &AppConfig, key: &str) -> Result<String, ConfigError> {
    split_key(key)?;
    let rendered = match key {
        "storage.debounce_ms" => toml_edit::Value::from(config.storage.debounce_ms as i64),
        "logging.level" => toml_edit::Value::from(config.logging.level.as_str()),
        "logging.dir" => match &config.logging.dir {
            Some(dir) => toml_edit::Value::from(dir.as_str()),
            None => return Ok(String::new()),
        },
        "projects.default_tags" => string_array(&config.projects.default_tags),
        _ => string_array(&config.projects.palette),
    };
    Ok(rendered.to_string().trim().to_string())
}

fn string_array(items: &[String]) -> toml_edit::Value {
    let mut arr = toml_edit::Array::new();
    for item in items {
        arr.push(item.as_str());
    }
    toml_edit::Value::Array(arr)
}

/// Set `key` in the document. `raw` is parsed by the key's type: an
/// integer, a plain string, or a comma-separated list. The edited document
/// must still parse as a valid configuration.
pub fn set_value(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<(), ConfigError> {
    let (table, field) = split_key(key)?;
    let value = match key {
        "storage.debounce_ms" => {
            let ms: i64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected milliseconds, got '{}'", raw),
            })?;
            if ms < 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must not be negative".to_string(),
                });
            }
            toml_edit::value(ms)
        }
        "projects.default_tags" | "projects.palette" => {
            let items: Vec<String> = raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            toml_edit::Item::Value(string_array(&items))
        }
        _ => toml_edit::value(raw),
    };

    if !doc.contains_key(table) {
        doc[table] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc[table][field] = value;

    toml::from_str::<AppConfig>(&doc.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_config() -> &'static str {
        r#"# arbor settings
[storage]
debounce_ms = 500 # slow disk

[logging]
level = "debug"
"#
    }

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(read_config(tmp.path()).unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), sample_config()).unwrap();
        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.storage.debounce_ms, 500);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.projects.default_tags.len(), 5);
    }

    #[test]
    fn set_preserves_comments() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), sample_config()).unwrap();
        let mut doc = read_config_doc(tmp.path()).unwrap();
        set_value(&mut doc, "logging.level", "warn").unwrap();
        set_value(&mut doc, "projects.default_tags", "home, errand").unwrap();
        write_config(tmp.path(), &doc).unwrap();

        let written = fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap();
        assert!(written.starts_with("# arbor settings"));
        assert!(written.contains("debounce_ms = 500 # slow disk"));

        let config = read_config(tmp.path()).unwrap();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.projects.default_tags, vec!["home", "errand"]);
    }

    #[test]
    fn set_rejects_bad_input() {
        let mut doc = toml_edit::DocumentMut::new();
        assert!(matches!(
            set_value(&mut doc, "storage.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            set_value(&mut doc, "storage.debounce_ms", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            set_value(&mut doc, "storage.debounce_ms", "-5"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn get_renders_effective_values() {
        let config = AppConfig::default();
        assert_eq!(get_value(&config, "storage.debounce_ms").unwrap(), "300");
        assert_eq!(get_value(&config, "logging.level").unwrap(), "\"info\"");
        assert_eq!(get_value(&config, "logging.dir").unwrap(), "");
        assert!(get_value(&config, "projects.default_tags").unwrap().contains("\"Work\""));
    }

    #[test]
    fn data_dir_precedence() {
        let env = |vars: &'static [(&'static str, &'static str)]| {
            move |k: &str| {
                vars.iter()
                    .find(|(name, _)| *name == k)
                    .map(|(_, v)| OsString::from(v))
            }
        };
        let explicit = Path::new("/tmp/explicit");
        assert_eq!(
            resolve_data_dir_with(Some(explicit), env(&[("ARBOR_DIR", "/a")])).unwrap(),
            PathBuf::from("/tmp/explicit")
        );
        assert_eq!(
            resolve_data_dir_with(None, env(&[("ARBOR_DIR", "/a"), ("HOME", "/h")])).unwrap(),
            PathBuf::from("/a")
        );
        assert_eq!(
            resolve_data_dir_with(None, env(&[("XDG_DATA_HOME", "/x"), ("HOME", "/h")])).unwrap(),
            PathBuf::from("/x/arbor")
        );
        assert_eq!(
            resolve_data_dir_with(None, env(&[("HOME", "/h")])).unwrap(),
            PathBuf::from("/h/.local/share/arbor")
        );
        assert!(matches!(
            resolve_data_dir_with(None, env(&[])),
            Err(ConfigError::NoDataDir)
        ));
    }
}
