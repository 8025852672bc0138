//! metadata::sources::file_documents
//!
//! Frontmatter documents on disk.
//!
//! # Format
//!
//! A document's metadata is a block at the very start of the file, either
//! YAML between `---` lines or TOML between `+++` lines:
//!
//! ```text
//! ---
//! title: Reading list
//! tags: [books]
//! ---
//! # Body
//! ```
//!
//! A file without a block has empty metadata. Writes replace only the
//! block, in the format it already uses, and leave the body untouched.
//! Documents without a block get one in the backend's default format.
//!
//! # Values
//!
//! YAML keys that are numbers or booleans read as strings and tags are
//! dropped. TOML has no null: `null` object fields are dropped on write
//! and a `null` inside an array is an error. TOML datetimes read as
//! strings.
//!
//! # Change detection
//!
//! Every document read or written is fingerprinted (SHA-256 of the file).
//! [`poll`](DocumentBackend::poll) re-hashes the tracked files and reports
//! the ones that changed or disappeared.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use fs2::FileExt;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::frontmatter::DocumentBackend;
use crate::metadata::source::{ExternalEvent, SourceError};

/// The syntax of a metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrontmatterFormat {
    /// YAML between `---` lines.
    Yaml,
    /// TOML between `+++` lines.
    #[default]
    Toml,
}

impl FrontmatterFormat {
    pub const ALL: [FrontmatterFormat; 2] = [FrontmatterFormat::Yaml, FrontmatterFormat::Toml];

    pub fn delimiter(self) -> &'static str {
        match self {
            FrontmatterFormat::Yaml => "---",
            FrontmatterFormat::Toml => "+++",
        }
    }

    /// Parse the text between the delimiters into a tree.
    pub fn parse(self, block: &str) -> Result<Value, String> {
        if block.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        match self {
            FrontmatterFormat::Yaml => {
                let yaml: serde_yaml::Value =
                    serde_yaml::from_str(block).map_err(|e| e.to_string())?;
                match yaml_to_json(yaml)? {
                    Value::Null => Ok(Value::Object(Map::new())),
                    value @ Value::Object(_) => Ok(value),
                    other => Err(format!("frontmatter must be a mapping, found {other}")),
                }
            }
            FrontmatterFormat::Toml => {
                let table: toml::Table = toml::from_str(block).map_err(|e| e.to_string())?;
                Ok(toml_to_json(toml::Value::Table(table)))
            }
        }
    }

    /// Render a tree as a delimited block.
    pub fn render(self, data: &Value) -> Result<String, String> {
        let body = match data {
            Value::Null => String::new(),
            Value::Object(map) if map.is_empty() => String::new(),
            Value::Object(_) => match self {
                FrontmatterFormat::Yaml => serde_yaml::to_string(data).map_err(|e| e.to_string())?,
                FrontmatterFormat::Toml => match json_to_toml(data)? {
                    Some(toml::Value::Table(table)) => {
                        toml::to_string(&table).map_err(|e| e.to_string())?
                    }
                    _ => String::new(),
                },
            },
            other => return Err(format!("frontmatter must be a table, found {other}")),
        };
        let delimiter = self.delimiter();
        Ok(format!("{delimiter}\n{body}{delimiter}\n"))
    }
}

/// A document split at its metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frontmatter<'a> {
    pub format: FrontmatterFormat,
    /// Text between the delimiter lines.
    pub block: &'a str,
    /// Everything after the closing delimiter.
    pub body: &'a str,
}

/// Documents under a vault directory.
#[derive(Debug)]
pub struct FileDocuments {
    root: PathBuf,
    default_format: FrontmatterFormat,
    fingerprints: HashMap<String, String>,
}

impl FileDocuments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            default_format: FrontmatterFormat::default(),
            fingerprints: HashMap::new(),
        }
    }

    /// Use `format` for documents that have no block yet.
    pub fn with_default_format(mut self, format: FrontmatterFormat) -> Self {
        self.default_format = format;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a storage path inside the vault.
    ///
    /// Absolute paths and `..` components are rejected.
    fn resolve(&self, storage_path: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(storage_path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if storage_path.is_empty() || escapes {
            return Err(SourceError::DocumentNotFound(storage_path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn track(&mut self, storage_path: &str, contents: &[u8]) {
        self.fingerprints
            .insert(storage_path.to_string(), fingerprint(contents));
    }

    /// Replace the block of an open, locked file.
    fn rewrite(
        &self,
        file: &mut File,
        path: &Path,
        storage_path: &str,
        data: &Value,
    ) -> Result<String, SourceError> {
        let io_err = |e: std::io::Error| SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        let mut existing = String::new();
        file.read_to_string(&mut existing).map_err(io_err)?;
        let updated = replace_frontmatter(&existing, data, self.default_format).map_err(
            |message| SourceError::Format {
                path: storage_path.to_string(),
                message,
            },
        )?;
        file.seek(SeekFrom::Start(0)).map_err(io_err)?;
        file.set_len(0).map_err(io_err)?;
        file.write_all(updated.as_bytes()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        Ok(updated)
    }
}

impl DocumentBackend for FileDocuments {
    fn read(&mut self, storage_path: &str) -> Result<Option<Value>, SourceError> {
        let path = self.resolve(storage_path)?;
        if !path.is_file() {
            return Ok(None);
        }
        let contents = fs::read(&path).map_err(|e| SourceError::Io {
            path: path.clone(),
            source: e,
        })?;
        self.track(storage_path, &contents);
        let text = String::from_utf8_lossy(&contents);
        parse_frontmatter(&text)
            .map(Some)
            .map_err(|message| SourceError::Format {
                path: storage_path.to_string(),
                message,
            })
    }

    fn write(&mut self, storage_path: &str, data: &Value) -> Result<(), SourceError> {
        let path = self.resolve(storage_path)?;
        if !path.is_file() {
            return Err(SourceError::DocumentNotFound(storage_path.to_string()));
        }
        let io_err = |e: std::io::Error| SourceError::Io {
            path: path.clone(),
            source: e,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(io_err)?;
        file.lock_exclusive().map_err(io_err)?;
        let result = self.rewrite(&mut file, &path, storage_path, data);
        let unlock = FileExt::unlock(&file);

        let updated = result?;
        unlock.map_err(io_err)?;
        self.track(storage_path, updated.as_bytes());
        debug!(storage_path, "wrote frontmatter");
        Ok(())
    }

    fn exists(&self, storage_path: &str) -> bool {
        self.resolve(storage_path).is_ok_and(|p| p.is_file())
    }

    fn poll(&mut self) -> Vec<ExternalEvent> {
        let mut events = Vec::new();
        let mut tracked: Vec<String> = self.fingerprints.keys().cloned().collect();
        tracked.sort();

        for storage_path in tracked {
            let Ok(path) = self.resolve(&storage_path) else {
                continue;
            };
            let contents = match fs::read(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    self.fingerprints.remove(&storage_path);
                    events.push(ExternalEvent::Removed { storage_path });
                    continue;
                }
                Err(e) => {
                    warn!(storage_path, error = %e, "failed to poll document");
                    continue;
                }
            };

            let hash = fingerprint(&contents);
            if self.fingerprints.get(&storage_path) == Some(&hash) {
                continue;
            }
            self.fingerprints.insert(storage_path.clone(), hash);

            match parse_frontmatter(&String::from_utf8_lossy(&contents)) {
                Ok(data) => events.push(ExternalEvent::Modified { storage_path, data }),
                Err(message) => warn!(storage_path, %message, "ignoring unreadable frontmatter"),
            }
        }
        events
    }
}

fn fingerprint(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    hex::encode(hasher.finalize())
}

/// Split a document at its metadata block.
///
/// `None` if the document does not open with a closed block.
pub fn split_frontmatter(text: &str) -> Option<Frontmatter<'_>> {
    FrontmatterFormat::ALL.into_iter().find_map(|format| {
        let delimiter = format.delimiter();
        let rest = text
            .strip_prefix(delimiter)
            .and_then(|r| r.strip_prefix("\r\n").or_else(|| r.strip_prefix('\n')))?;

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if line.trim_end_matches(['\r', '\n']) == delimiter {
                return Some(Frontmatter {
                    format,
                    block: &rest[..offset],
                    body: &rest[offset + line.len()..],
                });
            }
            offset += line.len();
        }
        None
    })
}

/// Parse the metadata of a document into a tree.
pub fn parse_frontmatter(text: &str) -> Result<Value, String> {
    match split_frontmatter(text) {
        None => Ok(Value::Object(Map::new())),
        Some(frontmatter) => frontmatter.format.parse(frontmatter.block),
    }
}

/// Replace the metadata block of a document, keeping its format.
///
/// A document without a block gets one in `default_format`.
pub fn replace_frontmatter(
    text: &str,
    data: &Value,
    default_format: FrontmatterFormat,
) -> Result<String, String> {
    let (format, body) = match split_frontmatter(text) {
        Some(frontmatter) => (frontmatter.format, frontmatter.body),
        None => (default_format, text),
    };
    Ok(format!("{}{body}", format.render(data)?))
}

fn yaml_to_json(value: serde_yaml::Value) -> Result<Value, String> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, item) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported frontmatter key {other:?}")),
                };
                map.insert(key, yaml_to_json(item)?);
            }
            Value::Object(map)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(Number::from(i)),
        toml::Value::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// `Ok(None)` for `null`, which only object fields may hold.
fn json_to_toml(value: &Value) -> Result<Option<toml::Value>, String> {
    Ok(Some(match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => toml::Value::Integer(i),
            None => toml::Value::Float(
                n.as_f64()
                    .ok_or_else(|| format!("number {n} does not fit in TOML"))?,
            ),
        },
        Value::String(s) => toml::Value::String(s.clone()),
        Value::Array(items) => {
            let mut converted = Vec::with_capacity(items.len());
            for item in items {
                match json_to_toml(item)? {
                    Some(v) => converted.push(v),
                    None => return Err("frontmatter lists can not contain null".into()),
                }
            }
            toml::Value::Array(converted)
        }
        Value::Object(map) => {
            let mut table = toml::Table::new();
            for (key, item) in map {
                if let Some(v) = json_to_toml(item)? {
                    table.insert(key.clone(), v);
                }
            }
            toml::Value::Table(table)
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    mod format {
        use super::*;

        #[test]
        fn split_block_and_body() {
            let frontmatter = split_frontmatter("+++\na = 1\n+++\nbody\n").unwrap();
            assert_eq!(frontmatter.format, FrontmatterFormat::Toml);
            assert_eq!(frontmatter.block, "a = 1\n");
            assert_eq!(frontmatter.body, "body\n");

            let frontmatter = split_frontmatter("---\r\na: 1\r\n---\r\nbody").unwrap();
            assert_eq!(frontmatter.format, FrontmatterFormat::Yaml);
            assert_eq!(frontmatter.block, "a: 1\r\n");
            assert_eq!(frontmatter.body, "body");
        }

        #[test]
        fn no_block() {
            assert!(split_frontmatter("# Title\n").is_none());
            assert_eq!(parse_frontmatter("# Title\n").unwrap(), json!({}));
        }

        #[test]
        fn unterminated_block_is_body() {
            assert!(split_frontmatter("+++\na = 1\n").is_none());
            assert!(split_frontmatter("---\na: 1\n+++\n").is_none());
        }

        #[test]
        fn yaml_block() {
            let text = "---\ntitle: A\ntags: [x, y]\nrating: 4.5\ndone: null\n1: one\n---\nBody\n";
            assert_eq!(
                parse_frontmatter(text).unwrap(),
                json!({"title": "A", "tags": ["x", "y"], "rating": 4.5, "done": null, "1": "one"})
            );
            assert_eq!(parse_frontmatter("---\n---\n").unwrap(), json!({}));
            assert!(parse_frontmatter("---\n- a\n---\n").is_err());
        }

        #[test]
        fn yaml_keeps_nulls() {
            let block = FrontmatterFormat::Yaml
                .render(&json!({"a": null, "b": [1, null]}))
                .unwrap();
            assert!(block.starts_with("---\n") && block.ends_with("---\n"));
            assert_eq!(parse_frontmatter(&block).unwrap(), json!({"a": null, "b": [1, null]}));
        }

        #[test]
        fn nulls_dropped_from_tables() {
            let block = FrontmatterFormat::Toml
                .render(&json!({"a": null, "b": {"c": 1}}))
                .unwrap();
            assert_eq!(parse_frontmatter(&block).unwrap(), json!({"b": {"c": 1}}));
        }

        #[test]
        fn null_in_list_is_error() {
            assert!(FrontmatterFormat::Toml.render(&json!({"a": [1, null]})).is_err());
        }

        #[test]
        fn replace_keeps_body_and_format() {
            let toml = replace_frontmatter(
                "+++\na = 1\n+++\nbody",
                &json!({"a": 2}),
                FrontmatterFormat::Yaml,
            )
            .unwrap();
            assert_eq!(toml, "+++\na = 2\n+++\nbody");

            let yaml = replace_frontmatter(
                "---\ntitle: A\n---\nBody\n",
                &json!({"title": "B"}),
                FrontmatterFormat::Toml,
            )
            .unwrap();
            assert_eq!(yaml, "---\ntitle: B\n---\nBody\n");

            let added = replace_frontmatter("body", &json!({}), FrontmatterFormat::Toml).unwrap();
            assert_eq!(added, "+++\n+++\nbody");
        }
    }

    mod files {
        use super::*;

        fn vault() -> (TempDir, FileDocuments) {
            let temp = TempDir::new().unwrap();
            let docs = FileDocuments::new(temp.path());
            (temp, docs)
        }

        #[test]
        fn read_and_write() {
            let (temp, mut docs) = vault();
            fs::write(temp.path().join("a.md"), "+++\ntitle = \"A\"\n+++\nText\n").unwrap();

            assert_eq!(docs.read("a.md").unwrap(), Some(json!({"title": "A"})));
            docs.write("a.md", &json!({"title": "B", "n": 2})).unwrap();

            let contents = fs::read_to_string(temp.path().join("a.md")).unwrap();
            assert!(contents.ends_with("+++\nText\n"));
            assert_eq!(docs.read("a.md").unwrap(), Some(json!({"title": "B", "n": 2})));
        }

        #[test]
        fn yaml_document_round_trip() {
            let (temp, mut docs) = vault();
            let file = temp.path().join("a.md");
            fs::write(&file, "---\ntitle: A\n---\nBody\n").unwrap();

            assert_eq!(docs.read("a.md").unwrap(), Some(json!({"title": "A"})));
            docs.write("a.md", &json!({"title": "B"})).unwrap();

            assert_eq!(fs::read_to_string(&file).unwrap(), "---\ntitle: B\n---\nBody\n");
            assert_eq!(docs.read("a.md").unwrap(), Some(json!({"title": "B"})));
        }

        #[test]
        fn default_format_for_new_blocks() {
            let (temp, docs) = vault();
            let mut docs = docs.with_default_format(FrontmatterFormat::Yaml);
            let file = temp.path().join("a.md");
            fs::write(&file, "Body\n").unwrap();

            docs.write("a.md", &json!({"done": true})).unwrap();
            assert_eq!(fs::read_to_string(&file).unwrap(), "---\ndone: true\n---\nBody\n");
        }

        #[test]
        fn missing_file() {
            let (_temp, mut docs) = vault();
            assert_eq!(docs.read("none.md").unwrap(), None);
            assert!(docs.write("none.md", &json!({})).is_err());
        }

        #[test]
        fn escaping_paths_rejected() {
            let (_temp, mut docs) = vault();
            assert!(docs.read("../x.md").is_err());
            assert!(!docs.exists("/etc/passwd"));
        }

        #[test]
        fn own_writes_not_reported() {
            let (temp, mut docs) = vault();
            fs::write(temp.path().join("a.md"), "x").unwrap();
            docs.read("a.md").unwrap();
            docs.write("a.md", &json!({"k": 1})).unwrap();
            assert!(docs.poll().is_empty());
        }

        #[test]
        fn poll_detects_edit_and_removal() {
            let (temp, mut docs) = vault();
            let file = temp.path().join("a.md");
            fs::write(&file, "+++\nk = 1\n+++\n").unwrap();
            docs.read("a.md").unwrap();

            fs::write(&file, "+++\nk = 2\n+++\n").unwrap();
            assert_eq!(
                docs.poll(),
                vec![ExternalEvent::Modified {
                    storage_path: "a.md".into(),
                    data: json!({"k": 2})
                }]
            );

            fs::remove_file(&file).unwrap();
            assert_eq!(
                docs.poll(),
                vec![ExternalEvent::Removed {
                    storage_path: "a.md".into()
                }]
            );
            assert!(docs.poll().is_empty());
        }
    }
}
