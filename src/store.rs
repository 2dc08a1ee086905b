use log::{error, info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

/// A schema-free document: field name to JSON value. The store stamps the
/// system fields `id`, `created_at` and `updated_at` on every record.
pub type Record = Map<String, Value>;

type Collection = BTreeMap<String, Record>;

/// Named-collection document store persisted as a single JSON file.
///
/// Single-process, single-writer: every mutating call rewrites the whole
/// document synchronously. If the write-through fails, the in-memory mutation
/// stays applied and the error is returned, so callers must check the result
/// before assuming durability.
pub struct Store {
    path: PathBuf,
    data: BTreeMap<String, Collection>,
}

impl Store {
    /// Open the store file, starting empty when it does not exist.
    /// An unreadable or corrupt file logs a warning and starts empty rather
    /// than blocking startup.
    pub fn open(path: impl Into<PathBuf>) -> Store {
        let path = path.into();
        let data = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(data) => data,
                Err(e) => {
                    warn!("failed to parse {}: {e}; starting empty", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("failed to read {}: {e}; starting empty", path.display());
                BTreeMap::new()
            }
        };
        Store { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a record, stamping system fields. Fails on a duplicate id; the
    /// record is kept in memory even when the disk write fails.
    pub fn create(&mut self, collection: &str, id: &str, data: Record) -> Result<Record> {
        if self.collection(collection).contains_key(id) {
            return Err(LedgerError::AlreadyExists {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let now = timestamp();
        let mut record = data;
        record.insert("id".to_string(), Value::String(id.to_string()));
        record.insert("created_at".to_string(), Value::String(now.clone()));
        record.insert("updated_at".to_string(), Value::String(now));

        self.data
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), record.clone());
        self.persist()?;

        info!("created {collection} record: {id}");
        Ok(record)
    }

    pub fn read(&self, collection: &str, id: &str) -> Result<Record> {
        self.data
            .get(collection)
            .and_then(|c| c.get(id))
            .cloned()
            .ok_or_else(|| LedgerError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })
    }

    /// Shallow-merge a patch into an existing record and refresh `updated_at`.
    pub fn update(&mut self, collection: &str, id: &str, patch: Record) -> Result<Record> {
        let record = self
            .data
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| LedgerError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        for (key, value) in patch {
            record.insert(key, value);
        }
        record.insert("updated_at".to_string(), Value::String(timestamp()));
        let updated = record.clone();

        self.persist()?;
        info!("updated {collection} record: {id}");
        Ok(updated)
    }

    /// Remove a record, returning it for logging or undo.
    pub fn delete(&mut self, collection: &str, id: &str) -> Result<Record> {
        let removed = self
            .data
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .ok_or_else(|| LedgerError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        self.persist()?;
        info!("deleted {collection} record: {id}");
        Ok(removed)
    }

    /// List records with an optional predicate and a stable sort by field.
    /// A sort over mixed field types degrades to unsorted output with a
    /// logged warning, never an error.
    pub fn list(
        &self,
        collection: &str,
        predicate: Option<&dyn Fn(&Record) -> bool>,
        sort_key: Option<&str>,
        reverse: bool,
    ) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .collection(collection)
            .values()
            .filter(|r| predicate.map_or(true, |p| p(r)))
            .cloned()
            .collect();

        if let Some(key) = sort_key {
            if !sort_records(&mut records, key, reverse) {
                warn!("failed to sort {collection} by {key}: mixed field types");
            }
        }

        records
    }

    /// Case-insensitive substring search over the stringified values of the
    /// listed fields; a record matches when any field matches.
    pub fn search(&self, collection: &str, fields: &[&str], query: &str) -> Vec<Record> {
        let needle = query.to_lowercase();
        self.collection(collection)
            .values()
            .filter(|record| {
                fields.iter().any(|field| {
                    record
                        .get(*field)
                        .map(stringify)
                        .is_some_and(|v| v.to_lowercase().contains(&needle))
                })
            })
            .cloned()
            .collect()
    }

    /// Record count per collection.
    pub fn stats(&self) -> BTreeMap<String, usize> {
        self.data
            .iter()
            .map(|(name, collection)| (name.clone(), collection.len()))
            .collect()
    }

    fn collection(&self, name: &str) -> &Collection {
        static EMPTY: Collection = BTreeMap::new();
        self.data.get(name).unwrap_or(&EMPTY)
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.persistence_error(e))?;
        }
        let content = serde_json::to_string_pretty(&self.data)
            .map_err(|e| self.persistence_error(std::io::Error::other(e)))?;
        fs::write(&self.path, content).map_err(|e| self.persistence_error(e))
    }

    fn persistence_error(&self, source: std::io::Error) -> LedgerError {
        error!("failed to persist data to {}: {source}", self.path.display());
        LedgerError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Sort by a field when every present value shares a comparable scalar kind.
/// Returns false when the values are heterogeneous and the order is left as-is.
fn sort_records(records: &mut [Record], key: &str, reverse: bool) -> bool {
    let all_strings = records
        .iter()
        .all(|r| matches!(r.get(key), None | Some(Value::Null) | Some(Value::String(_))));
    let all_numbers = records
        .iter()
        .all(|r| matches!(r.get(key), Some(Value::Number(_))));

    if all_strings {
        records.sort_by(|a, b| {
            let (a, b) = (str_key(a, key), str_key(b, key));
            if reverse { b.cmp(a) } else { a.cmp(b) }
        });
        true
    } else if all_numbers {
        records.sort_by(|a, b| {
            let (a, b) = (num_key(a, key), num_key(b, key));
            if reverse { b.total_cmp(&a) } else { a.total_cmp(&b) }
        });
        true
    } else {
        false
    }
}

fn str_key<'a>(record: &'a Record, key: &str) -> &'a str {
    record.get(key).and_then(Value::as_str).unwrap_or("")
}

fn num_key(record: &Record, key: &str) -> f64 {
    record.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}
