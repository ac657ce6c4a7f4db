//! Per-field value codecs between the API and storage.
//!
//! Each entity declares its fields once as an [`AttributeTable`]. Writes pass
//! through [`AttributeTable::encode_row`], reads through
//! [`AttributeTable::decode_row`]:
//!
//! | Kind     | encode (API to storage)            | decode (storage to API)      |
//! |----------|------------------------------------|------------------------------|
//! | Plain    | unchanged                          | unchanged                    |
//! | Json     | serialized to a JSON string        | parsed back when valid JSON  |
//! | Boolean  | coerced to `true`/`false`          | coerced when recognizable    |
//! | Password | hashed by a [`PasswordHasher`]     | always `null`                |
//! | File     | uploads stored by a [`FileStore`]  | stored path mapped to a URL  |

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    #[default]
    Plain,
    Json,
    Boolean,
    Password,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: AttributeKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("expected a boolean, got {0}")]
    NotBoolean(Value),

    #[error("password must be a string")]
    InvalidPassword,

    #[error("no password hasher configured")]
    MissingHasher,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("expected a stored path or an upload object, got {0}")]
    InvalidFile(Value),

    #[error("no file store configured")]
    MissingFileStore,

    #[error("file storage failed: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("attribute '{field}': {source}")]
pub struct AttributeError {
    pub field: String,
    pub source: CodecError,
}

/// Converts one field's value on its way in and out of storage.
pub trait AttributeCodec {
    /// # Errors
    ///
    /// When the value cannot be stored in this field.
    fn encode(&self, value: Value) -> Result<Value, CodecError>;

    fn decode(&self, value: Value) -> Value;
}

/// One-way password hashing, supplied by the application.
pub trait PasswordHasher: Send + Sync {
    /// # Errors
    ///
    /// A message describing why hashing failed.
    fn hash(&self, plain: &str) -> Result<String, String>;
}

/// Storage for uploaded files, supplied by the application.
pub trait FileStore: Send + Sync {
    /// Persist an upload for `field` and return its stored path.
    ///
    /// # Errors
    ///
    /// A message describing why the upload could not be stored.
    fn store(&self, field: &str, upload: &Map<String, Value>) -> Result<String, String>;

    /// Public URL for a stored path.
    fn url(&self, path: &str) -> String;
}

pub struct PlainCodec;

impl AttributeCodec for PlainCodec {
    fn encode(&self, value: Value) -> Result<Value, CodecError> {
        Ok(value)
    }

    fn decode(&self, value: Value) -> Value {
        value
    }
}

pub struct JsonCodec;

impl AttributeCodec for JsonCodec {
    /// Strings are assumed to be serialized already.
    fn encode(&self, value: Value) -> Result<Value, CodecError> {
        Ok(match value {
            Value::Null | Value::String(_) => value,
            other => Value::String(other.to_string()),
        })
    }

    fn decode(&self, value: Value) -> Value {
        match value {
            Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
            other => other,
        }
    }
}

pub struct BooleanCodec;

impl BooleanCodec {
    fn coerce(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Some(true),
                "0" | "false" | "off" | "no" => Some(false),
                _ => None,
            },
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl AttributeCodec for BooleanCodec {
    fn encode(&self, value: Value) -> Result<Value, CodecError> {
        if value.is_null() {
            return Ok(value);
        }
        Self::coerce(&value)
            .map(Value::Bool)
            .ok_or(CodecError::NotBoolean(value))
    }

    fn decode(&self, value: Value) -> Value {
        Self::coerce(&value).map_or(value, Value::Bool)
    }
}

pub struct PasswordCodec<'a> {
    hasher: Option<&'a dyn PasswordHasher>,
}

impl AttributeCodec for PasswordCodec<'_> {
    /// `null` and empty strings encode to `null`, meaning "leave unchanged".
    fn encode(&self, value: Value) -> Result<Value, CodecError> {
        let plain = match &value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) if s.is_empty() => return Ok(Value::Null),
            Value::String(s) => s,
            _ => return Err(CodecError::InvalidPassword),
        };
        let hasher = self.hasher.ok_or(CodecError::MissingHasher)?;
        hasher.hash(plain).map(Value::String).map_err(CodecError::Hashing)
    }

    fn decode(&self, _value: Value) -> Value {
        Value::Null
    }
}

pub struct FileCodec<'a> {
    field: &'a str,
    store: Option<&'a dyn FileStore>,
}

impl AttributeCodec for FileCodec<'_> {
    /// Stored paths pass through, upload objects go to the store.
    fn encode(&self, value: Value) -> Result<Value, CodecError> {
        match value {
            Value::Null | Value::String(_) => Ok(value),
            Value::Object(upload) => {
                let store = self.store.ok_or(CodecError::MissingFileStore)?;
                store
                    .store(self.field, &upload)
                    .map(Value::String)
                    .map_err(CodecError::Storage)
            }
            other => Err(CodecError::InvalidFile(other)),
        }
    }

    fn decode(&self, value: Value) -> Value {
        match (&value, self.store) {
            (Value::String(path), Some(store)) => Value::String(store.url(path)),
            _ => value,
        }
    }
}

/// The codec kinds of an entity's fields. Undeclared fields are `Plain`.
#[derive(Clone, Default)]
pub struct AttributeTable {
    fields: BTreeMap<String, AttributeKind>,
    hasher: Option<Arc<dyn PasswordHasher>>,
    files: Option<Arc<dyn FileStore>>,
}

impl AttributeTable {
    pub fn new(fields: impl IntoIterator<Item = FieldDescriptor>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|field| (field.name, field.kind))
                .collect(),
            hasher: None,
            files: None,
        }
    }

    #[must_use]
    pub fn with_password_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    #[must_use]
    pub fn with_file_store(mut self, store: Arc<dyn FileStore>) -> Self {
        self.files = Some(store);
        self
    }

    #[must_use]
    pub fn kind(&self, field: &str) -> AttributeKind {
        self.fields.get(field).copied().unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldDescriptor> + '_ {
        self.fields
            .iter()
            .map(|(name, kind)| FieldDescriptor::new(name.clone(), *kind))
    }

    #[must_use]
    pub fn codec<'a>(&'a self, field: &'a str) -> Box<dyn AttributeCodec + 'a> {
        match self.kind(field) {
            AttributeKind::Plain => Box::new(PlainCodec),
            AttributeKind::Json => Box::new(JsonCodec),
            AttributeKind::Boolean => Box::new(BooleanCodec),
            AttributeKind::Password => Box::new(PasswordCodec {
                hasher: self.hasher.as_deref(),
            }),
            AttributeKind::File => Box::new(FileCodec {
                field,
                store: self.files.as_deref(),
            }),
        }
    }

    /// Encode every field of an inbound row. Password fields that encode to
    /// `null` are removed so an update leaves the stored hash alone.
    ///
    /// # Errors
    ///
    /// The first field whose value cannot be encoded.
    pub fn encode_row(&self, row: Map<String, Value>) -> Result<Map<String, Value>, AttributeError> {
        let mut encoded = Map::with_capacity(row.len());
        for (field, value) in row {
            let value = self
                .codec(&field)
                .encode(value)
                .map_err(|source| AttributeError {
                    field: field.clone(),
                    source,
                })?;
            if value.is_null() && self.kind(&field) == AttributeKind::Password {
                continue;
            }
            encoded.insert(field, value);
        }
        Ok(encoded)
    }

    /// Decode every field of a stored row for output.
    #[must_use]
    pub fn decode_row(&self, row: Map<String, Value>) -> Map<String, Value> {
        row.into_iter()
            .map(|(field, value)| {
                let value = self.codec(&field).decode(value);
                (field, value)
            })
            .collect()
    }
}

impl std::fmt::Debug for AttributeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeTable")
            .field("fields", &self.fields)
            .field("hasher", &self.hasher.is_some())
            .field("files", &self.files.is_some())
            .finish()
    }
}
