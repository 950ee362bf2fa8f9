//! Structural validation of the service-account key document.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

/// Value of the `type` field in a service-account key.
pub const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Errors raised while reading or parsing a key document.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The contents are not valid JSON.
    #[error("{} is not valid JSON: {source}", path.display())]
    Parse {
        /// Path that failed.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },
    /// The contents are JSON but not an object.
    #[error("{} must contain a JSON object, found {found}", path.display())]
    NotAnObject {
        /// Path that failed.
        path: PathBuf,
        /// Kind of JSON value found instead.
        found: &'static str,
    },
}

/// Read `path` and parse it as a JSON object.
///
/// # Errors
///
/// Returns [`KeyError::Read`] if the file cannot be read, otherwise the
/// errors of [`parse_bytes`].
pub fn parse_document(path: &Path) -> Result<Map<String, Value>, KeyError> {
    let bytes = std::fs::read(path).map_err(|source| KeyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bytes(path, &bytes)
}

/// Parse `bytes` as a JSON object. `origin` is used for error messages only.
///
/// # Errors
///
/// Returns [`KeyError::Parse`] for malformed JSON and
/// [`KeyError::NotAnObject`] for any other top-level value.
pub fn parse_bytes(origin: &Path, bytes: &[u8]) -> Result<Map<String, Value>, KeyError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|source| KeyError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(KeyError::NotAnObject {
            path: origin.to_path_buf(),
            found: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Recognised fields of a service-account key.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ServiceAccountKey {
    /// The `type` field.
    pub key_type: Option<String>,
    /// Cloud project the account belongs to.
    pub project_id: Option<String>,
    /// Service-account email.
    pub client_email: Option<String>,
    /// Identifier of the private key.
    pub private_key_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key_id", &"[REDACTED]")
            .finish()
    }
}

impl ServiceAccountKey {
    /// Extract recognised fields from a parsed document. Non-string values
    /// are treated as absent.
    pub fn from_document(document: &Map<String, Value>) -> Self {
        let field = |name: &str| {
            document
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_owned)
        };
        Self {
            key_type: field("type"),
            project_id: field("project_id"),
            client_email: field("client_email"),
            private_key_id: field("private_key_id"),
        }
    }

    /// Returns `true` when `type` is `service_account`.
    pub fn is_service_account(&self) -> bool {
        self.key_type.as_deref() == Some(SERVICE_ACCOUNT_TYPE)
    }
}

/// Outcome of inspecting an installed key.
#[derive(Debug)]
pub enum KeyStatus {
    /// No file at the path.
    Missing,
    /// The file exists but could not be read.
    Unreadable(String),
    /// The file is not a JSON object.
    Malformed(String),
    /// Valid JSON object without `type = service_account`.
    NotServiceAccount(ServiceAccountKey),
    /// A service-account key.
    Valid(ServiceAccountKey),
}

impl KeyStatus {
    /// Returns `true` only for [`KeyStatus::Valid`].
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Inspect the key at `path`.
pub fn inspect_key(path: &Path) -> KeyStatus {
    if !path.exists() {
        return KeyStatus::Missing;
    }

    match parse_document(path) {
        Ok(document) => {
            let key = ServiceAccountKey::from_document(&document);
            debug!(path = %path.display(), key = ?key, "parsed key document");
            if key.is_service_account() {
                KeyStatus::Valid(key)
            } else {
                KeyStatus::NotServiceAccount(key)
            }
        }
        Err(err @ KeyError::Read { .. }) => KeyStatus::Unreadable(err.to_string()),
        Err(err) => KeyStatus::Malformed(err.to_string()),
    }
}
