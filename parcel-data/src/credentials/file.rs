//! Credentials kept in a JSON document on disk.

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, warn};
use serde_json::{Map, Value};

use parcel_core::{CREDENTIAL_NAMESPACE, CredentialStore, CredentialStoreError, Credentials};

use super::codec::{deobfuscate, obfuscate};

const API_KEY_FIELD: &str = "rapidapi_key_enc";
const BEARER_TOKEN_FIELD: &str = "bearer_token_enc";

/// [`CredentialStore`] backed by a JSON settings file.
///
/// The document maps namespaces to objects so that it can be shared with
/// other settings; only the [`CREDENTIAL_NAMESPACE`] entry is touched:
///
/// ```json
/// {"ZornadeParcelDownloader": {"rapidapi_key_enc": "ZRN_..._END", "bearer_token_enc": "ZRN_..._END"}}
/// ```
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: Utf8PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CredentialStoreError {
        CredentialStoreError::Io {
            location: self.path.to_string(),
            source,
        }
    }

    /// Current document, or an empty one if missing or unreadable.
    fn read_document(&self) -> Result<Map<String, Value>, CredentialStoreError> {
        let Some(text) = parcel_fs::read_optional(&self.path).map_err(|err| self.io_error(err))?
        else {
            return Ok(Map::new());
        };
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(document)) => Ok(document),
            Ok(_) | Err(_) => {
                warn!("ignoring malformed credential file {}", self.path);
                Ok(Map::new())
            }
        }
    }

    fn write_document(&self, document: Map<String, Value>) -> Result<(), CredentialStoreError> {
        let text = serde_json::to_string_pretty(&Value::Object(document)).map_err(|err| {
            CredentialStoreError::Encode {
                message: err.to_string(),
            }
        })?;
        parcel_fs::write_atomic(&self.path, text.as_bytes()).map_err(|err| self.io_error(err))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialStoreError> {
        let document = self.read_document()?;
        let Some(Value::Object(entry)) = document.get(CREDENTIAL_NAMESPACE) else {
            return Ok(None);
        };
        let secret = |field: &str| entry.get(field).and_then(Value::as_str).and_then(deobfuscate);
        let credentials = match (secret(API_KEY_FIELD), secret(BEARER_TOKEN_FIELD)) {
            (Some(api_key), Some(bearer_token)) => Credentials::new(api_key, bearer_token),
            _ => {
                debug!("credential entry in {} is incomplete", self.path);
                return Ok(None);
            }
        };
        Ok(credentials.is_complete().then_some(credentials))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialStoreError> {
        let mut document = self.read_document()?;
        let mut entry = Map::new();
        entry.insert(
            API_KEY_FIELD.to_owned(),
            Value::String(obfuscate(credentials.api_key().trim())),
        );
        entry.insert(
            BEARER_TOKEN_FIELD.to_owned(),
            Value::String(obfuscate(credentials.bearer_token().trim())),
        );
        document.insert(CREDENTIAL_NAMESPACE.to_owned(), Value::Object(entry));
        self.write_document(document)?;
        debug!("saved credentials to {}", self.path);
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        let mut document = self.read_document()?;
        if document.remove(CREDENTIAL_NAMESPACE).is_none() {
            return Ok(());
        }
        if document.is_empty() {
            parcel_fs::remove_if_exists(&self.path).map_err(|err| self.io_error(err))?;
            return Ok(());
        }
        self.write_document(document)
    }
}
