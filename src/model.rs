use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// File holding a lock's name inside a lock source/destination directory.
pub const NAME_FILE: &str = "name";
/// File holding a lock's payload inside a lock source/destination directory.
pub const METADATA_FILE: &str = "metadata";

/// Immutable identifier of one committed pool state (a commit hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<git2::Oid> for Revision {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

/// A named token with an opaque payload that is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub name: String,
    pub payload: Vec<u8>,
}

impl Lock {
    pub fn new(name: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Read a lock from a directory holding a `name` file and an optional
    /// `metadata` file.
    pub fn read_from(dir: &Path) -> Result<Self> {
        let name_path = dir.join(NAME_FILE);
        let name = fs::read_to_string(&name_path).map_err(|e| PoolError::LockSource {
            path: name_path.display().to_string(),
            message: e.to_string(),
        })?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PoolError::LockSource {
                path: name_path.display().to_string(),
                message: "lock name is empty".into(),
            });
        }

        let payload = match fs::read(dir.join(METADATA_FILE)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self { name, payload })
    }

    /// Materialize the lock as `name` + `metadata` files under `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(NAME_FILE), &self.name)?;
        fs::write(dir.join(METADATA_FILE), &self.payload)?;
        Ok(())
    }
}

/// Outcome of a successful transition. A claim's receipt is the ticket a
/// later release or remove targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub lock_name: String,
    pub pool_name: String,
    pub revision: Revision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "ref")]
    pub reference: Revision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPair {
    pub name: String,
    pub value: String,
}

/// Response written for `in` and `out`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub version: Version,
    pub metadata: Vec<MetadataPair>,
}

impl From<&Receipt> for Response {
    fn from(receipt: &Receipt) -> Self {
        Self {
            version: Version {
                reference: receipt.revision.clone(),
            },
            metadata: vec![
                MetadataPair {
                    name: "lock_name".into(),
                    value: receipt.lock_name.clone(),
                },
                MetadataPair {
                    name: "pool_name".into(),
                    value: receipt.pool_name.clone(),
                },
            ],
        }
    }
}
