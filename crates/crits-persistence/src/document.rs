//! ---
//! crits_section: "03-persistence-logging"
//! crits_subsection: "module"
//! crits_type: "source"
//! crits_scope: "code"
//! crits_description: "Persistence abstractions and storage bindings."
//! crits_version: "v0.0.0-prealpha"
//! crits_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use crits_security::Role;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::{PersistenceError, Result};

/// Current role document envelope version.
pub const DOCUMENT_VERSION: u16 = 1;

/// The role travels as a generic JSON value so the hash covers exactly what was
/// stored, including keys this build would drop when decoding a [`Role`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoleEnvelope {
    version: u16,
    saved_at: DateTime<Utc>,
    hash: String,
    role: Value,
}

/// Persist a role document to the provided filesystem path.
///
/// The serializer is selected based on file extension: `.cbor` writes CBOR,
/// all other extensions default to JSON. The file is written next to the
/// target and renamed into place so readers never observe a partial document.
pub fn save_document(role: &Role, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let payload = serde_json::to_value(role)?;
    let envelope = RoleEnvelope {
        version: DOCUMENT_VERSION,
        saved_at: Utc::now(),
        hash: compute_hash(&payload)?,
        role: payload,
    };

    let staging = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&staging)?);
        if is_cbor(path) {
            let bytes = serde_cbor::to_vec(&envelope).map_err(PersistenceError::from)?;
            writer.write_all(&bytes)?;
        } else {
            let json = serde_json::to_vec_pretty(&envelope)?;
            writer.write_all(&json)?;
        }
        writer.flush()?;
    }
    fs::rename(&staging, path)?;
    Ok(())
}

/// Load a role document from disk, rejecting it when the payload hash does not match.
pub fn load_document(path: &Path) -> Result<Role> {
    let envelope = load_envelope(path)?;
    if envelope.hash != compute_hash(&envelope.role)? {
        return Err(PersistenceError::HashMismatch(path.display().to_string()));
    }
    Ok(serde_json::from_value(envelope.role)?)
}

/// Verify the integrity of a role document.
pub fn verify_document(path: &Path) -> bool {
    match load_envelope(path) {
        Ok(envelope) => compute_hash(&envelope.role)
            .map(|hash| hash == envelope.hash)
            .unwrap_or(false),
        Err(_) => false,
    }
}

fn load_envelope(path: &Path) -> Result<RoleEnvelope> {
    let mut file = File::open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    let envelope = if is_cbor(path) {
        serde_cbor::from_slice(&bytes).map_err(PersistenceError::from)?
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok(envelope)
}

fn is_cbor(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("cbor")
}

// Object keys of `Value` are kept sorted, so the encoding is canonical.
fn compute_hash(payload: &Value) -> Result<String> {
    let serialized = serde_json::to_vec(payload)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized);
    Ok(hex::encode(hasher.finalize()))
}
