use crate::error::RegistryError;
use ap_types::{AccountAddress, ContractTemplate};
#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Template lookup interface the aggregation pipeline consumes.
///
/// Absence is never an error here: a missing record means "no contracts of
/// this type", which the pipeline maps to an empty result.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait TemplateStore: Send + Sync {
    /// Latest metadata record for a contract type.
    fn latest(&self, name: &str) -> Result<Option<ContractTemplate>, RegistryError>;

    /// Metadata record for one deployed instance. When only the template
    /// record exists, it is re-addressed to the requested instance.
    fn instance(&self, name: &str, address: &AccountAddress) -> Result<Option<ContractTemplate>, RegistryError>;
}

/// One entry of the registry's instance listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceEntry {
    pub address: AccountAddress,
    /// Unix seconds of record creation, when the filesystem reports it.
    pub created_at: Option<u64>,
}

/// Directory-of-JSON-files metadata registry.
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    meta_dir: PathBuf,
}

impl ContractRegistry {
    pub fn new(meta_dir: impl Into<PathBuf>) -> Self {
        Self { meta_dir: meta_dir.into() }
    }

    fn contract_dir(&self, name: &str) -> PathBuf {
        self.meta_dir.join(name)
    }

    fn read_record(&self, path: &Path) -> Result<Option<ContractTemplate>, RegistryError> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RegistryError::Io { path: path.display().to_string(), source: e }),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| RegistryError::Parse { path: path.display().to_string(), source: e })
    }

    /// Every contract type with a metadata directory, sorted by name.
    pub fn contract_names(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.subdirs()?.into_iter().map(|(name, _)| name).collect())
    }

    /// Addresses of every uploaded instance record for a contract type.
    /// File stems that are not addresses (`Latest.json`, the template
    /// record) are skipped.
    pub fn instance_addresses(&self, name: &str) -> Result<Vec<AccountAddress>, RegistryError> {
        let dir = self.contract_dir(name);
        let mut addresses: Vec<AccountAddress> =
            self.json_stems(&dir)?.into_iter().filter_map(|(stem, _)| stem.parse().ok()).collect();
        addresses.sort();
        Ok(addresses)
    }

    /// Full name → instances listing, the index document of the metadata
    /// tree.
    pub fn directory(&self) -> Result<BTreeMap<String, Vec<InstanceEntry>>, RegistryError> {
        let mut tree = BTreeMap::new();
        for (name, dir) in self.subdirs()? {
            let mut entries: Vec<InstanceEntry> = self
                .json_stems(&dir)?
                .into_iter()
                .filter_map(|(stem, path)| {
                    let address: AccountAddress = stem.parse().ok()?;
                    let created_at = fs::metadata(&path)
                        .and_then(|meta| meta.created())
                        .ok()
                        .and_then(|created| created.duration_since(UNIX_EPOCH).ok())
                        .map(|since| since.as_secs());
                    Some(InstanceEntry { address, created_at })
                })
                .collect();
            entries.sort_by_key(|entry| entry.address);
            tree.insert(name, entries);
        }
        Ok(tree)
    }

    fn subdirs(&self) -> Result<Vec<(String, PathBuf)>, RegistryError> {
        let entries = fs::read_dir(&self.meta_dir)
            .map_err(|e| RegistryError::Io { path: self.meta_dir.display().to_string(), source: e })?;
        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RegistryError::Io { path: self.meta_dir.display().to_string(), source: e })?;
            if entry.path().is_dir() {
                if let Ok(name) = entry.file_name().into_string() {
                    dirs.push((name, entry.path()));
                }
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    fn json_stems(&self, dir: &Path) -> Result<Vec<(String, PathBuf)>, RegistryError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(RegistryError::Io { path: dir.display().to_string(), source: e }),
        };
        let mut stems = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RegistryError::Io { path: dir.display().to_string(), source: e })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    stems.push((stem.to_owned(), path.clone()));
                }
            }
        }
        Ok(stems)
    }
}

impl TemplateStore for ContractRegistry {
    fn latest(&self, name: &str) -> Result<Option<ContractTemplate>, RegistryError> {
        let dir = self.contract_dir(name);
        if let Some(template) = self.read_record(&dir.join("Latest.json"))? {
            return Ok(Some(template));
        }
        // Older upload tooling wrote the template record under the contract's
        // own name instead of Latest.
        tracing::debug!(contract = name, "no Latest record, trying the named template record");
        self.read_record(&dir.join(format!("{name}.json")))
    }

    fn instance(&self, name: &str, address: &AccountAddress) -> Result<Option<ContractTemplate>, RegistryError> {
        let dir = self.contract_dir(name);
        if let Some(template) = self.read_record(&dir.join(format!("{address}.json")))? {
            return Ok(Some(template));
        }
        tracing::debug!(contract = name, %address, "no record for this instance, re-addressing the template");
        Ok(self.latest(name)?.map(|template| template.with_address(*address)))
    }
}
