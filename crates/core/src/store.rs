//! Claims store abstraction.
//!
//! The pipeline only ever talks to a [`ClaimsStore`]. It can read and update claims, look up
//! reference records, read denial history, and append audit entries. [`InMemoryStore`] is the
//! bundled implementation. It backs the CLI and the REST server and can be loaded from and saved
//! to a JSON snapshot file.
//!
//! ## Snapshot layout
//!
//! ```text
//! {
//!   "claims": [...],
//!   "providers": [...],
//!   "payer_connections": [...],
//!   "billing_codes": [...],
//!   "denials": [...],
//!   "audit_log": [...]
//! }
//! ```

use crate::models::{
    AuditEntry, BillingCode, Claim, DateRange, DenialRecord, PayerConnection, Provider,
};
use crate::{DenialError, DenialResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::RwLock;

/// Repository over the claims and denials data.
///
/// `find_*` methods return `Ok(None)` for absent records; `Err` is reserved for store failures.
#[async_trait]
pub trait ClaimsStore: Send + Sync {
    async fn find_claim(&self, claim_id: &str) -> DenialResult<Option<Claim>>;

    /// Replaces the stored claim with the same id.
    ///
    /// Returns `DenialError::ClaimNotFound` if no such claim exists.
    async fn update_claim(&self, claim: &Claim) -> DenialResult<()>;

    async fn find_provider(&self, provider_id: &str) -> DenialResult<Option<Provider>>;

    async fn find_payer_connection(&self, payer_id: &str)
        -> DenialResult<Option<PayerConnection>>;

    async fn find_billing_code(&self, code: &str) -> DenialResult<Option<BillingCode>>;

    /// Denials whose `denial_date` falls within `range`, in stored order.
    async fn find_denials(&self, range: DateRange) -> DenialResult<Vec<DenialRecord>>;

    async fn insert_audit_entry(&self, entry: AuditEntry) -> DenialResult<()>;
}

/// Serialisable contents of an [`InMemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub providers: Vec<Provider>,
    #[serde(default)]
    pub payer_connections: Vec<PayerConnection>,
    #[serde(default)]
    pub billing_codes: Vec<BillingCode>,
    #[serde(default)]
    pub denials: Vec<DenialRecord>,
    #[serde(default)]
    pub audit_log: Vec<AuditEntry>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<StoreSnapshot>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
        }
    }

    /// Loads a store from a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::FileRead` if the file cannot be read and
    /// `DenialError::Deserialization` if its contents are not a valid snapshot.
    pub fn load_json_file(path: &Path) -> DenialResult<Self> {
        let contents = fs::read_to_string(path).map_err(DenialError::FileRead)?;
        let snapshot: StoreSnapshot =
            serde_json::from_str(&contents).map_err(DenialError::Deserialization)?;
        tracing::debug!(
            "loaded store snapshot from {}: {} claims, {} denials",
            path.display(),
            snapshot.claims.len(),
            snapshot.denials.len()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Writes the current contents to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `DenialError::Serialization` or `DenialError::FileWrite` on failure.
    pub fn save_json_file(&self, path: &Path) -> DenialResult<()> {
        let snapshot = self.snapshot()?;
        let json = serde_json::to_string_pretty(&snapshot).map_err(DenialError::Serialization)?;
        fs::write(path, json).map_err(DenialError::FileWrite)
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> DenialResult<StoreSnapshot> {
        Ok(self.read()?.clone())
    }

    fn read(&self) -> DenialResult<std::sync::RwLockReadGuard<'_, StoreSnapshot>> {
        self.data
            .read()
            .map_err(|_| DenialError::Store("store lock poisoned".into()))
    }

    fn write(&self) -> DenialResult<std::sync::RwLockWriteGuard<'_, StoreSnapshot>> {
        self.data
            .write()
            .map_err(|_| DenialError::Store("store lock poisoned".into()))
    }
}

#[async_trait]
impl ClaimsStore for InMemoryStore {
    async fn find_claim(&self, claim_id: &str) -> DenialResult<Option<Claim>> {
        Ok(self
            .read()?
            .claims
            .iter()
            .find(|c| c.id.as_str() == claim_id)
            .cloned())
    }

    async fn update_claim(&self, claim: &Claim) -> DenialResult<()> {
        let mut data = self.write()?;
        match data.claims.iter_mut().find(|c| c.id == claim.id) {
            Some(slot) => {
                *slot = claim.clone();
                Ok(())
            }
            None => Err(DenialError::ClaimNotFound(claim.id.to_string())),
        }
    }

    async fn find_provider(&self, provider_id: &str) -> DenialResult<Option<Provider>> {
        Ok(self
            .read()?
            .providers
            .iter()
            .find(|p| p.id.as_str() == provider_id)
            .cloned())
    }

    async fn find_payer_connection(
        &self,
        payer_id: &str,
    ) -> DenialResult<Option<PayerConnection>> {
        Ok(self
            .read()?
            .payer_connections
            .iter()
            .find(|p| p.payer_id.as_str() == payer_id)
            .cloned())
    }

    async fn find_billing_code(&self, code: &str) -> DenialResult<Option<BillingCode>> {
        Ok(self
            .read()?
            .billing_codes
            .iter()
            .find(|b| b.code.as_str() == code)
            .cloned())
    }

    async fn find_denials(&self, range: DateRange) -> DenialResult<Vec<DenialRecord>> {
        Ok(self
            .read()?
            .denials
            .iter()
            .filter(|d| range.contains(d.denial_date))
            .cloned()
            .collect())
    }

    async fn insert_audit_entry(&self, entry: AuditEntry) -> DenialResult<()> {
        self.write()?.audit_log.push(entry);
        Ok(())
    }
}
