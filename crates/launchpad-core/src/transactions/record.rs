use serde::{Deserialize, Serialize};

use crate::chains::ChainId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Deployment,
    Transfer,
    Approval,
    Multisend,
    Mint,
    Burn,
    Pause,
    Unpause,
    TransferOwnership,
    RevokeAuthority,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

/// One tracked transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: String,
    /// Empty until the wallet has signed.
    #[serde(default)]
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub status: TxStatus,
    pub description: String,
    pub chain_id: ChainId,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl TransactionRecord {
    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }

    /// Pending with a known hash, so a poller should be running.
    pub fn needs_polling(&self) -> bool {
        self.is_pending() && !self.hash.is_empty()
    }

    pub(crate) fn fill_explorer_url(&mut self) {
        if self.explorer_url.is_none() && !self.hash.is_empty() {
            self.explorer_url = Some(self.chain_id.explorer_tx_url(&self.hash));
        }
    }
}

/// Caller-supplied fields of a new record. The store assigns `id` and
/// `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub hash: String,
    pub kind: TxKind,
    pub status: TxStatus,
    pub description: String,
    pub chain_id: ChainId,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<String>,
    pub explorer_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewTransaction {
    /// A pending transaction with no optional fields.
    pub fn pending(
        kind: TxKind,
        chain_id: ChainId,
        hash: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            hash: hash.into(),
            kind,
            status: TxStatus::Pending,
            description: description.into(),
            chain_id,
            from: None,
            to: None,
            value: None,
            explorer_url: None,
            metadata: None,
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub(crate) fn into_record(self, id: String, timestamp: i64) -> TransactionRecord {
        let mut record = TransactionRecord {
            id,
            hash: self.hash,
            kind: self.kind,
            status: self.status,
            description: self.description,
            chain_id: self.chain_id,
            timestamp,
            from: self.from,
            to: self.to,
            value: self.value,
            gas_used: None,
            block_number: None,
            confirmations: None,
            error: None,
            explorer_url: self.explorer_url,
            metadata: self.metadata,
        };
        record.fill_explorer_url();
        record
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub hash: Option<String>,
    pub status: Option<TxStatus>,
    pub description: Option<String>,
    pub to: Option<String>,
    pub gas_used: Option<u64>,
    pub block_number: Option<u64>,
    pub confirmations: Option<u64>,
    pub error: Option<String>,
    pub explorer_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl TransactionPatch {
    pub fn hash(hash: impl Into<String>) -> Self {
        Self {
            hash: Some(hash.into()),
            ..Default::default()
        }
    }

    pub fn confirmed(block_number: Option<u64>, gas_used: Option<u64>) -> Self {
        Self {
            status: Some(TxStatus::Confirmed),
            block_number,
            gas_used,
            ..Default::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(TxStatus::Failed),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// What applying a patch changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PatchEffect {
    pub became_terminal: bool,
    pub hash_assigned: bool,
    /// The patch tried to move a terminal status and was ignored for it.
    pub status_rejected: bool,
}

impl TransactionRecord {
    /// Merges `patch`, field by field. Terminal statuses are final.
    pub(crate) fn apply(&mut self, patch: TransactionPatch) -> PatchEffect {
        let mut effect = PatchEffect::default();

        if let Some(status) = patch.status {
            if self.status.is_terminal() {
                effect.status_rejected = status != self.status;
            } else if status.is_terminal() {
                self.status = status;
                effect.became_terminal = true;
            }
        }
        if let Some(hash) = patch.hash {
            if !hash.is_empty() && self.hash != hash {
                effect.hash_assigned = true;
                self.hash = hash;
                if patch.explorer_url.is_none() {
                    self.explorer_url = None;
                }
            }
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(to) = patch.to {
            self.to = Some(to);
        }
        if let Some(gas_used) = patch.gas_used {
            self.gas_used = Some(gas_used);
        }
        if let Some(block_number) = patch.block_number {
            self.block_number = Some(block_number);
        }
        if let Some(confirmations) = patch.confirmations {
            self.confirmations = Some(confirmations);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        if let Some(url) = patch.explorer_url {
            self.explorer_url = Some(url);
        }
        if let Some(metadata) = patch.metadata {
            self.metadata = Some(metadata);
        }
        self.fill_explorer_url();
        effect
    }
}
