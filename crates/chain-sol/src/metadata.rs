//! Token metadata updates (Metaplex Token Metadata program).
//!
//! An update runs in two phases. First the logo and the off-chain JSON
//! document are uploaded through a [`MetadataStorage`]. Only when both
//! uploads succeed is `UpdateMetadataAccountV2` submitted pointing at the
//! new JSON URI. A failed upload never reaches the wallet.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::address::Pubkey;
use crate::client::SolanaClient;
use crate::error::SolError;
use crate::spl_token::find_program_address;
use crate::transaction::{AccountMeta, Instruction};

/// `metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s`
pub const METADATA_PROGRAM_ID: Pubkey = Pubkey::new([
    0x0b, 0x70, 0x65, 0xb1, 0xe3, 0xd1, 0x7c, 0x45, 0x38, 0x9d, 0x52, 0x7f, 0x6b, 0x04, 0xc3,
    0xcd, 0x58, 0xb8, 0x6c, 0x73, 0x1a, 0xa0, 0xfd, 0xb5, 0x49, 0xb6, 0xd1, 0xbc, 0x03, 0xf8,
    0x29, 0x46,
]);

pub const MAX_NAME_LENGTH: usize = 32;
pub const MAX_SYMBOL_LENGTH: usize = 10;
pub const MAX_URI_LENGTH: usize = 200;

const IX_UPDATE_METADATA_ACCOUNT_V2: u8 = 15;

/// Content-addressed storage for logos and metadata documents.
#[async_trait]
pub trait MetadataStorage: Send + Sync {
    /// Uploads a file and returns its public URI.
    async fn upload_file(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, SolError>;

    /// Uploads a JSON document and returns its public URI.
    async fn upload_json(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<String, SolError>;
}

#[async_trait]
impl<T: MetadataStorage + ?Sized> MetadataStorage for Arc<T> {
    async fn upload_file(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, SolError> {
        (**self).upload_file(file_name, content_type, bytes).await
    }

    async fn upload_json(
        &self,
        name: &str,
        document: &serde_json::Value,
    ) -> Result<String, SolError> {
        (**self).upload_json(name, document).await
    }
}

/// On-chain `DataV2` fields this crate writes. Creators, collection and uses
/// are always left unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataV2 {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
}

impl DataV2 {
    pub fn validate(&self) -> Result<(), SolError> {
        let check = |field: &str, value: &str, max: usize| {
            if value.len() > max {
                Err(SolError::TransactionBuildError(format!(
                    "{field} is {} bytes, limit is {max}",
                    value.len()
                )))
            } else {
                Ok(())
            }
        };
        check("name", &self.name, MAX_NAME_LENGTH)?;
        check("symbol", &self.symbol, MAX_SYMBOL_LENGTH)?;
        check("uri", &self.uri, MAX_URI_LENGTH)
    }
}

// Borsh: u32 little-endian length prefix.
fn put_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
}

/// Metadata account PDA of `mint`.
pub fn metadata_address(mint: &Pubkey) -> Result<Pubkey, SolError> {
    find_program_address(
        &[b"metadata", METADATA_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METADATA_PROGRAM_ID,
    )
    .map(|(address, _)| address)
}

/// `UpdateMetadataAccountV2` replacing the data and leaving update
/// authority, primary-sale flag and mutability unchanged.
pub fn update_metadata_account_v2(
    mint: &Pubkey,
    update_authority: &Pubkey,
    data: &DataV2,
) -> Result<Instruction, SolError> {
    data.validate()?;

    let mut buf = Vec::with_capacity(64 + data.uri.len());
    buf.push(IX_UPDATE_METADATA_ACCOUNT_V2);
    buf.push(1); // Some(data)
    put_string(&mut buf, &data.name);
    put_string(&mut buf, &data.symbol);
    put_string(&mut buf, &data.uri);
    buf.extend_from_slice(&data.seller_fee_basis_points.to_le_bytes());
    buf.extend_from_slice(&[0, 0, 0]); // creators, collection, uses
    buf.extend_from_slice(&[0, 0, 0]); // new authority, primary sale, is_mutable

    Ok(Instruction {
        program_id: METADATA_PROGRAM_ID,
        accounts: vec![
            AccountMeta::writable(metadata_address(mint)?, false),
            AccountMeta::readonly(*update_authority, true),
        ],
        data: buf,
    })
}

/// A logo to upload alongside the metadata.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Requested metadata change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub description: String,
    /// Existing logo URI, kept when no new image is uploaded.
    pub image_uri: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    #[serde(skip)]
    pub image: Option<ImageUpload>,
}

impl MetadataUpdate {
    /// Off-chain JSON document in the Metaplex fungible-token format.
    pub fn document(&self, image_uri: Option<&str>) -> serde_json::Value {
        let mut doc = json!({
            "name": self.name,
            "symbol": self.symbol,
            "description": self.description,
        });
        if let Some(uri) = image_uri {
            doc["image"] = json!(uri);
        }
        let mut extensions = serde_json::Map::new();
        for (key, value) in [
            ("website", &self.website),
            ("twitter", &self.twitter),
            ("telegram", &self.telegram),
        ] {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                extensions.insert(key.to_string(), json!(v));
            }
        }
        if !extensions.is_empty() {
            doc["extensions"] = serde_json::Value::Object(extensions);
        }
        doc
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataOutcome {
    pub image_uri: Option<String>,
    pub metadata_uri: String,
    pub signature: String,
}

pub struct MetadataUpdater<S> {
    client: SolanaClient,
    storage: S,
}

impl<S: MetadataStorage> MetadataUpdater<S> {
    pub fn new(client: SolanaClient, storage: S) -> Self {
        Self { client, storage }
    }

    pub async fn update(
        &self,
        mint: &Pubkey,
        update: &MetadataUpdate,
    ) -> Result<MetadataOutcome, SolError> {
        let signer = self.client.signer()?;
        let name = update.name.trim();
        let symbol = update.symbol.trim();
        if name.is_empty() || symbol.is_empty() {
            return Err(SolError::TransactionBuildError(
                "name and symbol are required".into(),
            ));
        }
        let mut data = DataV2 {
            name: name.to_string(),
            symbol: symbol.to_string(),
            uri: String::new(),
            seller_fee_basis_points: 0,
        };
        data.validate()?;

        let image_uri = match &update.image {
            Some(image) => Some(
                self.storage
                    .upload_file(&image.file_name, &image.content_type, image.bytes.clone())
                    .await
                    .map_err(upload_error)?,
            ),
            None => update.image_uri.clone(),
        };
        let document = update.document(image_uri.as_deref());
        let metadata_uri = self
            .storage
            .upload_json(&format!("{symbol}-metadata.json"), &document)
            .await
            .map_err(upload_error)?;
        info!(%mint, uri = %metadata_uri, "metadata uploaded");

        data.uri = metadata_uri.clone();
        let ix = update_metadata_account_v2(mint, &signer, &data)?;
        let signature = self.client.submit(&[ix]).await?;
        info!(%mint, %signature, "metadata updated");

        Ok(MetadataOutcome {
            image_uri,
            metadata_uri,
            signature,
        })
    }
}

fn upload_error(err: SolError) -> SolError {
    match err {
        SolError::MetadataUpload(_) => err,
        other => SolError::MetadataUpload(other.to_string()),
    }
}
