//! Token feature configuration and contract selection.
//!
//! Tokens without optional features deploy the `standard` contract. Any
//! optional feature selects the `advanced` contract, a single extensible
//! contract whose constructor takes every feature switch.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::abi::AbiParam;
use crate::address::{parse_address, ZERO_ADDRESS};
use crate::error::EthError;
use crate::units::parse_units;

/// Upper bound for the transfer tax, in basis points.
pub const MAX_TAX_BPS: u16 = 10_000;

/// Which compiled contract a deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Standard,
    Advanced,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Standard => "standard",
            ContractType::Advanced => "advanced",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional token features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenFeatures {
    pub is_mintable: bool,
    pub is_burnable: bool,
    pub is_pausable: bool,
    pub is_capped: bool,
    /// Human-readable cap, required when `is_capped`.
    pub max_supply: Option<String>,
    pub is_taxable: bool,
    pub tax_rate_bps: u16,
    pub tax_recipient: Option<String>,
    pub is_blacklist_enabled: bool,
}

impl TokenFeatures {
    /// `true` if any optional feature is requested.
    pub fn any(&self) -> bool {
        self.is_mintable
            || self.is_burnable
            || self.is_pausable
            || self.is_capped
            || self.is_taxable
            || self.is_blacklist_enabled
    }

    pub fn contract_type(&self) -> ContractType {
        if self.any() {
            ContractType::Advanced
        } else {
            ContractType::Standard
        }
    }
}

/// Parameters for deploying a new token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDeployParams {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Human-readable initial supply, scaled by `10^decimals` on deploy.
    pub total_supply: String,
    /// Target EVM chain id.
    pub chain_id: u64,
    #[serde(default)]
    pub features: TokenFeatures,
}

/// Contract choice plus ABI-ready constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub contract_type: ContractType,
    pub constructor_args: Vec<AbiParam>,
}

/// Validates `params` and builds the constructor argument list.
///
/// Standard: `[name, symbol, decimals, supply]`.
/// Advanced: `[name, symbol, decimals, supply, isMintable, isBurnable,
/// isPausable, isCapped, maxSupply, isTaxable, taxRateBps, taxRecipient,
/// isBlacklistEnabled]`, where disabled features pass false, zero or the
/// zero address.
pub fn plan_deployment(params: &TokenDeployParams) -> Result<DeploymentPlan, EthError> {
    let name = params.name.trim();
    let symbol = params.symbol.trim();
    if name.is_empty() {
        return Err(EthError::InvalidParams("token name is required".into()));
    }
    if symbol.is_empty() {
        return Err(EthError::InvalidParams("token symbol is required".into()));
    }

    let supply = parse_units(&params.total_supply, params.decimals)?;
    if supply.is_zero() {
        return Err(EthError::InvalidParams("total supply must be > 0".into()));
    }

    let mut args = vec![
        AbiParam::String(name.to_string()),
        AbiParam::String(symbol.to_string()),
        AbiParam::Uint(U256::from(params.decimals)),
        AbiParam::Uint(supply),
    ];

    let features = &params.features;
    let contract_type = features.contract_type();
    if contract_type == ContractType::Standard {
        return Ok(DeploymentPlan {
            contract_type,
            constructor_args: args,
        });
    }

    let max_supply = if features.is_capped {
        let raw = features
            .max_supply
            .as_deref()
            .ok_or_else(|| EthError::InvalidParams("capped tokens need a max supply".into()))?;
        let cap = parse_units(raw, params.decimals)?;
        if cap < supply {
            return Err(EthError::InvalidParams(
                "max supply must be at least the initial supply".into(),
            ));
        }
        cap
    } else {
        U256::ZERO
    };

    let (tax_rate, tax_recipient) = if features.is_taxable {
        if features.tax_rate_bps == 0 || features.tax_rate_bps > MAX_TAX_BPS {
            return Err(EthError::InvalidParams(format!(
                "tax rate must be between 1 and {MAX_TAX_BPS} basis points"
            )));
        }
        let recipient = features
            .tax_recipient
            .as_deref()
            .ok_or_else(|| EthError::InvalidParams("taxable tokens need a tax recipient".into()))?;
        (features.tax_rate_bps, parse_address(recipient)?)
    } else {
        (0, ZERO_ADDRESS)
    };

    args.extend([
        AbiParam::Bool(features.is_mintable),
        AbiParam::Bool(features.is_burnable),
        AbiParam::Bool(features.is_pausable),
        AbiParam::Bool(features.is_capped),
        AbiParam::Uint(max_supply),
        AbiParam::Bool(features.is_taxable),
        AbiParam::Uint(U256::from(tax_rate)),
        AbiParam::Address(tax_recipient),
        AbiParam::Bool(features.is_blacklist_enabled),
    ]);

    Ok(DeploymentPlan {
        contract_type,
        constructor_args: args,
    })
}
