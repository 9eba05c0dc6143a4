//! EVM chain support for the token launchpad.
//!
//! This crate provides:
//! - EIP-55 address validation
//! - Minimal ABI encoding (static types plus dynamic strings)
//! - Decimal <-> base-unit scaling bounded to 18 decimals
//! - Contract selection and constructor arguments for token deployment
//! - An EIP-1193 provider port, a typed client and an HTTP JSON-RPC provider
//! - Deployment and token management (mint, burn, pause, blacklist, roles,
//!   ownership) through the connected wallet

pub mod abi;
pub mod address;
pub mod chains;
pub mod deployer;
pub mod erc20;
pub mod error;
pub mod provider;
pub mod token;
pub mod tools;
pub mod units;

pub use deployer::{CompiledContract, ContractSource, DeployResult, EvmDeployer};
pub use error::{EthError, RpcError};
pub use provider::{EvmClient, EvmProvider, HttpRpcProvider, ProviderEvent, TransactionReceipt};
pub use token::{plan_deployment, ContractType, DeploymentPlan, TokenDeployParams, TokenFeatures};
pub use tools::{TokenAction, TokenTools};
