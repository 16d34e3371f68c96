//!
//! This file contains most common imports that
//! are used internally in the wallet framework core.
//!

pub use crate::error::Error;
pub use crate::provider::{ChainProvider, Utxo, UtxoFilter, UtxoProvider};
pub use crate::registry::{CovenantRegistry, TokenInfo};
pub use crate::result::Result;
pub use crate::settings::WalletSettings;
pub use crate::signer::Signer;

pub use async_trait::async_trait;
pub use borsh::{BorshDeserialize, BorshSerialize};
pub use cat_consensus_core::tx::{
    ScriptPublicKey, Transaction, TransactionId, TransactionInput, TransactionOutpoint, TransactionOutput, UtxoEntry,
};
pub use cat_core::{debug, info, trace, warn};
pub use cat_covenants::{CovenantCall, CovenantDescriptor};
pub use futures::future::{join_all, try_join_all};
pub use serde::{Deserialize, Serialize};
pub use std::collections::{HashMap, HashSet};
pub use std::str::FromStr;
pub use std::sync::{Arc, Mutex, RwLock};
pub use std::time::Duration;
