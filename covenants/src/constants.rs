//! Protocol limits shared by every covenant.

use cat_consensus_core::tx::{P2TR_SCRIPT_LEN, P2WPKH_SCRIPT_LEN};

/// Maximum number of inputs of a transaction spending a covenant.
pub const TX_INPUT_COUNT_MAX: usize = 6;
/// Maximum number of outputs of a transaction spending a covenant, state output included.
pub const TX_OUTPUT_COUNT_MAX: usize = 6;
/// Index of the output carrying the state hashes of the other outputs.
pub const STATE_OUTPUT_INDEX: usize = 0;
/// Number of outputs that may carry a state: every output but the state output.
pub const STATE_OUTPUT_COUNT_MAX: usize = TX_OUTPUT_COUNT_MAX - 1;

/// Maximum number of distinct token types one CAT20 guard can conserve.
pub const GUARD_TOKEN_TYPE_MAX: usize = 4;
/// Maximum number of distinct collections one CAT721 guard can conserve.
pub const NFT_GUARD_COLLECTION_TYPE_MAX: usize = 4;

/// Maximum number of next-minter outputs emitted by a CAT20 open minter.
pub const MAX_NEXT_MINTERS: usize = 2;

pub const OWNER_ADDR_P2WPKH_LEN: usize = P2WPKH_SCRIPT_LEN;
pub const OWNER_ADDR_P2TR_LEN: usize = P2TR_SCRIPT_LEN;
/// A contract owner is identified by the sha256 of its locking script.
pub const OWNER_ADDR_CONTRACT_HASH_LEN: usize = 32;

/// Leading push of the state output.
pub const STATE_MAGIC: &[u8] = b"cat";

/// Placeholders padding the unused slots of a guard's script table. No real locking
/// script is one byte long, so they can never collide with an actual type.
pub const SCRIPT_TABLE_SENTINELS: [[u8; 1]; GUARD_TOKEN_TYPE_MAX] = [[0xff], [0xfe], [0xfd], [0xfc]];

/// Script index of an input or output slot that does not hold an asset of the guard's kind.
pub const NOT_ASSET_INDEX: i8 = -1;
