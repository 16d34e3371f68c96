use cat_consensus_core::{errors::TxDecodeError, sign::Error as SignError, tx::TransactionOutpoint};
use cat_covenants::CovenantError;
use cat_merkle::MerkleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error: {0}")]
    Custom(String),

    #[error("covenant rejected the transaction: {0}")]
    Covenant(#[from] CovenantError),

    #[error("signing error: {0}")]
    Sign(#[from] SignError),

    #[error("transaction decode error: {0}")]
    TxDecode(#[from] TxDecodeError),

    #[error("merkle tree error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("settings serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A provider or tracker call failed before producing a response.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("tracker error {code}: {msg}")]
    Tracker { code: i64, msg: String },

    #[error("timed out after {millis} ms fetching {what}")]
    Timeout { what: String, millis: u64 },

    #[error("insufficient funds: {required} satoshis required, {available} available")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("insufficient tokens: {required} required, {available} available")]
    InsufficientTokens { required: i64, available: i64 },

    #[error("minter supply is exhausted")]
    SupplyExhausted,

    #[error("no spendable fee UTXO")]
    NoFeeUtxo,

    #[error("no covenant registered for script {0}")]
    UnknownCovenant(String),

    #[error("unknown token {0}")]
    UnknownToken(String),

    #[error("transaction would have {0} inputs, at most {1} are allowed")]
    TooManyInputs(usize, usize),

    #[error("transaction would have {0} outputs, at most {1} are allowed")]
    TooManyOutputs(usize, usize),

    #[error("the signer did not sign input {0}")]
    MissingSignature(usize),

    #[error("no input of {0} can be traced to an accepted ancestor")]
    BacktraceNotFound(TransactionOutpoint),

    #[error("invalid amount {0}")]
    InvalidAmount(i64),

    #[error("invalid token id {0}")]
    InvalidTokenId(String),

    #[error("the transaction was already finalized")]
    AlreadyFinalized,
}

impl Error {
    pub fn custom<T: Into<String>>(msg: T) -> Self {
        Error::Custom(msg.into())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Custom(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Custom(value.to_string())
    }
}
