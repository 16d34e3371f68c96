use cat_consensus_core::{
    errors::{ScriptError, TxDecodeError},
    sign,
};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CovenantError {
    #[error("input {index}: {source}")]
    Input {
        index: usize,
        #[source]
        source: Box<CovenantError>,
    },

    #[error("failed to decode {0}: {1}")]
    Decode(&'static str, String),

    #[error("transaction decoding: {0}")]
    TxDecode(#[from] TxDecodeError),

    #[error("script: {0}")]
    Script(#[from] ScriptError),

    #[error("signature: {0}")]
    Signature(#[from] sign::Error),

    #[error("{0} entries provided for {1} inputs")]
    EntriesLengthMismatch(usize, usize),

    #[error("too many inputs: {0}")]
    TooManyInputs(usize),

    #[error("too many outputs: {0}")]
    TooManyOutputs(usize),

    #[error("outputs spend {outputs} but inputs only provide {inputs}")]
    OutputValueExceedsInputs { inputs: u64, outputs: u64 },

    #[error("covenant program does not match the spent script")]
    ProgramMismatch,

    #[error("call {call} cannot unlock a {descriptor} covenant")]
    CallMismatch { call: &'static str, descriptor: &'static str },

    #[error("index {0} is out of range for {1}")]
    IndexOutOfRange(usize, &'static str),

    #[error("invalid state output: {0}")]
    InvalidStateOutput(&'static str),

    #[error("state hash of output {0} does not match")]
    StateHashMismatch(u32),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("invalid owner address of {0} bytes")]
    InvalidOwnerAddr(usize),

    #[error("contract owner input does not hash to the owner address")]
    ContractOwnerMismatch,

    #[error("previous transaction id does not match the spent outpoint")]
    PrevTxIdMismatch,

    #[error("previous-previous transaction id does not match the traced outpoint")]
    PrevPrevTxIdMismatch,

    #[error("traced script is neither the covenant itself nor its ancestor")]
    BacktraceScriptMismatch,

    #[error("genesis minter must be created at output 1, found at {0}")]
    GenesisOutputIndex(u32),

    #[error("minter created at genesis does not carry its initial state")]
    NotInitialState,

    #[error("guard input {0} is not the configured guard")]
    GuardScriptMismatch(usize),

    #[error("guard does not declare the state of input {0}")]
    GuardStateHashMismatch(usize),

    #[error("guard script index for input {0} does not point to this covenant")]
    GuardIndexMismatch(usize),

    #[error("guard declares a state for its own input {0}")]
    GuardSelfReference(usize),

    #[error("invalid script table: {0}")]
    InvalidScriptTable(&'static str),

    #[error("script index {index} of slot {slot} is out of range")]
    ScriptIndexOutOfRange { slot: usize, index: i8 },

    #[error("input {0} does not spend the script declared for it")]
    InputScriptMismatch(usize),

    #[error("input {0} state does not hash to the declared state hash")]
    InputStateMismatch(usize),

    #[error("non-asset slot {0} carries asset data")]
    NonAssetSlotNotEmpty(usize),

    #[error("highest script index observed is {observed}, expected {expected}")]
    MaxIndexMismatch { observed: i8, expected: i8 },

    #[error("invalid output count {0}")]
    InvalidOutputCount(usize),

    #[error("output slot {0} disguises an asset script as a plain output")]
    OutputScriptCollision(usize),

    #[error("undeclared output slot {0} is not empty")]
    UndeclaredSlotNotEmpty(usize),

    #[error("amount overflow")]
    AmountOverflow,

    #[error("conservation violated for type {0}")]
    ConservationViolated(usize),

    #[error("output slot {0} carries an nft that is not among the inputs")]
    NftNotFound(usize),

    #[error("{inputs} nfts in, {outputs} nfts out")]
    NftCountMismatch { inputs: usize, outputs: usize },

    #[error("transaction outputs differ from the outputs the covenant allows")]
    OutputsMismatch,

    #[error("state token script does not belong to this minter")]
    TokenScriptMismatch,

    #[error("mint amount {actual} differs from {expected}")]
    MintAmountMismatch { expected: i32, actual: i32 },

    #[error("next remaining counts do not add up")]
    RemainingCountMismatch,

    #[error("supply exhausted")]
    SupplyExhausted,

    #[error("merkle proof does not authenticate the leaf")]
    MerkleProofInvalid,

    #[error("leaf does not match the next mint")]
    LeafMismatch,
}

impl CovenantError {
    pub fn at_input(self, index: usize) -> Self {
        CovenantError::Input { index, source: Box::new(self) }
    }

    /// The error with any input wrapping removed.
    pub fn root_cause(&self) -> &CovenantError {
        match self {
            CovenantError::Input { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for CovenantError {
    fn from(err: std::io::Error) -> Self {
        CovenantError::Decode("borsh payload", err.to_string())
    }
}
