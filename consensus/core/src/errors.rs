use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxDecodeError {
    #[error("unexpected end of data while reading {0}")]
    Truncated(&'static str),

    #[error("invalid segwit flag {0:#04x}")]
    InvalidSegwitFlag(u8),

    #[error("segwit marker present but every witness stack is empty")]
    SuperfluousWitness,

    #[error("non-canonical compact size encoding")]
    NonCanonicalCompactSize,

    #[error("{0} trailing bytes after the transaction")]
    TrailingBytes(usize),

    #[error("invalid hex: {0}")]
    Hex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("push at offset {0} runs past the end of the script")]
    TruncatedPush(usize),

    #[error("non-push opcode {opcode:#04x} at offset {offset}")]
    NonPushOpcode { opcode: u8, offset: usize },

    #[error("script does not start with OP_RETURN")]
    NotOpReturn,
}
