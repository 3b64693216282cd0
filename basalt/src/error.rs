use thiserror::Error as ThisError;

use crate::Value;

/// Numeric codes for the in-band error channel. The interpreter stores the
/// raised code in its error register, where handlers and the host can read
/// it after the fact.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i64)]
pub enum ErrorCode {
    ValueNotPresent = 1001,
    ListIndexOutOfRange = 1300,
    ListIsEmpty = 1301,
    MapKeyNotFound = 1400,
    InvalidArgument = 1500,
    InvalidNumberFormat = 1501,
    DivisionByZero = 1502,
    IoFailure = 1600,
    InternalTypeConfusion = 9000,
}

impl ErrorCode {
    pub fn value(self) -> Value {
        Value::from(self as i64)
    }
}

/// A recoverable, program-visible error. System calls and the dotted
/// expression assignment report failure with one of these; the interpreter
/// stores the code/message pair and lets the error-handling opcodes drive
/// control flow from there. Never surfaced as `Err` from `run`.
#[derive(Debug, Clone, ThisError)]
#[error("{message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Fatal conditions. These mean the compiled program is corrupt or
/// incompatible; the interpreter cannot continue and the host must abort
/// the run. They are never visible to the guest program.
#[derive(Debug, ThisError)]
pub enum Fault {
    #[error("value stack overflow")]
    ValueStackOverflow,
    #[error("object stack overflow")]
    ObjectStackOverflow,
    #[error("value stack underflow")]
    ValueStackUnderflow,
    #[error("object stack underflow")]
    ObjectStackUnderflow,
    #[error("object stack slot {0} is empty")]
    EmptyObjectSlot(usize),
    #[error("unknown opcode {0:#04x} at offset {1}")]
    UnknownOpcode(u8, usize),
    #[error("instruction stream ended unexpectedly at offset {0}")]
    TruncatedInstructions(usize),
    #[error("expected {expected} on the stack, found {found}")]
    TypeConfusion {
        expected: &'static str,
        found: &'static str,
    },
    #[error("procedure index {0} out of range")]
    BadProcedureIndex(usize),
    #[error("global slot index {0} out of range")]
    BadGlobalIndex(usize),
    #[error("record field index {0} out of range")]
    RecordIndexOutOfRange(usize),
    #[error("call stack is empty")]
    EmptyCallStack,
    #[error("unknown system call {0}")]
    UnknownSystemCall(u16),
    #[error("malformed dotted expression: {0}")]
    MalformedDottedExpression(&'static str),
    #[error("malformed program image: {0}")]
    MalformedProgram(&'static str),
    #[error("console i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
