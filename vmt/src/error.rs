use crate::sort::Sort;
use thiserror::Error;

/// The single error type returned by every fallible operation in this crate.
///
/// Each variant corresponds to exactly one well-defined boundary: kernel
/// construction, model insertion, composition, renaming, or VMT-LIB I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmtError {
    #[error("expected a symbol, found a compound term")]
    NotSymbol,
    #[error("symbol `{0}` is already declared")]
    DuplicateDeclaration(String),
    #[error("symbol `{0}` is not declared in this model")]
    UndeclaredSymbol(String),
    #[error("expected type {expected:?}, found {found:?}")]
    TypeMismatch { expected: Sort, found: Sort },
    #[error("LTL operator found where none is allowed")]
    UnexpectedLtl,
    #[error("NEXT operator found where none is allowed")]
    UnexpectedNext,
    #[error("{0} is not a valid property index")]
    InvalidPropertyIdx(i64),
    #[error("duplicate property index {0}")]
    DuplicatePropertyIdx(u32),
    #[error("property with index {0} not found")]
    PropertyNotFound(u32),
    #[error("invalid property type annotation `{0}`")]
    InvalidPropertyType(String),
    #[error("operation applied to models or terms from different environments")]
    MismatchedEnvironment,
    #[error("annotation `{annotation}` must carry the value `true`, found `{found}`")]
    InvalidAnnotationValue { annotation: String, found: String },
    #[error("symbol name `{name}` does not match the expected pattern `{pattern}`")]
    IncorrectSymbolName { name: String, pattern: String },
    #[error("solver returned an answer this crate does not understand: {0}")]
    UnknownSolverAnswer(String),
    #[error("solver `{0}` is not configured")]
    SolverNotConfigured(String),
    #[error("solver executable `{0}` was not found")]
    SolverNotFound(String),
    #[error("no logic is available for this model")]
    NoLogicAvailable,
    #[error("invalid solver option `{0}`")]
    InvalidSolverOption(String),
    #[error("formula is not in the safety-LTL fragment")]
    NotSafetyLtl,
    #[error("a VMT-LIB script could not be parsed: {0}")]
    ParseError(String),
    #[error("I/O error while serializing or reading a model: {0}")]
    Io(String),
    #[error("trace already has a loopback step")]
    DuplicateLoopbackStep,
    #[error("trace has no loopback step")]
    MissingLoopbackStep,
    #[error("trace step {0} not found")]
    TraceStepNotFound(usize),
    #[error("cannot evaluate NEXT at the last step of a trace with no loopback")]
    NoNextStep,
}

impl From<std::fmt::Error> for VmtError {
    fn from(e: std::fmt::Error) -> Self {
        VmtError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VmtError>;
