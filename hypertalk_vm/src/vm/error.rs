//! Runtime errors produced during VM execution.

/// Runtime errors. The first failure aborts the run and surfaces to the
/// host; nothing is caught inside the VM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A stack access fell outside the live stack, or a frame's
    /// bookkeeping cells were not where the calling convention puts them
    StackIndexOutOfRange,
    TooFewOperands,
    TooManyOperands,
    ZeroDivision,
    /// No handler or builtin with this name in the selected namespace
    UnknownMessage { name: String, is_command: bool },
    /// The program counter left the instruction vector
    UnknownInstruction,
    /// `put`/`add`/`subtract` destination was not a writable container
    InvalidPutDestination,
    /// The run finished with values left above the expected result cell
    StackNotCleanedUpAtEndOfCall { excess: usize },
    UnknownProperty { name: String },
    ReadOnlyProperty { name: String },
    /// A weak native-object handle whose owner has dropped the object
    ObjectDoesNotExist,
    /// The configured stack depth cap was exceeded
    StackOverflow,
    // Coercion errors
    ExpectedIntegerHere,
    ExpectedNumberHere,
    ExpectedBooleanHere,
    // A user expression reached a frame-bookkeeping cell
    InstructionIndexAccessed,
    StackIndexAccessed,
    ParameterCountAccessed,
    NativeObjectAccessed,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StackIndexOutOfRange => write!(f, "stack index out of range"),
            Self::TooFewOperands => write!(f, "too few operands"),
            Self::TooManyOperands => write!(f, "too many operands"),
            Self::ZeroDivision => write!(f, "division by zero"),
            Self::UnknownMessage { name, is_command } => {
                let kind = if *is_command { "command" } else { "function" };
                write!(f, "unknown {} '{}'", kind, name)
            }
            Self::UnknownInstruction => write!(f, "unknown instruction"),
            Self::InvalidPutDestination => write!(f, "destination is not a container"),
            Self::StackNotCleanedUpAtEndOfCall { excess } => {
                write!(f, "{} values left on stack at end of call", excess)
            }
            Self::UnknownProperty { name } => write!(f, "unknown property '{}'", name),
            Self::ReadOnlyProperty { name } => {
                write!(f, "property '{}' is read-only", name)
            }
            Self::ObjectDoesNotExist => write!(f, "object does not exist"),
            Self::StackOverflow => write!(f, "stack overflow"),
            Self::ExpectedIntegerHere => write!(f, "expected an integer here"),
            Self::ExpectedNumberHere => write!(f, "expected a number here"),
            Self::ExpectedBooleanHere => write!(f, "expected a boolean here"),
            Self::InstructionIndexAccessed => {
                write!(f, "internal: instruction index accessed as a value")
            }
            Self::StackIndexAccessed => {
                write!(f, "internal: stack index accessed as a value")
            }
            Self::ParameterCountAccessed => {
                write!(f, "internal: parameter count accessed as a value")
            }
            Self::NativeObjectAccessed => {
                write!(f, "internal: native object accessed as a plain value")
            }
        }
    }
}

impl std::error::Error for RuntimeError {}
