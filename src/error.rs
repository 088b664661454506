use std::fmt;

/// The type tag used in diagnostics and in `TYPE`/error messages.
pub type TypeName = &'static str;

/// A fault raised while defining, resolving, or executing against the runtime state.
///
/// Each variant corresponds 1:1 with one of the interpreter's exit codes; see
/// [`RuntimeError::exit_code`].
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum RuntimeError {
    /// A label is declared more than once, or a variable is `DEFVAR`'d twice in the same frame.
    Redefinition(String),
    /// `LF`/`TF` was addressed while undefined (empty local stack, or `TF` never created).
    FrameUndefined(&'static str),
    /// A variable name was referenced that was never `DEFVAR`'d in its frame.
    VariableUndefined(String),
    /// A variable, call stack, or data stack was read before anything was stored into it.
    ValueMissing,
    /// An operand had the wrong `Value` variant for the operation.
    OperandType { expected: TypeName, found: TypeName },
    /// An operand had the right type but an invalid value (zero divisor, out-of-range exit code).
    OperandValue(String),
    /// A string operation (`STRI2INT`/`GETCHAR`/`SETCHAR`/`INT2CHAR`) was given an out-of-range
    /// index or code point, or an empty source where a character was required.
    StringOperation(String),
    /// A jump referenced a label name absent from the label table.
    LabelUndefined(String),
    /// An instruction was dispatched with fewer arguments than its opcode requires. Detected at
    /// execution time, not load time, but still reported as an XML-structure fault (exit 32):
    /// a dead instruction with the wrong shape never runs and never surfaces this.
    ArgumentCount { expected: usize, found: usize },
    /// `EXIT` accepted its operand and the process should terminate with this status.
    Exit(i32),
}

impl RuntimeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RuntimeError::Redefinition(_) => 52,
            RuntimeError::LabelUndefined(_) => 52,
            RuntimeError::OperandType { .. } => 53,
            RuntimeError::VariableUndefined(_) => 54,
            RuntimeError::FrameUndefined(_) => 55,
            RuntimeError::ValueMissing => 56,
            RuntimeError::OperandValue(_) => 57,
            RuntimeError::StringOperation(_) => 58,
            RuntimeError::ArgumentCount { .. } => 32,
            RuntimeError::Exit(code) => *code,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RuntimeError::Redefinition(what) => write!(f, "redefinition of {}", what),
            RuntimeError::FrameUndefined(frame) => write!(f, "frame {} is not defined", frame),
            RuntimeError::VariableUndefined(name) => {
                write!(f, "variable {} is not defined", name)
            }
            RuntimeError::ValueMissing => write!(f, "missing value"),
            RuntimeError::OperandType { expected, found } => write!(
                f,
                "operand type error: expected {}, found {}",
                expected, found
            ),
            RuntimeError::OperandValue(msg) => write!(f, "invalid operand value: {}", msg),
            RuntimeError::StringOperation(msg) => write!(f, "invalid string operation: {}", msg),
            RuntimeError::LabelUndefined(name) => write!(f, "undefined label {}", name),
            RuntimeError::ArgumentCount { expected, found } => write!(
                f,
                "instruction expects {} argument(s), found {}",
                expected, found
            ),
            RuntimeError::Exit(code) => write!(f, "exit({})", code),
        }
    }
}

impl std::error::Error for RuntimeError {}
