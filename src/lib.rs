//! Runtime for IPPcode22: a tagged value system, a three-frame variable model, a static
//! opcode dispatch table, and the execution loop that steps a program counter over an
//! already-loaded instruction vector.
//!
//! This crate does not read XML and does not parse command-line arguments; it consumes an
//! already-validated [`instruction::Instruction`] vector and a [`label::LabelTable`] built by
//! a loader, and drives them against caller-supplied I/O collaborators (see [`io`]).

pub mod error;
pub mod frame;
pub mod instruction;
pub mod io;
pub mod label;
pub mod program;
pub mod stats;
pub mod value;

pub use error::RuntimeError;
pub use frame::{FrameKind, Frames};
pub use instruction::{Arg, ArgKind, ExecState, Flow, Instruction, OpCode, RawArg, Symb};
pub use io::{Input, LineSource};
pub use label::LabelTable;
pub use program::Program;
pub use stats::{Metric, Stats};
pub use value::Value;
