use std::cmp::Ordering;

use util::{EnumFromStr, ParseEnumError};

use crate::error::RuntimeError;
use crate::frame::{FrameKind, Frames};
use crate::io::LineSource;
use crate::label::LabelTable;
use crate::value::Value;

/// Every recognized opcode, normalized from the case-insensitive mnemonic in the source XML.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum OpCode {
    Move,
    Createframe,
    Pushframe,
    Popframe,
    Defvar,
    Call,
    Return,
    Pushs,
    Pops,
    Add,
    Sub,
    Mul,
    Idiv,
    Div,
    Lt,
    Gt,
    Eq,
    And,
    Or,
    Not,
    Int2char,
    Stri2int,
    Int2float,
    Float2int,
    Read,
    Write,
    Concat,
    Strlen,
    Getchar,
    Setchar,
    Type,
    Label,
    Jump,
    Jumpifeq,
    Jumpifneq,
    Exit,
    Dprint,
    Break,
}

impl EnumFromStr for OpCode {
    fn from_str(s: &str) -> Result<Self, ParseEnumError> {
        let op = match s.to_ascii_uppercase().as_str() {
            "MOVE" => OpCode::Move,
            "CREATEFRAME" => OpCode::Createframe,
            "PUSHFRAME" => OpCode::Pushframe,
            "POPFRAME" => OpCode::Popframe,
            "DEFVAR" => OpCode::Defvar,
            "CALL" => OpCode::Call,
            "RETURN" => OpCode::Return,
            "PUSHS" => OpCode::Pushs,
            "POPS" => OpCode::Pops,
            "ADD" => OpCode::Add,
            "SUB" => OpCode::Sub,
            "MUL" => OpCode::Mul,
            "IDIV" => OpCode::Idiv,
            "DIV" => OpCode::Div,
            "LT" => OpCode::Lt,
            "GT" => OpCode::Gt,
            "EQ" => OpCode::Eq,
            "AND" => OpCode::And,
            "OR" => OpCode::Or,
            "NOT" => OpCode::Not,
            "INT2CHAR" => OpCode::Int2char,
            "STRI2INT" => OpCode::Stri2int,
            "INT2FLOAT" => OpCode::Int2float,
            "FLOAT2INT" => OpCode::Float2int,
            "READ" => OpCode::Read,
            "WRITE" => OpCode::Write,
            "CONCAT" => OpCode::Concat,
            "STRLEN" => OpCode::Strlen,
            "GETCHAR" => OpCode::Getchar,
            "SETCHAR" => OpCode::Setchar,
            "TYPE" => OpCode::Type,
            "LABEL" => OpCode::Label,
            "JUMP" => OpCode::Jump,
            "JUMPIFEQ" => OpCode::Jumpifeq,
            "JUMPIFNEQ" => OpCode::Jumpifneq,
            "EXIT" => OpCode::Exit,
            "DPRINT" => OpCode::Dprint,
            "BREAK" => OpCode::Break,
            other => {
                return Err(ParseEnumError {
                    value: other.to_string(),
                    enum_name: "OpCode",
                })
            }
        };
        Ok(op)
    }
}

/// The semantic category an argument slot requires, independent of what concrete literal
/// type a `symb` might resolve to.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ArgKind {
    Var,
    Symb,
    Label,
    Type,
}

impl OpCode {
    /// The fixed argument-kind profile for this opcode, in order.
    pub fn arg_kinds(self) -> &'static [ArgKind] {
        use ArgKind::*;
        match self {
            OpCode::Move => &[Var, Symb],
            OpCode::Createframe | OpCode::Pushframe | OpCode::Popframe | OpCode::Return | OpCode::Break => &[],
            OpCode::Defvar => &[Var],
            OpCode::Call | OpCode::Jump | OpCode::Label => &[Label],
            OpCode::Pushs | OpCode::Write | OpCode::Exit | OpCode::Dprint => &[Symb],
            OpCode::Pops => &[Var],
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Idiv | OpCode::Div | OpCode::Lt
            | OpCode::Gt | OpCode::Eq | OpCode::And | OpCode::Or | OpCode::Concat
            | OpCode::Stri2int | OpCode::Getchar | OpCode::Setchar => &[Var, Symb, Symb],
            OpCode::Not | OpCode::Int2char | OpCode::Int2float | OpCode::Float2int
            | OpCode::Strlen | OpCode::Type => &[Var, Symb],
            OpCode::Read => &[Var, Type],
            OpCode::Jumpifeq | OpCode::Jumpifneq => &[Label, Symb, Symb],
        }
    }

    /// Whether execution of this opcode is counted toward the `insts`/`hot` statistics.
    pub fn counts_in_stats(self) -> bool {
        !matches!(self, OpCode::Label | OpCode::Dprint | OpCode::Break)
    }
}

/// Either a variable reference (dereferenced at execute time) or a literal, the operand kind
/// used everywhere the source calls for a `symb`.
#[derive(Clone, Debug)]
pub enum Symb {
    Var(FrameKind, String),
    Lit(Value),
}

impl Symb {
    pub fn resolve(&self, frames: &Frames) -> Result<Value, RuntimeError> {
        match self {
            Symb::Var(kind, name) => frames.read(*kind, name),
            Symb::Lit(value) => Ok(value.clone()),
        }
    }

    /// As `resolve`, but an uninitialized variable yields `None` rather than an error. Used
    /// only by `TYPE`.
    pub fn resolve_lenient(&self, frames: &Frames) -> Result<Option<Value>, RuntimeError> {
        match self {
            Symb::Var(kind, name) => frames.read_lenient(*kind, name),
            Symb::Lit(value) => Ok(Some(value.clone())),
        }
    }
}

/// One resolved instruction argument, already validated against its opcode's expected kind.
#[derive(Clone, Debug)]
pub enum Arg {
    Var(FrameKind, String),
    Symb(Symb),
    Label(String),
    Type(String),
}

/// The raw, loosely-typed form of an argument as read off the XML element: its `type`
/// attribute and its (possibly absent) text content. Kind validation against the owning
/// opcode's profile happens when an `Instruction` is built from these.
#[derive(Clone, Debug)]
pub struct RawArg {
    pub type_tag: String,
    pub text: Option<String>,
}

/// Parses `GF@name` / `LF@name` / `TF@name` into a frame kind and bare name.
fn parse_var_ref(text: &str) -> Option<(FrameKind, String)> {
    if text.len() < 3 || text.as_bytes()[2] != b'@' {
        return None;
    }
    let kind = FrameKind::parse(&text[0..2])?;
    Some((kind, text[3..].to_string()))
}

impl Arg {
    /// Builds a validated `Arg` from a raw XML argument and the kind its opcode slot expects.
    /// Any mismatch (wrong XML `type`, malformed variable reference) is an XML-structure
    /// violation, since the argument shape itself is wrong rather than a runtime value.
    pub fn from_raw(kind: ArgKind, raw: &RawArg) -> Result<Arg, String> {
        match kind {
            ArgKind::Var => {
                if raw.type_tag != "var" {
                    return Err(format!("expected a variable, found type \"{}\"", raw.type_tag));
                }
                let text = raw.text.as_deref().unwrap_or("");
                let (frame, name) = parse_var_ref(text)
                    .ok_or_else(|| format!("malformed variable reference \"{}\"", text))?;
                Ok(Arg::Var(frame, name))
            }
            ArgKind::Symb => {
                if raw.type_tag == "var" {
                    let text = raw.text.as_deref().unwrap_or("");
                    let (frame, name) = parse_var_ref(text)
                        .ok_or_else(|| format!("malformed variable reference \"{}\"", text))?;
                    Ok(Arg::Symb(Symb::Var(frame, name)))
                } else {
                    let value = Value::parse_from_xml(&raw.type_tag, raw.text.as_deref())
                        .map_err(|e| e.to_string())?;
                    Ok(Arg::Symb(Symb::Lit(value)))
                }
            }
            ArgKind::Label => {
                if raw.type_tag != "label" {
                    return Err(format!("expected a label, found type \"{}\"", raw.type_tag));
                }
                Ok(Arg::Label(raw.text.clone().unwrap_or_default()))
            }
            ArgKind::Type => {
                if raw.type_tag != "type" {
                    return Err(format!("expected a type tag, found type \"{}\"", raw.type_tag));
                }
                Ok(Arg::Type(raw.text.clone().unwrap_or_default()))
            }
        }
    }

    fn as_var(&self) -> (FrameKind, &str) {
        match self {
            Arg::Var(kind, name) => (*kind, name.as_str()),
            _ => unreachable!("argument kind was validated against the opcode profile"),
        }
    }

    fn as_symb(&self) -> &Symb {
        match self {
            Arg::Symb(symb) => symb,
            _ => unreachable!("argument kind was validated against the opcode profile"),
        }
    }

    fn as_label(&self) -> &str {
        match self {
            Arg::Label(name) => name,
            _ => unreachable!("argument kind was validated against the opcode profile"),
        }
    }

    fn as_type(&self) -> &str {
        match self {
            Arg::Type(tag) => tag,
            _ => unreachable!("argument kind was validated against the opcode profile"),
        }
    }
}

/// One instruction: its declared `order`, its opcode, and its already-validated arguments.
#[derive(Clone, Debug)]
pub struct Instruction {
    pub order: u32,
    pub opcode: OpCode,
    pub args: Vec<Arg>,
}

/// Mutable runtime state an instruction's execution may read or write, excluding the program
/// counter itself (the execution loop in `program.rs` owns that).
pub struct ExecState<'a> {
    pub frames: &'a mut Frames,
    pub labels: &'a LabelTable,
    pub call_stack: &'a mut Vec<usize>,
    pub data_stack: &'a mut Vec<Value>,
    pub input: &'a mut dyn LineSource,
    pub output: &'a mut dyn std::io::Write,
    /// Index of the instruction currently executing, in the sorted executable vector.
    pub pc: usize,
}

/// The result of dispatching one instruction: either fall through to `pc + 1`, or jump to a
/// specific instruction index.
pub enum Flow {
    Next,
    Jump(usize),
}

fn numeric_binop(
    a: Value,
    b: Value,
    int_op: impl Fn(i64, i64) -> Result<i64, RuntimeError>,
    float_op: impl Fn(f64, f64) -> Result<f64, RuntimeError>,
) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => int_op(x, y).map(Value::Int),
        (Value::Float(x), Value::Float(y)) => float_op(x, y).map(Value::Float),
        (a, b) => Err(RuntimeError::OperandType {
            expected: "int or float (matching)",
            found: if a.type_name() != "int" && a.type_name() != "float" {
                a.type_name()
            } else {
                b.type_name()
            },
        }),
    }
}

fn expect_int(v: &Value) -> Result<i64, RuntimeError> {
    match v {
        Value::Int(i) => Ok(*i),
        other => Err(RuntimeError::OperandType {
            expected: "int",
            found: other.type_name(),
        }),
    }
}

fn expect_string(v: &Value) -> Result<&str, RuntimeError> {
    match v {
        Value::String(s) => Ok(s.as_str()),
        other => Err(RuntimeError::OperandType {
            expected: "string",
            found: other.type_name(),
        }),
    }
}

fn expect_bool(v: &Value) -> Result<bool, RuntimeError> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(RuntimeError::OperandType {
            expected: "bool",
            found: other.type_name(),
        }),
    }
}

/// `LT`/`GT` ordering. `Nil` never participates (operand-type error); ints and floats compare
/// numerically, bools order `false < true`, strings compare lexicographically by code point.
fn order_values(a: &Value, b: &Value) -> Result<Ordering, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => {
            x.partial_cmp(y).ok_or(RuntimeError::OperandType {
                expected: "comparable float",
                found: "nan",
            })
        }
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::String(x), Value::String(y)) => Ok(x.cmp(y)),
        _ => Err(RuntimeError::OperandType {
            expected: "matching non-nil operands",
            found: "mismatched or nil",
        }),
    }
}

/// `EQ` semantics: `Nil` compares equal only to `Nil`, and never errors; any other pairing
/// requires matching types.
fn values_equal(a: &Value, b: &Value) -> Result<bool, RuntimeError> {
    if matches!(a, Value::Nil) || matches!(b, Value::Nil) {
        return Ok(matches!(a, Value::Nil) && matches!(b, Value::Nil));
    }
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x == y),
        (Value::Float(x), Value::Float(y)) => Ok(x == y),
        (Value::Bool(x), Value::Bool(y)) => Ok(x == y),
        (Value::String(x), Value::String(y)) => Ok(x == y),
        _ => Err(RuntimeError::OperandType {
            expected: "matching operand types",
            found: b.type_name(),
        }),
    }
}

fn char_at(s: &str, idx: i64) -> Result<char, RuntimeError> {
    if idx < 0 {
        return Err(RuntimeError::StringOperation(format!("index {} out of range", idx)));
    }
    s.chars()
        .nth(idx as usize)
        .ok_or_else(|| RuntimeError::StringOperation(format!("index {} out of range", idx)))
}

fn replace_char(s: &str, idx: i64, replacement: char) -> Result<String, RuntimeError> {
    if idx < 0 || idx as usize >= s.chars().count() {
        return Err(RuntimeError::StringOperation(format!("index {} out of range", idx)));
    }
    Ok(s.chars()
        .enumerate()
        .map(|(i, c)| if i as i64 == idx { replacement } else { c })
        .collect())
}

impl Instruction {
    /// Executes this instruction against `state`. Returns the flow decision for the loop, or
    /// a `RuntimeError` — including `RuntimeError::Exit`, which the loop treats specially.
    ///
    /// An instruction with fewer arguments than its opcode requires loads without complaint
    /// (the loader never checks arity against the opcode's profile) and only faults here, the
    /// first time it is actually dispatched.
    pub fn execute(&self, state: &mut ExecState) -> Result<Flow, RuntimeError> {
        let expected = self.opcode.arg_kinds().len();
        if self.args.len() != expected {
            return Err(RuntimeError::ArgumentCount {
                expected,
                found: self.args.len(),
            });
        }
        match self.opcode {
            OpCode::Move => {
                let (kind, name) = self.args[0].as_var();
                let value = self.args[1].as_symb().resolve(state.frames)?;
                state.frames.update(kind, name, value)?;
                Ok(Flow::Next)
            }
            OpCode::Createframe => {
                state.frames.create_frame();
                Ok(Flow::Next)
            }
            OpCode::Pushframe => {
                state.frames.push_frame()?;
                Ok(Flow::Next)
            }
            OpCode::Popframe => {
                state.frames.pop_frame()?;
                Ok(Flow::Next)
            }
            OpCode::Defvar => {
                let (kind, name) = self.args[0].as_var();
                state.frames.define(kind, name)?;
                Ok(Flow::Next)
            }
            OpCode::Call => {
                let target = state.labels.resolve(self.args[0].as_label())?;
                state.call_stack.push(state.pc + 1);
                Ok(Flow::Jump(target))
            }
            OpCode::Return => {
                let target = state
                    .call_stack
                    .pop()
                    .ok_or(RuntimeError::ValueMissing)?;
                Ok(Flow::Jump(target))
            }
            OpCode::Pushs => {
                let value = self.args[0].as_symb().resolve(state.frames)?;
                state.data_stack.push(value);
                Ok(Flow::Next)
            }
            OpCode::Pops => {
                let (kind, name) = self.args[0].as_var();
                let value = state.data_stack.pop().ok_or(RuntimeError::ValueMissing)?;
                state.frames.update(kind, name, value)?;
                Ok(Flow::Next)
            }
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Idiv | OpCode::Div => {
                let (kind, name) = self.args[0].as_var();
                let a = self.args[1].as_symb().resolve(state.frames)?;
                let b = self.args[2].as_symb().resolve(state.frames)?;
                let result = match self.opcode {
                    OpCode::Add => numeric_binop(
                        a,
                        b,
                        |x, y| Ok(x.wrapping_add(y)),
                        |x, y| Ok(x + y),
                    )?,
                    OpCode::Sub => numeric_binop(
                        a,
                        b,
                        |x, y| Ok(x.wrapping_sub(y)),
                        |x, y| Ok(x - y),
                    )?,
                    OpCode::Mul => numeric_binop(
                        a,
                        b,
                        |x, y| Ok(x.wrapping_mul(y)),
                        |x, y| Ok(x * y),
                    )?,
                    OpCode::Idiv => {
                        let x = expect_int(&a)?;
                        let y = expect_int(&b)?;
                        if y == 0 {
                            return Err(RuntimeError::OperandValue("division by zero".to_string()));
                        }
                        Value::Int(x.wrapping_div(y))
                    }
                    OpCode::Div => {
                        let x = match a {
                            Value::Float(f) => f,
                            other => {
                                return Err(RuntimeError::OperandType {
                                    expected: "float",
                                    found: other.type_name(),
                                })
                            }
                        };
                        let y = match b {
                            Value::Float(f) => f,
                            other => {
                                return Err(RuntimeError::OperandType {
                                    expected: "float",
                                    found: other.type_name(),
                                })
                            }
                        };
                        if y == 0.0 {
                            return Err(RuntimeError::OperandValue("division by zero".to_string()));
                        }
                        Value::Float(x / y)
                    }
                    _ => unreachable!(),
                };
                state.frames.update(kind, name, result)?;
                Ok(Flow::Next)
            }
            OpCode::Lt | OpCode::Gt => {
                let (kind, name) = self.args[0].as_var();
                let a = self.args[1].as_symb().resolve(state.frames)?;
                let b = self.args[2].as_symb().resolve(state.frames)?;
                let ordering = order_values(&a, &b)?;
                let result = match self.opcode {
                    OpCode::Lt => ordering == Ordering::Less,
                    OpCode::Gt => ordering == Ordering::Greater,
                    _ => unreachable!(),
                };
                state.frames.update(kind, name, Value::Bool(result))?;
                Ok(Flow::Next)
            }
            OpCode::Eq => {
                let (kind, name) = self.args[0].as_var();
                let a = self.args[1].as_symb().resolve(state.frames)?;
                let b = self.args[2].as_symb().resolve(state.frames)?;
                let result = values_equal(&a, &b)?;
                state.frames.update(kind, name, Value::Bool(result))?;
                Ok(Flow::Next)
            }
            OpCode::And | OpCode::Or => {
                let (kind, name) = self.args[0].as_var();
                let a = self.args[1].as_symb().resolve(state.frames)?;
                let b = self.args[2].as_symb().resolve(state.frames)?;
                let a = expect_bool(&a)?;
                let b = expect_bool(&b)?;
                let result = match self.opcode {
                    OpCode::And => a && b,
                    OpCode::Or => a || b,
                    _ => unreachable!(),
                };
                state.frames.update(kind, name, Value::Bool(result))?;
                Ok(Flow::Next)
            }
            OpCode::Not => {
                let (kind, name) = self.args[0].as_var();
                let a = expect_bool(&self.args[1].as_symb().resolve(state.frames)?)?;
                state.frames.update(kind, name, Value::Bool(!a))?;
                Ok(Flow::Next)
            }
            OpCode::Int2char => {
                let (kind, name) = self.args[0].as_var();
                let i = expect_int(&self.args[1].as_symb().resolve(state.frames)?)?;
                let ch = u32::try_from(i)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| RuntimeError::StringOperation(format!("{} is not a valid code point", i)))?;
                state.frames.update(kind, name, Value::String(ch.to_string()))?;
                Ok(Flow::Next)
            }
            OpCode::Stri2int => {
                let (kind, name) = self.args[0].as_var();
                let s = self.args[1].as_symb().resolve(state.frames)?;
                let idx = self.args[2].as_symb().resolve(state.frames)?;
                let s = expect_string(&s)?;
                let idx = expect_int(&idx)?;
                let ch = char_at(s, idx)?;
                state.frames.update(kind, name, Value::Int(ch as i64))?;
                Ok(Flow::Next)
            }
            OpCode::Int2float => {
                let (kind, name) = self.args[0].as_var();
                let i = expect_int(&self.args[1].as_symb().resolve(state.frames)?)?;
                state.frames.update(kind, name, Value::Float(i as f64))?;
                Ok(Flow::Next)
            }
            OpCode::Float2int => {
                let (kind, name) = self.args[0].as_var();
                let value = self.args[1].as_symb().resolve(state.frames)?;
                let f = match value {
                    Value::Float(f) => f,
                    other => {
                        return Err(RuntimeError::OperandType {
                            expected: "float",
                            found: other.type_name(),
                        })
                    }
                };
                state.frames.update(kind, name, Value::Int(f as i64))?;
                Ok(Flow::Next)
            }
            OpCode::Read => {
                let (kind, name) = self.args[0].as_var();
                let type_tag = self.args[1].as_type();
                let line = state.input.read_line();
                let value = Value::parse_from_user_input(type_tag, &line);
                state.frames.update(kind, name, value)?;
                Ok(Flow::Next)
            }
            OpCode::Write => {
                let value = self.args[0].as_symb().resolve(state.frames)?;
                write!(state.output, "{}", value.render()).map_err(|e| {
                    RuntimeError::OperandValue(format!("write failed: {}", e))
                })?;
                Ok(Flow::Next)
            }
            OpCode::Concat => {
                let (kind, name) = self.args[0].as_var();
                let a = self.args[1].as_symb().resolve(state.frames)?;
                let b = self.args[2].as_symb().resolve(state.frames)?;
                let mut result = expect_string(&a)?.to_string();
                result.push_str(expect_string(&b)?);
                state.frames.update(kind, name, Value::String(result))?;
                Ok(Flow::Next)
            }
            OpCode::Strlen => {
                let (kind, name) = self.args[0].as_var();
                let s = self.args[1].as_symb().resolve(state.frames)?;
                let len = expect_string(&s)?.chars().count() as i64;
                state.frames.update(kind, name, Value::Int(len))?;
                Ok(Flow::Next)
            }
            OpCode::Getchar => {
                let (kind, name) = self.args[0].as_var();
                let s = self.args[1].as_symb().resolve(state.frames)?;
                let idx = self.args[2].as_symb().resolve(state.frames)?;
                let s = expect_string(&s)?;
                let idx = expect_int(&idx)?;
                let ch = char_at(s, idx)?;
                state.frames.update(kind, name, Value::String(ch.to_string()))?;
                Ok(Flow::Next)
            }
            OpCode::Setchar => {
                let (kind, name) = self.args[0].as_var();
                let current = state.frames.read(kind, name)?;
                let idx = self.args[1].as_symb().resolve(state.frames)?;
                let src = self.args[2].as_symb().resolve(state.frames)?;
                let current = expect_string(&current)?;
                let idx = expect_int(&idx)?;
                let src = expect_string(&src)?;
                let replacement = src
                    .chars()
                    .next()
                    .ok_or_else(|| RuntimeError::StringOperation("empty source string".to_string()))?;
                let updated = replace_char(current, idx, replacement)?;
                state.frames.update(kind, name, Value::String(updated))?;
                Ok(Flow::Next)
            }
            OpCode::Type => {
                let (kind, name) = self.args[0].as_var();
                let resolved = self.args[1].as_symb().resolve_lenient(state.frames)?;
                let type_name = resolved.map(|v| v.type_name()).unwrap_or("");
                state.frames.update(kind, name, Value::String(type_name.to_string()))?;
                Ok(Flow::Next)
            }
            OpCode::Label => Ok(Flow::Next),
            OpCode::Jump => {
                let target = state.labels.resolve(self.args[0].as_label())?;
                Ok(Flow::Jump(target))
            }
            OpCode::Jumpifeq | OpCode::Jumpifneq => {
                let target = state.labels.resolve(self.args[0].as_label())?;
                let a = self.args[1].as_symb().resolve(state.frames)?;
                let b = self.args[2].as_symb().resolve(state.frames)?;
                let equal = values_equal(&a, &b)?;
                let take = if self.opcode == OpCode::Jumpifeq { equal } else { !equal };
                if take {
                    Ok(Flow::Jump(target))
                } else {
                    Ok(Flow::Next)
                }
            }
            OpCode::Exit => {
                let value = self.args[0].as_symb().resolve(state.frames)?;
                let code = expect_int(&value)?;
                if !(0..=49).contains(&code) {
                    return Err(RuntimeError::OperandValue(format!(
                        "exit code {} out of range [0,49]",
                        code
                    )));
                }
                Err(RuntimeError::Exit(code as i32))
            }
            OpCode::Dprint | OpCode::Break => Ok(Flow::Next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameKind;
    use crate::io::Input;

    fn sym_lit(v: Value) -> Arg {
        Arg::Symb(Symb::Lit(v))
    }

    fn run(opcode: OpCode, args: Vec<Arg>, frames: &mut Frames) -> Result<Flow, RuntimeError> {
        let labels = LabelTable::new();
        let mut call_stack = Vec::new();
        let mut data_stack = Vec::new();
        let mut input: Input<&[u8]> = Input::from_file("");
        let mut output = Vec::new();
        let instr = Instruction { order: 1, opcode, args };
        let mut state = ExecState {
            frames,
            labels: &labels,
            call_stack: &mut call_stack,
            data_stack: &mut data_stack,
            input: &mut input,
            output: &mut output,
            pc: 0,
        };
        instr.execute(&mut state)
    }

    #[test]
    fn move_copies_literal_into_variable() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "x").unwrap();
        run(
            OpCode::Move,
            vec![Arg::Var(FrameKind::Global, "x".into()), sym_lit(Value::Int(6))],
            &mut frames,
        )
        .unwrap();
        assert_eq!(frames.read(FrameKind::Global, "x").unwrap(), Value::Int(6));
    }

    #[test]
    fn mul_preserves_int_type() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "c").unwrap();
        run(
            OpCode::Mul,
            vec![
                Arg::Var(FrameKind::Global, "c".into()),
                sym_lit(Value::Int(6)),
                sym_lit(Value::Int(7)),
            ],
            &mut frames,
        )
        .unwrap();
        assert_eq!(frames.read(FrameKind::Global, "c").unwrap(), Value::Int(42));
    }

    #[test]
    fn mixed_numeric_types_are_operand_type_error() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "c").unwrap();
        let err = run(
            OpCode::Add,
            vec![
                Arg::Var(FrameKind::Global, "c".into()),
                sym_lit(Value::Int(1)),
                sym_lit(Value::Float(1.0)),
            ],
            &mut frames,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 53);
    }

    #[test]
    fn idiv_by_zero_is_operand_value_error() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "c").unwrap();
        let err = run(
            OpCode::Idiv,
            vec![
                Arg::Var(FrameKind::Global, "c".into()),
                sym_lit(Value::Int(1)),
                sym_lit(Value::Int(0)),
            ],
            &mut frames,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 57);
    }

    #[test]
    fn eq_nil_nil_is_true_without_error() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "r").unwrap();
        run(
            OpCode::Eq,
            vec![
                Arg::Var(FrameKind::Global, "r".into()),
                sym_lit(Value::Nil),
                sym_lit(Value::Nil),
            ],
            &mut frames,
        )
        .unwrap();
        assert_eq!(frames.read(FrameKind::Global, "r").unwrap(), Value::Bool(true));
    }

    #[test]
    fn lt_on_nil_is_operand_type_error() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "r").unwrap();
        let err = run(
            OpCode::Lt,
            vec![
                Arg::Var(FrameKind::Global, "r".into()),
                sym_lit(Value::Nil),
                sym_lit(Value::Int(0)),
            ],
            &mut frames,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 53);
    }

    #[test]
    fn setchar_on_uninitialized_destination_is_missing_value_before_type_error() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "s").unwrap();
        let err = run(
            OpCode::Setchar,
            vec![
                Arg::Var(FrameKind::Global, "s".into()),
                sym_lit(Value::Int(0)),
                sym_lit(Value::String("z".into())),
            ],
            &mut frames,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 56);
    }

    #[test]
    fn setchar_checks_later_operand_existence_before_earlier_operand_type() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "d").unwrap();
        frames.update(FrameKind::Global, "d", Value::Int(5)).unwrap();
        frames.define(FrameKind::Global, "src").unwrap();
        frames.update(FrameKind::Global, "src", Value::String("z".into())).unwrap();
        // "idx" was never DEFVAR'd: its existence fault must surface even though "d" (read
        // first, as the destination) would also fail its own type check.
        let err = run(
            OpCode::Setchar,
            vec![
                Arg::Var(FrameKind::Global, "d".into()),
                Arg::Symb(Symb::Var(FrameKind::Global, "idx".into())),
                Arg::Symb(Symb::Var(FrameKind::Global, "src".into())),
            ],
            &mut frames,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 54);
    }

    #[test]
    fn dispatching_an_instruction_missing_an_argument_is_argument_count_error() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "c").unwrap();
        // ADD expects [Var, Symb, Symb]; only the destination and one operand are given.
        let err = run(
            OpCode::Add,
            vec![Arg::Var(FrameKind::Global, "c".into()), sym_lit(Value::Int(1))],
            &mut frames,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 32);
        assert!(matches!(
            err,
            RuntimeError::ArgumentCount { expected: 3, found: 2 }
        ));
    }

    #[test]
    fn setchar_with_empty_source_is_string_operation_error() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "s").unwrap();
        frames.update(FrameKind::Global, "s", Value::String("abc".into())).unwrap();
        let err = run(
            OpCode::Setchar,
            vec![
                Arg::Var(FrameKind::Global, "s".into()),
                sym_lit(Value::Int(0)),
                sym_lit(Value::String(String::new())),
            ],
            &mut frames,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 58);
    }

    #[test]
    fn exit_out_of_range_is_operand_value_error() {
        let mut frames = Frames::new();
        let err = run(OpCode::Exit, vec![sym_lit(Value::Int(99))], &mut frames).unwrap_err();
        assert_eq!(err.exit_code(), 57);
    }

    #[test]
    fn exit_in_range_propagates_exit_variant() {
        let mut frames = Frames::new();
        let err = run(OpCode::Exit, vec![sym_lit(Value::Int(2))], &mut frames).unwrap_err();
        assert!(matches!(err, RuntimeError::Exit(2)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn type_on_uninitialized_variable_is_empty_string() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "v").unwrap();
        frames.define(FrameKind::Global, "t").unwrap();
        run(
            OpCode::Type,
            vec![
                Arg::Var(FrameKind::Global, "t".into()),
                Arg::Symb(Symb::Var(FrameKind::Global, "v".into())),
            ],
            &mut frames,
        )
        .unwrap();
        assert_eq!(
            frames.read(FrameKind::Global, "t").unwrap(),
            Value::String(String::new())
        );
    }

    #[test]
    fn stri2int_int2char_are_inverses() {
        let mut frames = Frames::new();
        frames.define(FrameKind::Global, "i").unwrap();
        run(
            OpCode::Stri2int,
            vec![
                Arg::Var(FrameKind::Global, "i".into()),
                sym_lit(Value::String("A".into())),
                sym_lit(Value::Int(0)),
            ],
            &mut frames,
        )
        .unwrap();
        assert_eq!(frames.read(FrameKind::Global, "i").unwrap(), Value::Int(65));

        frames.define(FrameKind::Global, "c").unwrap();
        run(
            OpCode::Int2char,
            vec![Arg::Var(FrameKind::Global, "c".into()), sym_lit(Value::Int(65))],
            &mut frames,
        )
        .unwrap();
        assert_eq!(
            frames.read(FrameKind::Global, "c").unwrap(),
            Value::String("A".into())
        );
    }
}
