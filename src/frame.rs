use std::collections::HashMap;
use std::fmt;

use crate::error::RuntimeError;
use crate::value::Value;

/// Which of the three frames a variable reference names.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum FrameKind {
    Global,
    Local,
    Temporary,
}

impl FrameKind {
    pub fn label(self) -> &'static str {
        match self {
            FrameKind::Global => "GF",
            FrameKind::Local => "LF",
            FrameKind::Temporary => "TF",
        }
    }

    pub fn parse(prefix: &str) -> Option<FrameKind> {
        match prefix {
            "GF" => Some(FrameKind::Global),
            "LF" => Some(FrameKind::Local),
            "TF" => Some(FrameKind::Temporary),
            _ => None,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single frame: a mapping from variable name to an optional value. Absence of a value
/// (but presence of the key) is the "defined but uninitialized" state.
type Slots = HashMap<String, Option<Value>>;

/// Owns `GF`, the local frame stack, and `TF`, and exposes the operations every instruction
/// needs keyed by `(FrameKind, name)`.
///
/// # Examples
/// ```
/// use ippcode22::{Frames, FrameKind, Value};
///
/// let mut frames = Frames::new();
/// frames.define(FrameKind::Global, "x").unwrap();
/// frames.update(FrameKind::Global, "x", Value::Int(5)).unwrap();
/// assert_eq!(frames.read(FrameKind::Global, "x").unwrap(), Value::Int(5));
/// ```
#[derive(Debug, Default)]
pub struct Frames {
    global: Slots,
    temporary: Option<Slots>,
    local_stack: Vec<Slots>,
}

impl Frames {
    pub fn new() -> Frames {
        Frames {
            global: HashMap::new(),
            temporary: None,
            local_stack: Vec::new(),
        }
    }

    fn slots(&self, kind: FrameKind) -> Result<&Slots, RuntimeError> {
        match kind {
            FrameKind::Global => Ok(&self.global),
            FrameKind::Temporary => self
                .temporary
                .as_ref()
                .ok_or(RuntimeError::FrameUndefined("TF")),
            FrameKind::Local => self.local_stack.last().ok_or(RuntimeError::FrameUndefined("LF")),
        }
    }

    fn slots_mut(&mut self, kind: FrameKind) -> Result<&mut Slots, RuntimeError> {
        match kind {
            FrameKind::Global => Ok(&mut self.global),
            FrameKind::Temporary => self
                .temporary
                .as_mut()
                .ok_or(RuntimeError::FrameUndefined("TF")),
            FrameKind::Local => self
                .local_stack
                .last_mut()
                .ok_or(RuntimeError::FrameUndefined("LF")),
        }
    }

    /// `DEFVAR`: requires the frame to exist and the name to be new in it.
    pub fn define(&mut self, kind: FrameKind, name: &str) -> Result<(), RuntimeError> {
        let slots = self.slots_mut(kind)?;
        if slots.contains_key(name) {
            return Err(RuntimeError::Redefinition(format!(
                "{}@{}",
                kind.label(),
                name
            )));
        }
        slots.insert(name.to_string(), None);
        Ok(())
    }

    /// `MOVE`/assignment targets: requires the frame and variable to exist; always initializes.
    pub fn update(&mut self, kind: FrameKind, name: &str, value: Value) -> Result<(), RuntimeError> {
        let slots = self.slots_mut(kind)?;
        let slot = slots
            .get_mut(name)
            .ok_or_else(|| RuntimeError::VariableUndefined(format!("{}@{}", kind.label(), name)))?;
        *slot = Some(value);
        Ok(())
    }

    /// Strict read: frame defined, variable present, and initialized, else an error.
    pub fn read(&self, kind: FrameKind, name: &str) -> Result<Value, RuntimeError> {
        let slots = self.slots(kind)?;
        let slot = slots
            .get(name)
            .ok_or_else(|| RuntimeError::VariableUndefined(format!("{}@{}", kind.label(), name)))?;
        slot.clone().ok_or(RuntimeError::ValueMissing)
    }

    /// Lenient read used by `TYPE`: returns `None` for an uninitialized variable instead of
    /// erroring, but still requires the frame and the name to exist.
    pub fn read_lenient(&self, kind: FrameKind, name: &str) -> Result<Option<Value>, RuntimeError> {
        let slots = self.slots(kind)?;
        slots
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::VariableUndefined(format!("{}@{}", kind.label(), name)))
    }

    /// `CREATEFRAME`: (re)creates an empty `TF`, discarding any previous one.
    pub fn create_frame(&mut self) {
        self.temporary = Some(HashMap::new());
    }

    /// `PUSHFRAME`: moves `TF` onto the local stack, then undefines `TF`.
    pub fn push_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self.temporary.take().ok_or(RuntimeError::FrameUndefined("TF"))?;
        self.local_stack.push(frame);
        Ok(())
    }

    /// `POPFRAME`: moves the top of the local stack into `TF`, clobbering any previous `TF`.
    pub fn pop_frame(&mut self) -> Result<(), RuntimeError> {
        let frame = self
            .local_stack
            .pop()
            .ok_or(RuntimeError::FrameUndefined("LF"))?;
        self.temporary = Some(frame);
        Ok(())
    }

    /// Number of initialized slots across `GF`, `TF` (if defined), and every local frame on
    /// the stack (including the current `LF`). Used by the `vars` statistic.
    pub fn count_initialized(&self) -> usize {
        let mut count = self.global.values().filter(|v| v.is_some()).count();
        if let Some(tf) = &self.temporary {
            count += tf.values().filter(|v| v.is_some()).count();
        }
        for frame in &self.local_stack {
            count += frame.values().filter(|v| v.is_some()).count();
        }
        count
    }
}
