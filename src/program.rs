use std::io::Write;

use crate::error::RuntimeError;
use crate::frame::Frames;
use crate::instruction::{ExecState, Flow, Instruction};
use crate::io::LineSource;
use crate::label::LabelTable;
use crate::stats::Stats;
use crate::value::Value;

/// Owns every piece of mutable interpreter state: frames, label table, call/data stacks, the
/// executable vector, and the statistics collector. The execution loop below is the only
/// thing that mutates it; nothing outside the core reaches in.
pub struct Program {
    instructions: Vec<Instruction>,
    labels: LabelTable,
    frames: Frames,
    call_stack: Vec<usize>,
    data_stack: Vec<Value>,
    stats: Stats,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>, labels: LabelTable) -> Program {
        Program {
            instructions,
            labels,
            frames: Frames::new(),
            call_stack: Vec::new(),
            data_stack: Vec::new(),
            stats: Stats::new(),
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Runs the program to completion, driving `READ` from `input` and `WRITE` to `output`.
    ///
    /// Returns `Ok(())` on a clean run-off-the-end termination (exit status 0), or the
    /// `RuntimeError` that ended it — `RuntimeError::Exit` for a successful `EXIT`, any other
    /// variant for a runtime fault. Per the error-handling contract, statistics are flushed by
    /// the caller only for the `Ok` and `Exit` cases, never for other runtime errors.
    pub fn run(
        &mut self,
        input: &mut dyn LineSource,
        output: &mut dyn Write,
    ) -> Result<(), RuntimeError> {
        let mut pc = 0usize;
        while pc < self.instructions.len() {
            let order = self.instructions[pc].order;
            let opcode = self.instructions[pc].opcode;
            log::trace!("dispatch order={} opcode={:?}", order, opcode);

            let flow = {
                let instr = &self.instructions[pc];
                let mut state = ExecState {
                    frames: &mut self.frames,
                    labels: &self.labels,
                    call_stack: &mut self.call_stack,
                    data_stack: &mut self.data_stack,
                    input,
                    output,
                    pc,
                };
                instr.execute(&mut state)
            };

            match flow {
                Ok(Flow::Next) => {
                    if opcode.counts_in_stats() {
                        self.stats.record_executed(order);
                        self.stats.observe_live_vars(self.frames.count_initialized());
                    }
                    pc += 1;
                }
                Ok(Flow::Jump(target)) => {
                    if opcode.counts_in_stats() {
                        self.stats.record_executed(order);
                        self.stats.observe_live_vars(self.frames.count_initialized());
                    }
                    pc = target;
                }
                Err(RuntimeError::Exit(code)) => {
                    self.stats.record_exit();
                    return Err(RuntimeError::Exit(code));
                }
                Err(other) => return Err(other),
            }
        }
        Ok(())
    }
}
