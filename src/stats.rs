use std::collections::HashMap;
use std::io::{self, Write};

/// A requested execution metric, in the order the caller asked for it.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum Metric {
    Insts,
    Vars,
    Hot,
}

/// Accumulates the three recognized metrics over the course of execution.
///
/// `insts` counts non-excluded executed instructions; `hot` tracks per-`order` execution
/// counts to report the most-frequently executed instruction (ties broken by lowest order);
/// `vars` tracks the high-water mark of initialized variables.
#[derive(Debug, Default)]
pub struct Stats {
    insts: u64,
    counts_by_order: HashMap<u32, u64>,
    max_vars: u64,
}

impl Stats {
    pub fn new() -> Stats {
        Stats::default()
    }

    /// Records one executed instruction at the given `order`. Callers must not call this for
    /// `LABEL`, `DPRINT`, or `BREAK`.
    pub fn record_executed(&mut self, order: u32) {
        self.insts += 1;
        *self.counts_by_order.entry(order).or_insert(0) += 1;
    }

    /// Directly bumps the instruction count without touching the hot-instruction table, for
    /// `EXIT`'s own bookkeeping (it increments `insts` once and then flushes, without going
    /// through the loop's normal per-instruction counting step).
    pub fn record_exit(&mut self) {
        self.insts += 1;
    }

    pub fn observe_live_vars(&mut self, count: usize) {
        self.max_vars = self.max_vars.max(count as u64);
    }

    fn hottest_order(&self) -> Option<u32> {
        let mut orders: Vec<u32> = self.counts_by_order.keys().copied().collect();
        orders.sort_unstable();
        let mut best: Option<(u32, u64)> = None;
        for order in orders {
            let count = self.counts_by_order[&order];
            let replace = match best {
                Some((_, best_count)) => count > best_count,
                None => true,
            };
            if replace {
                best = Some((order, count));
            }
        }
        best.map(|(order, _)| order)
    }

    /// Writes the requested metrics, one per line, in the order given, terminated with
    /// newlines.
    pub fn write_report<W: Write>(&self, metrics: &[Metric], mut sink: W) -> io::Result<()> {
        for metric in metrics {
            let line = match metric {
                Metric::Insts => self.insts.to_string(),
                Metric::Vars => self.max_vars.to_string(),
                Metric::Hot => self.hottest_order().unwrap_or(0).to_string(),
            };
            writeln!(sink, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insts_counts_recorded_executions() {
        let mut stats = Stats::new();
        stats.record_executed(1);
        stats.record_executed(2);
        stats.record_executed(1);
        let mut buf = Vec::new();
        stats.write_report(&[Metric::Insts], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "3\n");
    }

    #[test]
    fn hot_breaks_ties_by_lowest_order() {
        let mut stats = Stats::new();
        stats.record_executed(5);
        stats.record_executed(2);
        stats.record_executed(5);
        stats.record_executed(2);
        let mut buf = Vec::new();
        stats.write_report(&[Metric::Hot], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "2\n");
    }

    #[test]
    fn vars_tracks_high_water_mark() {
        let mut stats = Stats::new();
        stats.observe_live_vars(3);
        stats.observe_live_vars(1);
        stats.observe_live_vars(5);
        let mut buf = Vec::new();
        stats.write_report(&[Metric::Vars], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "5\n");
    }

    #[test]
    fn exit_increments_insts_without_touching_hot() {
        let mut stats = Stats::new();
        stats.record_exit();
        let mut buf = Vec::new();
        stats.write_report(&[Metric::Insts, Metric::Hot], &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1\n0\n");
    }

    #[test]
    fn report_order_follows_requested_order() {
        let mut stats = Stats::new();
        stats.record_executed(9);
        stats.observe_live_vars(2);
        let mut buf = Vec::new();
        stats
            .write_report(&[Metric::Vars, Metric::Insts, Metric::Hot], &mut buf)
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "2\n1\n9\n");
    }
}
