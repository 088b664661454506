use std::collections::HashMap;

use crate::error::RuntimeError;

/// Maps label name to instruction index within the sorted executable vector.
///
/// Built once during loading, then read-only for the rest of execution.
#[derive(Debug, Default)]
pub struct LabelTable {
    targets: HashMap<String, usize>,
}

impl LabelTable {
    pub fn new() -> LabelTable {
        LabelTable {
            targets: HashMap::new(),
        }
    }

    /// Registers `name` at `index`. Duplicate names are a semantic error (code 52).
    pub fn define(&mut self, name: &str, index: usize) -> Result<(), RuntimeError> {
        if self.targets.contains_key(name) {
            return Err(RuntimeError::Redefinition(format!("label {}", name)));
        }
        self.targets.insert(name.to_string(), index);
        Ok(())
    }

    /// Resolves a jump target. Missing names are a semantic error (code 52).
    pub fn resolve(&self, name: &str) -> Result<usize, RuntimeError> {
        self.targets
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::LabelUndefined(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_label_is_redefinition_error() {
        let mut labels = LabelTable::new();
        labels.define("loop", 3).unwrap();
        assert!(matches!(
            labels.define("loop", 5).unwrap_err(),
            RuntimeError::Redefinition(_)
        ));
    }

    #[test]
    fn unknown_label_is_undefined_error() {
        let labels = LabelTable::new();
        assert!(matches!(
            labels.resolve("nowhere").unwrap_err(),
            RuntimeError::LabelUndefined(_)
        ));
    }

    #[test]
    fn resolves_to_registered_index() {
        let mut labels = LabelTable::new();
        labels.define("here", 4).unwrap();
        assert_eq!(labels.resolve("here").unwrap(), 4);
    }
}
