//! Parsed script container: the flat instruction vector plus per-handler
//! frame descriptors, split across the two handler namespaces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::instr::Instruction;

/// How a name resolves inside a handler's frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableBinding {
    /// Caller argument, 1-based
    Parameter(usize),
    /// Local slot at base pointer + offset; offset 2 is the `result` local
    Local(isize),
}

impl VariableBinding {
    /// The instruction that pushes this binding onto the stack
    pub fn instruction(&self) -> Instruction {
        match self {
            VariableBinding::Parameter(i) => Instruction::Parameter(*i),
            VariableBinding::Local(offset) => Instruction::StackValueBpRelative(*offset),
        }
    }
}

/// Per-handler variable table. Names are stored lowercased; lookups are
/// case-insensitive because the surface language is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variables {
    /// Count of local slots the handler reserves (including `result`)
    pub num_locals: usize,
    /// Count of declared parameters
    pub num_parameters: usize,
    pub bindings: HashMap<String, VariableBinding>,
}

impl Variables {
    /// Register a new local and return its binding. The first local lands
    /// at base pointer + 2, right after the frame bookkeeping cells.
    pub fn add_local(&mut self, name: &str) -> VariableBinding {
        let binding = VariableBinding::Local(2 + self.num_locals as isize);
        self.num_locals += 1;
        self.bindings.insert(name.to_ascii_lowercase(), binding);
        binding
    }

    /// Register the next parameter under the given name
    pub fn add_parameter(&mut self, name: &str) -> VariableBinding {
        self.num_parameters += 1;
        let binding = VariableBinding::Parameter(self.num_parameters);
        self.bindings.insert(name.to_ascii_lowercase(), binding);
        binding
    }

    /// Case-insensitive binding lookup
    pub fn lookup(&self, name: &str) -> Option<VariableBinding> {
        self.bindings.get(&name.to_ascii_lowercase()).copied()
    }
}

/// Everything the runtime needs to enter one handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDescriptor {
    /// Index of the handler's `Reserve` instruction
    pub first_instruction: usize,
    pub variables: Variables,
}

/// A parsed script: instructions plus the two handler namespaces.
///
/// `commands` and `functions` may contain the same name; they are looked up
/// independently, so a function never satisfies a command-position call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub instructions: Vec<Instruction>,
    pub commands: HashMap<String, FrameDescriptor>,
    pub functions: HashMap<String, FrameDescriptor>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a handler in the namespace selected by `is_command`.
    /// Handler names are case-insensitive.
    pub fn handler(&self, name: &str, is_command: bool) -> Option<&FrameDescriptor> {
        let namespace = if is_command {
            &self.commands
        } else {
            &self.functions
        };
        namespace.get(&name.to_ascii_lowercase())
    }

    /// JSON dump of the parsed script, for debugging and tooling
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locals_start_after_bookkeeping() {
        let mut variables = Variables::default();
        let result = variables.add_local("result");
        let other = variables.add_local("myVar");

        assert_eq!(result, VariableBinding::Local(2));
        assert_eq!(other, VariableBinding::Local(3));
        assert_eq!(variables.num_locals, 2);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut variables = Variables::default();
        variables.add_local("myVar");
        assert!(variables.lookup("MYVAR").is_some());
        assert!(variables.lookup("myvar").is_some());
        assert!(variables.lookup("other").is_none());
    }

    #[test]
    fn test_parameters_are_one_based() {
        let mut variables = Variables::default();
        assert_eq!(variables.add_parameter("a"), VariableBinding::Parameter(1));
        assert_eq!(variables.add_parameter("b"), VariableBinding::Parameter(2));
    }

    #[test]
    fn test_namespaces_are_disjoint() {
        let mut script = Script::new();
        script.commands.insert(
            "quoted".to_string(),
            FrameDescriptor {
                first_instruction: 0,
                variables: Variables::default(),
            },
        );

        assert!(script.handler("quoted", true).is_some());
        assert!(script.handler("Quoted", true).is_some());
        assert!(script.handler("quoted", false).is_none());
    }
}
