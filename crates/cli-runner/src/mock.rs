//! Scripted CommandRunner for unit testing
//!
//! Responses are registered per program plus a set of argument tokens. The first
//! registered rule whose tokens all appear in the invocation answers it. Each rule
//! holds a queue of responses; the last one repeats once the queue is drained.
//! Unmatched invocations succeed with empty output. Every invocation is recorded.

use crate::error::ExecError;
use crate::invocation::{CommandOutput, Invocation};
use crate::runner_trait::CommandRunner;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct Rule {
    program: String,
    tokens: Vec<String>,
    responses: VecDeque<CommandOutput>,
}

impl Rule {
    fn matches(&self, invocation: &Invocation) -> bool {
        let tokens: Vec<&str> = self.tokens.iter().map(String::as_str).collect();
        invocation.program() == self.program && invocation.has_args(&tokens)
    }

    fn next_response(&mut self) -> CommandOutput {
        if self.responses.len() > 1 {
            self.responses.pop_front().unwrap_or_default()
        } else {
            self.responses.front().cloned().unwrap_or_default()
        }
    }
}

/// Mock runner that replays scripted outputs
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRunner")
            .field("calls", &self.calls.lock().unwrap().len())
            .finish_non_exhaustive()
    }
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer matching invocations with `output` (repeated for every call)
    pub fn respond(&self, program: &str, tokens: &[&str], output: CommandOutput) {
        self.respond_sequence(program, tokens, vec![output]);
    }

    /// Answer matching invocations with each output in turn, repeating the last
    pub fn respond_sequence(&self, program: &str, tokens: &[&str], outputs: Vec<CommandOutput>) {
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            tokens: tokens.iter().map(ToString::to_string).collect(),
            responses: outputs.into(),
        });
    }

    /// All recorded invocations, oldest first
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded invocations of `program` carrying all `tokens`
    pub fn count(&self, program: &str, tokens: &[&str]) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.program() == program && call.has_args(tokens))
            .count()
    }
}

#[async_trait::async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ExecError> {
        self.calls.lock().unwrap().push(invocation.clone());
        let mut rules = self.rules.lock().unwrap();
        let output = rules
            .iter_mut()
            .find(|rule| rule.matches(invocation))
            .map_or_else(|| CommandOutput::ok(""), Rule::next_response);
        Ok(output)
    }
}
