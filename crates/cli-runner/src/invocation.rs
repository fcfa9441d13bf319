//! Command invocation and captured output

use std::time::Duration;

/// A single external command: program, arguments, extra environment and an optional timeout.
///
/// Environment values are never included in [`Invocation::command_line`], so secrets
/// (SSH passwords, API keys) are passed through `env` rather than as arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Override the runner's default timeout for this command
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn environment(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    /// Printable form used in logs and error messages
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True when every token appears among the arguments
    pub fn has_args(&self, tokens: &[&str]) -> bool {
        tokens
            .iter()
            .all(|token| self.args.iter().any(|arg| arg == token))
    }
}

/// Output captured from a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn status_text(&self) -> String {
        match self.status {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_omits_environment() {
        let invocation = Invocation::new("ibmcloud")
            .args(["login", "--no-region", "--quiet"])
            .env("IBMCLOUD_API_KEY", "secret");
        assert_eq!(invocation.command_line(), "ibmcloud login --no-region --quiet");
        assert!(!invocation.command_line().contains("secret"));
    }

    #[test]
    fn test_has_args_matches_all_tokens() {
        let invocation = Invocation::new("oc").args(["get", "agents", "-n", "clusters-demo"]);
        assert!(invocation.has_args(&["get", "agents"]));
        assert!(invocation.has_args(&[]));
        assert!(!invocation.has_args(&["get", "infraenv"]));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(CommandOutput::ok("").status_text(), "exit status 0");
        assert_eq!(CommandOutput::failed(2, "boom").status_text(), "exit status 2");
        let signalled = CommandOutput {
            status: None,
            ..CommandOutput::default()
        };
        assert!(!signalled.success());
        assert_eq!(signalled.status_text(), "terminated by signal");
    }
}
