use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::GenerationProvider;
use crate::error::ProviderError;

/// Runs an external command (typically an LLM CLI) with the prompt as its
/// last argument and returns its stdout
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandGenerator {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "command".to_string());
        Self {
            program,
            args: Vec::new(),
            name,
        }
    }

    /// Split a command line like `llm -m mini` into program and arguments
    pub fn from_command_line(line: &str) -> Result<Self, ProviderError> {
        let mut parts = line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ProviderError::NotConfigured("empty generator command".into()))?;
        Ok(Self::new(program).with_args(parts.map(str::to_string)))
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }
}

#[async_trait]
impl GenerationProvider for CommandGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        // Prompt goes last
        cmd.arg(prompt);

        // Close stdin so the command never waits for input
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // A generation timeout drops this future; take the child with it
        cmd.kill_on_drop(true);

        tracing::debug!("Running generator {:?} {:?}", self.program, self.args);

        let output = cmd.output().await?;

        let response = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stderr.trim().is_empty() {
            tracing::warn!("{} stderr: {}", self.name, stderr.trim());
        }

        if !output.status.success() {
            return Err(ProviderError::Backend(format!(
                "{} exited with {}: {}",
                self.name,
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_line() {
        let generator = CommandGenerator::from_command_line("llm -m mini").unwrap();
        assert_eq!(generator.name(), "llm");
        assert_eq!(generator.args, vec!["-m", "mini"]);

        assert!(matches!(
            CommandGenerator::from_command_line("   "),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_prompt_passed_as_last_argument() {
        let generator = CommandGenerator::new("echo").with_args(vec!["answer:".to_string()]);
        let answer = generator.generate("pix is free").await.unwrap();
        assert_eq!(answer, "answer: pix is free");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_backend_error() {
        let generator = CommandGenerator::new("false");
        let result = generator.generate("anything").await;
        assert!(matches!(result, Err(ProviderError::Backend(_))));
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let generator = CommandGenerator::new("/nonexistent/ragdesk-generator");
        let result = generator.generate("anything").await;
        assert!(matches!(result, Err(ProviderError::Io(_))));
    }
}
