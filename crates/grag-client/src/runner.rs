//! Subprocess invocation of the external indexing engine
//!
//! The runner is constructed once at process start and passed by reference
//! wherever it is needed; it holds no state beyond the launcher command.

use std::process::Command;

use grag_core::request::path_arg;
use grag_core::{Error, IndexingRequest, PromptTuneRequest, Result};

/// Captured output of one engine invocation
///
/// Raw text only; a non-zero exit is not classified beyond carrying the
/// status code. Empty stderr is substituted with `"none"` so callers always
/// have a string to display.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Builds and executes engine invocations
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    leading_args: Vec<String>,
}

impl CommandRunner {
    /// Runner for a `graphrag` launcher on PATH
    pub fn new() -> Self {
        Self::with_program("graphrag", &[])
    }

    /// Runner for a custom launcher, e.g. `python` with `-m graphrag`
    pub fn with_program(program: impl Into<String>, leading_args: &[&str]) -> Self {
        Self {
            program: program.into(),
            leading_args: leading_args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument list for an indexing invocation
    pub fn indexing_args(&self, request: &IndexingRequest) -> Vec<String> {
        let mut args = vec!["index".to_string()];
        if request.init {
            args.push("--init".to_string());
        }
        args.push("--root".to_string());
        args.push(path_arg(&request.root));
        if let Some(config) = &request.config {
            args.push("--config".to_string());
            args.push(path_arg(config));
        }
        if let Some(resume) = &request.resume {
            args.push("--resume".to_string());
            args.push(resume.clone());
        }
        if !request.emit.is_empty() {
            let formats: Vec<&str> = request.emit.iter().map(|f| f.as_flag()).collect();
            args.push("--emit".to_string());
            args.push(formats.join(","));
        }
        if let Some(reporter) = &request.reporter {
            args.push("--reporter".to_string());
            args.push(reporter.as_flag().to_string());
        }
        if request.verbose {
            args.push("--verbose".to_string());
        }
        if request.dry_run {
            args.push("--dry-run".to_string());
        }
        if request.no_cache {
            args.push("--no-cache".to_string());
        }
        if request.skip_validations {
            args.push("--skip-validations".to_string());
        }
        if request.mem_profile {
            args.push("--memprofile".to_string());
        }
        args
    }

    /// Argument list for a prompt-tuning invocation
    pub fn prompt_tune_args(&self, request: &PromptTuneRequest) -> Vec<String> {
        let mut args = vec![
            "prompt-tune".to_string(),
            "--root".to_string(),
            path_arg(&request.root),
            "--config".to_string(),
            path_arg(&request.config),
        ];
        if let Some(domain) = &request.domain {
            args.push("--domain".to_string());
            args.push(domain.clone());
        }
        args.push("--limit".to_string());
        args.push(request.limit.to_string());
        if let Some(language) = &request.language {
            args.push("--language".to_string());
            args.push(language.clone());
        }
        args.push("--max-tokens".to_string());
        args.push(request.max_tokens.to_string());
        args.push("--chunk-size".to_string());
        args.push(request.chunk_size.to_string());
        if request.no_entity_types {
            args.push("--no-entity-types".to_string());
        }
        args.push("--output".to_string());
        args.push(path_arg(&request.output));
        args
    }

    /// Run an indexing invocation, capturing stdout/stderr text
    pub fn run_indexing(&self, request: &IndexingRequest) -> Result<CommandOutput> {
        self.execute(self.indexing_args(request))
    }

    /// Run a prompt-tuning invocation, capturing stdout/stderr text
    pub fn run_prompt_tune(&self, request: &PromptTuneRequest) -> Result<CommandOutput> {
        self.execute(self.prompt_tune_args(request))
    }

    fn execute(&self, args: Vec<String>) -> Result<CommandOutput> {
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .output()
            .map_err(|e| Error::Engine(format!("failed to launch {}: {}", self.program, e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let mut stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if stderr.is_empty() {
            stderr = "none".to_string();
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            status: output.status.code(),
        })
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grag_core::{EmitFormat, Reporter};

    #[test]
    fn test_indexing_args_minimal() {
        let runner = CommandRunner::new();
        let request = IndexingRequest::builder("./ragtest")
            .init(true)
            .build()
            .unwrap();
        insta::assert_snapshot!(
            runner.indexing_args(&request).join(" "),
            @"index --init --root ./ragtest"
        );
    }

    #[test]
    fn test_indexing_args_full() {
        let runner = CommandRunner::new();
        let request = IndexingRequest::builder("./ragtest")
            .config("./ragtest/settings.yaml")
            .resume("run-7")
            .emit(vec![EmitFormat::Json, EmitFormat::Parquet])
            .reporter(Reporter::Print)
            .verbose(true)
            .dry_run(true)
            .build()
            .unwrap();
        insta::assert_snapshot!(
            runner.indexing_args(&request).join(" "),
            @"index --root ./ragtest --config ./ragtest/settings.yaml --resume run-7 --emit json,parquet --reporter print --verbose --dry-run"
        );
    }

    #[test]
    fn test_prompt_tune_args() {
        let runner = CommandRunner::new();
        let request = PromptTuneRequest::builder("./ragtest")
            .domain("Cybersecurity Syllabus")
            .language("Chinese")
            .no_entity_types(true)
            .build()
            .unwrap();
        let args = runner.prompt_tune_args(&request);
        assert_eq!(args[0], "prompt-tune");
        assert!(args.contains(&"--no-entity-types".to_string()));
        assert!(args.contains(&"Cybersecurity Syllabus".to_string()));
        let limit_pos = args.iter().position(|a| a == "--limit").unwrap();
        assert_eq!(args[limit_pos + 1], "15");
        assert_eq!(args.last().unwrap(), "./ragtest/prompts");
    }

    #[test]
    fn test_missing_launcher_reports_engine_error() {
        let runner = CommandRunner::with_program("definitely-not-a-real-binary-9x", &[]);
        let request = IndexingRequest::builder("./ragtest").build().unwrap();
        let err = runner.run_indexing(&request).unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
    }

    #[test]
    fn test_empty_stderr_substituted() {
        // `true` exits 0 and writes nothing to either stream
        let runner = CommandRunner::with_program("true", &[]);
        let request = IndexingRequest::builder("./ragtest").build().unwrap();
        let output = runner.run_indexing(&request).unwrap();
        assert_eq!(output.stderr, "none");
        assert!(output.success());
    }
}
