use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::{ConvertError, Converter};

/// Placeholder in `args` replaced by the input path.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Runs an external program and takes its standard output as the Markdown.
///
/// The input path is substituted for every `{input}` argument, or appended
/// when no argument contains the placeholder. The child is killed if the
/// conversion future is dropped, so a job timeout does not leak processes.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command_args(&self, path: &Path) -> Vec<String> {
        let input = path.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(INPUT_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(INPUT_PLACEHOLDER, &input)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(input.into_owned());
        }
        args
    }
}

#[async_trait]
impl Converter for CommandConverter {
    fn name(&self) -> &str {
        &self.program
    }

    async fn convert_file(&self, path: &Path) -> Result<String, ConvertError> {
        let output = Command::new(&self.program)
            .args(self.command_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ConvertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(program = %self.program, status = %output.status, "converter failed");
            return Err(ConvertError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr,
            });
        }

        String::from_utf8(output.stdout).map_err(|_| ConvertError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn input_is_appended_without_placeholder() {
        let conv = CommandConverter::new("markitdown");
        let args = conv.command_args(Path::new("/tmp/a.pdf"));
        assert_eq!(args, vec!["/tmp/a.pdf".to_string()]);
    }

    #[test]
    fn placeholder_is_substituted() {
        let conv = CommandConverter::new("pandoc").with_args(["-t", "gfm", "{input}"]);
        let args = conv.command_args(&PathBuf::from("/tmp/a.docx"));
        assert_eq!(args, vec!["-t", "gfm", "/tmp/a.docx"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_becomes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.html");
        std::fs::write(&path, "# Title\n").unwrap();

        let md = CommandConverter::new("cat").convert_file(&path).await.unwrap();
        assert_eq!(md, "# Title\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");

        let err = CommandConverter::new("cat")
            .convert_file(&missing)
            .await
            .unwrap_err();
        match err {
            ConvertError::Failed { stderr, .. } => assert!(!stderr.is_empty()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = CommandConverter::new("doc2md-no-such-program")
            .convert_file(Path::new("x.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Spawn { .. }));
    }
}
