use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::EvaluationError;

/// Post-processing hook run when evaluation resolved no metadata references
///
/// Some environments skip the dependency-resolution hooks during evaluation.
/// A fallback resolves the references some other way, typically by running
/// the host's reference-resolution target for the project.
pub trait ReferenceFallback: Send + Sync {
    fn resolve(&self, project_path: &Path) -> Result<Vec<PathBuf>, EvaluationError>;
}

/// Runs `program args... <project>` and harvests each stdout line naming an
/// existing file
#[derive(Debug, Clone)]
pub struct CommandFallback {
    program: String,
    args: Vec<String>,
}

impl CommandFallback {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a command line given as a list, program first
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl ReferenceFallback for CommandFallback {
    fn resolve(&self, project_path: &Path) -> Result<Vec<PathBuf>, EvaluationError> {
        debug!(program = %self.program, project = %project_path.display(), "running reference fallback");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(project_path)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(EvaluationError::Other(format!(
                "reference fallback '{}' exited with {}",
                self.program, output.status
            )));
        }

        let base = project_path.parent().unwrap_or(Path::new("."));
        let references = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| super::resolve_against(base, line))
            .filter(|path| path.is_file())
            .collect();
        Ok(references)
    }
}
