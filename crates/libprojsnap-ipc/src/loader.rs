use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;

use libprojsnap_core::error::SnapError;
use libprojsnap_core::loader::ProjectLoader;
use libprojsnap_core::protocol;
use libprojsnap_core::types::{GlobalProperties, ProjectInfo};
use tracing::debug;

use crate::context::ContextDocument;
use crate::error::IpcError;
use crate::{FALLBACK_COMMAND_FLAG, READER_LOG_ENV};

/// Loads one project by running the reader executable
#[derive(Debug)]
pub struct ProcessLoader {
    reader: PathBuf,
    properties: GlobalProperties,
    fallback_command: Vec<String>,
    used: bool,
}

impl ProcessLoader {
    pub fn new(reader: impl Into<PathBuf>, properties: GlobalProperties) -> Self {
        Self {
            reader: reader.into(),
            properties,
            fallback_command: Vec::new(),
            used: false,
        }
    }

    pub fn with_fallback_command(mut self, command: Vec<String>) -> Self {
        self.fallback_command = command;
        self
    }

    /// Run the reader for `project` and parse what it prints
    pub fn run(&self, project: &Path) -> Result<ProjectInfo, IpcError> {
        if !self.reader.is_file() {
            return Err(IpcError::ReaderNotFound(self.reader.clone()));
        }

        let mut command = Command::new(&self.reader);
        for word in &self.fallback_command {
            command.arg(FALLBACK_COMMAND_FLAG).arg(word);
        }
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_remove(READER_LOG_ENV);
        if let Some(dir) = self.reader.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        debug!(reader = %self.reader.display(), project = %project.display(), "spawning reader");
        let mut child = command.spawn().map_err(|source| IpcError::Spawn {
            program: self.reader.clone(),
            source,
        })?;

        let context = ContextDocument::new(project, self.properties.clone()).to_xml();
        let (stdout, stderr, status) = match exchange(&mut child, &context) {
            Ok(output) => output,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };

        if !status.success() || !stderr.trim().is_empty() {
            return Err(IpcError::ReaderFailed {
                status: status.to_string(),
                stderr: stderr.trim_end().to_string(),
            });
        }

        Ok(protocol::read_project(&stdout)?)
    }
}

/// Drain stderr and feed the context on their own threads while stdout is
/// read here, so no pipe can fill up while another is blocked, then reap the
/// child
fn exchange(child: &mut Child, context: &str) -> Result<(String, String, std::process::ExitStatus), IpcError> {
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut text = String::new();
            stderr.read_to_string(&mut text).map(|_| text)
        })
    });

    let stdin_writer = child.stdin.take().map(|mut stdin| {
        let context = context.to_string();
        thread::spawn(move || match stdin.write_all(context.as_bytes()) {
            // a reader that fails early may exit before reading its input
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            other => other,
        })
    });

    let mut stdout = String::new();
    if let Some(mut pipe) = child.stdout.take() {
        pipe.read_to_string(&mut stdout)?;
    }
    let status = child.wait()?;

    if let Some(handle) = stdin_writer {
        join(handle, "stdin writer")??;
    }
    let stderr = match stderr_reader {
        Some(handle) => join(handle, "stderr reader")??,
        None => String::new(),
    };

    Ok((stdout, stderr, status))
}

fn join<T>(handle: thread::JoinHandle<T>, name: &str) -> Result<T, IpcError> {
    handle
        .join()
        .map_err(|_| IpcError::Io(std::io::Error::new(ErrorKind::Other, format!("{name} panicked"))))
}

impl ProjectLoader for ProcessLoader {
    fn load(&mut self, path: &Path) -> Result<ProjectInfo, SnapError> {
        if self.used {
            return Err(SnapError::LoaderReused);
        }
        self.used = true;
        self.run(path).map_err(|e| e.into_snap_error(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_reader_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = ProcessLoader::new(dir.path().join("no-such-reader"), GlobalProperties::new());

        let err = loader.load(Path::new("/w/A.csproj")).unwrap_err();
        match err {
            SnapError::Transport { message, .. } => assert!(message.contains("reader executable not found")),
            other => panic!("expected transport error, got {other:?}"),
        }
        assert!(matches!(loader.load(Path::new("/w/A.csproj")), Err(SnapError::LoaderReused)));
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-reader.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_stderr_output_fails_load_even_on_success_exit() {
        let dir = tempfile::tempdir().unwrap();
        let reader = script(dir.path(), "cat > /dev/null\necho 'warning: something odd' >&2\nexit 0");

        let err = ProcessLoader::new(reader, GlobalProperties::new())
            .run(Path::new("/w/A.csproj"))
            .unwrap_err();
        match err {
            IpcError::ReaderFailed { stderr, .. } => assert_eq!(stderr, "warning: something odd"),
            other => panic!("expected reader failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_large_stderr_before_reading_context_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let reader = script(
            dir.path(),
            "head -c 200000 /dev/zero | tr '\\0' x >&2\ncat > /dev/null\nexit 0",
        );
        let properties: GlobalProperties = [("Padding", "y".repeat(200_000))].into_iter().collect();

        let err = ProcessLoader::new(reader, properties)
            .run(Path::new("/w/A.csproj"))
            .unwrap_err();
        match err {
            IpcError::ReaderFailed { stderr, .. } => assert_eq!(stderr.len(), 200_000),
            other => panic!("expected reader failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let reader = script(dir.path(), "exit 3");

        let err = ProcessLoader::new(reader, GlobalProperties::new())
            .run(Path::new("/w/A.csproj"))
            .unwrap_err();
        assert!(matches!(err, IpcError::ReaderFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_context_reaches_reader_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let captured = dir.path().join("context.xml");
        let reader = script(
            dir.path(),
            &format!("cat > '{}'\necho '<Nope />'", captured.display()),
        );
        let properties: GlobalProperties = [("Configuration", "Release")].into_iter().collect();

        let err = ProcessLoader::new(reader, properties.clone())
            .run(Path::new("/w/A.csproj"))
            .unwrap_err();
        assert!(matches!(err, IpcError::Protocol(_)));

        let context = ContextDocument::parse(&std::fs::read_to_string(captured).unwrap()).unwrap();
        assert_eq!(context, ContextDocument::new("/w/A.csproj", properties));
    }
}
