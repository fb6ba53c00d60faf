use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use crate::error::WorkerError;

/// An executable resolved on `PATH` and its argument list. Immutable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    program: String,
    path: PathBuf,
    args: Vec<String>,
}

impl Command {
    /// Resolves `program` on `PATH`.
    ///
    /// Fails with [`WorkerError::ExecutableNotFound`] naming `program`.
    pub fn new<I, S>(program: &str, args: I) -> Result<Self, WorkerError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = which::which(program).map_err(|_| WorkerError::ExecutableNotFound {
            executable: program.to_string(),
        })?;
        Ok(Self {
            program: program.to_string(),
            path,
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// Builds a command from `argv` (program first).
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Result<Self, WorkerError> {
        let (program, args) = argv.split_first().ok_or(WorkerError::ExecutableNotFound {
            executable: String::new(),
        })?;
        Self::new(program.as_ref(), args.iter().map(|a| a.as_ref().to_string()))
    }

    /// Program name as given.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Absolute path the program resolved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Process builder with stdin closed and stdout/stderr piped.
    ///
    /// `kill_on_drop` guarantees a child cannot outlive a lost supervisor.
    pub(crate) fn to_process(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}
