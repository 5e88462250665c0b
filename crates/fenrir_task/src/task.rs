use std::{
    borrow::Cow,
    ffi::OsString,
    fmt::{Display, Formatter},
    fs::File,
    io,
    path::PathBuf,
    process::{ExitStatus, Stdio},
};

use itertools::Itertools;
use tokio::{io::AsyncWriteExt, process::Command};

use crate::error::{InvalidTaskError, TaskError};

/// Where a task reads its standard input from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TaskInput {
    /// The child reads from an empty stream.
    #[default]
    Null,
    /// The child shares the standard input of this process.
    Inherit,
    /// The bytes are written to the child's standard input, which is closed
    /// afterwards.
    Bytes(Vec<u8>),
}

impl TaskInput {
    fn stdio(&self) -> Stdio {
        match self {
            TaskInput::Null => Stdio::null(),
            TaskInput::Inherit => Stdio::inherit(),
            TaskInput::Bytes(_) => Stdio::piped(),
        }
    }
}

/// Where a task writes its standard output or standard error to.
#[derive(Debug, Default)]
pub enum TaskOutput {
    /// Collected into a buffer owned by the task and returned in
    /// [`RunOutput`].
    #[default]
    Capture,
    /// Written straight to the stream of this process. Nothing is captured.
    Inherit,
    /// Discarded.
    Null,
    /// Written to an open file, e.g. a log. Nothing is captured.
    File(File),
}

impl TaskOutput {
    fn stdio(&self) -> io::Result<Stdio> {
        Ok(match self {
            TaskOutput::Capture => Stdio::piped(),
            TaskOutput::Inherit => Stdio::inherit(),
            TaskOutput::Null => Stdio::null(),
            TaskOutput::File(file) => Stdio::from(file.try_clone()?),
        })
    }
}

/// The result of a successful run. For a chain this is the output of the last
/// command.
#[derive(Debug)]
pub struct RunOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl RunOutput {
    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }
}

/// Collects the configuration of a task and its successors.
///
/// Every method consumes and returns the builder, so a task is configured in
/// one expression and then turned into an immutable [`Task`] with
/// [`TaskBuilder::build`].
#[derive(Debug)]
pub struct TaskBuilder {
    program: PathBuf,
    args: Vec<OsString>,
    stdin: TaskInput,
    stdout: TaskOutput,
    stderr: TaskOutput,
    next: Option<Box<TaskBuilder>>,
}

impl TaskBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: TaskInput::default(),
            stdout: TaskOutput::default(),
            stderr: TaskOutput::default(),
            next: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the standard input of the task. Only the first task of a chain
    /// uses this, every successor reads the output of its predecessor.
    pub fn stdin(mut self, input: TaskInput) -> Self {
        self.stdin = input;
        self
    }

    pub fn stdout(mut self, output: TaskOutput) -> Self {
        self.stdout = output;
        self
    }

    pub fn stderr(mut self, output: TaskOutput) -> Self {
        self.stderr = output;
        self
    }

    /// Appends `next` to the end of the chain: `a.then(b).then(c)` runs
    /// `a | b | c`.
    pub fn then(mut self, next: TaskBuilder) -> Self {
        self.next = Some(Box::new(match self.next.take() {
            Some(existing) => existing.then(next),
            None => next,
        }));
        self
    }

    pub fn build(self) -> Result<Task, InvalidTaskError> {
        let TaskBuilder {
            program,
            args,
            stdin,
            stdout,
            stderr,
            mut next,
        } = self;

        let head = Stage {
            program,
            args,
            stdout,
            stderr,
        };
        let mut tail = Vec::new();
        while let Some(builder) = next {
            let builder = *builder;
            if builder.stdin != TaskInput::Null {
                tracing::debug!(
                    "ignoring the configured input of '{}', it reads the output of its predecessor",
                    builder.program.display()
                );
            }
            tail.push(Stage {
                program: builder.program,
                args: builder.args,
                stdout: builder.stdout,
                stderr: builder.stderr,
            });
            next = builder.next;
        }

        if std::iter::once(&head)
            .chain(&tail)
            .any(|stage| stage.program.as_os_str().is_empty())
        {
            return Err(InvalidTaskError::EmptyProgram);
        }

        Ok(Task {
            input: stdin,
            head,
            tail,
        })
    }
}

/// A validated, immutable chain of commands. Constructed fresh for every
/// invocation and consumed by [`Task::run`].
#[derive(Debug)]
pub struct Task {
    input: TaskInput,
    head: Stage,
    tail: Vec<Stage>,
}

impl Task {
    /// Runs the chain to completion.
    ///
    /// Each command waits for its predecessor to exit and receives the
    /// predecessor's captured standard output as its standard input. The
    /// first failing command aborts the chain; commands that already finished
    /// are not undone.
    pub async fn run(self) -> Result<RunOutput, TaskError> {
        let Task { input, head, tail } = self;

        let mut output = head.run(input, !tail.is_empty()).await?;
        let remaining = tail.len();
        for (idx, stage) in tail.into_iter().enumerate() {
            let input = TaskInput::Bytes(std::mem::take(&mut output.stdout));
            output = stage.run(input, idx + 1 < remaining).await?;
        }
        Ok(output)
    }
}

impl Display for Task {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            std::iter::once(&self.head).chain(&self.tail).format(" | ")
        )
    }
}

#[derive(Debug)]
struct Stage {
    program: PathBuf,
    args: Vec<OsString>,
    stdout: TaskOutput,
    stderr: TaskOutput,
}

impl Stage {
    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    fn io_error(&self, source: io::Error) -> TaskError {
        TaskError::Io {
            program: self.program_name(),
            source,
        }
    }

    /// Runs a single command. When `forward` is set the standard output is
    /// always captured because a successor is waiting for it.
    async fn run(&self, input: TaskInput, forward: bool) -> Result<RunOutput, TaskError> {
        let stdout = if forward {
            Stdio::piped()
        } else {
            self.stdout.stdio().map_err(|source| self.io_error(source))?
        };
        let stderr = self.stderr.stdio().map_err(|source| self.io_error(source))?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(input.stdio())
            .stdout(stdout)
            .stderr(stderr);

        tracing::debug!("running `{self}`");
        let mut child = command.spawn().map_err(|source| TaskError::Spawn {
            program: self.program_name(),
            source,
        })?;

        // Feed the input while the output is drained, otherwise a child that
        // fills its output pipe before reading all of its input never exits.
        let stdin = child.stdin.take();
        let feed = async move {
            let (Some(mut stdin), TaskInput::Bytes(bytes)) = (stdin, input) else {
                return Ok(());
            };
            match stdin.write_all(&bytes).await {
                // The child is allowed to exit without reading everything.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                result => result,
            }
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|source| self.io_error(source))?;
        tracing::debug!("`{}` exited with {}", self.program_name(), output.status);

        if !output.status.success() {
            return Err(TaskError::Execution {
                program: self.program_name(),
                status: output.status,
                stderr: output.stderr,
            });
        }
        fed.map_err(|source| self.io_error(source))?;

        Ok(RunOutput {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            std::iter::once(self.program.as_os_str())
                .chain(self.args.iter().map(OsString::as_os_str))
                .map(|part| part.to_string_lossy())
                .format(" ")
        )
    }
}
