use result::Result;
use std::process::{ExitStatus, Stdio};
use std::string::FromUtf8Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use error::*;

/// Builds a [Command](tokio::process::Command) along with a human readable rendition
/// of it for use in error messages. This is the shared plumbing behind [cmd] and [output].
#[doc(hidden)]
#[macro_export]
macro_rules! command {
    ($command:expr $(,$args:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut cmd = $crate::tokio::process::Command::new($command);
            $(cmd.arg($args);)*
            #[allow(unused_mut)]
            let mut debug_string: Vec<String> = vec![format!("{}", $command)];
            $(
                debug_string.push(format!("{}", $args));
            )*
            (cmd, debug_string.join(" "))
        }
    };
}

/// cmd runs any arbitrary system command asynchronously and returns the resulting stdout.
/// The returned stdout is guaranteed to not have any trailing newlines or spaces.
///
/// A non-zero exit status is an error, and stderr is included in that error.
///
/// ```ignore
/// cmd!("ls").await?;
/// cmd!("ls", "-al").await?;
/// let greeting = cmd!(stdin = "hello!", "cat").await?;
/// ```
#[macro_export]
macro_rules! cmd {
    (stdin=$stdin:expr, $command:expr $(,$args:expr)*) => {
        {
            let (cmd, debug_string) = $crate::command!($command $(,$args)*);
            $crate::process::exec(Some($stdin), cmd, debug_string)
        }
    };
    ($command:expr $(,$args:expr)*) => {
        {
            let (cmd, debug_string) = $crate::command!($command $(,$args)*);
            $crate::process::exec(None::<&[u8]>, cmd, debug_string)
        }
    };
}

/// output runs a system command the same way as [cmd], except that the exit status is
/// handed back to the caller in an [Output](crate::process::Output) rather than turned into an
/// error. This is for callers that need to make sense of a failing command's stderr themselves.
///
/// ```ignore
/// let output = output!(stdin = request, "aws", "ecr", "put-image").await?;
/// if !output.success() {
///     eprintln!("{}", output.stderr);
/// }
/// ```
#[macro_export]
macro_rules! output {
    (stdin=$stdin:expr, $command:expr $(,$args:expr)*) => {
        {
            let (cmd, debug_string) = $crate::command!($command $(,$args)*);
            $crate::process::output(Some($stdin), cmd, debug_string)
        }
    };
    ($command:expr $(,$args:expr)*) => {
        {
            let (cmd, debug_string) = $crate::command!($command $(,$args)*);
            $crate::process::output(None::<&[u8]>, cmd, debug_string)
        }
    };
}

/// The captured result of a finished command.
#[derive(Debug)]
pub struct Output {
    /// The command as it would have been typed into a shell.
    pub command: String,
    pub status: ExitStatus,
    /// Stdout with trailing whitespace removed.
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs the command to completion, returning stdout. A non-zero exit is a [CommandFailed] error.
pub async fn exec<S: AsRef<[u8]>>(
    stdin: Option<S>,
    cmd: Command,
    debug_string: String,
) -> Result<String> {
    let output = output(stdin, cmd, debug_string).await?;
    if !output.success() {
        return Err(CommandFailed {
            command: output.command,
            status: output.status,
            stderr: output.stderr,
        }
        .into());
    }
    Ok(output.stdout)
}

/// Runs the command to completion and captures both of its output streams. Only failing to
/// run the command at all (or receiving non UTF-8 output) is an error.
pub async fn output<S: AsRef<[u8]>>(
    stdin: Option<S>,
    mut cmd: Command,
    debug_string: String,
) -> Result<Output> {
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    let mut child = cmd.spawn().map_err(|err| FailedToSpawn {
        command: debug_string.clone(),
        source: err,
    })?;
    // Stdin is fed while stdout and stderr are drained, so a child that writes a lot before
    // it has read all of its input cannot block on a full pipe. Dropping the pipe is the EOF.
    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(stdin), Some(mut pipe)) = (stdin, pipe) {
            pipe.write_all(stdin.as_ref()).await?;
        }
        Ok::<_, std::io::Error>(())
    };
    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    fed.map_err(|err| FailedToWriteStdin {
        command: debug_string.clone(),
        source: err,
    })?;
    let output = output.map_err(|err| FailedToRun {
        command: debug_string.clone(),
        source: err,
    })?;
    let stderr = String::from_utf8(output.stderr.clone()).map_err(|err| InvalidUTF8Stderr {
        command: debug_string.clone(),
        output: String::from_utf8_lossy(&output.stderr).to_string(),
        source: err,
    })?;
    let stdout = String::from_utf8(output.stdout.clone()).map_err(|err| InvalidUTF8 {
        command: debug_string.clone(),
        output: String::from_utf8_lossy(&output.stdout).to_string(),
        source: err,
    })?;
    Ok(Output {
        command: debug_string,
        status: output.status,
        stdout: stdout.trim_end().to_string(),
        stderr,
    })
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error(r#"Failed to spawn the "{command}" command. Is it installed and on the PATH?"#)]
struct FailedToSpawn {
    command: String,
    #[source]
    source: std::io::Error,
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error(r#"Failed to write to the stdin of "{command}""#)]
struct FailedToWriteStdin {
    command: String,
    #[source]
    source: std::io::Error,
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error(r#"Stdout for "{command}" was not valid UTF-8, got the following (lossy) {output}"#)]
struct InvalidUTF8 {
    command: String,
    // Lossy, so expect the odd replacement character.
    output: String,
    #[source]
    source: FromUtf8Error,
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error(r#"Stderr for "{command}" was not valid UTF-8, got the following (lossy) {output}"#)]
struct InvalidUTF8Stderr {
    command: String,
    output: String,
    #[source]
    source: FromUtf8Error,
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error(r#"Failed to wait on the "{command}" command"#)]
struct FailedToRun {
    command: String,
    #[source]
    source: std::io::Error,
}

#[derive(Error, PromoterError, Kind, Debug)]
#[error(r#"Failed to execute "{command}" ({status}). Stderr was {stderr}"#)]
struct CommandFailed {
    command: String,
    status: ExitStatus,
    stderr: String,
}
