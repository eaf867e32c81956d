//! External process execution behind a stubbable seam.

use std::ffi::OsStr;
use std::io::{self, Write};
use std::process::{ChildStdin, Command, Stdio};
use std::thread;

/// Captured result of a finished process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion, feeding `stdin` if given.
    fn run(
        &self,
        program: &str,
        args: &[&OsStr],
        stdin: Option<&[u8]>,
    ) -> io::Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(
        &self,
        program: &str,
        args: &[&OsStr],
        stdin: Option<&[u8]>,
    ) -> io::Result<CommandOutput> {
        (**self).run(program, args, stdin)
    }
}

/// Spawns real processes through `std::process::Command`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&OsStr],
        stdin: Option<&[u8]>,
    ) -> io::Result<CommandOutput> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(stdin.map_or_else(Stdio::null, |_| Stdio::piped()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        // stdin is written on another thread while stdout and stderr drain
        let feeder = match (child.stdin.take(), stdin) {
            (Some(pipe), Some(input)) => Some(feed(pipe, input.to_vec())),
            _ => None,
        };

        let output = child.wait_with_output()?;
        if let Some(feeder) = feeder {
            feeder
                .join()
                .map_err(|_| io::Error::other("stdin writer panicked"))??;
        }
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Write `input` to `pipe` and close it so the child sees EOF. A child that
/// exits without reading everything is not an error.
fn feed(mut pipe: ChildStdin, input: Vec<u8>) -> thread::JoinHandle<io::Result<()>> {
    thread::spawn(move || match pipe.write_all(&input) {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
        _ => Ok(()),
    })
}
