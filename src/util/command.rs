use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How a child's combined stdout/stderr is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// Drain line by line while the process runs, then poll for exit.
    Stream,
    /// Read everything after the process closes its output.
    Bulk,
    /// Leave the terminal attached; nothing is captured.
    Inherit,
}

#[derive(Debug, Clone)]
pub struct Finished {
    pub code: Option<i32>,
    pub lines: Vec<String>,
}

pub fn describe(cmd: &Command) -> String {
    let program = cmd.get_program().to_string_lossy();
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().to_string())
        .collect();
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Runs `cmd` to completion with stdout and stderr merged into one stream.
pub fn run(mut cmd: Command, capture: Capture) -> io::Result<Finished> {
    if capture == Capture::Inherit {
        let status = cmd.status()?;
        return Ok(Finished {
            code: status.code(),
            lines: Vec::new(),
        });
    }

    let (reader, writer) = io::pipe()?;
    cmd.stdin(Stdio::null())
        .stdout(writer.try_clone()?)
        .stderr(writer);
    let mut child = cmd.spawn()?;
    // The command still owns the parent's write ends; EOF never arrives
    // until they are closed.
    drop(cmd);

    match capture {
        Capture::Stream => {
            let mut lines = Vec::new();
            for line in BufReader::new(reader).split(b'\n') {
                lines.push(decode(&reap_on_error(&mut child, line)?));
            }
            let status = loop {
                if let Some(status) = child.try_wait()? {
                    break status;
                }
                thread::sleep(EXIT_POLL_INTERVAL);
            };
            Ok(Finished {
                code: status.code(),
                lines,
            })
        }
        _ => {
            let mut output = Vec::new();
            let read = BufReader::new(reader).read_to_end(&mut output);
            reap_on_error(&mut child, read)?;
            let status = child.wait()?;
            Ok(Finished {
                code: status.code(),
                lines: split_lines(&output),
            })
        }
    }
}

/// A failed read abandons the child; kill and wait so it is not left behind
/// as a zombie.
fn reap_on_error<T>(child: &mut Child, result: io::Result<T>) -> io::Result<T> {
    if result.is_err() {
        let _ = child.kill();
        let _ = child.wait();
    }
    result
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

fn split_lines(output: &[u8]) -> Vec<String> {
    let output = output.strip_suffix(b"\n").unwrap_or(output);
    if output.is_empty() {
        return Vec::new();
    }
    output.split(|b| *b == b'\n').map(decode).collect()
}

/// A user-supplied hook command, interpreted by the shell.
pub fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}
