use crate::{Result, YtAudioError};
use regex::Regex;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::OnceLock;
use std::thread::{self, JoinHandle};

/// How a command line is handed to the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// Split into words with shell quoting rules and exec the first word directly.
    Direct,
    /// Run through the platform shell (`sh -c` / `cmd /C`).
    Shell,
}

impl Invocation {
    /// Picks `Shell` when the template relies on quoting, pipes, redirections
    /// or command substitution, and `Direct` otherwise.
    ///
    /// Call this on the template *before* placeholders are substituted: URLs
    /// routinely contain `&` and `?`, which must not force a shell.
    pub fn detect(template: &str) -> Self {
        static SHELL_META_RE: OnceLock<Regex> = OnceLock::new();
        let re = SHELL_META_RE.get_or_init(|| Regex::new(r#"[|&;<>`"'\\]|\$\("#).unwrap());
        if re.is_match(template) {
            Invocation::Shell
        } else {
            Invocation::Direct
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// The whole captured output as one chunk (one-shot queries).
    Whole,
    /// One line per chunk while the process runs (progress reporting).
    Lines,
}

pub fn command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd
}

/// Launches `command_line` and returns its combined stdout/stderr as a lazy
/// sequence of text chunks.
pub fn run(command_line: &str, invocation: Invocation, mode: ReadMode) -> Result<OutputStream> {
    let mut cmd = match invocation {
        Invocation::Direct => {
            let words = shell_words::split(command_line).map_err(|e| {
                YtAudioError::Configuration(format!("cannot parse command `{command_line}`: {e}"))
            })?;
            let (program, args) = words
                .split_first()
                .ok_or_else(|| YtAudioError::Configuration("empty command".to_string()))?;
            let mut cmd = command(program);
            cmd.args(args);
            cmd
        }
        Invocation::Shell => {
            if command_line.trim().is_empty() {
                return Err(YtAudioError::Configuration("empty command".to_string()));
            }
            shell_command(command_line)
        }
    };

    log::debug!("running: {command_line}");
    let mut child = cmd.spawn().map_err(|source| YtAudioError::Execution {
        command: command_line.to_string(),
        source,
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let source = match mode {
        ReadMode::Whole => ChunkSource::Whole {
            readers: Some((stdout, stderr)),
        },
        ReadMode::Lines => {
            let (tx, rx) = mpsc::channel();
            let mut handles = Vec::new();
            if let Some(out) = stdout {
                let tx = tx.clone();
                handles.push(thread::spawn(move || forward_lines(out, tx)));
            }
            if let Some(err) = stderr {
                handles.push(thread::spawn(move || forward_lines(err, tx)));
            }
            ChunkSource::Lines { rx, handles }
        }
    };

    Ok(OutputStream {
        command: command_line.to_string(),
        child,
        source,
        status: None,
    })
}

/// Convenience for one-shot queries: the whole output, or an empty string
/// when the process wrote nothing.
pub fn run_to_string(command_line: &str, invocation: Invocation) -> Result<String> {
    let mut stream = run(command_line, invocation, ReadMode::Whole)?;
    let out = stream.next().unwrap_or_default();
    stream.finish()?;
    Ok(out)
}

#[cfg(not(windows))]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = command("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut cmd = command("cmd");
    cmd.arg("/C").arg(command_line);
    cmd
}

fn forward_lines(pipe: impl Read, tx: mpsc::Sender<String>) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']);
                // Keep draining after the receiver is gone so the child never blocks on a full pipe.
                let _ = tx.send(line.to_string());
            }
        }
    }
}

fn read_all(pipe: Option<impl Read + Send + 'static>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut p| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            if let Err(e) = p.read_to_end(&mut buf) {
                log::debug!("failed to read process output: {e}");
            }
            buf
        })
    })
}

fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match handle.map(JoinHandle::join) {
        Some(Ok(bytes)) => bytes,
        Some(Err(_)) => {
            log::debug!("process output reader panicked");
            Vec::new()
        }
        None => Vec::new(),
    }
}

type Pipes = (Option<std::process::ChildStdout>, Option<std::process::ChildStderr>);

enum ChunkSource {
    Whole { readers: Option<Pipes> },
    Lines {
        rx: Receiver<String>,
        handles: Vec<JoinHandle<()>>,
    },
}

/// Running subprocess whose output is consumed as an iterator.
///
/// The iterator ends once the process has closed both output pipes. Call
/// [`OutputStream::finish`] to reap the process and obtain its exit status.
pub struct OutputStream {
    command: String,
    child: Child,
    source: ChunkSource,
    status: Option<ExitStatus>,
}

impl OutputStream {
    /// Drains any unread output and waits for the process to exit.
    pub fn finish(mut self) -> Result<ExitStatus> {
        for _ in self.by_ref() {}
        self.wait()
    }

    fn wait(&mut self) -> Result<ExitStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }
        let status = self.child.wait().map_err(|source| YtAudioError::Execution {
            command: self.command.clone(),
            source,
        })?;
        self.status = Some(status);
        Ok(status)
    }
}

impl Iterator for OutputStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match &mut self.source {
            ChunkSource::Whole { readers } => {
                let (stdout, stderr) = readers.take()?;
                let out = read_all(stdout);
                let err = read_all(stderr);
                let mut bytes = join_reader(out);
                bytes.extend(join_reader(err));
                if let Err(e) = self.wait() {
                    log::debug!("{e}");
                }
                if bytes.is_empty() {
                    return None;
                }
                Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            ChunkSource::Lines { rx, handles } => match rx.recv() {
                Ok(line) => Some(line),
                Err(_) => {
                    for handle in handles.drain(..) {
                        let _ = handle.join();
                    }
                    None
                }
            },
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if self.status.is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
