/*!
A small command snapshotting harness for the `timetable` binary.

Each test builds a `Command`, optionally feeds it some stdin, runs it and
snapshots its exit status, stdout and stderr with `insta`. The arguments,
environment and stdin of the command are attached to the snapshot as info, so
they show up in `cargo insta review` without cluttering the snapshot itself.

`Command` is an owned builder over `std::process::Command`. It takes and
returns `self` so that tests can build commands in a single expression.
*/

use std::{
    collections::BTreeMap,
    ffi::{OsStr, OsString},
    io::Write,
    path::Path,
    process, thread,
};

use bstr::{BString, ByteSlice, ByteVec};

macro_rules! run_and_snapshot {
    ($cmd:expr, $body:expr) => {{
        let snap = $cmd.snapshot();
        let mut settings = insta::Settings::clone_current();
        settings.set_info(snap.info());
        settings.set_omit_expression(true);
        settings.bind(|| ($body)(snap.snapshot()));
    }};
}

macro_rules! assert_cmd_snapshot {
    ($spawnable:expr, @$snapshot:literal $(,)?) => {{
        $crate::command::run_and_snapshot!($spawnable, |snapshot: &str| {
            insta::assert_snapshot!(snapshot, @$snapshot);
        });
    }};
}

pub(crate) use {assert_cmd_snapshot, run_and_snapshot};

/// A snapshot generated from running a command.
pub struct Snapshot {
    /// The contextual info put into the `cargo insta review` user interface.
    info: CommandInfo,
    /// The actual snapshot contents.
    snapshot: String,
}

impl Snapshot {
    /// Creates a new snapshot from a command's info and its process output.
    fn new(info: CommandInfo, output: &process::Output) -> Snapshot {
        let snapshot = format!(
            "success: {:?}\n\
             exit_code: {}\n\
             ----- stdout -----\n\
             {}\n\
             ----- stderr -----\n\
             {}",
            output.status.success(),
            output.status.code().unwrap_or(!0),
            bytes_to_string(&output.stdout),
            bytes_to_string(&output.stderr),
        );
        Snapshot { info, snapshot }
    }

    /// Returns the Insta "info" that contextualizes the snapshot.
    pub fn info(&self) -> &CommandInfo {
        &self.info
    }

    /// Returns the snapshot derived from running the command.
    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }
}

/// A command whose stdin is fed from a fixed buffer.
#[derive(Debug)]
pub struct WithStdin {
    cmd: Command,
    stdin: BString,
}

impl WithStdin {
    /// Runs the command, writing its stdin from a separate thread so that
    /// large inputs can't deadlock against a full stdout pipe.
    pub fn snapshot(&self) -> Snapshot {
        let mut cmd = self.cmd.std();
        cmd.stdin(process::Stdio::piped());
        cmd.stdout(process::Stdio::piped());
        cmd.stderr(process::Stdio::piped());
        let mut child = cmd.spawn().unwrap();
        let mut child_stdin = child.stdin.take().unwrap();
        let stdin = self.stdin.clone();
        let writer = thread::spawn(move || child_stdin.write_all(&stdin));
        let output = child.wait_with_output().unwrap();
        writer.join().unwrap().unwrap();

        let mut info = self.cmd.info();
        info.stdin = Some(bytes_to_string(&self.stdin));
        Snapshot::new(info, &output)
    }
}

/// An owned wrapper around the builder half of `std::process::Command`.
///
/// I/O is deliberately absent. Commands run with a null stdin unless one is
/// given via `Command::stdin`, and their stdout and stderr are always
/// captured.
#[derive(Clone, Debug)]
pub struct Command {
    bin: OsString,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
}

impl Command {
    /// Create a new command wrapper for the given binary program.
    pub fn new(bin: impl AsRef<OsStr>) -> Command {
        let bin = bin.as_ref().to_os_string();
        Command { bin, args: vec![], envs: vec![] }
    }

    /// Add an argument to the end of this command invocation.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Command {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add arguments to the end of this command invocation.
    pub fn args(
        mut self,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Command {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    /// Set an environment variable.
    pub fn env(
        mut self,
        key: impl AsRef<OsStr>,
        val: impl AsRef<OsStr>,
    ) -> Command {
        self.envs
            .push((key.as_ref().to_os_string(), val.as_ref().to_os_string()));
        self
    }

    /// Returns this command with the given data passed into its stdin.
    pub fn stdin(self, stdin: impl Into<Vec<u8>>) -> WithStdin {
        WithStdin { cmd: self, stdin: BString::from(stdin.into()) }
    }

    /// Turn this wrapper into a fresh `std::process::Command`.
    pub fn std(&self) -> process::Command {
        let mut cmd = process::Command::new(&self.bin);
        cmd.args(self.args.iter());
        for (key, val) in self.envs.iter() {
            cmd.env(key, val);
        }
        cmd
    }

    /// Runs this command and returns a snapshot based on its output.
    pub fn snapshot(&self) -> Snapshot {
        let output = self
            .std()
            .stdin(process::Stdio::null())
            .stdout(process::Stdio::piped())
            .stderr(process::Stdio::piped())
            .output()
            .unwrap();
        Snapshot::new(self.info(), &output)
    }

    /// Returns the info for this command.
    pub fn info(&self) -> CommandInfo {
        CommandInfo::new(&self.std())
    }
}

/// Information about a particular command.
///
/// This is fed into `insta` as contextual information that doesn't appear
/// directly in the snapshot, but instead in the `cargo insta review` user
/// interface.
#[derive(Clone, Debug, serde::Serialize)]
pub struct CommandInfo {
    bin: String,
    args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<String>,
}

impl CommandInfo {
    fn new(cmd: &process::Command) -> CommandInfo {
        let program = Path::new(cmd.get_program());
        let bin = program.file_stem().unwrap_or(program.as_os_str());
        let env = cmd
            .get_envs()
            .map(|(k, v)| {
                (os_str_to_string(k), os_str_to_string(v.unwrap_or_default()))
            })
            .collect();
        CommandInfo {
            bin: os_str_to_string(bin),
            args: cmd.get_args().map(os_str_to_string).collect(),
            env,
            stdin: None,
        }
    }
}

/// Return a command for the `timetable` binary built by Cargo for this test
/// run.
pub fn timetable() -> Command {
    Command::new(env!("CARGO_BIN_EXE_timetable"))
}

/// Renders process output for a snapshot, escaping anything that isn't
/// valid UTF-8.
fn bytes_to_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(string) => string.to_string(),
        Err(_) => bytes.escape_bytes().to_string(),
    }
}

fn os_str_to_string(os_str: &OsStr) -> String {
    bytes_to_string(&Vec::from_os_str_lossy(os_str))
}
