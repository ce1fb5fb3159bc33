use crate::error::{DnsError, Result};
use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};

/// Spawns `program` with piped standard streams.
pub fn run_command<I: IntoIterator<Item = S>, S: AsRef<OsStr>>(
    program: &str,
    arguments: I,
) -> Result<Child> {
    spawn(Command::new(program).args(arguments))
}

/// Spawns `program` in `dir` with piped standard streams.
pub fn run_command_in<I: IntoIterator<Item = S>, S: AsRef<OsStr>>(
    program: &str,
    arguments: I,
    dir: &Path,
) -> Result<Child> {
    spawn(Command::new(program).args(arguments).current_dir(dir))
}

fn spawn(command: &mut Command) -> Result<Child> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(DnsError::from)
}

/// Runs `program` to completion, feeding it `input` on stdin.
///
/// Fails with [`DnsError::Command`] if the program exits unsuccessfully.
pub fn run_with_input<I: IntoIterator<Item = S>, S: AsRef<OsStr>>(
    program: &str,
    arguments: I,
    input: &[u8],
) -> Result<Output> {
    let mut process = run_command(program, arguments)?;

    match process.stdin.take() {
        Some(mut stdin) => stdin.write_all(input)?,
        None => {
            return Err(DnsError::Command {
                program: program.to_owned(),
                stderr: "failed to open stdin".to_owned(),
            })
        }
    }

    check_output(program, process.wait_with_output()?)
}

/// Runs `program` to completion with an empty stdin.
pub fn run_to_completion<I: IntoIterator<Item = S>, S: AsRef<OsStr>>(
    program: &str,
    arguments: I,
) -> Result<Output> {
    run_with_input(program, arguments, &[])
}

/// Fails with [`DnsError::Command`] unless `output` reports success.
pub fn check_output(program: &str, output: Output) -> Result<Output> {
    if !output.status.success() {
        return Err(DnsError::Command {
            program: program.to_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    Ok(output)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_input_is_fed_to_stdin() {
        let output = run_with_input("cat", std::iter::empty::<&str>(), b"nameserver 10.0.0.1\n").unwrap();
        assert_eq!(output.stdout, b"nameserver 10.0.0.1\n");
    }

    #[test]
    fn test_failure_carries_stderr() {
        let err = run_to_completion("sh", ["-c", "echo broken >&2; exit 3"]).unwrap_err();

        match err {
            DnsError::Command { program, stderr } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_missing_program() {
        assert!(matches!(
            run_to_completion("hostdns-no-such-program", ["--version"]),
            Err(DnsError::Io(_))
        ));
    }
}
