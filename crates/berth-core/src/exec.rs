//! Subprocess invocation with captured output.

use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Run `cmd` to completion, capturing stdout and stderr.
///
/// Returns the combined output on success. A non-zero exit becomes
/// [`Error::Process`] carrying the rendered command line and everything the
/// process wrote on either stream.
pub fn run(cmd: &mut Command) -> Result<String> {
    let command = render(cmd);
    debug!(command = %command, "running subprocess");
    let output = cmd.output().map_err(|source| Error::Spawn {
        command: command.clone(),
        source,
    })?;
    let combined = combined_output(&output.stdout, &output.stderr);
    if !output.status.success() {
        return Err(Error::Process {
            command,
            status: output.status,
            output: combined,
        });
    }
    Ok(combined)
}

fn render(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|arg| arg.to_string_lossy().into_owned()));
    parts.join(" ")
}

fn combined_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut out = String::from_utf8_lossy(stdout).into_owned();
    if !stderr.is_empty() {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&String::from_utf8_lossy(stderr));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo hello"]);
        assert_eq!(run(&mut cmd).unwrap(), "hello\n");
    }

    #[test]
    fn nonzero_exit_carries_combined_output() {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", "echo out; echo err >&2; exit 3"]);
        let err = run(&mut cmd).unwrap_err();
        match err {
            Error::Process { status, output, .. } => {
                assert_eq!(status.code(), Some(3));
                assert!(output.contains("out"));
                assert!(output.contains("err"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unlaunchable_program_is_a_spawn_error() {
        let mut cmd = Command::new("/no/such/binary");
        let err = run(&mut cmd).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
