//! Code and shell execution inside the workspace.

use std::io::Write;
use std::process::Command;
use std::time::Duration;

use anyhow::anyhow;

use crate::io::process::{CommandOutput, run_command_with_timeout};
use crate::tools::{ToolContext, ToolError, ToolResult};

/// Stage `code` in a temporary script under the workspace and run the
/// configured interpreter on it. The script is removed on every path.
pub fn execute_python(ctx: &ToolContext, code: &str) -> ToolResult {
    let root = ctx.workspace().root();
    let mut script = tempfile::Builder::new()
        .prefix(".agent_exec_")
        .suffix(".py")
        .tempfile_in(root)?;
    script.write_all(code.as_bytes())?;
    script.flush()?;

    let limits = ctx.limits();
    let mut cmd = command_from(&limits.python)?;
    cmd.arg(script.path()).current_dir(root);
    let output = run_command_with_timeout(cmd, limits.exec_timeout, limits.output_limit_bytes)?;
    script.close()?;
    render_output(&output, limits.exec_timeout, "Code")
}

pub fn execute_shell(ctx: &ToolContext, command: &str) -> ToolResult {
    let limits = ctx.limits();
    let mut cmd = command_from(&limits.shell)?;
    cmd.arg(command).current_dir(ctx.workspace().root());
    let output = run_command_with_timeout(cmd, limits.exec_timeout, limits.output_limit_bytes)?;
    render_output(&output, limits.exec_timeout, "Command")
}

fn command_from(argv: &[String]) -> Result<Command, ToolError> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| anyhow!("no interpreter configured"))?;
    let mut cmd = Command::new(program);
    cmd.args(rest);
    Ok(cmd)
}

fn render_output(output: &CommandOutput, timeout: Duration, subject: &str) -> ToolResult {
    if output.timed_out {
        return Err(ToolError::Timeout(timeout.as_secs()));
    }

    let stdout = output.stdout_text();
    let stderr = output.stderr_text();
    let mut sections = Vec::new();
    if !stdout.trim().is_empty() {
        sections.push(stdout);
    }
    if !stderr.trim().is_empty() {
        sections.push(format!("Errors:\n{stderr}"));
    }
    if let Some(code) = output.exit_code()
        && code != 0
    {
        sections.push(format!("Exit code: {code}"));
    }

    if sections.is_empty() {
        return Ok(format!("Success: {subject} executed with no output."));
    }
    Ok(sections.join("\n"))
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::time::Instant;

    use super::*;
    use crate::tools::ToolLimits;
    use crate::test_support::TestWorkspace;

    fn sh_limits(timeout: Duration) -> ToolLimits {
        ToolLimits {
            exec_timeout: timeout,
            // Any interpreter that takes a script path works for staging.
            python: vec!["sh".to_string()],
            ..ToolLimits::default()
        }
    }

    fn staged_scripts(ws: &TestWorkspace) -> Vec<String> {
        fs::read_dir(ws.root())
            .expect("read dir")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".agent_exec_"))
            .collect()
    }

    #[test]
    fn shell_output_and_stderr_are_combined() {
        let ws = TestWorkspace::new();
        let output = execute_shell(ws.ctx(), "echo hello; echo oops >&2").expect("run");
        assert_eq!(output, "hello\n\nErrors:\noops\n");
    }

    #[test]
    fn shell_runs_in_workspace_root() {
        let ws = TestWorkspace::new();
        execute_shell(ws.ctx(), "echo hi > made.txt").expect("run");
        assert_eq!(ws.read("made.txt"), "hi\n");
    }

    #[test]
    fn silent_command_reports_success() {
        let ws = TestWorkspace::new();
        assert_eq!(
            execute_shell(ws.ctx(), "true").expect("run"),
            "Success: Command executed with no output."
        );
    }

    #[test]
    fn non_zero_exit_is_reported() {
        let ws = TestWorkspace::new();
        assert_eq!(
            execute_shell(ws.ctx(), "exit 4").expect("run"),
            "Exit code: 4"
        );
    }

    #[test]
    fn timeout_kills_and_reports() {
        let ws = TestWorkspace::with_limits(sh_limits(Duration::from_secs(1)));
        let err = execute_shell(ws.ctx(), "exec sleep 5").expect_err("timeout");
        assert_eq!(
            err.to_result_text(),
            "Error: Execution timed out after 1 seconds."
        );
    }

    #[test]
    fn timeout_covers_commands_that_fork() {
        let ws = TestWorkspace::with_limits(sh_limits(Duration::from_secs(1)));
        let started = Instant::now();
        let err = execute_shell(ws.ctx(), "sleep 5; echo done").expect_err("timeout");
        assert!(matches!(err, ToolError::Timeout(1)));
        assert!(
            started.elapsed() < Duration::from_secs(4),
            "took {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn staged_script_runs_and_is_removed() {
        let ws = TestWorkspace::with_limits(sh_limits(Duration::from_secs(10)));
        let output = execute_python(ws.ctx(), "echo from-script").expect("run");
        assert_eq!(output, "from-script\n");
        assert!(staged_scripts(&ws).is_empty());
    }

    #[test]
    fn staged_script_is_removed_after_timeout() {
        let ws = TestWorkspace::with_limits(sh_limits(Duration::from_secs(1)));
        let err = execute_python(ws.ctx(), "exec sleep 5").expect_err("timeout");
        assert!(matches!(err, ToolError::Timeout(1)));
        assert!(staged_scripts(&ws).is_empty());
    }

    #[test]
    fn silent_script_reports_success() {
        let ws = TestWorkspace::with_limits(sh_limits(Duration::from_secs(10)));
        assert_eq!(
            execute_python(ws.ctx(), ":").expect("run"),
            "Success: Code executed with no output."
        );
    }

    #[test]
    fn python_interpreter_runs_staged_code() {
        let available = Command::new("python3")
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .is_ok_and(|status| status.success());
        if !available {
            eprintln!("python3 not found, skipping");
            return;
        }

        let ws = TestWorkspace::new();
        assert_eq!(ToolLimits::default().python, vec!["python3".to_string()]);
        let code = "import os, sys\nprint(sum(range(5)))\nprint(os.path.basename(sys.argv[0]).endswith('.py'))\nsys.stderr.write('warn\\n')";
        let output = execute_python(ws.ctx(), code).expect("run");
        assert_eq!(output, "10\nTrue\n\nErrors:\nwarn\n");
        assert!(staged_scripts(&ws).is_empty());
    }

    #[test]
    fn missing_interpreter_is_an_error_string() {
        let ws = TestWorkspace::with_limits(ToolLimits {
            python: vec!["no-such-interpreter-xyz".to_string()],
            ..ToolLimits::default()
        });
        let err = execute_python(ws.ctx(), "print(1)").expect_err("spawn");
        assert!(err.to_result_text().starts_with("Error: spawn"));
        assert!(staged_scripts(&ws).is_empty());
    }
}
