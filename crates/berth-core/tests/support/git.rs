use std::path::Path;
use std::process::Command;

const GIT_ENV_OVERRIDES: [&str; 4] = [
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_COMMON_DIR",
];

pub fn git_command() -> Command {
    let mut cmd = Command::new("git");
    for key in GIT_ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd
}

pub fn run_git(cwd: &Path, args: &[&str]) -> String {
    let output = git_command()
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create a source repository with one commit; returns the commit hash.
pub fn init_repo(dir: &Path) -> String {
    std::fs::create_dir_all(dir).unwrap();
    run_git(dir, &["init", "-q"]);
    std::fs::write(dir.join("app.txt"), "hello\n").unwrap();
    run_git(dir, &["add", "."]);
    commit_all(dir, "init")
}

/// Stage everything and commit; returns the new commit hash.
pub fn commit_all(dir: &Path, message: &str) -> String {
    run_git(dir, &["add", "."]);
    run_git(
        dir,
        &[
            "-c",
            "user.name=tester",
            "-c",
            "user.email=tester@example.invalid",
            "commit",
            "-qm",
            message,
        ],
    );
    run_git(dir, &["rev-parse", "HEAD"])
}
