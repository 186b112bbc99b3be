//! End-to-end isolation tests for the insec launcher.
//!
//! Every test here creates real namespaces and mounts, so they need root
//! (`CAP_SYS_ADMIN`), `/bin/sh` on the host, and a system temp directory on
//! its own filesystem (tmpfs), since the overlay's upper layer may not sit
//! inside its lower layer. Run them with:
//!
//! ```text
//! sudo -E cargo test -p insec-runtime -- --ignored
//! ```

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use insec_common::config::LaunchConfig;
use insec_common::constants::EXIT_SETUP_FAILURE;
use insec_common::types::ProcessOutcome;
use insec_runtime::supervisor::Supervisor;

fn sh(scratch_parent: &Path, script: &str) -> LaunchConfig {
    LaunchConfig::default()
        .with_scratch_parent(scratch_parent)
        .with_command("/bin/sh", vec!["-c".into(), script.into()])
}

fn run(config: LaunchConfig) -> ProcessOutcome {
    Supervisor::new(config).run().expect("supervisor run")
}

fn assert_scratch_removed(parent: &Path) {
    let leftovers: Vec<_> = fs::read_dir(parent)
        .expect("read scratch parent")
        .map(|e| e.expect("entry").path())
        .collect();
    assert!(leftovers.is_empty(), "scratch left behind: {leftovers:?}");
}

// ── Exit status ─────────────────────────────────────────────────────

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn shell_exit_zero_propagates() {
    let parent = tempfile::tempdir().expect("tempdir");
    assert_eq!(run(sh(parent.path(), "exit 0")), ProcessOutcome::Exited(0));
    assert_scratch_removed(parent.path());
}

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn shell_exit_seven_propagates() {
    let parent = tempfile::tempdir().expect("tempdir");
    let outcome = run(sh(parent.path(), "exit 7"));
    assert_eq!(outcome, ProcessOutcome::Exited(7));
    assert_eq!(outcome.exit_code(), 7);
    assert_scratch_removed(parent.path());
}

// ── Mount plan failures ─────────────────────────────────────────────

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn invalid_lower_dir_fails_setup_and_still_cleans_up() {
    let parent = tempfile::tempdir().expect("tempdir");
    let config = sh(parent.path(), "exit 0").with_lower_dir("/nonexistent-insec-lower");
    let outcome = run(config);
    assert_eq!(outcome, ProcessOutcome::Exited(EXIT_SETUP_FAILURE));
    assert_scratch_removed(parent.path());
}

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn missing_program_fails_with_exec_status() {
    let parent = tempfile::tempdir().expect("tempdir");
    let config = LaunchConfig::default()
        .with_scratch_parent(parent.path())
        .with_command("/nonexistent/insec-shell", Vec::new());
    let outcome = run(config);
    assert_eq!(outcome.exit_code(), insec_common::constants::EXIT_EXEC_FAILURE);
    assert_scratch_removed(parent.path());
}

// ── Overlay semantics ───────────────────────────────────────────────

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn host_root_is_readable_through_overlay() {
    let marker = PathBuf::from(format!("/insec-readthrough-{}", std::process::id()));
    fs::write(&marker, b"visible").expect("write marker on host root");

    let parent = tempfile::tempdir().expect("tempdir");
    let script = format!("test \"$(cat {})\" = visible", marker.display());
    let outcome = run(sh(parent.path(), &script));
    fs::remove_file(&marker).expect("remove marker");

    assert_eq!(outcome, ProcessOutcome::Exited(0));
}

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn writes_are_copied_up_and_never_reach_host() {
    let name = format!("insec-copyup-{}", std::process::id());
    let host_path = Path::new("/etc").join(&name);
    let parent = tempfile::tempdir().expect("tempdir");
    let parent_path = parent.path().to_path_buf();

    let script = format!("echo container > /etc/{name} && sleep 3");
    let config = sh(&parent_path, &script);
    let handle = thread::spawn(move || run(config));

    let deadline = Instant::now() + Duration::from_secs(3);
    let mut upper_copy = None;
    while Instant::now() < deadline && upper_copy.is_none() {
        upper_copy = fs::read_dir(&parent_path)
            .expect("read scratch parent")
            .map(|e| e.expect("entry").path().join("storage/etc").join(&name))
            .find(|p| p.exists());
        thread::sleep(Duration::from_millis(50));
    }

    let upper_copy = upper_copy.expect("file should appear in the upper layer");
    assert_eq!(fs::read_to_string(&upper_copy).expect("read upper"), "container\n");
    assert!(!host_path.exists(), "host /etc must not be modified");

    let mountinfo = fs::read_to_string("/proc/self/mountinfo").expect("mountinfo");
    assert!(
        !mountinfo.contains(parent_path.to_str().expect("utf8")),
        "container mounts leaked into the host mount table"
    );

    assert_eq!(handle.join().expect("join"), ProcessOutcome::Exited(0));
    assert!(!host_path.exists());
    assert_scratch_removed(&parent_path);
}

// ── Namespace isolation ─────────────────────────────────────────────

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn shell_is_pid_one_and_sees_no_host_processes() {
    let parent = tempfile::tempdir().expect("tempdir");
    let script = "test \"$$\" = 1 || exit 10; \
                  n=0; for p in /proc/[0-9]*; do n=$((n+1)); done; \
                  test \"$n\" -eq 1 || exit 11";
    assert_eq!(run(sh(parent.path(), script)), ProcessOutcome::Exited(0));
}

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn hostname_change_stays_inside() {
    let before = nix::unistd::gethostname().expect("gethostname");
    let parent = tempfile::tempdir().expect("tempdir");
    let config = sh(
        parent.path(),
        "test \"$(cat /proc/sys/kernel/hostname)\" = insec-uts-test",
    )
    .with_hostname("insec-uts-test");

    assert_eq!(run(config), ProcessOutcome::Exited(0));
    assert_eq!(nix::unistd::gethostname().expect("gethostname"), before);
}

#[test]
#[ignore = "needs root, CAP_SYS_ADMIN and hostname(1); run with --ignored"]
fn hostname_set_by_shell_stays_inside() {
    let before = nix::unistd::gethostname().expect("gethostname");
    let parent = tempfile::tempdir().expect("tempdir");
    let config = sh(
        parent.path(),
        "hostname insec-shell-set && test \"$(cat /proc/sys/kernel/hostname)\" = insec-shell-set",
    );

    assert_eq!(run(config), ProcessOutcome::Exited(0));
    assert_eq!(nix::unistd::gethostname().expect("gethostname"), before);
}

#[test]
#[ignore = "needs root, CAP_SYS_ADMIN and mount(8); run with --ignored"]
fn shell_mounts_are_torn_down_with_the_namespace() {
    let parent = tempfile::tempdir().expect("tempdir");
    let config = sh(
        parent.path(),
        "mkdir -p /insec-tmpfs && mount -t tmpfs insec-shell-tmpfs /insec-tmpfs \
         && grep -q insec-shell-tmpfs /proc/self/mountinfo",
    );

    assert_eq!(run(config), ProcessOutcome::Exited(0));
    let host_mounts = fs::read_to_string("/proc/self/mountinfo").expect("read mountinfo");
    assert!(
        !host_mounts.contains("insec-shell-tmpfs"),
        "tmpfs mounted by the shell leaked to the host"
    );
    assert!(!Path::new("/insec-tmpfs").exists());
    assert_scratch_removed(parent.path());
}

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn old_root_is_not_reachable() {
    let parent = tempfile::tempdir().expect("tempdir");
    let script = "test -d /.orig && rmdir /.orig";
    assert_eq!(run(sh(parent.path(), script)), ProcessOutcome::Exited(0));
}

#[test]
#[ignore = "needs root and CAP_SYS_ADMIN; run with --ignored"]
fn concurrent_launches_use_distinct_scratch() {
    let parent = tempfile::tempdir().expect("tempdir");
    let handles: Vec<_> = (0..3_u8)
        .map(|i| {
            let config = sh(parent.path(), &format!("exit {i}"));
            thread::spawn(move || run(config))
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().expect("join")).collect();
    assert_eq!(
        outcomes,
        vec![
            ProcessOutcome::Exited(0),
            ProcessOutcome::Exited(1),
            ProcessOutcome::Exited(2)
        ]
    );
    assert_scratch_removed(parent.path());
}
