use std::{
    ffi::OsString,
    time::{Duration, Instant},
};

use nbgrade::process::{ProcessError, StdinSource, run_collect};

fn args(list: &[&str]) -> Vec<OsString> {
    list.iter().map(OsString::from).collect()
}

#[tokio::test]
async fn collects_stdout_and_status() {
    let collected = run_collect(
        "sh",
        &args(&["-c", "echo hi; echo oops >&2; exit 3"]),
        StdinSource::Null,
        None,
        &[],
        Some(Duration::from_secs(10)),
    )
    .await
    .expect("run sh");

    assert_eq!(collected.stdout_lossy(), "hi\n");
    assert_eq!(collected.stderr_lossy(), "oops\n");
    assert_eq!(collected.status.code(), Some(3));
}

#[tokio::test]
async fn feeds_stdin_and_environment() {
    let collected = run_collect(
        "sh",
        &args(&["-c", "cat; printf \"$MPLBACKEND\""]),
        StdinSource::Bytes(b"{\"cells\": []}\n".to_vec()),
        None,
        &[("MPLBACKEND".into(), "Agg".into())],
        None,
    )
    .await
    .expect("run sh");

    assert_eq!(collected.stdout_lossy(), "{\"cells\": []}\nAgg");
    assert!(collected.status.success());
}

#[tokio::test]
async fn kills_the_child_at_the_deadline() {
    let start = Instant::now();
    let err = run_collect(
        "sleep",
        &args(&["5"]),
        StdinSource::Null,
        None,
        &[],
        Some(Duration::from_millis(200)),
    )
    .await
    .expect_err("should time out");

    assert!(start.elapsed() < Duration::from_secs(4));
    match err.downcast_ref::<ProcessError>() {
        Some(ProcessError::TimedOut { program, limit }) => {
            assert_eq!(program, "sleep");
            assert_eq!(*limit, Duration::from_millis(200));
        }
        None => panic!("expected a timeout, got {err:#}"),
    }
}

#[tokio::test]
async fn missing_programs_fail_to_spawn() {
    let err = run_collect(
        uuid::Uuid::new_v4().to_string(),
        &[],
        StdinSource::Null,
        None,
        &[],
        None,
    )
    .await
    .expect_err("nothing to spawn");
    assert!(format!("{err:#}").contains("failed to spawn"));
}

/// Whether `pid` names a live, non-zombie process.
#[cfg(target_os = "linux")]
fn is_alive(pid: &str) -> bool {
    std::fs::read_to_string(format!("/proc/{pid}/stat"))
        .ok()
        .and_then(|stat| {
            let (_, rest) = stat.rsplit_once(')')?;
            rest.trim_start().chars().next()
        })
        .is_some_and(|state| state != 'Z')
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn deadline_kills_every_descendant() {
    let pid_file = std::env::temp_dir().join(format!("nbgrade-{}.pid", uuid::Uuid::new_v4()));
    let script = format!("sleep 987654 & echo $! > '{}'; wait", pid_file.display());

    let err = run_collect(
        "sh",
        &args(&["-c", &script]),
        StdinSource::Null,
        None,
        &[],
        Some(Duration::from_millis(500)),
    )
    .await
    .expect_err("should time out");
    assert!(matches!(
        err.downcast_ref::<ProcessError>(),
        Some(ProcessError::TimedOut { .. })
    ));

    let pid = std::fs::read_to_string(&pid_file).expect("pid file");
    let pid = pid.trim();
    let start = Instant::now();
    while is_alive(pid) && start.elapsed() < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!is_alive(pid), "sleep {pid} outlived the deadline");

    std::fs::remove_file(&pid_file).ok();
}
