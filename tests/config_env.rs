use std::{path::Path, time::Duration};

use nbgrade::config::GraderConfig;

// The only test in this binary, so no other test observes the variables.
#[test]
fn environment_overrides_defaults() {
    unsafe {
        std::env::set_var("NBGRADE_NOTEBOOK", "submissions/alice.ipynb");
        std::env::set_var("NBGRADE_TIMEOUT_SECS", " 90 ");
        std::env::set_var("NBGRADE_KERNEL", "   ");
        std::env::set_var("NBGRADE_PYTHON", "/usr/bin/python3");
    }

    let config = GraderConfig::from_env().expect("valid environment");
    assert_eq!(config.notebook(), Path::new("submissions/alice.ipynb"));
    assert_eq!(config.timeout(), Duration::from_secs(90));
    assert_eq!(config.kernel(), "python3");
    assert_eq!(config.python(), Some(Path::new("/usr/bin/python3")));

    unsafe {
        std::env::set_var("NBGRADE_TIMEOUT_SECS", "ten minutes");
    }
    let err = GraderConfig::from_env().expect_err("timeout is not a number");
    assert!(err.to_string().contains("NBGRADE_TIMEOUT_SECS"));

    unsafe {
        for key in [
            "NBGRADE_NOTEBOOK",
            "NBGRADE_TIMEOUT_SECS",
            "NBGRADE_KERNEL",
            "NBGRADE_PYTHON",
        ] {
            std::env::remove_var(key);
        }
    }
}
