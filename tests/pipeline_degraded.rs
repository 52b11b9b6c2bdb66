use std::path::PathBuf;

use nbgrade::{config::GraderConfig, grade::Suite, grade_submission};

fn fixture_root(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("notebooks")
        .join(name)
}

#[tokio::test]
async fn missing_notebook_fails_every_check() {
    let missing = std::env::temp_dir()
        .join(uuid::Uuid::new_v4().to_string())
        .join("student_submission.ipynb");
    let config = GraderConfig::builder().notebook(missing).build();
    let report = grade_submission(&config, &Suite::gis_assignment()).await;

    assert_eq!(report.results().len(), 6);
    assert_eq!(report.passed_count(), 0);
    assert_eq!(report.total(), (0.0, 6.0));
    assert!(!report.all_passed());

    let execution = report.result("notebook_execution").expect("execution result");
    assert!(
        execution
            .reason()
            .starts_with("Notebook execution failed with error: Student submission notebook not found at ")
    );
    assert!(
        report
            .result("required_libraries")
            .expect("import result")
            .reason()
            .starts_with("No notebook to inspect: ")
    );
    assert_eq!(
        report.result("load_shapefile").expect("shapefile result").reason(),
        "Tanzania shapefile variable 'tz_shapefile' not found"
    );
    assert_eq!(
        report
            .result("compare_projections")
            .expect("compare result")
            .reason(),
        "Function 'compare_projections' not found"
    );
}

#[tokio::test]
async fn unreadable_notebooks_degrade_the_same_way() {
    for (name, expected) in [
        ("not_json.ipynb", "is not a valid notebook"),
        ("version3.ipynb", "only version 4 is supported"),
    ] {
        let config = GraderConfig::builder().notebook(fixture_root(name)).build();
        let report = grade_submission(&config, &Suite::gis_assignment()).await;

        assert_eq!(report.passed_count(), 0, "{name}");
        let execution = report.result("notebook_execution").expect("execution result");
        assert!(execution.reason().contains(expected), "{}", execution.reason());
    }
}

#[tokio::test]
async fn missing_interpreter_is_an_execution_failure() {
    let config = GraderConfig::builder()
        .notebook(fixture_root("well_formed.ipynb"))
        .python(std::env::temp_dir().join(uuid::Uuid::new_v4().to_string()))
        .build();
    let report = grade_submission(&config, &Suite::gis_assignment()).await;

    let execution = report.result("notebook_execution").expect("execution result");
    assert!(!execution.passed());
    assert!(execution.reason().contains("failed to spawn"), "{}", execution.reason());
    assert!(report.result("required_libraries").expect("import result").passed());
    assert_eq!(report.passed_count(), 1);
}
