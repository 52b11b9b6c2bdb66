use std::path::PathBuf;

use nbgrade::{
    grade::{Check, GradingContext, ImportCheck, scan_imports},
    notebook::Submission,
    python::{ExecutionResult, Namespace},
};

fn fixture_root(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("notebooks")
        .join(name)
}

fn context(name: &str) -> GradingContext {
    GradingContext::new(
        Submission::load(fixture_root(name)),
        ExecutionResult::succeeded(""),
        Namespace::empty(),
    )
}

fn library_check() -> ImportCheck {
    ImportCheck::builder()
        .requirement("required_libraries")
        .required([
            "geopandas",
            "pandas",
            "numpy",
            "matplotlib",
            "seaborn",
            "folium",
            "contextily",
        ])
        .build()
}

#[test]
fn scans_plain_aliased_and_from_imports() {
    let found = scan_imports(
        "import geopandas as gpd\nfrom matplotlib import pyplot as plt\n    import numpy\nimport os, sys\n",
    );
    let found: Vec<&str> = found.iter().map(String::as_str).collect();
    assert_eq!(found, ["geopandas", "matplotlib", "numpy", "os"]);
}

#[test]
fn ignores_imports_inside_strings_and_comments() {
    assert!(scan_imports("x = 'import seaborn'\n# import folium\n").is_empty());
}

#[test]
fn submodule_imports_count_for_the_top_level_module() {
    let found = scan_imports("import matplotlib.pyplot as plt\nfrom shapely.geometry import box");
    assert!(found.contains("matplotlib"));
    assert!(found.contains("shapely"));
}

#[test]
fn passes_when_every_library_is_imported() {
    let result = library_check().grade(&context("well_formed.ipynb"));
    assert!(result.passed(), "{}", result.reason());
    assert_eq!(result.grade_value(), 1.0);
}

#[test]
fn lists_every_missing_library_in_order() {
    let result = library_check().grade(&context("missing_imports.ipynb"));

    assert!(!result.passed());
    assert_eq!(result.grade_value(), 0.0);
    assert_eq!(
        result.reason(),
        "Required libraries not imported: seaborn, folium, contextily"
    );
}

#[test]
fn fails_without_a_notebook() {
    let result = library_check().grade(&context("version3.ipynb"));
    assert!(!result.passed());
    assert!(result.reason().starts_with("No notebook to inspect: "));
}
