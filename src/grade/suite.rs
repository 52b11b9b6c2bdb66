#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use super::{
    Check, GradeResult, GradingContext,
    checks::{
        ExecutionCheck, Expectation, FunctionContractCheck, GeoTableCheck, ImportCheck,
        ReprojectionCheck,
    },
};
use crate::{
    constants::REQUIRED_LIBRARIES,
    python::{Fixture, ProbeRequest},
};

/// Ordered list of independent checks.
#[derive(Default)]
pub struct Suite {
    /// Checks in reporting order.
    checks: Vec<Box<dyn Check>>,
}

impl Suite {
    /// An empty suite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a check.
    pub fn with(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// The checks for the Tanzania GIS assignment.
    pub fn gis_assignment() -> Self {
        Suite::new()
            .with(
                ExecutionCheck::builder()
                    .requirement("notebook_execution")
                    .build(),
            )
            .with(
                ImportCheck::builder()
                    .requirement("required_libraries")
                    .required(REQUIRED_LIBRARIES)
                    .build(),
            )
            .with(
                GeoTableCheck::builder()
                    .requirement("load_shapefile")
                    .name("tz_shapefile")
                    .label("Tanzania shapefile variable")
                    .build(),
            )
            .with(
                FunctionContractCheck::builder()
                    .requirement("describe_geodataframe")
                    .function("describe_geodataframe")
                    .args(vec![Fixture::points(
                        "col1",
                        &[1, 2],
                        &[0.0, 1.0],
                        &[0.0, 1.0],
                        "EPSG:4326",
                    )])
                    .required_keys(
                        ["crs", "geometry_type", "num_features", "attributes", "bounds"]
                            .map(String::from)
                            .to_vec(),
                    )
                    .expectations(vec![
                        Expectation::equals(
                            "num_features",
                            2,
                            "describe_geodataframe should correctly count features",
                        ),
                        Expectation::same_crs_as_arg(
                            "crs",
                            0,
                            "describe_geodataframe should correctly identify CRS",
                        ),
                    ])
                    .build(),
            )
            .with(
                ReprojectionCheck::builder()
                    .requirement("reproject_data")
                    .source("tz_shapefile")
                    .projected("tz_projected")
                    .build(),
            )
            .with(
                FunctionContractCheck::builder()
                    .requirement("compare_projections")
                    .function("compare_projections")
                    .args(vec![
                        Fixture::boxes("col1", &[1], &[[0.0, 0.0, 1.0, 1.0]], "EPSG:4326"),
                        Fixture::reprojected(0, 3857),
                    ])
                    .build(),
            )
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether the suite has no checks.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Requirement names in order.
    pub fn requirements(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.requirement()).collect()
    }

    /// Union of what every check needs from the probe.
    pub fn probe_request(&self) -> ProbeRequest {
        let mut request = ProbeRequest::default();
        for check in &self.checks {
            request.merge(check.probe());
        }
        request
    }

    /// Runs every check in order against the same context.
    pub fn run(&self, ctx: &GradingContext) -> Vec<GradeResult> {
        self.checks
            .iter()
            .map(|check| {
                let result = check.grade(ctx);
                tracing::info!("{}: {}", result.requirement(), result.status());
                result
            })
            .collect()
    }
}
