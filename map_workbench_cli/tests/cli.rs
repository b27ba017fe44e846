use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use std::process::Command;

const POINTS: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","id":1,"geometry":{"type":"Point","coordinates":[0.0,0.0]},
   "properties":{"name":"Central Park","acres":840}},
  {"type":"Feature","id":2,"geometry":{"type":"Point","coordinates":[1500.0,0.0]},
   "properties":{"name":"Prospect Park","acres":526}},
  {"type":"Feature","id":3,"geometry":{"type":"Point","coordinates":[300.0,400.0]},
   "properties":{"name":"Union Square","acres":6.5}}
]}"#;

const POLYGON: &str = r#"{"type":"FeatureCollection","features":[
  {"type":"Feature","id":1,"geometry":{"type":"Polygon",
   "coordinates":[[[0.0,0.0],[100.0,0.0],[100.0,50.0],[0.0,50.0],[0.0,0.0]]]},
   "properties":{"zone":"a"}}
]}"#;

#[test]
fn query_command_matches_case_insensitively() {
    let file = assert_fs::NamedTempFile::new("points.geojson").unwrap();
    file.write_str(POINTS).unwrap();

    Command::cargo_bin("map_workbench_cli")
        .unwrap()
        .args([
            "query",
            file.path().to_str().unwrap(),
            "name",
            "contains",
            "PARK",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Matched 2 of 3 features"));
}

#[test]
fn query_command_rejects_mismatched_operator() {
    let file = assert_fs::NamedTempFile::new("points.geojson").unwrap();
    file.write_str(POINTS).unwrap();

    Command::cargo_bin("map_workbench_cli")
        .unwrap()
        .args([
            "query",
            file.path().to_str().unwrap(),
            "name",
            "greater-than",
            "4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be applied"));
}

#[test]
fn distance_command_reports_scaled_length() {
    let file = assert_fs::NamedTempFile::new("points.geojson").unwrap();
    file.write_str(POINTS).unwrap();

    Command::cargo_bin("map_workbench_cli")
        .unwrap()
        .args(["distance", file.path().to_str().unwrap(), "1", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Distance: 1.50 km"));
}

#[test]
fn area_command_reports_hectares() {
    let file = assert_fs::NamedTempFile::new("zones.geojson").unwrap();
    file.write_str(POLYGON).unwrap();

    Command::cargo_bin("map_workbench_cli")
        .unwrap()
        .args(["area", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Area: 0.50 ha"));
}

#[test]
fn buffer_command_buffers_each_point() {
    let file = assert_fs::NamedTempFile::new("points.geojson").unwrap();
    file.write_str(POINTS).unwrap();

    Command::cargo_bin("map_workbench_cli")
        .unwrap()
        .args([
            "buffer",
            file.path().to_str().unwrap(),
            "2",
            "--unit",
            "kilometers",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Buffer 2.00 km: 3 geometries (0 skipped)",
        ));
}

#[test]
fn info_command_prints_the_inferred_schema() {
    let file = assert_fs::NamedTempFile::new("points.geojson").unwrap();
    file.write_str(POINTS).unwrap();

    Command::cargo_bin("map_workbench_cli")
        .unwrap()
        .args(["info", file.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Point dataset with 3 features"))
        .stdout(predicate::str::contains("acres (Number)"));
}
