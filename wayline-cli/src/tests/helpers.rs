//! Test helpers for writing scenario files into temporary workspaces.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path.as_std_path(), contents).expect("write test file");
}

/// Temporary directory holding a `scenario.json`.
#[derive(Debug)]
pub(super) struct ScenarioFiles {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl ScenarioFiles {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn scenario_path(&self) -> Utf8PathBuf {
        self.root.join("scenario.json")
    }

    pub(super) fn write(&self, scenario: &Value) -> Utf8PathBuf {
        let path = self.scenario_path();
        let payload = serde_json::to_vec_pretty(scenario).expect("serialise scenario");
        write_utf8(&path, &payload);
        path
    }
}

fn fix(timestamp: f64, x: f64, y: f64) -> Value {
    json!({
        "timestamp": timestamp,
        "position": { "x": x, "y": y },
        "horizontal_accuracy": 5.0,
    })
}

/// Straight 200 m route east with two minutes of travel, followed to the end.
pub(super) fn arrival_scenario() -> Value {
    json!({
        "profile": "car",
        "route": {
            "name": "car",
            "points": [
                { "x": 0.0, "y": 0.0 },
                { "x": 100.0, "y": 0.0 },
                { "x": 200.0, "y": 0.0 }
            ],
            "turns": [],
            "times": [
                { "index": 0, "seconds": 0.0 },
                { "index": 2, "seconds": 120.0 }
            ]
        },
        "start": { "x": 0.0, "y": 0.0 },
        "destination": { "x": 200.0, "y": 0.0 },
        "fixes": [fix(0.0, 50.0, 0.0), fix(1.0, 200.0, 0.0)]
    })
}

/// Same route, but the build fails and two fixes arrive anyway.
pub(super) fn failing_scenario() -> Value {
    let mut scenario = arrival_scenario();
    scenario["build_result"] = json!("no_route");
    scenario
}
