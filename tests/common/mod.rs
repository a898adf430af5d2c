//! Shared helpers for integration tests
//!
//! External tools are replaced by small `sh` scripts written into a temp
//! directory. Running them through `sh <script>` avoids executing a file
//! that is still open for writing.

#![allow(dead_code)]

use mediaforge::{ProgressEvent, ToolCommand};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Write `body` to `<dir>/<name>` and return a command running it with `sh`
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> ToolCommand {
    let script = dir.join(name);
    fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
    ToolCommand::new("sh").with_prefix_args([script.to_string_lossy().into_owned()])
}

/// Collects every event delivered to it
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<ProgressEvent>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ProgressEvent> {
        self.events.lock().unwrap().last().cloned()
    }

    pub fn count_terminal(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.is_terminal())
            .count()
    }
}

impl mediaforge::ProgressCallback for Recorder {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
