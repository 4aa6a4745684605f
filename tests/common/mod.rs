#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes the standard contact workspace used across CLI tests.
    pub fn write_contacts(&self) -> PathBuf {
        self.write("workspace.json", CONTACTS_WORKSPACE)
    }

    pub fn read_json(&self, path: &Path) -> Value {
        let raw = fs::read_to_string(path).expect("read json file");
        serde_json::from_str(&raw).expect("parse json file")
    }
}

pub const CONTACTS_WORKSPACE: &str = r#"{
  "objects": [
    {
      "id": "contacts",
      "name": "Contact",
      "fields": [
        {"id": "f-name", "name": "Name", "api_name": "full_name", "data_type": "text"},
        {"id": "f-email", "name": "Email Address", "api_name": "email", "data_type": "email", "is_required": true},
        {"id": "f-city", "name": "City", "api_name": "city", "data_type": "text"},
        {"id": "f-company", "name": "Company", "api_name": "company", "data_type": "text", "is_required": true}
      ],
      "records": [
        {"id": "rec-1", "values": {"full_name": "Ada Lovelace", "email": "ada@example.com", "city": "London"}},
        {"id": "rec-2", "values": {"full_name": "Grace Hopper", "email": "grace@navy.mil", "city": "Arlington"}}
      ]
    }
  ]
}
"#;

pub const CONTACTS_CSV: &str = "Name,Email,City,Lead Source\n\
Ada Lovelace,ADA@example.com,Paris,Web\n\
Grace Hopper,gh@example.com,Arlington,Event\n\
Alan Turing,alan@example.com,Wilmslow,Web\n";

/// Records of the `contacts` object from a saved workspace file.
pub fn contact_records(workspace: &Value) -> Vec<Value> {
    workspace["objects"][0]["records"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}
