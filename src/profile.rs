//! Reusable import settings stored as YAML.
//!
//! ```yaml
//! on_duplicate: skip
//! match_field: email
//! parse_mode: quoted
//! max_samples: 50
//! create_missing_fields: true
//! column_overrides:
//!   E-mail: email
//!   Internal Notes: ~
//! ```
//!
//! Command-line flags take precedence over profile values.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{apply::OnDuplicate, infer::DEFAULT_MAX_SAMPLES, tabular::ParseMode};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportProfile {
    #[serde(default)]
    pub on_duplicate: Option<OnDuplicate>,
    #[serde(default)]
    pub match_field: Option<String>,
    #[serde(default)]
    pub parse_mode: Option<ParseMode>,
    #[serde(default)]
    pub max_samples: Option<usize>,
    #[serde(default)]
    pub create_missing_fields: bool,
    /// Header to field api name; `null` leaves the column unmapped.
    #[serde(default)]
    pub column_overrides: BTreeMap<String, Option<String>>,
}

impl ImportProfile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening profile {path:?}"))?;
        let profile: ImportProfile = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing profile YAML {path:?}"))?;
        profile.ensure_valid()?;
        Ok(profile)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let profile: ImportProfile = serde_yaml::from_str(raw).context("Parsing profile YAML")?;
        profile.ensure_valid()?;
        Ok(profile)
    }

    pub fn ensure_valid(&self) -> Result<()> {
        if let Some(samples) = self.max_samples {
            ensure!(samples > 0, "max_samples must be positive");
        }
        Ok(())
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples.unwrap_or(DEFAULT_MAX_SAMPLES)
    }
}
