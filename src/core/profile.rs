//! Build types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Optimization profile for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    #[default]
    Debug,
    Release,
}

#[derive(Debug, Clone, Error)]
#[error("invalid build type `{0}`: expected `debug` or `release`")]
pub struct BuildTypeParseError(pub String);

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Release => "release",
        }
    }

    /// Flags every compilation under this profile receives.
    pub fn compile_flags(&self) -> &'static [&'static str] {
        match self {
            BuildType::Debug => &["-g", "-O0"],
            BuildType::Release => &["-O2", "-DNDEBUG"],
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = BuildTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            _ => Err(BuildTypeParseError(s.to_string())),
        }
    }
}
