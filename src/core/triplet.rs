//! Platform triplets.
//!
//! A triplet is the key that namespaces installed packages and build outputs:
//! architecture, operating system, and an optional linkage variant. Triplets
//! use the vcpkg spelling (`x64-linux`, `arm64-osx`, `x64-windows-static`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable holding the default triplet.
pub const TRIPLET_ENV: &str = "BERTH_DEFAULT_TRIPLET";

/// vcpkg's default-triplet variable, honoured after [`TRIPLET_ENV`].
pub const VCPKG_TRIPLET_ENV: &str = "VCPKG_DEFAULT_TRIPLET";

/// Library linkage variant of a triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Static,
    Dynamic,
}

impl Linkage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Linkage::Static => "static",
            Linkage::Dynamic => "dynamic",
        }
    }
}

/// Platform/configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Triplet {
    arch: String,
    os: String,
    linkage: Option<Linkage>,
}

/// Error returned when a triplet string is malformed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid triplet `{0}`: expected <arch>-<os>[-static|-dynamic], e.g. `x64-linux`")]
pub struct TripletParseError(pub String);

impl Triplet {
    pub fn new(arch: impl Into<String>, os: impl Into<String>, linkage: Option<Linkage>) -> Self {
        Triplet {
            arch: arch.into(),
            os: os.into(),
            linkage,
        }
    }

    pub fn arch(&self) -> &str {
        &self.arch
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    pub fn linkage(&self) -> Option<Linkage> {
        self.linkage
    }

    /// Effective linkage: explicit variant, else the platform default
    /// (dynamic on Windows, static elsewhere).
    pub fn effective_linkage(&self) -> Linkage {
        self.linkage.unwrap_or(if self.os == "windows" {
            Linkage::Dynamic
        } else {
            Linkage::Static
        })
    }

    /// Triplet for a host OS/architecture pair as reported by
    /// `std::env::consts`. Deterministic; `None` for unsupported hosts.
    pub fn for_host(os: &str, arch: &str) -> Option<Self> {
        let arch = match arch {
            "x86_64" => "x64",
            "x86" | "i686" | "i386" => "x86",
            "aarch64" => "arm64",
            "arm" => "arm",
            _ => return None,
        };

        let os = match os {
            "windows" => "windows",
            "linux" => "linux",
            "macos" | "darwin" => "osx",
            "freebsd" => "freebsd",
            _ => return None,
        };

        Some(Triplet::new(arch, os, None))
    }

    /// Triplet for the machine berth is running on.
    pub fn host() -> Option<Self> {
        Self::for_host(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// The install tree for this triplet under `install_root`.
    pub fn install_dir(&self, install_root: &Path) -> PathBuf {
        install_root.join(self.to_string())
    }
}

impl fmt::Display for Triplet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.linkage {
            Some(linkage) => write!(f, "{}-{}-{}", self.arch, self.os, linkage.as_str()),
            None => write!(f, "{}-{}", self.arch, self.os),
        }
    }
}

impl FromStr for Triplet {
    type Err = TripletParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || TripletParseError(s.to_string());
        let valid = |part: &str| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        };

        let parts: Vec<&str> = s.split('-').collect();
        let (arch, os, linkage) = match parts.as_slice() {
            [arch, os] => (*arch, *os, None),
            [arch, os, "static"] => (*arch, *os, Some(Linkage::Static)),
            [arch, os, "dynamic"] => (*arch, *os, Some(Linkage::Dynamic)),
            _ => return Err(err()),
        };

        if !valid(arch) || !valid(os) {
            return Err(err());
        }

        Ok(Triplet::new(arch, os, linkage))
    }
}

impl TryFrom<String> for Triplet {
    type Error = TripletParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Triplet> for String {
    fn from(t: Triplet) -> Self {
        t.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let t: Triplet = "x64-linux".parse().unwrap();
        assert_eq!(t.arch(), "x64");
        assert_eq!(t.os(), "linux");
        assert_eq!(t.linkage(), None);
        assert_eq!(t.to_string(), "x64-linux");

        let t: Triplet = "x64-windows-static".parse().unwrap();
        assert_eq!(t.linkage(), Some(Linkage::Static));
        assert_eq!(t.to_string(), "x64-windows-static");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "x64", "x64-linux-shared", "X64-Linux", "x64--linux", "a-b-c-d"] {
            assert!(bad.parse::<Triplet>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_host_detection_is_pure() {
        assert_eq!(
            Triplet::for_host("linux", "x86_64").unwrap().to_string(),
            "x64-linux"
        );
        assert_eq!(
            Triplet::for_host("macos", "aarch64").unwrap().to_string(),
            "arm64-osx"
        );
        assert_eq!(
            Triplet::for_host("windows", "x86").unwrap().to_string(),
            "x86-windows"
        );
        assert!(Triplet::for_host("plan9", "x86_64").is_none());
        assert_eq!(
            Triplet::for_host("linux", "x86_64"),
            Triplet::for_host("linux", "x86_64")
        );
    }

    #[test]
    fn test_effective_linkage() {
        let win: Triplet = "x64-windows".parse().unwrap();
        assert_eq!(win.effective_linkage(), Linkage::Dynamic);
        let linux: Triplet = "x64-linux".parse().unwrap();
        assert_eq!(linux.effective_linkage(), Linkage::Static);
        let dyn_linux: Triplet = "x64-linux-dynamic".parse().unwrap();
        assert_eq!(dyn_linux.effective_linkage(), Linkage::Dynamic);
    }

    #[test]
    fn test_triplets_get_distinct_install_dirs() {
        let root = Path::new("/opt/berth");
        let a: Triplet = "x64-linux".parse().unwrap();
        let b: Triplet = "x64-linux-dynamic".parse().unwrap();
        assert_ne!(a.install_dir(root), b.install_dir(root));
    }

    #[test]
    fn test_serde_as_string() {
        let t: Triplet = "arm64-osx".parse().unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"arm64-osx\"");
        let back: Triplet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
