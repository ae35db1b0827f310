//! Language standards.
//!
//! Standards are ordered oldest to newest so the composite requirement of a
//! component is simply the maximum requested anywhere in its closure.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Source language of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    C,
    #[serde(alias = "cpp", alias = "c++")]
    Cxx,
}

impl Language {
    /// Language of a source file, by extension.
    pub fn of_source(path: &std::path::Path) -> Option<Language> {
        match path.extension()?.to_str()? {
            "c" => Some(Language::C),
            "cc" | "cpp" | "cxx" | "c++" | "C" => Some(Language::Cxx),
            _ => None,
        }
    }
}

/// C standard version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CStandard {
    #[serde(rename = "89", alias = "c89", alias = "c90")]
    C89,
    #[serde(rename = "99", alias = "c99")]
    C99,
    #[serde(rename = "11", alias = "c11")]
    C11,
    #[serde(rename = "17", alias = "c17", alias = "c18")]
    C17,
    #[serde(rename = "23", alias = "c23")]
    C23,
}

/// C++ standard version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CppStandard {
    #[serde(rename = "11", alias = "c++11", alias = "cpp11")]
    Cpp11,
    #[serde(rename = "14", alias = "c++14", alias = "cpp14")]
    Cpp14,
    #[serde(rename = "17", alias = "c++17", alias = "cpp17")]
    Cpp17,
    #[serde(rename = "20", alias = "c++20", alias = "cpp20")]
    Cpp20,
    #[serde(rename = "23", alias = "c++23", alias = "cpp23")]
    Cpp23,
}

#[derive(Debug, Clone, Error)]
#[error("invalid {language} standard `{value}`")]
pub struct StandardParseError {
    pub language: &'static str,
    pub value: String,
}

impl CStandard {
    /// Value for `-std=`.
    pub fn as_flag_value(&self) -> &'static str {
        match self {
            CStandard::C89 => "c89",
            CStandard::C99 => "c99",
            CStandard::C11 => "c11",
            CStandard::C17 => "c17",
            CStandard::C23 => "c2x",
        }
    }
}

impl CppStandard {
    /// Value for `-std=`.
    pub fn as_flag_value(&self) -> &'static str {
        match self {
            CppStandard::Cpp11 => "c++11",
            CppStandard::Cpp14 => "c++14",
            CppStandard::Cpp17 => "c++17",
            CppStandard::Cpp20 => "c++20",
            CppStandard::Cpp23 => "c++23",
        }
    }
}

impl FromStr for CStandard {
    type Err = StandardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "89" | "90" | "c89" | "c90" => Ok(CStandard::C89),
            "99" | "c99" => Ok(CStandard::C99),
            "11" | "c11" => Ok(CStandard::C11),
            "17" | "18" | "c17" | "c18" => Ok(CStandard::C17),
            "23" | "c23" => Ok(CStandard::C23),
            _ => Err(StandardParseError {
                language: "C",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for CppStandard {
    type Err = StandardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "11" | "c++11" | "cpp11" => Ok(CppStandard::Cpp11),
            "14" | "c++14" | "cpp14" => Ok(CppStandard::Cpp14),
            "17" | "c++17" | "cpp17" => Ok(CppStandard::Cpp17),
            "20" | "c++20" | "cpp20" => Ok(CppStandard::Cpp20),
            "23" | "c++23" | "cpp23" => Ok(CppStandard::Cpp23),
            _ => Err(StandardParseError {
                language: "C++",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for CStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year = match self {
            CStandard::C89 => "89",
            CStandard::C99 => "99",
            CStandard::C11 => "11",
            CStandard::C17 => "17",
            CStandard::C23 => "23",
        };
        write!(f, "C{}", year)
    }
}

impl fmt::Display for CppStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C++{}", &self.as_flag_value()[3..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_supports_max() {
        assert!(CppStandard::Cpp20 > CppStandard::Cpp17);
        assert_eq!(
            [CppStandard::Cpp14, CppStandard::Cpp20, CppStandard::Cpp17]
                .into_iter()
                .max(),
            Some(CppStandard::Cpp20)
        );
        assert!(CStandard::C11 > CStandard::C99);
    }

    #[test]
    fn test_parse() {
        assert_eq!("17".parse::<CppStandard>().unwrap(), CppStandard::Cpp17);
        assert_eq!("c++20".parse::<CppStandard>().unwrap(), CppStandard::Cpp20);
        assert_eq!("c99".parse::<CStandard>().unwrap(), CStandard::C99);
        assert!("98".parse::<CppStandard>().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(CppStandard::Cpp17.to_string(), "C++17");
        assert_eq!(CStandard::C11.to_string(), "C11");
    }
}
