//! Compatibility tags and marker environment for the declared mirror target.
//!
//! The target is declared once per run by the operator, so the platform
//! taxonomy here is a handful of substring heuristics rather than a full
//! platform detector.

use std::fmt;
use std::str::FromStr;

use pep508_rs::{MarkerEnvironment, StringVersion};
use serde::Serialize;
use strum::{Display, EnumString};

/// Platform tag used by pure-Python wheels.
pub const UNIVERSAL_PLATFORM: &str = "any";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("target platform must not be empty")]
    EmptyPlatform,
    #[error("`{0}` is not an interpreter version; expected digits such as `311`")]
    InvalidPythonVersion(String),
    #[error("unknown implementation code `{0}` (expected `cp` or `pp`)")]
    UnknownImplementation(String),
    #[error("`{value}` is not a valid PEP 440 version for `{field}`")]
    MarkerVersion { field: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum Implementation {
    #[strum(serialize = "cp")]
    #[serde(rename = "cp")]
    CPython,
    #[strum(serialize = "pp")]
    #[serde(rename = "pp")]
    PyPy,
}

impl Implementation {
    /// Value of the `implementation_name` marker.
    pub fn marker_name(self) -> &'static str {
        match self {
            Self::CPython => "cpython",
            Self::PyPy => "pypy",
        }
    }

    /// Value of the `platform_python_implementation` marker.
    pub fn python_implementation(self) -> &'static str {
        match self {
            Self::CPython => "CPython",
            Self::PyPy => "PyPy",
        }
    }
}

/// One binary-compatibility class: `(interpreter, abi, platform)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CompatibilityTag {
    pub interpreter: String,
    pub abi: String,
    pub platform: String,
}

impl CompatibilityTag {
    pub fn new(interpreter: &str, abi: &str, platform: &str) -> Self {
        Self {
            interpreter: interpreter.to_ascii_lowercase(),
            abi: abi.to_ascii_lowercase(),
            platform: platform.to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for CompatibilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.interpreter, self.abi, self.platform)
    }
}

/// Accepted tags, most specific first.
///
/// The order is informational; selection only asks whether a wheel's tags
/// intersect the set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagSet {
    tags: Vec<CompatibilityTag>,
}

impl TagSet {
    pub fn new(tags: Vec<CompatibilityTag>) -> Self {
        Self { tags }
    }

    pub fn contains(&self, tag: &CompatibilityTag) -> bool {
        self.tags.contains(tag)
    }

    pub fn intersects(&self, candidates: &[CompatibilityTag]) -> bool {
        candidates.iter().any(|tag| self.contains(tag))
    }

    pub fn most_specific(&self) -> Option<&CompatibilityTag> {
        self.tags.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompatibilityTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Operator-declared target: platform tag, interpreter digits, implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSpec {
    pub platform: String,
    pub python_version: String,
    pub implementation: Implementation,
}

impl TargetSpec {
    pub fn parse(
        platform: &str,
        python_version: &str,
        implementation: &str,
    ) -> Result<Self, TargetError> {
        let platform = platform.trim();
        if platform.is_empty() {
            return Err(TargetError::EmptyPlatform);
        }
        let python_version = python_version.trim();
        if python_version.len() < 2 || !python_version.chars().all(|ch| ch.is_ascii_digit()) {
            return Err(TargetError::InvalidPythonVersion(python_version.to_string()));
        }
        let implementation = Implementation::from_str(implementation.trim())
            .map_err(|_| TargetError::UnknownImplementation(implementation.to_string()))?;
        Ok(Self {
            platform: platform.to_ascii_lowercase(),
            python_version: python_version.to_string(),
            implementation,
        })
    }

    /// `311` becomes `3.11`.
    pub fn dotted_python_version(&self) -> String {
        let (major, minor) = self.python_version.split_at(1);
        format!("{major}.{minor}")
    }

    pub fn sys_platform(&self) -> &'static str {
        if self.platform.contains("linux") {
            "linux"
        } else if self.platform.contains("win") {
            "win32"
        } else {
            "darwin"
        }
    }

    pub fn platform_machine(&self) -> &'static str {
        if self.platform.contains("x86_64") || self.platform.contains("amd64") {
            "x86_64"
        } else {
            "arm64"
        }
    }

    fn interpreter_tag(&self) -> String {
        format!("{}{}", self.implementation, self.python_version)
    }

    /// The five accepted tags: exact ABI, stable ABI, interpreter-only, then the
    /// two pure-Python tags on the universal platform.
    pub fn tags(&self) -> TagSet {
        let interpreter = self.interpreter_tag();
        TagSet::new(vec![
            CompatibilityTag::new(&interpreter, &interpreter, &self.platform),
            CompatibilityTag::new(&interpreter, "abi3", &self.platform),
            CompatibilityTag::new(&interpreter, "none", &self.platform),
            CompatibilityTag::new("py3", "none", UNIVERSAL_PLATFORM),
            CompatibilityTag::new("py2.py3", "none", UNIVERSAL_PLATFORM),
        ])
    }

    pub fn marker_environment(&self) -> Result<MarkerEnvironment, TargetError> {
        let python_version = self.dotted_python_version();
        let full_version = format!("{python_version}.0");
        let sys_platform = self.sys_platform();
        let (os_name, platform_system) = match sys_platform {
            "linux" => ("posix", "Linux"),
            "win32" => ("nt", "Windows"),
            _ => ("posix", "Darwin"),
        };
        Ok(MarkerEnvironment {
            implementation_name: self.implementation.marker_name().to_string(),
            implementation_version: string_version(&full_version, "implementation_version")?,
            os_name: os_name.to_string(),
            platform_machine: self.platform_machine().to_string(),
            platform_python_implementation: self
                .implementation
                .python_implementation()
                .to_string(),
            platform_release: String::new(),
            platform_system: platform_system.to_string(),
            platform_version: String::new(),
            python_full_version: string_version(&full_version, "python_full_version")?,
            python_version: string_version(&python_version, "python_version")?,
            sys_platform: sys_platform.to_string(),
        })
    }
}

fn string_version(value: &str, field: &'static str) -> Result<StringVersion, TargetError> {
    StringVersion::from_str(value).map_err(|_| TargetError::MarkerVersion {
        field,
        value: value.to_string(),
    })
}

/// Everything the resolver needs to know about the target, built once per run
/// and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct TargetEnvironment {
    pub spec: TargetSpec,
    pub tags: TagSet,
    pub markers: MarkerEnvironment,
}

impl TargetEnvironment {
    pub fn build(
        platform: &str,
        python_version: &str,
        implementation: &str,
    ) -> Result<Self, TargetError> {
        Self::from_spec(TargetSpec::parse(platform, python_version, implementation)?)
    }

    pub fn from_spec(spec: TargetSpec) -> Result<Self, TargetError> {
        let tags = spec.tags();
        let markers = spec.marker_environment()?;
        Ok(Self {
            spec,
            tags,
            markers,
        })
    }
}
