use std::fmt;
use std::str::FromStr;

use pep440_rs::Version;

use crate::name::normalize_dist_name;
use crate::tags::CompatibilityTag;

pub const WHEEL_EXTENSION: &str = ".whl";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WheelFilenameError {
    #[error("`{0}` does not end in .whl")]
    Extension(String),
    #[error("`{0}` does not have 5 or 6 dash-separated components")]
    Components(String),
    #[error("`{filename}` has an invalid version `{version}`")]
    Version { filename: String, version: String },
    #[error("`{filename}` has an invalid build tag `{build}`")]
    BuildTag { filename: String, build: String },
}

/// Identity parsed from `{name}-{version}(-{build})?-{py}-{abi}-{plat}.whl`.
///
/// Compressed tag sets are expanded, so `py2.py3-none-any` yields both
/// `py2-none-any` and `py3-none-any`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelFilename {
    pub name: String,
    pub version: Version,
    pub build_tag: Option<String>,
    pub tags: Vec<CompatibilityTag>,
}

impl WheelFilename {
    pub fn normalized_name(&self) -> String {
        normalize_dist_name(&self.name)
    }
}

impl FromStr for WheelFilename {
    type Err = WheelFilenameError;

    fn from_str(filename: &str) -> Result<Self, Self::Err> {
        let stem = strip_wheel_extension(filename)
            .ok_or_else(|| WheelFilenameError::Extension(filename.to_string()))?;
        let parts: Vec<&str> = stem.split('-').collect();
        let (name, version, build_tag, python, abi, platform) = match parts.as_slice() {
            [name, version, python, abi, platform] => {
                (*name, *version, None, *python, *abi, *platform)
            }
            [name, version, build, python, abi, platform] => {
                if !build.starts_with(|ch: char| ch.is_ascii_digit()) {
                    return Err(WheelFilenameError::BuildTag {
                        filename: filename.to_string(),
                        build: (*build).to_string(),
                    });
                }
                let build = Some((*build).to_string());
                (*name, *version, build, *python, *abi, *platform)
            }
            _ => return Err(WheelFilenameError::Components(filename.to_string())),
        };
        if [name, python, abi, platform].iter().any(|part| part.is_empty()) {
            return Err(WheelFilenameError::Components(filename.to_string()));
        }
        let version = Version::from_str(version).map_err(|_| WheelFilenameError::Version {
            filename: filename.to_string(),
            version: version.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            version,
            build_tag,
            tags: expand_tags(python, abi, platform),
        })
    }
}

impl fmt::Display for WheelFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

fn strip_wheel_extension(filename: &str) -> Option<&str> {
    let split = filename.len().checked_sub(WHEEL_EXTENSION.len())?;
    if !filename.is_char_boundary(split) {
        return None;
    }
    let (stem, extension) = filename.split_at(split);
    extension.eq_ignore_ascii_case(WHEEL_EXTENSION).then_some(stem)
}

pub(crate) fn has_wheel_extension(filename: &str) -> bool {
    strip_wheel_extension(filename).is_some()
}

fn expand_tags(python: &str, abi: &str, platform: &str) -> Vec<CompatibilityTag> {
    let mut tags = Vec::new();
    for py in python.split('.') {
        for abi in abi.split('.') {
            for plat in platform.split('.') {
                let tag = CompatibilityTag::new(py, abi, plat);
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }
    }
    tags
}
