use std::cmp::Ordering;
use std::fmt;

use crate::core::error::{LauncherError, LauncherResult};

/// Version of a Java runtime, with legacy `1.x` numbering folded into the
/// modern scheme (`1.8.0_392` is `8.0.392`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaVersion {
    pub components: Vec<u32>,
    pub raw: String,
}

impl JavaVersion {
    pub fn parse(raw: &str) -> Option<Self> {
        // Build metadata and pre-release tags do not take part in matching.
        let core = raw.trim().split(['+', '-']).next().unwrap_or("");
        let components = numeric_components(core)?;
        Some(Self {
            components: normalize_legacy(components),
            raw: raw.trim().to_string(),
        })
    }

    pub fn major(&self) -> u32 {
        self.components.first().copied().unwrap_or(0)
    }

    pub fn minor(&self) -> u32 {
        self.components.get(1).copied().unwrap_or(0)
    }

    fn component(&self, index: usize) -> u32 {
        self.components.get(index).copied().unwrap_or(0)
    }
}

impl fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    /// `1.8+`
    AtLeast,
    /// `1.7*`, or a bare `11`
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct VersionPattern {
    components: Vec<u32>,
    kind: MatchKind,
}

impl VersionPattern {
    fn parse(token: &str) -> Option<Self> {
        let (body, kind) = if let Some(body) = token.strip_suffix('+') {
            (body, MatchKind::AtLeast)
        } else if let Some(body) = token.strip_suffix('*') {
            (body, MatchKind::Prefix)
        } else {
            (token, MatchKind::Prefix)
        };
        let components = numeric_components(body)?;
        Some(Self {
            components: normalize_legacy(components),
            kind,
        })
    }

    fn matches(&self, version: &JavaVersion) -> bool {
        let mut ordering = Ordering::Equal;
        for (index, wanted) in self.components.iter().enumerate() {
            ordering = version.component(index).cmp(wanted);
            if ordering != Ordering::Equal {
                break;
            }
        }
        match self.kind {
            MatchKind::AtLeast => ordering != Ordering::Less,
            MatchKind::Prefix => ordering == Ordering::Equal,
        }
    }
}

/// A `version` attribute of `<j2se>`/`<java>`: space separated alternatives,
/// any of which may match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    raw: String,
    alternatives: Vec<VersionPattern>,
}

impl VersionRequirement {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        let alternatives = raw
            .split_whitespace()
            .map(|token| {
                VersionPattern::parse(token).ok_or_else(|| {
                    LauncherError::PlatformPrecheck(format!(
                        "unable to parse version=\"{raw}\" in jnlp file"
                    ))
                })
            })
            .collect::<LauncherResult<Vec<_>>>()?;
        if alternatives.is_empty() {
            return Err(LauncherError::PlatformPrecheck(format!(
                "unable to parse version=\"{raw}\" in jnlp file"
            )));
        }
        Ok(Self {
            raw: raw.trim().to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &JavaVersion) -> bool {
        self.alternatives.iter().any(|p| p.matches(version))
    }
}

/// Every requirement of the relevant resource sets must accept `current`.
pub fn check_required_versions(required: &[String], current: &JavaVersion) -> LauncherResult<()> {
    for raw in required {
        let requirement = VersionRequirement::parse(raw)?;
        if !requirement.matches(current) {
            return Err(LauncherError::PlatformPrecheck(format!(
                "This JNLP file requires Java version {}, found {}",
                requirement.raw, current
            )));
        }
    }
    Ok(())
}

/// Quoted version out of `java -version` output
/// (`openjdk version "17.0.8" 2023-07-18`).
pub fn parse_version_output(output: &str) -> Option<JavaVersion> {
    output.lines().find_map(|line| {
        let start = line.find('"')?;
        let end = line[start + 1..].find('"')?;
        JavaVersion::parse(&line[start + 1..start + 1 + end])
    })
}

fn numeric_components(text: &str) -> Option<Vec<u32>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.split(['.', '_'])
        .map(|part| part.parse::<u32>().ok())
        .collect()
}

fn normalize_legacy(mut components: Vec<u32>) -> Vec<u32> {
    if components.len() > 1 && components[0] == 1 {
        components.remove(0);
    }
    components
}
