use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix marking a stability filter in the textual spec grammar.
pub const STABLE_PREFIX: &str = "stable:";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GoVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre: Option<String>,
}

impl GoVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    #[must_use]
    pub fn with_pre(mut self, tag: impl Into<String>) -> Self {
        self.pre = Some(tag.into());
        self
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.pre.is_none()
    }

    /// Normalize an upstream release tag such as `go1.21rc2` or `go1.20`.
    ///
    /// Upstream omits trailing zero segments, so missing minor/patch numbers
    /// are padded with `0` instead of being rejected.
    ///
    /// # Errors
    /// Returns an error when the tag has no numeric part, more than three
    /// numeric segments, or a non-numeric segment.
    pub fn from_upstream(tag: &str) -> Result<Self, VersionParseError> {
        let input = tag.trim();
        let (numeric, pre) = split_tag(strip_version_prefix(input), input)?;

        let segments: Vec<&str> = numeric.split('.').collect();
        if segments.len() > 3 {
            return Err(VersionParseError::Malformed {
                input: input.to_string(),
            });
        }

        let mut numbers = [0_u32; 3];
        for ((slot, segment), component) in numbers
            .iter_mut()
            .zip(&segments)
            .zip(VersionComponent::ALL)
        {
            *slot = parse_component(segment, component)?;
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre,
        })
    }
}

impl Ord for GoVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for GoVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComponent {
    Major,
    Minor,
    Patch,
}

impl VersionComponent {
    const ALL: [Self; 3] = [Self::Major, Self::Minor, Self::Patch];
}

impl fmt::Display for VersionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Major => write!(f, "major"),
            Self::Minor => write!(f, "minor"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Empty version")]
    Empty,
    #[error("Expected X.Y.Z format, got: {input}")]
    Malformed { input: String },
    #[error("Invalid {component} version: {value}")]
    InvalidComponent {
        component: VersionComponent,
        value: String,
    },
    #[error("Invalid pre-release tag in: {input}")]
    InvalidTag { input: String },
    #[error("Invalid version pattern: {input}")]
    InvalidPattern { input: String },
    #[error("Invalid alias name: {name}")]
    InvalidAliasName { name: String },
}

impl FromStr for GoVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let (numeric, pre) = split_tag(strip_version_prefix(input), input)?;

        let mut parts = numeric.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VersionParseError::Malformed {
                input: input.to_string(),
            });
        };

        Ok(Self {
            major: parse_component(major, VersionComponent::Major)?,
            minor: parse_component(minor, VersionComponent::Minor)?,
            patch: parse_component(patch, VersionComponent::Patch)?,
            pre,
        })
    }
}

impl TryFrom<String> for GoVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GoVersion> for String {
    fn from(version: GoVersion) -> Self {
        version.to_string()
    }
}

/// Strips a leading `go` or `v` when it is directly followed by a digit.
fn strip_version_prefix(input: &str) -> &str {
    for prefix in ["go", "v"] {
        if let Some(rest) = input.strip_prefix(prefix)
            && rest.starts_with(|c: char| c.is_ascii_digit())
        {
            return rest;
        }
    }
    input
}

/// Splits `1.21.0-rc1` or `1.21.0rc1` into the numeric part and the tag.
fn split_tag<'a>(
    body: &'a str,
    input: &str,
) -> Result<(&'a str, Option<String>), VersionParseError> {
    let split = body.split_once('-').or_else(|| {
        body.find(|c: char| !c.is_ascii_digit() && c != '.')
            .map(|index| body.split_at(index))
    });

    let Some((numeric, tag)) = split else {
        return Ok((body, None));
    };

    let tag_is_valid = !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_graphic() && !matches!(c, '*' | '/' | ':'));
    if !tag_is_valid {
        return Err(VersionParseError::InvalidTag {
            input: input.to_string(),
        });
    }

    Ok((numeric, Some(tag.to_string())))
}

fn parse_component(value: &str, component: VersionComponent) -> Result<u32, VersionParseError> {
    value
        .parse()
        .map_err(|_| VersionParseError::InvalidComponent {
            component,
            value: value.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternSegment {
    Any,
    Exact(u32),
}

/// Segment-wise wildcard over the numeric triple, e.g. `1.21.*` or `1.*.5`.
///
/// Patterns shorter than three segments end in `*`, and the missing
/// trailing segments match anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionPattern {
    segments: Vec<PatternSegment>,
}

impl VersionPattern {
    /// Pattern matching every version.
    #[must_use]
    pub fn any() -> Self {
        Self {
            segments: vec![PatternSegment::Any],
        }
    }

    #[must_use]
    pub fn matches(&self, version: &GoVersion) -> bool {
        [version.major, version.minor, version.patch]
            .iter()
            .enumerate()
            .all(|(index, value)| {
                match self
                    .segments
                    .get(index)
                    .copied()
                    .unwrap_or(PatternSegment::Any)
                {
                    PatternSegment::Any => true,
                    PatternSegment::Exact(expected) => expected == *value,
                }
            })
    }
}

impl FromStr for VersionPattern {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let invalid = || VersionParseError::InvalidPattern {
            input: input.to_string(),
        };

        let body = strip_version_prefix(input);
        let raw: Vec<&str> = body.split('.').collect();
        if raw.len() > 3 {
            return Err(invalid());
        }

        let mut segments = Vec::with_capacity(raw.len());
        for (segment, component) in raw.iter().zip(VersionComponent::ALL) {
            if *segment == "*" {
                segments.push(PatternSegment::Any);
            } else if segment.contains('*') {
                return Err(invalid());
            } else {
                segments.push(PatternSegment::Exact(parse_component(segment, component)?));
            }
        }

        let has_wildcard = segments.contains(&PatternSegment::Any);
        let short_without_trailing_wildcard =
            segments.len() < 3 && segments.last() != Some(&PatternSegment::Any);
        if !has_wildcard || short_without_trailing_wildcard {
            return Err(invalid());
        }

        Ok(Self { segments })
    }
}

impl fmt::Display for VersionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str(".")?;
            }
            match segment {
                PatternSegment::Any => f.write_str("*")?,
                PatternSegment::Exact(value) => write!(f, "{value}")?,
            }
        }
        Ok(())
    }
}

/// A user query, produced by a single parsing front-end so downstream code
/// matches on the variant instead of re-inspecting string shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    Exact(GoVersion),
    Wildcard(VersionPattern),
    Alias(String),
    /// Drop pre-releases from whatever the inner spec resolves to.
    Stable(Box<VersionSpec>),
}

impl VersionSpec {
    /// Wrap in a stability filter; already-filtered specs are not wrapped twice.
    #[must_use]
    pub fn stable(self) -> Self {
        match self {
            Self::Stable(_) => self,
            other => Self::Stable(Box::new(other)),
        }
    }
}

impl FromStr for VersionSpec {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(VersionParseError::Empty);
        }

        if let Some(rest) = input.strip_prefix(STABLE_PREFIX) {
            return Ok(rest.parse::<Self>()?.stable());
        }

        if input.contains('*') {
            return Ok(Self::Wildcard(input.parse()?));
        }

        if strip_version_prefix(input).starts_with(|c: char| c.is_ascii_digit()) {
            return Ok(Self::Exact(input.parse()?));
        }

        validate_alias_name(input)?;
        Ok(Self::Alias(input.to_string()))
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(version) => write!(f, "{version}"),
            Self::Wildcard(pattern) => write!(f, "{pattern}"),
            Self::Alias(name) => f.write_str(name),
            Self::Stable(inner) => write!(f, "{STABLE_PREFIX}{inner}"),
        }
    }
}

/// Alias names start with a letter, continue with `[A-Za-z0-9._-]`, and
/// never look like a version (`go1...`, `v1...`).
///
/// # Errors
/// Returns [`VersionParseError::InvalidAliasName`] when the name breaks any
/// of those rules.
pub fn validate_alias_name(name: &str) -> Result<(), VersionParseError> {
    let mut chars = name.chars();
    let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_is_valid = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    let looks_like_version = strip_version_prefix(name) != name;

    if starts_with_letter && rest_is_valid && !looks_like_version {
        Ok(())
    } else {
        Err(VersionParseError::InvalidAliasName {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub version: GoVersion,
    pub url: String,
    pub filename: String,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub stable: bool,
}

impl CatalogEntry {
    #[must_use]
    pub fn new(version: GoVersion, url: impl Into<String>, filename: impl Into<String>) -> Self {
        let stable = version.is_stable();
        Self {
            version,
            url: url.into(),
            filename: filename.into(),
            sha256: None,
            size: None,
            stable,
        }
    }

    #[must_use]
    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledVersion {
    pub version: GoVersion,
    pub path: PathBuf,
    pub installed_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Anything the resolver can select from.
pub trait Versioned {
    fn version(&self) -> &GoVersion;
}

impl Versioned for GoVersion {
    fn version(&self) -> &GoVersion {
        self
    }
}

impl Versioned for CatalogEntry {
    fn version(&self) -> &GoVersion {
        &self.version
    }
}

impl Versioned for InstalledVersion {
    fn version(&self) -> &GoVersion {
        &self.version
    }
}
