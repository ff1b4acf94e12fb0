//! Namespace grammar
//!
//! Converts between the three representations of a loadable unit:
//! - a namespace (`foo/bar`), the canonical form
//! - an artifact path (`foo/bar.pcl`), used as registry key and I/O target
//! - identifier names (`bar` for accessors, `Bar` / `Foo::Bar` for constants)
//!
//! Nothing here touches the filesystem.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// File extension of every artifact
pub const ARTIFACT_EXTENSION: &str = "pcl";

/// Hierarchy separator inside a namespace
pub const NS_SEP: char = '/';

/// Delimiter between segments of a qualified identifier
pub const QUALIFIED_SEP: &str = "::";

/// Errors raised for malformed namespaces or artifact paths
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    /// Empty string, or nothing but separators
    #[error("Namespace is empty")]
    Empty,

    /// Leading separator
    #[error("Namespace must be relative: {0}")]
    Absolute(String),

    /// `a//b` or a trailing separator
    #[error("Namespace has an empty segment: {0}")]
    EmptySegment(String),

    /// `.` or `..` segment
    #[error("Namespace segment '{segment}' is not allowed: {namespace}")]
    Traversal { namespace: String, segment: String },

    /// Character outside `[A-Za-z0-9_-]`
    #[error("Invalid character '{ch}' in namespace: {namespace}")]
    InvalidCharacter { namespace: String, ch: char },

    /// Path without the artifact extension
    #[error("Not an artifact path (expected .{ARTIFACT_EXTENSION}): {0}")]
    NotAnArtifact(PathBuf),
}

/// A validated, slash-separated namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(String);

impl Namespace {
    /// Validate a raw namespace string.
    ///
    /// A single trailing `.pcl` is accepted and stripped, so an already
    /// suffixed name never gets suffixed twice.
    pub fn parse(raw: &str) -> Result<Self, NamespaceError> {
        if raw.is_empty() || raw.chars().all(|c| c == NS_SEP) {
            return Err(NamespaceError::Empty);
        }
        if raw.starts_with(NS_SEP) || raw.starts_with('\\') {
            return Err(NamespaceError::Absolute(raw.to_string()));
        }

        let suffix = format!(".{}", ARTIFACT_EXTENSION);
        let body = raw.strip_suffix(suffix.as_str()).unwrap_or(raw);

        for segment in body.split(NS_SEP) {
            if segment.is_empty() {
                return Err(NamespaceError::EmptySegment(raw.to_string()));
            }
            if segment == "." || segment == ".." {
                return Err(NamespaceError::Traversal {
                    namespace: raw.to_string(),
                    segment: segment.to_string(),
                });
            }
            if let Some(ch) = segment
                .chars()
                .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
            {
                return Err(NamespaceError::InvalidCharacter {
                    namespace: raw.to_string(),
                    ch,
                });
            }
        }

        Ok(Self(body.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(NS_SEP)
    }

    /// Simple binding name (`foo/bar` -> `bar`)
    pub fn last_segment(&self) -> &str {
        last_segment(&self.0)
    }

    /// Fully qualified identifier (`foo_x/bar` -> `FooX::Bar`)
    pub fn qualified_identifier(&self) -> String {
        qualified_identifier(&self.0)
    }

    /// Default constant name (`foo/bar_baz` -> `BarBaz`)
    pub fn constant_name(&self) -> String {
        classify_segment(self.last_segment())
    }

    /// Relative artifact path for this namespace
    pub fn artifact_path(&self) -> ArtifactPath {
        let mut path: PathBuf = self.segments().collect();
        path.set_extension(ARTIFACT_EXTENSION);
        ArtifactPath(path)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Namespace {
    type Err = NamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Relative artifact path derived from a namespace (`foo/bar.pcl`)
///
/// Only constructible from a [`Namespace`], so the inverse transform
/// is total.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactPath(PathBuf);

impl ArtifactPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Namespace this path was derived from
    pub fn namespace(&self) -> Namespace {
        let segments: Vec<String> = self
            .0
            .with_extension("")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Namespace(segments.join("/"))
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for ArtifactPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Namespace -> artifact path
pub fn to_artifact_path(namespace: &str) -> Result<ArtifactPath, NamespaceError> {
    Namespace::parse(namespace).map(|ns| ns.artifact_path())
}

/// Artifact path -> namespace
///
/// Host separators (and `\`) are normalized to `/`.
pub fn from_artifact_path(path: &Path) -> Result<Namespace, NamespaceError> {
    let raw = path.to_string_lossy().replace(['\\', std::path::MAIN_SEPARATOR], "/");
    let suffix = format!(".{}", ARTIFACT_EXTENSION);
    match raw.strip_suffix(suffix.as_str()) {
        Some(body) if !body.is_empty() => Namespace::parse(body),
        _ => Err(NamespaceError::NotAnArtifact(path.to_path_buf())),
    }
}

/// Substring after the final `/`, or the whole string
pub fn last_segment(namespace: &str) -> &str {
    namespace.rsplit(NS_SEP).next().unwrap_or(namespace)
}

/// `foo_bar` -> `FooBar`
///
/// Every `_`-separated piece is capitalized: first letter upper case,
/// the rest lower case.
pub fn classify_segment(segment: &str) -> String {
    segment
        .split('_')
        .map(|piece| {
            let mut chars = piece.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// `foo_bar/baz` -> `FooBar::Baz`
pub fn qualified_identifier(namespace: &str) -> String {
    namespace
        .split(NS_SEP)
        .map(classify_segment)
        .collect::<Vec<_>>()
        .join(QUALIFIED_SEP)
}
