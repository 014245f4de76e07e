//! Absolute, normalized filesystem paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors from parsing or extending a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Empty,
    /// The path does not start with `/`.
    Relative { path: String },
    /// A `..` component climbs above the root.
    EscapesRoot { path: String },
    /// A component passed to `join` is not a single plain name.
    InvalidComponent { component: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Empty => write!(f, "path is empty"),
            PathError::Relative { path } => write!(f, "path '{}' is not absolute", path),
            PathError::EscapesRoot { path } => write!(f, "path '{}' escapes the root", path),
            PathError::InvalidComponent { component } => {
                write!(f, "invalid path component '{}'", component)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A path from the filesystem root.
///
/// Parsing normalizes `//`, trailing slashes, `.` and `..`, so two paths
/// naming the same node compare equal.
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FsPath {
    components: Vec<String>,
}

impl FsPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse an absolute path.
    ///
    /// ```rust
    /// use facetfs_fs::FsPath;
    ///
    /// let path = FsPath::parse("/home//alice/./docs/../notes.txt").unwrap();
    /// assert_eq!(path.to_string(), "/home/alice/notes.txt");
    /// assert!(FsPath::parse("home/alice").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        if !s.starts_with('/') {
            return Err(PathError::Relative {
                path: s.to_string(),
            });
        }

        let mut components: Vec<String> = Vec::new();
        for component in s.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    if components.pop().is_none() {
                        return Err(PathError::EscapesRoot {
                            path: s.to_string(),
                        });
                    }
                }
                name => components.push(name.to_string()),
            }
        }
        Ok(Self { components })
    }

    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// The last component; `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<FsPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }

    /// Append a single name.
    pub fn join(&self, name: &str) -> Result<FsPath, PathError> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(PathError::InvalidComponent {
                component: name.to_string(),
            });
        }
        let mut components = self.components.clone();
        components.push(name.to_string());
        Ok(Self { components })
    }

    /// Proper ancestors, nearest first, ending with the root.
    pub fn ancestors(&self) -> Vec<FsPath> {
        let mut out = Vec::with_capacity(self.components.len());
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            out.push(path);
        }
        out
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn depth(&self) -> usize {
        self.components.len()
    }
}

impl fmt::Display for FsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for FsPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FsPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FsPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
