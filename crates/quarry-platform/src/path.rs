use crate::atom::Atom;
use std::fmt;

/// Collapse `.` and `..` path segments. `..` past the first segment is
/// dropped rather than escaping the root — both `SourceDir` and `SourceFile`
/// are always rooted at either `//` (the source root) or `/` (the system
/// root), and neither root has a parent to escape into.
pub fn normalize(raw: &str) -> String {
    let (prefix, rest) = if let Some(rest) = raw.strip_prefix("//") {
        ("//", rest)
    } else if let Some(rest) = raw.strip_prefix('/') {
        ("/", rest)
    } else {
        ("", raw)
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("{}{}", prefix, segments.join("/"))
}

/// Resolve `raw` against `current_dir`, applying GN-style path rules:
/// `//...` and `/...` are already absolute, anything else is relative to
/// `current_dir`.
pub fn resolve_relative(current_dir: &SourceDir, raw: &str) -> String {
    if raw.starts_with("//") || (raw.starts_with('/') && !raw.starts_with("//")) {
        normalize(raw)
    } else {
        normalize(&format!("{}{}", current_dir.as_str(), raw))
    }
}

/// A source-root-relative (`//chrome/renderer/`) or system-absolute
/// (`/usr/include/`) directory. Always ends in `/`. Backed by an interned
/// [`Atom`], so equality is a pointer comparison.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceDir(Atom);

impl SourceDir {
    /// The source root itself, `//`.
    pub fn root() -> SourceDir {
        SourceDir::new("//")
    }

    /// Constructs a `SourceDir` from an already-absolute string, normalizing
    /// `.`/`..` segments and ensuring a trailing slash.
    pub fn new(raw: &str) -> SourceDir {
        let mut normalized = normalize(raw);
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        SourceDir(Atom::new(&normalized))
    }

    pub fn from_relative(current_dir: &SourceDir, raw: &str) -> SourceDir {
        let mut resolved = resolve_relative(current_dir, raw);
        if !resolved.ends_with('/') {
            resolved.push('/');
        }
        SourceDir(Atom::new(&resolved))
    }

    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }

    pub fn is_system_absolute(&self) -> bool {
        !self.as_str().starts_with("//")
    }

    pub fn is_null(&self) -> bool {
        self.as_str().is_empty()
    }

    pub fn join_file(&self, name: &str) -> SourceFile {
        SourceFile::new(&format!("{}{}", self.as_str(), name))
    }

    pub fn join_dir(&self, name: &str) -> SourceDir {
        let name = name.trim_end_matches('/');
        SourceDir::new(&format!("{}{}/", self.as_str(), name))
    }

    /// The directory's name as used in a label, e.g. `renderer` for
    /// `//chrome/renderer/`.
    pub fn name(&self) -> &str {
        self.as_str().trim_end_matches('/').rsplit('/').next().unwrap_or("")
    }

    pub fn parent(&self) -> Option<SourceDir> {
        let trimmed = self.as_str().trim_end_matches('/');
        let idx = trimmed.rfind('/')?;
        Some(SourceDir::new(&trimmed[..=idx]))
    }
}

impl fmt::Debug for SourceDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceDir({:?})", self.as_str())
    }
}

impl fmt::Display for SourceDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A source-root-relative (`//chrome/renderer/foo.cc`) or system-absolute
/// file. Never ends in `/`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceFile(Atom);

impl SourceFile {
    pub fn new(raw: &str) -> SourceFile {
        let normalized = normalize(raw);
        SourceFile(Atom::new(&normalized))
    }

    pub fn from_relative(current_dir: &SourceDir, raw: &str) -> SourceFile {
        SourceFile::new(&resolve_relative(current_dir, raw))
    }

    pub fn as_str(&self) -> &'static str {
        self.0.as_str()
    }

    pub fn dir(&self) -> SourceDir {
        match self.as_str().rfind('/') {
            Some(idx) => SourceDir::new(&self.as_str()[..=idx]),
            None => SourceDir::root(),
        }
    }

    pub fn file_name(&self) -> &str {
        self.as_str().rsplit('/').next().unwrap_or(self.as_str())
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceFile({:?})", self.as_str())
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_dot_and_dotdot() {
        assert_eq!(normalize("//foo/./bar/../baz"), "//foo/baz");
        assert_eq!(normalize("//foo/../../bar"), "//bar");
    }

    #[test]
    fn dir_always_ends_in_slash() {
        let d = SourceDir::new("//chrome/renderer");
        assert_eq!(d.as_str(), "//chrome/renderer/");
        assert_eq!(d.name(), "renderer");
    }

    #[test]
    fn file_never_ends_in_slash() {
        let f = SourceFile::new("//chrome/renderer/foo.cc");
        assert_eq!(f.as_str(), "//chrome/renderer/foo.cc");
        assert_eq!(f.file_name(), "foo.cc");
        assert_eq!(f.dir().as_str(), "//chrome/renderer/");
    }

    #[test]
    fn relative_resolution_against_current_dir() {
        let cur = SourceDir::new("//chrome/renderer/");
        assert_eq!(
            SourceFile::from_relative(&cur, "foo.cc").as_str(),
            "//chrome/renderer/foo.cc"
        );
        assert_eq!(
            SourceFile::from_relative(&cur, "//base/foo.cc").as_str(),
            "//base/foo.cc"
        );
        assert_eq!(
            SourceDir::from_relative(&cur, "../base").as_str(),
            "//chrome/base/"
        );
    }

    #[test]
    fn parent_walks_up_one_level() {
        let d = SourceDir::new("//chrome/renderer/");
        assert_eq!(d.parent().unwrap().as_str(), "//chrome/");
        assert_eq!(d.parent().unwrap().parent().unwrap().as_str(), "//");
    }
}
