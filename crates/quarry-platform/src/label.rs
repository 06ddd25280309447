use crate::atom::Atom;
use crate::path::SourceDir;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabelParseError {
    #[error("label `{0}` must start with `//` or `:`")]
    MissingRoot(String),
    #[error("label `{0}` has more than one `:`")]
    MultipleColons(String),
    #[error("label `{0}` has an empty name")]
    EmptyName(String),
    #[error("invalid character `{1}` in label `{0}`")]
    InvalidChar(String, char),
}

/// `(dir, name, toolchain)`, the fully qualified identifier of an [`Item`].
///
/// Two labels are equal iff their directory, name and toolchain are all
/// equal; directory and name are interned so equality on those fields is a
/// pointer comparison, and the whole label's hash is precomputed at
/// construction so repeated registry lookups don't re-hash it.
///
/// [`Item`]: ../quarry/core/item/enum.Item.html
#[derive(Clone)]
pub struct Label {
    dir: SourceDir,
    name: Atom,
    toolchain: Option<Arc<Label>>,
    hash: u64,
}

impl Label {
    pub fn new(dir: SourceDir, name: &str, toolchain: Option<Arc<Label>>) -> Label {
        let name = Atom::new(name);
        let hash = Self::compute_hash(&dir, &name, toolchain.as_deref());
        Label {
            dir,
            name,
            toolchain,
            hash,
        }
    }

    pub fn null() -> Label {
        Label::new(SourceDir::new(""), "", None)
    }

    pub fn is_null(&self) -> bool {
        self.dir.is_null()
    }

    fn compute_hash(dir: &SourceDir, name: &Atom, toolchain: Option<&Label>) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        dir.hash(&mut hasher);
        name.hash(&mut hasher);
        toolchain.map(Label::hash_value).hash(&mut hasher);
        hasher.finish()
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }

    pub fn dir(&self) -> &SourceDir {
        &self.dir
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn toolchain(&self) -> Option<&Label> {
        self.toolchain.as_deref()
    }

    /// Returns a copy of this label with an empty toolchain.
    pub fn with_no_toolchain(&self) -> Label {
        Label::new(self.dir, self.name.as_str(), None)
    }

    pub fn with_toolchain(&self, toolchain: Arc<Label>) -> Label {
        Label::new(self.dir, self.name.as_str(), Some(toolchain))
    }

    pub fn toolchains_equal(&self, other: &Label) -> bool {
        self.toolchain == other.toolchain
    }

    /// Parses `input`, which may be absolute (`//dir:name`), toolchain-relative
    /// (`:name`), or directory-relative (`../common:common`), resolving
    /// against `current_dir` and defaulting to `current_toolchain` when no
    /// `(toolchain)` suffix is present.
    pub fn parse(
        current_dir: &SourceDir,
        current_toolchain: Option<&Arc<Label>>,
        input: &str,
    ) -> Result<Label, LabelParseError> {
        let (body, toolchain_str) = split_toolchain(input);

        let toolchain = match toolchain_str {
            Some(t) => {
                let parsed = Label::parse(current_dir, None, t)?;
                Some(Arc::new(parsed))
            }
            None => current_toolchain.cloned(),
        };

        let (dir_part, name_part) = split_dir_and_name(body)?;

        if dir_part.is_empty() && name_part.is_none() {
            return Err(LabelParseError::MissingRoot(input.to_string()));
        }
        if !dir_part.is_empty() && !dir_part.starts_with("//") && name_part.is_none() {
            // A bare relative path with no `:` and no `//` prefix is not a label.
            return Err(LabelParseError::MissingRoot(input.to_string()));
        }

        let dir = if dir_part.is_empty() {
            *current_dir
        } else {
            SourceDir::from_relative(current_dir, dir_part)
        };

        let name = match name_part {
            Some("") => return Err(LabelParseError::EmptyName(input.to_string())),
            Some(n) => {
                validate_name(input, n)?;
                n.to_string()
            }
            None => dir.name().to_string(),
        };

        Ok(Label::new(dir, &name, toolchain))
    }

    /// The name used in diagnostics and writer output, e.g.
    /// `//chrome/renderer:renderer(//toolchain:x64)`.
    pub fn display_name(&self, include_toolchain: bool) -> String {
        let dir = self.dir.as_str().trim_end_matches('/');
        let mut out = format!("{}:{}", dir, self.name.as_str());
        if include_toolchain {
            if let Some(tc) = &self.toolchain {
                out.push('(');
                out.push_str(&tc.display_name(false));
                out.push(')');
            }
        }
        out
    }

    /// Like [`display_name`](Self::display_name), but only includes the
    /// toolchain when it differs from `default_toolchain`.
    pub fn display_name_with_default(&self, default_toolchain: Option<&Label>) -> String {
        let include = match (&self.toolchain, default_toolchain) {
            (None, _) => false,
            (Some(tc), Some(default)) => tc.as_ref() != default,
            (Some(_), None) => true,
        };
        self.display_name(include)
    }
}

fn validate_name(input: &str, name: &str) -> Result<(), LabelParseError> {
    for ch in name.chars() {
        if !(ch.is_alphanumeric() || ch == '_' || ch == '-' || ch == '.') {
            return Err(LabelParseError::InvalidChar(input.to_string(), ch));
        }
    }
    Ok(())
}

fn split_toolchain(input: &str) -> (&str, Option<&str>) {
    if input.ends_with(')') {
        if let Some(idx) = input.rfind('(') {
            return (&input[..idx], Some(&input[idx + 1..input.len() - 1]));
        }
    }
    (input, None)
}

fn split_dir_and_name(body: &str) -> Result<(&str, Option<&str>), LabelParseError> {
    let mut parts = body.splitn(3, ':');
    let dir_part = parts.next().unwrap_or("");
    let name_part = parts.next();
    if parts.next().is_some() {
        return Err(LabelParseError::MultipleColons(body.to_string()));
    }
    Ok((dir_part, name_part))
}

impl PartialEq for Label {
    fn eq(&self, other: &Label) -> bool {
        self.dir == other.dir && self.name == other.name && self.toolchain == other.toolchain
    }
}

impl Eq for Label {}

impl std::hash::Hash for Label {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Label) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Label) -> std::cmp::Ordering {
        (self.dir, self.name.as_str(), &self.toolchain).cmp(&(
            other.dir,
            other.name.as_str(),
            &other.toolchain,
        ))
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({})", self.display_name(true))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(s: &str) -> SourceDir {
        SourceDir::new(s)
    }

    #[test]
    fn parses_fully_qualified_label_with_toolchain() {
        let label = Label::parse(
            &dir("//"),
            None,
            "//chrome/renderer:renderer(//toolchain:x64)",
        )
        .unwrap();
        assert_eq!(label.dir().as_str(), "//chrome/renderer/");
        assert_eq!(label.name(), "renderer");
        let tc = label.toolchain().unwrap();
        assert_eq!(tc.dir().as_str(), "//toolchain/");
        assert_eq!(tc.name(), "x64");
    }

    #[test]
    fn colon_only_label_uses_current_dir() {
        let label = Label::parse(&dir("//src/"), None, ":foo").unwrap();
        assert_eq!(label.dir().as_str(), "//src/");
        assert_eq!(label.name(), "foo");
    }

    #[test]
    fn implicit_name_matches_directory_basename() {
        let label = Label::parse(&dir("//"), None, "//foo").unwrap();
        assert_eq!(label.name(), "foo");
        let explicit = Label::parse(&dir("//"), None, "//foo:foo").unwrap();
        assert_eq!(label, explicit);
    }

    #[test]
    fn no_toolchain_suffix_inherits_current_toolchain() {
        let tc = Arc::new(Label::parse(&dir("//"), None, "//toolchain:x64").unwrap());
        let label = Label::parse(&dir("//src/"), Some(&tc), ":foo").unwrap();
        assert_eq!(label.toolchain().unwrap().name(), "x64");
    }

    #[test]
    fn rejects_bare_relative_path() {
        assert!(Label::parse(&dir("//"), None, "foo").is_err());
    }

    #[test]
    fn equality_is_structural() {
        let a = Label::parse(&dir("//"), None, "//foo:bar").unwrap();
        let b = Label::parse(&dir("//"), None, "//foo:bar").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }
}
