//! Label patterns: `//foo:*` (any name in a directory), `//foo/*` (any
//! label recursively under a directory) and exact labels, with an optional
//! `(toolchain)` constraint. Backs `label_matches`, `filter_labels` and
//! target `visibility` lists.

use std::sync::Arc;

use quarry_platform::{Label, LabelParseError, SourceDir};

#[derive(Debug, Clone)]
pub enum LabelPattern {
    Exact(Label),
    AnyNameInDir {
        dir: SourceDir,
        toolchain: Option<Label>,
    },
    AnyUnderDir {
        dir: SourceDir,
        toolchain: Option<Label>,
    },
}

impl LabelPattern {
    pub fn parse(
        current_dir: &SourceDir,
        current_toolchain: Option<&Arc<Label>>,
        input: &str,
    ) -> Result<LabelPattern, LabelParseError> {
        let (body, toolchain_str) = split_toolchain_suffix(input);

        let toolchain = match toolchain_str {
            Some(t) => Some(Label::parse(current_dir, None, t)?),
            None => current_toolchain.map(|l| l.as_ref().clone()),
        };

        if let Some(dir_str) = body.strip_suffix("/*") {
            let dir = if dir_str.is_empty() {
                SourceDir::root()
            } else {
                SourceDir::from_relative(current_dir, dir_str)
            };
            return Ok(LabelPattern::AnyUnderDir { dir, toolchain });
        }

        if let Some((dir_str, name)) = body.rsplit_once(':') {
            if name == "*" {
                let dir = if dir_str.is_empty() {
                    *current_dir
                } else {
                    SourceDir::from_relative(current_dir, dir_str)
                };
                return Ok(LabelPattern::AnyNameInDir { dir, toolchain });
            }
        }

        Ok(LabelPattern::Exact(Label::parse(
            current_dir,
            current_toolchain,
            input,
        )?))
    }

    pub fn matches(&self, label: &Label) -> bool {
        match self {
            LabelPattern::Exact(pattern) => {
                pattern.dir() == label.dir()
                    && pattern.name() == label.name()
                    && toolchain_matches(pattern.toolchain(), label.toolchain())
            }
            LabelPattern::AnyNameInDir { dir, toolchain } => {
                *dir == *label.dir() && constraint_matches(toolchain.as_ref(), label.toolchain())
            }
            LabelPattern::AnyUnderDir { dir, toolchain } => {
                is_under(dir, label.dir()) && constraint_matches(toolchain.as_ref(), label.toolchain())
            }
        }
    }
}

fn toolchain_matches(a: Option<&Label>, b: Option<&Label>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// An absent toolchain constraint on the *pattern* matches any label
/// toolchain (the constraint just wasn't specified); an absent toolchain on
/// the label only matches an absent constraint.
fn constraint_matches(constraint: Option<&Label>, label_toolchain: Option<&Label>) -> bool {
    match constraint {
        None => true,
        Some(c) => label_toolchain == Some(c),
    }
}

fn is_under(prefix: &SourceDir, dir: &SourceDir) -> bool {
    dir.as_str().starts_with(prefix.as_str())
}

fn split_toolchain_suffix(input: &str) -> (&str, Option<&str>) {
    if input.ends_with(')') {
        if let Some(idx) = input.rfind('(') {
            return (&input[..idx], Some(&input[idx + 1..input.len() - 1]));
        }
    }
    (input, None)
}

/// True iff at least one pattern admits `label` — the contract
/// `label_matches` and `filter_labels` both build on.
pub fn label_matches(label: &Label, patterns: &[LabelPattern]) -> bool {
    patterns.iter().any(|p| p.matches(label))
}

pub fn filter_labels<'a>(labels: &'a [Label], patterns: &[LabelPattern]) -> Vec<&'a Label> {
    labels.iter().filter(|l| label_matches(l, patterns)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(s: &str) -> SourceDir {
        SourceDir::new(s)
    }

    fn patterns(current_dir: &SourceDir, inputs: &[&str]) -> Vec<LabelPattern> {
        inputs
            .iter()
            .map(|i| LabelPattern::parse(current_dir, None, i).unwrap())
            .collect()
    }

    #[test]
    fn star_name_matches_any_name_in_exact_dir() {
        let root = dir("//");
        let pats = patterns(&root, &["//foo/*", "//baz:*"]);
        let baz_bar = Label::parse(&root, None, "//baz:bar").unwrap();
        assert!(label_matches(&baz_bar, &pats));

        let baz_foo_bar = Label::parse(&root, None, "//baz/foo:bar").unwrap();
        assert!(!label_matches(&baz_foo_bar, &pats));
    }

    #[test]
    fn star_dir_matches_recursively() {
        let root = dir("//");
        let pats = patterns(&root, &["//foo/*"]);
        let nested = Label::parse(&root, None, "//foo/bar:baz").unwrap();
        assert!(label_matches(&nested, &pats));
        let exact = Label::parse(&root, None, "//foo:foo").unwrap();
        assert!(label_matches(&exact, &pats));
        let sibling = Label::parse(&root, None, "//foobar:baz").unwrap();
        assert!(!label_matches(&sibling, &pats));
    }

    #[test]
    fn exact_pattern_matches_only_that_label() {
        let root = dir("//");
        let pats = patterns(&root, &["//foo:bar"]);
        assert!(label_matches(&Label::parse(&root, None, "//foo:bar").unwrap(), &pats));
        assert!(!label_matches(&Label::parse(&root, None, "//foo:baz").unwrap(), &pats));
    }
}
