use serde::{Serialize, Serializer};

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::ptr;
use std::sync::Mutex;

pub fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

lazy_static::lazy_static! {
    static ref STRING_CACHE: Mutex<HashSet<&'static str>> = Mutex::new(HashSet::new());
}

/// A globally interned string. Two `Atom`s compare and hash by the address of
/// their backing allocation, not by content, so equality is a single pointer
/// comparison once interned.
///
/// Unlike a content-addressed interner (the kind you'd want for anything
/// written to disk and compared across runs), `Atom`s are only ever compared
/// within a single generation, so hashing by address is both cheaper and
/// correct here.
#[derive(Clone, Copy)]
pub struct Atom {
    inner: &'static str,
}

impl Atom {
    pub fn new(s: &str) -> Atom {
        let mut cache = STRING_CACHE.lock().unwrap();
        let s = cache.get(s).copied().unwrap_or_else(|| {
            let s = leak(s.to_string());
            cache.insert(s);
            s
        });
        Atom { inner: s }
    }

    pub fn as_str(&self) -> &'static str {
        self.inner
    }

    fn addr(&self) -> usize {
        self.inner.as_ptr() as usize
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Atom) -> bool {
        ptr::eq(self.inner, other.inner)
    }
}

impl Eq for Atom {}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Atom) -> Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Atom) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Deref for Atom {
    type Target = str;

    fn deref(&self) -> &str {
        self.inner
    }
}

impl Borrow<str> for Atom {
    fn borrow(&self) -> &str {
        self.inner
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Atom {
        Atom::new(s)
    }
}

impl From<String> for Atom {
    fn from(s: String) -> Atom {
        Atom::new(&s)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.inner, f)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.inner, f)
    }
}

impl Serialize for Atom {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotent_across_calls() {
        let a = Atom::new("//chrome/renderer");
        let b = Atom::new("//chrome/renderer");
        assert_eq!(a, b);
        assert!(ptr::eq(a.as_str(), b.as_str()));
    }

    #[test]
    fn distinct_strings_are_distinct_atoms() {
        assert_ne!(Atom::new("foo"), Atom::new("bar"));
    }

    #[test]
    fn idempotent_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| Atom::new("//shared/thread/atom")))
            .collect();
        let atoms: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for pair in atoms.windows(2) {
            assert_eq!(pair[0], pair[1]);
        }
    }
}
