//! `quarry format` — explicitly out of scope. spec.md's Open Questions name
//! the formatter directly: "a pretty-printer exists over the AST; it is a
//! pure writer and deliberately out of scope." The verb is kept as a stub so
//! the CLI's surface matches every verb spec.md names, but invoking it is an
//! error rather than a silent no-op or a half-built pretty-printer.

use std::path::Path;

use crate::util::errors::QuarryResult;

pub fn format(_file: &Path) -> QuarryResult<()> {
    anyhow::bail!(
        "`quarry format` is not implemented: the formatter is a pure writer over the AST, out of scope for the core"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_is_an_explicit_stub() {
        assert!(format(Path::new("BUILD.quarry")).is_err());
    }
}
