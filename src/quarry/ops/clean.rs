//! `quarry clean` — removes the build output directory. Every other verb is
//! a pure function of the source tree plus args (§6 "persisted state: none
//! across runs"); `clean` is the one verb that mutates the filesystem
//! without running the loader at all.

use std::path::Path;

use crate::util::errors::QuarryResult;

pub fn clean(build_dir: &Path) -> QuarryResult<()> {
    if build_dir.exists() {
        std::fs::remove_dir_all(build_dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_an_existing_build_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let build_dir = tmp.path().join("out");
        std::fs::create_dir_all(build_dir.join("gen")).unwrap();
        clean(&build_dir).unwrap();
        assert!(!build_dir.exists());
    }

    #[test]
    fn is_a_no_op_when_the_build_dir_does_not_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let build_dir = tmp.path().join("out");
        clean(&build_dir).unwrap();
    }
}
