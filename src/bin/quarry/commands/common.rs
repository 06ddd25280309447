//! Shared bits every verb that runs a generation needs: the `--out-dir`/
//! `--args`/`--jobs` arguments and the default worker count.

use quarry_platform::SourceDir;

pub fn build_dir(out_dir: &str) -> SourceDir {
    SourceDir::new(&format!("//{}/", out_dir.trim_start_matches('/').trim_end_matches('/')))
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
