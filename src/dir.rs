use anyhow::Context as _;
use camino::{Utf8Path, Utf8PathBuf};

pub fn current_dir() -> anyhow::Result<Utf8PathBuf> {
    let current_dir = std::env::current_dir().context("cannot read current directory")?;
    Utf8PathBuf::from_path_buf(current_dir)
        .map_err(|p| anyhow::anyhow!("current directory {p:?} is not valid UTF-8"))
}

/// Resolve `path` against `base`. Absolute paths are returned unchanged.
pub fn resolve(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    base.join(path)
}

/// Whether `path` is `root` or lies below it, compared component by component.
pub fn is_within(path: &Utf8Path, root: &Utf8Path) -> bool {
    path.starts_with(root)
}
