use std::path::PathBuf;
use anyhow::Result;
use semver::VersionReq;
use crate::manifest::MANIFEST_FILE_NAME;

/// Returns the path to the `importmap.toml` file in the current working directory.
pub fn get_manifest_path() -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(MANIFEST_FILE_NAME))
}

/// Checks whether a version string is a semver requirement (`1.2.3`, `^4.15`, `~2`, `*`).
/// Registry dist-tags such as `latest` or `next` are not.
pub fn is_valid_version_req(version: &str) -> bool {
    VersionReq::parse(version).is_ok()
}
