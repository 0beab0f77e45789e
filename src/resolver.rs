use thiserror::Error;
use tracing::warn;
use crate::entry::{ImportMapEntry, ModuleType};
use crate::error::EntryError;
use crate::specifier::PackageRequest;
use crate::util::is_valid_version_req;

/// What the user asked for when requiring one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireOptions {
    pub request: PackageRequest,
    /// Local file to use instead of a registry package.
    pub path: Option<String>,
    pub entrypoint: bool,
    pub kind: ModuleType,
}

impl RequireOptions {
    pub fn new(request: PackageRequest) -> RequireOptions {
        RequireOptions {
            request,
            path: None,
            entrypoint: false,
            kind: ModuleType::Js,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No version given for \"{package}\" and no registry is configured. Use \"{package}@<version>\" or --path.")]
    MissingVersion { package: String },

    #[error(transparent)]
    Entry(#[from] EntryError),
}

/// Turns require requests into manifest entries.
///
/// A single request may produce several entries (a package and the
/// sub-dependencies it pulls in); callers add all of them.
pub trait PackageResolver {
    fn resolve(&self, requests: &[RequireOptions]) -> Result<Vec<ImportMapEntry>, ResolveError>;
}

/// Resolves only what can be decided without a registry: local paths and
/// explicitly pinned versions.
#[derive(Debug, Default, Clone, Copy)]
pub struct PinnedResolver;

impl PackageResolver for PinnedResolver {
    fn resolve(&self, requests: &[RequireOptions]) -> Result<Vec<ImportMapEntry>, ResolveError> {
        let mut entries = Vec::with_capacity(requests.len());
        for options in requests {
            let request = &options.request;
            let version = match (&options.path, &request.version) {
                (Some(_), _) => None,
                (None, Some(version)) => {
                    if !is_valid_version_req(version) {
                        warn!(package = %request.package, version = %version, "version is not a semver requirement, keeping it as-is");
                    }
                    Some(version.clone())
                }
                (None, None) => {
                    return Err(ResolveError::MissingVersion {
                        package: request.package.clone(),
                    });
                }
            };
            entries.push(ImportMapEntry::new(
                request.import_name(),
                options.path.clone(),
                version,
                options.kind,
                options.entrypoint,
            )?);
        }
        Ok(entries)
    }
}
