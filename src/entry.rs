use std::fmt;
use std::str::FromStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use crate::error::EntryError;

/// The kind of module an import map entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    #[default]
    Js,
    Css,
}

impl ModuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Js => "js",
            ModuleType::Css => "css",
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "js" => Ok(ModuleType::Js),
            "css" => Ok(ModuleType::Css),
            other => Err(other.to_string()),
        }
    }
}

/// Where an entry is resolved from. Exactly one of the two, always.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySource {
    /// A local file, either `./relative` to the manifest root or a logical asset path.
    Path(String),
    /// A version (or version requirement) resolved through a package registry.
    Version(String),
}

/// One record of the import map manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMapEntry {
    import_name: String,
    source: EntrySource,
    kind: ModuleType,
    is_entrypoint: bool,
}

impl ImportMapEntry {
    /// Builds an entry from untyped options, enforcing the entry rules.
    ///
    /// # Errors
    /// - neither `path` nor `version` given
    /// - both `path` and `version` given
    /// - `is_entrypoint` set on a non-JS module
    pub fn new(
        import_name: &str,
        path: Option<String>,
        version: Option<String>,
        kind: ModuleType,
        is_entrypoint: bool,
    ) -> Result<ImportMapEntry, EntryError> {
        check_entrypoint(import_name, kind, is_entrypoint)?;
        let source = match (path, version) {
            (Some(path), None) => EntrySource::Path(path),
            (None, Some(version)) => EntrySource::Version(version),
            (None, None) => {
                return Err(EntryError::MissingPathOrVersion {
                    import_name: import_name.to_string(),
                });
            }
            (Some(_), Some(_)) => {
                return Err(EntryError::BothPathAndVersion {
                    import_name: import_name.to_string(),
                });
            }
        };
        Self::from_source(import_name, source, kind, is_entrypoint)
    }

    /// Builds an entry from an already-decided source.
    ///
    /// # Errors
    /// Returns an error if `is_entrypoint` is set on a non-JS module.
    pub fn from_source(
        import_name: &str,
        source: EntrySource,
        kind: ModuleType,
        is_entrypoint: bool,
    ) -> Result<ImportMapEntry, EntryError> {
        check_entrypoint(import_name, kind, is_entrypoint)?;
        Ok(ImportMapEntry {
            import_name: import_name.to_string(),
            source,
            kind,
            is_entrypoint,
        })
    }

    /// A JS module living in a local file.
    pub fn local(import_name: &str, path: &str, is_entrypoint: bool) -> ImportMapEntry {
        ImportMapEntry {
            import_name: import_name.to_string(),
            source: EntrySource::Path(path.to_string()),
            kind: ModuleType::Js,
            is_entrypoint,
        }
    }

    /// A remote package pinned to `version`.
    pub fn remote(import_name: &str, version: &str, kind: ModuleType) -> ImportMapEntry {
        ImportMapEntry {
            import_name: import_name.to_string(),
            source: EntrySource::Version(version.to_string()),
            kind,
            is_entrypoint: false,
        }
    }

    pub fn import_name(&self) -> &str {
        &self.import_name
    }

    pub fn source(&self) -> &EntrySource {
        &self.source
    }

    pub fn path(&self) -> Option<&str> {
        match &self.source {
            EntrySource::Path(path) => Some(path),
            EntrySource::Version(_) => None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match &self.source {
            EntrySource::Version(version) => Some(version),
            EntrySource::Path(_) => None,
        }
    }

    pub fn kind(&self) -> ModuleType {
        self.kind
    }

    pub fn is_entrypoint(&self) -> bool {
        self.is_entrypoint
    }

    pub fn is_remote_package(&self) -> bool {
        matches!(self.source, EntrySource::Version(_))
    }

    /// The registry package behind a remote entry, e.g. `chart.js` for `chart.js/auto`
    /// or `@hotwired/stimulus` for `@hotwired/stimulus/dist/x.js`.
    ///
    /// Returns `None` for local entries.
    pub fn package_name(&self) -> Option<&str> {
        if !self.is_remote_package() {
            return None;
        }
        Some(split_package_name(&self.import_name).0)
    }

    /// The path inside the package, including its leading `/`. Empty when the
    /// entry imports the package root. `None` for local entries.
    pub fn package_subpath(&self) -> Option<&str> {
        if !self.is_remote_package() {
            return None;
        }
        Some(split_package_name(&self.import_name).1)
    }
}

fn check_entrypoint(import_name: &str, kind: ModuleType, is_entrypoint: bool) -> Result<(), EntryError> {
    if is_entrypoint && kind != ModuleType::Js {
        return Err(EntryError::EntrypointNotJs {
            import_name: import_name.to_string(),
            kind: kind.to_string(),
        });
    }
    Ok(())
}

/// Splits `[@scope/]name[/subpath]` into the package name and the `/subpath` part.
pub(crate) fn split_package_name(specifier: &str) -> (&str, &str) {
    let skip = if specifier.starts_with('@') {
        match specifier.find('/') {
            Some(slash) => slash + 1,
            None => return (specifier, ""),
        }
    } else {
        0
    };
    match specifier[skip..].find('/') {
        Some(slash) => specifier.split_at(skip + slash),
        None => (specifier, ""),
    }
}

/// The ordered set of entries making up an import map.
///
/// Order follows insertion and survives a save/load round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMapEntries {
    entries: IndexMap<String, ImportMapEntry>,
}

impl ImportMapEntries {
    pub fn new() -> ImportMapEntries {
        ImportMapEntries::default()
    }

    /// Adds an entry. An existing entry with the same import name is replaced
    /// and keeps its position.
    pub fn add(&mut self, entry: ImportMapEntry) {
        self.entries.insert(entry.import_name.clone(), entry);
    }

    pub fn has(&self, import_name: &str) -> bool {
        self.entries.contains_key(import_name)
    }

    pub fn get(&self, import_name: &str) -> Option<&ImportMapEntry> {
        self.entries.get(import_name)
    }

    /// Removes an entry, keeping the order of the remaining ones.
    pub fn remove(&mut self, import_name: &str) -> Option<ImportMapEntry> {
        self.entries.shift_remove(import_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImportMapEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<ImportMapEntry> for ImportMapEntries {
    fn from_iter<I: IntoIterator<Item = ImportMapEntry>>(iter: I) -> Self {
        let mut entries = ImportMapEntries::new();
        for entry in iter {
            entries.add(entry);
        }
        entries
    }
}

impl IntoIterator for ImportMapEntries {
    type Item = ImportMapEntry;
    type IntoIter = indexmap::map::IntoValues<String, ImportMapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<'a> IntoIterator for &'a ImportMapEntries {
    type Item = &'a ImportMapEntry;
    type IntoIter = indexmap::map::Values<'a, String, ImportMapEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
