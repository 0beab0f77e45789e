use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use crate::entry::{ImportMapEntries, ImportMapEntry, ModuleType};
use crate::error::{ManifestError, Result};
use crate::legacy::extract_version_from_url;

/// Default file name of the manifest, looked up in the working directory.
pub const MANIFEST_FILE_NAME: &str = "importmap.toml";

/// Option keys an entry may carry. `url` is only read, never written.
pub const ALLOWED_OPTIONS: [&str; 5] = ["path", "version", "type", "entrypoint", "url"];

/// Written above the entries every time the manifest is saved.
pub const MANIFEST_HEADER: &str = "\
# This file links \"import names\" to their packages or local files.
#
# Each table is one entry of the import map:
#  - \"path\"       a local file (\"./\" is relative to this file)
#  - \"version\"    a package version resolved through the registry
#  - \"type\"       \"js\" (default) or \"css\"
#  - \"entrypoint\" true if the module is loaded directly by a page
#
# The file is regenerated by `impmap require` and `impmap remove`; edits
# are kept but comments and formatting are not.
";

/// One entry as found in the file, before any rule is checked.
///
/// Values are kept untyped so a wrongly typed option can be reported
/// against its import name.
#[derive(Debug, Deserialize)]
struct RawEntry {
    path: Option<toml::Value>,
    version: Option<toml::Value>,
    #[serde(rename = "type")]
    kind: Option<toml::Value>,
    entrypoint: Option<toml::Value>,
    url: Option<toml::Value>,
    #[serde(flatten)]
    unknown: IndexMap<String, toml::Value>,
}

impl RawEntry {
    fn into_entry(self, import_name: &str) -> Result<ImportMapEntry> {
        if !self.unknown.is_empty() {
            return Err(ManifestError::UnknownOptions {
                import_name: import_name.to_string(),
                keys: self.unknown.into_keys().collect(),
                allowed: ALLOWED_OPTIONS.iter().map(|key| key.to_string()).collect(),
            });
        }
        let url = string_option(import_name, "url", self.url)?;
        if url.is_some() {
            warn!(import_name, "The \"url\" option is deprecated, use \"version\" instead.");
        }
        let kind = match self.kind {
            Some(toml::Value::String(value)) => value.parse::<ModuleType>().map_err(|value| {
                ManifestError::InvalidModuleType {
                    import_name: import_name.to_string(),
                    value,
                }
            })?,
            Some(other) => {
                return Err(ManifestError::InvalidModuleType {
                    import_name: import_name.to_string(),
                    value: other.to_string(),
                });
            }
            None => ModuleType::default(),
        };
        let entrypoint = match self.entrypoint {
            Some(toml::Value::Boolean(entrypoint)) => entrypoint,
            Some(_) => return Err(invalid_option(import_name, "entrypoint", "a boolean")),
            None => false,
        };
        let path = string_option(import_name, "path", self.path)?;
        let version = match string_option(import_name, "version", self.version)? {
            Some(version) => Some(version),
            None => url.as_deref().and_then(extract_version_from_url).map(str::to_string),
        };
        Ok(ImportMapEntry::new(import_name, path, version, kind, entrypoint)?)
    }
}

fn string_option(import_name: &str, key: &str, value: Option<toml::Value>) -> Result<Option<String>> {
    match value {
        Some(toml::Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(invalid_option(import_name, key, "a string")),
        None => Ok(None),
    }
}

fn invalid_option(import_name: &str, key: &str, expected: &str) -> ManifestError {
    ManifestError::InvalidOptionValue {
        import_name: import_name.to_string(),
        key: key.to_string(),
        expected: expected.to_string(),
    }
}

/// One entry as written to the file. Defaults are left out.
#[derive(Debug, Serialize)]
struct ManifestRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<ModuleType>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    entrypoint: bool,
}

impl<'a> From<&'a ImportMapEntry> for ManifestRecord<'a> {
    fn from(entry: &'a ImportMapEntry) -> Self {
        ManifestRecord {
            path: entry.path(),
            version: entry.version(),
            kind: (entry.kind() != ModuleType::default()).then_some(entry.kind()),
            entrypoint: entry.is_entrypoint(),
        }
    }
}

/// Parses manifest text into entries, checking every rule.
///
/// `path` is only used in error messages.
///
/// # Errors
/// Fails on the first invalid entry; no partial result is returned.
pub fn parse_manifest(content: &str, path: &Path) -> Result<ImportMapEntries> {
    let raw: IndexMap<String, RawEntry> = toml::from_str(content)
        .map_err(|source| ManifestError::Parse { path: path.to_path_buf(), source })?;
    let mut entries = ImportMapEntries::new();
    for (import_name, raw_entry) in raw {
        entries.add(raw_entry.into_entry(&import_name)?);
    }
    Ok(entries)
}

/// Renders entries in canonical form, header included.
pub fn render_manifest(entries: &ImportMapEntries) -> Result<String> {
    let records: IndexMap<&str, ManifestRecord> = entries
        .iter()
        .map(|entry| (entry.import_name(), ManifestRecord::from(entry)))
        .collect();
    let body = toml::to_string_pretty(&records)?;
    if body.is_empty() {
        return Ok(MANIFEST_HEADER.to_string());
    }
    Ok(format!("{MANIFEST_HEADER}\n{body}"))
}

/// Owns one manifest file and the entries loaded from it.
///
/// The first successful [`load`](Self::load) is kept in memory; later calls
/// return it without touching the disk. [`save`](Self::save) replaces both
/// the file and the kept entries.
#[derive(Debug)]
pub struct ImportMapManifest {
    path: PathBuf,
    cache: Option<ImportMapEntries>,
}

impl ImportMapManifest {
    pub fn new<P: AsRef<Path>>(path: P) -> ImportMapManifest {
        ImportMapManifest {
            path: path.as_ref().to_path_buf(),
            cache: None,
        }
    }

    /// Returns the path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory holding the manifest. Relative `./` paths of local
    /// entries are resolved against it.
    pub fn root_directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Loads the manifest, or returns the entries kept from a previous
    /// load or save. A missing file is an empty manifest.
    ///
    /// # Errors
    /// Returns an error if the file can't be read, isn't valid TOML, or
    /// any entry breaks a rule.
    pub fn load(&mut self) -> Result<&ImportMapEntries> {
        let entries = match self.cache.take() {
            Some(entries) => entries,
            None => self.read()?,
        };
        Ok(&*self.cache.insert(entries))
    }

    /// Drops the kept entries so the next load reads the file again.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// Overwrites the manifest with `entries`.
    ///
    /// The content is written to a temporary file next to the manifest and
    /// then moved over it, so a failed save leaves the previous file intact.
    ///
    /// # Errors
    /// Returns an error if serialization or any file operation fails.
    pub fn save(&mut self, entries: ImportMapEntries) -> Result<()> {
        let content = render_manifest(&entries)?;
        let root = self.root_directory();
        let mut temp = NamedTempFile::new_in(&root).map_err(|e| ManifestError::io(&root, e))?;
        if let Some(permissions) = self.target_permissions() {
            temp.as_file().set_permissions(permissions)
                .map_err(|e| ManifestError::io(temp.path(), e))?;
        }
        temp.write_all(content.as_bytes())
            .map_err(|e| ManifestError::io(temp.path(), e))?;
        temp.as_file().sync_all()
            .map_err(|e| ManifestError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| ManifestError::io(&self.path, e.error))?;
        debug!(path = %self.path.display(), entries = entries.len(), "saved importmap manifest");
        self.cache = Some(entries);
        Ok(())
    }

    /// Turns the `path` of a local entry into a filesystem path.
    ///
    /// Paths starting with `.` are relative to [`root_directory`](Self::root_directory);
    /// anything else is a logical asset path and is returned as-is.
    pub fn to_filesystem_path(&self, path: &str) -> PathBuf {
        if !path.starts_with('.') {
            return PathBuf::from(path);
        }
        let relative = path.strip_prefix("./").unwrap_or(path);
        self.root_directory().join(relative)
    }

    /// Inverse of [`to_filesystem_path`](Self::to_filesystem_path): a file
    /// under the root directory becomes `./relative/path`.
    ///
    /// Returns `None` when the file is outside the root.
    pub fn to_manifest_path(&self, filesystem_path: &Path) -> Option<String> {
        let relative = filesystem_path.strip_prefix(self.root_directory()).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect();
        Some(format!("./{}", parts.join("/")))
    }

    /// Permissions the saved file should end up with: those of the file being
    /// replaced, or the usual `0644` for a new one. Temporary files are
    /// created owner-only, which would otherwise carry over on rename.
    fn target_permissions(&self) -> Option<Permissions> {
        if let Ok(metadata) = std::fs::metadata(&self.path) {
            return Some(metadata.permissions());
        }
        default_permissions()
    }

    fn read(&self) -> Result<ImportMapEntries> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no importmap manifest, starting empty");
            return Ok(ImportMapEntries::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ManifestError::io(&self.path, e))?;
        let entries = parse_manifest(&content, &self.path)?;
        debug!(path = %self.path.display(), entries = entries.len(), "loaded importmap manifest");
        Ok(entries)
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use crate::error::EntryError;
    use tempfile::tempdir;

    fn parse(content: &str) -> Result<ImportMapEntries> {
        parse_manifest(content, Path::new("importmap.toml"))
    }

    #[test]
    fn test_parse_applies_defaults() {
        let entries = parse("[app]\npath = \"./app.js\"\n").unwrap();
        let app = entries.get("app").unwrap();
        assert_eq!(app.path(), Some("./app.js"));
        assert_eq!(app.kind(), ModuleType::Js);
        assert!(!app.is_entrypoint());
    }

    #[test]
    fn test_parse_keeps_file_order() {
        let content = "[zebra]\nversion = \"1.0.0\"\n\n[alpha]\nversion = \"2.0.0\"\n\n[mid]\npath = \"./mid.js\"\n";
        let entries = parse(content).unwrap();
        assert_eq!(entries.names().collect::<Vec<_>>(), vec!["zebra", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let content = "[app]\npath = \"./app.js\"\npreload = true\ndownloaded_to = \"x\"\n";
        match parse(content).unwrap_err() {
            ManifestError::UnknownOptions { import_name, keys, .. } => {
                assert_eq!(import_name, "app");
                assert_eq!(keys, vec!["preload", "downloaded_to"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_invalid_type() {
        let content = "[app]\npath = \"./app.js\"\ntype = \"json\"\n";
        match parse(content).unwrap_err() {
            ManifestError::InvalidModuleType { import_name, value } => {
                assert_eq!(import_name, "app");
                assert_eq!(value, "json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_rejects_css_entrypoint() {
        let content = "[styles]\npath = \"./app.css\"\ntype = \"css\"\nentrypoint = true\n";
        assert!(matches!(
            parse(content).unwrap_err(),
            ManifestError::Entry(EntryError::EntrypointNotJs { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_missing_and_double_source() {
        assert!(matches!(
            parse("[app]\ntype = \"js\"\n").unwrap_err(),
            ManifestError::Entry(EntryError::MissingPathOrVersion { .. })
        ));
        assert!(matches!(
            parse("[app]\npath = \"./app.js\"\nversion = \"1.0.0\"\n").unwrap_err(),
            ManifestError::Entry(EntryError::BothPathAndVersion { .. })
        ));
    }

    #[test]
    fn test_parse_legacy_url() {
        let content = "[bootstrap]\nurl = \"https://ga.jspm.io/npm:bootstrap@5.3.2/dist/js/bootstrap.esm.js\"\n";
        let entries = parse(content).unwrap();
        assert_eq!(entries.get("bootstrap").unwrap().version(), Some("5.3.2"));
    }

    #[test]
    fn test_parse_version_wins_over_legacy_url() {
        let content = "[bootstrap]\nversion = \"5.3.3\"\nurl = \"https://ga.jspm.io/npm:bootstrap@5.3.2/dist/js/bootstrap.esm.js\"\n";
        let entries = parse(content).unwrap();
        assert_eq!(entries.get("bootstrap").unwrap().version(), Some("5.3.3"));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_parse_warns_once_per_legacy_url() {
        let content = r#"
[bootstrap]
url = "https://ga.jspm.io/npm:bootstrap@5.3.2/dist/js/bootstrap.esm.js"

[lodash]
version = "4.17.21"

["@popperjs/core"]
url = "https://ga.jspm.io/npm:@popperjs/core@2.11.8/dist/esm/index.js"
"#;
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let entries = tracing::subscriber::with_default(subscriber, || parse(content).unwrap());
        assert_eq!(entries.len(), 3);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let warnings: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("The \"url\" option is deprecated"))
            .collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("bootstrap"));
        assert!(warnings[1].contains("@popperjs/core"));
        assert!(!output.contains("lodash"));
    }

    #[test]
    fn test_parse_wrongly_typed_options_name_the_import() {
        match parse("[app]\npath = \"./app.js\"\ntype = 1\n").unwrap_err() {
            ManifestError::InvalidModuleType { import_name, value } => {
                assert_eq!(import_name, "app");
                assert_eq!(value, "1");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = parse("[app]\npath = \"./app.js\"\nentrypoint = \"yes\"\n").unwrap_err();
        assert_eq!(err.to_string(), "The \"entrypoint\" option of the importmap entry \"app\" must be a boolean.");

        let err = parse("[lodash]\nversion = 4\n").unwrap_err();
        assert_eq!(err.to_string(), "The \"version\" option of the importmap entry \"lodash\" must be a string.");
    }

    #[test]
    fn test_parse_unusable_legacy_url() {
        let content = "[lodash]\nurl = \"https://cdn.example.com/lodash.js\"\n";
        assert!(matches!(
            parse(content).unwrap_err(),
            ManifestError::Entry(EntryError::MissingPathOrVersion { .. })
        ));
    }

    #[test]
    fn test_render_omits_defaults() {
        let mut entries = ImportMapEntries::new();
        entries.add(ImportMapEntry::remote("lodash", "4.17.21", ModuleType::Js));
        let content = render_manifest(&entries).unwrap();
        assert!(content.starts_with(MANIFEST_HEADER));
        let body = &content[MANIFEST_HEADER.len()..];
        assert!(body.contains("version = \"4.17.21\""));
        assert!(!body.contains("type"));
        assert!(!body.contains("entrypoint"));
        assert!(!body.contains("path"));
    }

    #[test]
    fn test_render_writes_non_defaults() {
        let mut entries = ImportMapEntries::new();
        entries.add(ImportMapEntry::local("app", "./app.js", true));
        entries.add(ImportMapEntry::remote("bootstrap/dist/css/bootstrap.min.css", "5.3.2", ModuleType::Css));
        let content = render_manifest(&entries).unwrap();
        assert!(content.contains("entrypoint = true"));
        assert!(content.contains("type = \"css\""));
        assert!(content.find("[app]").unwrap() < content.find("bootstrap.min.css").unwrap());
    }

    #[test]
    fn test_render_drops_legacy_url() {
        let content = "[bootstrap]\nurl = \"https://ga.jspm.io/npm:bootstrap@5.3.2/dist/js/bootstrap.esm.js\"\n";
        let rendered = render_manifest(&parse(content).unwrap()).unwrap();
        assert!(!rendered.contains("url"));
        assert!(rendered.contains("version = \"5.3.2\""));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let mut manifest = ImportMapManifest::new(dir.path().join(MANIFEST_FILE_NAME));
        assert!(manifest.load().unwrap().is_empty());
        assert!(!manifest.path().exists());
    }

    #[test]
    fn test_load_is_cached_until_invalidated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "[app]\npath = \"./app.js\"\n").unwrap();
        let mut manifest = ImportMapManifest::new(&path);
        assert_eq!(manifest.load().unwrap().len(), 1);

        std::fs::write(&path, "").unwrap();
        assert_eq!(manifest.load().unwrap().len(), 1);

        manifest.invalidate();
        assert!(manifest.load().unwrap().is_empty());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "[app]\n").unwrap();
        let mut manifest = ImportMapManifest::new(&path);
        assert!(manifest.load().is_err());

        std::fs::write(&path, "[app]\nversion = \"1.0.0\"\n").unwrap();
        assert_eq!(manifest.load().unwrap().len(), 1);
    }

    #[test]
    fn test_save_replaces_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        let mut manifest = ImportMapManifest::new(&path);
        let mut entries = manifest.load().unwrap().clone();
        entries.add(ImportMapEntry::local("app", "./app.js", true));
        manifest.save(entries.clone()).unwrap();

        // Corrupting the file must not affect the kept entries.
        std::fs::write(&path, "not toml at all [").unwrap();
        assert_eq!(manifest.load().unwrap(), &entries);
    }

    #[cfg(unix)]
    fn mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn test_save_keeps_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        std::fs::write(&path, "[app]\npath = \"./app.js\"\n").unwrap();

        for expected in [0o644, 0o640] {
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(expected)).unwrap();
            let mut manifest = ImportMapManifest::new(&path);
            let entries = manifest.load().unwrap().clone();
            manifest.save(entries).unwrap();
            assert_eq!(mode(&path), expected);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_save_new_file_is_world_readable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE_NAME);
        let mut manifest = ImportMapManifest::new(&path);
        manifest.save(ImportMapEntries::new()).unwrap();
        assert_eq!(mode(&path), 0o644);
    }

    #[test]
    fn test_root_directory() {
        let manifest = ImportMapManifest::new("/srv/app/importmap.toml");
        assert_eq!(manifest.root_directory(), PathBuf::from("/srv/app"));
        let manifest = ImportMapManifest::new("importmap.toml");
        assert_eq!(manifest.root_directory(), PathBuf::from("."));
    }

    #[test]
    fn test_filesystem_path_conversion() {
        let manifest = ImportMapManifest::new("/srv/app/importmap.toml");
        assert_eq!(manifest.to_filesystem_path("./assets/app.js"), PathBuf::from("/srv/app/assets/app.js"));
        assert_eq!(manifest.to_filesystem_path("app.js"), PathBuf::from("app.js"));
        assert_eq!(
            manifest.to_manifest_path(Path::new("/srv/app/assets/app.js")),
            Some("./assets/app.js".to_string())
        );
        assert_eq!(manifest.to_manifest_path(Path::new("/elsewhere/app.js")), None);
    }
}
