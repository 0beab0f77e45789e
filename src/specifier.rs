use std::sync::LazyLock;
use regex::Regex;
use crate::entry::split_package_name;

/// Accepted shapes, used in user-facing validation messages.
pub const SPECIFIER_FORMATS: &str = "\"name\", \"name@version\", \"@scope/name\", \"name/sub/path.js\" or any of those followed by \"=alias\"";

static SPECIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<package>(?:@[^/=@\s]+/)?[^/=@\s]+(?:/[^/=@\s]+)*)(?:@(?P<version>[^/=@\s]+))?(?:=(?P<alias>[^=\s]+))?$")
        .expect("package specifier pattern is valid")
});

/// A package reference typed by the user, e.g. `lodash@^4.15` or
/// `vue/dist/vue.esm-bundler.js=vue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    /// Package name including scope and sub-path, without version or alias.
    pub package: String,
    pub version: Option<String>,
    pub alias: Option<String>,
}

impl PackageRequest {
    /// Parses `[@scope/]name[/subpath][@version][=alias]`.
    ///
    /// Returns `None` when the input cannot be split into those parts
    /// (empty input, a dangling `@`, `=` or `/`, a scope without a name, whitespace).
    ///
    /// # Example
    ///
    /// ```
    /// use impmap::PackageRequest;
    ///
    /// let request = PackageRequest::parse("@hotwired/stimulus@3.2.2").unwrap();
    /// assert_eq!(request.package, "@hotwired/stimulus");
    /// assert_eq!(request.version.as_deref(), Some("3.2.2"));
    /// ```
    pub fn parse(input: &str) -> Option<PackageRequest> {
        let captures = SPECIFIER_RE.captures(input)?;
        Some(PackageRequest {
            package: captures.name("package")?.as_str().to_string(),
            version: captures.name("version").map(|m| m.as_str().to_string()),
            alias: captures.name("alias").map(|m| m.as_str().to_string()),
        })
    }

    /// The key this request is stored under: the alias if one was given,
    /// the package otherwise.
    pub fn import_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.package)
    }

    /// The registry package, without any sub-path.
    pub fn package_name(&self) -> &str {
        split_package_name(&self.package).0
    }

    /// The sub-path inside the package with its leading `/`, or `""`.
    pub fn package_subpath(&self) -> &str {
        split_package_name(&self.package).1
    }
}
