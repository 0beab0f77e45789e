/// Recovers the version from an old-style CDN URL such as
/// `https://ga.jspm.io/npm:bootstrap@5.3.2/dist/js/bootstrap.esm.js`.
///
/// The version is whatever sits between the last `@` and the next `/`.
/// Only the jspm `npm:<package>@<version>/<file>` shape is supported; an `@`
/// elsewhere in the URL (query strings, credentials) will be misread.
pub fn extract_version_from_url(url: &str) -> Option<&str> {
    let at = url.rfind('@')?;
    let rest = &url[at + 1..];
    let slash = rest.find('/')?;
    Some(&rest[..slash])
}
