//! Turn `src` attributes into fetchable absolute URLs.

use url::Url;

/// Resolve `reference` against `base_url`.
///
/// - `//host/path` becomes `https://host/path`
/// - `/path` is joined with the base's scheme and host
/// - a reference without a scheme is joined relative to the base
/// - an absolute URL with a host is returned unchanged
///
/// Never fails: malformed input yields a best-effort joined string and the
/// eventual download surfaces the real error.
///
/// ```
/// use pagegrab_web::resolve;
///
/// assert_eq!(resolve("//cdn.example.com/a.png", "https://site.com"), "https://cdn.example.com/a.png");
/// assert_eq!(resolve("/img/b.png", "https://site.com/x/y"), "https://site.com/img/b.png");
/// assert_eq!(resolve("c.png", "https://site.com/x/y"), "https://site.com/x/c.png");
/// ```
pub fn resolve(reference: &str, base_url: &str) -> String {
    let reference = reference.trim();

    if reference.starts_with("//") {
        return format!("https:{reference}");
    }
    let relative = match Url::parse(reference) {
        Ok(u) if u.has_host() => return reference.to_string(),
        // `localhost:8080/a.png`, `data:...`: a scheme-like prefix but no host,
        // so it is treated as a path relative to the page.
        Ok(_) => format!("./{reference}"),
        Err(_) => reference.to_string(),
    };

    match parse_base(base_url) {
        Some(base) => match base.join(&relative) {
            Ok(joined) if joined.has_host() => joined.to_string(),
            _ => naive_join(base.as_str(), &relative),
        },
        None => naive_join(&with_default_scheme(base_url), &relative),
    }
}

/// Parse the base, assuming `https://` when the scheme is missing.
fn parse_base(base_url: &str) -> Option<Url> {
    let base = base_url.trim();
    Url::parse(base)
        .ok()
        .filter(|u| u.has_host())
        .or_else(|| Url::parse(&with_default_scheme(base)).ok())
        .filter(|u| u.has_host())
}

fn with_default_scheme(base_url: &str) -> String {
    let base = base_url.trim();
    if base.contains("://") {
        base.to_string()
    } else {
        format!("https://{}", base.trim_start_matches('/'))
    }
}

fn naive_join(base: &str, reference: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        reference.trim_start_matches('/')
    )
}
