use fnv::FnvHasher;
use std::hash::Hasher;
use url::Url;

const MAX_FILENAME_CHARS: usize = 100;

/// Builds a page URL from a site host and a link taken from a page.
/// Absolute links are returned unchanged and protocol-relative links take
/// the host's scheme.
pub fn join_host(host: &str, href: &str) -> String {
    if Url::parse(href).is_ok() {
        return href.to_string();
    }
    if href.starts_with("//") {
        if let Some(joined) = Url::parse(host).ok().and_then(|base| base.join(href).ok()) {
            return joined.to_string();
        }
    }
    format!("{}{}", host, href)
}

/// Converts a URL to a filename that is stable across runs.
///
/// Long names are cut and suffixed with a hash of the full URL so two URLs
/// sharing a long prefix still map to different files.
pub fn sanitize_filename(url: &str) -> String {
    let name = url.replace("http://", "").replace("https://", "");
    let name = name.replace(
        ['/', ':', '?', '&', '=', '#', '%', '\\', '*', '"', '<', '>', '|'],
        "_",
    );

    if name.chars().count() <= MAX_FILENAME_CHARS {
        return name;
    }

    let mut hasher = FnvHasher::default();
    hasher.write(url.as_bytes());
    let prefix: String = name.chars().take(MAX_FILENAME_CHARS).collect();
    format!("{}_{:016x}", prefix, hasher.finish())
}
