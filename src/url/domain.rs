use url::Url;

/// Returns the cache key for per-host state: scheme, host and port
///
/// Two URLs share robots.txt rules exactly when they share this key.
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Returns the robots.txt location for the origin of `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    let mut robots = url.clone();
    robots.set_path("/robots.txt");
    robots.set_query(None);
    robots.set_fragment(None);
    if robots.host_str().is_none() {
        return None;
    }
    Some(robots)
}
