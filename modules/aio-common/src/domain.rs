//! Domain identity for "own domain" checks.
//!
//! Every ranking, AIO-citation and assistant-citation comparison goes through
//! [`normalize`] and [`matches`]; nothing else in the workspace compares hosts.

use url::Url;

/// Canonical hostname for a URL or bare host.
///
/// Missing scheme is treated as https, leading `www.` labels are dropped and
/// the host is lowercased. Unparseable input falls back to stripping the
/// scheme and `www.` by hand and keeping everything before the first `/`.
/// Never fails.
pub fn normalize(url_or_host: &str) -> String {
    let input = url_or_host.trim();
    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{input}")
    };

    let host = match Url::parse(&candidate) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_string(),
            None => fallback_host(input),
        },
        Err(_) => fallback_host(input),
    };

    strip_www(&host).to_string()
}

/// True iff the normalized host of `url` equals a normalized target or is a
/// subdomain of one. Containment only runs one way: `example.com` does not
/// match a `blog.example.com` target.
pub fn matches<S: AsRef<str>>(url: &str, targets: &[S]) -> bool {
    let domain = normalize(url);
    if domain.is_empty() {
        return false;
    }

    targets.iter().any(|target| {
        let target = normalize(target.as_ref());
        !target.is_empty()
            && (domain == target
                || (domain.len() > target.len()
                    && domain.ends_with(&target)
                    && domain.as_bytes()[domain.len() - target.len() - 1] == b'.'))
    })
}

fn fallback_host(input: &str) -> String {
    let lowered = input.to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let without_www = strip_www(without_scheme);
    match without_www.split('/').next() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => lowered.clone(),
    }
}

fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }
    host
}
