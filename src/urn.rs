use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

pub const SEPARATOR: char = '/';

static DOT_SEGMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\.+/").expect("dot segment pattern is valid"));
static REPEATED_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/+").expect("separator pattern is valid"));
static DOUBLED_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/{2,}").expect("separator pattern is valid"));

/// Canonical path of a remote resource.
///
/// The path is kept percent-encoded, always starts with `/`, and directory
/// paths always end with `/`. A `Urn` is never mutated; renaming a resource
/// means building a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urn {
    quoted: String,
}

impl Urn {
    /// Canonicalizes `path` as a file-or-directory path (trailing `/` kept as given)
    pub fn new(path: &str) -> Self {
        Self::with_kind(path, false)
    }

    /// Canonicalizes `path` as a directory path, appending `/` if missing
    pub fn dir(path: &str) -> Self {
        Self::with_kind(path, true)
    }

    fn with_kind(path: &str, directory: bool) -> Self {
        let encoded = quote_path(path);
        let collapsed = DOT_SEGMENTS.replace_all(&encoded, "/");
        let mut quoted = REPEATED_SEPARATORS.replace_all(&collapsed, "/").into_owned();

        if !quoted.starts_with(SEPARATOR) {
            quoted.insert(0, SEPARATOR);
        }
        if directory && !quoted.ends_with(SEPARATOR) {
            quoted.push(SEPARATOR);
        }

        Self { quoted }
    }

    /// Decoded path
    pub fn path(&self) -> String {
        unquote(&self.quoted)
    }

    /// Percent-encoded path, suitable for building request URLs
    pub fn quote(&self) -> &str {
        &self.quoted
    }

    /// Last non-empty segment, decoded. Directories keep their trailing `/`.
    pub fn filename(&self) -> String {
        let segments: Vec<&str> = self.quoted.split(SEPARATOR).collect();
        let last = segments[segments.len() - 1];
        let name = if last.is_empty() && segments.len() >= 2 {
            format!("{}{}", segments[segments.len() - 2], SEPARATOR)
        } else {
            last.to_string()
        };
        unquote(&name)
    }

    /// Decoded path one nesting level up, always ending with `/`
    pub fn parent(&self) -> String {
        let segments: Vec<&str> = self.quoted.split(SEPARATOR).collect();
        let nesting_level = self.nesting_level();

        let mut parent = if nesting_level == 1 {
            SEPARATOR.to_string()
        } else {
            segments[..nesting_level.min(segments.len())].join("/")
        };
        if !parent.ends_with(SEPARATOR) {
            parent.push(SEPARATOR);
        }
        unquote(&parent)
    }

    /// Number of separators, not counting a trailing one
    pub fn nesting_level(&self) -> usize {
        let without_last = &self.quoted[..self.quoted.len() - 1];
        without_last.matches(SEPARATOR).count()
    }

    pub fn is_dir(&self) -> bool {
        self.quoted.ends_with(SEPARATOR)
    }

    /// Collapses repeated separators and strips one trailing separator (root stays `/`)
    pub fn normalize_path(path: &str) -> String {
        let collapsed = DOUBLED_SEPARATORS.replace_all(path, "/").into_owned();
        if collapsed.len() > 1 && collapsed.ends_with(SEPARATOR) {
            collapsed[..collapsed.len() - 1].to_string()
        } else {
            collapsed
        }
    }

    /// Compares a decoded path with a server-returned href.
    ///
    /// Only the URL path of `href` is considered (scheme and host are ignored);
    /// it is decoded and both sides are normalized before comparison.
    pub fn compare_path(path: &str, href: &str) -> bool {
        let href_path = format!("{}{}", SEPARATOR, unquote(&href_url_path(href)));
        Self::normalize_path(path) == Self::normalize_path(&href_path)
    }

    /// Like [`Urn::compare_path`], but also accepts hrefs carrying the URL path
    /// of `hostname` in front of `path` (servers mounted under a sub-path).
    pub fn matches_href(path: &str, href: &str, hostname: &str) -> bool {
        if Self::compare_path(path, href) {
            return true;
        }

        let href_path = href_url_path(href);
        strip_path_prefix(&href_path, &href_url_path(hostname))
            .is_some_and(|remainder| Self::compare_path(path, remainder))
    }
}

/// Removes `prefix` from `path` on a segment boundary only.
///
/// `/dav` strips `/dav/a` to `/a` but leaves `/davx/a` alone.
pub fn strip_path_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    if prefix.is_empty() {
        return None;
    }

    let remainder = path.strip_prefix(prefix)?;
    if remainder.is_empty() || remainder.starts_with(SEPARATOR) {
        Some(remainder)
    } else {
        None
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Percent-encodes every segment of `path`, leaving separators untouched
pub fn quote_path(path: &str) -> String {
    path.split(SEPARATOR)
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Percent-decodes `value`, falling back to the raw input on invalid UTF-8
pub fn unquote(value: &str) -> String {
    urlencoding::decode(value)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// URL path component of an absolute or relative href, still encoded
pub fn href_url_path(href: &str) -> String {
    let href = href.trim();
    match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
