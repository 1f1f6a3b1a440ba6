//! Absolute URLs and reference resolution (simplified RFC 3986).

use std::fmt;
use std::str::FromStr;

use htmltext_types::error::HtmlTextError;

/// An absolute `scheme://host[:port]/path[?query]` URL. Fragments are
/// discarded since they never reach the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Always starts with `/`.
    pub path: String,
    pub query: Option<String>,
}

impl Url {
    /// Parse an absolute URL. Returns `None` for anything without a
    /// `scheme://` prefix and a host.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (scheme, rest) = input.split_once("://")?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return None;
        }
        let rest = rest.split_once('#').map_or(rest, |(r, _)| r);
        let (rest, query) = match rest.split_once('?') {
            Some((r, q)) => (r, Some(q.to_string())),
            None => (rest, None),
        };
        let (authority, path) = match rest.find('/') {
            Some(i) => rest.split_at(i),
            None => (rest, "/"),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) if !p.is_empty() => (h, Some(p.parse::<u16>().ok()?)),
            Some((h, _)) => (h, None),
            None => (authority, None),
        };
        if host.is_empty() {
            return None;
        }
        Some(Url {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            port,
            path: path.to_string(),
            query,
        })
    }

    /// Port to connect to, falling back to the scheme default.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or(match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        })
    }

    /// Path plus query, as sent in a request line.
    pub fn request_target(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// Resolve `reference` against this URL.
    pub fn join(&self, reference: &str) -> Option<Url> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Some(self.clone());
        }
        if reference.contains("://") {
            return Url::parse(reference);
        }
        if reference.starts_with("//") {
            return Url::parse(&format!("{}:{reference}", self.scheme));
        }
        if let Some(query) = reference.strip_prefix('?') {
            let query = query.split_once('#').map_or(query, |(q, _)| q);
            return Some(Url {
                query: Some(query.to_string()),
                ..self.clone()
            });
        }
        if reference.starts_with('#') {
            return Some(self.clone());
        }

        let reference = reference.split_once('#').map_or(reference, |(r, _)| r);
        let (ref_path, query) = match reference.split_once('?') {
            Some((p, q)) => (p, Some(q.to_string())),
            None => (reference, None),
        };
        let merged = if ref_path.starts_with('/') {
            ref_path.to_string()
        } else {
            let dir = &self.path[..self.path.rfind('/').map_or(0, |i| i + 1)];
            format!("{dir}{ref_path}")
        };
        Some(Url {
            path: remove_dot_segments(&merged),
            query,
            ..self.clone()
        })
    }
}

/// Collapse `.` and `..` segments. `..` never climbs above the root.
fn remove_dot_segments(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let last = segments.len().saturating_sub(1);
    let mut trailing_slash = false;
    for (i, seg) in segments.iter().enumerate() {
        match *seg {
            "." => trailing_slash = i == last,
            ".." => {
                out.pop();
                trailing_slash = i == last;
            },
            s => {
                out.push(s);
                trailing_slash = false;
            },
        }
    }
    let mut result = String::with_capacity(path.len());
    for seg in &out {
        result.push('/');
        result.push_str(seg);
    }
    if trailing_slash || result.is_empty() {
        result.push('/');
    }
    result
}

impl FromStr for Url {
    type Err = HtmlTextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s).ok_or_else(|| HtmlTextError::Network(format!("not an absolute URL: {s}")))
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}
