//! Image resolution: turning `<img src>` references into artifacts.
//!
//! A [`ResolutionStrategy`] is chosen once per conversion and turned into
//! an [`ImageResolver`] by [`resolver_for`]. Resolvers never fail: a
//! reference that cannot be resolved yields a placeholder artifact and
//! the conversion carries on.

pub mod http;
pub mod url;

use std::fmt;
use std::str::FromStr;

use htmltext_bundle::{ResourceBundle, validate_path};
use htmltext_types::error::{HtmlTextError, Result};

use crate::image::ImageArtifact;

pub use http::HttpFetcher;
pub use url::Url;

/// Bundle directory holding local images.
pub const IMAGE_DIR: &str = "images";

/// Extensions tried, in order, for a local reference without one.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How image references are resolved for one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStrategy {
    /// Look references up in the bundled resources.
    Local,
    /// Fetch references over the network, relative to `base` if given.
    Remote { base: Option<String> },
}

impl ResolutionStrategy {
    pub fn remote(base: impl Into<String>) -> Self {
        ResolutionStrategy::Remote {
            base: Some(base.into()),
        }
    }
}

impl FromStr for ResolutionStrategy {
    type Err = HtmlTextError;

    /// Accepts `local`, `remote` and `remote:<base>`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (name, base) = match s.split_once(':') {
            Some((name, base)) if name.eq_ignore_ascii_case("remote") => (name, Some(base)),
            _ => (s, None),
        };
        if name.eq_ignore_ascii_case("local") {
            return Ok(ResolutionStrategy::Local);
        }
        if name.eq_ignore_ascii_case("remote") {
            let base = base.map(str::trim).filter(|b| !b.is_empty()).map(String::from);
            return Ok(ResolutionStrategy::Remote { base });
        }
        Err(HtmlTextError::InvalidStrategy(format!(
            "unknown strategy {s:?} (expected \"local\" or \"remote\")"
        )))
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStrategy::Local => f.write_str("local"),
            ResolutionStrategy::Remote { base: None } => f.write_str("remote"),
            ResolutionStrategy::Remote { base: Some(base) } => write!(f, "remote:{base}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver traits
// ---------------------------------------------------------------------------

/// Turns an image reference into an artifact. Must not fail.
pub trait ImageResolver {
    fn resolve(&mut self, reference: &str) -> ImageArtifact;
}

impl<F> ImageResolver for F
where
    F: FnMut(&str) -> ImageArtifact,
{
    fn resolve(&mut self, reference: &str) -> ImageArtifact {
        self(reference)
    }
}

/// Fetches the bytes behind an absolute URL.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

// ---------------------------------------------------------------------------
// Local
// ---------------------------------------------------------------------------

/// Resolves references against `images/` in a resource bundle.
pub struct LocalResolver<B> {
    bundle: B,
}

impl<B: ResourceBundle> LocalResolver<B> {
    pub fn new(bundle: B) -> Self {
        Self { bundle }
    }

    /// Bundle paths tried for `reference`, in order.
    fn candidates(reference: &str) -> Vec<String> {
        let name = reference.trim().trim_start_matches('/');
        let has_ext = name
            .rsplit('/')
            .next()
            .is_some_and(|file| file.contains('.'));
        if has_ext {
            return vec![format!("{IMAGE_DIR}/{name}")];
        }
        IMAGE_EXTENSIONS
            .iter()
            .map(|ext| format!("{IMAGE_DIR}/{name}.{ext}"))
            .collect()
    }

    fn lookup(&self, reference: &str) -> Result<ImageArtifact> {
        if reference.contains("://") {
            return Err(HtmlTextError::Resource(format!(
                "{reference} is not a bundled resource"
            )));
        }
        validate_path(reference)?;
        let path = Self::candidates(reference)
            .into_iter()
            .find(|p| self.bundle.exists(p))
            .ok_or_else(|| HtmlTextError::Resource(format!("no bundled image for {reference}")))?;
        let bytes = self.bundle.read(&path)?;
        Ok(ImageArtifact::from_bytes(reference, bytes))
    }
}

impl<B: ResourceBundle> ImageResolver for LocalResolver<B> {
    fn resolve(&mut self, reference: &str) -> ImageArtifact {
        self.lookup(reference).unwrap_or_else(|e| {
            log::debug!("local image {reference:?} unresolved: {e}");
            ImageArtifact::placeholder(reference)
        })
    }
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

/// Fetches references relative to an optional base location.
pub struct RemoteResolver<F> {
    base: Option<String>,
    fetcher: F,
}

impl<F: Fetcher> RemoteResolver<F> {
    pub fn new(base: Option<String>, fetcher: F) -> Self {
        Self { base, fetcher }
    }

    /// Absolute URL for `reference`.
    pub fn locate(&self, reference: &str) -> Option<Url> {
        let reference = reference.trim();
        match &self.base {
            Some(base) => match Url::parse(base) {
                Some(base) => base.join(reference),
                // Not a URL on its own: plain prefix.
                None => Url::parse(&format!("{base}{reference}")),
            },
            None => Url::parse(reference),
        }
    }

    fn fetch(&self, reference: &str) -> Result<ImageArtifact> {
        let url = self.locate(reference).ok_or_else(|| {
            HtmlTextError::Resource(format!("cannot form a URL from {reference:?}"))
        })?;
        let bytes = self.fetcher.fetch(&url)?;
        Ok(ImageArtifact::from_bytes(reference, bytes))
    }
}

impl<F: Fetcher> ImageResolver for RemoteResolver<F> {
    fn resolve(&mut self, reference: &str) -> ImageArtifact {
        self.fetch(reference).unwrap_or_else(|e| {
            log::warn!("remote image {reference:?} unavailable: {e}");
            ImageArtifact::placeholder(reference)
        })
    }
}

// ---------------------------------------------------------------------------
// Strategy dispatch
// ---------------------------------------------------------------------------

/// Host collaborators available to resolvers.
#[derive(Clone, Copy, Default)]
pub struct ResolveEnv<'a> {
    pub bundle: Option<&'a dyn ResourceBundle>,
    /// Defaults to [`HttpFetcher`] when unset.
    pub fetcher: Option<&'a dyn Fetcher>,
}

impl<'a> ResolveEnv<'a> {
    pub fn with_bundle(mut self, bundle: &'a dyn ResourceBundle) -> Self {
        self.bundle = Some(bundle);
        self
    }

    pub fn with_fetcher(mut self, fetcher: &'a dyn Fetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}

impl fmt::Debug for ResolveEnv<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveEnv")
            .field("bundle", &self.bundle.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .finish()
    }
}

/// Build the resolver for `strategy`.
///
/// Fails with [`HtmlTextError::InvalidStrategy`] when the strategy cannot
/// be served by `env`.
pub fn resolver_for<'a>(
    strategy: &ResolutionStrategy,
    env: &ResolveEnv<'a>,
) -> Result<Box<dyn ImageResolver + 'a>> {
    match strategy {
        ResolutionStrategy::Local => {
            let bundle = env.bundle.ok_or_else(|| {
                HtmlTextError::InvalidStrategy("local strategy requires a resource bundle".into())
            })?;
            Ok(Box::new(LocalResolver::new(bundle)))
        },
        ResolutionStrategy::Remote { base } => {
            let fetcher: Box<dyn Fetcher + 'a> = match env.fetcher {
                Some(f) => Box::new(f),
                None => Box::new(HttpFetcher::default()),
            };
            Ok(Box::new(RemoteResolver::new(base.clone(), fetcher)))
        },
    }
}
