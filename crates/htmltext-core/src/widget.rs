//! The HTML text widget.
//!
//! [`HtmlTextWidget`] owns a display surface, the long-lived extended-tag
//! handlers and the conversion options. Every `set_html*` call converts
//! the markup and hands the result to the surface; pointer gestures are
//! routed back through the surface to the link regions.

use std::fmt;
use std::rc::Rc;

use htmltext_bundle::ResourceBundle;
use htmltext_types::error::{HtmlTextError, Result};
use htmltext_types::input::PointerSequence;

use crate::config::HtmlTextConfig;
use crate::pipeline::{ConvertOptions, Converter};
use crate::pointer::{Activation, LinkHit};
use crate::resolve::{Fetcher, ImageResolver, ResolutionStrategy, ResolveEnv, resolver_for};
use crate::styled::StyledText;
use crate::surface::DisplaySurface;
use crate::tags::{LinkHandler, TableHandler};

/// Bundle directory holding raw HTML resources.
pub const RAW_DIR: &str = "raw";

pub struct HtmlTextWidget<S> {
    surface: S,
    options: ConvertOptions,
    suppress_non_link_touches: bool,
    table_handler: Option<Rc<dyn TableHandler>>,
    link_handler: Option<Rc<dyn LinkHandler>>,
    bundle: Option<Box<dyn ResourceBundle>>,
    fetcher: Option<Box<dyn Fetcher>>,
    locales: Vec<String>,
    link_hit: LinkHit,
}

impl<S: DisplaySurface> HtmlTextWidget<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            options: ConvertOptions::default(),
            suppress_non_link_touches: true,
            table_handler: None,
            link_handler: None,
            bundle: None,
            fetcher: None,
            locales: Vec::new(),
            link_hit: LinkHit::default(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// The text currently on the surface.
    pub fn text(&self) -> &StyledText {
        self.surface.text()
    }

    pub fn options(&self) -> ConvertOptions {
        self.options
    }

    /// Outcome of the most recent pointer gesture.
    pub fn link_hit(&self) -> &LinkHit {
        &self.link_hit
    }

    // -----------------------------------------------------------------------
    // Environment
    // -----------------------------------------------------------------------

    /// Bundle serving `Local` images and `set_html_from_resource`.
    pub fn set_bundle(&mut self, bundle: Option<Box<dyn ResourceBundle>>) {
        self.bundle = bundle;
    }

    /// Fetcher for `Remote` images. Defaults to the built-in HTTP client.
    pub fn set_fetcher(&mut self, fetcher: Option<Box<dyn Fetcher>>) {
        self.fetcher = fetcher;
    }

    /// Preferred locales for bundled resources, most specific first.
    pub fn set_locales(&mut self, locales: Vec<String>) {
        self.locales = locales;
    }

    pub fn set_table_handler(&mut self, handler: Option<Rc<dyn TableHandler>>) {
        self.table_handler = handler;
    }

    pub fn set_link_handler(&mut self, handler: Option<Rc<dyn LinkHandler>>) {
        self.link_handler = handler;
    }

    /// Takes effect from the next `set_html*` call.
    pub fn set_trim_trailing_blank_lines(&mut self, enabled: bool) {
        self.options.trim_trailing_blank_lines = enabled;
    }

    /// Takes effect from the next `set_html*` call.
    pub fn set_symbolic_text_substitution(&mut self, enabled: bool) {
        self.options.substitute_symbolic_text = enabled;
    }

    pub fn set_suppress_non_link_touches(&mut self, enabled: bool) {
        self.suppress_non_link_touches = enabled;
    }

    /// Adopt `config`. Nothing changes when it is invalid.
    ///
    /// Returns the image strategy the config names, for use with
    /// [`set_html`](Self::set_html).
    pub fn apply_config(&mut self, config: &HtmlTextConfig) -> Result<ResolutionStrategy> {
        config.validate()?;
        let strategy = config.images.strategy()?;
        self.options = config.convert_options();
        self.suppress_non_link_touches = config.suppress_non_link_touches;
        Ok(strategy)
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Convert `markup` resolving images with `strategy` and display it.
    ///
    /// Fails only when the strategy cannot be served; the surface is left
    /// untouched in that case.
    pub fn set_html(&mut self, markup: &str, strategy: &ResolutionStrategy) -> Result<()> {
        let env = ResolveEnv {
            bundle: self.bundle.as_deref(),
            fetcher: self.fetcher.as_deref(),
        };
        let mut resolver = resolver_for(strategy, &env)?;
        let styled = self.converter().convert(markup, resolver.as_mut());
        drop(resolver);
        self.display(styled);
        Ok(())
    }

    /// Convert `markup` with a caller-supplied resolver and display it.
    pub fn set_html_with_resolver(&mut self, markup: &str, images: &mut dyn ImageResolver) {
        let styled = self.converter().convert(markup, images);
        self.display(styled);
    }

    /// Display the bundled resource `raw/<id>.html`, honouring the
    /// configured locales.
    pub fn set_html_from_resource(&mut self, id: &str, strategy: &ResolutionStrategy) -> Result<()> {
        let markup = {
            let bundle = self
                .bundle
                .as_deref()
                .ok_or_else(|| HtmlTextError::Bundle("no resource bundle configured".into()))?;
            let locales: Vec<&str> = self.locales.iter().map(String::as_str).collect();
            let name = format!("{id}.html");
            let path = bundle
                .localized_path(RAW_DIR, &name, &locales)
                .ok_or_else(|| HtmlTextError::Bundle(format!("no resource {RAW_DIR}/{name}")))?;
            log::debug!("loading html resource {path}");
            bundle.read_to_string(&path)?
        };
        self.set_html(&markup, strategy)
    }

    fn converter(&self) -> Converter<'_> {
        Converter::new(self.options)
            .with_table_handler(self.table_handler.as_deref())
            .with_link_handler(self.link_handler.as_deref())
    }

    fn display(&mut self, styled: StyledText) {
        self.surface.set_text(styled);
        if self.surface.install_movement() {
            log::debug!("link movement installed");
        }
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Route one pointer gesture. Returns whether it was consumed.
    ///
    /// With touch suppression on, only gestures touching a link region
    /// count as consumed, whatever the surface reports.
    pub fn on_pointer(&mut self, sequence: &PointerSequence) -> bool {
        self.link_hit.reset();
        let surface_consumed = self.surface.dispatch_pointer(sequence, &mut self.link_hit);

        match self.link_hit.activation.clone() {
            Some(Activation::Table(html)) => match &self.table_handler {
                Some(handler) => handler.on_table_click(&html),
                None => log::debug!("table clicked without a table handler"),
            },
            Some(Activation::InternalLink(target)) => match &self.link_handler {
                Some(handler) => handler.on_link_click(&target),
                None => log::debug!("internal link {target} clicked without a link handler"),
            },
            Some(Activation::Url(href)) => log::info!("link activated: {href}"),
            None => {},
        }

        if self.suppress_non_link_touches {
            self.link_hit.hit
        } else {
            surface_consumed
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for HtmlTextWidget<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlTextWidget")
            .field("surface", &self.surface)
            .field("options", &self.options)
            .field("suppress_non_link_touches", &self.suppress_non_link_touches)
            .field("table_handler", &self.table_handler.is_some())
            .field("link_handler", &self.link_handler.is_some())
            .field("bundle", &self.bundle.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .field("locales", &self.locales)
            .finish()
    }
}
