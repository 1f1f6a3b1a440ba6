//! Conversion pipeline: markup in, styled text out.
//!
//! 1. optional symbolic-text substitution over the raw markup,
//! 2. base parse with the extended tag handler and an image resolver,
//! 3. optional trimming of trailing newlines.

use htmltext_types::error::Result;

use crate::markup::{self, DEFAULT_MAX_DEPTH};
use crate::resolve::{ImageResolver, ResolutionStrategy, ResolveEnv, resolver_for};
use crate::styled::StyledText;
use crate::symbols;
use crate::tags::{ExtendedTagHandler, LinkHandler, TableHandler};

/// Per-call conversion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Strip trailing `\n` from the result.
    pub trim_trailing_blank_lines: bool,
    /// Replace ASCII emoticons with inline images before parsing.
    pub substitute_symbolic_text: bool,
    pub max_depth: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            trim_trailing_blank_lines: false,
            substitute_symbolic_text: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Runs the pipeline with borrowed handlers.
#[derive(Clone, Copy, Default)]
pub struct Converter<'h> {
    pub options: ConvertOptions,
    table_handler: Option<&'h dyn TableHandler>,
    link_handler: Option<&'h dyn LinkHandler>,
}

impl<'h> Converter<'h> {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            table_handler: None,
            link_handler: None,
        }
    }

    pub fn with_table_handler(mut self, handler: Option<&'h dyn TableHandler>) -> Self {
        self.table_handler = handler;
        self
    }

    pub fn with_link_handler(mut self, handler: Option<&'h dyn LinkHandler>) -> Self {
        self.link_handler = handler;
        self
    }

    /// Convert `markup`, asking `images` for every embedded image.
    pub fn convert(&self, markup: &str, images: &mut dyn ImageResolver) -> StyledText {
        if markup.is_empty() {
            return StyledText::default();
        }

        let source = if self.options.substitute_symbolic_text {
            symbols::substitute(markup)
        } else {
            markup.into()
        };

        let mut tags = ExtendedTagHandler::new(self.table_handler, self.link_handler)
            .with_max_depth(self.options.max_depth);
        let mut styled = markup::parse(&source, images, &mut tags, self.options.max_depth);

        if self.options.trim_trailing_blank_lines {
            trim_trailing_newlines(&mut styled);
        }
        styled
    }

    /// Build a resolver for `strategy` and convert.
    ///
    /// Fails only when the strategy cannot be served, before any parsing.
    pub fn convert_with_strategy(
        &self,
        markup: &str,
        strategy: &ResolutionStrategy,
        env: &ResolveEnv<'_>,
    ) -> Result<StyledText> {
        let mut resolver = resolver_for(strategy, env)?;
        Ok(self.convert(markup, resolver.as_mut()))
    }
}

/// Remove trailing `\n` characters. Spans past the new end are clamped;
/// spans left empty are dropped.
pub fn trim_trailing_newlines(styled: &mut StyledText) {
    let kept = styled.text().trim_end_matches('\n').len();
    styled.truncate(kept);
}
