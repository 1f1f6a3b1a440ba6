//! Link-aware pointer routing.
//!
//! [`LinkMovement`] is the movement method a surface installs to make link
//! regions clickable. It tracks one gesture at a time: a press over a
//! clickable span arms it, and a release over the same span activates it.
//! The outcome of each gesture lands in a caller-owned [`LinkHit`].

use std::ops::Range;

use htmltext_types::input::PointerEvent;

use crate::styled::{Annotation, Span, StyledText};

/// What a completed click on a link region asks the host to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// An ordinary `<a href>`.
    Url(String),
    /// An internal link; carries its target.
    InternalLink(String),
    /// A table; carries its reconstructed markup.
    Table(String),
}

impl Activation {
    fn from_span(span: &Span) -> Option<Self> {
        match &span.annotation {
            Annotation::Link { href } => Some(Self::Url(href.clone())),
            Annotation::InternalLink { target, .. } => Some(Self::InternalLink(target.clone())),
            Annotation::Table { html } => Some(Self::Table(html.clone())),
            _ => None,
        }
    }
}

/// Per-gesture result slot, reset by the widget before every dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkHit {
    /// Some event of the gesture landed on a link region.
    pub hit: bool,
    /// Set when the gesture completed a click.
    pub activation: Option<Activation>,
}

impl LinkHit {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Movement method tracking presses on clickable spans.
#[derive(Debug, Clone, Default)]
pub struct LinkMovement {
    pressed: Option<Range<usize>>,
}

impl LinkMovement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a press is currently armed on a link region.
    pub fn is_pressed(&self) -> bool {
        self.pressed.is_some()
    }

    /// Drop an armed press without activating anything.
    pub fn reset(&mut self) {
        self.pressed = None;
    }

    /// Feed one event. `offset` is the text offset under the event's
    /// position, as computed by the surface layout. Returns whether the
    /// event was consumed.
    pub fn on_event(
        &mut self,
        event: &PointerEvent,
        text: &StyledText,
        offset: Option<usize>,
        hit: &mut LinkHit,
    ) -> bool {
        let span = offset.and_then(|o| text.clickable_at(o));
        match event {
            PointerEvent::Down { .. } => {
                self.pressed = span.map(|s| s.range.clone());
                if self.pressed.is_some() {
                    hit.hit = true;
                }
                self.pressed.is_some()
            },
            PointerEvent::Move { .. } => self.pressed.is_some(),
            PointerEvent::Up { .. } => {
                let Some(pressed) = self.pressed.take() else {
                    return false;
                };
                if let Some(span) = span
                    && span.range == pressed
                {
                    hit.hit = true;
                    hit.activation = Activation::from_span(span);
                } else {
                    log::debug!("pointer released outside pressed link {pressed:?}");
                }
                true
            },
            PointerEvent::Cancel => self.pressed.take().is_some(),
        }
    }
}
