//! Popup placement.
//!
//! Placement aligns an anchor point of the popup (`my`) to an anchor point
//! of a reference box (`at` on `of`), then applies collision handling
//! against the viewport.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use ctxmenu_core::CtxMenuError;
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::document::{Document, ElementId, Point, Rect, Size};
use crate::host::{Gesture, OpenUi};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    Top,
    Center,
    Bottom,
}

/// Offset added to an anchor coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Offset {
    Px(f32),
    /// Percentage of the box the anchor belongs to.
    Percent(f32),
}

impl Offset {
    fn resolve(self, extent: f32) -> f32 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => extent * pct / 100.0,
        }
    }

    fn negate(self) -> Self {
        match self {
            Self::Px(px) => Self::Px(-px),
            Self::Percent(pct) => Self::Percent(-pct),
        }
    }
}

impl Default for Offset {
    fn default() -> Self {
        Self::Px(0.0)
    }
}

/// A point on a box, e.g. `"right+5 bottom-10"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub horizontal: HAlign,
    pub h_offset: Offset,
    pub vertical: VAlign,
    pub v_offset: Offset,
}

impl Anchor {
    pub const LEFT_TOP: Anchor = Anchor {
        horizontal: HAlign::Left,
        h_offset: Offset::Px(0.0),
        vertical: VAlign::Top,
        v_offset: Offset::Px(0.0),
    };

    pub const LEFT_BOTTOM: Anchor = Anchor {
        horizontal: HAlign::Left,
        h_offset: Offset::Px(0.0),
        vertical: VAlign::Bottom,
        v_offset: Offset::Px(0.0),
    };

    fn h_base(&self, width: f32) -> f32 {
        match self.horizontal {
            HAlign::Left => 0.0,
            HAlign::Center => width / 2.0,
            HAlign::Right => width,
        }
    }

    fn v_base(&self, height: f32) -> f32 {
        match self.vertical {
            VAlign::Top => 0.0,
            VAlign::Center => height / 2.0,
            VAlign::Bottom => height,
        }
    }

    fn flipped_horizontal(mut self) -> Self {
        self.horizontal = match self.horizontal {
            HAlign::Left => HAlign::Right,
            HAlign::Right => HAlign::Left,
            HAlign::Center => HAlign::Center,
        };
        self.h_offset = self.h_offset.negate();
        self
    }

    fn flipped_vertical(mut self) -> Self {
        self.vertical = match self.vertical {
            VAlign::Top => VAlign::Bottom,
            VAlign::Bottom => VAlign::Top,
            VAlign::Center => VAlign::Center,
        };
        self.v_offset = self.v_offset.negate();
        self
    }
}

enum Keyword {
    H(HAlign),
    V(VAlign),
    Center,
}

fn split_keyword(token: &str) -> Option<(Keyword, &str)> {
    const KEYWORDS: [(&str, Keyword); 5] = [
        ("left", Keyword::H(HAlign::Left)),
        ("right", Keyword::H(HAlign::Right)),
        ("top", Keyword::V(VAlign::Top)),
        ("bottom", Keyword::V(VAlign::Bottom)),
        ("center", Keyword::Center),
    ];
    KEYWORDS.into_iter().find_map(|(name, keyword)| {
        token.strip_prefix(name).map(|rest| (keyword, rest))
    })
}

fn parse_offset(text: &str, input: &str) -> Result<Offset, CtxMenuError> {
    if text.is_empty() {
        return Ok(Offset::default());
    }
    if !text.starts_with(['+', '-']) {
        return Err(CtxMenuError::position(format!("Bad offset '{text}' in '{input}'")));
    }
    let (number, percent) = match text.strip_suffix('%') {
        Some(n) => (n, true),
        None => (text, false),
    };
    let value: f32 = number
        .parse()
        .map_err(|_| CtxMenuError::position(format!("Bad offset '{text}' in '{input}'")))?;
    Ok(if percent { Offset::Percent(value) } else { Offset::Px(value) })
}

impl FromStr for Anchor {
    type Err = CtxMenuError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() > 2 {
            return Err(CtxMenuError::position(format!("Expected one or two anchor words, got '{input}'")));
        }

        let mut parsed = Vec::with_capacity(2);
        for token in &tokens {
            let (keyword, rest) = split_keyword(token)
                .ok_or_else(|| CtxMenuError::position(format!("Unknown anchor '{token}' in '{input}'")))?;
            parsed.push((keyword, parse_offset(rest, input)?));
        }

        // a single vertical keyword centers horizontally and vice versa
        if parsed.len() == 1 {
            parsed.push((Keyword::Center, Offset::default()));
            if matches!(parsed[0].0, Keyword::V(_)) {
                parsed.swap(0, 1);
            }
        }

        let mut horizontal = None;
        let mut vertical = None;
        for (index, (keyword, offset)) in parsed.iter().enumerate() {
            match keyword {
                Keyword::H(h) if horizontal.is_none() => horizontal = Some((*h, *offset)),
                Keyword::V(v) if vertical.is_none() => vertical = Some((*v, *offset)),
                Keyword::Center if index == 0 && horizontal.is_none() => {
                    horizontal = Some((HAlign::Center, *offset))
                }
                Keyword::Center if vertical.is_none() => vertical = Some((VAlign::Center, *offset)),
                Keyword::Center if horizontal.is_none() => {
                    horizontal = Some((HAlign::Center, *offset))
                }
                _ => {
                    return Err(CtxMenuError::position(format!("Conflicting anchors in '{input}'")));
                }
            }
        }

        match (horizontal, vertical) {
            (Some((h, h_offset)), Some((v, v_offset))) => {
                Ok(Anchor { horizontal: h, h_offset, vertical: v, v_offset })
            }
            _ => Err(CtxMenuError::position(format!("Conflicting anchors in '{input}'"))),
        }
    }
}

impl<'de> Deserialize<'de> for Anchor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Collision handling for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionMode {
    /// Shift back inside the viewport.
    #[default]
    Fit,
    /// Mirror to the other side of the anchor.
    Flip,
    /// Flip, then fit.
    FlipFit,
    /// Leave as placed.
    None,
}

impl FromStr for CollisionMode {
    type Err = CtxMenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fit" => Ok(Self::Fit),
            "flip" => Ok(Self::Flip),
            "flipfit" => Ok(Self::FlipFit),
            "none" => Ok(Self::None),
            other => Err(CtxMenuError::position(format!("Unknown collision '{other}'"))),
        }
    }
}

/// Collision handling per axis, parsed from `"fit"` or `"flip fit"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Collision {
    pub horizontal: CollisionMode,
    pub vertical: CollisionMode,
}

impl Collision {
    pub fn both(mode: CollisionMode) -> Self {
        Self { horizontal: mode, vertical: mode }
    }
}

impl FromStr for Collision {
    type Err = CtxMenuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let modes: Vec<&str> = s.split_whitespace().collect();
        match modes.as_slice() {
            [one] => Ok(Self::both(one.parse()?)),
            [h, v] => Ok(Self { horizontal: h.parse()?, vertical: v.parse()? }),
            _ => Err(CtxMenuError::position(format!("Bad collision '{s}'"))),
        }
    }
}

impl<'de> Deserialize<'de> for Collision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// What the popup is positioned against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionOf {
    Pointer(Point),
    Element(ElementId),
}

/// A fully resolved placement request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSpec {
    pub my: Anchor,
    pub at: Anchor,
    pub of: PositionOf,
    pub collision: Collision,
}

impl PositionSpec {
    /// Default placement for a gesture: top-left corner at the pointer, or
    /// below the target when the gesture has no coordinates.
    pub fn for_gesture(gesture: &Gesture) -> Self {
        let of = match gesture.page {
            Some(point) => PositionOf::Pointer(point),
            None => PositionOf::Element(gesture.target),
        };
        Self { my: Anchor::LEFT_TOP, at: Anchor::LEFT_BOTTOM, of, collision: Collision::default() }
    }

    /// Apply caller overrides on top of this spec.
    pub fn merge(mut self, overrides: &PositionOverrides) -> Self {
        if let Some(my) = overrides.my {
            self.my = my;
        }
        if let Some(at) = overrides.at {
            self.at = at;
        }
        if let Some(of) = overrides.of {
            self.of = of;
        }
        if let Some(collision) = overrides.collision {
            self.collision = collision;
        }
        self
    }

    /// Top-left corner of a popup of `size`.
    pub fn compute(&self, document: &Document, size: Size) -> Point {
        let target = match self.of {
            PositionOf::Pointer(point) => Rect::at(point),
            PositionOf::Element(element) => document.rect(element),
        };
        let viewport = document.viewport();

        // anchor point on the target, minus the popup's own anchor, plus both offsets
        let place_x = |my: &Anchor, at: &Anchor| {
            let width = target.size.width;
            target.left() + at.h_base(width) + at.h_offset.resolve(width) - my.h_base(size.width)
                + my.h_offset.resolve(size.width)
        };
        let place_y = |my: &Anchor, at: &Anchor| {
            let height = target.size.height;
            target.top() + at.v_base(height) + at.v_offset.resolve(height) - my.v_base(size.height)
                + my.v_offset.resolve(size.height)
        };

        let x = resolve_axis(
            self.collision.horizontal,
            place_x(&self.my, &self.at),
            || place_x(&self.my.flipped_horizontal(), &self.at.flipped_horizontal()),
            size.width,
            viewport.width,
        );
        let y = resolve_axis(
            self.collision.vertical,
            place_y(&self.my, &self.at),
            || place_y(&self.my.flipped_vertical(), &self.at.flipped_vertical()),
            size.height,
            viewport.height,
        );
        Point::new(x, y)
    }
}

fn overflow(start: f32, extent: f32, limit: f32) -> f32 {
    (0.0 - start).max(0.0) + (start + extent - limit).max(0.0)
}

fn fit(start: f32, extent: f32, limit: f32) -> f32 {
    let mut start = start;
    if start + extent > limit {
        start = limit - extent;
    }
    // the leading edge wins when the box is larger than the viewport
    start.max(0.0)
}

fn resolve_axis(
    mode: CollisionMode,
    start: f32,
    flipped: impl FnOnce() -> f32,
    extent: f32,
    limit: f32,
) -> f32 {
    let flip = |start: f32, flipped: f32| {
        let before = overflow(start, extent, limit);
        if before > 0.0 && overflow(flipped, extent, limit) < before {
            flipped
        } else {
            start
        }
    };
    match mode {
        CollisionMode::None => start,
        CollisionMode::Fit => fit(start, extent, limit),
        CollisionMode::Flip => flip(start, flipped()),
        CollisionMode::FlipFit => fit(flip(start, flipped()), extent, limit),
    }
}

/// Partial placement supplied through options.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PositionOverrides {
    pub my: Option<Anchor>,
    pub at: Option<Anchor>,
    #[serde(skip)]
    pub of: Option<PositionOf>,
    pub collision: Option<Collision>,
}

impl PositionOverrides {
    pub fn my(mut self, anchor: &str) -> Result<Self, CtxMenuError> {
        self.my = Some(anchor.parse()?);
        Ok(self)
    }

    pub fn at(mut self, anchor: &str) -> Result<Self, CtxMenuError> {
        self.at = Some(anchor.parse()?);
        Ok(self)
    }

    pub fn of(mut self, of: PositionOf) -> Self {
        self.of = Some(of);
        self
    }

    pub fn collision(mut self, collision: &str) -> Result<Self, CtxMenuError> {
        self.collision = Some(collision.parse()?);
        Ok(self)
    }
}

/// Callback computing placement per open.
pub type PositionFn = Rc<dyn Fn(&Gesture, &OpenUi) -> PositionOverrides>;

/// The `position` option.
#[derive(Clone, Default)]
pub enum PositionOption {
    /// Pointer (or target) placement with fit collision.
    #[default]
    Default,
    /// Fixed overrides merged onto the default.
    Static(PositionOverrides),
    /// Overrides computed from the gesture and open context.
    Custom(PositionFn),
}

impl PositionOption {
    pub fn custom(f: impl Fn(&Gesture, &OpenUi) -> PositionOverrides + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }

    /// Resolve the placement for one open.
    pub fn resolve(&self, gesture: &Gesture, ui: &OpenUi) -> PositionSpec {
        let base = PositionSpec::for_gesture(gesture);
        match self {
            Self::Default => base,
            Self::Static(overrides) => base.merge(overrides),
            Self::Custom(f) => base.merge(&f(gesture, ui)),
        }
    }
}

impl fmt::Debug for PositionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Default"),
            Self::Static(overrides) => f.debug_tuple("Static").field(overrides).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for PositionOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<PositionOverrides>::deserialize(deserializer)? {
            Some(overrides) => Self::Static(overrides),
            None => Self::Default,
        })
    }
}
