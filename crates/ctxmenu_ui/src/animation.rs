//! Show/hide animation descriptors and pending animation records.
//!
//! Nothing here runs a timer. A transition records a [`PendingAnimation`]
//! with a deadline and the host completes it by advancing the controller's
//! clock, which keeps every transition deterministic under test.

use std::time::{Duration, Instant};

use serde::de::{Deserializer, Error as _};
use serde::Deserialize;

/// `"fast"`.
pub const FAST: Duration = Duration::from_millis(200);
/// `"normal"` and the fallback for unknown speed names.
pub const NORMAL: Duration = Duration::from_millis(400);
/// `"slow"`.
pub const SLOW: Duration = Duration::from_millis(600);

/// Visual effect of an animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Show,
    Hide,
    FadeIn,
    FadeOut,
    SlideDown,
    SlideUp,
    Other(String),
}

impl Effect {
    pub fn from_name(name: &str) -> Self {
        match name {
            "none" => Self::None,
            "show" => Self::Show,
            "hide" => Self::Hide,
            "fadeIn" => Self::FadeIn,
            "fadeOut" => Self::FadeOut,
            "slideDown" => Self::SlideDown,
            "slideUp" => Self::SlideUp,
            other => Self::Other(other.to_string()),
        }
    }
}

fn speed(name: &str) -> Option<Duration> {
    match name {
        "fast" => Some(FAST),
        "slow" => Some(SLOW),
        "normal" | "_default" => Some(NORMAL),
        _ => None,
    }
}

/// How the popup appears or disappears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Animation {
    pub effect: Effect,
    pub duration: Duration,
}

impl Animation {
    pub fn new(effect: Effect, duration: Duration) -> Self {
        Self { effect, duration }
    }

    /// No animation: transitions complete synchronously.
    pub fn none() -> Self {
        Self { effect: Effect::None, duration: Duration::ZERO }
    }

    /// Whether the transition completes without waiting.
    pub fn is_immediate(&self) -> bool {
        self.effect == Effect::None || self.duration.is_zero()
    }

    pub fn default_show() -> Self {
        Self::new(Effect::SlideDown, FAST)
    }

    pub fn default_hide() -> Self {
        Self::new(Effect::FadeOut, FAST)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Millis(u64),
    Speed(String),
}

impl DurationRepr {
    fn duration(&self) -> Duration {
        match self {
            Self::Millis(ms) => Duration::from_millis(*ms),
            Self::Speed(name) => speed(name).unwrap_or(NORMAL),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnimationRepr {
    Off,
    Flag(bool),
    Millis(u64),
    Name(String),
    Full {
        effect: Option<String>,
        duration: Option<DurationRepr>,
    },
}

impl<'de> Deserialize<'de> for Animation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = AnimationRepr::deserialize(deserializer)?;
        Ok(match repr {
            AnimationRepr::Off | AnimationRepr::Flag(false) => Animation::none(),
            AnimationRepr::Flag(true) => Animation::new(Effect::FadeIn, NORMAL),
            AnimationRepr::Millis(ms) => Animation::new(Effect::FadeIn, Duration::from_millis(ms)),
            AnimationRepr::Name(name) => match speed(&name) {
                Some(duration) => Animation::new(Effect::FadeIn, duration),
                None if name.is_empty() => return Err(D::Error::custom("empty animation name")),
                None => Animation::new(Effect::from_name(&name), NORMAL),
            },
            AnimationRepr::Full { effect, duration } => Animation::new(
                effect.as_deref().map(Effect::from_name).unwrap_or(Effect::FadeIn),
                duration.map(|d| d.duration()).unwrap_or(NORMAL),
            ),
        })
    }
}

/// Direction of a pending transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationKind {
    Show,
    Hide,
}

/// Identifies one transition; later transitions get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Hands out increasing tickets.
#[derive(Debug, Default)]
pub struct TicketCounter(u64);

impl TicketCounter {
    pub fn next(&mut self) -> Ticket {
        self.0 += 1;
        Ticket(self.0)
    }
}

/// An animation waiting for completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAnimation {
    pub ticket: Ticket,
    pub kind: AnimationKind,
    pub effect: Effect,
    pub deadline: Instant,
}

impl PendingAnimation {
    pub fn start(ticket: Ticket, kind: AnimationKind, animation: &Animation, now: Instant) -> Self {
        Self { ticket, kind, effect: animation.effect.clone(), deadline: now + animation.duration }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}
