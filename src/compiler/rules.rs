//! Prompt extraction rules
//!
//! Free-text cues (dimensions, size presets, colors, placement, motion,
//! slideshow pacing) are recognized by a pipeline of independent rules
//! over closed vocabulary tables. Every rule returns the matched value
//! together with its span in the prompt, so when cues conflict the
//! earliest span wins deterministically instead of depending on rule
//! evaluation order.

use crate::compiler::directive::{CanvasSize, Direction, Motion, Placement, Rgb, Role};
use regex::Regex;
use std::sync::OnceLock;

/// A rule hit: the extracted value plus where in the prompt it matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch<T> {
    pub value: T,
    /// Byte range of the matched text within the prompt
    pub span: (usize, usize),
}

impl<T> RuleMatch<T> {
    fn new(value: T, start: usize, end: usize) -> Self {
        Self {
            value,
            span: (start, end),
        }
    }
}

/// Keep whichever of two optional matches starts earlier
fn earliest<T>(a: Option<RuleMatch<T>>, b: Option<RuleMatch<T>>) -> Option<RuleMatch<T>> {
    match (a, b) {
        (Some(x), Some(y)) => Some(if y.span.0 < x.span.0 { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}

fn dimension_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(\d+)\s*x\s*(\d+)",
            r"(\d+)\s*by\s*(\d+)",
            r"(\d+)\s*width\s*(\d+)\s*height",
            r"width\s*(\d+)\s*height\s*(\d+)",
            r"(\d+)\s*wide\s*(\d+)\s*tall",
            r"(\d+)\s*pixels?\s*wide\s*(\d+)\s*pixels?\s*tall",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static dimension pattern"))
        .collect()
    })
}

/// Canvas dimensions sane enough to render
const MIN_DIMENSION: u32 = 100;
const MAX_DIMENSION: u32 = 4000;

/// Named aspect presets resolved to fixed width/height pairs
const SIZE_PRESETS: &[(&str, u32, u32)] = &[
    ("square", 1080, 1080),
    ("landscape", 1920, 1080),
    ("portrait", 1080, 1920),
    ("widescreen", 1920, 1080),
    ("instagram", 1080, 1080),
    ("youtube", 1920, 1080),
    ("facebook", 1200, 630),
    ("twitter", 1200, 675),
];

/// Explicit `WxH`-style dimensions anywhere in the prompt
///
/// Recognizes the spelled-out forms as well ("1920 by 1080", "width 1920
/// height 1080", "1920 wide 1080 tall"). Values outside 100..=4000 are
/// ignored rather than clamped.
pub fn explicit_dimensions(prompt: &str) -> Option<RuleMatch<CanvasSize>> {
    let lower = prompt.to_lowercase();
    let mut best: Option<RuleMatch<CanvasSize>> = None;
    for pattern in dimension_patterns() {
        for caps in pattern.captures_iter(&lower) {
            let whole = caps.get(0).expect("capture 0");
            let (Ok(width), Ok(height)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
                continue;
            };
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&width)
                || !(MIN_DIMENSION..=MAX_DIMENSION).contains(&height)
            {
                continue;
            }
            let hit = RuleMatch::new(CanvasSize::new(width, height), whole.start(), whole.end());
            best = earliest(best, Some(hit));
        }
    }
    best
}

/// Named size preset ("landscape", "instagram", ...) from the closed table
pub fn preset_dimensions(prompt: &str) -> Option<RuleMatch<CanvasSize>> {
    let lower = prompt.to_lowercase();
    let mut best: Option<RuleMatch<CanvasSize>> = None;
    for (name, width, height) in SIZE_PRESETS {
        if let Some(start) = lower.find(name) {
            let hit = RuleMatch::new(
                CanvasSize::new(*width, *height),
                start,
                start + name.len(),
            );
            best = earliest(best, Some(hit));
        }
    }
    best
}

/// Named colors recognized next to "background" or "color"
const COLOR_TABLE: &[(&str, Rgb)] = &[
    ("white", Rgb(255, 255, 255)),
    ("black", Rgb(0, 0, 0)),
    ("red", Rgb(255, 0, 0)),
    ("green", Rgb(0, 255, 0)),
    ("blue", Rgb(0, 0, 255)),
    ("yellow", Rgb(255, 255, 0)),
    ("cyan", Rgb(0, 255, 255)),
    ("magenta", Rgb(255, 0, 255)),
    ("gray", Rgb(128, 128, 128)),
    ("grey", Rgb(128, 128, 128)),
    ("orange", Rgb(255, 165, 0)),
    ("purple", Rgb(128, 0, 128)),
    ("pink", Rgb(255, 192, 203)),
    ("brown", Rgb(165, 42, 42)),
];

fn rgb_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"rgb\s*\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)").expect("static rgb pattern")
    })
}

fn hex_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#([0-9a-f]{6})").expect("static hex pattern"))
}

/// Background color cue: a named color adjacent to "background"/"color",
/// an `rgb(r,g,b)` literal, or a `#rrggbb` literal
pub fn background_color(prompt: &str) -> Option<RuleMatch<Rgb>> {
    let lower = prompt.to_lowercase();
    let mut best: Option<RuleMatch<Rgb>> = None;

    for (name, rgb) in COLOR_TABLE {
        for phrase in [
            format!("{name} background"),
            format!("background {name}"),
            format!("{name} color"),
        ] {
            if let Some(start) = lower.find(&phrase) {
                best = earliest(
                    best,
                    Some(RuleMatch::new(*rgb, start, start + phrase.len())),
                );
            }
        }
    }

    if let Some(caps) = rgb_pattern().captures(&lower) {
        let whole = caps.get(0).expect("capture 0");
        if let (Ok(r), Ok(g), Ok(b)) = (
            caps[1].parse::<u8>(),
            caps[2].parse::<u8>(),
            caps[3].parse::<u8>(),
        ) {
            best = earliest(
                best,
                Some(RuleMatch::new(Rgb(r, g, b), whole.start(), whole.end())),
            );
        }
    }

    if let Some(caps) = hex_pattern().captures(&lower) {
        let whole = caps.get(0).expect("capture 0");
        let hex = &caps[1];
        let r = u8::from_str_radix(&hex[0..2], 16).expect("validated hex");
        let g = u8::from_str_radix(&hex[2..4], 16).expect("validated hex");
        let b = u8::from_str_radix(&hex[4..6], 16).expect("validated hex");
        best = earliest(
            best,
            Some(RuleMatch::new(Rgb(r, g, b), whole.start(), whole.end())),
        );
    }

    best
}

fn role_base_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(background|backdrop)\b").expect("static role pattern"))
}

fn role_overlay_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(foreground|front|overlay|on top)\b").expect("static role pattern")
    })
}

/// Explicit role language within a tag's clause
pub fn role_cue(clause: &str) -> Option<RuleMatch<Role>> {
    let lower = clause.to_lowercase();
    let base = role_base_pattern()
        .find(&lower)
        .map(|m| RuleMatch::new(Role::Base, m.start(), m.end()));
    let overlay = role_overlay_pattern()
        .find(&lower)
        .map(|m| RuleMatch::new(Role::Overlay, m.start(), m.end()));
    earliest(base, overlay)
}

const PLACEMENT_TABLE: &[(&str, Placement)] = &[
    ("center", Placement::Center),
    ("centre", Placement::Center),
    ("middle", Placement::Center),
    ("left", Placement::Left),
    ("right", Placement::Right),
    ("top", Placement::Top),
    ("bottom", Placement::Bottom),
];

fn placement_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(center|centre|middle|left|right|top|bottom)\b")
            .expect("static placement pattern")
    })
}

/// Explicit placement language within a tag's clause
///
/// "on top" is a role cue (overlay), not an edge placement, so those
/// occurrences are blanked before matching.
pub fn placement_cue(clause: &str) -> Option<RuleMatch<Placement>> {
    let lower = clause.to_lowercase().replace("on top", "      ");
    let m = placement_pattern().find(&lower)?;
    let placement = PLACEMENT_TABLE
        .iter()
        .find(|(word, _)| *word == m.as_str())
        .map(|(_, p)| *p)?;
    Some(RuleMatch::new(placement, m.start(), m.end()))
}

/// Outcome of motion extraction for one tag clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCue {
    /// A recognized motion phrase
    Move(Motion),
    /// The clause explicitly asks the asset to stay put
    Hold,
}

const MOTION_PHRASES: &[(&str, MotionCue)] = &[
    (
        "left to right",
        MotionCue::Move(Motion::Slide {
            direction: Direction::LeftToRight,
        }),
    ),
    (
        "right to left",
        MotionCue::Move(Motion::Slide {
            direction: Direction::RightToLeft,
        }),
    ),
    (
        "top to bottom",
        MotionCue::Move(Motion::Slide {
            direction: Direction::TopToBottom,
        }),
    ),
    (
        "up to down",
        MotionCue::Move(Motion::Slide {
            direction: Direction::TopToBottom,
        }),
    ),
    (
        "bottom to top",
        MotionCue::Move(Motion::Slide {
            direction: Direction::BottomToTop,
        }),
    ),
    (
        "down to up",
        MotionCue::Move(Motion::Slide {
            direction: Direction::BottomToTop,
        }),
    ),
    ("rotating", MotionCue::Move(Motion::Rotate)),
    ("rotate", MotionCue::Move(Motion::Rotate)),
    ("spinning", MotionCue::Move(Motion::Rotate)),
    ("spin", MotionCue::Move(Motion::Rotate)),
    ("bouncing", MotionCue::Move(Motion::Bounce)),
    ("bounce", MotionCue::Move(Motion::Bounce)),
    ("static", MotionCue::Hold),
    ("stable", MotionCue::Hold),
    ("stay still", MotionCue::Hold),
];

/// Motion phrase within a tag's clause, from the closed vocabulary
pub fn motion_cue(clause: &str) -> Option<RuleMatch<MotionCue>> {
    let lower = clause.to_lowercase();
    let mut best: Option<RuleMatch<MotionCue>> = None;
    for (phrase, cue) in MOTION_PHRASES {
        if let Some(start) = lower.find(phrase) {
            best = earliest(best, Some(RuleMatch::new(*cue, start, start + phrase.len())));
        }
    }
    best
}

fn movement_verb_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(move|moves|moving|slide|slides|sliding|animate|animates|animating)\b")
            .expect("static movement pattern")
    })
}

/// Whether the prompt asks for movement at all
///
/// Used to decide between "no motion mentioned, default everything to
/// static" and "motion wanted but unrecognizable", which must fail.
pub fn movement_intent(prompt: &str) -> bool {
    movement_verb_pattern().is_match(&prompt.to_lowercase())
}

const SLIDESHOW_PHRASES: &[&str] = &[
    "presentation",
    "slideshow",
    "slide show",
    "shift images",
    "show images",
    "display images",
    "one by one",
    "turn by turn",
    "sequence",
];

/// Whether the prompt asks for a presentation-style slideshow
pub fn slideshow_cue(prompt: &str) -> Option<RuleMatch<()>> {
    let lower = prompt.to_lowercase();
    let mut best: Option<RuleMatch<()>> = None;
    for phrase in SLIDESHOW_PHRASES {
        if let Some(start) = lower.find(phrase) {
            best = earliest(best, Some(RuleMatch::new((), start, start + phrase.len())));
        }
    }
    best
}

fn seconds_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*seconds?").expect("static seconds pattern"))
}

/// Per-frame duration from "N seconds" phrasing, in milliseconds
pub fn frame_duration(prompt: &str) -> Option<RuleMatch<u32>> {
    let lowercased = prompt.to_lowercase();
    let caps = seconds_pattern().captures(&lowercased)?;
    let whole = caps.get(0).expect("capture 0");
    let seconds: u32 = caps[1].parse().ok()?;
    Some(RuleMatch::new(
        seconds.saturating_mul(1000),
        whole.start(),
        whole.end(),
    ))
}
