//! Generation directive types
//!
//! A `GenerationDirective` is the fully-resolved, structured description
//! of a composition or animation request. It is produced fresh for every
//! generate/refine call, handed to the compositing backend, and never
//! mutated afterwards; refinement replaces it with a new one.

use crate::backends::StorageHandle;
use serde::{Deserialize, Serialize};

/// Kind of artifact a generation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// A single static composite image
    Image,
    /// An animated sequence (rendered as a GIF by the backend)
    Animation,
}

/// Canvas dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for CanvasSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const BLACK: Rgb = Rgb(0, 0, 0);
}

/// Compositing role of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Fills the canvas underneath everything else
    Base,
    /// Composited on top of the base in layer order
    Overlay,
}

/// Spatial placement of a layer on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Stretched to cover the whole canvas
    Fill,
    Center,
    Left,
    Right,
    Top,
    Bottom,
}

/// Travel direction for sliding motion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

/// Motion applied to a layer within an animation
///
/// Drawn from a closed vocabulary; a layer whose prompt clause carries
/// no recognized motion phrase is simply omitted (it stays static).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum Motion {
    /// Linear translation across the canvas
    Slide { direction: Direction },
    /// Circular path around the canvas center
    Rotate,
    /// Vertical bounce against the bottom edge
    Bounce,
}

/// One resolved layer of the composition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Stored filename of the asset within its session
    pub filename: String,
    /// The tag the prompt referenced this asset by
    pub tag: String,
    /// Opaque storage handle the renderer fetches bytes through
    pub handle: StorageHandle,
    pub role: Role,
    pub placement: Placement,
    /// Present only for animated output with a recognized motion phrase
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<Motion>,
}

/// How an animation plays its layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationStyle {
    /// All layers composited per frame, each moving per its motion spec
    Motion,
    /// Layers shown one after another in layer order
    Slideshow,
}

/// Animation parameters, present only for `OutputKind::Animation`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationSpec {
    pub style: AnimationStyle,
    pub frame_count: u32,
    pub frame_duration_ms: u32,
}

/// Fully-resolved description of a generation request
///
/// Ephemeral: compiled fresh for every call and handed to the
/// compositing backend together with the originating prompt text,
/// which travels along for audit and lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationDirective {
    pub output: OutputKind,
    pub canvas: CanvasSize,
    pub background: Rgb,
    /// Layers in compositing order, base first
    pub layers: Vec<LayerSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation: Option<AnimationSpec>,
    /// The prompt text this directive was compiled from
    pub prompt: String,
}
