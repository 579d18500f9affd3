//! Directive compilation
//!
//! Translates a prompt plus its resolved tag bindings into a structured
//! [`GenerationDirective`]. Tag occurrence order is the primary
//! disambiguator: the first referenced tag defaults to the base role,
//! later references layer on top in mention order, and explicit language
//! in the clause around a reference ("as background", "on the right",
//! "moving left to right") overrides the defaults.

pub mod directive;
pub mod rules;

pub use directive::{
    AnimationSpec, AnimationStyle, CanvasSize, Direction, GenerationDirective, LayerSpec, Motion,
    OutputKind, Placement, Rgb, Role,
};

use crate::config::CompilerConfig;
use crate::error::{Result, TagcanvasError};
use crate::resolver::{tag_occurrences, TagBinding};
use rules::MotionCue;

/// Compiles prompts and bindings into generation directives
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Compile a prompt and its resolved bindings into a directive
    ///
    /// The bindings must correspond, in order, to the tag tokens
    /// extracted from `prompt`; the orchestrator guarantees this by
    /// resolving the same prompt it compiles.
    ///
    /// # Errors
    ///
    /// Returns `TagcanvasError::AmbiguousDirective` when the output is
    /// animated and the prompt asks for movement that no phrase from the
    /// closed motion vocabulary resolves — motion that is required
    /// cannot be silently defaulted.
    pub fn compile(
        &self,
        prompt: &str,
        bindings: &[TagBinding],
        output: OutputKind,
    ) -> Result<GenerationDirective> {
        let canvas = rules::explicit_dimensions(prompt)
            .or_else(|| rules::preset_dimensions(prompt))
            .map(|hit| hit.value)
            .unwrap_or(CanvasSize::new(
                self.config.default_width,
                self.config.default_height,
            ));

        let background = rules::background_color(prompt)
            .map(|hit| hit.value)
            .unwrap_or(Rgb::WHITE);

        let slideshow =
            output == OutputKind::Animation && rules::slideshow_cue(prompt).is_some();

        let clauses = clause_windows(prompt, bindings.len());
        let explicit_roles: Vec<Option<Role>> = clauses
            .iter()
            .map(|clause| rules::role_cue(clause).map(|hit| hit.value))
            .collect();
        let roles = assign_roles(&explicit_roles);

        let mut motion_resolved = false;
        let mut layers: Vec<LayerSpec> = Vec::with_capacity(bindings.len());
        for (i, binding) in bindings.iter().enumerate() {
            let clause = clauses.get(i).map(String::as_str).unwrap_or("");
            let role = if slideshow { Role::Overlay } else { roles[i] };

            let placement = if slideshow {
                Placement::Center
            } else {
                rules::placement_cue(clause)
                    .map(|hit| hit.value)
                    .unwrap_or(match role {
                        Role::Base => Placement::Fill,
                        Role::Overlay => Placement::Center,
                    })
            };

            let motion = if output == OutputKind::Animation && !slideshow {
                match rules::motion_cue(clause).map(|hit| hit.value) {
                    Some(MotionCue::Move(motion)) => {
                        motion_resolved = true;
                        Some(motion)
                    }
                    Some(MotionCue::Hold) => {
                        motion_resolved = true;
                        None
                    }
                    // no recognized phrase: the layer stays static
                    None => None,
                }
            } else {
                None
            };

            layers.push(LayerSpec {
                filename: binding.filename.clone(),
                tag: binding.tag.clone(),
                handle: binding.handle.clone(),
                role,
                placement,
                motion,
            });
        }

        if output == OutputKind::Animation
            && !slideshow
            && !motion_resolved
            && rules::movement_intent(prompt)
        {
            return Err(TagcanvasError::AmbiguousDirective(
                "movement was requested but no recognized motion phrase resolves it".to_string(),
            )
            .into());
        }

        // base layers composite underneath; mention order is preserved
        // within each role by the stable sort
        layers.sort_by_key(|layer| match layer.role {
            Role::Base => 0,
            Role::Overlay => 1,
        });

        let animation = (output == OutputKind::Animation).then(|| {
            if slideshow {
                AnimationSpec {
                    style: AnimationStyle::Slideshow,
                    // one frame per layer plus a closing blank frame
                    frame_count: layers.len() as u32 + 1,
                    frame_duration_ms: rules::frame_duration(prompt)
                        .map(|hit| hit.value)
                        .unwrap_or(self.config.slideshow_frame_ms),
                }
            } else {
                AnimationSpec {
                    style: AnimationStyle::Motion,
                    frame_count: self.config.frame_count,
                    frame_duration_ms: self.config.motion_frame_ms,
                }
            }
        });

        tracing::debug!(
            canvas = %canvas,
            layers = layers.len(),
            animated = animation.is_some(),
            "directive compiled"
        );

        Ok(GenerationDirective {
            output,
            canvas,
            background,
            layers,
            animation,
            prompt: prompt.to_string(),
        })
    }
}

/// Cue text for each tag occurrence
///
/// The clause for occurrence `i` runs from the end of its token to the
/// start of the next token (or the end of the prompt). Text before the
/// first token belongs to the first occurrence, so leading phrasing like
/// "the background is @BG" still lands on the right tag.
fn clause_windows(prompt: &str, count: usize) -> Vec<String> {
    let occurrences = tag_occurrences(prompt);
    let mut clauses = Vec::with_capacity(count);
    for i in 0..count.min(occurrences.len()) {
        let start = occurrences[i].span.1;
        let end = occurrences
            .get(i + 1)
            .map(|next| next.span.0)
            .unwrap_or(prompt.len());
        let mut clause = String::new();
        if i == 0 {
            clause.push_str(&prompt[..occurrences[0].span.0]);
        }
        clause.push_str(&prompt[start..end]);
        clauses.push(clause);
    }
    // one clause per binding, even if the occurrence scan came up short
    clauses.resize(count, String::new());
    clauses
}

/// Resolve per-layer roles from explicit cues and positional defaults
///
/// Explicit cues always win. Among the layers without a cue, the first
/// becomes the base only when no other layer claimed it explicitly;
/// everything else overlays in mention order.
fn assign_roles(explicit: &[Option<Role>]) -> Vec<Role> {
    let base_claimed = explicit.iter().any(|role| *role == Some(Role::Base));
    let mut default_base_given = base_claimed;
    explicit
        .iter()
        .map(|role| match role {
            Some(role) => *role,
            None if !default_base_given => {
                default_base_given = true;
                Role::Base
            }
            None => Role::Overlay,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::StorageHandle;

    fn bindings_for(tags: &[&str]) -> Vec<TagBinding> {
        tags.iter()
            .map(|tag| TagBinding {
                tag: tag.to_string(),
                filename: format!("{tag}.png"),
                handle: StorageHandle::new(format!("mem://test/{tag}.png")),
            })
            .collect()
    }

    fn compiler() -> Compiler {
        Compiler::new(CompilerConfig::default())
    }

    #[test]
    fn test_background_and_front_roles() {
        let prompt = "Set @BG as background and @logo as front image";
        let directive = compiler()
            .compile(prompt, &bindings_for(&["BG", "logo"]), OutputKind::Image)
            .unwrap();

        assert_eq!(directive.canvas, CanvasSize::new(1080, 1080));
        assert_eq!(directive.background, Rgb::WHITE);
        assert_eq!(directive.layers.len(), 2);
        assert_eq!(directive.layers[0].tag, "BG");
        assert_eq!(directive.layers[0].role, Role::Base);
        assert_eq!(directive.layers[0].placement, Placement::Fill);
        assert_eq!(directive.layers[1].tag, "logo");
        assert_eq!(directive.layers[1].role, Role::Overlay);
        assert_eq!(directive.layers[1].placement, Placement::Center);
        assert!(directive.animation.is_none());
        assert_eq!(directive.prompt, prompt);
    }

    #[test]
    fn test_mention_order_defaults() {
        let directive = compiler()
            .compile(
                "Combine @photo with @logo",
                &bindings_for(&["photo", "logo"]),
                OutputKind::Image,
            )
            .unwrap();
        assert_eq!(directive.layers[0].role, Role::Base);
        assert_eq!(directive.layers[1].role, Role::Overlay);
    }

    #[test]
    fn test_explicit_base_later_in_mention_order() {
        // @logo is mentioned first but @photo explicitly claims the base
        let directive = compiler()
            .compile(
                "Put @logo over @photo as background",
                &bindings_for(&["logo", "photo"]),
                OutputKind::Image,
            )
            .unwrap();
        // base layers sort underneath
        assert_eq!(directive.layers[0].tag, "photo");
        assert_eq!(directive.layers[0].role, Role::Base);
        assert_eq!(directive.layers[1].tag, "logo");
        assert_eq!(directive.layers[1].role, Role::Overlay);
    }

    #[test]
    fn test_third_layer_stacks_in_mention_order() {
        let directive = compiler()
            .compile(
                "Use @BG as background, @a on the left and @b on the right",
                &bindings_for(&["BG", "a", "b"]),
                OutputKind::Image,
            )
            .unwrap();
        assert_eq!(directive.layers[1].tag, "a");
        assert_eq!(directive.layers[1].placement, Placement::Left);
        assert_eq!(directive.layers[2].tag, "b");
        assert_eq!(directive.layers[2].placement, Placement::Right);
    }

    #[test]
    fn test_explicit_dimensions_beat_preset() {
        let directive = compiler()
            .compile(
                "A landscape scene with @BG at 800x600",
                &bindings_for(&["BG"]),
                OutputKind::Image,
            )
            .unwrap();
        assert_eq!(directive.canvas, CanvasSize::new(800, 600));
    }

    #[test]
    fn test_preset_dimensions_used() {
        let directive = compiler()
            .compile(
                "A portrait shot of @photo",
                &bindings_for(&["photo"]),
                OutputKind::Image,
            )
            .unwrap();
        assert_eq!(directive.canvas, CanvasSize::new(1080, 1920));
    }

    #[test]
    fn test_background_color_extracted() {
        let directive = compiler()
            .compile(
                "Put @logo on a red background",
                &bindings_for(&["logo"]),
                OutputKind::Image,
            )
            .unwrap();
        assert_eq!(directive.background, Rgb(255, 0, 0));
    }

    #[test]
    fn test_motion_animation() {
        let directive = compiler()
            .compile(
                "Set @BG as background with @logo moving left to right",
                &bindings_for(&["BG", "logo"]),
                OutputKind::Animation,
            )
            .unwrap();

        let animation = directive.animation.unwrap();
        assert_eq!(animation.style, AnimationStyle::Motion);
        assert_eq!(animation.frame_count, 10);
        assert_eq!(animation.frame_duration_ms, 500);

        let logo = directive.layers.iter().find(|l| l.tag == "logo").unwrap();
        assert_eq!(
            logo.motion,
            Some(Motion::Slide {
                direction: Direction::LeftToRight
            })
        );
        let bg = directive.layers.iter().find(|l| l.tag == "BG").unwrap();
        assert!(bg.motion.is_none());
    }

    #[test]
    fn test_unrecognized_movement_is_ambiguous() {
        let err = compiler()
            .compile(
                "Make @logo move around somehow",
                &bindings_for(&["logo"]),
                OutputKind::Animation,
            )
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TagcanvasError>(),
            Some(TagcanvasError::AmbiguousDirective(_))
        ));
    }

    #[test]
    fn test_movement_words_ignored_for_static_output() {
        let directive = compiler()
            .compile(
                "Make @logo move around somehow",
                &bindings_for(&["logo"]),
                OutputKind::Image,
            )
            .unwrap();
        assert!(directive.animation.is_none());
    }

    #[test]
    fn test_no_motion_words_defaults_to_static_animation() {
        let directive = compiler()
            .compile(
                "Show @BG behind @logo",
                &bindings_for(&["BG", "logo"]),
                OutputKind::Animation,
            )
            .unwrap();
        assert!(directive.layers.iter().all(|l| l.motion.is_none()));
        assert_eq!(directive.animation.unwrap().style, AnimationStyle::Motion);
    }

    #[test]
    fn test_explicit_hold_satisfies_movement_intent() {
        let directive = compiler()
            .compile(
                "Animate it: keep @BG stable",
                &bindings_for(&["BG"]),
                OutputKind::Animation,
            )
            .unwrap();
        assert!(directive.layers[0].motion.is_none());
    }

    #[test]
    fn test_slideshow_animation() {
        let directive = compiler()
            .compile(
                "A presentation of @a and @b, 3 seconds each",
                &bindings_for(&["a", "b"]),
                OutputKind::Animation,
            )
            .unwrap();

        let animation = directive.animation.unwrap();
        assert_eq!(animation.style, AnimationStyle::Slideshow);
        assert_eq!(animation.frame_count, 3);
        assert_eq!(animation.frame_duration_ms, 3000);
        assert!(directive
            .layers
            .iter()
            .all(|l| l.role == Role::Overlay && l.placement == Placement::Center));
    }

    #[test]
    fn test_slideshow_default_pacing() {
        let directive = compiler()
            .compile(
                "Show @a and @b one by one",
                &bindings_for(&["a", "b"]),
                OutputKind::Animation,
            )
            .unwrap();
        assert_eq!(directive.animation.unwrap().frame_duration_ms, 2000);
    }

    #[test]
    fn test_duplicate_tag_occurrences_layer_twice() {
        let directive = compiler()
            .compile(
                "Tile @logo beside @logo",
                &bindings_for(&["logo", "logo"]),
                OutputKind::Image,
            )
            .unwrap();
        assert_eq!(directive.layers.len(), 2);
        assert_eq!(directive.layers[0].role, Role::Base);
        assert_eq!(directive.layers[1].role, Role::Overlay);
    }

    #[test]
    fn test_leading_clause_attaches_to_first_tag() {
        let directive = compiler()
            .compile(
                "The background is @wall with @art in the middle",
                &bindings_for(&["wall", "art"]),
                OutputKind::Image,
            )
            .unwrap();
        assert_eq!(directive.layers[0].tag, "wall");
        assert_eq!(directive.layers[0].role, Role::Base);
        assert_eq!(directive.layers[1].placement, Placement::Center);
    }
}
