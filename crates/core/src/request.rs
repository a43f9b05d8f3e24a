//! Vendor-neutral generation requests and their per-use-case builders.
//!
//! Every builder is pure: all media must already be resolved, and the same
//! inputs always produce an identical [`GenerationRequest`]. Attachment
//! order is significant because vendors apply positional semantics to it.

use serde::{Deserialize, Serialize};

use crate::media::Media;

/// One instruction plus an ordered list of attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub instruction: String,
    pub attachments: Vec<Media>,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>, attachments: Vec<Media>) -> Self {
        Self {
            instruction: instruction.into(),
            attachments,
        }
    }

    /// Total attachment bytes, for logging.
    pub fn attachment_bytes(&self) -> usize {
        self.attachments.iter().map(|m| m.payload.len()).sum()
    }
}

/// A standalone creative asset described by text, optionally guided by a
/// reference image (zero or one attachment).
///
/// Callers reject a blank prompt without a reference before building this
/// (see `Seed::has_design_input`); it would yield a request with no subject.
pub fn design_from_prompt(instruction_text: &str, reference: Option<&Media>) -> GenerationRequest {
    let text = instruction_text.trim();
    let instruction = match (text.is_empty(), reference.is_some()) {
        (true, true) => "Create a standalone, print-ready artwork inspired by the attached \
                         reference image. Use a clean or transparent background and no mockup."
            .to_string(),
        (false, true) => format!(
            "Create a standalone, print-ready artwork: {text}. Use the attached image as a \
             style and composition reference. Use a clean or transparent background and no mockup."
        ),
        _ => format!(
            "Create a standalone, print-ready artwork: {text}. Use a clean or transparent \
             background and no mockup."
        ),
    };
    GenerationRequest::new(instruction, reference.cloned().into_iter().collect())
}

/// Place `subject` into the scene shown by `base`.
///
/// The receiving context is always the first attachment, the subject the
/// second.
pub fn composite_onto(instruction_text: &str, base: &Media, subject: &Media) -> GenerationRequest {
    let mut instruction = String::from(
        "Place the product from the second image naturally into the scene from the first image. \
         Match the scene's lighting, shadows, scale and perspective so the product looks \
         photographed in place.",
    );
    let extra = instruction_text.trim();
    if !extra.is_empty() {
        instruction.push(' ');
        instruction.push_str(extra);
    }
    GenerationRequest::new(instruction, vec![base.clone(), subject.clone()])
}

/// Show `design` printed on the physical product in `target`.
pub fn mockup_of(design: &Media, target: &Media, target_label: &str) -> GenerationRequest {
    let label = target_label.trim();
    let instruction = format!(
        "Create a realistic product mockup of the {label} shown in the second image with the \
         design from the first image printed on it. Keep the {label}'s shape, material and \
         colour, and apply the design with correct curvature, folds and lighting."
    );
    GenerationRequest::new(instruction, vec![design.clone(), target.clone()])
}

/// Re-photograph `subject` from a specific angle or context.
pub fn perspective_of(
    subject: &Media,
    subject_label: &str,
    variant_description: &str,
) -> GenerationRequest {
    let instruction = format!(
        "Generate a professional product photograph of the {} from the attached image, {}. \
         Keep the product identical in design, colour and proportions.",
        subject_label.trim(),
        variant_description.trim()
    );
    GenerationRequest::new(instruction, vec![subject.clone()])
}

/// Render a storefront concept in one visual style.
pub fn styled_preview_of(
    concept_text: &str,
    style_label: &str,
    reference: Option<&Media>,
) -> GenerationRequest {
    let mut instruction = format!(
        "Design a storefront homepage preview for: {}. Visual style: {}. Show a hero banner, \
         navigation and featured products.",
        concept_text.trim(),
        style_label.trim()
    );
    if reference.is_some() {
        instruction.push_str(" Use the attached image as the brand reference.");
    }
    GenerationRequest::new(instruction, reference.cloned().into_iter().collect())
}
