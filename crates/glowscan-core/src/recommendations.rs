//! Facial features → per-occasion makeup routines.
//!
//! Face-shape and eye-shape guidance come from two static tables; each
//! occasion builder picks a fixed, ordered product list and fills the
//! table-driven entries from them. Everything else is occasion-specific
//! literal text.

use crate::types::{
    EyeShape, FaceShape, FacialFeatures, MakeupRecommendation, Occasion, OccasionRecommendations,
    ProductType, RecommendationSet,
};

/// Complexion guidance for one face shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceShapeGuide {
    pub foundation: &'static str,
    pub blush: &'static str,
    pub bronzer: &'static str,
    pub highlighter: &'static str,
    pub contour: &'static str,
}

/// Eye guidance for one eye shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeShapeGuide {
    pub eyeshadow: &'static str,
    pub eyeliner: &'static str,
}

pub fn face_shape_guide(shape: FaceShape) -> FaceShapeGuide {
    match shape {
        FaceShape::Oval => FaceShapeGuide {
            foundation: "Light to medium coverage applied evenly.",
            blush: "Apply blush to the apples of the cheeks for a natural flush.",
            bronzer: "Light bronzer around the perimeter of the face.",
            highlighter: "Apply to the high points of the cheekbones and the center of the forehead.",
            contour: "Minimal contouring needed; focus on subtle definition.",
        },
        FaceShape::Round => FaceShapeGuide {
            foundation: "Medium coverage foundation for an even complexion.",
            blush: "Sweep blush toward the temples to elongate the face.",
            bronzer: "Apply bronzer along the jawline and temples to create definition.",
            highlighter: "Highlight the center of the forehead and chin to lengthen the face.",
            contour: "Contour the sides of the face and under the cheekbones to slim the face.",
        },
        FaceShape::Square => FaceShapeGuide {
            foundation: "Even coverage, softened around the jawline.",
            blush: "Apply blush in circular motions on the apples of the cheeks to soften angles.",
            bronzer: "Apply bronzer to the temples and jawline, blending softly.",
            highlighter: "Highlight the center of the forehead and chin to balance a strong jaw.",
            contour: "Soft contour along the jawline to soften the angles.",
        },
        FaceShape::Heart => FaceShapeGuide {
            foundation: "Even coverage with a focus on a soft finish.",
            blush: "Apply blush horizontally across the cheeks to widen the lower face.",
            bronzer: "Apply bronzer to the temples and hairline to balance the forehead.",
            highlighter: "Highlight the center of the chin and the cheekbones.",
            contour: "Contour the temples to reduce forehead width.",
        },
        FaceShape::Oblong => FaceShapeGuide {
            foundation: "Even coverage with dimension at the forehead and chin.",
            blush: "Apply blush horizontally across the cheeks to create width.",
            bronzer: "Apply bronzer to the top of the forehead and base of the chin to shorten the face.",
            highlighter: "Highlight horizontally across the cheekbones.",
            contour: "Contour the top of the forehead and the base of the chin.",
        },
        FaceShape::Diamond => FaceShapeGuide {
            foundation: "Even coverage with softness on the cheekbones.",
            blush: "Apply blush in rounded motions on the cheeks to soften angles.",
            bronzer: "Apply bronzer to the temples and along the jawline to balance face width.",
            highlighter: "Highlight forehead and chin to balance cheekbone width.",
            contour: "Contour cheekbones lightly to soften their prominence.",
        },
        FaceShape::Triangle => FaceShapeGuide {
            foundation: "Even coverage focusing on smoothness.",
            blush: "Apply blush at the top of the cheekbones to lift the face.",
            bronzer: "Apply bronzer along the jawline to minimize width.",
            highlighter: "Highlight the center of the forehead and the cheekbones.",
            contour: "Contour the sides of the jawline to reduce width and balance the face.",
        },
    }
}

pub fn eye_shape_guide(shape: EyeShape) -> EyeShapeGuide {
    match shape {
        EyeShape::Round => EyeShapeGuide {
            eyeshadow: "Apply darker shadow to the outer corner to elongate the eyes.",
            eyeliner: "Winged liner to extend the eye shape.",
        },
        EyeShape::Almond => EyeShapeGuide {
            eyeshadow: "Most eyeshadow styles work well; focus on enhancing the natural shape.",
            eyeliner: "Thin line along the lash line with a small wing.",
        },
        EyeShape::Hooded => EyeShapeGuide {
            eyeshadow: "Concentrate color on the lid and blend upward. Use matte shades.",
            eyeliner: "Thin line close to the lashes, slightly thicker at the outer edge.",
        },
        EyeShape::Monolid => EyeShapeGuide {
            eyeshadow: "Create dimension with a color gradient, darkest at the lash line.",
            eyeliner: "Thick liner to define the eye shape.",
        },
        EyeShape::Downturned => EyeShapeGuide {
            eyeshadow: "Concentrate darker colors on the outer corner and blend upward.",
            eyeliner: "Winged liner angled upward to lift the eyes.",
        },
        EyeShape::Upturned => EyeShapeGuide {
            eyeshadow: "Balance by adding depth along the outer lower lash line.",
            eyeliner: "Classic winged liner following the natural eye shape.",
        },
    }
}

fn product(
    product_type: ProductType,
    technique: &str,
    description: impl Into<String>,
) -> MakeupRecommendation {
    MakeupRecommendation {
        product_type,
        technique: technique.to_string(),
        description: description.into(),
        color: None,
        image_url: None,
    }
}

/// Occasion-specific lead sentence followed by the eye-table eyeshadow guidance.
fn eyeshadow_with(lead: &str, eye: &EyeShapeGuide) -> String {
    format!("{lead} {}", eye.eyeshadow)
}

fn everyday(face: &FaceShapeGuide, eye: &EyeShapeGuide) -> OccasionRecommendations {
    OccasionRecommendations {
        occasion: Occasion::Everyday,
        title: "Everyday Beauty".into(),
        description: "Fresh, natural makeup that enhances your features without overdoing it, perfect for daily wear.".into(),
        products: vec![
            product(ProductType::Foundation, "Light application", face.foundation),
            product(ProductType::Blush, "Natural flush", face.blush),
            product(ProductType::Eyeshadow, "Simple wash of color", eye.eyeshadow),
            product(ProductType::Mascara, "Light coat", "One or two coats for subtle definition."),
            product(
                ProductType::Lipstick,
                "Natural tint",
                "A sheer, neutral pink or mauve shade close to your natural lip color.",
            ),
        ],
    }
}

fn evening(face: &FaceShapeGuide, eye: &EyeShapeGuide) -> OccasionRecommendations {
    OccasionRecommendations {
        occasion: Occasion::Evening,
        title: "Evening Glam".into(),
        description: "Sophisticated, dramatic makeup that makes a statement for nights out and special events.".into(),
        products: vec![
            product(
                ProductType::Foundation,
                "Medium to full coverage",
                "Full coverage for a flawless finish that photographs well under evening lighting.",
            ),
            product(ProductType::Contour, "Defined contour", face.contour),
            product(
                ProductType::Eyeshadow,
                "Smoky eye or bold color",
                eyeshadow_with("Dramatic smoky eye with depth at the crease.", eye),
            ),
            product(ProductType::Eyeliner, "Precise definition", eye.eyeliner),
            product(
                ProductType::Lipstick,
                "Bold statement lip",
                "Rich, saturated color in deep berry, red, or plum depending on the event.",
            ),
            product(ProductType::Highlighter, "Targeted glow", face.highlighter),
        ],
    }
}

fn corporate(eye: &EyeShapeGuide) -> OccasionRecommendations {
    OccasionRecommendations {
        occasion: Occasion::Corporate,
        title: "Professional Look".into(),
        description: "Refined, subtle makeup that enhances your features while maintaining a professional appearance.".into(),
        products: vec![
            product(
                ProductType::Foundation,
                "Medium coverage",
                "Natural-looking coverage that lasts through long meetings.",
            ),
            product(
                ProductType::Eyeshadow,
                "Neutral palette",
                eyeshadow_with("Matte neutrals in taupe, brown, or gray tones.", eye),
            ),
            product(
                ProductType::Eyeliner,
                "Subtle definition",
                "Thin line in brown or gray, staying close to the lash line.",
            ),
            product(
                ProductType::Blush,
                "Subtle warmth",
                "Light application of neutral rose or peach tones.",
            ),
            product(
                ProductType::Lipstick,
                "Polished finish",
                "Neutral rose, mauve, or nude shades in a satin or matte finish.",
            ),
        ],
    }
}

fn casual() -> OccasionRecommendations {
    OccasionRecommendations {
        occasion: Occasion::Casual,
        title: "Effortless Casual".into(),
        description: "Quick, easy makeup that enhances your natural beauty for casual outings.".into(),
        products: vec![
            product(
                ProductType::Foundation,
                "Tinted moisturizer or BB cream",
                "Light coverage with skincare benefits for a natural look.",
            ),
            product(
                ProductType::Blush,
                "Fresh flush",
                "Cream blush applied to the apples of the cheeks for a natural glow.",
            ),
            product(
                ProductType::Mascara,
                "Defined lashes",
                "One coat for natural definition and to open up the eyes.",
            ),
            product(
                ProductType::Lipstick,
                "Tinted balm",
                "Hydrating lip balm with a hint of color for comfortable wear.",
            ),
        ],
    }
}

fn romantic(eye: &EyeShapeGuide) -> OccasionRecommendations {
    OccasionRecommendations {
        occasion: Occasion::Romantic,
        title: "Romantic Rendezvous".into(),
        description: "Soft, feminine makeup that creates a romantic and alluring look for dates and intimate occasions.".into(),
        products: vec![
            product(
                ProductType::Foundation,
                "Luminous finish",
                "Dewy foundation that creates a romantic glow.",
            ),
            product(
                ProductType::Blush,
                "Soft flush",
                "Soft pink or peachy tones blended up toward the temples.",
            ),
            product(
                ProductType::Eyeshadow,
                "Soft definition",
                eyeshadow_with("Soft rose gold, mauve, or bronze shades with subtle shimmer.", eye),
            ),
            product(
                ProductType::Eyeliner,
                "Subtle definition",
                "Soft, slightly smudged liner to create depth without harshness.",
            ),
            product(
                ProductType::Lipstick,
                "Kissable lips",
                "Creamy rose, pink, or berry tones in a satin finish.",
            ),
            product(
                ProductType::Highlighter,
                "Romantic glow",
                "Soft highlight on the cheekbones, cupid's bow, and inner corners of the eyes.",
            ),
        ],
    }
}

fn photoshoot(face: &FaceShapeGuide, eye: &EyeShapeGuide) -> OccasionRecommendations {
    OccasionRecommendations {
        occasion: Occasion::Photoshoot,
        title: "Camera Ready".into(),
        description: "Long-lasting, photogenic makeup that photographs beautifully for social media and professional shoots.".into(),
        products: vec![
            product(
                ProductType::Foundation,
                "Camera-ready base",
                "Long-wearing, photo-friendly foundation with careful blending.",
            ),
            product(ProductType::Contour, "Sculpted dimension", face.contour),
            product(
                ProductType::Eyeshadow,
                "Dimensional eye",
                eyeshadow_with("Well-blended shadows with a defined crease for depth.", eye),
            ),
            product(ProductType::Eyeliner, "Defined line", eye.eyeliner),
            product(
                ProductType::Mascara,
                "Volumized lashes",
                "Multiple coats for volume and length; consider false lashes for extra drama.",
            ),
            product(
                ProductType::Lipstick,
                "Precise application",
                "Well-defined lips with a long-wearing formula in a photogenic shade.",
            ),
            product(
                ProductType::Highlighter,
                "Strategic illumination",
                "Targeted highlight on the high points for dimension without looking oily on camera.",
            ),
        ],
    }
}

/// Build all six routines, in `Occasion::ALL` order.
pub fn recommend(features: &FacialFeatures) -> RecommendationSet {
    let face = face_shape_guide(features.face_shape);
    let eye = eye_shape_guide(features.eye_shape);

    [
        everyday(&face, &eye),
        evening(&face, &eye),
        corporate(&eye),
        casual(),
        romantic(&eye),
        photoshoot(&face, &eye),
    ]
}

/// The routine for `occasion` within a set.
pub fn find_occasion(
    set: &[OccasionRecommendations],
    occasion: Occasion,
) -> Option<&OccasionRecommendations> {
    set.iter().find(|r| r.occasion == occasion)
}
