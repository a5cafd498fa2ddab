use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a lowercase tag does not name any variant of a category.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {category}: {value:?}")]
pub struct ParseCategoryError {
    pub category: &'static str,
    pub value: String,
}

/// Declares a closed categorical enum with its lowercase tags, in order.
macro_rules! categorical {
    (
        $(#[$meta:meta])*
        $name:ident ($category:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $tag),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseCategoryError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok($name::$variant),)+
                    _ => Err(ParseCategoryError {
                        category: $category,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

categorical! {
    /// Overall facial proportions.
    FaceShape("face shape") {
        Oval => "oval",
        Round => "round",
        Square => "square",
        Heart => "heart",
        Oblong => "oblong",
        Diamond => "diamond",
        Triangle => "triangle",
    }
}

categorical! {
    EyeDistance("eye distance") {
        Close => "close",
        Average => "average",
        Wide => "wide",
    }
}

categorical! {
    EyeShape("eye shape") {
        Round => "round",
        Almond => "almond",
        Hooded => "hooded",
        Monolid => "monolid",
        Downturned => "downturned",
        Upturned => "upturned",
    }
}

categorical! {
    NoseBridge("nose bridge") {
        Narrow => "narrow",
        Average => "average",
        Wide => "wide",
    }
}

categorical! {
    LipFullness("lip fullness") {
        Thin => "thin",
        Average => "average",
        Full => "full",
    }
}

categorical! {
    Cheekbones("cheekbones") {
        High => "high",
        Average => "average",
        Low => "low",
    }
}

categorical! {
    Jawline("jawline") {
        Defined => "defined",
        Average => "average",
        Soft => "soft",
    }
}

categorical! {
    ForeheadHeight("forehead height") {
        Short => "short",
        Average => "average",
        Tall => "tall",
    }
}

categorical! {
    /// Context a recommendation set is tailored to.
    ///
    /// `ALL` is the order in which recommendation sets are always produced.
    Occasion("occasion") {
        Everyday => "everyday",
        Evening => "evening",
        Corporate => "corporate",
        Casual => "casual",
        Romantic => "romantic",
        Photoshoot => "photoshoot",
    }
}

impl Occasion {
    /// Short label for occasion pickers.
    pub fn display_name(self) -> &'static str {
        match self {
            Occasion::Everyday => "Everyday",
            Occasion::Evening => "Evening",
            Occasion::Corporate => "Work",
            Occasion::Casual => "Casual",
            Occasion::Romantic => "Romantic",
            Occasion::Photoshoot => "Photoshoot",
        }
    }
}

categorical! {
    ProductType("product type") {
        Foundation => "foundation",
        Concealer => "concealer",
        Blush => "blush",
        Bronzer => "bronzer",
        Eyeshadow => "eyeshadow",
        Eyeliner => "eyeliner",
        Mascara => "mascara",
        Lipstick => "lipstick",
        Highlighter => "highlighter",
        Contour => "contour",
    }
}

/// Categorical summary of one detected face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FacialFeatures {
    pub face_shape: FaceShape,
    pub eye_distance: EyeDistance,
    pub eye_shape: EyeShape,
    pub nose_bridge: NoseBridge,
    pub lip_fullness: LipFullness,
    pub cheekbones: Cheekbones,
    pub jawline: Jawline,
    pub forehead_height: ForeheadHeight,
}

/// One product entry within an occasion's routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeupRecommendation {
    pub product_type: ProductType,
    pub technique: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Full routine for a single occasion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccasionRecommendations {
    pub occasion: Occasion,
    pub title: String,
    pub description: String,
    pub products: Vec<MakeupRecommendation>,
}

impl OccasionRecommendations {
    /// The entry for `product`, if this routine includes it.
    pub fn product(&self, product: ProductType) -> Option<&MakeupRecommendation> {
        self.products.iter().find(|p| p.product_type == product)
    }
}

/// Number of occasions; every recommendation set has exactly this many entries.
pub const OCCASION_COUNT: usize = 6;

/// The six routines produced together from one `FacialFeatures`, in `Occasion::ALL` order.
pub type RecommendationSet = [OccasionRecommendations; OCCASION_COUNT];
