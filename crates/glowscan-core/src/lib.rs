//! glowscan-core — Facial feature classification and makeup recommendations.
//!
//! Turns a face-mesh landmark set into categorical facial features, then maps
//! those features through static lookup tables into per-occasion routines.
//! Everything here is pure: no I/O, no shared state.

pub mod classifier;
pub mod landmarks;
pub mod recommendations;
pub mod types;

pub use classifier::{classify, FaceWidthSampling, FeatureClassifier};
pub use landmarks::{FaceProportions, Landmark, LandmarkError, LandmarkSet};
pub use recommendations::{find_occasion, recommend};
pub use types::{
    Cheekbones, EyeDistance, EyeShape, FaceShape, FacialFeatures, ForeheadHeight, Jawline,
    LipFullness, MakeupRecommendation, NoseBridge, Occasion, OccasionRecommendations,
    ParseCategoryError, ProductType, RecommendationSet, OCCASION_COUNT,
};
