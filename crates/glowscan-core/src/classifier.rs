//! Landmark geometry → categorical facial features.
//!
//! Face shape and eye distance are measured. The remaining fields are each
//! produced by an independent analyzer function that currently returns a
//! fixed default; swap any of them with the `with_*` builders.

use crate::landmarks::{regions, LandmarkSet};
use crate::types::{
    Cheekbones, EyeDistance, EyeShape, FaceShape, FacialFeatures, ForeheadHeight, Jawline,
    LipFullness, NoseBridge,
};
use serde::{Deserialize, Serialize};

const EYE_DISTANCE_CLOSE: f32 = 0.15;
const EYE_DISTANCE_WIDE: f32 = 0.2;

/// Per-field analyzer: reads the landmark set, returns one category.
pub type FieldAnalyzer<T> = fn(&LandmarkSet) -> T;

/// Which landmarks define face width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceWidthSampling {
    /// Distinct left and right cheekbone landmarks.
    #[default]
    Cheekbones,
    /// One lower-jaw landmark sampled for both sides. The width is always
    /// zero, so face shape depends only on the jaw/forehead ratio. Kept to
    /// reproduce results of older builds.
    Legacy,
}

/// Raw proportions measured from a landmark set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceRatios {
    pub width_to_height: f32,
    pub jaw_to_forehead: f32,
}

impl FaceRatios {
    pub fn measure(landmarks: &LandmarkSet, sampling: FaceWidthSampling) -> Self {
        let face_width = match sampling {
            FaceWidthSampling::Cheekbones => {
                landmarks.distance(regions::CHEEK_LEFT, regions::CHEEK_RIGHT)
            }
            FaceWidthSampling::Legacy => {
                landmarks.distance(regions::LEGACY_CHEEK, regions::LEGACY_CHEEK)
            }
        };
        let face_height = landmarks.distance(regions::FOREHEAD_TOP, regions::CHIN);
        let jaw_width = landmarks.distance(regions::JAW_LEFT, regions::JAW_RIGHT);
        let forehead_width = landmarks.distance(regions::FOREHEAD_TOP, regions::FOREHEAD_RIGHT);

        Self {
            width_to_height: face_width / face_height,
            jaw_to_forehead: jaw_width / forehead_width,
        }
    }
}

impl FaceShape {
    /// Ordered decision table; the first matching rule wins.
    ///
    /// Ranges overlap, so reordering the arms changes results. `Diamond`
    /// is shadowed by `Heart` and cannot currently be produced.
    pub fn from_ratios(width_to_height: f32, jaw_to_forehead: f32) -> Self {
        let w = width_to_height;
        let j = jaw_to_forehead;

        if (0.8..0.85).contains(&w) && j > 0.75 {
            FaceShape::Oval
        } else if w >= 0.85 && j > 0.9 {
            FaceShape::Round
        } else if w < 0.8 && j > 0.9 {
            FaceShape::Square
        } else if w < 0.8 && j < 0.8 {
            FaceShape::Heart
        } else if w < 0.75 {
            FaceShape::Oblong
        } else if (0.75..0.8).contains(&w) && j < 0.8 {
            FaceShape::Diamond
        } else {
            FaceShape::Triangle
        }
    }
}

impl EyeDistance {
    /// Both bounds are exclusive: 0.15 and 0.2 are `Average`.
    pub fn from_distance(distance: f32) -> Self {
        if distance < EYE_DISTANCE_CLOSE {
            EyeDistance::Close
        } else if distance > EYE_DISTANCE_WIDE {
            EyeDistance::Wide
        } else {
            EyeDistance::Average
        }
    }
}

/// Distance between the two eye centroids.
pub fn eye_centroid_distance(landmarks: &LandmarkSet) -> f32 {
    let left = landmarks.centroid(&regions::LEFT_EYE);
    let right = landmarks.centroid(&regions::RIGHT_EYE);
    left.distance(&right)
}

pub fn default_eye_shape(_: &LandmarkSet) -> EyeShape {
    EyeShape::Almond
}

pub fn default_nose_bridge(_: &LandmarkSet) -> NoseBridge {
    NoseBridge::Average
}

pub fn default_lip_fullness(_: &LandmarkSet) -> LipFullness {
    LipFullness::Average
}

pub fn default_cheekbones(_: &LandmarkSet) -> Cheekbones {
    Cheekbones::Average
}

pub fn default_jawline(_: &LandmarkSet) -> Jawline {
    Jawline::Average
}

pub fn default_forehead_height(_: &LandmarkSet) -> ForeheadHeight {
    ForeheadHeight::Average
}

/// Stateless feature classifier.
#[derive(Debug, Clone, Copy)]
pub struct FeatureClassifier {
    face_width: FaceWidthSampling,
    eye_shape: FieldAnalyzer<EyeShape>,
    nose_bridge: FieldAnalyzer<NoseBridge>,
    lip_fullness: FieldAnalyzer<LipFullness>,
    cheekbones: FieldAnalyzer<Cheekbones>,
    jawline: FieldAnalyzer<Jawline>,
    forehead_height: FieldAnalyzer<ForeheadHeight>,
}

impl Default for FeatureClassifier {
    fn default() -> Self {
        Self {
            face_width: FaceWidthSampling::default(),
            eye_shape: default_eye_shape,
            nose_bridge: default_nose_bridge,
            lip_fullness: default_lip_fullness,
            cheekbones: default_cheekbones,
            jawline: default_jawline,
            forehead_height: default_forehead_height,
        }
    }
}

impl FeatureClassifier {
    pub fn new(face_width: FaceWidthSampling) -> Self {
        Self {
            face_width,
            ..Self::default()
        }
    }

    pub fn face_width(&self) -> FaceWidthSampling {
        self.face_width
    }

    pub fn with_eye_shape(mut self, analyzer: FieldAnalyzer<EyeShape>) -> Self {
        self.eye_shape = analyzer;
        self
    }

    pub fn with_nose_bridge(mut self, analyzer: FieldAnalyzer<NoseBridge>) -> Self {
        self.nose_bridge = analyzer;
        self
    }

    pub fn with_lip_fullness(mut self, analyzer: FieldAnalyzer<LipFullness>) -> Self {
        self.lip_fullness = analyzer;
        self
    }

    pub fn with_cheekbones(mut self, analyzer: FieldAnalyzer<Cheekbones>) -> Self {
        self.cheekbones = analyzer;
        self
    }

    pub fn with_jawline(mut self, analyzer: FieldAnalyzer<Jawline>) -> Self {
        self.jawline = analyzer;
        self
    }

    pub fn with_forehead_height(mut self, analyzer: FieldAnalyzer<ForeheadHeight>) -> Self {
        self.forehead_height = analyzer;
        self
    }

    pub fn face_shape(&self, landmarks: &LandmarkSet) -> FaceShape {
        let ratios = FaceRatios::measure(landmarks, self.face_width);
        let shape = FaceShape::from_ratios(ratios.width_to_height, ratios.jaw_to_forehead);
        tracing::trace!(
            width_to_height = ratios.width_to_height,
            jaw_to_forehead = ratios.jaw_to_forehead,
            %shape,
            "face shape measured"
        );
        shape
    }

    pub fn classify(&self, landmarks: &LandmarkSet) -> FacialFeatures {
        FacialFeatures {
            face_shape: self.face_shape(landmarks),
            eye_distance: EyeDistance::from_distance(eye_centroid_distance(landmarks)),
            eye_shape: (self.eye_shape)(landmarks),
            nose_bridge: (self.nose_bridge)(landmarks),
            lip_fullness: (self.lip_fullness)(landmarks),
            cheekbones: (self.cheekbones)(landmarks),
            jawline: (self.jawline)(landmarks),
            forehead_height: (self.forehead_height)(landmarks),
        }
    }
}

/// Classify with the default analyzers and cheekbone width sampling.
pub fn classify(landmarks: &LandmarkSet) -> FacialFeatures {
    FeatureClassifier::default().classify(landmarks)
}
