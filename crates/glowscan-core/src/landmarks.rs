//! Face-mesh landmark sets and the geometry used by the classifier.
//!
//! Points are normalized to `[0, 1]` image space and indexed by the
//! 468-point face-mesh topology (478 when iris refinement is enabled).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of points in a well-formed set.
pub const FACE_MESH_POINTS: usize = 468;

/// Anatomical index groups of the face-mesh topology.
pub mod regions {
    /// Face outline, clockwise from the top of the forehead.
    pub const FACE_OVAL: [usize; 36] = [
        10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377,
        152, 148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
    ];
    pub const LEFT_EYE: [usize; 16] = [
        362, 382, 381, 380, 374, 373, 390, 249, 263, 466, 388, 387, 386, 385, 384, 398,
    ];
    pub const RIGHT_EYE: [usize; 16] = [
        33, 7, 163, 144, 145, 153, 154, 155, 133, 173, 157, 158, 159, 160, 161, 246,
    ];
    pub const FOREHEAD: [usize; 4] = [10, 338, 297, 332];
    pub const JAWLINE: [usize; 12] = [127, 234, 93, 132, 58, 172, 136, 150, 149, 176, 148, 152];

    pub const FOREHEAD_TOP: usize = FOREHEAD[0];
    pub const FOREHEAD_RIGHT: usize = FOREHEAD[3];
    pub const CHIN: usize = FACE_OVAL[19];
    pub const JAW_LEFT: usize = JAWLINE[0];
    pub const JAW_RIGHT: usize = JAWLINE[11];
    /// Widest points of the face at cheekbone height.
    pub const CHEEK_LEFT: usize = 234;
    pub const CHEEK_RIGHT: usize = 454;
    /// Lower-jaw outline point that older builds sampled for both cheeks.
    pub const LEGACY_CHEEK: usize = FACE_OVAL[21];
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandmarkError {
    #[error("landmark set too small: expected at least {expected} points, got {actual}")]
    TooFewPoints { expected: usize, actual: usize },
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// A single normalized keypoint. `z` is relative depth and may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance in the image plane.
    pub fn distance(&self, other: &Landmark) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// A validated face-mesh landmark set.
///
/// Only constructible through [`LandmarkSet::new`] (or deserialization, which
/// runs the same checks), so every index of the topology is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet {
    points: Vec<Landmark>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Landmark>) -> Result<Self, LandmarkError> {
        if points.len() < FACE_MESH_POINTS {
            return Err(LandmarkError::TooFewPoints {
                expected: FACE_MESH_POINTS,
                actual: points.len(),
            });
        }
        if let Some(index) = points
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(LandmarkError::NonFinite { index });
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Point at a topology index. Indices below `FACE_MESH_POINTS` always exist.
    pub fn point(&self, index: usize) -> Landmark {
        self.points[index]
    }

    /// Distance between two indexed points.
    pub fn distance(&self, a: usize, b: usize) -> f32 {
        self.points[a].distance(&self.points[b])
    }

    /// Mean position of a group of indexed points.
    pub fn centroid(&self, indices: &[usize]) -> Landmark {
        if indices.is_empty() {
            return Landmark::default();
        }
        let (sx, sy) = indices.iter().fold((0.0f32, 0.0f32), |(sx, sy), &i| {
            (sx + self.points[i].x, sy + self.points[i].y)
        });
        let n = indices.len() as f32;
        Landmark::new(sx / n, sy / n)
    }

    /// Build a set whose measured proportions match `proportions`.
    ///
    /// All points not involved in classification sit at the image center.
    /// Used by the synthetic detector and in tests.
    pub fn synthetic(proportions: &FaceProportions) -> Self {
        use regions::*;

        const HEIGHT: f32 = 0.5;
        const FOREHEAD_WIDTH: f32 = 0.2;
        const TOP: f32 = 0.2;

        let mut points = vec![Landmark::new(0.5, 0.5); FACE_MESH_POINTS];
        let width = proportions.width_to_height * HEIGHT;
        let jaw = proportions.jaw_to_forehead * FOREHEAD_WIDTH;

        points[FOREHEAD_TOP] = Landmark::new(0.5, TOP);
        points[FOREHEAD_RIGHT] = Landmark::new(0.5 + FOREHEAD_WIDTH, TOP);
        points[CHIN] = Landmark::new(0.5, TOP + HEIGHT);
        points[CHEEK_LEFT] = Landmark::new(0.5 - width / 2.0, 0.45);
        points[CHEEK_RIGHT] = Landmark::new(0.5 + width / 2.0, 0.45);
        points[JAW_RIGHT] = Landmark::new(0.5, 0.8);
        points[JAW_LEFT] = Landmark::new(0.5 - jaw, 0.8);

        let half_gap = proportions.eye_distance / 2.0;
        for &i in &LEFT_EYE {
            points[i] = Landmark::new(0.5 + half_gap, 0.4);
        }
        for &i in &RIGHT_EYE {
            points[i] = Landmark::new(0.5 - half_gap, 0.4);
        }

        Self { points }
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = LandmarkError;

    fn try_from(points: Vec<Landmark>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

/// Target measurements for [`LandmarkSet::synthetic`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceProportions {
    /// Cheekbone width over forehead-to-chin height.
    pub width_to_height: f32,
    /// Jaw width over forehead width.
    pub jaw_to_forehead: f32,
    /// Distance between the eye centroids.
    pub eye_distance: f32,
}

impl Default for FaceProportions {
    fn default() -> Self {
        Self {
            width_to_height: 0.82,
            jaw_to_forehead: 0.8,
            eye_distance: 0.17,
        }
    }
}
