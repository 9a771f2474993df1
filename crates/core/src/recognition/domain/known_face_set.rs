use crate::recognition::domain::face_detection::FaceCategory;
use crate::recognition::domain::face_matcher::Embedding;
use crate::shared::constants::{CRIMINAL_LABEL_PREFIX, UNKNOWN_LABEL};

/// Category a face can be enrolled under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnrolledCategory {
    Known,
    Criminal,
}

impl EnrolledCategory {
    /// Display label for an enrolled face: criminals carry a prefix.
    pub fn label_for(&self, name: &str) -> String {
        match self {
            EnrolledCategory::Known => name.to_string(),
            EnrolledCategory::Criminal => format!("{CRIMINAL_LABEL_PREFIX}{name}"),
        }
    }
}

impl From<EnrolledCategory> for FaceCategory {
    fn from(category: EnrolledCategory) -> Self {
        match category {
            EnrolledCategory::Known => FaceCategory::Known,
            EnrolledCategory::Criminal => FaceCategory::Criminal,
        }
    }
}

#[derive(Clone, Debug)]
pub struct KnownFace {
    pub label: String,
    pub category: EnrolledCategory,
    pub embedding: Embedding,
}

/// Result of matching one probe embedding against the set.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub label: String,
    pub category: FaceCategory,
    pub distance: Option<f64>,
}

impl Identity {
    pub fn unknown(distance: Option<f64>) -> Self {
        Self {
            label: UNKNOWN_LABEL.to_string(),
            category: FaceCategory::Unknown,
            distance,
        }
    }
}

/// Enrolled reference faces. Built once, read-only while the pipeline runs.
#[derive(Clone, Debug, Default)]
pub struct KnownFaceSet {
    faces: Vec<KnownFace>,
}

impl KnownFaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: String, category: EnrolledCategory, embedding: Embedding) {
        self.faces.push(KnownFace {
            label,
            category,
            embedding,
        });
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn faces(&self) -> &[KnownFace] {
        &self.faces
    }

    pub fn count(&self, category: EnrolledCategory) -> usize {
        self.faces.iter().filter(|f| f.category == category).count()
    }

    /// Nearest enrolled face, accepted only within `tolerance`.
    ///
    /// Ties resolve to the earliest enrolled entry.
    pub fn identify(&self, probe: &[f32], tolerance: f64) -> Identity {
        let best = self
            .faces
            .iter()
            .map(|face| (face, euclidean_distance(&face.embedding, probe)))
            .fold(None::<(&KnownFace, f64)>, |best, (face, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((face, d)),
            });

        match best {
            Some((face, distance)) if distance <= tolerance => Identity {
                label: face.label.clone(),
                category: face.category.into(),
                distance: Some(distance),
            },
            Some((_, distance)) => Identity::unknown(Some(distance)),
            None => Identity::unknown(None),
        }
    }
}

/// Embeddings of different lengths never match.
fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
