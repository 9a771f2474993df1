use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::recognition::domain::face_matcher::FaceMatcher;
use crate::recognition::domain::known_face_set::{EnrolledCategory, KnownFaceSet};
use crate::shared::constants::ENROLLMENT_EXTENSIONS;
use crate::shared::frame::Frame;

/// Why a single image was left out of the set.
#[derive(Clone, Debug, PartialEq)]
pub enum SkipReason {
    Undecodable(String),
    NoFace,
    Matcher(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Undecodable(e) => write!(f, "could not decode image: {e}"),
            SkipReason::NoFace => write!(f, "no face found"),
            SkipReason::Matcher(e) => write!(f, "face matcher failed: {e}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SkippedImage {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Outcome of enrolling one directory.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnrollmentReport {
    pub enrolled: Vec<String>,
    pub skipped: Vec<SkippedImage>,
    pub missing_directory: bool,
}

/// Builds a [`KnownFaceSet`] from directories of reference portraits.
///
/// Each image is downscaled before encoding and contributes the first face
/// the matcher finds; the file stem becomes the label. Nothing here is
/// fatal: bad files are skipped and reported.
pub struct EnrollFacesUseCase {
    matcher: Arc<dyn FaceMatcher>,
    scale: f64,
}

impl EnrollFacesUseCase {
    pub fn new(matcher: Arc<dyn FaceMatcher>, scale: f64) -> Self {
        Self { matcher, scale }
    }

    pub fn execute(
        &self,
        dir: &Path,
        category: EnrolledCategory,
        set: &mut KnownFaceSet,
    ) -> EnrollmentReport {
        let mut report = EnrollmentReport::default();

        let images = match list_images(dir) {
            Ok(images) => images,
            Err(e) => {
                log::warn!("Skipping enrollment from {}: {e}", dir.display());
                report.missing_directory = true;
                return report;
            }
        };

        for path in images {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.encode_image(&path) {
                Ok(embedding) => {
                    let label = category.label_for(name);
                    log::debug!("Enrolled {label} from {}", path.display());
                    set.insert(label.clone(), category, embedding);
                    report.enrolled.push(label);
                }
                Err(reason) => {
                    log::warn!("Skipping {}: {reason}", path.display());
                    report.skipped.push(SkippedImage { path, reason });
                }
            }
        }

        log::info!(
            "Enrolled {} {category:?} face(s) from {} ({} skipped)",
            report.enrolled.len(),
            dir.display(),
            report.skipped.len()
        );
        report
    }

    fn encode_image(&self, path: &Path) -> Result<Vec<f32>, SkipReason> {
        let image = image::open(path)
            .map_err(|e| SkipReason::Undecodable(e.to_string()))?
            .to_rgb8();
        let frame = Frame::from_rgb_image(image, 0, SystemTime::now()).scaled(self.scale);

        self.matcher
            .encodings(&frame)
            .map_err(|e| SkipReason::Matcher(e.to_string()))?
            .into_iter()
            .next()
            .map(|(_, embedding)| embedding)
            .ok_or(SkipReason::NoFace)
    }
}

/// Image files directly inside `dir`, sorted by path.
fn list_images(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_image_extension(path))
        .collect();
    images.sort();
    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            ENROLLMENT_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::face_detection::FaceCategory;
    use crate::testing::{solid_frame, ColorMatcher, FailingMatcher, BLACK, BLUE, RED};
    use rstest::rstest;

    // --- Helpers ---

    fn write_image(dir: &Path, name: &str, color: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        solid_frame(40, 20, color)
            .to_rgb_image()
            .unwrap()
            .save(&path)
            .unwrap();
        path
    }

    fn use_case() -> EnrollFacesUseCase {
        EnrollFacesUseCase::new(Arc::new(ColorMatcher::default()), 0.5)
    }

    // --- Tests ---

    #[test]
    fn test_enrolls_known_face_with_file_stem_label() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "alice.jpg", RED);

        let mut set = KnownFaceSet::new();
        let report = use_case().execute(dir.path(), EnrolledCategory::Known, &mut set);

        assert_eq!(report.enrolled, vec!["alice".to_string()]);
        assert!(report.skipped.is_empty());
        let id = set.identify(&[1.0, 0.0, 0.0], 0.6);
        assert_eq!(id.label, "alice");
        assert_eq!(id.category, FaceCategory::Known);
    }

    #[test]
    fn test_criminal_labels_are_prefixed() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "bob.png", BLUE);

        let mut set = KnownFaceSet::new();
        let report = use_case().execute(dir.path(), EnrolledCategory::Criminal, &mut set);

        assert_eq!(report.enrolled, vec!["Criminal: bob".to_string()]);
        assert_eq!(set.count(EnrolledCategory::Criminal), 1);
    }

    #[test]
    fn test_missing_directory_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = KnownFaceSet::new();
        let report = use_case().execute(
            &dir.path().join("does-not-exist"),
            EnrolledCategory::Known,
            &mut set,
        );
        assert!(report.missing_directory);
        assert!(set.is_empty());
    }

    #[test]
    fn test_undecodable_and_faceless_images_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();
        write_image(dir.path(), "empty.png", BLACK);
        write_image(dir.path(), "carol.png", RED);

        let mut set = KnownFaceSet::new();
        let report = use_case().execute(dir.path(), EnrolledCategory::Known, &mut set);

        assert_eq!(report.enrolled, vec!["carol".to_string()]);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(report.skipped[0].reason, SkipReason::Undecodable(_)));
        assert_eq!(report.skipped[1].reason, SkipReason::NoFace);
    }

    #[test]
    fn test_matcher_failure_skips_file() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "dave.jpg", RED);

        let mut set = KnownFaceSet::new();
        let report = EnrollFacesUseCase::new(Arc::new(FailingMatcher), 0.5).execute(
            dir.path(),
            EnrolledCategory::Known,
            &mut set,
        );

        assert!(set.is_empty());
        assert!(matches!(report.skipped[0].reason, SkipReason::Matcher(_)));
    }

    #[test]
    fn test_ignores_unsupported_files_and_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        write_image(&nested, "eve.jpg", RED);

        let mut set = KnownFaceSet::new();
        let report = use_case().execute(dir.path(), EnrolledCategory::Known, &mut set);

        assert!(report.enrolled.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[rstest]
    #[case("face.jpg", true)]
    #[case("face.JPEG", true)]
    #[case("face.Png", true)]
    #[case("face.gif", false)]
    #[case("face", false)]
    fn test_has_image_extension(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(has_image_extension(Path::new(name)), expected);
    }
}
