//! Subject-integrity quality assurance
//!
//! - [`ssim`]: single-window structural similarity over pixel samples
//! - [`subject`]: mask-driven subject extraction and geometry
//! - [`validator`]: the verdict and forensic log for one edited image

pub mod ssim;
pub mod subject;
pub mod validator;

pub use ssim::{structural_similarity, SampleStatistics};
pub use subject::{BoundingBox, SubjectExtractor, SubjectGeometry, SubjectSamples};
pub use validator::{NormalizedImages, QaOutcome, QaValidator};
