//! Protocol decoder nodes

pub mod adb;
pub mod types;

pub use adb::AdbDecoder;
pub use types::{Annotation, AnnotationKind, AnnotationRow};
