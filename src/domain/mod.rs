//! Persisted record types shared by the stores, resolver, shortener, and
//! click-tracking pipeline.

pub mod annotation;
pub mod click_event;
pub mod mapping;

pub use annotation::{Annotation, AnnotationResult, LlmAnalysis, CATEGORY_TAXONOMY};
pub use click_event::{ClickSnapshot, DeviceType, NewClickEvent};
pub use mapping::{Mapping, NewMapping};
