#![forbid(unsafe_code)]

pub mod app_services;
pub mod course_store;
pub mod error;
pub mod identity;
pub mod notice;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use course_store::{CourseStore, Outcome};
pub use error::{AppServicesError, StoreError};
pub use identity::Session;
pub use notice::{MutationKind, StoreNotice};
