//! Shared error types for the services crate.

use thiserror::Error;

use study_core::ForestError;
use study_core::model::NameError;
use storage::sqlite::SqliteInitError;

/// Errors reported to callers of `CourseStore` mutations.
///
/// Unresolved ids are not errors (see `Outcome::NotFound`) and persistence
/// failures are non-fatal notices, so only caller mistakes end up here.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("no active user")]
    NoActiveUser,
    #[error(transparent)]
    Validation(#[from] NameError),
    #[error(transparent)]
    Forest(ForestError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
