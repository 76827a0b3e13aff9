//! Database query modules.

pub mod channels;
pub mod programmes;
pub mod schedule_entries;

use playout_common::Error;

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Map a rusqlite error, turning a missing row into `NotFound`.
pub(crate) fn map_err(entity: &str, id: impl std::fmt::Display) -> impl FnOnce(rusqlite::Error) -> Error {
    let id = id.to_string();
    let entity = entity.to_string();
    move |e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::not_found(entity, id),
        e => Error::database(e.to_string()),
    }
}
