//! Request handlers for the sync and publishing endpoints.

mod check;
mod fetch;
mod publish;

pub use check::*;
pub use fetch::*;
pub use publish::*;

/// PostgreSQL unique violation (SQLSTATE 23505).
fn is_unique_violation(e: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = e {
        db_err.code().map(|c| c == "23505").unwrap_or(false)
    } else {
        false
    }
}
