//! PostgreSQL persistence for published versions, records and the change log.

mod pool;
mod records;
mod updates;
mod versions;

pub use pool::*;
pub use records::*;
pub use updates::*;
pub use versions::*;
