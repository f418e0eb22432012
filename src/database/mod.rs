//! Database module exports.

mod models;
mod mongo;
mod repository;

pub use models::{Note, NoteListPage, PageInfo, SearchInfo};
pub use mongo::Database;
pub use repository::{NoteRepository, NoteStore};
