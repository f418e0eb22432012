//! Repository module exports.

mod note_repository;

pub use note_repository::{NoteRepository, NoteStore};
