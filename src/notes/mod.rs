//! Annotations and comments on articles
//!
//! [`NoteService`] is the entry point. It writes to the hosted backend when the
//! user is signed in and keeps notes on this device otherwise.

pub mod local;
pub mod models;
pub mod remote;
pub mod service;
pub mod store;

pub use local::LocalNoteStore;
pub use models::{Annotation, Comment, SaveOutcome};
pub use remote::RemoteNoteStore;
pub use service::NoteService;
pub use store::{NoteError, NoteStore};
