//! Project file resource workflow: upload, update, delete, download and list
//! of project files, with storage-quota accounting and optimistic-lock retry.

mod error;
mod service;

pub mod filter;
pub mod ledger;
pub mod membership;

pub use error::FileError;
pub use service::{FileService, MAX_WRITE_ATTEMPTS, NewFile, file_service};
