//! # rewind-tempfile
//!
//! Provides the [`TemporaryFile`] struct, an asynchronous wrapper based on `tokio::fs` for
//! uniquely named temporary files that are deleted when closed. A freshly created file
//! rewinds to its start on the first read, so data written or copied into it can be read
//! back without an explicit seek.
//!
//! ```
//! use rewind_tempfile::TemporaryFile;
//!
//! #[tokio::main]
//! async fn main() {
//!     let file = TemporaryFile::new().await.unwrap();
//!     file.write_all(b"test").await.unwrap();
//!
//!     // The first read starts at the beginning of the file.
//!     let mut body = Vec::new();
//!     file.read_to_end(&mut body).await.unwrap();
//!     assert_eq!(body, b"test");
//!
//!     let path = file.file_path().to_path_buf();
//!     file.close().await.unwrap();
//!     assert!(!path.exists());
//! }
//! ```
//!
//! ## Features
//!
//! * `uuid` - (Default) Enables random file name generation based on the [`uuid`](https://crates.io/crates/uuid) crate.
//!            Provides the `new_with_uuid*` group of methods. Without it, names are derived
//!            from the process ID and the current time.

// Document crate features on docs.rs.
#![cfg_attr(docsrs, feature(doc_cfg))]
// Required for closing the file.
#![allow(unsafe_code)]

mod errors;
#[cfg_attr(feature = "uuid", allow(dead_code))]
mod random_name;
mod tempfile;

pub use errors::Error;
pub use tempfile::TemporaryFile;
