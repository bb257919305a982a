//! API end-to-end test suite.
//!
//! Drives the full route table against an in-memory SQLite database and a
//! local storage driver rooted in a temp directory. No external services are
//! needed.
//!
//! Run with: cargo test --test api_e2e

mod test_helpers;

mod test_attachments;
mod test_import;
mod test_materials;
mod test_storage_settings;
