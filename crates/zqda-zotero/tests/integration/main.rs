//! Integration tests for zqda-zotero
//!
//! Uses wiremock to simulate the Zotero Web API and verifies end-to-end
//! behavior of the client and the `IRemoteLibrary` adapter.

mod common;

mod test_listing;
mod test_objects;
mod test_retry;
mod test_tags;
