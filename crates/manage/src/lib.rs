//! # manage
//!
//! Thin client for a document-database cluster's HTTP management API.
//!
//! This crate provides:
//! - The [`ManageApi`] trait, the only contract the deployment engine relies on
//!   (existence check, idempotent upsert building blocks, delete, list)
//! - [`HttpManageClient`], a blocking ureq-backed implementation
//! - [`MockManageApi`], an in-memory implementation for tests
//! - A structured [`Error`] whose [`ErrorCategory`] tells callers whether a
//!   failure is a recoverable missing dependency or fatal
//!
//! ## Example
//!
//! ```no_run
//! use manage::{ClientConfig, Endpoint, HttpManageClient, ManageApi, Payload};
//!
//! let client = HttpManageClient::new(ClientConfig::default());
//! let roles = Endpoint::new("/manage/v2/roles");
//!
//! if !client.exists(&roles, "app-reader").unwrap() {
//!     let payload = Payload::json(r#"{"role-name": "app-reader"}"#);
//!     client.create(&roles, "app-reader", &payload).unwrap();
//! }
//! ```
//!
//! ## Error classification
//!
//! The management API reports failures as an `errorResponse` document with a
//! `messageCode`. [`Error::from_response`] maps those codes through an explicit
//! table, so callers match on [`ErrorCategory`] instead of inspecting messages:
//!
//! ```
//! use manage::{Error, ErrorCategory};
//!
//! let body = r#"{"errorResponse": {"statusCode": 404, "messageCode": "XDMP-NOSUCHDB",
//!     "message": "XDMP-NOSUCHDB: No such database app-triggers"}}"#;
//! let err = Error::from_response(404, body);
//! assert_eq!(err.category(), ErrorCategory::MissingDependency);
//! assert!(err.is_recoverable());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;
pub mod xml;

pub use backend::ManageApi;
pub use backend::http::HttpManageClient;
pub use backend::mock::{Call, MockManageApi};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    ClientConfig, DATABASES_COLLECTION, Document, Endpoint, Format, Payload,
    REST_APIS_COLLECTION, SERVERS_COLLECTION, TDE_COLLECTION,
};
pub use xml::xml_element_text;
