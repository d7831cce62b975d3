//! Domain types and models
//!
//! Models for the authenticated API client: the persisted session, the
//! caller's logical request, the wire-level request/response pair and the
//! normalized result handed back to callers.

pub mod auth;
pub mod request;
pub mod response;
pub mod session;

pub use auth::{LoginCredentials, TokenGrant, UserProfile};
pub use request::{
    FormPart, FormValue, LogicalRequest, Method, RawResponse, RequestBody, RequestOptions,
    WireRequest,
};
pub use response::{NormalizedResponse, ResponseData};
pub use session::{jwt_expiry, Session};
