//! Request orchestration for the authenticated API client

pub mod client;
pub mod state;

pub use client::{ApiClient, ApiClientBuilder};
pub use state::{Attempt, RequestState};
