//! reqwest-backed transport and cookie-based CSRF source

pub mod client;
pub mod csrf;

pub use client::{ReqwestTransport, ReqwestTransportBuilder};
pub use csrf::JarCsrfSource;
