//! Session credentials and their refresh
//!
//! ```text
//! ┌──────────────────┐
//! │ SessionRefresher │  single-flight refresh-token exchange
//! └────────┬─────────┘
//!          │
//!          └──► CredentialStore     (atomic get/set/clear)
//!                     │
//!                     └──► KeyValueStore  (file, keychain, memory)
//! ```

pub mod ports;
pub mod refresher;
pub mod store;
