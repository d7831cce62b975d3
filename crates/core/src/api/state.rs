//! Per-request state machine
//!
//! ```text
//! Building(First) ─► Sent ─┬─► Finished                    (2xx, non-401, network error)
//!                          └─► AuthExpired ─┬─► Retrying ─► Building(Retry) ─► Sent ─► Finished
//!                                           └─► Finished   (session expired)
//! ```
//!
//! The right to refresh is a [`RefreshTicket`] minted once per request and
//! carried only by the first attempt. [`RequestState::AuthExpired`] holds
//! the ticket, so it cannot be reached from a retried attempt.

use lessonlink_domain::{NormalizedResponse, RawResponse, Session};

use crate::http::normalize::normalize;
use crate::http::ports::TransportError;

/// Single-use permission to refresh the session
#[derive(Debug)]
pub struct RefreshTicket(());

/// Which attempt of a logical request is being made
#[derive(Debug)]
pub enum Attempt {
    /// The initial attempt; may spend its ticket on one refresh
    First(RefreshTicket),
    /// The single retry after a refresh
    Retry,
}

impl Attempt {
    pub fn is_retry(&self) -> bool {
        matches!(self, Self::Retry)
    }
}

/// Where a logical request currently is
#[derive(Debug)]
pub enum RequestState {
    /// About to build and send the wire request
    Building(Attempt),
    /// The transport returned; `session` is the snapshot the request was built with
    Sent { attempt: Attempt, session: Session, outcome: Result<RawResponse, TransportError> },
    /// A 401 on the first attempt of an authenticated request
    AuthExpired { ticket: RefreshTicket, session: Session },
    /// The session was refreshed; the request is rebuilt once
    Retrying,
    /// Final response handed to the caller
    Finished(NormalizedResponse),
}

impl RequestState {
    /// Initial state of every logical request
    pub fn start() -> Self {
        Self::Building(Attempt::First(RefreshTicket(())))
    }

    /// Interpret a completed send
    ///
    /// A 401 becomes [`RequestState::AuthExpired`] only for authenticated
    /// requests still holding their ticket; every other status is final.
    /// Transport failures are reported by the caller, which owns the
    /// network-failure message.
    pub fn after_send(
        attempt: Attempt,
        session: Session,
        response: RawResponse,
        skip_auth: bool,
    ) -> Self {
        match attempt {
            Attempt::First(ticket) if response.status == 401 && !skip_auth => {
                Self::AuthExpired { ticket, session }
            }
            _ => Self::Finished(normalize(response)),
        }
    }

    /// Short label for tracing
    pub fn name(&self) -> &'static str {
        match self {
            Self::Building(_) => "building",
            Self::Sent { .. } => "sent",
            Self::AuthExpired { .. } => "auth_expired",
            Self::Retrying => "retrying",
            Self::Finished(_) => "finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use lessonlink_domain::ErrorKind;
    use serde_json::json;

    use super::*;

    fn first() -> Attempt {
        match RequestState::start() {
            RequestState::Building(attempt) => attempt,
            other => panic!("unexpected start state: {}", other.name()),
        }
    }

    fn unauthorized() -> RawResponse {
        RawResponse::json(401, &json!({"detail": "Given token not valid for any token type"}))
    }

    #[test]
    fn test_first_401_expires_session() {
        let state = RequestState::after_send(first(), Session::empty(), unauthorized(), false);
        assert!(matches!(state, RequestState::AuthExpired { .. }));
    }

    #[test]
    fn test_retry_401_is_final() {
        let state =
            RequestState::after_send(Attempt::Retry, Session::empty(), unauthorized(), false);
        match state {
            RequestState::Finished(response) => {
                assert_eq!(response.status, 401);
                assert_eq!(response.error_kind(), Some(ErrorKind::Backend));
                assert_eq!(
                    response.error_message.as_deref(),
                    Some("Given token not valid for any token type")
                );
            }
            other => panic!("unexpected state: {}", other.name()),
        }
    }

    #[test]
    fn test_skip_auth_401_is_ordinary_failure() {
        let state = RequestState::after_send(first(), Session::empty(), unauthorized(), true);
        assert!(matches!(state, RequestState::Finished(ref response) if !response.success));
    }

    #[test]
    fn test_other_statuses_finish() {
        for status in [200, 204, 400, 403, 404, 500] {
            let response = RawResponse::json(status, &json!({}));
            let state = RequestState::after_send(first(), Session::empty(), response, false);
            assert_eq!(state.name(), "finished", "status {status}");
        }
    }

    #[test]
    fn test_attempt_kinds() {
        assert!(!first().is_retry());
        assert!(Attempt::Retry.is_retry());
    }
}
