//! Sequential endpoint fallback for chat requests.
//!
//! This module encapsulates the fallback-chain algorithm:
//! - Candidates are attempted strictly in priority order, one attempt each
//! - The first success short-circuits the chain
//! - Recoverable failures are recorded and the chain continues
//! - Fatal failures abort the whole resolution immediately
//! - Exhaustion yields `Error::AllEndpointsFailed` with the ordered trail

use serde::Serialize;

use crate::error::Error;

/// Record of one failed endpoint attempt, kept in candidate order for the
/// diagnostic trail attached to `Error::AllEndpointsFailed`.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptFailure {
    pub model: String,
    pub api_version: String,
    /// HTTP status from the backend; `None` for transport-level failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

/// Outcome classification for a single endpoint attempt.
///
/// This is the explicit stop-vs-continue policy of the chain: a
/// `Recoverable` failure means the next candidate might still answer (the
/// endpoint was down or erroring), while `Fatal` means no candidate can (the
/// backend was reachable but the resolution itself cannot succeed).
#[derive(Debug)]
pub enum AttemptError {
    /// Record the failure and continue with the next candidate.
    Recoverable(AttemptFailure),
    /// Abort the whole resolution with this error.
    Fatal(Error),
}

/// Try each candidate in order, returning the first success.
///
/// Generic over the candidate type `C`, the success type `T`, and the
/// attempt future, so the sequencing policy is testable without HTTP. The
/// `attempt` closure owns outcome classification; this loop only decides
/// whether to continue.
///
/// The chain is deliberately sequential, not a race: each attempt is awaited
/// to completion before the next candidate is tried, so a working backend is
/// never charged for calls a faster failure would have made redundant.
///
/// On exhaustion, returns `Error::AllEndpointsFailed` carrying one failure
/// record per attempted candidate, in attempt order.
pub async fn resolve_with_fallback<C, T, F, Fut>(candidates: &[C], attempt: F) -> Result<T, Error>
where
    F: Fn(&C) -> Fut,
    Fut: std::future::Future<Output = std::result::Result<T, AttemptError>>,
{
    let mut failures: Vec<AttemptFailure> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Recoverable(failure)) => {
                tracing::warn!(
                    model = %failure.model,
                    api_version = %failure.api_version,
                    status = ?failure.status,
                    "Endpoint attempt failed, trying next candidate"
                );
                failures.push(failure);
            }
            Err(AttemptError::Fatal(err)) => {
                tracing::error!(error = %err, "Endpoint attempt failed terminally");
                return Err(err);
            }
        }
    }

    tracing::error!(
        attempted = failures.len(),
        "All endpoint candidates exhausted"
    );
    Err(Error::AllEndpointsFailed { attempts: failures })
}
