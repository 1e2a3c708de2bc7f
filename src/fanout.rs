// src/fanout.rs

use std::fmt;
use std::future::Future;

/// Runs one operation per recipient, sequentially, tolerating individual
/// failures.
///
/// Guarantees: at most one attempt per recipient per call, a failure never
/// aborts the remaining recipients, and every recipient gets a result in
/// input order. No retry, no parallel dispatch; completion time is linear in
/// the recipient count.
//
// TODO: broadcasts to very large subscriber lists should move to a
// background delivery queue instead of running inside the request.
pub async fn deliver_each<F, Fut, T, E>(recipients: &[i32], mut op: F) -> Vec<(i32, Result<T, E>)>
where
    F: FnMut(i32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut results = Vec::with_capacity(recipients.len());

    for &recipient in recipients {
        let result = op(recipient).await;
        if let Err(e) = &result {
            log::warn!("delivery to recipient {recipient} failed: {e}");
        }
        results.push((recipient, result));
    }

    results
}

/// Collapses per-recipient results into delivered/failed counts.
pub fn tally<T, E>(results: &[(i32, Result<T, E>)]) -> (usize, usize) {
    let delivered = results.iter().filter(|(_, r)| r.is_ok()).count();
    (delivered, results.len() - delivered)
}
