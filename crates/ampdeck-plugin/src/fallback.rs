//! Primary-then-secondary request combinator shared by polling and command
//! dispatch.

use std::future::Future;

/// Why the primary attempt was not used.
#[derive(Debug)]
pub enum Rejected<T, E> {
    /// The attempt completed but the predicate refused the value
    /// (for HTTP: a non-success status).
    Unaccepted(T),
    Failed(E),
}

#[derive(Debug)]
pub enum Fallback<T, E> {
    Primary(T),
    Secondary {
        rejected: Rejected<T, E>,
        result: Result<T, E>,
    },
}

/// Run `primary`.  When it errors or `accept` refuses its value, run the
/// future produced by `secondary` exactly once.
pub async fn with_fallback<T, E, P, S, SF, A>(primary: P, secondary: S, accept: A) -> Fallback<T, E>
where
    P: Future<Output = Result<T, E>>,
    S: FnOnce() -> SF,
    SF: Future<Output = Result<T, E>>,
    A: Fn(&T) -> bool,
{
    let rejected = match primary.await {
        Ok(v) if accept(&v) => return Fallback::Primary(v),
        Ok(v) => Rejected::Unaccepted(v),
        Err(e) => Rejected::Failed(e),
    };
    let result = secondary().await;
    Fallback::Secondary { rejected, result }
}
