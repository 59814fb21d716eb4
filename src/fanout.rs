// ABOUTME: Bounded concurrent fan-out over a list of inputs.
// ABOUTME: Runs at most `limit` futures at once and keeps results in input order.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Apply `f` to every item with at most `limit` futures in flight.
///
/// Results come back in the order of `items`. A `limit` of zero is treated
/// as one.
pub async fn fan_out<T, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<Fut::Output>
where
    F: FnMut(T) -> Fut,
    Fut: Future,
{
    stream::iter(items)
        .map(f)
        .buffered(limit.max(1))
        .collect()
        .await
}
