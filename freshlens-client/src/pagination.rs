//! Pagination over capped list endpoints
//!
//! Two schemes are supported:
//! - offset/limit, where the server caps each call (REST list endpoints)
//! - relay cursors, `first`/`after` with `pageInfo` (GraphQL connections)
//!
//! Both are written against a page-fetching closure so the walking logic can
//! be tested without a server.

use std::collections::HashSet;
use std::future::Future;

use freshlens_core::domain::run::RunStatus;
use freshlens_core::dto::graphql::Connection;
use freshlens_core::dto::query::Identified;
use tracing::{debug, warn};

use crate::error::Result;

/// Collects up to `want` items with offset/limit calls of at most `cap` items
///
/// The offset advances by the number of items each call actually returned.
/// A short page ends the walk. Any failing page fails the whole collection.
pub async fn collect_pages<T, F, Fut>(want: usize, cap: usize, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let cap = cap.max(1);
    let mut items = Vec::with_capacity(want.min(cap * 10));
    let mut offset = 0;

    while items.len() < want {
        let limit = cap.min(want - items.len());
        let page = fetch(offset, limit).await?;
        let returned = page.len();
        debug!("Page at offset {} returned {}/{} items", offset, returned, limit);

        offset += returned;
        items.extend(page);

        if returned < limit {
            break;
        }
    }

    items.truncate(want);
    Ok(items)
}

/// Merges separately fetched batches newest-first
///
/// Records are deduplicated by identifier, sorted by descending identifier
/// and truncated to `want`.
pub fn merge_most_recent<T: Identified>(batches: Vec<Vec<T>>, want: usize) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut merged: Vec<T> = batches
        .into_iter()
        .flatten()
        .filter(|record| seen.insert(record.record_id()))
        .collect();
    merged.sort_by_key(|record| std::cmp::Reverse(record.record_id()));
    merged.truncate(want);
    merged
}

/// Collects up to `want` records across a set of status filters
///
/// With no status or a single one this is one offset walk in server order.
/// Several statuses are walked one after the other, each for up to `want`
/// records, then merged with [`merge_most_recent`]. A failure on any status
/// fails the whole collection.
pub async fn collect_by_status<T, F, Fut>(
    statuses: &[RunStatus],
    want: usize,
    cap: usize,
    mut fetch: F,
) -> Result<Vec<T>>
where
    T: Identified,
    F: FnMut(Option<RunStatus>, usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    match statuses {
        [] => collect_pages(want, cap, |offset, limit| fetch(None, offset, limit)).await,
        [status] => {
            collect_pages(want, cap, |offset, limit| fetch(Some(*status), offset, limit)).await
        }
        statuses => {
            let mut batches = Vec::with_capacity(statuses.len());
            for status in statuses {
                let batch =
                    collect_pages(want, cap, |offset, limit| fetch(Some(*status), offset, limit))
                        .await?;
                debug!("Status {:?} yielded {} records", status, batch.len());
                batches.push(batch);
            }
            Ok(merge_most_recent(batches, want))
        }
    }
}

/// Walks a cursor-paginated connection to its end
///
/// `fetch` receives the `after` cursor (none for the first page). The walk
/// stops when a page has no edges, when `hasNextPage` is false, or when the
/// server claims more pages without handing out a cursor.
pub async fn collect_cursor_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Connection<T>>>,
{
    let mut items = Vec::new();
    let mut after: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(after.take()).await?;
        pages += 1;

        if page.edges.is_empty() {
            break;
        }
        items.extend(page.edges.into_iter().map(|edge| edge.node));

        if !page.page_info.has_next_page {
            break;
        }
        match page.page_info.end_cursor {
            Some(cursor) => after = Some(cursor),
            None => {
                warn!("Connection reports more pages but no end cursor; stopping after page {}", pages);
                break;
            }
        }
    }

    debug!("Collected {} nodes over {} pages", items.len(), pages);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use freshlens_core::dto::graphql::{Edge, PageInfo};
    use std::future::ready;

    #[derive(Debug, Clone, PartialEq)]
    struct Record(i64);

    impl Identified for Record {
        fn record_id(&self) -> i64 {
            self.0
        }
    }

    fn records(offset: usize, count: usize) -> Vec<Record> {
        (offset..offset + count).map(|i| Record(i as i64)).collect()
    }

    #[tokio::test]
    async fn test_pages_split_at_cap() {
        let mut calls = Vec::new();
        let items = collect_pages(250, 100, |offset, limit| {
            calls.push((offset, limit));
            ready(Ok(records(offset, limit)))
        })
        .await
        .unwrap();

        assert_eq!(calls, vec![(0, 100), (100, 100), (200, 50)]);
        assert_eq!(items.len(), 250);
        assert_eq!(items[249], Record(249));
    }

    #[tokio::test]
    async fn test_short_page_stops_early() {
        let mut calls = 0;
        let items = collect_pages(500, 100, |offset, limit| {
            calls += 1;
            let available = 130usize.saturating_sub(offset).min(limit);
            ready(Ok(records(offset, available)))
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(items.len(), 130);
    }

    #[tokio::test]
    async fn test_server_cap_below_limit_ends_walk() {
        let mut offsets = Vec::new();
        let items = collect_pages(150, 100, |offset, limit| {
            offsets.push(offset);
            // Server silently caps at 60 per call
            ready(Ok(records(offset, limit.min(60))))
        })
        .await
        .unwrap();

        assert_eq!(offsets, vec![0]);
        assert_eq!(items.len(), 60);
    }

    #[tokio::test]
    async fn test_failed_page_fails_everything() {
        let result = collect_pages(300, 100, |offset, limit| {
            if offset == 100 {
                ready(Err(ClientError::api_error(500, "boom")))
            } else {
                ready(Ok(records(offset, limit)))
            }
        })
        .await;

        assert!(result.unwrap_err().is_server_error());
    }

    #[tokio::test]
    async fn test_zero_want_makes_no_calls() {
        let mut calls = 0;
        let items: Vec<Record> = collect_pages(0, 100, |_, _| {
            calls += 1;
            ready(Ok(vec![]))
        })
        .await
        .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_merge_dedupes_and_orders_newest_first() {
        let success = vec![Record(40), Record(31), Record(12)];
        let error = vec![Record(35), Record(31), Record(2)];
        let merged = merge_most_recent(vec![success, error], 4);
        assert_eq!(merged, vec![Record(40), Record(35), Record(31), Record(12)]);
    }

    /// Server holding runs 1..=60: even ids succeeded, ids divisible by 3
    /// errored (so multiples of 6 show up under both statuses)
    fn runs_with(status: Option<RunStatus>, offset: usize, limit: usize) -> Vec<Record> {
        let mut matching: Vec<Record> = (1..=60)
            .rev()
            .filter(|id| match status {
                Some(RunStatus::Success) => id % 2 == 0,
                Some(RunStatus::Error) => id % 3 == 0,
                Some(_) => false,
                None => true,
            })
            .map(Record)
            .collect();
        matching.drain(..offset.min(matching.len()));
        matching.truncate(limit);
        matching
    }

    #[tokio::test]
    async fn test_each_status_walked_separately() {
        let mut calls = Vec::new();
        let items = collect_by_status(
            &[RunStatus::Success, RunStatus::Error],
            20,
            8,
            |status, offset, limit| {
                calls.push((status, offset, limit));
                ready(Ok(runs_with(status, offset, limit)))
            },
        )
        .await
        .unwrap();

        let success_calls = calls.iter().filter(|c| c.0 == Some(RunStatus::Success)).count();
        let error_calls = calls.iter().filter(|c| c.0 == Some(RunStatus::Error)).count();
        assert_eq!((success_calls, error_calls), (3, 3));
        assert!(calls.iter().all(|(_, _, limit)| *limit <= 8));

        assert_eq!(items.len(), 20);
        let ids: Vec<i64> = items.iter().map(|r| r.0).collect();
        let mut sorted = ids.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        sorted.dedup();
        assert_eq!(ids, sorted);
        assert_eq!(&ids[..5], &[60, 58, 57, 56, 54]);
    }

    #[tokio::test]
    async fn test_single_or_no_status_is_one_walk() {
        let mut statuses = Vec::new();
        let items = collect_by_status(&[RunStatus::Error], 100, 100, |status, offset, limit| {
            statuses.push(status);
            ready(Ok(runs_with(status, offset, limit)))
        })
        .await
        .unwrap();
        assert_eq!(statuses, vec![Some(RunStatus::Error)]);
        assert_eq!(items.len(), 20);

        let mut statuses = Vec::new();
        let items = collect_by_status(&[], 5, 100, |status, offset, limit| {
            statuses.push(status);
            ready(Ok(runs_with(status, offset, limit)))
        })
        .await
        .unwrap();
        assert_eq!(statuses, vec![None]);
        assert_eq!(items, vec![Record(60), Record(59), Record(58), Record(57), Record(56)]);
    }

    #[tokio::test]
    async fn test_failing_status_fails_collection() {
        let mut error_calls = 0;
        let result = collect_by_status(
            &[RunStatus::Success, RunStatus::Error],
            20,
            100,
            |status, offset, limit| {
                if status == Some(RunStatus::Error) {
                    error_calls += 1;
                    ready(Err(ClientError::api_error(503, "unavailable")))
                } else {
                    ready(Ok(runs_with(status, offset, limit)))
                }
            },
        )
        .await;

        assert!(result.unwrap_err().is_server_error());
        assert_eq!(error_calls, 1);
    }

    fn connection(ids: &[i64], next: bool, cursor: Option<&str>) -> Connection<Record> {
        Connection {
            page_info: PageInfo {
                start_cursor: None,
                end_cursor: cursor.map(str::to_string),
                has_next_page: next,
            },
            edges: ids.iter().map(|id| Edge { node: Record(*id) }).collect(),
        }
    }

    #[tokio::test]
    async fn test_cursor_walk() {
        let mut afters = Vec::new();
        let items = collect_cursor_pages(|after| {
            let page = match after.as_deref() {
                None => connection(&[1, 2], true, Some("c1")),
                Some("c1") => connection(&[3], true, Some("c2")),
                _ => connection(&[4], false, Some("c3")),
            };
            afters.push(after);
            ready(Ok(page))
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 4);
        assert_eq!(afters, vec![None, Some("c1".to_string()), Some("c2".to_string())]);
    }

    #[tokio::test]
    async fn test_cursor_walk_stops_without_cursor_or_edges() {
        let mut calls = 0;
        let items = collect_cursor_pages(|_| {
            calls += 1;
            ready(Ok(connection(&[1], true, None)))
        })
        .await
        .unwrap();
        assert_eq!((items.len(), calls), (1, 1));

        let items = collect_cursor_pages(|_| ready(Ok(connection(&[], true, Some("x")))))
            .await
            .unwrap();
        assert!(items.is_empty());
    }
}
