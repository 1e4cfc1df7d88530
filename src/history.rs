//! Paginated reads and bulk deletes over channel history.
//!
//! The platform serves at most [`PAGE_SIZE`] messages per request and bulk
//! deletes at most [`PAGE_SIZE`] messages at once, so larger windows are
//! walked page by page from newest to oldest.

use crate::gateway::GatewayError;
use crate::types::HistoryQuery;
use async_trait::async_trait;
use tracing::debug;

pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRequest {
    pub limit: u32,
    pub before: Option<String>,
    pub after: Option<String>,
    pub around: Option<String>,
}

/// A channel whose history can be read newest-first and bulk deleted.
#[async_trait]
pub trait MessageHistory: Send {
    type Item: Send;

    fn item_id(item: &Self::Item) -> String;

    async fn fetch_page(&mut self, request: PageRequest) -> Result<Vec<Self::Item>, GatewayError>;

    async fn delete_batch(&mut self, ids: Vec<String>) -> Result<(), GatewayError>;
}

/// Collects up to `query.limit` messages. The first page honours every
/// anchor of the query; later pages continue before the oldest message seen
/// and keep the `after` bound. Stops early when a page comes back empty.
pub async fn collect_history<H: MessageHistory + ?Sized>(
    source: &mut H,
    query: &HistoryQuery,
) -> Result<Vec<H::Item>, GatewayError> {
    let limit = query.limit as usize;
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut items = source
        .fetch_page(PageRequest {
            limit: query.limit.min(PAGE_SIZE),
            before: query.before.clone(),
            after: query.after.clone(),
            around: query.around.clone(),
        })
        .await?;
    let mut pages = 1;

    while items.len() < limit {
        let before = match items.last() {
            Some(last) => H::item_id(last),
            None => break,
        };
        let remaining = (limit - items.len()) as u32;
        let page = source
            .fetch_page(PageRequest {
                limit: remaining.min(PAGE_SIZE),
                before: Some(before),
                after: query.after.clone(),
                around: None,
            })
            .await?;
        pages += 1;
        if page.is_empty() {
            break;
        }
        items.extend(page);
    }

    items.truncate(limit);
    debug!(pages, collected = items.len(), limit, "collected history");
    Ok(items)
}

/// Deletes the messages selected by `query` in batches of at most
/// [`PAGE_SIZE`]. Returns the deleted IDs.
pub async fn delete_history<H: MessageHistory + ?Sized>(
    source: &mut H,
    query: &HistoryQuery,
) -> Result<Vec<String>, GatewayError> {
    let items = collect_history(source, query).await?;
    let ids: Vec<String> = items.iter().map(H::item_id).collect();

    for batch in ids.chunks(PAGE_SIZE as usize) {
        source.delete_batch(batch.to_vec()).await?;
    }

    debug!(deleted = ids.len(), "deleted history");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// IDs are plain integers, newest first.
    struct Channel {
        messages: Vec<u64>,
        requests: Vec<PageRequest>,
        batches: Vec<usize>,
    }

    impl Channel {
        fn with(count: u64) -> Self {
            Self {
                messages: (1..=count).rev().collect(),
                requests: Vec::new(),
                batches: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl MessageHistory for Channel {
        type Item = u64;

        fn item_id(item: &u64) -> String {
            item.to_string()
        }

        async fn fetch_page(&mut self, request: PageRequest) -> Result<Vec<u64>, GatewayError> {
            let before = request.before.as_ref().and_then(|b| b.parse::<u64>().ok());
            let after = request.after.as_ref().and_then(|a| a.parse::<u64>().ok());
            let page = self
                .messages
                .iter()
                .copied()
                .filter(|id| before.map_or(true, |b| *id < b))
                .filter(|id| after.map_or(true, |a| *id > a))
                .take(request.limit as usize)
                .collect();
            self.requests.push(request);
            Ok(page)
        }

        async fn delete_batch(&mut self, ids: Vec<String>) -> Result<(), GatewayError> {
            self.batches.push(ids.len());
            self.messages.retain(|id| !ids.contains(&id.to_string()));
            Ok(())
        }
    }

    fn query(limit: u32) -> HistoryQuery {
        HistoryQuery {
            limit,
            ..HistoryQuery::default()
        }
    }

    #[tokio::test]
    async fn pages_in_hundreds() {
        let mut channel = Channel::with(500);
        let items = collect_history(&mut channel, &query(250)).await.unwrap();

        assert_eq!(items.len(), 250);
        assert_eq!(items[0], 500);
        assert_eq!(items[249], 251);

        let limits: Vec<u32> = channel.requests.iter().map(|r| r.limit).collect();
        assert_eq!(limits, vec![100, 100, 50]);
        assert_eq!(channel.requests[1].before.as_deref(), Some("401"));
        assert_eq!(channel.requests[2].before.as_deref(), Some("301"));
    }

    #[tokio::test]
    async fn stops_when_history_runs_out() {
        let mut channel = Channel::with(120);
        let items = collect_history(&mut channel, &query(1000)).await.unwrap();

        assert_eq!(items.len(), 120);
        assert_eq!(channel.requests.len(), 3);
    }

    #[tokio::test]
    async fn after_bound_is_kept_across_pages() {
        let mut channel = Channel::with(300);
        let q = HistoryQuery {
            limit: 200,
            after: Some("150".into()),
            ..HistoryQuery::default()
        };
        let items = collect_history(&mut channel, &q).await.unwrap();

        assert_eq!(items.len(), 150);
        assert!(items.iter().all(|id| *id > 150));
        assert!(channel.requests.iter().all(|r| r.after.as_deref() == Some("150")));
    }

    #[tokio::test]
    async fn zero_limit_makes_no_requests() {
        let mut channel = Channel::with(10);
        assert!(collect_history(&mut channel, &query(0)).await.unwrap().is_empty());
        assert!(channel.requests.is_empty());
    }

    #[tokio::test]
    async fn deletes_in_batches() {
        let mut channel = Channel::with(300);
        let ids = delete_history(&mut channel, &query(230)).await.unwrap();

        assert_eq!(ids.len(), 230);
        assert_eq!(channel.batches, vec![100, 100, 30]);
        assert_eq!(channel.messages.len(), 70);
        assert_eq!(channel.messages[0], 70);
    }
}
