//! Read access to the pool's on-chain state: paged event streams and the
//! tree-with-history fields of the pool configuration object.

use std::collections::HashSet;

use ark_bn254::Fr;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crypto::field_to_decimal;
use crate::error::{Result, SdkError};
use crate::events::{ChainEvent, DepositEvent, EventKind, WithdrawalEvent};

/// Position in an event stream, as returned by `suix_queryEvents`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventCursor {
    #[serde(rename = "txDigest")]
    pub tx_digest: String,
    #[serde(rename = "eventSeq")]
    pub event_seq: String,
}

#[derive(Clone, Debug, Default)]
pub struct EventPage {
    pub events: Vec<ChainEvent>,
    pub next_cursor: Option<EventCursor>,
    pub has_next_page: bool,
}

/// Snapshot of `marklet_tree_with_history` from the pool config object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnChainTreeState {
    /// Number of commitments inserted so far.
    pub next_index: u64,
    pub current_root_index: u64,
    pub roots: Vec<Fr>,
}

impl OnChainTreeState {
    /// `roots[current_root_index]`, the only root proofs are checked against.
    pub fn current_root(&self) -> Result<Fr> {
        self.roots
            .get(self.current_root_index as usize)
            .copied()
            .ok_or_else(|| {
                SdkError::ChainState(format!(
                    "current_root_index {} out of range for {} roots",
                    self.current_root_index,
                    self.roots.len()
                ))
            })
    }

    pub fn current_root_decimal(&self) -> Result<String> {
        Ok(field_to_decimal(&self.current_root()?))
    }
}

#[async_trait]
pub trait PoolChain: Send + Sync {
    /// One page of pool events of `kind`, oldest first.
    async fn query_events(
        &self,
        kind: EventKind,
        cursor: Option<EventCursor>,
        limit: usize,
    ) -> Result<EventPage>;

    async fn pool_tree_state(&self) -> Result<OnChainTreeState>;
}

/// Follow the cursor until the source reports no further page.
pub async fn query_all_events<C>(chain: &C, kind: EventKind, page_size: usize) -> Result<Vec<ChainEvent>>
where
    C: PoolChain + ?Sized,
{
    let mut events = Vec::new();
    let mut cursor: Option<EventCursor> = None;
    let mut seen = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = chain.query_events(kind, cursor.clone(), page_size).await?;
        pages += 1;
        events.extend(page.events);
        debug!(?kind, pages, total = events.len(), "Fetched event page");

        if !page.has_next_page {
            break;
        }
        let next = page.next_cursor.ok_or_else(|| {
            SdkError::Rpc(format!(
                "{} page {} reports more results but no cursor",
                kind.struct_name(),
                pages
            ))
        })?;
        if !seen.insert(next.clone()) {
            return Err(SdkError::Rpc(format!(
                "{} cursor {}:{} repeated after {} pages",
                kind.struct_name(),
                next.tx_digest,
                next.event_seq,
                pages
            )));
        }
        cursor = Some(next);
    }

    Ok(events)
}

pub async fn query_deposit_events<C>(chain: &C, limit: usize) -> Result<Vec<DepositEvent>>
where
    C: PoolChain + ?Sized,
{
    let page = chain.query_events(EventKind::Deposit, None, limit).await?;
    Ok(crate::events::deposit_events(&page.events))
}

pub async fn query_withdrawal_events<C>(chain: &C, limit: usize) -> Result<Vec<WithdrawalEvent>>
where
    C: PoolChain + ?Sized,
{
    let page = chain.query_events(EventKind::Withdrawal, None, limit).await?;
    Ok(crate::events::withdrawal_events(&page.events))
}

pub async fn query_all_deposit_events<C>(chain: &C, page_size: usize) -> Result<Vec<DepositEvent>>
where
    C: PoolChain + ?Sized,
{
    let events = query_all_events(chain, EventKind::Deposit, page_size).await?;
    Ok(crate::events::deposit_events(&events))
}

pub async fn query_all_withdrawal_events<C>(chain: &C, page_size: usize) -> Result<Vec<WithdrawalEvent>>
where
    C: PoolChain + ?Sized,
{
    let events = query_all_events(chain, EventKind::Withdrawal, page_size).await?;
    Ok(crate::events::withdrawal_events(&events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct PagedChain {
        total: u64,
        calls: AtomicUsize,
        stuck_cursor: bool,
    }

    #[async_trait]
    impl PoolChain for PagedChain {
        async fn query_events(
            &self,
            _kind: EventKind,
            cursor: Option<EventCursor>,
            limit: usize,
        ) -> Result<EventPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let start: u64 = match (&cursor, self.stuck_cursor) {
                (Some(_), true) => 0,
                (Some(c), false) => c.event_seq.parse().unwrap(),
                (None, _) => 0,
            };
            let end = (start + limit as u64).min(self.total);
            let events = (start..end)
                .map(|i| {
                    let mut commitment = [0u8; 32];
                    commitment[24..].copy_from_slice(&(i + 1).to_be_bytes());
                    ChainEvent::Deposit(DepositEvent {
                        commitment,
                        amount: 1,
                        leaf_index: i,
                        timestamp: i,
                    })
                })
                .collect();
            Ok(EventPage {
                events,
                next_cursor: Some(EventCursor {
                    tx_digest: "tx".into(),
                    event_seq: end.to_string(),
                }),
                has_next_page: end < self.total,
            })
        }

        async fn pool_tree_state(&self) -> Result<OnChainTreeState> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_exhaustive_query_walks_all_pages() {
        let chain = PagedChain {
            total: 3000,
            calls: AtomicUsize::new(0),
            stuck_cursor: false,
        };
        let events = query_all_deposit_events(&chain, 1000).await.unwrap();
        assert_eq!(events.len(), 3000);
        assert_eq!(chain.calls.load(Ordering::SeqCst), 3);
        let indices: HashSet<u64> = events.iter().map(|e| e.leaf_index).collect();
        assert_eq!(indices.len(), 3000);
        assert!(events.iter().enumerate().all(|(i, e)| e.leaf_index == i as u64));
    }

    #[tokio::test]
    async fn test_repeated_cursor_is_an_error() {
        let chain = PagedChain {
            total: 5,
            calls: AtomicUsize::new(0),
            stuck_cursor: true,
        };
        let err = query_all_events(&chain, EventKind::Deposit, 2).await.unwrap_err();
        assert!(matches!(err, SdkError::Rpc(_)));
        assert!(chain.calls.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_bounded_query_reads_one_page() {
        let chain = PagedChain {
            total: 50,
            calls: AtomicUsize::new(0),
            stuck_cursor: false,
        };
        let events = query_deposit_events(&chain, 10).await.unwrap();
        assert_eq!(events.len(), 10);
        assert_eq!(chain.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_current_root_bounds() {
        let state = OnChainTreeState {
            next_index: 1,
            current_root_index: 2,
            roots: vec![Fr::from(1u64), Fr::from(2u64)],
        };
        assert!(matches!(state.current_root(), Err(SdkError::ChainState(_))));
    }
}
