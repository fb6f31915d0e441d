mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{collect_until_kind, kinds, next_state, ScriptedSource};
use mvi_paging::paging::{ItemsEdit, PagingContainer, PagingState, PagingStateKind};
use tokio::sync::Semaphore;

use PagingStateKind::*;

async fn loaded(source: ScriptedSource) -> PagingContainer<ScriptedSource> {
    let pager = PagingContainer::new(source);
    let mut states = pager.states();
    assert!(pager.refresh());
    collect_until_kind(&mut states, Loaded).await;
    pager
}

#[tokio::test]
async fn test_refresh_progresses_to_loaded() {
    let pager = PagingContainer::new(ScriptedSource::new().refresh_with(Ok(vec![1, 2])));
    let mut states = pager.states();

    assert!(pager.refresh());
    let seen = collect_until_kind(&mut states, Loaded).await;

    assert_eq!(
        seen,
        vec![
            PagingState::Idle { items: vec![] },
            PagingState::Refreshing { items: vec![] },
            PagingState::Loaded { items: vec![1, 2] },
        ]
    );
    assert_eq!(pager.source().refresh_fetches(), 1);
}

#[tokio::test]
async fn test_next_page_appends_items() {
    let pager = loaded(
        ScriptedSource::new()
            .refresh_with(Ok(vec![1, 2]))
            .next_page_with(Ok(vec![3, 4])),
    )
    .await;
    let mut states = pager.states();
    assert_eq!(next_state(&mut states).await.kind(), Loaded);

    assert!(pager.load_next_page(false));
    let seen = collect_until_kind(&mut states, LoadedNextPage).await;

    assert_eq!(
        seen,
        vec![
            PagingState::LoadingNextPage {
                items: vec![1, 2]
            },
            PagingState::LoadedNextPage {
                items: vec![1, 2, 3, 4],
                page: vec![3, 4],
            },
        ]
    );
}

#[tokio::test]
async fn test_empty_first_page_is_empty() {
    let pager = PagingContainer::new(ScriptedSource::new().refresh_with(Ok(vec![])));
    let mut states = pager.states();

    pager.refresh();
    let seen = collect_until_kind(&mut states, Empty).await;

    assert_eq!(kinds(&seen), vec![Idle, Refreshing, Empty]);
    assert!(!pager.state().can_load_next_page());
}

#[tokio::test]
async fn test_empty_next_page_is_last_page() {
    let pager = loaded(ScriptedSource::new().refresh_with(Ok(vec![1]))).await;
    let mut states = pager.states();

    pager.load_next_page(false);
    let seen = collect_until_kind(&mut states, LoadedLastPage).await;

    assert_eq!(
        seen.last(),
        Some(&PagingState::LoadedLastPage {
            items: vec![1],
            page: vec![],
        })
    );
    assert!(!pager.load_next_page(false), "exhausted list ignores load more");
    assert_eq!(pager.source().next_page_fetches(), 1);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_items() {
    let pager = loaded(
        ScriptedSource::new()
            .refresh_with(Ok(vec![5, 6]))
            .refresh_with(Err("backend offline".to_string())),
    )
    .await;
    let mut states = pager.states();
    next_state(&mut states).await;

    pager.refresh();
    let seen = collect_until_kind(&mut states, Failed).await;

    assert_eq!(kinds(&seen), vec![Refreshing, Failed]);
    assert_eq!(seen[0].items(), &[5, 6]);
    match &seen[1] {
        PagingState::Failed { items, cause } => {
            assert_eq!(items, &vec![5, 6]);
            assert_eq!(cause.to_string(), "backend offline");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(!pager.state().can_load_next_page());
}

#[tokio::test]
async fn test_failed_next_page_can_be_retried() {
    let pager = loaded(
        ScriptedSource::new()
            .refresh_with(Ok(vec![1]))
            .next_page_with(Err("timeout".to_string()))
            .next_page_with(Ok(vec![2])),
    )
    .await;
    let mut states = pager.states();
    next_state(&mut states).await;

    pager.load_next_page(false);
    let failed = collect_until_kind(&mut states, FailedNextPage).await;
    assert_eq!(failed.last().map(PagingState::items), Some(&[1][..]));

    assert!(pager.load_next_page(false));
    let seen = collect_until_kind(&mut states, LoadedNextPage).await;
    assert_eq!(
        seen.last(),
        Some(&PagingState::LoadedNextPage {
            items: vec![1, 2],
            page: vec![2],
        })
    );
}

#[tokio::test]
async fn test_refresh_while_refreshing_is_ignored() {
    let gate = Arc::new(Semaphore::new(0));
    let pager = PagingContainer::new(
        ScriptedSource::new()
            .refresh_with(Ok(vec![1]))
            .refresh_with(Ok(vec![2]))
            .gate_refresh(&gate),
    );
    let mut states = pager.states();

    assert!(pager.refresh());
    collect_until_kind(&mut states, Refreshing).await;
    assert!(!pager.refresh());

    gate.add_permits(1);
    let seen = collect_until_kind(&mut states, Loaded).await;
    assert_eq!(seen, vec![PagingState::Loaded { items: vec![1] }]);
    assert_eq!(pager.source().refresh_fetches(), 1);
}

#[tokio::test]
async fn test_load_next_page_is_single_flight() {
    let gate = Arc::new(Semaphore::new(0));
    let pager = loaded(
        ScriptedSource::new()
            .refresh_with(Ok(vec![1]))
            .next_page_with(Ok(vec![2]))
            .gate_next_page(&gate),
    )
    .await;
    let mut states = pager.states();
    next_state(&mut states).await;

    assert!(pager.load_next_page(false));
    collect_until_kind(&mut states, LoadingNextPage).await;
    assert!(!pager.load_next_page(false), "busy without force");
    assert!(pager.load_next_page(true), "forced request is accepted");

    gate.add_permits(1);
    let seen = collect_until_kind(&mut states, LoadedNextPage).await;
    assert_eq!(seen.last().map(PagingState::items), Some(&[1, 2][..]));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pager.source().next_page_fetches(), 1);
}

#[tokio::test]
async fn test_next_page_before_first_load_does_nothing() {
    let pager = PagingContainer::new(ScriptedSource::new().next_page_with(Ok(vec![9])));
    let mut states = pager.states();
    assert_eq!(next_state(&mut states).await.kind(), Idle);

    assert!(pager.load_next_page(false));
    // An empty edit is processed after the load request and republishes as is.
    assert!(pager.edit(Vec::new()));

    assert_eq!(
        next_state(&mut states).await,
        PagingState::Idle { items: vec![] }
    );
    assert_eq!(pager.source().next_page_fetches(), 0);
}

#[tokio::test]
async fn test_edits_preserve_state_kind() {
    let pager = loaded(
        ScriptedSource::new()
            .refresh_with(Ok(vec![1, 2]))
            .next_page_with(Ok(vec![3])),
    )
    .await;
    let mut states = pager.states();
    next_state(&mut states).await;

    pager.edit([ItemsEdit::add(0, vec![0]), ItemsEdit::remove(|n: &u32| *n == 2)]);
    assert_eq!(
        next_state(&mut states).await,
        PagingState::Loaded { items: vec![0, 1] }
    );

    pager.load_next_page(false);
    let seen = collect_until_kind(&mut states, LoadedNextPage).await;
    assert_eq!(
        seen.last(),
        Some(&PagingState::LoadedNextPage {
            items: vec![0, 1, 3],
            page: vec![3],
        })
    );

    pager.edit([ItemsEdit::add(usize::MAX, vec![4])]);
    assert_eq!(
        next_state(&mut states).await,
        PagingState::LoadedNextPage {
            items: vec![0, 1, 3, 4],
            page: vec![3],
        }
    );
}

#[tokio::test]
async fn test_refresh_cancels_next_page_in_flight() {
    let gate = Arc::new(Semaphore::new(0));
    let pager = loaded(
        ScriptedSource::new()
            .refresh_with(Ok(vec![1]))
            .refresh_with(Ok(vec![10]))
            .next_page_with(Ok(vec![2]))
            .gate_next_page(&gate),
    )
    .await;
    let mut states = pager.states();
    next_state(&mut states).await;

    pager.load_next_page(false);
    collect_until_kind(&mut states, LoadingNextPage).await;

    assert!(pager.refresh());
    let seen = collect_until_kind(&mut states, Loaded).await;
    assert_eq!(
        seen,
        vec![
            PagingState::Refreshing { items: vec![1] },
            PagingState::Loaded { items: vec![10] },
        ]
    );

    gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pager.state(), PagingState::Loaded { items: vec![10] });
    assert!(states.try_recv().is_none());
}

#[tokio::test]
async fn test_close_ends_state_stream() {
    let pager = PagingContainer::new(ScriptedSource::new());
    let mut states = pager.states();

    pager.close();
    assert!(pager.is_closed());
    assert!(!pager.refresh());
    assert!(!pager.edit(Vec::new()));
    common::wait_closed(&mut states).await;
}

#[tokio::test]
async fn test_refresh_burst_fetches_once() {
    let pager = PagingContainer::new(
        ScriptedSource::new()
            .refresh_with(Ok(vec![1]))
            .refresh_with(Ok(vec![2])),
    );
    let mut states = pager.states();

    assert!(pager.refresh());
    assert!(!pager.refresh(), "queued refresh absorbs the second call");

    let seen = collect_until_kind(&mut states, Loaded).await;
    assert_eq!(kinds(&seen), vec![Idle, Refreshing, Loaded]);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(states.try_recv().is_none());
    assert_eq!(pager.source().refresh_fetches(), 1);

    assert!(pager.refresh(), "a settled list can be refreshed again");
    let seen = collect_until_kind(&mut states, Loaded).await;
    assert_eq!(seen.last(), Some(&PagingState::Loaded { items: vec![2] }));
}
