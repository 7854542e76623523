//! Integration tests for the data-synchronization layer
//!
//! These exercise the query and mutation controllers against the mock remote
//! service, using response gates to pin down interleavings and paused tokio
//! time for freshness windows.

use catalog_client_core::api::CatalogApi;
use catalog_client_core::{
    CacheKey, CacheStore, FocusSignal, MutationController, MutationSettings, ProductPatch,
    QueryController, QueryOptions, QueryStatus, RevalidationTrigger,
};
use catalog_test_utils::{MockCatalogApi, Op, ProductBuilder, sample_products};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    mock: Arc<MockCatalogApi>,
    store: Arc<CacheStore>,
    queries: Arc<QueryController>,
    mutations: Arc<MutationController>,
}

fn harness(mock: MockCatalogApi) -> Harness {
    let mock = Arc::new(mock);
    let api: Arc<dyn CatalogApi> = mock.clone();
    let store = Arc::new(CacheStore::default());
    let queries = Arc::new(QueryController::new(store.clone(), api.clone()));
    let mutations = Arc::new(MutationController::new(store.clone(), api));
    Harness {
        mock,
        store,
        queries,
        mutations,
    }
}

/// Let spawned tasks run to their next suspension or completion
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

fn priced(id: u64, title: &str, price: f64) -> catalog_client_core::Product {
    ProductBuilder::new(id).title(title).price(price).build()
}

#[tokio::test]
async fn simultaneous_reads_share_one_fetch() {
    let h = harness(MockCatalogApi::with_products(sample_products(3)));
    let gate = h.mock.hold(Op::List);

    let queries_a = h.queries.clone();
    let queries_b = h.queries.clone();
    let first =
        tokio::spawn(async move { queries_a.products(QueryOptions::default()).await });
    let second =
        tokio::spawn(async move { queries_b.products(QueryOptions::default()).await });

    settle().await;
    gate.open();

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert_eq!(h.mock.calls(Op::List), 1);
    assert_eq!(first.products().unwrap().len(), 3);
    assert_eq!(first.products(), second.products());
    assert_eq!(first.status, QueryStatus::Success);
}

#[tokio::test]
async fn failed_update_rolls_back_to_exact_prior_state() {
    let h = harness(MockCatalogApi::with_products(vec![
        priced(1, "A", 10.0),
        priced(2, "B", 20.0),
    ]));
    h.queries.products(QueryOptions::default()).await;

    h.mock.fail(Op::Update, "write rejected");
    let patch = ProductPatch {
        price: Some(15.0),
        ..Default::default()
    };
    let error = h.mutations.update_product(1, patch).await.unwrap_err();
    assert!(error.to_string().contains("write rejected"));

    let snapshot = h.queries.snapshot(&CacheKey::Products);
    let products = snapshot.products().unwrap();
    assert_eq!(products[0].price, 10.0);
    assert_eq!(products[1].price, 20.0);
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn confirmed_delete_leaves_no_detail_entry() {
    let h = harness(MockCatalogApi::with_products(vec![
        priced(1, "A", 10.0),
        priced(2, "B", 20.0),
    ]));
    h.queries.products(QueryOptions::default()).await;
    h.queries.product(2, QueryOptions::default()).await;

    let ack = h.mutations.delete_product(2).await.unwrap();
    assert_eq!(ack.id, 2);

    let list = h.queries.snapshot(&CacheKey::Products);
    let ids: Vec<u64> = list.products().unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1]);
    assert!(h.store.peek(&CacheKey::Product(2)).is_none());
}

#[tokio::test]
async fn failed_delete_restores_list_and_detail() {
    let h = harness(MockCatalogApi::with_products(vec![
        priced(1, "A", 10.0),
        priced(2, "B", 20.0),
    ]));
    h.queries.products(QueryOptions::default()).await;
    h.queries.product(2, QueryOptions::default()).await;

    h.mock.fail(Op::Delete, "delete rejected");
    h.mutations.delete_product(2).await.unwrap_err();

    let list = h.queries.snapshot(&CacheKey::Products);
    let ids: Vec<u64> = list.products().unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let detail = h.store.peek(&CacheKey::Product(2)).unwrap();
    assert_eq!(detail.data.unwrap().as_product().unwrap().id, 2);
}

#[tokio::test(start_paused = true)]
async fn fresh_reads_skip_the_network_and_stale_reads_refresh_in_background() {
    let h = harness(MockCatalogApi::with_products(sample_products(2)));
    let options = QueryOptions::default().with_stale_time(Duration::from_secs(300));

    h.queries.products(options).await;
    assert_eq!(h.mock.calls(Op::List), 1);

    // Re-read at t = 4min: fresh, no network call.
    tokio::time::advance(Duration::from_secs(240)).await;
    let snapshot = h.queries.products(options).await;
    assert_eq!(h.mock.calls(Op::List), 1);
    assert_eq!(snapshot.products().unwrap().len(), 2);

    // Re-read at t = 6min: cached value served synchronously, background
    // refresh issued.
    tokio::time::advance(Duration::from_secs(120)).await;
    let snapshot = h.queries.products(options).await;
    assert_eq!(snapshot.products().unwrap().len(), 2);

    settle().await;
    assert_eq!(h.mock.calls(Op::List), 2);
    let entry = h.store.peek(&CacheKey::Products).unwrap();
    assert_eq!(entry.status, QueryStatus::Success);
}

#[tokio::test]
async fn fetch_failure_keeps_last_good_data_until_manual_retry() {
    let h = harness(MockCatalogApi::with_products(sample_products(2)));
    h.queries.products(QueryOptions::default()).await;

    h.store.invalidate(catalog_client_core::KeyScope::Products);
    h.mock.fail(Op::List, "connection reset");
    h.queries.products(QueryOptions::default()).await;
    settle().await;

    let snapshot = h.queries.snapshot(&CacheKey::Products);
    assert_eq!(snapshot.status, QueryStatus::Error);
    assert!(snapshot.error.as_deref().unwrap().contains("connection reset"));
    assert_eq!(snapshot.products().unwrap().len(), 2);
    assert_eq!(h.mock.calls(Op::List), 2);

    // No automatic retry happened; a manual refresh recovers.
    h.mock.clear_failures();
    let snapshot = h.queries.refresh(CacheKey::Products).await;
    assert_eq!(snapshot.status, QueryStatus::Success);
    assert!(snapshot.error.is_none());
    assert_eq!(h.mock.calls(Op::List), 3);
}

#[tokio::test]
async fn disabled_read_reports_idle_without_network() {
    let h = harness(MockCatalogApi::with_products(sample_products(1)));
    let snapshot = h
        .queries
        .product(1, QueryOptions::default().with_enabled(false))
        .await;

    assert_eq!(snapshot.status, QueryStatus::Idle);
    assert_eq!(h.mock.calls(Op::Get), 0);
}

#[tokio::test]
async fn focus_event_refreshes_active_reads_only() {
    let h = harness(MockCatalogApi::with_products(sample_products(2)));
    h.mock.set_categories(vec!["electronics".to_string()]);

    // Active list read, opted into focus refetch.
    h.queries.products(QueryOptions::default()).await;
    // Active categories read, opted out.
    h.queries
        .categories(QueryOptions::default().with_refetch_on_focus(false))
        .await;
    // Detail read whose modal has been closed.
    h.queries.product(1, QueryOptions::default()).await;
    h.queries
        .product(1, QueryOptions::default().with_enabled(false))
        .await;
    assert_eq!(h.mock.calls(Op::Get), 1);

    let signal = FocusSignal::new();
    let _trigger = RevalidationTrigger::bind(&signal, h.queries.clone());
    settle().await;

    signal.emit();
    settle().await;

    assert_eq!(h.mock.calls(Op::List), 2);
    assert_eq!(h.mock.calls(Op::Categories), 1);
    assert_eq!(h.mock.calls(Op::Get), 1);
}

#[tokio::test]
async fn committed_mutation_wins_over_earlier_in_flight_read() {
    let h = harness(MockCatalogApi::with_products(vec![priced(1, "A", 10.0)]));
    h.queries.products(QueryOptions::default()).await;

    // A refresh is in flight, holding a response with the old price.
    let gate = h.mock.hold(Op::List);
    let queries = h.queries.clone();
    let in_flight = tokio::spawn(async move { queries.refresh(CacheKey::Products).await });
    settle().await;
    assert_eq!(h.mock.calls(Op::List), 2);

    // The update starts after the read and commits first.
    let patch = ProductPatch {
        price: Some(15.0),
        ..Default::default()
    };
    h.mutations.update_product(1, patch).await.unwrap();

    gate.open();
    in_flight.await.unwrap();

    let snapshot = h.queries.snapshot(&CacheKey::Products);
    assert_eq!(snapshot.products().unwrap()[0].price, 15.0);
}

#[tokio::test]
async fn manual_retry_after_cancelled_fetch_issues_new_request() {
    let h = harness(MockCatalogApi::with_products(vec![priced(1, "A", 10.0)]));
    h.queries.products(QueryOptions::default()).await;

    // A refresh goes in flight and gets cancelled by the mutation below.
    let gate = h.mock.hold(Op::List);
    let queries = h.queries.clone();
    let doomed = tokio::spawn(async move { queries.refresh(CacheKey::Products).await });
    settle().await;
    assert_eq!(h.mock.calls(Op::List), 2);

    let patch = ProductPatch {
        price: Some(15.0),
        ..Default::default()
    };
    h.mutations.update_product(1, patch).await.unwrap();

    // The retry must not join the doomed fetch; it starts a fresh one.
    let queries = h.queries.clone();
    let retry = tokio::spawn(async move { queries.refresh(CacheKey::Products).await });
    settle().await;
    assert_eq!(h.mock.calls(Op::List), 3);

    gate.open();
    doomed.await.unwrap();
    let snapshot = retry.await.unwrap();

    assert_eq!(snapshot.status, QueryStatus::Success);
    assert_eq!(snapshot.products().unwrap()[0].price, 15.0);
}

#[tokio::test]
async fn optimistic_edit_end_to_end() {
    let h = harness(MockCatalogApi::with_products(vec![priced(1, "A", 10.0)]));
    h.queries.products(QueryOptions::default()).await;
    assert_eq!(h.mock.calls(Op::List), 1);

    let gate = h.mock.hold(Op::Update);
    let mutations = h.mutations.clone();
    let edit = tokio::spawn(async move {
        mutations
            .update_product(
                1,
                ProductPatch {
                    title: Some("B".to_string()),
                    ..Default::default()
                },
            )
            .await
    });
    settle().await;

    // Optimistic state is visible while the network call is in flight.
    let snapshot = h.queries.snapshot(&CacheKey::Products);
    assert_eq!(snapshot.products().unwrap()[0].title, "B");

    gate.open();
    let confirmed = edit.await.unwrap().unwrap();
    assert_eq!(confirmed.title, "B");
    assert_eq!(confirmed.price, 10.0);

    let snapshot = h.queries.snapshot(&CacheKey::Products);
    let product = &snapshot.products().unwrap()[0];
    assert_eq!(product.title, "B");
    assert_eq!(product.price, 10.0);

    // No automatic refetch follows the commit.
    settle().await;
    assert_eq!(h.mock.calls(Op::List), 1);

    // An explicit focus event revalidates.
    let signal = FocusSignal::new();
    let _trigger = RevalidationTrigger::bind(&signal, h.queries.clone());
    settle().await;
    signal.emit();
    settle().await;
    assert_eq!(h.mock.calls(Op::List), 2);
}

#[tokio::test]
async fn refetch_after_commit_can_be_turned_on() {
    let mock = Arc::new(MockCatalogApi::with_products(vec![priced(1, "A", 10.0)]));
    let api: Arc<dyn CatalogApi> = mock.clone();
    let store = Arc::new(CacheStore::default());
    let queries = Arc::new(QueryController::new(store.clone(), api.clone()));
    let mutations = MutationController::with_settings(
        store.clone(),
        api,
        MutationSettings {
            refetch_after_commit: true,
        },
    );

    queries.products(QueryOptions::default()).await;
    mutations
        .update_product(
            1,
            ProductPatch {
                price: Some(15.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The commit invalidated the list, so the next read refreshes in the
    // background.
    queries.products(QueryOptions::default()).await;
    settle().await;
    assert_eq!(mock.calls(Op::List), 2);
}
