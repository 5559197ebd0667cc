use std::sync::atomic::Ordering;
use std::time::Duration;

use catalog::ProjectPatch;

use crate::common::{TestCatalog, draft, image};

#[tokio::test]
async fn list_is_served_from_cache_until_invalidated() {
    let t = TestCatalog::new();
    t.seed(3).await;
    let client = t.client();

    assert_eq!(client.projects(9).await.unwrap().len(), 3);
    assert_eq!(client.projects(9).await.unwrap().len(), 3);
    assert_eq!(t.store.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn create_invalidates_the_list_key_space() {
    let t = TestCatalog::new();
    t.seed(2).await;
    let client = t.client();

    assert_eq!(client.projects(9).await.unwrap().len(), 2);

    let id = client
        .create(draft("Fresh"), vec![image("i.png")], None)
        .await
        .unwrap();

    let items = client.projects(9).await.unwrap();
    assert_eq!(t.store.list_calls.load(Ordering::SeqCst), 2);
    assert!(items.iter().any(|p| p.id == id));
}

#[tokio::test]
async fn update_invalidates_the_detail_key_and_the_lists() {
    let t = TestCatalog::new();
    let client = t.client();

    let id = client
        .create(draft("Old title"), vec![image("i.png")], None)
        .await
        .unwrap();
    client.projects(9).await.unwrap();

    // Detail is read through once, then cached.
    let cached = client.project(&id).await.unwrap().unwrap();
    client.project(&id).await.unwrap();
    assert_eq!(t.store.get_calls.load(Ordering::SeqCst), 1);

    let patch = ProjectPatch {
        title: Some("New title".into()),
        existing_images: cached.images.clone(),
        ..Default::default()
    };
    client.update(&id, patch, vec![], None).await.unwrap();

    let refreshed = client.project(&id).await.unwrap().unwrap();
    assert_eq!(refreshed.title, "New title");

    let list_calls = t.store.list_calls.load(Ordering::SeqCst);
    client.projects(9).await.unwrap();
    assert_eq!(t.store.list_calls.load(Ordering::SeqCst), list_calls + 1);
}

#[tokio::test]
async fn fetch_next_page_chains_cursors_until_exhausted() {
    let t = TestCatalog::new();
    t.seed(7).await;
    let client = t.client();

    assert_eq!(client.projects(3).await.unwrap().len(), 3);
    assert!(client.has_more(3));

    assert!(client.fetch_next_page(3).await.unwrap());
    assert_eq!(client.cached_projects(3).unwrap().len(), 6);
    assert!(client.has_more(3));

    assert!(client.fetch_next_page(3).await.unwrap());
    assert_eq!(client.cached_projects(3).unwrap().len(), 7);
    assert!(!client.has_more(3));

    // Exhausted: no further fetch is issued.
    assert!(!client.fetch_next_page(3).await.unwrap());
    assert_eq!(t.store.list_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn invalidation_refetches_page_one_and_drops_later_pages() {
    let t = TestCatalog::new();
    t.seed(7).await;
    let client = t.client();

    client.projects(3).await.unwrap();
    client.fetch_next_page(3).await.unwrap();
    assert_eq!(client.cached_projects(3).unwrap().len(), 6);

    client
        .create(draft("Newest"), vec![image("n.png")], None)
        .await
        .unwrap();

    // Accumulated pages are discarded: their cursors chain off a first page
    // that no longer reflects the store.
    let items = client.projects(3).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].title, "Newest");
    assert!(client.has_more(3));
}

#[tokio::test]
async fn successful_delete_applies_optimistically_and_settles() {
    let t = TestCatalog::new();
    let ids = t.seed(3).await;
    let client = t.client();
    client.projects(9).await.unwrap();

    let victim = ids[1].clone();
    client.delete(&victim).await.unwrap();

    let cached = client.cached_projects(9).unwrap();
    assert!(cached.iter().all(|p| p.id != victim));
    assert_eq!(
        t.store.delete_calls.lock().unwrap().as_slice(),
        &[victim.clone()]
    );
    assert!(!client.is_fetching(9));

    // Settled: the next read reconciles against the store.
    let list_calls = t.store.list_calls.load(Ordering::SeqCst);
    let items = client.projects(9).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(t.store.list_calls.load(Ordering::SeqCst), list_calls + 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_delete_rolls_back_to_the_exact_snapshot() {
    let t = TestCatalog::new();
    t.seed(3).await;
    let client = t.client();

    let before = client.projects(9).await.unwrap();
    let victim = before[1].id.clone();

    let gate = t.store.gate_delete_with_failure();
    let task = tokio::spawn({
        let client = client.clone();
        let victim = victim.clone();
        async move { client.delete(&victim).await }
    });

    while !t.store.delete_started() {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    // The row is gone from the visible cache before the backend resolves.
    let during = client.cached_projects(9).unwrap();
    assert!(during.iter().all(|p| p.id != victim));
    assert!(!client.is_fetching(9));

    gate.notify_one();
    let result = task.await.unwrap();
    assert!(result.is_err());

    // Full rollback: the snapshot returns, original positions included.
    assert_eq!(client.cached_projects(9).unwrap(), before);
    assert!(!client.is_fetching(9));
}

#[tokio::test(flavor = "multi_thread")]
async fn delete_cancels_an_inflight_refetch_so_it_cannot_resurrect_the_row() {
    let t = TestCatalog::new();
    let ids = t.seed(3).await;
    let client = t.client();

    client.projects(9).await.unwrap();

    // Invalidate so the next read goes back to the store, then gate the
    // store so that refetch hangs in flight.
    client
        .create(draft("Extra"), vec![image("e.png")], None)
        .await
        .unwrap();
    let gate = t.store.gate_lists();

    let refetch = tokio::spawn({
        let client = client.clone();
        async move { client.projects(9).await }
    });
    while t.store.list_calls.load(Ordering::SeqCst) < 2 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let victim = ids[0].clone();
    client.delete(&victim).await.unwrap();

    gate.notify_one();
    let items = refetch.await.unwrap().unwrap();
    assert!(
        items.iter().all(|p| p.id != victim),
        "cancelled refetch must not resurrect the deleted row"
    );
    assert!(
        client
            .cached_projects(9)
            .unwrap()
            .iter()
            .all(|p| p.id != victim)
    );
    assert!(!client.is_fetching(9));
}
