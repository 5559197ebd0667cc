use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ::common::storage::ProgressSink;
use catalog::{CatalogError, Project, ProjectPatch, StoreError};
use chrono::Utc;

use crate::common::{TestCatalog, draft, image};

#[tokio::test]
async fn pagination_exhausts_each_project_exactly_once() {
    let t = TestCatalog::new();
    t.seed(7).await;

    let mut seen = Vec::new();
    let mut page_sizes = Vec::new();
    let mut cursor = None;
    loop {
        let page = t.service.list(3, cursor.as_ref()).await.unwrap();
        page_sizes.push(page.items.len());
        seen.extend(page.items);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(page_sizes, vec![3, 3, 1]);
    let ids: HashSet<_> = seen.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids.len(), 7, "every project appears exactly once");
    assert!(
        seen.windows(2).all(|w| w[0].created_at > w[1].created_at),
        "descending creation order across page boundaries"
    );
}

#[tokio::test]
async fn create_then_repoint_primary_image() {
    let t = TestCatalog::new();
    let mut demo = draft("Demo");
    demo.primary_image_index = 1;

    let id = t
        .service
        .create(demo, vec![image("one.png"), image("two.png")], None)
        .await
        .unwrap();

    let project = t.service.get(&id).await.unwrap().unwrap();
    assert_eq!(project.images.len(), 2);
    assert_eq!(project.primary_image_index, 1);
    assert_eq!(project.image_url, project.images[1]);

    let prefix = format!("mem://projects/{id}/");
    assert!(
        project.images.iter().all(|url| url.starts_with(&prefix)),
        "uploads are namespaced by project id"
    );

    let patch = ProjectPatch {
        primary_image_index: Some(0),
        existing_images: project.images.clone(),
        ..Default::default()
    };
    t.service.update(&id, patch, vec![], None).await.unwrap();

    let updated = t.service.get(&id).await.unwrap().unwrap();
    assert_eq!(updated.images, project.images);
    assert_eq!(updated.image_url, updated.images[0]);
}

#[tokio::test]
async fn update_appends_new_images_after_kept_ones() {
    let t = TestCatalog::new();
    let id = t
        .service
        .create(draft("Ordering"), vec![image("a.png"), image("b.png")], None)
        .await
        .unwrap();
    let before = t.service.get(&id).await.unwrap().unwrap();

    // The first new file finishes well after the second.
    t.blobs.delay_put_containing("c.png", 80);

    let patch = ProjectPatch {
        existing_images: before.images.clone(),
        ..Default::default()
    };
    t.service
        .update(&id, patch, vec![image("c.png"), image("d.png")], None)
        .await
        .unwrap();

    let after = t.service.get(&id).await.unwrap().unwrap();
    assert_eq!(after.images.len(), 4);
    assert_eq!(&after.images[..2], &before.images[..]);
    assert!(after.images[2].contains("_0_c.png"));
    assert!(after.images[3].contains("_1_d.png"));
}

#[tokio::test]
async fn delete_attempts_every_blob_and_survives_a_blob_failure() {
    let t = TestCatalog::new();
    let id = t
        .service
        .create(
            draft("Doomed"),
            vec![image("x.png"), image("y.png"), image("z.png")],
            None,
        )
        .await
        .unwrap();
    let project = t.service.get(&id).await.unwrap().unwrap();

    t.blobs.fail_delete_of(&project.images[1]);

    t.service.remove(&id).await.unwrap();

    assert!(t.service.get(&id).await.unwrap().is_none());
    let attempted: Vec<String> = t.blobs.deleted.lock().unwrap().clone();
    assert_eq!(attempted.len(), 3);
    let attempted: HashSet<String> = attempted.into_iter().collect();
    let expected: HashSet<String> = project.images.iter().cloned().collect();
    assert_eq!(attempted, expected);
}

#[tokio::test]
async fn delete_falls_back_to_the_legacy_single_image_field() {
    let t = TestCatalog::new();
    let now = Utc::now();
    let legacy = Project {
        id: "legacy1".into(),
        title: "Pre-migration".into(),
        description: "single-image record".into(),
        images: Vec::new(),
        primary_image_index: 0,
        image_url: "mem://projects/legacy1/cover.png".into(),
        technologies: Vec::new(),
        github_url: None,
        live_url: None,
        featured: false,
        created_at: now,
        updated_at: now,
    };
    t.store.insert_raw(legacy.clone());

    t.service.remove("legacy1").await.unwrap();

    assert_eq!(
        *t.blobs.deleted.lock().unwrap(),
        vec![legacy.image_url.clone()]
    );
    assert!(t.service.get("legacy1").await.unwrap().is_none());
}

#[tokio::test]
async fn update_without_image_changes_only_moves_updated_at() {
    let t = TestCatalog::new();
    let mut d = draft("Stable");
    d.primary_image_index = 1;
    let id = t
        .service
        .create(d, vec![image("one.png"), image("two.png")], None)
        .await
        .unwrap();
    let before = t.service.get(&id).await.unwrap().unwrap();

    let patch = ProjectPatch {
        existing_images: before.images.clone(),
        ..Default::default()
    };
    t.service.update(&id, patch, vec![], None).await.unwrap();

    let after = t.service.get(&id).await.unwrap().unwrap();
    assert_eq!(after.images, before.images);
    assert_eq!(after.image_url, before.image_url);
    assert_eq!(after.primary_image_index, before.primary_image_index);
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at > before.updated_at);
}

#[tokio::test]
async fn stale_primary_index_falls_back_to_the_first_image() {
    let t = TestCatalog::new();
    let id = t
        .service
        .create(draft("Stale"), vec![image("one.png"), image("two.png")], None)
        .await
        .unwrap();
    let project = t.service.get(&id).await.unwrap().unwrap();

    // Editor removed the first image but kept an index pointing past the end.
    let patch = ProjectPatch {
        primary_image_index: Some(5),
        existing_images: vec![project.images[1].clone()],
        ..Default::default()
    };
    t.service.update(&id, patch, vec![], None).await.unwrap();

    let updated = t.service.get(&id).await.unwrap().unwrap();
    assert_eq!(updated.images, vec![project.images[1].clone()]);
    assert_eq!(updated.primary_image_index, 0);
    assert_eq!(updated.image_url, updated.images[0]);
}

#[tokio::test]
async fn create_reports_monotone_aggregate_progress() {
    let t = TestCatalog::new();
    let seen: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = seen.clone();
        move |pct: u8| seen.lock().unwrap().push(pct)
    };

    t.service
        .create(
            draft("Progress"),
            vec![image("one.png"), image("two.png")],
            Some(&sink as &ProgressSink<'_>),
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(*seen.first().unwrap(), 0);
    assert_eq!(*seen.last().unwrap(), 100);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn failed_upload_fails_the_whole_batch() {
    let t = TestCatalog::new();
    t.blobs.fail_put_containing("bad.png");

    let result = t
        .service
        .create(draft("Partial"), vec![image("ok.png"), image("bad.png")], None)
        .await;
    assert!(result.is_err());

    // The phase-one placeholder record remains, never patched.
    let page = t.service.list(10, None).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.items[0].images.is_empty());
    assert_eq!(page.items[0].image_url, "");
}

#[tokio::test]
async fn update_of_missing_project_is_not_found() {
    let t = TestCatalog::new();
    let err = t
        .service
        .update("nope", ProjectPatch::default(), vec![], None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Store(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn featured_listing_filters_and_bounds() {
    let t = TestCatalog::new();
    t.seed(2).await;
    for i in 0..3 {
        let mut d = draft(&format!("Featured {i}"));
        d.featured = true;
        t.service.create(d, vec![image("f.png")], None).await.unwrap();
    }

    let featured = t.service.list_featured(2).await.unwrap();
    assert_eq!(featured.len(), 2);
    assert!(featured.iter().all(|p| p.featured));
    assert!(featured[0].created_at > featured[1].created_at);
}
