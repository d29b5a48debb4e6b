mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{MockService, app_state, eventually, two_profiles, wait_for_status};
use image_dropper_lib::commands::{add_paths, clear_files, settings};
use image_dropper_lib::core::{FileStatus, RegistryEvent};
use image_dropper_lib::utils::TransformError;

#[tokio::test]
async fn duplicate_paths_are_processed_once() {
    let service = Arc::new(MockService::new().with_file("/img/a.png", 1000));
    let state = app_state(service.clone(), Some(2)).await;

    assert!(state.pipeline().add_file("/img/a.png"));
    assert!(!state.pipeline().add_file("/img/a.png"));
    state.registry().settled().await;

    assert_eq!(state.registry().len(), 1);
    assert_eq!(service.dispatched_paths(), vec!["/img/a.png"]);
}

#[tokio::test]
async fn statuses_only_move_forward() {
    let service = Arc::new(
        MockService::new()
            .with_file("/img/ok.png", 1000)
            .with_file("/img/small.png", 10)
            .with_file("/img/broken.png", 1000)
            .with_outcome("/img/small.png", Err(TransformError::not_smaller("already tiny")))
            .with_outcome("/img/broken.png", Err(TransformError::generic("optimizer crashed"))),
    );
    let state = app_state(service.clone(), Some(2)).await;
    let mut events = state.registry().events();

    for path in ["/img/ok.png", "/img/small.png", "/img/broken.png", "/img/missing.png"] {
        state.pipeline().add_file(path);
    }
    state.registry().settled().await;

    let mut history: HashMap<String, Vec<FileStatus>> = HashMap::new();
    while let Ok(event) = events.try_recv() {
        match event {
            RegistryEvent::Added(entry) | RegistryEvent::Updated(entry) => {
                history.entry(entry.path).or_default().push(entry.status);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    for (path, statuses) in &history {
        assert_eq!(statuses[0], FileStatus::Processing, "{}", path);
        for pair in statuses.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{}: {:?}", path, statuses);
        }
    }

    let registry = state.registry();
    assert_eq!(registry.get("/img/ok.png").unwrap().status, FileStatus::Complete);

    let small = registry.get("/img/small.png").unwrap();
    assert_eq!(small.status, FileStatus::AlreadySmaller);
    assert_eq!(small.error.as_deref(), Some("already tiny"));

    let broken = registry.get("/img/broken.png").unwrap();
    assert_eq!(broken.status, FileStatus::Error);
    assert_eq!(broken.error.as_deref(), Some("optimizer crashed"));

    // Inspection failures never reach the optimizer
    let missing = registry.get("/img/missing.png").unwrap();
    assert_eq!(missing.status, FileStatus::Error);
    assert!(missing.error.unwrap().contains("does not exist"));
    assert!(!service.dispatched_paths().contains(&"/img/missing.png".to_string()));
}

#[tokio::test]
async fn savings_are_relative_to_the_original() {
    let service = Arc::new(
        MockService::new()
            .with_file("/img/a.png", 1000)
            .with_outcome("/img/a.png", Ok(400))
            .with_file("/img/empty.png", 0),
    );
    let state = app_state(service, Some(2)).await;
    state.pipeline().add_file("/img/a.png");
    state.pipeline().add_file("/img/empty.png");
    state.registry().settled().await;

    let entry = state.registry().get("/img/a.png").unwrap();
    assert_eq!(entry.original_size, Some(1000));
    assert_eq!(entry.size, Some(400));
    assert_eq!(entry.savings, Some(60.0));
    assert_eq!(entry.out_path.as_deref(), Some("/img/a.png.min"));
    assert_eq!(entry.file, "a.png");
    assert_eq!(entry.ext, "png");

    let empty = state.registry().get("/img/empty.png").unwrap();
    assert_eq!(empty.status, FileStatus::Complete);
    assert_eq!(empty.savings, None);
}

#[tokio::test]
async fn compressions_never_exceed_the_thread_limit() {
    let service = Arc::new(MockService::gated());
    for i in 0..8 {
        service.add_file(&format!("/img/{}.png", i), 1000);
    }
    let state = app_state(service.clone(), Some(2)).await;

    assert_eq!(add_paths(&state, ["/img"]).await, 8);
    eventually(|| service.running() == 2 && state.limiter().queued() == 6).await;
    assert_eq!(state.limiter().running(), 2);

    service.release(8);
    state.registry().settled().await;
    assert_eq!(service.peak(), 2);
    assert_eq!(state.registry().summary().complete, 8);
    assert_eq!(state.limiter().running(), 0);
}

#[tokio::test]
async fn zero_threads_means_no_limit() {
    let service = Arc::new(MockService::gated());
    for i in 0..5 {
        service.add_file(&format!("/img/{}.png", i), 1000);
    }
    let state = app_state(service.clone(), Some(0)).await;

    add_paths(&state, ["/img"]).await;
    eventually(|| service.running() == 5).await;
    assert_eq!(state.limiter().queued(), 0);

    service.release(5);
    state.registry().settled().await;
}

#[tokio::test]
async fn queued_files_start_in_arrival_order() {
    let service = Arc::new(
        MockService::gated()
            .with_file("/img/a.png", 1000)
            .with_file("/img/b.png", 1000)
            .with_file("/img/c.png", 1000),
    );
    let state = app_state(service.clone(), Some(1)).await;
    let pipeline = state.pipeline();

    pipeline.add_file("/img/a.png");
    eventually(|| service.running() == 1).await;
    pipeline.add_file("/img/b.png");
    eventually(|| state.limiter().queued() == 1).await;
    pipeline.add_file("/img/c.png");
    eventually(|| state.limiter().queued() == 2).await;

    service.release(3);
    state.registry().settled().await;
    assert_eq!(service.dispatched_paths(), vec!["/img/a.png", "/img/b.png", "/img/c.png"]);
}

#[tokio::test]
async fn cleared_entries_stay_gone() {
    let service = Arc::new(
        MockService::gated()
            .with_file("/img/a.png", 1000)
            .with_file("/img/b.png", 1000),
    );
    let state = app_state(service.clone(), Some(1)).await;

    state.pipeline().add_file("/img/a.png");
    eventually(|| service.running() == 1).await;
    state.pipeline().add_file("/img/b.png");
    wait_for_status(state.registry(), "/img/b.png", FileStatus::Compressing).await;
    eventually(|| state.limiter().queued() == 1).await;

    clear_files(&state);
    service.release(2);
    eventually(|| state.limiter().running() == 0 && state.limiter().queued() == 0).await;

    assert!(state.registry().is_empty());
    // b was still waiting for a slot and is never compressed
    assert_eq!(service.dispatched_paths(), vec!["/img/a.png"]);
}

#[tokio::test]
async fn readded_path_ignores_the_old_job() {
    let service = Arc::new(
        MockService::gated()
            .with_file("/img/a.png", 1000)
            .with_outcome("/img/a.png", Ok(100)),
    );
    let state = app_state(service.clone(), Some(1)).await;
    let mut events = state.registry().events();

    state.pipeline().add_file("/img/a.png");
    eventually(|| service.running() == 1).await;
    clear_files(&state);
    assert!(state.pipeline().add_file("/img/a.png"));
    eventually(|| state.limiter().queued() == 1).await;

    // The first job finishes while the second entry is still waiting
    service.release(1);
    eventually(|| service.dispatched().len() == 2).await;
    assert_eq!(
        state.registry().get("/img/a.png").unwrap().status,
        FileStatus::Compressing
    );

    service.release(1);
    state.registry().settled().await;
    assert_eq!(state.registry().get("/img/a.png").unwrap().status, FileStatus::Complete);

    let completions = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, RegistryEvent::Updated(entry) if entry.status == FileStatus::Complete))
        .count();
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn profile_is_chosen_when_compression_starts() {
    let service = Arc::new(
        MockService::gated()
            .with_settings(two_profiles())
            .with_file("/img/a.png", 1000)
            .with_file("/img/b.png", 1000),
    );
    let state = app_state(service.clone(), Some(1)).await;

    state.pipeline().add_file("/img/a.png");
    eventually(|| service.running() == 1).await;
    state.pipeline().add_file("/img/b.png");
    eventually(|| state.limiter().queued() == 1).await;

    settings::set_active_profile(&state, 1);
    service.release(2);
    state.registry().settled().await;

    assert_eq!(
        service.dispatched(),
        vec![("/img/a.png".to_string(), 0), ("/img/b.png".to_string(), 1)]
    );
}

#[tokio::test]
async fn capacity_follows_the_threads_setting() {
    let mut stored = two_profiles();
    stored.threads = 1;
    let service = Arc::new(MockService::gated().with_settings(stored));
    for name in ["a", "b", "c"] {
        service.add_file(&format!("/img/{}.png", name), 1000);
    }
    let state = app_state(service.clone(), None).await;

    add_paths(&state, ["/img"]).await;
    eventually(|| service.running() == 1 && state.limiter().queued() == 2).await;

    settings::set_threads(&state, 3);
    eventually(|| service.running() == 3).await;

    service.release(3);
    state.registry().settled().await;
    assert_eq!(state.registry().summary().complete, 3);
}
