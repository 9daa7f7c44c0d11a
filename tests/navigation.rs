use std::{sync::Arc, time::Duration};

use dvlib::{
    result::ErrorKind,
    test_helpers::{make_loader, make_navigator, urls, MockFetcher},
    tracing_setup::init_tracing_for_tests,
    view::NavButtons,
    NavState,
};

#[tokio::test]
async fn test_browse_three_images() {
    init_tracing_for_tests();
    let fetcher = Arc::new(MockFetcher::new());
    let (mut nav, source) = make_navigator(vec![Ok(urls(&["a", "b", "c"]))], fetcher.clone());

    assert_eq!(nav.fetch(3).await.unwrap(), 3);
    assert_eq!(source.n_calls(), 1);
    assert_eq!(
        nav.nav_state(),
        NavState {
            current_idx: Some(0),
            len: 3
        }
    );
    let a = nav.current().await.unwrap();
    assert_eq!(fetcher.n_fetches("a"), 1);

    nav.next().await.unwrap();
    assert_eq!(nav.current_idx(), Some(1));
    assert_eq!(nav.current_url(), Some("b"));
    nav.next().await.unwrap();
    assert_eq!(nav.current_idx(), Some(2));
    assert_eq!(nav.current_url(), Some("c"));

    let e = nav.next().await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::OutOfRange);
    assert_eq!(nav.current_idx(), Some(2));

    nav.previous().await.unwrap();
    let a_again = nav.previous().await.unwrap();
    assert_eq!(nav.current_idx(), Some(0));
    assert!(Arc::ptr_eq(&a, &a_again));
    for url in ["a", "b", "c"] {
        assert_eq!(fetcher.n_fetches(url), 1);
    }

    let e = nav.previous().await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::OutOfRange);
    assert_eq!(nav.current_idx(), Some(0));
}

#[tokio::test]
async fn test_empty_url_list() {
    let (mut nav, _) = make_navigator(vec![Ok(vec![])], Arc::new(MockFetcher::new()));
    assert_eq!(nav.fetch(0).await.unwrap(), 0);
    assert!(nav.nav_state().is_empty());
    let e = nav.current().await.unwrap_err();
    assert_eq!(e.kind(), ErrorKind::OutOfRange);
    assert_eq!(
        NavButtons::from_state(nav.nav_state()),
        NavButtons::default()
    );
}

#[tokio::test]
async fn test_new_fetch_replaces_list_and_keeps_cache() {
    let fetcher = Arc::new(MockFetcher::new());
    let responses = vec![Ok(urls(&["a", "b"])), Ok(urls(&["b", "x", "y"]))];
    let (mut nav, _) = make_navigator(responses, fetcher.clone());
    nav.fetch(2).await.unwrap();
    nav.current().await.unwrap();
    nav.next().await.unwrap();
    assert_eq!(nav.fetch(3).await.unwrap(), 3);
    assert_eq!(nav.current_idx(), Some(0));
    assert_eq!(nav.len(), 3);
    // b has been loaded during the first fetch already
    nav.current().await.unwrap();
    assert_eq!(fetcher.n_fetches("b"), 1);
    assert_eq!(
        NavButtons::from_state(nav.nav_state()),
        NavButtons {
            previous_enabled: false,
            next_enabled: true
        }
    );
}

#[tokio::test]
async fn test_fetch_count_is_passed_through() {
    let fetcher = Arc::new(MockFetcher::new());
    let (mut nav, _) = make_navigator(vec![Ok(urls(&["a", "b", "c", "d"]))], fetcher);
    // the url source honors the count, the navigator does not limit it
    assert_eq!(nav.fetch(2).await.unwrap(), 2);
    assert_eq!(nav.image_urls(), &urls(&["a", "b"])[..]);
}

#[tokio::test]
async fn test_concurrent_current_single_download() {
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(50)));
    let (mut nav, _) = make_navigator(vec![Ok(urls(&["a", "b"]))], fetcher.clone());
    nav.fetch(2).await.unwrap();
    let (r1, r2) = futures::join!(nav.current(), nav.current());
    assert!(Arc::ptr_eq(&r1.unwrap(), &r2.unwrap()));
    assert_eq!(fetcher.n_fetches("a"), 1);
}

#[tokio::test]
async fn test_shared_loader_across_tasks() {
    let fetcher = Arc::new(MockFetcher::new().with_delay(Duration::from_millis(50)));
    let loader = make_loader(fetcher.clone(), Duration::from_secs(5));
    let handles = (0..8)
        .map(|_| {
            let loader = Arc::clone(&loader);
            tokio::spawn(async move { loader.resolve("shared").await })
        })
        .collect::<Vec<_>>();
    for h in handles {
        assert!(h.await.unwrap().is_ok());
    }
    assert_eq!(fetcher.n_fetches("shared"), 1);
    let stats = loader.stats();
    assert_eq!(stats.n_misses + stats.n_coalesced + stats.n_hits, 8);
}
