//! Integration tests for the tree walk against a mock listing API.

mod support;

use std::time::{Duration, Instant};

use serde_json::json;
use support::fixtures::{
    LINK, RESOURCES_PATH, dir_item, file_item, listing, mount_page, test_config,
};
use support::socket_guard::start_mock_server_or_skip;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};
use yadloader_core::{
    ClientConfig, DecodeError, PublicDiskClient, WalkError, WalkLimits, WalkProgress,
};

fn client(config: ClientConfig) -> PublicDiskClient {
    PublicDiskClient::new(config).unwrap()
}

#[tokio::test]
async fn test_empty_share_without_embedded_returns_no_files() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_page(
        &server,
        "/",
        0,
        100,
        json!({"path": "/", "type": "dir", "name": "share"}),
    )
    .await;

    let files = client(test_config(&server, 100))
        .get_tree(LINK, "/", None)
        .await
        .unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_empty_start_path_means_root() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_page(&server, "/", 0, 100, listing("/", 0, 100, vec![])).await;

    let files = client(test_config(&server, 100))
        .get_tree(LINK, "", None)
        .await
        .unwrap();
    assert!(files.is_empty());
}

#[tokio::test]
async fn test_nested_tree_is_flattened_depth_first() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 2;
    mount_page(
        &server,
        "/",
        0,
        limit,
        listing(
            "/",
            0,
            limit,
            vec![file_item(&server, "/a.txt", b"alpha"), dir_item("/sub")],
        ),
    )
    .await;
    mount_page(&server, "/", 2, limit, listing("/", 2, limit, vec![])).await;
    mount_page(
        &server,
        "/sub",
        0,
        limit,
        listing(
            "/sub",
            0,
            limit,
            vec![
                file_item(&server, "/sub/b.txt", b"bravo!"),
                file_item(&server, "/sub/c.txt", b"charlie"),
            ],
        ),
    )
    .await;
    mount_page(&server, "/sub", 2, limit, listing("/sub", 2, limit, vec![])).await;

    let mut seen = Vec::new();
    let mut on_progress = |progress: WalkProgress| seen.push(progress);
    let files = client(test_config(&server, limit))
        .get_tree(LINK, "/", Some(&mut on_progress))
        .await
        .unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["/a.txt", "/sub/b.txt", "/sub/c.txt"]);
    for file in &files {
        assert!(!file.name.is_empty());
        assert!(file.file.starts_with("http"));
    }

    // After the k-th file: count == k and bytes == sum of the first k sizes.
    assert_eq!(
        seen,
        vec![
            WalkProgress { files: 1, bytes: 5 },
            WalkProgress { files: 2, bytes: 11 },
            WalkProgress { files: 3, bytes: 18 },
        ]
    );
}

#[tokio::test]
async fn test_parent_resumes_its_own_pages_after_subdirectory() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 2;
    mount_page(
        &server,
        "/",
        0,
        limit,
        listing(
            "/",
            0,
            limit,
            vec![file_item(&server, "/a.txt", b"a"), dir_item("/sub")],
        ),
    )
    .await;
    mount_page(
        &server,
        "/sub",
        0,
        limit,
        listing(
            "/sub",
            0,
            limit,
            vec![
                file_item(&server, "/sub/b.txt", b"bb"),
                file_item(&server, "/sub/c.txt", b"ccc"),
            ],
        ),
    )
    .await;
    mount_page(
        &server,
        "/sub",
        2,
        limit,
        listing("/sub", 2, limit, vec![file_item(&server, "/sub/d.txt", b"dddd")]),
    )
    .await;
    mount_page(&server, "/sub", 4, limit, listing("/sub", 4, limit, vec![])).await;
    mount_page(
        &server,
        "/",
        2,
        limit,
        listing("/", 2, limit, vec![file_item(&server, "/e.txt", b"eeeee")]),
    )
    .await;
    mount_page(&server, "/", 4, limit, listing("/", 4, limit, vec![])).await;

    let files = client(test_config(&server, limit))
        .get_tree(LINK, "/", None)
        .await
        .unwrap();

    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["/a.txt", "/sub/b.txt", "/sub/c.txt", "/sub/d.txt", "/e.txt"]
    );
    assert_eq!(files.iter().map(|f| f.size).sum::<u64>(), 15);
}

#[tokio::test]
async fn test_directory_listing_itself_is_rejected() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 10;
    mount_page(&server, "/", 0, limit, listing("/", 0, limit, vec![dir_item("/")])).await;

    let api = client(test_config(&server, limit));
    let walk = api.get_tree(LINK, "/", None);
    let err = tokio::time::timeout(Duration::from_secs(5), walk)
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        WalkError::Decode(DecodeError::CyclicListing { ref ancestor, .. }) if ancestor == "/"
    ));
}

#[tokio::test]
async fn test_subdirectory_listing_its_ancestor_is_rejected() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 10;
    mount_page(&server, "/", 0, limit, listing("/", 0, limit, vec![dir_item("/a")])).await;
    mount_page(
        &server,
        "/a",
        0,
        limit,
        listing("/a", 0, limit, vec![dir_item("/a/b")]),
    )
    .await;
    mount_page(
        &server,
        "/a/b",
        0,
        limit,
        listing("/a/b", 0, limit, vec![dir_item("/a/")]),
    )
    .await;

    let api = client(test_config(&server, limit));
    let walk = api.get_tree(LINK, "/", None);
    let err = tokio::time::timeout(Duration::from_secs(5), walk)
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(
        err,
        WalkError::Decode(DecodeError::CyclicListing { ref path, ref ancestor })
            if path == "/a/b" && ancestor == "/a"
    ));
}

#[tokio::test]
async fn test_full_page_then_empty_page_takes_two_requests() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 3;
    mount_page(
        &server,
        "/",
        0,
        limit,
        listing(
            "/",
            0,
            limit,
            vec![
                file_item(&server, "/1", b"1"),
                file_item(&server, "/2", b"22"),
                file_item(&server, "/3", b"333"),
            ],
        ),
    )
    .await;
    mount_page(&server, "/", 3, limit, listing("/", 3, limit, vec![])).await;

    let files = client(test_config(&server, limit))
        .get_tree(LINK, "/", None)
        .await
        .unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_short_page_does_not_end_listing() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    // The server's `total` is ignored and a short page is not treated as the last.
    let limit = 2;
    mount_page(
        &server,
        "/",
        0,
        limit,
        listing("/", 0, limit, vec![file_item(&server, "/1", b"1")]),
    )
    .await;
    mount_page(
        &server,
        "/",
        2,
        limit,
        listing("/", 2, limit, vec![file_item(&server, "/2", b"2")]),
    )
    .await;
    mount_page(&server, "/", 4, limit, listing("/", 4, limit, vec![])).await;

    let files = client(test_config(&server, limit))
        .get_tree(LINK, "/", None)
        .await
        .unwrap();
    let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["/1", "/2"]);
}

#[tokio::test]
async fn test_failure_at_depth_fails_whole_walk() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 2;
    mount_page(
        &server,
        "/",
        0,
        limit,
        listing(
            "/",
            0,
            limit,
            vec![file_item(&server, "/ok.txt", b"ok"), dir_item("/broken")],
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .and(query_param("path", "/broken"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(test_config(&server, limit))
        .get_tree(LINK, "/", None)
        .await
        .unwrap_err();
    match err {
        WalkError::Transport(transport) => assert_eq!(transport.status(), Some(404)),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transient_server_error_is_retried() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        0,
        100,
        listing("/", 0, 100, vec![file_item(&server, "/a", b"a")]),
    )
    .await;
    mount_page(&server, "/", 100, 100, listing("/", 100, 100, vec![])).await;

    let files = client(test_config(&server, 100))
        .get_tree(LINK, "/", None)
        .await
        .unwrap();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_start_path_pointing_at_file_is_rejected() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_page(&server, "/a.txt", 0, 100, file_item(&server, "/a.txt", b"a")).await;

    let err = client(test_config(&server, 100))
        .get_tree(LINK, "/a.txt", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalkError::Decode(DecodeError::NotADirectory { ref path }) if path == "/a.txt"
    ));
}

#[tokio::test]
async fn test_malformed_listing_is_decode_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(test_config(&server, 100))
        .get_tree(LINK, "/", None)
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::Decode(DecodeError::Json { .. })));
}

#[tokio::test]
async fn test_file_item_without_size_is_schema_violation() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let mut item = file_item(&server, "/nosize.bin", b"xyz");
    item.as_object_mut().unwrap().remove("size");
    mount_page(&server, "/", 0, 100, listing("/", 0, 100, vec![item])).await;

    let err = client(test_config(&server, 100))
        .get_tree(LINK, "/", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalkError::Decode(DecodeError::MissingField { field: "size", .. })
    ));
}

#[tokio::test]
async fn test_repeated_page_is_reported_as_stalled() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    // Ignores the offset and keeps returning the first page.
    let limit = 2;
    let body = listing(
        "/",
        0,
        limit,
        vec![file_item(&server, "/1", b"1"), file_item(&server, "/2", b"2")],
    );
    Mock::given(method("GET"))
        .and(path(RESOURCES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(test_config(&server, limit))
        .get_tree(LINK, "/", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WalkError::Decode(DecodeError::StalledPagination { offset: 2, .. })
    ));
}

#[tokio::test]
async fn test_depth_limit_stops_walk() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 10;
    mount_page(&server, "/", 0, limit, listing("/", 0, limit, vec![dir_item("/a")])).await;
    mount_page(
        &server,
        "/a",
        0,
        limit,
        listing("/a", 0, limit, vec![dir_item("/a/b")]),
    )
    .await;

    let config = ClientConfig {
        limits: WalkLimits {
            max_depth: Some(1),
            max_files: None,
        },
        ..test_config(&server, limit)
    };
    let err = client(config).get_tree(LINK, "/", None).await.unwrap_err();
    assert!(matches!(
        err,
        WalkError::DepthLimitExceeded { ref path, max_depth: 1 } if path == "/a/b"
    ));
}

#[tokio::test]
async fn test_page_delay_applies_between_pages_of_a_directory() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 1;
    mount_page(
        &server,
        "/",
        0,
        limit,
        listing("/", 0, limit, vec![file_item(&server, "/1", b"1")]),
    )
    .await;
    mount_page(&server, "/", 1, limit, listing("/", 1, limit, vec![])).await;

    let config = ClientConfig {
        page_delay: Duration::from_millis(200),
        ..test_config(&server, limit)
    };
    let started = Instant::now();
    client(config).get_tree(LINK, "/", None).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_cancel_during_page_delay_stops_walk() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let limit = 1;
    mount_page(
        &server,
        "/",
        0,
        limit,
        listing("/", 0, limit, vec![file_item(&server, "/1", b"1")]),
    )
    .await;

    let config = ClientConfig {
        page_delay: Duration::from_secs(60),
        ..test_config(&server, limit)
    };
    let client = client(config);
    let cancel = client.cancel_signal();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let err = client.get_tree(LINK, "/", None).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(10));
}
