//! ArchiveFetcher against a mocked binary cache and a tar-based unpack tool.

mod common;

use std::time::{Duration, Instant};

use common::{tar_archive, tar_unpack, Fixture};
use r13y_diff::{ArchiveFetcher, CancellationToken, CommandSpec, ErrorKind, UnpackWait};
use wiremock::{MockServer, ResponseTemplate};

fn fetcher(unpack: CommandSpec, wait: UnpackWait) -> ArchiveFetcher {
    // Small chunks so multi-chunk streaming is exercised.
    ArchiveFetcher::with_client(reqwest::Client::new(), unpack, 64, wait)
}

#[tokio::test]
async fn fetch_unpacks_archive_into_destination() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(1, "hello-2.12.1");
    let archive = tar_archive(&[
        ("bin/hello", "#!/bin/sh\necho hello\n"),
        ("share/doc/README", "hello docs"),
    ]);
    let archive_len = archive.len() as u64;
    fixture.serve(&server, archive).await;

    let slot = tempfile::tempdir().unwrap();
    let dest = slot.path().join(fixture.descriptor.tree_name());
    let url = fixture.descriptor.nar_url(&server.uri());

    let bytes = fetcher(tar_unpack(), UnpackWait::UntilCancelled)
        .fetch(&url, &dest, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(bytes, archive_len);
    assert_eq!(
        std::fs::read_to_string(dest.join("share/doc/README")).unwrap(),
        "hello docs"
    );
    assert!(dest.join("bin/hello").is_file());
}

#[tokio::test]
async fn non_success_status_is_fetch_error_and_leaves_no_tree() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(2, "missing");
    fixture
        .serve_with(&server, ResponseTemplate::new(404))
        .await;

    let slot = tempfile::tempdir().unwrap();
    let dest = slot.path().join(fixture.descriptor.tree_name());
    let err = fetcher(tar_unpack(), UnpackWait::UntilCancelled)
        .fetch(
            &fixture.descriptor.nar_url(&server.uri()),
            &dest,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Fetch);
    match err {
        r13y_diff::DiffError::Fetch { status, .. } => assert_eq!(status, Some(404)),
        other => panic!("expected Fetch, got {other:?}"),
    }
    assert!(!dest.exists());
    assert_eq!(common::entries(slot.path()), 0);
}

#[tokio::test]
async fn corrupt_archive_is_unpack_error_and_partial_tree_is_removed() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(3, "corrupt");
    fixture
        .serve(&server, b"this is not a tar stream".repeat(40))
        .await;

    let slot = tempfile::tempdir().unwrap();
    let dest = slot.path().join(fixture.descriptor.tree_name());
    let err = fetcher(tar_unpack(), UnpackWait::UntilCancelled)
        .fetch(
            &fixture.descriptor.nar_url(&server.uri()),
            &dest,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unpack);
    // The wrapper creates the directory before tar fails.
    assert!(!dest.exists());
}

#[tokio::test]
async fn tool_that_exits_cleanly_without_output_is_unpack_error() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(4, "empty");
    fixture.serve(&server, tar_archive(&[("f", "x")])).await;

    let slot = tempfile::tempdir().unwrap();
    let dest = slot.path().join(fixture.descriptor.tree_name());
    let swallow = CommandSpec::new("sh").arg("-c").arg("cat >/dev/null").arg("unpack");
    let err = fetcher(swallow, UnpackWait::UntilCancelled)
        .fetch(
            &fixture.descriptor.nar_url(&server.uri()),
            &dest,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unpack);
    assert!(err.to_string().contains("produced no tree"));
}

#[tokio::test]
async fn bounded_wait_fails_a_hanging_tool() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(5, "hang");
    fixture.serve(&server, tar_archive(&[("f", "x")])).await;

    let slot = tempfile::tempdir().unwrap();
    let dest = slot.path().join(fixture.descriptor.tree_name());
    // Reads its input, then never exits.
    let hang = CommandSpec::new("sh")
        .arg("-c")
        .arg(r#"mkdir -p "$1" && cat >/dev/null && exec sleep 30"#)
        .arg("unpack");

    let started = Instant::now();
    let err = fetcher(hang, UnpackWait::Bounded(Duration::from_millis(200)))
        .fetch(
            &fixture.descriptor.nar_url(&server.uri()),
            &dest,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unpack);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!dest.exists());
}

#[tokio::test]
async fn cancellation_kills_the_tool_and_cleans_up() {
    let server = MockServer::start().await;
    let fixture = Fixture::new(6, "slow");
    fixture.serve(&server, tar_archive(&[("f", "x")])).await;

    let slot = tempfile::tempdir().unwrap();
    let dest = slot.path().join(fixture.descriptor.tree_name());
    let hang = CommandSpec::new("sh")
        .arg("-c")
        .arg(r#"mkdir -p "$1" && cat >/dev/null && exec sleep 30"#)
        .arg("unpack");

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = fetcher(hang, UnpackWait::UntilCancelled)
        .fetch(&fixture.descriptor.nar_url(&server.uri()), &dest, &token)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!dest.exists());
}
