use std::{
    collections::{HashMap, VecDeque},
    io::{self, Cursor, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use assert_matches::assert_matches;
use async_trait::async_trait;
use bytes::Bytes;
use fenrir_fetch::{
    ArchiveSource, Artifact, FetchError, FetchOptions, FetchOutcome, Fetcher,
    archive::ExtractError,
    http::{Download, HttpClient, NetworkError},
    prompt::{LinePrompt, Prompt},
};
use flate2::{Compression, write::GzEncoder};
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use reqwest::StatusCode;
use rstest::rstest;
use sha2::{Digest, Sha256};
use url::Url;

enum Response {
    Body(Vec<u8>),
    /// Sends the bytes, then fails the transfer.
    Interrupted(Vec<u8>),
}

/// Serves canned bodies in small chunks and counts the requests it receives.
#[derive(Default)]
struct FakeClient {
    responses: HashMap<Url, Response>,
    calls: AtomicUsize,
}

impl FakeClient {
    fn serve(mut self, url: &Url, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.clone(), Response::Body(body.into()));
        self
    }

    fn interrupt(mut self, url: &Url, body: impl Into<Vec<u8>>) -> Self {
        self.responses
            .insert(url.clone(), Response::Interrupted(body.into()));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn chunks(body: &[u8]) -> Vec<io::Result<Bytes>> {
    body.chunks(7)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect()
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn get(&self, url: &Url) -> Result<Download, NetworkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some(Response::Body(body)) => Ok(Download {
                content_length: Some(body.len() as u64),
                body: stream::iter(chunks(body)).boxed(),
            }),
            Some(Response::Interrupted(body)) => {
                let mut parts = chunks(body);
                parts.push(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset",
                )));
                Ok(Download {
                    content_length: None,
                    body: stream::iter(parts).boxed(),
                })
            }
            None => Err(NetworkError::Status {
                url: url.clone(),
                status: StatusCode::NOT_FOUND,
            }),
        }
    }
}

/// Answers with a fixed list of decisions and counts how often it is asked.
struct ScriptedPrompt {
    answers: Mutex<VecDeque<bool>>,
    asked: AtomicUsize,
}

impl ScriptedPrompt {
    fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: AtomicUsize::new(0),
        }
    }

    fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

impl Prompt for ScriptedPrompt {
    fn should_download(&self, _name: &str) -> io::Result<bool> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no answer left"))
    }
}

fn sha256(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn url(path: &str) -> Url {
    Url::parse("https://downloads.example.com/")
        .unwrap()
        .join(path)
        .unwrap()
}

fn tarball(members: &[(&str, &[u8])], gzip: bool) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents).unwrap();
    }
    let tar = builder.into_inner().unwrap();
    if !gzip {
        return tar;
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

fn setup(
    client: FakeClient,
    answers: impl IntoIterator<Item = bool>,
) -> (Fetcher, Arc<FakeClient>, Arc<ScriptedPrompt>) {
    let client = Arc::new(client);
    let prompt = Arc::new(ScriptedPrompt::new(answers));
    let fetcher = Fetcher::new(client.clone(), prompt.clone());
    (fetcher, client, prompt)
}

fn direct_artifact(dir: &Path, body: &[u8]) -> Artifact {
    Artifact::new("kubectl", dir.join("bin"), sha256(body)).with_url(url("kubectl"))
}

#[tokio::test]
async fn valid_existing_file_is_trusted() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"kubectl binary".as_slice();
    let artifact = direct_artifact(dir.path(), body);
    fs_err::create_dir_all(&artifact.dest).unwrap();
    fs_err::write(artifact.path(), body).unwrap();

    let (fetcher, client, prompt) = setup(FakeClient::default().serve(&url("kubectl"), body), []);
    let outcome = fetcher
        .download(&artifact, FetchOptions::verbose())
        .await
        .unwrap();

    assert_eq!(outcome, FetchOutcome::Verified);
    assert_eq!(client.calls(), 0);
    assert_eq!(prompt.asked(), 0);
}

#[tokio::test]
async fn declined_download_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"kubectl binary".as_slice();
    let artifact = direct_artifact(dir.path(), body);

    let (fetcher, client, prompt) =
        setup(FakeClient::default().serve(&url("kubectl"), body), [false]);
    let outcome = fetcher
        .download(&artifact, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome, FetchOutcome::Skipped);
    assert_eq!(outcome.bytes_transferred(), 0);
    assert_eq!(client.calls(), 0);
    assert_eq!(prompt.asked(), 1);
    assert!(!artifact.path().exists());
}

#[tokio::test]
async fn downloaded_file_is_not_checked_again() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"whatever the server sends".as_slice();
    let artifact = Artifact::new("tool", dir.path().join("bin"), "abc123").with_url(url("tool"));

    let (fetcher, client, _) = setup(FakeClient::default().serve(&url("tool"), body), [true]);
    let outcome = fetcher
        .download(&artifact, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Downloaded {
            bytes: body.len() as u64,
            checksum: sha256(body),
        }
    );
    assert_eq!(client.calls(), 1);
    assert_eq!(fs_err::read(artifact.path()).unwrap(), body);
}

#[rstest]
#[case::accepted(true)]
#[case::declined(false)]
#[tokio::test]
async fn checksum_mismatch_asks_again(#[case] accept: bool) {
    let dir = tempfile::tempdir().unwrap();
    let body = b"fresh kubectl".as_slice();
    let artifact = direct_artifact(dir.path(), body);
    fs_err::create_dir_all(&artifact.dest).unwrap();
    fs_err::write(artifact.path(), "corrupted").unwrap();

    let (fetcher, client, prompt) =
        setup(FakeClient::default().serve(&url("kubectl"), body), [accept]);
    let outcome = fetcher
        .download(&artifact, FetchOptions::default())
        .await
        .unwrap();

    assert_eq!(prompt.asked(), 1);
    if accept {
        assert_matches!(outcome, FetchOutcome::Downloaded { .. });
        assert_eq!(client.calls(), 1);
        assert_eq!(fs_err::read(artifact.path()).unwrap(), body);
    } else {
        assert_eq!(outcome, FetchOutcome::Skipped);
        assert_eq!(client.calls(), 0);
        assert_eq!(fs_err::read(artifact.path()).unwrap(), b"corrupted");
    }
}

#[rstest]
#[case::tar(false, "helm.tar")]
#[case::tar_gz(true, "helm.tar.gz")]
#[tokio::test]
async fn extracts_the_member_from_the_archive(#[case] gzip: bool, #[case] tar_name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let binary: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    let archive = tarball(
        &[
            ("linux-amd64/LICENSE", &b"license"[..]),
            ("linux-amd64/helm", binary.as_slice()),
        ],
        gzip,
    );
    let artifact = Artifact::new("helm", dir.path().join("bin"), sha256(&binary)).with_archive(
        ArchiveSource {
            name: tar_name.to_string(),
            dest: dir.path().join("tars"),
            url: url(tar_name),
            member: "linux-amd64/helm".to_string(),
        },
    );

    let (fetcher, client, _) =
        setup(FakeClient::default().serve(&url(tar_name), archive.clone()), [true]);
    let outcome = fetcher
        .download(&artifact, FetchOptions::verbose().with_archive(gzip))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        FetchOutcome::Downloaded {
            bytes: archive.len() as u64,
            checksum: sha256(&binary),
        }
    );
    assert_eq!(client.calls(), 1);
    assert_eq!(fs_err::read(artifact.path()).unwrap(), binary);
    assert_eq!(fs_err::read(dir.path().join("tars").join(tar_name)).unwrap(), archive);

    // The second run finds a valid copy.
    let outcome = fetcher
        .download(&artifact, FetchOptions::verbose().with_archive(gzip))
        .await
        .unwrap();
    assert_eq!(outcome, FetchOutcome::Verified);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn missing_member_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let archive = tarball(&[("darwin-arm64/helm", &b"wrong platform"[..])], true);
    let artifact = Artifact::new("helm", dir.path().join("bin"), "abc123").with_archive(
        ArchiveSource {
            name: "helm.tar.gz".to_string(),
            dest: dir.path().join("tars"),
            url: url("helm.tar.gz"),
            member: "linux-amd64/helm".to_string(),
        },
    );

    let (fetcher, _, _) = setup(
        FakeClient::default().serve(&url("helm.tar.gz"), archive),
        [true],
    );
    let result = fetcher
        .download(&artifact, FetchOptions::default().with_archive(true))
        .await;

    assert_matches!(
        result,
        Err(FetchError::Extract {
            source: ExtractError::MemberNotFound { .. },
            ..
        })
    );
    assert!(!artifact.path().exists());
}

#[tokio::test]
async fn archive_ignored_without_the_option() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = Artifact::new("helm", dir.path().join("bin"), "abc123").with_archive(
        ArchiveSource {
            name: "helm.tar.gz".to_string(),
            dest: dir.path().join("tars"),
            url: url("helm.tar.gz"),
            member: "linux-amd64/helm".to_string(),
        },
    );

    let (fetcher, client, _) = setup(FakeClient::default(), [true]);
    let result = fetcher.download(&artifact, FetchOptions::default()).await;

    assert_matches!(result, Err(FetchError::MissingSource(name)) if name == "helm");
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn http_error_status_is_a_network_error() {
    let dir = tempfile::tempdir().unwrap();
    let artifact = direct_artifact(dir.path(), b"kubectl");

    let (fetcher, client, _) = setup(FakeClient::default(), [true]);
    let result = fetcher.download(&artifact, FetchOptions::default()).await;

    assert_matches!(
        result,
        Err(FetchError::Network(NetworkError::Status { status, .. })) if status == StatusCode::NOT_FOUND
    );
    assert_eq!(client.calls(), 1);
    assert!(!artifact.path().exists());
}

#[tokio::test]
async fn interrupted_transfer_keeps_the_old_file() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"the complete kubectl binary".as_slice();
    let artifact = direct_artifact(dir.path(), body);
    fs_err::create_dir_all(&artifact.dest).unwrap();
    fs_err::write(artifact.path(), "old").unwrap();

    let (fetcher, _, _) = setup(
        FakeClient::default().interrupt(&url("kubectl"), &body[..10]),
        [true],
    );
    let result = fetcher.download(&artifact, FetchOptions::default()).await;

    assert_matches!(
        result,
        Err(FetchError::Network(NetworkError::Transfer { .. }))
    );
    assert_eq!(fs_err::read(artifact.path()).unwrap(), b"old");
    let leftovers: Vec<_> = fs_err::read_dir(&artifact.dest)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, ["kubectl"]);
}

#[tokio::test]
async fn empty_answer_downloads() {
    let dir = tempfile::tempdir().unwrap();
    let body = b"kubectl binary".as_slice();
    let artifact = direct_artifact(dir.path(), body);

    let client = Arc::new(FakeClient::default().serve(&url("kubectl"), body));
    let fetcher = Fetcher::new(
        client.clone(),
        Arc::new(LinePrompt::new(Cursor::new(b"\n".to_vec()))),
    );
    let outcome = fetcher
        .download(&artifact, FetchOptions::default())
        .await
        .unwrap();

    assert_matches!(outcome, FetchOutcome::Downloaded { .. });
    assert_eq!(client.calls(), 1);
}

#[cfg(unix)]
#[tokio::test]
async fn downloaded_artifact_can_be_run() {
    use fenrir_task::TaskInput;

    let dir = tempfile::tempdir().unwrap();
    let script = b"#!/bin/sh\necho \"hello $1\"\n".as_slice();
    let artifact = Artifact::new("greet", dir.path().join("bin"), sha256(script))
        .with_url(url("greet"));

    let (fetcher, _, _) = setup(FakeClient::default().serve(&url("greet"), script), [true]);
    fetcher
        .download(&artifact, FetchOptions::default())
        .await
        .unwrap();

    let output = artifact.run(["sandbox"], TaskInput::Null).await.unwrap();
    assert_eq!(output.stdout, b"hello sandbox\n");
}
