use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_VARS: &[&str] = &[
    "AZURE_STORAGE_CONNECTION_STRING",
    "AZURE_STORAGE_CONTAINER",
    "ARCHIVE_DESCRIPTION",
    "ARCHIVE_SPEAKER",
    "ARCHIVE_DURATION",
    "ARCHIVE_PREFIX",
];

fn archive_sql() -> Command {
    let mut cmd = Command::cargo_bin("archive-sql").unwrap();
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn generate_from_directory_writes_sqlserver_script() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("archive");
    fs::create_dir_all(archive.join("2021")).unwrap();
    fs::write(archive.join("Topic - Sheikh Ahmad.mp3"), b"").unwrap();
    fs::write(archive.join("2021").join("Jumu'ah Talk - Abdullahi.mp3"), b"").unwrap();
    let output = dir.path().join("out.sql");

    archive_sql()
        .args(["generate", "--dir"])
        .arg(&archive)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rows (0 without an inferred speaker)"));

    let sql = fs::read_to_string(&output).unwrap();
    assert!(sql.starts_with("INSERT INTO [dbo].[AudioStreams] ([Id], [Title]"));
    assert!(sql.contains("'Jumu''ah Talk', 'Lagos State', 'file://"));
    assert!(sql.contains("'Topic', 'Lagos State'"));
    assert!(sql.contains("'Sheikh Ahmad', 0, '00:00:00')"));
    assert!(sql.ends_with("\n;"));
}

#[test]
fn generate_respects_prefix_and_environment() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("archive");
    fs::create_dir_all(archive.join("2020")).unwrap();
    fs::create_dir_all(archive.join("2021")).unwrap();
    fs::write(archive.join("2020").join("Friday sermon notes.mp3"), b"").unwrap();
    fs::write(archive.join("2021").join("Dr. Yusuf.mp3"), b"").unwrap();

    archive_sql()
        .current_dir(dir.path())
        .env("ARCHIVE_SPEAKER", "Various")
        .env("ARCHIVE_DESCRIPTION", "Ikeja")
        .env("ARCHIVE_DURATION", "01:00:00")
        .args(["generate", "", "", "2020/", "--dialect", "surreal", "--dir"])
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 rows (1 without an inferred speaker)"));

    let sql = fs::read_to_string(dir.path().join("AudioStreams_Insert.sql")).unwrap();
    assert!(sql.starts_with("INSERT INTO audio_streams ["));
    assert!(sql.contains("title: 'Friday sermon notes', description: 'Ikeja'"));
    assert!(sql.contains("speaker: 'Various', is_live: false, running_time: '01:00:00'"));
    assert!(!sql.contains("Yusuf"));
}

#[test]
fn generate_with_schema_prepends_table_definition() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.sql");
    archive_sql()
        .args(["generate", "--with-schema", "--dir"])
        .arg(dir.path())
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let sql = fs::read_to_string(&output).unwrap();
    assert!(sql.starts_with("IF OBJECT_ID(N'[dbo].[AudioStreams]', N'U') IS NULL"));
}

#[test]
fn empty_directory_writes_comment() {
    let dir = tempdir().unwrap();
    let archive = dir.path().join("empty");
    fs::create_dir_all(&archive).unwrap();
    let output = dir.path().join("out.sql");

    archive_sql()
        .args(["generate", "--dir"])
        .arg(&archive)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "-- No blobs found for the provided container/prefix."
    );
}

#[test]
fn missing_connection_string_exits_with_1() {
    let dir = tempdir().unwrap();
    archive_sql()
        .current_dir(dir.path())
        .arg("generate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Set AZURE_STORAGE_CONNECTION_STRING or pass it as the first argument.",
        ));
    assert!(!dir.path().join("AudioStreams_Insert.sql").exists());
}

#[test]
fn malformed_connection_string_exits_with_1() {
    let dir = tempdir().unwrap();
    archive_sql()
        .current_dir(dir.path())
        .args(["generate", "not-a-connection-string"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid connection string"));
}

#[test]
fn bad_duration_exits_with_1() {
    let dir = tempdir().unwrap();
    archive_sql()
        .env("ARCHIVE_DURATION", "ninety minutes")
        .args(["generate", "--dir"])
        .arg(dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("HH:MM:SS"));
}

fn listing(names: &[&str], next_marker: &str) -> String {
    let blobs = names
        .iter()
        .map(|n| format!("<Blob><Name>{n}</Name><Properties /></Blob>"))
        .collect::<String>();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <EnumerationResults><Blobs>{blobs}</Blobs><NextMarker>{next_marker}</NextMarker></EnumerationResults>"
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_from_azure_pages_through_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archives"))
        .and(query_param("comp", "list"))
        .and(query_param_is_missing("marker"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(
            &["Topic - Sheikh Ahmad.mp3", "Friday sermon notes.mp3"],
            "next-1",
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/archives"))
        .and(query_param("marker", "next-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing(&["2021/Dr. Yusuf.mp3"], "")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let output = dir.path().join("out.sql");
    let connection = format!("BlobEndpoint={}", server.uri());
    let run_output = output.clone();
    tokio::task::spawn_blocking(move || {
        archive_sql()
            .args(["generate", connection.as_str(), "archives", "--output"])
            .arg(&run_output)
            .assert()
            .success()
            .stdout(predicate::str::contains("3 rows (1 without an inferred speaker)"));
    })
    .await
    .unwrap();

    let sql = fs::read_to_string(&output).unwrap();
    assert_eq!(sql.lines().count(), 5);
    assert!(sql.contains(&format!(
        "'{}/archives/Topic%20-%20Sheikh%20Ahmad.mp3', GETUTCDATE(), 'Sheikh Ahmad'",
        server.uri()
    )));
    assert!(sql.contains(&format!(
        "'{}/archives/2021/Dr.%20Yusuf.mp3', GETUTCDATE(), 'Dr. Yusuf'",
        server.uri()
    )));
}

#[tokio::test(flavor = "multi_thread")]
async fn storage_error_exits_with_2() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>ContainerNotFound</Code>\
             <Message>The specified container does not exist.</Message></Error>",
        ))
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let connection = format!("BlobEndpoint={}", server.uri());
    let cwd = dir.path().to_path_buf();
    tokio::task::spawn_blocking(move || {
        archive_sql()
            .current_dir(&cwd)
            .args(["generate", connection.as_str(), "missing"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Azure request failed"))
            .stderr(predicate::str::contains("ContainerNotFound"));
    })
    .await
    .unwrap();
    assert!(!dir.path().join("AudioStreams_Insert.sql").exists());
}

#[test]
fn missing_directory_exits_with_99() {
    let dir = tempdir().unwrap();
    archive_sql()
        .args(["generate", "--dir"])
        .arg(dir.path().join("nope"))
        .assert()
        .code(99)
        .stderr(predicate::str::contains("Unexpected error"));
}

#[test]
fn parse_prints_speaker_and_title() {
    archive_sql()
        .args([
            "parse",
            "Tawheed - Sheikh Bello - Episode 5.mp3",
            "Friday sermon notes.mp3",
        ])
        .assert()
        .success()
        .stdout("Sheikh Bello\tTawheed Episode 5\nUnknown Speaker\tFriday sermon notes\n");
}

#[test]
fn parse_json_uses_given_speaker() {
    archive_sql()
        .args(["parse", "--json", "--speaker", "Imam Sani", "Ramadan Series Episode 12.mp3"])
        .assert()
        .success()
        .stdout("{\"speaker\":\"Imam Sani\",\"title\":\"Ramadan Series Episode 12\"}\n");
}
