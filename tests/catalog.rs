use eyre::Result;
use std::fs;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tempfile::tempdir;
use voice_archive::{
    AudioService, Dialect, LocalDirSource, ScriptOptions, generate_script,
    migration::MigrationRecord,
};

async fn catalog() -> Result<Surreal<Db>> {
    let db = Surreal::new::<Mem>(()).await?;
    db.use_ns("archive").use_db("archive").await?;
    Ok(db)
}

#[tokio::test]
async fn migrations_apply_once() -> Result<()> {
    let db = catalog().await?;
    let service = AudioService::new(&db);

    assert_eq!(service.migrate().await?, vec!["000_create_audio_streams".to_string()]);
    assert!(service.migrate().await?.is_empty());

    let records: Vec<MigrationRecord> = db.select("migrations").await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "000_create_audio_streams");

    assert!(service.past_audios().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn generated_script_loads_into_catalog() -> Result<()> {
    let db = catalog().await?;
    let service = AudioService::new(&db);
    service.migrate().await?;

    let tmpdir = tempdir()?;
    fs::write(tmpdir.path().join("Topic - Sheikh Ahmad.mp3"), "")?;
    fs::write(tmpdir.path().join("Jumu'ah Talk - Abdullahi.mp3"), "")?;

    let script = generate_script(
        &LocalDirSource::new(tmpdir.path()),
        &ScriptOptions::default(),
        Dialect::Surreal,
    )?;
    service.import_script(&script.sql).await?;

    let mut audios = service.past_audios().await?;
    audios.sort_by(|a, b| a.title.cmp(&b.title));
    assert_eq!(audios.len(), 2);

    assert_eq!(audios[0].title, "Jumu'ah Talk");
    assert_eq!(audios[0].speaker, "Abdullahi");
    assert_eq!(audios[1].title, "Topic");
    assert_eq!(audios[1].speaker, "Sheikh Ahmad");
    for audio in &audios {
        assert_eq!(audio.description, "Lagos State");
        assert_eq!(audio.running_time, "00:00:00");
        assert!(!audio.is_live);
        assert!(audio.scheduled_at.is_none());
        assert!(audio.blob_url.starts_with("file://"));
    }
    Ok(())
}

#[tokio::test]
async fn oversized_rows_are_rejected_by_the_schema() -> Result<()> {
    let db = catalog().await?;
    let service = AudioService::new(&db);
    service.migrate().await?;

    let title = "x".repeat(201);
    let result = service
        .import_script(&format!(
            "INSERT INTO audio_streams [{{ title: '{title}', blob_url: 'u', speaker: 's' }}];"
        ))
        .await;
    assert!(result.is_err());
    assert!(service.past_audios().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn reset_reverts_migrations() -> Result<()> {
    let db = catalog().await?;
    let service = AudioService::new(&db);
    service.migrate().await?;

    assert_eq!(service.reset().await?, vec!["000_create_audio_streams".to_string()]);
    let records: Vec<MigrationRecord> = db.select("migrations").await?;
    assert!(records.is_empty());

    assert_eq!(service.migrate().await?.len(), 1);
    Ok(())
}
