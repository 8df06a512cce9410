use storage::Settings;

#[tokio::test]
async fn empty_database_loads_defaults() {
    let pool = storage::open("sqlite://file:settings_defaults?mode=memory&cache=shared")
        .await
        .unwrap();
    let settings = Settings::load(&pool).await.unwrap();
    assert_eq!(settings, Settings::default());
}

#[tokio::test]
async fn settings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("lexdocs.db");
    let db = db_path.to_string_lossy().to_string();

    {
        let pool = storage::open(&db).await.unwrap();
        let mut settings = Settings::load(&pool).await.unwrap();
        settings.archive_session("session-1");
        settings.archive_session("session-2");
        settings.unarchive_session("session-2");
        settings.set_preference("show_sizes", true);
        settings.save(&pool).await.unwrap();
        pool.close().await;
    }

    let pool = storage::open(&db).await.unwrap();
    let settings = Settings::load(&pool).await.unwrap();
    assert!(settings.is_archived("session-1"));
    assert!(!settings.is_archived("session-2"));
    assert_eq!(settings.preference("show_sizes"), Some(true));
    assert_eq!(settings.preference("missing"), None);
}

#[tokio::test]
async fn save_overwrites_previous_values() {
    let pool = storage::open("sqlite://file:settings_overwrite?mode=memory&cache=shared")
        .await
        .unwrap();
    let mut settings = Settings::default();
    settings.set_preference("compact", true);
    settings.save(&pool).await.unwrap();
    settings.set_preference("compact", false);
    settings.save(&pool).await.unwrap();

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 2);
    let loaded = Settings::load(&pool).await.unwrap();
    assert_eq!(loaded.preference("compact"), Some(false));
}

#[tokio::test]
async fn corrupt_value_is_reported() {
    let pool = storage::open("sqlite://file:settings_corrupt?mode=memory&cache=shared")
        .await
        .unwrap();
    sqlx::query("INSERT INTO settings(key, value) VALUES ('preferences', 'not json')")
        .execute(&pool)
        .await
        .unwrap();
    let err = Settings::load(&pool).await.unwrap_err();
    assert!(matches!(err, storage::StorageError::Corrupt { ref key, .. } if key == "preferences"));
}
