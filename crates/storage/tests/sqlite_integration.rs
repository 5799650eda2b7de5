use std::sync::Arc;

use chrono::Duration;
use storage::ForestRepository;
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;
use study_core::Forest;
use study_core::model::UserId;
use study_core::time::fixed_now;

#[tokio::test]
async fn sqlite_kv_roundtrip_and_overwrite() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("courses_u1").await.unwrap(), None);

    repo.set("courses_u1", "[]").await.unwrap();
    repo.set("courses_u1", "[1]").await.unwrap();
    assert_eq!(repo.get("courses_u1").await.unwrap().as_deref(), Some("[1]"));

    repo.remove("courses_u1").await.unwrap();
    assert_eq!(repo.get("courses_u1").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate_twice?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    repo.set("k", "v").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn sqlite_persists_course_forest_per_user() {
    let storage = Storage::sqlite("sqlite:file:memdb_forest?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let forests = ForestRepository::new(Arc::clone(&storage.kv));
    let user = UserId::new("1714060800000");

    let mut forest = Forest::new();
    let now = fixed_now();
    let course = forest
        .create_course("Algebra", "", now + Duration::days(10), now)
        .unwrap();
    let subject = forest.create_subject(&course, "Functions").unwrap();
    let chapter = forest.create_chapter(&course, &subject, "Linear").unwrap();
    let slope = forest
        .create_topic(&course, &subject, &chapter, "Slope")
        .unwrap();
    forest
        .create_topic(&course, &subject, &chapter, "Intercept")
        .unwrap();
    forest
        .set_topic_completed(&course, &subject, &chapter, &slope, true)
        .unwrap();

    forests.save(&user, &forest).await.expect("save");

    let loaded = forests.load(&user).await.expect("load").expect("present");
    assert_eq!(loaded, forest);
    assert_eq!(loaded.course(&course).unwrap().progress().value(), 50);

    let raw = storage
        .kv
        .get("courses_1714060800000")
        .await
        .unwrap()
        .unwrap();
    assert!(raw.contains("\"createdAt\""));

    let other = UserId::new("someone-else");
    assert!(forests.load_or_init(&other).await.unwrap().is_empty());
    assert_eq!(
        storage.kv.get("courses_someone-else").await.unwrap().as_deref(),
        Some("[]")
    );
}
