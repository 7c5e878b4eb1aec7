// adapter behavior against the database port

use app_core::{
    Card, Competitor, ConfigValue, DbError, DbpCard, DbpCompetitor, DbpConfig, DbpRun, DbpStage,
    PunchReadout, Run, RunSplit, Stage,
};
use chrono::Utc;
use db_json::JsonDb;
use std::path::PathBuf;

fn snapshot_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "o-race-center-{tag}-{}.json",
        std::process::id()
    ))
}

fn competitor(sid: i64) -> Competitor {
    let mut c = Competitor {
        sid,
        fee_due: 100,
        ..Competitor::default()
    };
    c.set_group("M21").set_names("Viktor", "Lysenko");
    c.declared_days = vec![1];
    c
}

fn readout_card(card_number: i64) -> Card {
    let readout = PunchReadout {
        station_number: 1,
        card_number,
        start_time: 60000,
        finish_time: 61000,
        check_time: Some(60000),
        punches: vec![],
    };
    let raw = serde_json::to_value(&readout).unwrap();
    Card::from_readout(&readout, raw, Utc::now())
}

#[tokio::test]
async fn ids_are_assigned_and_rows_found_again() {
    let db = JsonDb::in_memory();

    let stage = db.save_stage(&Stage::new(1, Some("Sprint"))).await.unwrap();
    assert!(stage.id > 0);
    assert_eq!(
        db.get_stage_by_day(1).await.unwrap().unwrap().id,
        stage.id
    );

    let saved = db.save_competitor(&competitor(16)).await.unwrap();
    let run = db.save_run(&Run::declared(saved.id, 1)).await.unwrap();
    assert_eq!(
        db.get_run(1, saved.id).await.unwrap().unwrap().id,
        run.id
    );
}

#[tokio::test]
async fn duplicate_sid_and_day_are_unique_violations() {
    let db = JsonDb::in_memory();
    db.save_competitor(&competitor(16)).await.unwrap();
    let err = db.save_competitor(&competitor(16)).await.unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation(_)));

    db.save_stage(&Stage::new(1, None::<String>)).await.unwrap();
    let err = db.save_stage(&Stage::new(1, None::<String>)).await.unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation(_)));
}

#[tokio::test]
async fn run_requires_its_competitor() {
    let db = JsonDb::in_memory();
    let err = db.save_run(&Run::declared(77, 1)).await.unwrap_err();
    assert!(matches!(err, DbError::ForeignKeyViolation(_)));
}

#[tokio::test]
async fn readout_commit_replaces_splits_atomically() {
    let db = JsonDb::in_memory();
    let competitor = db.save_competitor(&competitor(16)).await.unwrap();
    let mut run = db.save_run(&Run::declared(competitor.id, 1)).await.unwrap();
    let card = db.save_card(&readout_card(16)).await.unwrap();

    let split = |seq: u32, leg: i64| RunSplit {
        run_id: run.id,
        course_id: 1,
        seq,
        control_code: "31".into(),
        leg_time: Some(leg),
        cum_time: Some(leg),
    };

    run.result = Some(1000);
    db.commit_readout_outcome(&card, &run, &[split(0, 100), split(1, 200)])
        .await
        .unwrap();
    db.commit_readout_outcome(&card, &run, &[split(0, 150)])
        .await
        .unwrap();

    let splits = db.list_run_splits(run.id).await.unwrap();
    assert_eq!(splits.len(), 1);
    assert_eq!(splits[0].leg_time, Some(150));

    // unknown run: nothing must change
    let mut ghost = run.clone();
    ghost.id = 999;
    let err = db
        .commit_readout_outcome(&card, &ghost, &[split(0, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    assert_eq!(db.list_run_splits(run.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn commit_rejects_a_second_payload_for_the_same_run() {
    let db = JsonDb::in_memory();
    let competitor = db.save_competitor(&competitor(16)).await.unwrap();
    let mut run = db.save_run(&Run::declared(competitor.id, 1)).await.unwrap();
    run.result = Some(900);

    let mut first = db.save_card(&readout_card(16)).await.unwrap();
    first.run_id = Some(run.id);
    db.commit_readout_outcome(&first, &run, &[]).await.unwrap();

    let mut second = readout_card(16);
    second.raw["finishTime"] = serde_json::json!(61222);
    let mut second = db.save_card(&second).await.unwrap();
    second.run_id = Some(run.id);
    let err = db
        .commit_readout_outcome(&second, &run, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UniqueViolation(_)));
}

#[tokio::test]
async fn snapshot_survives_reopening() {
    let path = snapshot_path("reopen");
    let _ = std::fs::remove_file(&path);

    {
        let db = JsonDb::open(&path).unwrap();
        db.set_config("name", ConfigValue::Str("O-Halloween".into()))
            .await
            .unwrap();
        db.save_stage(&Stage::new(1, Some("Sprint"))).await.unwrap();
        db.save_competitor(&competitor(16)).await.unwrap();
    }

    let db = JsonDb::open(&path).unwrap();
    assert_eq!(
        db.get_config("name").await.unwrap(),
        Some(ConfigValue::Str("O-Halloween".into()))
    );
    assert_eq!(db.list_stages().await.unwrap().len(), 1);
    // the id sequence continues after reopening
    let saved = db.save_competitor(&competitor(17)).await.unwrap();
    let previous = db.get_competitor_by_sid(16).await.unwrap().unwrap();
    assert!(saved.id > previous.id);

    let _ = std::fs::remove_file(&path);
}
