// end-to-end scenarios through the real store adapter

use app_core::{
    CaptureSink, DbpCard, DbpCompetitor, DbpRun, ReadoutStatus, RunStatus, SchedulerOptions,
};
use integration_testing::{bootstrap_event, readout_16, readout_32, readout_149};

#[tokio::test]
async fn csv_import_registers_competitors_and_dns_runs() {
    let core = bootstrap_event().await;

    let competitors = core.database.list_competitors().await.unwrap();
    assert_eq!(competitors.len(), 3);
    let viktor = core.database.get_competitor_by_sid(16).await.unwrap().unwrap();
    assert_eq!(viktor.full_name(), "Lysenko Viktor");
    assert_eq!(viktor.group, "M21");
    assert_eq!(viktor.declared_days, vec![1]);
    assert_eq!(viktor.fee_due, 300);

    let runs = core.database.list_runs_by_day(1).await.unwrap();
    assert_eq!(runs.len(), 3);
    assert!(runs.iter().all(|r| r.status == RunStatus::Dns));

    let club = core.database.get_club("ZLS").await.unwrap().unwrap();
    assert_eq!(club.name, "Zelesta");
}

#[tokio::test]
async fn clean_readout_prints_the_full_receipt() {
    let core = bootstrap_event().await;
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&readout_16(), &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Ok);
    assert_eq!(outcome.sid, Some(16));

    let run = core
        .database
        .get_run(1, core.database.get_competitor_by_sid(16).await.unwrap().unwrap().id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(run.status, RunStatus::Ok);
    assert_eq!(run.result, Some(1955));

    let expected = vec![
        "================================================",
        "E1 - O-Night",
        "2025-11-15 Kyiv",
        "------------------------------------------------",
        "Lysenko Viktor                                  ",
        "M21                                   2.50km 40m",
        "Check: 16:46:26                 Finish: 17:19:01",
        "Start: 16:46:26                            SI:16",
        "================================================",
        " 1.  31      6:40      6:40               ~16:40",
        " 2.  45     15:00      8:20               ~13:53",
        " 3.  72     25:00     10:00               ~14:17",
        " 4. 100     28:20      3:20                ~6:40",
        "     OK     32:35      4:15                     ",
        "================================================",
        "total loss:                      +0:00    min/km",
        "standing: 1/1                              13:02",
        "",
    ];
    assert_eq!(sink.lines(), expected);
}

#[tokio::test]
async fn field_best_losses_show_up_on_later_receipts() {
    let core = bootstrap_event().await;
    let mut sink = CaptureSink::new();
    core.process_readout(&readout_16(), &mut sink).await.unwrap();

    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&readout_32(), &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Ok);

    let expected = vec![
        "================================================",
        "E1 - O-Night",
        "2025-11-15 Kyiv",
        "------------------------------------------------",
        "Korol Artur                                  CPK",
        "M21                                   2.50km 40m",
        "Check: 16:40:25                 Finish: 17:12:11",
        "Start: 16:40:25                            SI:32",
        "================================================",
        " 1.  31      6:20      6:20               ~15:50",
        " 2.  45     14:40      8:20               ~13:53",
        " 3.  72     24:20      9:40               ~13:48",
        " 4. 100     28:00      3:40     +0:20      ~7:20",
        "     OK     31:46      3:46                     ",
        "================================================",
        "total loss:                      +0:20    min/km",
        "standing: 1/2                              12:42",
        "",
    ];
    assert_eq!(sink.lines(), expected);
}

#[tokio::test]
async fn missing_punch_yields_dsq_receipt_with_extras() {
    let core = bootstrap_event().await;
    let mut sink = CaptureSink::new();
    core.process_readout(&readout_16(), &mut sink).await.unwrap();
    let mut sink = CaptureSink::new();
    core.process_readout(&readout_32(), &mut sink).await.unwrap();

    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&readout_149(), &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Mp);

    let expected = vec![
        "================================================",
        "E1 - O-Night",
        "2025-11-15 Kyiv",
        "------------------------------------------------",
        "Polishchuk Yurii                             ZLS",
        "M21                                   2.50km 40m",
        "Check: 16:35:37                 Finish: 17:10:36",
        "Start: 16:35:37                           SI:149",
        "================================================",
        " 1.  31      6:50      6:50     +0:30     ~17:05",
        " 2.  45     -----     -----                     ",
        " 3.  72     26:40     -----                     ",
        " 4. 100     30:00      3:20                ~6:40",
        "    DSQ     34:59      4:59     +1:13           ",
        "================================================",
        "extra: 50/15:00",
        "missed: 45",
        "total loss:                      +1:43    min/km",
        "                                           13:59",
        "",
    ];
    assert_eq!(sink.lines(), expected);

    let competitor = core.database.get_competitor_by_sid(149).await.unwrap().unwrap();
    let run = core.database.get_run(1, competitor.id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Mp);
    let splits = core.database.list_run_splits(run.id).await.unwrap();
    assert_eq!(splits.len(), 5);
    assert_eq!(splits[1].cum_time, None);
    assert_eq!(splits[4].control_code, "F");
}

#[tokio::test]
async fn identical_payload_reprocesses_and_differing_payload_is_dup() {
    let core = bootstrap_event().await;
    let mut sink = CaptureSink::new();
    core.process_readout(&readout_16(), &mut sink).await.unwrap();

    let competitor = core.database.get_competitor_by_sid(16).await.unwrap().unwrap();
    let run_before = core.database.get_run(1, competitor.id).await.unwrap().unwrap();
    let splits_before = core.database.list_run_splits(run_before.id).await.unwrap();

    // identical payload: idempotent re-processing
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&readout_16(), &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Ok);
    let run_after = core.database.get_run(1, competitor.id).await.unwrap().unwrap();
    let splits_after = core.database.list_run_splits(run_after.id).await.unwrap();
    assert_eq!(
        (run_before.start, run_before.finish, run_before.result, run_before.status),
        (run_after.start, run_after.finish, run_after.result, run_after.status)
    );
    assert_eq!(splits_before, splits_after);

    // differing payload: rejected, stored state untouched
    let mut altered = readout_16();
    altered.punches[0].time += 5;
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&altered, &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Dup);
    let run_kept = core.database.get_run(1, competitor.id).await.unwrap().unwrap();
    assert_eq!(run_kept.result, run_before.result);
    assert_eq!(sink.lines(), vec![""; 1]);
}

#[tokio::test]
async fn unknown_card_and_sentinels_come_back_as_statuses() {
    let core = bootstrap_event().await;

    let mut unknown = readout_16();
    unknown.card_number = 9999;
    for punch in &mut unknown.punches {
        punch.card_number = 9999;
    }
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&unknown, &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Unk);
    assert_eq!(outcome.sid, None);

    let mut no_start = readout_16();
    no_start.start_time = 0xEEEE;
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&no_start, &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::NoStart);

    let mut no_finish = readout_16();
    no_finish.finish_time = 0xEEEE;
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&no_finish, &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::NoFinish);
}

#[tokio::test]
async fn ignored_controls_drop_out_of_the_required_list() {
    let core = bootstrap_event().await;
    // control 45 is out of order for the whole field
    core.set_ignore_controls(&[45]).await.unwrap();

    // card 149 never punched 45, which no longer counts
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&readout_149(), &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Ok);

    let competitor = core.database.get_competitor_by_sid(149).await.unwrap().unwrap();
    let run = core.database.get_run(1, competitor.id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Ok);
    // three required controls plus the finish split
    let splits = core.database.list_run_splits(run.id).await.unwrap();
    assert_eq!(splits.len(), 4);
    assert!(splits.iter().all(|s| s.control_code != "45"));
}

#[tokio::test]
async fn corrupted_timestamps_are_retimed_before_analysis() {
    let core = bootstrap_event().await;

    let mut readout = readout_16();
    // the punch at control 45 reports a backwards timestamp
    readout.punches[1].time = readout.start_time - 36;
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&readout, &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Ok);

    let competitor = core.database.get_competitor_by_sid(16).await.unwrap().unwrap();
    let run = core.database.get_run(1, competitor.id).await.unwrap().unwrap();
    let splits = core.database.list_run_splits(run.id).await.unwrap();
    // interpolated halfway between its neighbours
    assert_eq!(splits[1].cum_time, Some(950));
    let times: Vec<i64> = splits.iter().filter_map(|s| s.cum_time).collect();
    for pair in times.windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[tokio::test]
async fn group_without_a_course_is_unk_course() {
    let core = bootstrap_event().await;

    let mut stray = app_core::Competitor {
        sid: 500,
        ..app_core::Competitor::default()
    };
    stray.set_group("X99").set_names("Taras", "Hnatyuk");
    stray.declared_days = vec![1];
    let stray = core.database.save_competitor(&stray).await.unwrap();
    core.database
        .save_run(&app_core::Run::declared(stray.id, 1))
        .await
        .unwrap();

    let mut readout = readout_16();
    readout.card_number = 500;
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&readout, &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::UnkCourse);

    let run = core.database.get_run(1, stray.id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Dns);
    assert_eq!(run.result, None);
}

#[tokio::test]
async fn a_mistyped_card_is_fixed_by_manual_assignment() {
    let core = bootstrap_event().await;

    // the card arrives under a number nobody carries
    let mut readout = readout_16();
    readout.card_number = 9999;
    let mut sink = CaptureSink::new();
    let outcome = core.process_readout(&readout, &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Unk);

    let cards = core.database.list_cards().await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].run_id, None);

    // the operator binds it to the right run
    let competitor = core.database.get_competitor_by_sid(16).await.unwrap().unwrap();
    let run = core.database.get_run(1, competitor.id).await.unwrap().unwrap();
    let mut sink = CaptureSink::new();
    let outcome = core.assign_card(cards[0].id, run.id, &mut sink).await.unwrap();
    assert_eq!(outcome.status, ReadoutStatus::Ok);

    let run = core.database.get_run(1, competitor.id).await.unwrap().unwrap();
    assert_eq!(run.result, Some(1955));
    assert_eq!(run.status, RunStatus::Ok);
    let card = core.database.get_card(cards[0].id).await.unwrap().unwrap();
    assert_eq!(card.run_id, Some(run.id));
    assert!(!sink.lines().is_empty());
}

#[tokio::test]
async fn kiosk_results_cover_all_non_dns_runs_of_the_day() {
    let core = bootstrap_event().await;
    let mut sink = CaptureSink::new();
    core.process_readout(&readout_16(), &mut sink).await.unwrap();
    core.process_readout(&readout_32(), &mut sink).await.unwrap();
    core.process_readout(&readout_149(), &mut sink).await.unwrap();

    let results = core.results_for_day(1).await.unwrap();
    assert_eq!(results.len(), 1);
    let rows = &results["M21"];
    assert_eq!(rows.len(), 3);

    assert_eq!(rows[0].name, "Korol Artur");
    assert_eq!(rows[0].position, Some(1));
    assert_eq!(rows[0].behind, Some(0));
    assert_eq!(rows[0].club, "Sprint Club");

    assert_eq!(rows[1].name, "Lysenko Viktor");
    assert_eq!(rows[1].position, Some(2));
    assert_eq!(rows[1].behind, Some(49));
    assert_eq!(rows[1].club, "");

    assert_eq!(rows[2].name, "Polishchuk Yurii");
    assert_eq!(rows[2].position, None);
    assert_eq!(rows[2].status, RunStatus::Mp);
    assert_eq!(rows[2].club, "Zelesta");
}

#[tokio::test]
async fn multiday_summary_scores_the_field() {
    let core = bootstrap_event().await;
    let mut sink = CaptureSink::new();
    core.process_readout(&readout_16(), &mut sink).await.unwrap();
    core.process_readout(&readout_32(), &mut sink).await.unwrap();
    core.process_readout(&readout_149(), &mut sink).await.unwrap();

    let summary = core.summary(1).await.unwrap();
    assert_eq!(summary.len(), 1);
    let (group, results) = &summary[0];
    assert_eq!(group, "M21");

    assert_eq!(results[0].competitor.sid, 32);
    assert_eq!(results[0].place, Some(1));
    assert_eq!(results[0].total_score, 200);

    assert_eq!(results[1].competitor.sid, 16);
    assert_eq!(results[1].place, Some(2));
    // 49 s behind a 1906 s winner
    assert_eq!(results[1].total_score, 197);

    assert_eq!(results[2].competitor.sid, 149);
    assert_eq!(results[2].place, None);
    assert_eq!(results[2].best_count, 0);
}

#[tokio::test]
async fn start_slots_respect_groups_and_replay_under_the_seed() {
    let core = bootstrap_event().await;

    let opts = SchedulerOptions::new(2, 42);
    let summary = core.assign_start_slots(1, &opts).await.unwrap();
    assert_eq!(summary.assigned, 3);

    let runs = core.database.list_runs_by_day(1).await.unwrap();
    let slots: Vec<u32> = runs.iter().map(|r| r.start_slot.unwrap()).collect();
    // one group: nobody may share a minute
    let unique: std::collections::HashSet<u32> = slots.iter().copied().collect();
    assert_eq!(unique.len(), 3);

    // replaying the same seed reproduces the assignment
    core.assign_start_slots(1, &opts).await.unwrap();
    let replay: Vec<u32> = core
        .database
        .list_runs_by_day(1)
        .await
        .unwrap()
        .iter()
        .map(|r| r.start_slot.unwrap())
        .collect();
    assert_eq!(slots, replay);

    // both passes are in the seed log
    let seeds = core.start_seeds().await.unwrap();
    assert_eq!(seeds[&1], vec![42, 42]);
}
