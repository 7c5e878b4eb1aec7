//! Shared fixtures for the end-to-end tests: a one-day event with a single
//! course and three competitors, fed through the real adapters.

use app_core::{Core, CoreBuilder, EventSetup, PunchReadout, PunchRecord};
use chrono::NaiveDate;
use db_json::JsonDb;
use std::sync::Arc;

/// IOF 3.0 course data of the test stage: S1-31-45-72-100-F1 for group M21.
pub const STAGE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<CourseData xmlns="http://www.orienteering.org/datastandard/3.0" iofVersion="3.0">
  <Event>
    <Name>O-Night</Name>
  </Event>
  <RaceCourseData>
    <Map>
      <Scale>4000</Scale>
      <MapPositionTopLeft x="0" y="297"/>
      <MapPositionBottomRight x="210" y="0"/>
    </Map>
    <Control type="Start">
      <Id>S1</Id>
      <Position lng="30.52" lat="50.45"/>
      <MapPosition x="15.0" y="250.0"/>
    </Control>
    <Control>
      <Id>31</Id>
      <Position lng="30.53" lat="50.46"/>
      <MapPosition x="40.0" y="230.0"/>
    </Control>
    <Control>
      <Id>45</Id>
    </Control>
    <Control>
      <Id>72</Id>
    </Control>
    <Control>
      <Id>100</Id>
    </Control>
    <Control type="Finish">
      <Id>F1</Id>
    </Control>
    <Course>
      <Name>M21 </Name>
      <Length>2500</Length>
      <Climb>40</Climb>
      <CourseControl type="Start">
        <Control>S1</Control>
      </CourseControl>
      <CourseControl>
        <Control>31</Control>
        <LegLength>400</LegLength>
      </CourseControl>
      <CourseControl>
        <Control>45</Control>
        <LegLength>600</LegLength>
      </CourseControl>
      <CourseControl>
        <Control>72</Control>
        <LegLength>700</LegLength>
      </CourseControl>
      <CourseControl>
        <Control>100</Control>
        <LegLength>500</LegLength>
      </CourseControl>
      <CourseControl type="Finish">
        <Control>F1</Control>
        <LegLength>300</LegLength>
      </CourseControl>
    </Course>
  </RaceCourseData>
</CourseData>
"#;

pub const COMPETITORS_CSV: &str = "\
Reg,Group,SID,First name,Last name,Notes,Days,Money
,M21,16,Viktor,Lysenko,,1,300
CPK,M21,32,Artur,Korol,,1,300
ZLS,M21,149,Yurii,Polishchuk,late entry,1,300
";

pub const CLUBS_CSV: &str = "\
Reg,Club
CPK,Sprint Club
ZLS,Zelesta
";

/// Fresh volatile event: config, stage, competitors, clubs.
pub async fn bootstrap_event() -> Core {
    let core = CoreBuilder::new()
        .set_db(Arc::new(JsonDb::in_memory()))
        .build();
    core.create_event(&EventSetup {
        name: "O-Night".into(),
        start_date: NaiveDate::from_ymd_opt(2025, 11, 15).unwrap(),
        judge: "John Doe".into(),
        secretary: "Jane Smith".into(),
        place: "Kyiv".into(),
    })
    .await
    .unwrap();

    iof_exchange::import_stage(&core, STAGE_XML, 1, Some("Sprint"))
        .await
        .unwrap();
    iof_exchange::import_competitors(&core, COMPETITORS_CSV.as_bytes())
        .await
        .unwrap();
    iof_exchange::import_clubs(&core, CLUBS_CSV.as_bytes())
        .await
        .unwrap();
    core
}

fn punches(card_number: i64, start: i64, codes_and_offsets: &[(i32, i64)]) -> Vec<PunchRecord> {
    codes_and_offsets
        .iter()
        .map(|(code, offset)| PunchRecord {
            card_number,
            code: *code,
            time: start + offset,
        })
        .collect()
}

/// Clean OK run of card 16: result 1955 s.
pub fn readout_16() -> PunchReadout {
    let start = 60386;
    PunchReadout {
        station_number: 1,
        card_number: 16,
        start_time: start,
        finish_time: 62341,
        check_time: Some(start),
        punches: punches(16, start, &[(31, 400), (45, 900), (72, 1500), (100, 1700)]),
    }
}

/// Faster OK run of card 32: result 1906 s, one leg slower than the field.
pub fn readout_32() -> PunchReadout {
    let start = 60025;
    PunchReadout {
        station_number: 1,
        card_number: 32,
        start_time: start,
        finish_time: 61931,
        check_time: Some(start),
        punches: punches(32, start, &[(31, 380), (45, 880), (72, 1460), (100, 1680)]),
    }
}

/// Card 149 misses control 45 and punches a stray 50: MP, result 2099 s.
pub fn readout_149() -> PunchReadout {
    let start = 59737;
    PunchReadout {
        station_number: 1,
        card_number: 149,
        start_time: start,
        finish_time: 61836,
        check_time: Some(start),
        punches: punches(149, start, &[(31, 410), (50, 900), (72, 1600), (100, 1800)]),
    }
}
