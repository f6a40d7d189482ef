//! Seeded patient tables shared by the integration tests.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rapport_patient::schema::{PATIENT_ADDRESS, PATIENT_BASIC, PATIENT_DISEASE};
use rapport_patient::{ConnectionManager, DbConfig, MemoryBackend, MemoryStore, Value};

pub const USERNAME: &str = "rapport_ro";
pub const PASSWORD: &str = "secret";
pub const DSN: &str = "db.example.local:1521/RAPPORT";

pub fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, mi, s)
        .unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn patient(store: &mut MemoryStore, id: &str, kana: &str, kanji: &str, registered: NaiveDateTime) {
    store.insert(
        &PATIENT_BASIC,
        [
            ("F001", Value::from(id)),
            ("F003", Value::from(kana)),
            ("F005", Value::from(kanji)),
            ("F006", Value::from("1")),
            ("F007", Value::from(at(1980, 4, 1, 0, 0, 0))),
            ("F023", Value::from(registered)),
            ("UPDDT", Value::from(registered)),
        ],
    );
}

/// Four patients, one address and two diseases for `0000000001`.
///
/// Registration dates sit on and around the March 2024 boundaries.
pub fn seeded_store() -> MemoryStore {
    let mut store = MemoryStore::with_patient_tables();

    patient(&mut store, "0000000001", "ヤマダ タロウ", "山田 太郎", at(2024, 3, 15, 10, 30, 0));
    patient(&mut store, "0000000002", "ヤマダ ハナコ", "山田 花子", at(2024, 3, 31, 23, 59, 59));
    patient(&mut store, "0000000003", "スズキ イチロウ", "鈴木 一郎", at(2024, 4, 1, 0, 0, 0));
    patient(&mut store, "0000000004", "O'Brien", "O'Brien", at(2024, 3, 1, 0, 0, 0));

    store.insert(
        &PATIENT_ADDRESS,
        [
            ("F001", Value::from("0000000001")),
            ("F002", Value::from("1")),
            ("F003", Value::from("100-0001")),
            ("F004", Value::from("東京都千代田区千代田1-1")),
            ("F005", Value::from("03-0000-0000")),
        ],
    );

    store.insert(
        &PATIENT_DISEASE,
        [
            ("F001", Value::from("0000000001")),
            ("F002", Value::from("1")),
            ("F005", Value::from("本態性高血圧症")),
            ("F006", Value::from(at(2020, 1, 10, 0, 0, 0))),
        ],
    );
    store.insert(
        &PATIENT_DISEASE,
        [
            ("F001", Value::from("0000000001")),
            ("F002", Value::from("2")),
            ("F005", Value::from("2型糖尿病")),
            ("F006", Value::from(at(2023, 6, 1, 0, 0, 0))),
        ],
    );

    store
}

pub fn config() -> DbConfig {
    DbConfig::new(USERNAME, PASSWORD, DSN).unwrap()
}

/// Manager over the seeded store, plus a handle on the same backend.
pub fn manager() -> (ConnectionManager<MemoryBackend>, MemoryBackend) {
    let backend = MemoryBackend::new(seeded_store());
    (ConnectionManager::new(backend.clone(), config()), backend)
}
