//! Integration tests for connection lifecycle and connection error handling.

mod common;

use common::{config, manager, seeded_store, PASSWORD, USERNAME};
use rapport_patient::schema::PATIENT_ADDRESS;
use rapport_patient::{
    ConnectParams, ConnectionManager, DbConfig, Error, ErrorKind, MemoryBackend, PatientDataFetcher,
};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_connection_refused() {
    let (mut db, backend) = manager();
    backend.refuse_connections("ORA-12541: TNS:no listener");

    let err = assert_err!(db.acquire().await);
    assert!(matches!(err, Error::ConnectionFailed { .. }));
    assert!(err.to_string().contains("ORA-12541"));
    assert!(!db.is_open());
    assert_eq!(backend.probe().opens(), 0);
}

#[tokio::test]
async fn test_invalid_credentials() {
    let backend = MemoryBackend::new(seeded_store());
    backend.require_credentials(USERNAME, PASSWORD);

    let wrong = DbConfig::new(USERNAME, "not-the-password", common::DSN).unwrap();
    let mut db = ConnectionManager::new(backend.clone(), wrong);
    let err = assert_err!(db.acquire().await);
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("ORA-01017"));
    // The password never shows up in the error
    assert!(!err.to_string().contains("not-the-password"));

    let mut db = ConnectionManager::new(backend.clone(), config());
    assert_ok!(db.acquire().await);
    assert_ok!(db.release().await);
}

#[tokio::test]
async fn test_scope_does_not_run_when_acquire_fails() {
    let (mut db, backend) = manager();
    backend.refuse_connections("ORA-12514: TNS:listener does not currently know of service");
    let probe = backend.probe();

    let err = assert_err!(
        db.scope(|db| {
            Box::pin(async move {
                PatientDataFetcher::new(db)
                    .get_patient_basic_info("0000000001")
                    .await
            })
        })
        .await
    );
    assert!(err.is_connection());
    assert_eq!(probe.queries(), 0);
    assert_eq!(probe.closes(), 0);
}

#[tokio::test]
async fn test_scope_releases_on_success() {
    let (mut db, backend) = manager();
    let probe = backend.probe();

    let basic = assert_ok!(
        db.scope(|db| {
            Box::pin(async move {
                PatientDataFetcher::new(db)
                    .get_patient_basic_info("0000000002")
                    .await
            })
        })
        .await
    );
    assert_eq!(
        basic.unwrap().text("KANA_FULL_NAME"),
        Some("ヤマダ ハナコ")
    );
    assert_eq!(probe.opens(), 1);
    assert_eq!(probe.closes(), 1);
    assert!(!db.is_open());
}

#[tokio::test]
async fn test_scope_releases_on_validation_error() {
    let (mut db, backend) = manager();
    let probe = backend.probe();

    let err = assert_err!(
        db.scope(|db| {
            Box::pin(async move {
                PatientDataFetcher::new(db)
                    .get_patient_diseases("12345")
                    .await
            })
        })
        .await
    );
    assert!(err.is_validation());
    assert_eq!(probe.queries(), 0);
    assert_eq!(probe.closes(), 1);
}

#[tokio::test]
async fn test_scope_body_error_wins_over_release_error() {
    let (mut db, backend) = manager();
    backend.fail_queries_on(&PATIENT_ADDRESS, "ORA-00942: table or view does not exist");
    backend.fail_close("ORA-03113: end-of-file on communication channel");
    let probe = backend.probe();

    let err = assert_err!(
        db.scope(|db| {
            Box::pin(async move {
                PatientDataFetcher::new(db)
                    .get_patient_address("0000000001")
                    .await
            })
        })
        .await
    );
    assert!(matches!(err, Error::Query { ref table, .. } if table == "TTPT02"));
    assert_eq!(probe.closes(), 1);
    assert!(!db.is_open());
}

#[tokio::test]
async fn test_scope_returns_release_error_after_success() {
    let (mut db, backend) = manager();
    backend.fail_close("ORA-03135: connection lost contact");
    let probe = backend.probe();

    let err = assert_err!(
        db.scope(|db| {
            Box::pin(async move {
                PatientDataFetcher::new(db)
                    .get_patient_basic_info("0000000001")
                    .await
            })
        })
        .await
    );
    assert!(err.is_connection());
    assert!(err.to_string().contains("ORA-03135"));
    assert_eq!(probe.queries(), 1);
    assert_eq!(probe.closes(), 1);
    assert!(!db.is_open());
}

#[tokio::test]
async fn test_manager_reusable_after_scope() {
    let (mut db, backend) = manager();

    for _ in 0..2 {
        assert_ok!(
            db.scope(|db| {
                Box::pin(async move {
                    PatientDataFetcher::new(db)
                        .get_patient_address("0000000001")
                        .await
                })
            })
            .await
        );
    }
    assert_eq!(backend.probe().opens(), 2);
    assert_eq!(backend.probe().closes(), 2);
}

#[tokio::test]
async fn test_unknown_table_is_query_error() {
    let backend = MemoryBackend::new(rapport_patient::MemoryStore::new());
    let mut db = ConnectionManager::new(backend, config());
    assert_ok!(db.acquire().await);

    let err = assert_err!(
        PatientDataFetcher::new(&mut db)
            .get_patient_insurance("0000000001")
            .await
    );
    assert!(err.is_query());
    assert!(err.to_string().contains("TTPT11"));
    assert!(err.to_string().contains("ORA-00942"));
}

#[test]
fn test_connect_string_parsing() {
    let params = ConnectParams::parse("db.example.local/RAPPORT").unwrap();
    assert_eq!(params.port, 1521);
    assert_eq!(params.connect_string(), "db.example.local:1521/RAPPORT");

    for bad in ["db.example.local", "db:port/RAPPORT", ":1521/RAPPORT", "db:1521/"] {
        let err = DbConfig::new(USERNAME, PASSWORD, bad).unwrap_err();
        assert!(matches!(err, Error::InvalidConnectString { .. }), "{}", bad);
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}

#[test]
fn test_config_debug_hides_password() {
    let debug = format!("{:?}", config());
    assert!(debug.contains(USERNAME));
    assert!(!debug.contains(PASSWORD));
}
