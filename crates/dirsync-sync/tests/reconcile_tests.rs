//! Reconciler behavior against the in-memory directory.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::{Harness, BASE_DN, DISABLED_DN};
use dirsync_connector::operation::AttributeValue;
use dirsync_connector_ldap::ad::UserAccountControl;
use dirsync_db::ChangeLevel;
use dirsync_sync::context::SyncContext;
use dirsync_sync::model::{attr, EmploymentStatus, HrRecord};
use dirsync_sync::reconciliation::{DigestOutcome, Reconciler};

fn record(employee_id: &str, name: &str, department: &str) -> HrRecord {
    HrRecord {
        company_code: "C01".into(),
        company: "Example Corp".into(),
        display_name: name.into(),
        department: department.into(),
        employee_id: employee_id.into(),
        status: EmploymentStatus::Active,
        phone: "13800138000".into(),
        email: format!("{}@example.com", employee_id.to_lowercase()),
        title: "Engineer".into(),
    }
}

fn reconciler(h: &Harness) -> Reconciler {
    Reconciler::new(
        h.ctx.clone(),
        h.directory.clone(),
        h.audit.clone(),
        h.notifier.clone(),
    )
}

#[tokio::test]
async fn test_departed_employee_is_disabled_and_moved() {
    let h = Harness::new();
    let original = h
        .directory
        .seed_user(&format!("OU=Backend,OU=Eng,{BASE_DN}"), "Zhang San", "E100", "zhangsan");

    let mut departed = record("E100", "Zhang San", "Eng.Backend");
    departed.status = EmploymentStatus::Departed;

    let report = reconciler(&h).reconcile(vec![departed]).await;

    assert_eq!(report.applied, 1);
    assert_eq!(report.moves, 1);

    let modifies = h.directory.modifies();
    assert_eq!(modifies.len(), 1);
    let (dn, delta) = &modifies[0];
    assert_eq!(dn, &original);
    assert_eq!(
        delta.replaced(attr::ACCOUNT_CONTROL),
        Some(&AttributeValue::Integer(i64::from(UserAccountControl::DISABLED)))
    );
    assert_eq!(
        delta.replaced(attr::ACCOUNT_EXPIRES),
        Some(&AttributeValue::Integer(0))
    );

    assert_eq!(h.directory.moves(), vec![(original, DISABLED_DN.to_string())]);
    let moved = h.directory.dn_of("E100").unwrap();
    assert_eq!(moved, format!("CN=Zhang San,{DISABLED_DN}"));

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].employee_id, "E100");
    assert_eq!(records[0].old_department, "Eng.Backend");
    assert!(records[0].level() >= ChangeLevel::Department);
}

#[tokio::test]
async fn test_second_pass_on_unchanged_snapshot_writes_nothing() {
    let h = Harness::new();
    h.directory
        .seed_user(&format!("OU=Unassigned,{BASE_DN}"), "Li Si", "E200", "lisi");
    h.directory
        .seed_user(&format!("OU=Sales,{BASE_DN}"), "Wang Wu", "E300", "wangwu");
    h.directory
        .seed_user(&format!("OU=Ops,{BASE_DN}"), "Zhao Liu", "E400", "zhaoliu");

    let mut departed = record("E400", "Zhao Liu", "Ops");
    departed.status = EmploymentStatus::Departed;
    let snapshot = vec![
        record("E200", "Li Si", "Eng.Backend"),
        record("E300", "Wang Wu", "Sales.East"),
        departed,
    ];

    let engine = reconciler(&h);
    let first = engine.reconcile(snapshot.clone()).await;
    assert_eq!(first.applied, 3);
    assert!(!h.directory.calls().is_empty());

    h.directory.clear_calls();
    let second = engine.reconcile(snapshot).await;

    assert_eq!(second.unchanged, 3);
    assert_eq!(second.applied, 0);
    assert!(h.directory.adds().is_empty());
    assert!(h.directory.modifies().is_empty());
    assert!(h.directory.moves().is_empty());
}

#[tokio::test]
async fn test_department_move_creates_path_and_records_change() {
    let h = Harness::new();
    h.directory
        .seed_user(&format!("OU=Backend,OU=Eng,{BASE_DN}"), "Li Si", "E200", "lisi");

    let report = reconciler(&h)
        .reconcile(vec![record("E200", "Li Si", "Eng.Frontend")])
        .await;

    assert_eq!(report.department_changes, 1);
    assert_eq!(h.directory.adds(), vec![format!("OU=Frontend,OU=Eng,{BASE_DN}")]);
    assert_eq!(
        h.directory.dn_of("E200").unwrap(),
        format!("CN=Li Si,OU=Frontend,OU=Eng,{BASE_DN}")
    );

    let records = h.audit.records();
    assert_eq!(records[0].old_department, "Eng.Backend");
    assert_eq!(records[0].new_department, "Eng.Frontend");
    assert_eq!(records[0].level(), ChangeLevel::Department);
}

#[tokio::test]
async fn test_move_into_partner_tree_is_company_level() {
    let h = Harness::new();
    h.directory
        .seed_user(&format!("OU=QA,OU=Eng,{BASE_DN}"), "Sun Qi", "E500", "sunqi");

    let mut moved = record("E500", "Sun Qi", "Acme.QA");
    moved.company = "Acme".into();
    reconciler(&h).reconcile(vec![moved]).await;

    let records = h.audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level(), ChangeLevel::Company);
    assert_eq!(
        h.directory.dn_of("E500").unwrap(),
        format!("CN=Sun Qi,OU=QA,OU=Acme,OU=Partners,{BASE_DN}")
    );
}

#[tokio::test]
async fn test_missing_and_keyless_records_are_skipped() {
    let h = Harness::new();
    h.directory
        .seed_user(&format!("OU=Ops,{BASE_DN}"), "Admin", "", "administrator");

    let report = reconciler(&h)
        .reconcile(vec![
            record("E999", "Nobody", "Eng"),
            record("", "", "Eng"),
        ])
        .await;

    assert_eq!(report.skipped, 2);
    assert_eq!(report.failed, 0);
    assert!(h.directory.calls().is_empty());
}

#[tokio::test]
async fn test_external_active_account_keeps_its_expiry() {
    let h = Harness::new();
    let container = format!("OU=QA,OU=Acme,OU=Partners,{BASE_DN}");
    let dn = h.directory.seed_user(&container, "Ext User", "X1", "ext_user");
    h.directory
        .set_attribute(&dn, attr::ACCOUNT_EXPIRES, "133485408000000000");

    let mut external = record("X1", "Ext User", "Acme.QA");
    external.company = "Acme".into();
    reconciler(&h).reconcile(vec![external]).await;

    for (_, delta) in h.directory.modifies() {
        assert!(delta.replaced(attr::ACCOUNT_EXPIRES).is_none());
    }
    assert!(h.directory.moves().is_empty());
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let h = Harness::new();
    let mut snapshot = Vec::new();
    for i in 0..25 {
        let eid = format!("E{i:03}");
        h.directory
            .seed_user(&format!("OU=Eng,{BASE_DN}"), &format!("User {i}"), &eid, &format!("u{i}"));
        snapshot.push(record(&eid, &format!("User {i}"), "Eng"));
    }

    let report = reconciler(&h).reconcile(snapshot).await;

    assert_eq!(report.total, 25);
    assert_eq!(report.failed, 0);
    let peak = h.directory.max_in_flight();
    assert!(peak > 1, "records ran one at a time (peak {peak})");
    assert!(peak <= h.ctx.concurrency());
}

#[tokio::test]
async fn test_run_sends_digest_after_all_records() {
    // Wednesday 2026-10-14, 18:00 local
    let now = Utc.with_ymd_and_hms(2026, 10, 14, 10, 0, 0).unwrap();
    let mut settings = common::settings();
    settings.digest.recipient = "hr-team".into();
    let h = Harness::at(Arc::new(SyncContext::new(settings).unwrap()), now);

    for (i, dept) in ["Eng", "Sales", "Ops"].iter().enumerate() {
        h.directory.seed_user(
            &format!("OU={dept},{BASE_DN}"),
            &format!("User {i}"),
            &format!("E{i}"),
            &format!("u{i}"),
        );
    }
    let snapshot = (0..3)
        .map(|i| record(&format!("E{i}"), &format!("User {i}"), "Finance"))
        .collect();

    let run = reconciler(&h).run(snapshot, now).await.unwrap();

    assert_eq!(run.report.department_changes, 3);
    assert_eq!(
        run.digest,
        DigestOutcome::Sent {
            records: 3,
            messages: 1,
            failed: 0
        }
    );
    let sent = h.notifier.with_template("department_change_digest");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "hr-team");
    let content = sent[0].args["content"].as_str().unwrap();
    assert_eq!(content.matches("\n\n").count(), 2);
    assert!(content.contains("Finance"));
}

#[tokio::test]
async fn test_run_on_weekend_suppresses_digest() {
    // Sunday 2026-10-11
    let now = Utc.with_ymd_and_hms(2026, 10, 11, 4, 0, 0).unwrap();
    let mut settings = common::settings();
    settings.digest.recipient = "hr-team".into();
    let h = Harness::at(Arc::new(SyncContext::new(settings).unwrap()), now);
    h.directory
        .seed_user(&format!("OU=Eng,{BASE_DN}"), "Li Si", "E200", "lisi");

    let run = reconciler(&h)
        .run(vec![record("E200", "Li Si", "Sales")], now)
        .await
        .unwrap();

    assert_eq!(run.digest, DigestOutcome::NonWorkday);
    assert!(h.notifier.markdown().is_empty());
    assert_eq!(h.audit.records().len(), 1);
}
