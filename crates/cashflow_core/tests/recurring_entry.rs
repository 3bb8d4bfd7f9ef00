use cashflow_core::db::open_db_in_memory;
use cashflow_core::{
    CashflowService, CommitmentListQuery, CommitmentRepository, CommitmentStatus, Frequency,
    MemoryRepository, NewRecurringEntry, RulePatch, RuleRepository, ServiceError, SqliteRepository,
    ValidationError,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn gym_membership(due: NaiveDate) -> NewRecurringEntry {
    NewRecurringEntry {
        title: "Gym".to_string(),
        amount: Some(Decimal::new(4500, 2)),
        due_date: due,
        status: None,
        paid_date: None,
        category: Some("health".to_string()),
        frequency: Frequency::Monthly,
        interval: None,
        day_to_send: None,
        end_date: None,
    }
}

#[test]
fn recurring_entry_persists_rule_and_materialized_series() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteRepository::try_new(&conn).unwrap();
    let service = CashflowService::new(repo);

    let series = service
        .create_entry_with_recurrence_on(gym_membership(date(2025, 3, 15)), date(2025, 3, 15))
        .unwrap();

    let stored_rule = service.get_recurrence_rule(&series.rule.id).unwrap().unwrap();
    assert_eq!(stored_rule.day_to_send, 15);
    assert_eq!(stored_rule.last_generated_date, Some(date(2025, 9, 15)));

    let stored = service
        .store()
        .list_commitments(&CommitmentListQuery::default())
        .unwrap();
    let dates: Vec<NaiveDate> = stored.iter().map(|c| c.due_date).collect();
    assert_eq!(
        dates,
        vec![
            date(2025, 3, 15),
            date(2025, 4, 15),
            date(2025, 5, 15),
            date(2025, 6, 15),
            date(2025, 7, 15),
            date(2025, 8, 15),
            date(2025, 9, 15)
        ]
    );
    assert!(stored
        .iter()
        .all(|c| c.recurrence_rule_id.as_deref() == Some(series.rule.id.as_str())
            && c.status == CommitmentStatus::Pending
            && !c.is_projected));
}

#[test]
fn materialized_series_leaves_no_projection_in_range() {
    let service = CashflowService::new(MemoryRepository::new());
    service
        .create_entry_with_recurrence_on(gym_membership(date(2025, 3, 15)), date(2025, 3, 15))
        .unwrap();

    let view = service
        .get_commitments(Some(date(2025, 3, 1)), Some(date(2025, 9, 30)))
        .unwrap();

    assert_eq!(view.len(), 7);
    assert!(view.iter().all(|c| !c.is_projected));
}

#[test]
fn horizon_follows_configured_months() {
    let mut config = cashflow_core::EngineConfig::default();
    config.materialization.horizon_months = 2;
    let service = CashflowService::with_config(MemoryRepository::new(), config);

    let series = service
        .create_entry_with_recurrence_on(gym_membership(date(2025, 3, 15)), date(2025, 3, 20))
        .unwrap();

    assert_eq!(series.commitments.len(), 3);
    assert_eq!(series.rule.last_generated_date, Some(date(2025, 5, 15)));
}

#[test]
fn invalid_entry_writes_nothing() {
    let store = MemoryRepository::new();
    let service = CashflowService::new(store.clone());
    let mut entry = gym_membership(date(2025, 3, 15));
    entry.day_to_send = Some(0);

    let err = service
        .create_entry_with_recurrence_on(entry, date(2025, 3, 15))
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::DayToSendOutOfRange { value: 0, .. })
    ));
    assert!(store.list_rules().unwrap().is_empty());
    assert!(store
        .list_commitments(&CommitmentListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn editing_rule_changes_only_future_projections() {
    let conn = open_db_in_memory().unwrap();
    let service = CashflowService::new(SqliteRepository::try_new(&conn).unwrap());
    let series = service
        .create_entry_with_recurrence_on(gym_membership(date(2025, 3, 15)), date(2025, 3, 15))
        .unwrap();

    service
        .update_recurrence_rule(
            &series.rule.id,
            &RulePatch {
                title: Some("Gym premium".to_string()),
                amount: Some(Decimal::new(6000, 2)),
                ..RulePatch::default()
            },
        )
        .unwrap();

    let stored = service
        .store()
        .list_commitments(&CommitmentListQuery::default())
        .unwrap();
    assert_eq!(stored.len(), series.commitments.len());
    assert!(stored
        .iter()
        .all(|c| c.title == "Gym" && c.amount == Decimal::new(4500, 2)));

    let october = service
        .get_commitments(Some(date(2025, 10, 1)), Some(date(2025, 10, 31)))
        .unwrap();
    assert_eq!(october.len(), 1);
    assert!(october[0].is_projected);
    assert_eq!(october[0].due_date, date(2025, 10, 15));
    assert_eq!(october[0].amount, Decimal::new(6000, 2));
    assert!(october[0].title.starts_with("Gym premium"));
}
