use std::cell::RefCell;
use std::rc::Rc;
use timeclock_core::{
    open_db, open_db_in_memory, Audit, AuditHook, ClockAuditHook, CrudRepository, Customer,
    CustomerBuilder, DbError, ModelValidationError, PayBuilder, RepoError, RepoErrorKind,
    Session, SqliteCustomerRepository, SqlitePayRepository,
};

fn session() -> Session {
    Session::try_new(open_db_in_memory().unwrap()).unwrap()
}

fn new_customer(name: &str) -> Customer {
    CustomerBuilder::new()
        .name(name)
        .contact("Kovacs Anna")
        .build()
        .unwrap()
}

#[test]
fn save_then_get_returns_equal_entity_with_identity_audit_and_version() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let built = new_customer("Acme");

    let mut customer = built.clone();
    repo.save(&mut customer).unwrap();

    let customer_id = customer.customer_id.unwrap();
    assert!(customer.audit.is_populated());
    assert_eq!(customer.audit.modified_at, None);
    assert_eq!(customer.version, 1);
    assert!(session.contains("customers", &customer_id));

    let loaded = repo.get(customer_id).unwrap().unwrap();
    assert_eq!(loaded, customer);
    assert_eq!(loaded.name, built.name);
    assert_eq!(loaded.contact, built.contact);
}

#[test]
fn get_missing_key_returns_none() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    assert!(repo.get(404).unwrap().is_none());
}

#[test]
fn save_rejects_invalid_entity_before_touching_storage() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let mut invalid = Customer::default();

    let err = repo.save(&mut invalid).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ModelValidationError::BlankField("name"))
    ));
    assert_eq!(err.kind(), RepoErrorKind::ConstraintViolation);
    assert_eq!(invalid.customer_id, None);
    assert!(repo.get_all().unwrap().is_empty());
}

#[test]
fn save_rejects_already_persisted_entity() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let mut customer = new_customer("Acme");
    repo.save(&mut customer).unwrap();

    let err = repo.save(&mut customer).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::ConstraintViolation);
    assert_eq!(repo.get_all().unwrap().len(), 1);
}

#[test]
fn pay_round_trips_through_storage() {
    let session = session();
    let repo = SqlitePayRepository::new(&session);
    let mut pay = PayBuilder::new()
        .hourly_rate(6_000)
        .currency("EUR")
        .worked_minutes(90)
        .paid(true)
        .build()
        .unwrap();

    repo.save(&mut pay).unwrap();
    let loaded = repo.get(pay.pay_id.unwrap()).unwrap().unwrap();

    assert_eq!(loaded, pay);
    assert!(loaded.paid);
    assert_eq!(loaded.amount_due(), 9_000);
}

#[test]
fn update_increments_version_and_stamps_modification() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let mut customer = new_customer("Acme");
    repo.save(&mut customer).unwrap();

    let changed = CustomerBuilder::from(customer.clone())
        .contact("Nagy Peter")
        .build()
        .unwrap();
    let updated = repo.update(&changed).unwrap();

    assert_eq!(updated.customer_id, customer.customer_id);
    assert_eq!(updated.contact.as_deref(), Some("Nagy Peter"));
    assert_eq!(updated.version, 2);
    assert_eq!(updated.audit.created_at, customer.audit.created_at);
    assert_eq!(updated.audit.created_by, customer.audit.created_by);
    assert!(updated.audit.modified_at.is_some());
    assert!(updated.audit.modified_by.is_some());
    assert_eq!(repo.get(updated.customer_id.unwrap()).unwrap().unwrap(), updated);
}

#[test]
fn update_with_stale_version_is_a_conflict() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let mut customer = new_customer("Acme");
    repo.save(&mut customer).unwrap();
    let stale = customer.clone();

    customer.contact = Some("first writer".to_string());
    repo.update(&customer).unwrap();

    let mut second = stale.clone();
    second.contact = Some("second writer".to_string());
    let err = repo.update(&second).unwrap_err();

    assert_eq!(err.kind(), RepoErrorKind::Conflict);
    match err {
        RepoError::Conflict {
            expected_version,
            actual_version,
            ..
        } => {
            assert_eq!(expected_version, 1);
            assert_eq!(actual_version, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    let stored = repo.get(stale.customer_id.unwrap()).unwrap().unwrap();
    assert_eq!(stored.contact.as_deref(), Some("first writer"));
}

#[test]
fn stale_copy_from_another_session_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeclock.db");
    let writer = Session::try_new(open_db(&path).unwrap()).unwrap();
    let reader = Session::try_new(open_db(&path).unwrap()).unwrap();
    let writer_repo = SqliteCustomerRepository::new(&writer);
    let reader_repo = SqliteCustomerRepository::new(&reader);

    let mut customer = new_customer("Acme");
    writer_repo.save(&mut customer).unwrap();
    let customer_id = customer.customer_id.unwrap();
    let stale = reader_repo.get(customer_id).unwrap().unwrap();

    customer.contact = Some("changed by writer".to_string());
    writer_repo.update(&customer).unwrap();

    let mut overwrite = stale.clone();
    overwrite.contact = Some("changed by reader".to_string());
    let err = reader_repo.update(&overwrite).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Conflict {
            expected_version: 1,
            actual_version: 2,
            ..
        }
    ));
    assert_eq!(
        reader_repo.remove(&stale).unwrap_err().kind(),
        RepoErrorKind::Conflict
    );

    let fresh = reader_repo.get(customer_id).unwrap().unwrap();
    assert_eq!(fresh.contact.as_deref(), Some("changed by writer"));
    let mut retried = fresh.clone();
    retried.contact = Some("changed by reader".to_string());
    assert_eq!(reader_repo.update(&retried).unwrap().version, 3);
    assert_eq!(
        writer_repo.get(customer_id).unwrap().unwrap().contact.as_deref(),
        Some("changed by reader")
    );
}

#[test]
fn update_of_transient_entity_inserts_it() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);

    let inserted = repo.update(&new_customer("Acme")).unwrap();

    assert!(inserted.customer_id.is_some());
    assert_eq!(inserted.version, 1);
    assert!(repo.is_exist(inserted.customer_id.unwrap()).unwrap());
}

#[test]
fn update_of_missing_row_is_not_found() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let mut ghost = new_customer("Ghost");
    ghost.customer_id = Some(999);
    ghost.version = 1;

    let err = repo.update(&ghost).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::NotFound);
}

#[test]
fn remove_deletes_row_and_second_remove_is_not_found() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let mut customer = new_customer("Acme");
    repo.save(&mut customer).unwrap();
    let customer_id = customer.customer_id.unwrap();
    assert!(repo.is_exist(customer_id).unwrap());

    repo.remove(&customer).unwrap();

    assert!(!repo.is_exist(customer_id).unwrap());
    assert!(!session.contains("customers", &customer_id));
    let err = repo.remove(&customer).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::NotFound);
}

#[test]
fn remove_of_transient_entity_is_not_found() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);

    let err = repo.remove(&new_customer("Never saved")).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::NotFound);
}

#[test]
fn remove_with_stale_version_is_a_conflict() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let mut customer = new_customer("Acme");
    repo.save(&mut customer).unwrap();
    let stale = customer.clone();
    customer.contact = Some("changed".to_string());
    repo.update(&customer).unwrap();

    let err = repo.remove(&stale).unwrap_err();
    assert_eq!(err.kind(), RepoErrorKind::Conflict);
    assert!(repo.is_exist(stale.customer_id.unwrap()).unwrap());
}

struct RecordingHook {
    clock: ClockAuditHook,
    removed: Rc<RefCell<Vec<String>>>,
}

impl AuditHook for RecordingHook {
    fn on_insert(&self, audit: &mut Audit) {
        self.clock.on_insert(audit);
    }

    fn on_update(&self, audit: &mut Audit) {
        self.clock.on_update(audit);
    }

    fn on_remove(&self, entity: &'static str, key: &str) {
        self.removed.borrow_mut().push(format!("{entity}:{key}"));
    }
}

#[test]
fn remove_all_empties_table_and_fires_hook_per_row() {
    let removed = Rc::new(RefCell::new(Vec::new()));
    let session = session().with_audit_hook(RecordingHook {
        clock: ClockAuditHook::new("tester"),
        removed: Rc::clone(&removed),
    });
    let repo = SqliteCustomerRepository::new(&session);
    for name in ["Acme", "Globex", "Initech"] {
        let mut customer = new_customer(name);
        repo.save(&mut customer).unwrap();
        assert_eq!(customer.audit.created_by, "tester");
    }

    let count = repo.remove_all().unwrap();

    assert_eq!(count, 3);
    assert!(repo.get_all().unwrap().is_empty());
    assert_eq!(
        *removed.borrow(),
        vec![
            "customer:1".to_string(),
            "customer:2".to_string(),
            "customer:3".to_string()
        ]
    );
    assert_eq!(repo.remove_all().unwrap(), 0);
}

#[test]
fn get_all_returns_rows_in_key_order() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    for name in ["Globex", "Acme"] {
        repo.save(&mut new_customer(name)).unwrap();
    }

    let names: Vec<String> = repo
        .get_all()
        .unwrap()
        .into_iter()
        .map(|customer| customer.name)
        .collect();
    assert_eq!(names, vec!["Globex".to_string(), "Acme".to_string()]);
}

#[test]
fn is_exist_entity_uses_value_equality() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    let mut customer = new_customer("Acme");
    assert!(!repo.is_exist_entity(&customer).unwrap());

    repo.save(&mut customer).unwrap();
    assert!(repo.is_exist_entity(&customer).unwrap());

    let mut edited = customer.clone();
    edited.contact = Some("unsaved edit".to_string());
    assert!(!repo.is_exist_entity(&edited).unwrap());

    repo.remove(&customer).unwrap();
    assert!(!repo.is_exist_entity(&customer).unwrap());
}

#[test]
fn clear_detaches_instances_without_touching_storage() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    repo.save(&mut new_customer("Acme")).unwrap();
    repo.save(&mut new_customer("Globex")).unwrap();
    assert_eq!(session.managed_count(), 2);

    repo.clear();

    assert_eq!(session.managed_count(), 0);
    assert_eq!(repo.get_all().unwrap().len(), 2);
    assert_eq!(session.managed_count(), 2);
}

#[test]
fn close_makes_later_operations_fail() {
    let session = session();
    let repo = SqliteCustomerRepository::new(&session);
    repo.save(&mut new_customer("Acme")).unwrap();

    repo.close().unwrap();

    assert!(session.is_closed());
    assert_eq!(session.managed_count(), 0);
    let err = repo.get(1).unwrap_err();
    assert!(matches!(err, RepoError::Db(DbError::SessionClosed)));
    assert_eq!(err.kind(), RepoErrorKind::Storage);
    assert!(repo.save(&mut new_customer("Late")).is_err());
}
