use std::sync::Arc;

use super::common::*;
use crate::classroom::audit::AuditAction;
use crate::classroom::domain::{BatchId, ClassId, ClassPatch, Visibility};
use crate::classroom::error::{ClassroomError, EntityKind};
use crate::classroom::memory::{InMemoryAttendanceRepository, InMemoryAuditLog};
use crate::classroom::registry::ClassRegistry;
use crate::classroom::repository::RepositoryError;
use crate::classroom::service::{ClassroomDeps, ClassroomService};
use crate::config::ClassroomConfig;

#[test]
fn create_trims_name_and_starts_with_empty_roster() {
    let (service, audit) = build_service();
    let mut input = new_class("  Algebra I  ", Visibility::Open, Some(25));
    input.description = Some("   ".to_string());

    let class = service.registry().create(input).expect("class created");

    assert_eq!(class.name, "Algebra I");
    assert!(class.description.is_none());
    assert!(class.roster.is_empty());
    assert!(class.active);
    assert_eq!(class.capacity, Some(25));
    assert!(class.id.as_str().starts_with("cls-"));
    assert_eq!(audit.events()[0].action, AuditAction::ClassCreated);
}

#[test]
fn create_rejects_out_of_range_fields() {
    let (service, _) = build_service();

    let blank = service
        .registry()
        .create(new_class("   ", Visibility::Open, None))
        .expect_err("blank name rejected");
    assert_eq!(blank.field(), Some("name"));

    let long_name = "x".repeat(101);
    let err = service
        .registry()
        .create(new_class(&long_name, Visibility::Open, None))
        .expect_err("long name rejected");
    assert_eq!(err.field(), Some("name"));

    for capacity in [0, 1001] {
        let err = service
            .registry()
            .create(new_class("Chemistry", Visibility::Open, Some(capacity)))
            .expect_err("capacity out of range");
        assert_eq!(err.field(), Some("capacity"));
    }

    let mut input = new_class("Chemistry", Visibility::Open, None);
    input.description = Some("d".repeat(501));
    let err = service.registry().create(input).expect_err("long description");
    assert_eq!(err.field(), Some("description"));
}

#[test]
fn class_names_are_unique_within_a_batch() {
    let (service, _) = build_service();
    create_class(&service, "Biology", Visibility::Open, None);

    let err = service
        .registry()
        .create(new_class("biology", Visibility::Unlisted, None))
        .expect_err("duplicate name");
    assert!(matches!(err, ClassroomError::DuplicateClassName { .. }));

    let mut elsewhere = new_class("Biology", Visibility::Open, None);
    elsewhere.batch_id = BatchId::new(OTHER_BATCH);
    service
        .registry()
        .create(elsewhere)
        .expect("same name in another batch");
}

#[test]
fn find_by_name_and_list_by_batch() {
    let (service, _) = build_service();
    create_class(&service, "Physics", Visibility::Open, None);
    create_class(&service, "Art", Visibility::Unlisted, None);

    let found = service
        .registry()
        .find_by_name(&batch(), "PHYSICS")
        .expect("found");
    assert_eq!(found.name, "Physics");

    let names: Vec<String> = service
        .registry()
        .list_by_batch(&batch())
        .expect("listed")
        .into_iter()
        .map(|class| class.name)
        .collect();
    assert_eq!(names, vec!["Art".to_string(), "Physics".to_string()]);

    let missing = service
        .registry()
        .find_by_name(&batch(), "Latin")
        .expect_err("missing");
    assert!(matches!(
        missing,
        ClassroomError::NotFound {
            entity: EntityKind::Class,
            ..
        }
    ));
}

#[test]
fn update_refuses_capacity_below_roster_size() {
    let (service, _) = build_service();
    let class = class_with_roster(
        &service,
        "History",
        Visibility::Open,
        Some(10),
        &students(1..=4),
    );

    let err = service
        .registry()
        .update(
            &class.id,
            ClassPatch {
                capacity: Some(Some(3)),
                ..ClassPatch::default()
            },
        )
        .expect_err("capacity below roster");
    assert!(matches!(
        err,
        ClassroomError::InvalidCapacity {
            requested: 3,
            roster_size: 4
        }
    ));
    assert_eq!(err.field(), Some("capacity"));

    let updated = service
        .registry()
        .update(
            &class.id,
            ClassPatch {
                capacity: Some(Some(4)),
                visibility: Some(Visibility::RequestToJoin),
                ..ClassPatch::default()
            },
        )
        .expect("capacity equal to roster is fine");
    assert_eq!(updated.capacity, Some(4));
    assert_eq!(updated.visibility, Visibility::RequestToJoin);
    assert!(updated.is_full());
}

#[test]
fn update_can_clear_capacity_and_rename() {
    let (service, _) = build_service();
    let class = create_class(&service, "Geography", Visibility::Open, Some(5));
    create_class(&service, "Music", Visibility::Open, None);

    let cleared = service
        .registry()
        .update(
            &class.id,
            ClassPatch {
                capacity: Some(None),
                description: Some(Some("Maps and rivers".to_string())),
                ..ClassPatch::default()
            },
        )
        .expect("capacity cleared");
    assert!(cleared.capacity.is_none());
    assert_eq!(cleared.description.as_deref(), Some("Maps and rivers"));
    assert_eq!(cleared.batch_id, class.batch_id);

    let clash = service
        .registry()
        .update(
            &class.id,
            ClassPatch {
                name: Some("music".to_string()),
                ..ClassPatch::default()
            },
        )
        .expect_err("name taken");
    assert!(matches!(clash, ClassroomError::DuplicateClassName { .. }));

    let renamed = service
        .registry()
        .update(
            &class.id,
            ClassPatch {
                name: Some("GEOGRAPHY".to_string()),
                ..ClassPatch::default()
            },
        )
        .expect("case change of own name");
    assert_eq!(renamed.name, "GEOGRAPHY");
}

#[test]
fn delete_cascades_requests_but_keeps_attendance_by_default() {
    let (service, _) = build_service();
    let class = class_with_roster(
        &service,
        "Drama",
        Visibility::RequestToJoin,
        None,
        &students(1..=2),
    );
    service
        .requests()
        .request_join(&class.id, &student(3))
        .expect("request filed");
    let record = service
        .attendance()
        .create_draft(&class.id, session_date(), "09:00-10:00")
        .expect("draft created");

    let summary = service
        .registry()
        .delete(&class.id, false)
        .expect("class deleted");
    assert_eq!(summary.join_requests_removed, 1);
    assert_eq!(summary.attendance_records_removed, 0);

    assert!(matches!(
        service.registry().get(&class.id),
        Err(ClassroomError::NotFound { .. })
    ));
    let kept = service.attendance().get(&record.id).expect("history kept");
    assert_eq!(kept.snapshot, students(1..=2));
    assert_eq!(
        service
            .attendance()
            .list_for_class(&class.id)
            .expect("listed")
            .len(),
        1
    );
}

#[test]
fn delete_with_cascade_removes_attendance() {
    let (service, audit) = build_service();
    let class = class_with_roster(&service, "Dance", Visibility::Open, None, &students(1..=1));
    service
        .attendance()
        .create_draft(&class.id, session_date(), "morning")
        .expect("draft created");

    let summary = service
        .registry()
        .delete(&class.id, true)
        .expect("class deleted");
    assert_eq!(summary.attendance_records_removed, 1);
    assert!(service
        .attendance()
        .list_for_class(&class.id)
        .expect("listed")
        .is_empty());
    assert!(audit
        .events()
        .iter()
        .any(|event| event.action == AuditAction::ClassDeleted));

    let again = service
        .registry()
        .delete(&class.id, true)
        .expect_err("already gone");
    assert!(matches!(again, ClassroomError::NotFound { .. }));
}

#[test]
fn roster_snapshot_is_sorted_copy() {
    let (service, _) = build_service();
    let class = class_with_roster(
        &service,
        "Poetry",
        Visibility::Unlisted,
        None,
        &[student(3), student(1), student(2)],
    );

    let snapshot = service
        .registry()
        .roster_snapshot(&class.id)
        .expect("snapshot");
    assert_eq!(snapshot, students(1..=3));
}

#[test]
fn repository_failures_surface_as_repository_errors() {
    let registry = ClassRegistry::new(
        Arc::new(UnavailableRepository),
        Arc::new(UnavailableRepository),
        Arc::new(InMemoryAttendanceRepository::default()),
        Arc::new(InMemoryAuditLog::default()),
    );

    let err = registry
        .get(&ClassId::new("cls-999999"))
        .expect_err("storage offline");
    assert!(matches!(
        err,
        ClassroomError::Repository(RepositoryError::Unavailable(_))
    ));
}

#[test]
fn failing_audit_sink_never_fails_the_operation() {
    let deps = ClassroomDeps::in_memory(Arc::new(directory())).with_audit(Arc::new(FailingAudit));
    let service = ClassroomService::new(deps, ClassroomConfig::default());

    let class = service
        .registry()
        .create(new_class("Robotics", Visibility::Open, None))
        .expect("created despite audit failure");
    service
        .enrollment()
        .join_open(&class.id, &student(1))
        .expect("joined despite audit failure");
}

#[test]
fn class_names_compare_case_insensitively_beyond_ascii() {
    let (service, _) = build_service();
    create_class(&service, "Ärzte Seminar", Visibility::Open, None);

    let err = service
        .registry()
        .create(new_class("ärzte seminar", Visibility::Open, None))
        .expect_err("duplicate name");
    assert!(matches!(err, ClassroomError::DuplicateClassName { .. }));

    let found = service
        .registry()
        .find_by_name(&batch(), "ÄRZTE SEMINAR")
        .expect("found by upper-case name");
    assert_eq!(found.name, "Ärzte Seminar");
}

#[test]
fn lock_slots_are_released_after_each_call() {
    let (service, _) = build_service();
    let roster = students(1..=2);
    let class = class_with_roster(&service, "Chemistry", Visibility::Open, None, &roster);

    for n in 0..100 {
        let unknown = ClassId::new(format!("cls-unknown-{n}"));
        let removed = service.enrollment().remove_student(&unknown, &student(1));
        assert!(matches!(removed, Err(ClassroomError::NotFound { .. })));
        let added = service.enrollment().add_students(&unknown, &[student(1)]);
        assert!(matches!(added, Err(ClassroomError::NotFound { .. })));
    }
    service
        .enrollment()
        .add_students(&class.id, &students(3..=4))
        .expect("added");
    service
        .registry()
        .update(
            &class.id,
            ClassPatch {
                name: Some("Organic Chemistry".to_string()),
                ..ClassPatch::default()
            },
        )
        .expect("renamed");
    service.registry().delete(&class.id, false).expect("deleted");

    assert_eq!(service.registry().held_lock_slots(), 0);
}
