use std::io::Cursor;
use std::sync::Arc;

use academy::classroom::{
    AuditAction, BatchId, ClassPatch, ClassroomDeps, ClassroomError, ClassroomService,
    InMemoryAuditLog, JoinRequestStatus, NewClass, StudentDirectory, StudentId, Visibility,
};
use academy::config::ClassroomConfig;

const DIRECTORY_EXPORT: &str = "batch_id,student_id,display_name,email\n\
    cohort-a,amara,Amara Okafor,amara@example.edu\n\
    cohort-a,bruno,Bruno Silva,\n\
    cohort-a,chen,Chen Wei,\n\
    cohort-a,dana,Dana Levi,\n\
    cohort-b,emil,Emil Novak,\n";

fn service() -> (ClassroomService, InMemoryAuditLog) {
    let directory = StudentDirectory::from_reader(Cursor::new(DIRECTORY_EXPORT))
        .expect("directory export parses");
    let audit = InMemoryAuditLog::default();
    let deps = ClassroomDeps::in_memory(Arc::new(directory)).with_audit(Arc::new(audit.clone()));
    (ClassroomService::new(deps, ClassroomConfig::default()), audit)
}

fn id(value: &str) -> StudentId {
    StudentId::new(value)
}

#[test]
fn request_to_join_class_fills_up_and_rejects_late_approvals() {
    let (service, audit) = service();
    let class = service
        .registry()
        .create(NewClass {
            name: "Data Structures".to_string(),
            description: Some("Trees, heaps and graphs".to_string()),
            batch_id: BatchId::new("cohort-a"),
            visibility: Visibility::RequestToJoin,
            capacity: Some(2),
            active: true,
        })
        .expect("class created");

    service
        .enrollment()
        .add_students(&class.id, &[id("amara")])
        .expect("teacher placed amara");
    let dana = service
        .requests()
        .request_join(&class.id, &id("dana"))
        .expect("dana asked to join");

    let outcome = service
        .enrollment()
        .add_students(&class.id, &[id("chen")])
        .expect("teacher placed chen");
    assert_eq!(outcome.roster_size, 2);

    let err = service
        .requests()
        .approve(&dana.id)
        .expect_err("no seat left for dana");
    assert!(matches!(err, ClassroomError::CapacityExceeded { .. }));
    assert_eq!(
        service.requests().get(&dana.id).expect("request kept").status,
        JoinRequestStatus::Pending
    );

    service
        .registry()
        .update(
            &class.id,
            ClassPatch {
                capacity: Some(Some(3)),
                ..ClassPatch::default()
            },
        )
        .expect("teacher raised the capacity");
    let approved = service.requests().approve(&dana.id).expect("dana admitted");
    assert_eq!(approved.status, JoinRequestStatus::Approved);

    let roster: Vec<String> = service
        .enrollment()
        .roster(&class.id)
        .expect("roster")
        .into_iter()
        .filter_map(|summary| summary.display_name)
        .collect();
    assert_eq!(roster, vec!["Amara Okafor", "Chen Wei", "Dana Levi"]);

    let eligible = service
        .enrollment()
        .eligible_students(&class.id)
        .expect("eligible");
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].student_id, id("bruno"));

    let actions: Vec<AuditAction> = audit.events().iter().map(|event| event.action).collect();
    assert!(actions.contains(&AuditAction::JoinApproved));
    assert!(actions.contains(&AuditAction::ClassUpdated));
}

#[test]
fn open_class_admits_batch_members_only() {
    let (service, _) = service();
    let class = service
        .registry()
        .create(NewClass {
            name: "Intro to Rust".to_string(),
            description: None,
            batch_id: BatchId::new("cohort-a"),
            visibility: Visibility::Open,
            capacity: None,
            active: true,
        })
        .expect("class created");

    let joined = service
        .enrollment()
        .join_open(&class.id, &id("bruno"))
        .expect("bruno joined");
    assert_eq!(joined.roster_size(), 1);

    let err = service
        .enrollment()
        .join_open(&class.id, &id("emil"))
        .expect_err("emil is in another cohort");
    assert!(matches!(err, ClassroomError::NotInBatch { .. }));

    let err = service
        .enrollment()
        .join_open(&class.id, &id("bruno"))
        .expect_err("already enrolled");
    assert!(matches!(err, ClassroomError::DuplicateEnrollment { .. }));
}
