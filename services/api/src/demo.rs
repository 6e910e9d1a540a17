use crate::infra::load_directory;
use academy::classroom::{
    AttendanceStatus, BatchDirectory, BatchId, ClassroomDeps, ClassroomError, ClassroomService,
    NewClass, StudentDirectory, StudentId, UserDirectory, Visibility,
};
use academy::config::ClassroomConfig;
use academy::error::AppError;
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

const DEMO_BATCH: &str = "demo-cohort";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Seat limit of the open demo class.
    #[arg(long, default_value_t = 3)]
    pub(crate) capacity: u32,
    /// Number of students in the demo cohort.
    #[arg(long, default_value_t = 5)]
    pub(crate) students: usize,
    /// Session date for the attendance walkthrough (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) session_date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub(crate) struct RosterArgs {
    /// Student directory CSV (batch_id,student_id,display_name,email)
    #[arg(long)]
    pub(crate) directory_csv: PathBuf,
    /// Batch whose members should be listed
    #[arg(long)]
    pub(crate) batch: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        capacity,
        students,
        session_date,
    } = args;
    let session_date = session_date.unwrap_or_else(|| Local::now().date_naive());
    let cohort: Vec<StudentId> = (1..=students.max(2))
        .map(|n| StudentId::new(format!("student-{n:02}")))
        .collect();

    let directory = cohort
        .iter()
        .enumerate()
        .fold(StudentDirectory::new(), |directory, (index, student_id)| {
            directory.with_student(
                DEMO_BATCH,
                student_id.as_str(),
                format!("Demo Student {}", index + 1),
            )
        });
    let service = ClassroomService::new(
        ClassroomDeps::in_memory(Arc::new(directory)),
        ClassroomConfig::default(),
    );

    println!("Academy classroom demo");
    println!("Cohort {DEMO_BATCH}: {} students", cohort.len());

    let open_class = service.registry().create(NewClass {
        name: "Open Workshop".to_string(),
        description: Some("Self-service enrollment".to_string()),
        batch_id: BatchId::new(DEMO_BATCH),
        visibility: Visibility::Open,
        capacity: Some(capacity),
        active: true,
    })?;
    println!(
        "\nCreated '{}' ({}), visibility {}, capacity {}",
        open_class.name, open_class.id, open_class.visibility, capacity
    );

    for student_id in &cohort {
        match service.enrollment().join_open(&open_class.id, student_id) {
            Ok(class) => println!(
                "  {student_id} joined ({} of {capacity} seats taken)",
                class.roster_size()
            ),
            Err(err @ ClassroomError::CapacityExceeded { .. }) => {
                println!("  {student_id} refused: {err}")
            }
            Err(err) => return Err(err.into()),
        }
    }

    let seminar = service.registry().create(NewClass {
        name: "Invitation Seminar".to_string(),
        description: None,
        batch_id: BatchId::new(DEMO_BATCH),
        visibility: Visibility::RequestToJoin,
        capacity: Some(1),
        active: true,
    })?;
    println!(
        "\nCreated '{}' ({}), visibility {}, capacity 1",
        seminar.name, seminar.id, seminar.visibility
    );

    let first = service.requests().request_join(&seminar.id, &cohort[0])?;
    let second = service.requests().request_join(&seminar.id, &cohort[1])?;
    println!(
        "  {} pending requests",
        service.requests().pending_for_class(&seminar.id)?.len()
    );
    let approved = service.requests().approve(&first.id)?;
    println!("  {} {}", approved.student_id, approved.status);
    match service.requests().approve(&second.id) {
        Ok(request) => println!("  {} {}", request.student_id, request.status),
        Err(err) => {
            let still = service.requests().get(&second.id)?;
            println!(
                "  {} approval failed ({}); request is still {}",
                still.student_id,
                err.code(),
                still.status
            );
        }
    }

    println!("\nAttendance for '{}' on {session_date}", open_class.name);
    let draft = service
        .attendance()
        .create_draft(&open_class.id, session_date, "09:00-10:30")?;
    let marks = [
        AttendanceStatus::Present,
        AttendanceStatus::Late,
        AttendanceStatus::Absent,
        AttendanceStatus::Excused,
    ];
    for (student_id, status) in draft.snapshot.iter().zip(marks.iter().cycle()).skip(1) {
        service
            .attendance()
            .mark_status(&draft.id, student_id, *status)?;
        println!("  {student_id}: {}", status.label());
    }
    let record = service.attendance().submit(&draft.id)?;
    let counts = record.counts;
    println!(
        "  Submitted {}: present {}, absent {}, late {}, excused {}, unmarked {} of {}",
        record.id,
        counts.present,
        counts.absent,
        counts.late,
        counts.excused,
        counts.unmarked(),
        counts.total
    );

    if let Some(leaver) = record.snapshot.first() {
        service.enrollment().remove_student(&open_class.id, leaver)?;
        let kept = service.attendance().get(&record.id)?;
        println!(
            "  {leaver} left the class; submitted record still lists {} students",
            kept.snapshot.len()
        );
    }

    Ok(())
}

pub(crate) fn run_roster(args: RosterArgs) -> Result<(), AppError> {
    let directory = load_directory(Some(args.directory_csv.as_path()))?;
    let batch_id = BatchId::new(args.batch);
    let students = directory
        .students_in_batch(&batch_id)
        .map_err(ClassroomError::from)?;

    if students.is_empty() {
        println!("Batch {batch_id} has no students in the directory");
        return Ok(());
    }

    println!("Batch {batch_id}: {} students", students.len());
    for student_id in students {
        let profile = directory
            .student(&student_id)
            .map_err(ClassroomError::from)?;
        match profile {
            Some(profile) => match profile.email {
                Some(email) => println!("  {student_id}  {}  <{email}>", profile.display_name),
                None => println!("  {student_id}  {}", profile.display_name),
            },
            None => println!("  {student_id}"),
        }
    }

    Ok(())
}
