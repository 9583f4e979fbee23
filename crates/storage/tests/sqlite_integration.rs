use chrono::Duration;
use pylearn_core::model::{
    LessonId, McqId, McqOption, ModuleId, NewContactMessage, NewLesson, NewModule,
    NewMultipleChoiceQuestion, NewQuestion, NewUser, QuestionId, UserId,
};
use pylearn_core::time::fixed_now;
use storage::repository::{
    AnswerLedger, AnswerPersistence, CatalogRepository, ContactRepository, ProgressRepository,
    StorageError, UserRepository,
};
use storage::sqlite::SqliteRepository;

struct Fixture {
    repo: SqliteRepository,
    user: UserId,
    module: ModuleId,
    lesson: LessonId,
    q1: QuestionId,
    q2: QuestionId,
    mcq: McqId,
}

/// One lesson worth 35 points: two short answers (10 + 15) and one MCQ (10, correct C).
async fn fixture(name: &str) -> Fixture {
    fixture_at(&format!("sqlite:file:{name}?mode=memory&cache=shared")).await
}

async fn fixture_at(url: &str) -> Fixture {
    let repo = SqliteRepository::connect(url, 5).await.expect("connect");
    repo.migrate().await.expect("migrate");

    let user = repo
        .insert_user(NewUser::new("Ana", "ana@example.com", "stored-hash", false).unwrap())
        .await
        .unwrap();
    let module = repo
        .insert_module(NewModule::new("Python Basics", None).unwrap())
        .await
        .unwrap();
    let lesson = repo
        .insert_lesson(NewLesson::new(module.id, "Variables", "x = 1", None).unwrap())
        .await
        .unwrap();
    let q1 = repo
        .insert_question(NewQuestion::new(lesson.id, "Print keyword?", "print", Some(10)).unwrap())
        .await
        .unwrap();
    let q2 = repo
        .insert_question(NewQuestion::new(lesson.id, "Loop keyword?", "for", Some(15)).unwrap())
        .await
        .unwrap();
    let mcq = repo
        .insert_mcq(
            NewMultipleChoiceQuestion::new(
                lesson.id,
                "Whole numbers?",
                ["str", "float", "int", "bool"],
                McqOption::C,
                Some(10),
            )
            .unwrap(),
        )
        .await
        .unwrap();

    Fixture {
        repo,
        user: user.id(),
        module: module.id,
        lesson: lesson.id,
        q1: q1.id,
        q2: q2.id,
        mcq: mcq.id,
    }
}

#[tokio::test]
async fn full_lesson_walkthrough_reconciles_after_every_answer() {
    let f = fixture("memdb_walkthrough").await;
    let now = fixed_now();

    let p = f.repo.record_short_answer(f.user, f.q1, now).await.unwrap();
    assert_eq!((p.score, p.completed), (10, false));

    let p = f
        .repo
        .record_mcq_answer(f.user, f.mcq, McqOption::A, false, now)
        .await
        .unwrap();
    assert_eq!((p.score, p.completed), (10, false));

    let p = f
        .repo
        .record_mcq_answer(f.user, f.mcq, McqOption::C, true, now)
        .await
        .unwrap();
    assert_eq!((p.score, p.completed), (20, false));

    let p = f
        .repo
        .record_short_answer(f.user, f.q2, now + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!((p.score, p.completed), (35, true));
    assert_eq!(p.last_update, now + Duration::minutes(1));

    let stored = f.repo.get_progress(f.user, f.lesson).await.unwrap().unwrap();
    assert!(stored.same_totals(&p));

    let mcq_rows = f.repo.mcq_answers(f.user, f.lesson).await.unwrap();
    assert_eq!(mcq_rows.len(), 1);
    assert_eq!(mcq_rows[0].choice, McqOption::C);
    assert!(mcq_rows[0].is_correct);

    let completed = f.repo.completed_lesson_counts().await.unwrap();
    assert_eq!(completed.get(&f.user), Some(&1));
    let max = f.repo.lesson_max_scores().await.unwrap();
    assert_eq!(max.get(&f.lesson), Some(&35));
}

#[tokio::test]
async fn repeated_short_answer_keeps_one_row_and_first_timestamp() {
    let f = fixture("memdb_idempotent").await;
    let first = fixed_now();

    f.repo.record_short_answer(f.user, f.q1, first).await.unwrap();
    let p = f
        .repo
        .record_short_answer(f.user, f.q1, first + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(p.score, 10);

    let rows = f.repo.short_answers(f.user, f.lesson).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].answered_at, first);
}

#[tokio::test]
async fn reconciling_an_unchanged_ledger_rewrites_the_same_row() {
    let f = fixture("memdb_reconcile_twice").await;
    let now = fixed_now();
    f.repo.record_short_answer(f.user, f.q1, now).await.unwrap();
    f.repo
        .record_mcq_answer(f.user, f.mcq, McqOption::C, true, now)
        .await
        .unwrap();

    let first = f.repo.reconcile(f.user, f.lesson, now).await.unwrap();
    let second = f.repo.reconcile(f.user, f.lesson, now).await.unwrap();
    assert_eq!(first, second);
    assert_eq!((second.score, second.completed), (20, false));
    assert_eq!(second.last_update, now);
    assert_eq!(
        f.repo.get_progress(f.user, f.lesson).await.unwrap(),
        Some(second)
    );
}

#[tokio::test]
async fn failed_progress_upsert_rolls_back_the_ledger_write() {
    let f = fixture("memdb_rollback").await;
    sqlx::query(
        r"
        CREATE TRIGGER reject_progress BEFORE INSERT ON progress
        BEGIN
            SELECT RAISE(ABORT, 'progress rejected');
        END
        ",
    )
    .execute(f.repo.pool())
    .await
    .unwrap();

    assert!(f.repo.record_short_answer(f.user, f.q1, fixed_now()).await.is_err());
    assert!(
        f.repo
            .record_mcq_answer(f.user, f.mcq, McqOption::C, true, fixed_now())
            .await
            .is_err()
    );

    assert!(f.repo.short_answers(f.user, f.lesson).await.unwrap().is_empty());
    assert!(f.repo.mcq_answers(f.user, f.lesson).await.unwrap().is_empty());
    assert!(f.repo.get_progress(f.user, f.lesson).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_on_a_file_database_all_land() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("pylearn.sqlite3").display()
    );
    let f = fixture_at(&url).await;
    let now = fixed_now();

    let mut mcqs = vec![f.mcq];
    for i in 0..7 {
        let mcq = f
            .repo
            .insert_mcq(
                NewMultipleChoiceQuestion::new(
                    f.lesson,
                    &format!("Extra {i}?"),
                    ["a", "b", "c", "d"],
                    McqOption::A,
                    Some(5),
                )
                .unwrap(),
            )
            .await
            .unwrap();
        mcqs.push(mcq.id);
    }

    let mut handles = Vec::new();
    for round in 0..10 {
        for &mcq in &mcqs {
            let repo = f.repo.clone();
            let user = f.user;
            handles.push(tokio::spawn(async move {
                repo.record_mcq_answer(user, mcq, McqOption::B, round % 2 == 0, now)
                    .await
            }));
        }
        handles.push(tokio::spawn({
            let repo = f.repo.clone();
            let (user, q1) = (f.user, f.q1);
            async move { repo.record_short_answer(user, q1, now).await }
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let answers = f.repo.mcq_answers(f.user, f.lesson).await.unwrap();
    assert_eq!(answers.len(), mcqs.len());
    assert_eq!(f.repo.short_answers(f.user, f.lesson).await.unwrap().len(), 1);

    let stored = f.repo.get_progress(f.user, f.lesson).await.unwrap().unwrap();
    let recomputed = f.repo.reconcile(f.user, f.lesson, now).await.unwrap();
    assert_eq!(stored, recomputed);
}

#[tokio::test]
async fn answering_right_then_wrong_drops_mcq_points() {
    let f = fixture("memdb_flip").await;
    let now = fixed_now();

    f.repo
        .record_mcq_answer(f.user, f.mcq, McqOption::C, true, now)
        .await
        .unwrap();
    let p = f
        .repo
        .record_mcq_answer(f.user, f.mcq, McqOption::B, false, now)
        .await
        .unwrap();
    assert_eq!(p.score, 0);
    assert!(!p.completed);
}

#[tokio::test]
async fn unknown_user_or_question_writes_nothing() {
    let f = fixture("memdb_missing").await;
    let ghost = UserId::new(404);

    let err = f
        .repo
        .record_short_answer(ghost, f.q1, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let err = f
        .repo
        .record_mcq_answer(f.user, McqId::new(404), McqOption::A, false, fixed_now())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    assert!(f.repo.short_answers(ghost, f.lesson).await.unwrap().is_empty());
    assert!(f.repo.get_progress(f.user, f.lesson).await.unwrap().is_none());
}

#[tokio::test]
async fn adding_a_question_reopens_a_completed_lesson() {
    let f = fixture("memdb_reopen").await;
    let now = fixed_now();
    f.repo.record_short_answer(f.user, f.q1, now).await.unwrap();
    f.repo.record_short_answer(f.user, f.q2, now).await.unwrap();
    let p = f
        .repo
        .record_mcq_answer(f.user, f.mcq, McqOption::C, true, now)
        .await
        .unwrap();
    assert!(p.completed);

    f.repo
        .insert_question(NewQuestion::new(f.lesson, "Def keyword?", "def", None).unwrap())
        .await
        .unwrap();
    let refreshed = f.repo.reconcile_lesson(f.lesson, now).await.unwrap();
    assert_eq!(refreshed.len(), 1);
    assert_eq!(refreshed[0].score, 35);
    assert!(!refreshed[0].completed);

    f.repo.delete_question(f.q2).await.unwrap();
    let p = f.repo.reconcile(f.user, f.lesson, now).await.unwrap();
    assert_eq!(p.score, 20);
}

#[tokio::test]
async fn deletes_cascade_through_ledger_and_progress() {
    let f = fixture("memdb_cascade").await;
    f.repo
        .record_short_answer(f.user, f.q1, fixed_now())
        .await
        .unwrap();

    f.repo.delete_module(f.module).await.unwrap();

    assert!(f.repo.get_lesson(f.lesson).await.unwrap().is_none());
    assert!(f.repo.get_question(f.q1).await.unwrap().is_none());
    assert!(f.repo.list_progress(f.user).await.unwrap().is_empty());
    assert!(matches!(
        f.repo.delete_module(f.module).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn emails_are_unique_and_profile_updates_persist() {
    let f = fixture("memdb_users").await;

    let err = f
        .repo
        .insert_user(NewUser::new("Other", "ANA@example.com", "h", false).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let user = f.repo.get_user(f.user).await.unwrap().unwrap();
    let renamed = user.with_profile("Ana Maria", "ana.m@example.com").unwrap();
    f.repo.update_user(&renamed).await.unwrap();

    let found = f
        .repo
        .find_user_by_email("ana.m@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name(), "Ana Maria");
    assert_eq!(found.password_hash(), "stored-hash");
}

#[tokio::test]
async fn contact_inbox_orders_unread_first() {
    let f = fixture("memdb_inbox").await;
    let t0 = fixed_now();

    let older = f
        .repo
        .insert_message(NewContactMessage::new("A", "a@x.io", None, "first", t0).unwrap())
        .await
        .unwrap();
    let newer = f
        .repo
        .insert_message(
            NewContactMessage::new("B", "b@x.io", Some("Hi"), "second", t0 + Duration::hours(1))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(f.repo.toggle_read(newer.id).await.unwrap());
    let inbox = f.repo.list_messages().await.unwrap();
    assert_eq!(inbox[0].id, older.id);
    assert_eq!(inbox[1].id, newer.id);
    assert_eq!(f.repo.unread_count().await.unwrap(), 1);

    assert!(!f.repo.toggle_read(newer.id).await.unwrap());
    f.repo.delete_message(older.id).await.unwrap();
    assert_eq!(f.repo.list_messages().await.unwrap().len(), 1);
}
