use chrono::Duration;
use pylearn_core::model::McqOption;
use pylearn_core::time::fixed_clock;
use services::{
    AccountServiceError, AppServices, CatalogServiceError, McqInput, McqOutcome,
    ProgressServiceError, SessionContext, ShortAnswerOutcome,
};

async fn app_with_admin() -> (AppServices, SessionContext) {
    let app = AppServices::in_memory(fixed_clock(), Duration::hours(1));
    assert!(
        app.accounts()
            .ensure_admin("Admin", "admin@pylearn.local", "admin123")
            .await
            .unwrap()
    );
    let login = app
        .accounts()
        .login("ADMIN@pylearn.local", "admin123")
        .await
        .unwrap();
    assert!(login.session.is_admin);
    (app, login.session)
}

async fn learner(app: &AppServices, email: &str) -> SessionContext {
    app.accounts().register("Ana", email, "pw").await.unwrap();
    app.accounts().login(email, "pw").await.unwrap().session
}

#[tokio::test]
async fn learner_completes_a_lesson_and_sees_it_everywhere() {
    let (app, admin) = app_with_admin().await;
    let catalog = app.catalog();

    let module = catalog
        .create_module(&admin, "Python Basics", None)
        .await
        .unwrap();
    let lesson = catalog
        .create_lesson(&admin, module.id, "Output", "print(...)", None)
        .await
        .unwrap();
    let question = catalog
        .create_question(&admin, lesson.id, "Print keyword?", "print", Some(10))
        .await
        .unwrap();
    let mcq = catalog
        .create_mcq(
            &admin,
            lesson.id,
            McqInput {
                prompt: "Whole numbers?",
                options: ["str", "float", "int", "bool"],
                correct_option: "c",
                points: None,
            },
        )
        .await
        .unwrap();

    let ana = learner(&app, "ana@example.com").await;
    let answers = app.answers();

    let outcome = answers
        .submit_short_answer(&ana, question.id, "PRINT")
        .await
        .unwrap();
    assert!(matches!(outcome, ShortAnswerOutcome::Correct { .. }));
    let outcome = answers.submit_mcq_answer(&ana, mcq.id, "C").await.unwrap();
    assert!(matches!(outcome, McqOutcome::Correct { .. }));
    assert!(outcome.progress().completed);

    let overviews = app.progress().module_overviews(&ana).await.unwrap();
    assert_eq!(overviews.len(), 1);
    assert_eq!(overviews[0].total_score, 20);
    assert_eq!(overviews[0].max_score, 20);
    assert_eq!(overviews[0].completed_lessons, 1);

    let detail = app.progress().lesson_detail(&ana, lesson.id).await.unwrap();
    assert!(detail.questions[0].answered);
    assert_eq!(detail.mcqs[0].selected, Some(McqOption::C));
    assert!(detail.completed);

    let profile = app.progress().profile(&ana).await.unwrap();
    assert_eq!(profile.completed_lessons, 1);
    assert_eq!(profile.lessons[0].module_title, "Python Basics");

    let table = app.progress().users_progress(&admin).await.unwrap();
    let row = table.iter().find(|r| r.user.id() == ana.user_id).unwrap();
    assert_eq!(row.completed_lessons, 1);
    assert!((row.percent - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn question_changes_reconcile_existing_progress() {
    let (app, admin) = app_with_admin().await;
    let catalog = app.catalog();
    let module = catalog.create_module(&admin, "M", None).await.unwrap();
    let lesson = catalog
        .create_lesson(&admin, module.id, "L", "", None)
        .await
        .unwrap();
    let q1 = catalog
        .create_question(&admin, lesson.id, "1+1?", "2", Some(10))
        .await
        .unwrap();

    let ana = learner(&app, "ana@example.com").await;
    app.answers()
        .submit_short_answer(&ana, q1.id, "2")
        .await
        .unwrap();

    let q2 = catalog
        .create_question(&admin, lesson.id, "2+2?", "4", Some(15))
        .await
        .unwrap();
    let detail = app.progress().lesson_detail(&ana, lesson.id).await.unwrap();
    assert!(!detail.completed);
    assert_eq!(detail.max_score, 25);

    catalog.delete_question(&admin, q2.id).await.unwrap();
    let detail = app.progress().lesson_detail(&ana, lesson.id).await.unwrap();
    assert!(detail.completed);
    assert_eq!(detail.score, 10);
}

#[tokio::test]
async fn learners_cannot_reach_admin_operations() {
    let (app, _admin) = app_with_admin().await;
    let ana = learner(&app, "ana@example.com").await;

    assert!(matches!(
        app.catalog().create_module(&ana, "Sneaky", None).await,
        Err(CatalogServiceError::Forbidden(_))
    ));
    assert!(matches!(
        app.progress().users_progress(&ana).await,
        Err(ProgressServiceError::Forbidden(_))
    ));
    assert!(matches!(
        app.accounts().list_users(&ana).await,
        Err(AccountServiceError::Forbidden(_))
    ));
}

#[tokio::test]
async fn account_lifecycle() {
    let (app, admin) = app_with_admin().await;
    let accounts = app.accounts();
    let ana = learner(&app, "ana@example.com").await;

    assert!(matches!(
        accounts.register("Dup", "Ana@Example.com", "pw").await,
        Err(AccountServiceError::EmailTaken)
    ));
    assert!(matches!(
        accounts.login("ana@example.com", "nope").await,
        Err(AccountServiceError::InvalidCredentials)
    ));

    let updated = accounts
        .update_profile(&ana, "Ana Maria", "ana.m@example.com")
        .await
        .unwrap();
    assert_eq!(updated.email(), "ana.m@example.com");
    assert!(matches!(
        accounts
            .update_profile(&ana, "Ana", "admin@pylearn.local")
            .await,
        Err(AccountServiceError::EmailTaken)
    ));

    assert!(matches!(
        accounts.change_password(&ana, "wrong", "new").await,
        Err(AccountServiceError::InvalidCredentials)
    ));
    accounts.change_password(&ana, "pw", "new").await.unwrap();
    accounts.login("ana.m@example.com", "new").await.unwrap();

    accounts
        .reset_password("ana.m@example.com", "reset")
        .await
        .unwrap();
    accounts.login("ana.m@example.com", "reset").await.unwrap();

    assert!(matches!(
        accounts.delete_user(&admin, admin.user_id).await,
        Err(AccountServiceError::CannotDeleteSelf)
    ));
    accounts.delete_user(&admin, ana.user_id).await.unwrap();
    assert!(matches!(
        accounts.login("ana.m@example.com", "reset").await,
        Err(AccountServiceError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn contact_inbox_is_admin_only() {
    let (app, admin) = app_with_admin().await;
    let contacts = app.contacts();

    let msg = contacts
        .submit("Visitor", "v@x.io", None, "Hello")
        .await
        .unwrap();
    assert_eq!(msg.subject, "No subject");
    assert_eq!(contacts.unread_count(&admin).await.unwrap(), 1);
    assert!(contacts.toggle_read(&admin, msg.id).await.unwrap());
    assert_eq!(contacts.unread_count(&admin).await.unwrap(), 0);

    let ana = learner(&app, "ana@example.com").await;
    assert!(contacts.inbox(&ana).await.is_err());
    contacts.delete(&admin, msg.id).await.unwrap();
    assert!(contacts.inbox(&admin).await.unwrap().is_empty());
}
