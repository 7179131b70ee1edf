//! Shared fixtures for devlog-core integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use devlog_core::{
    Caller, DevLog, LogFields, MailError, MailMessage, Mailer, RegisterInput, ReviewCommand,
};
use devlog_db::entities::team;
use sea_orm::DatabaseConnection;

/// Mailer that keeps every message instead of sending it
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Mailer whose SMTP server is always down
#[derive(Default)]
pub struct FailingMailer {
    attempts: AtomicUsize,
}

impl FailingMailer {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(MailError::Transport(format!(
            "connection refused while sending to {}",
            message.to
        )))
    }
}

pub struct TestApp {
    pub devlog: DevLog,
    pub mailer: Arc<RecordingMailer>,
    pub db: DatabaseConnection,
}

async fn create_test_db() -> DatabaseConnection {
    let db = devlog_db::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");
    devlog_db::migrate(&db)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn setup() -> TestApp {
    let db = create_test_db().await;
    let mailer = Arc::new(RecordingMailer::default());
    let devlog = DevLog::new(db.clone(), mailer.clone(), "http://localhost:3000");

    TestApp { devlog, mailer, db }
}

/// App whose every email send fails; `TestApp::mailer` stays empty
pub async fn setup_with_failing_mail() -> (TestApp, Arc<FailingMailer>) {
    let db = create_test_db().await;
    let failing = Arc::new(FailingMailer::default());
    let devlog = DevLog::new(db.clone(), failing.clone(), "http://localhost:3000");

    let app = TestApp {
        devlog,
        mailer: Arc::new(RecordingMailer::default()),
        db,
    };
    (app, failing)
}

impl TestApp {
    pub async fn manager(&self, email: &str, full_name: &str) -> (Caller, team::Model) {
        let registration = RegisterInput {
            email: email.to_string(),
            password: "password1".to_string(),
            confirm_password: "password1".to_string(),
            full_name: full_name.to_string(),
            role: "manager".to_string(),
            ..Default::default()
        }
        .validate()
        .expect("valid manager registration");

        let (user, team) = self
            .devlog
            .users
            .register(registration)
            .await
            .expect("manager registration");
        (Caller::from(user), team.expect("manager gets a team"))
    }

    pub async fn developer(&self, email: &str, full_name: &str, code: Option<&str>) -> Caller {
        let registration = RegisterInput {
            email: email.to_string(),
            password: "password1".to_string(),
            confirm_password: "password1".to_string(),
            full_name: full_name.to_string(),
            role: "developer".to_string(),
            team_code: code.map(str::to_string),
            ..Default::default()
        }
        .validate()
        .expect("valid developer registration");

        let (user, _) = self
            .devlog
            .users
            .register(registration)
            .await
            .expect("developer registration");
        Caller::from(user)
    }

    /// Re-read the caller after membership changes
    pub async fn refresh(&self, caller: &Caller) -> Caller {
        self.devlog
            .users
            .resolve_caller(caller.id)
            .await
            .expect("caller still exists")
    }
}

pub fn fields(date: &str) -> LogFields {
    LogFields {
        date: date.to_string(),
        tasks: "Implemented the thing".to_string(),
        hours: 3,
        minutes: 30,
        mood: 4,
        blockers: None,
    }
}

pub fn approve(feedback: &str) -> ReviewCommand {
    ReviewCommand {
        feedback: feedback.to_string(),
        mark_reviewed: true,
    }
}

pub fn draft(feedback: &str) -> ReviewCommand {
    ReviewCommand {
        feedback: feedback.to_string(),
        mark_reviewed: false,
    }
}
