//! Shared setup for the integration tests.
//!
//! Every test gets a fresh `MemoryStore` seeded with two users and three tasks:
//! user one owns `task_one` (open) and `task_two` (completed), user two owns
//! `task_three`. Each seeded user holds exactly one active token.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::{body::MessageBody, test, web, App};
use async_trait::async_trait;
use uuid::Uuid;

use taskmanager::auth::{generate_token, hash_password, AuthSettings};
use taskmanager::email::{EmailMessage, MailError, Mailer};
use taskmanager::models::{CreateTaskRequest, SignupRequest, Task, User};
use taskmanager::routes::{self, health};
use taskmanager::store::{MemoryStore, Store};
use taskmanager::AppState;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Keeps every message it is asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

impl RecordingMailer {
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

/// Fails every delivery.
pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _message: EmailMessage) -> Result<(), MailError> {
        Err(MailError::Transport("provider unreachable".into()))
    }
}

pub struct SeededUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub token: String,
}

impl SeededUser {
    pub fn bearer(&self) -> (String, String) {
        bearer(&self.token)
    }
}

pub fn bearer(token: &str) -> (String, String) {
    ("Authorization".to_string(), format!("Bearer {}", token))
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub state: web::Data<AppState>,
    pub user_one: SeededUser,
    pub user_two: SeededUser,
    pub task_one: Task,
    pub task_two: Task,
    pub task_three: Task,
}

pub fn settings() -> AuthSettings {
    AuthSettings {
        jwt_secret: TEST_SECRET.to_string(),
        token_ttl_hours: 1,
        // bcrypt's minimum cost keeps the suite fast.
        bcrypt_cost: 4,
    }
}

async fn seed_user(store: &MemoryStore, name: &str, email: &str, password: &str) -> SeededUser {
    let settings = settings();
    let mut user = User::new(
        SignupRequest {
            name: name.to_string(),
            age: 0,
            email: email.to_string(),
            password: password.to_string(),
        },
        hash_password(password, settings.bcrypt_cost).unwrap(),
    );
    let token = generate_token(user.id, &settings).unwrap();
    user.tokens.push(token.clone());
    store.insert_user(&user).await.unwrap();

    SeededUser {
        id: user.id,
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        token,
    }
}

async fn seed_task(store: &MemoryStore, owner: Uuid, description: &str, completed: bool) -> Task {
    let task = Task::new(
        CreateTaskRequest {
            description: description.to_string(),
            completed,
        },
        owner,
    );
    store.insert_task(&task).await.unwrap();
    task
}

pub async fn setup() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());

    let user_one = seed_user(&store, "Bob Belcher", "bob@bobsburgers.com", "burgerOfTheDay").await;
    let user_two = seed_user(&store, "Linda Belcher", "linda@bobsburgers.com", "ilovetosinglala").await;
    let task_one = seed_task(&store, user_one.id, "First test task", false).await;
    let task_two = seed_task(&store, user_one.id, "Second test task", true).await;
    let task_three = seed_task(&store, user_two.id, "Third test task", false).await;

    let state = web::Data::new(AppState::new(store.clone(), mailer.clone(), settings()));

    Fixture {
        store,
        mailer,
        state,
        user_one,
        user_two,
        task_one,
        task_two,
        task_three,
    }
}

/// Builds the same application `main` serves, minus CORS.
pub async fn init_app(
    state: web::Data<AppState>,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(state)
            .wrap(Logger::default())
            .service(health::health)
            .configure(routes::config),
    )
    .await
}

/// Gives fire-and-forget tasks spawned by a handler a chance to run.
pub async fn settle() {
    actix_rt::time::sleep(Duration::from_millis(50)).await;
}

pub async fn stored_user(store: &MemoryStore, id: Uuid) -> Option<User> {
    store.find_user(id).await.unwrap()
}
