#![allow(dead_code)]

use std::{collections::HashMap, fmt, fs::File, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::extract::ws::Message;
use cucumber::{given, then, when, World as _};
use flowroute::{
    auth,
    config::AppConfig,
    db::init_pool,
    error::AppError,
    models::{
        trip::{NewTrip, ParticipantRef, Trip, TripStatus, VehicleType},
        user::User,
    },
    realtime::{Broadcaster, ConnectionId, TripRegistry},
    services::{mailer::MailerService, storage::StorageService},
    state::AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;

#[derive(Debug, cucumber::World, Default)]
struct AppWorld {
    state: Option<TestState>,
    registered_user: Option<User>,
    last_registration: Option<Result<User, AppError>>,
    issued_token: Option<String>,
    created_trips: Vec<Trip>,
    clients: HashMap<String, TestClient>,
}

#[derive(Debug)]
struct TestClient {
    id: ConnectionId,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl AppWorld {
    fn app_state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("state must be initialised first")
            .app()
    }

    fn last_trip(&self) -> &Trip {
        self.created_trips.last().expect("a trip must exist")
    }

    fn drain_client(&mut self, name: &str) -> Vec<(String, Value)> {
        let client = self
            .clients
            .get_mut(name)
            .unwrap_or_else(|| panic!("unknown client {name}"));
        let mut events = Vec::new();
        while let Ok(message) = client.rx.try_recv() {
            let Message::Text(text) = message else {
                panic!("expected text frame");
            };
            let value: Value = serde_json::from_str(&text).expect("valid event json");
            events.push((
                value["event"].as_str().expect("event name").to_string(),
                value["data"].clone(),
            ));
        }
        events
    }
}

struct TestState {
    app: AppState,
    _root: TempDir,
}

impl fmt::Debug for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestState").finish()
    }
}

impl TestState {
    async fn new() -> anyhow::Result<Self> {
        let root = TempDir::new().context("create temp dir for bdd world")?;
        let avatar_root = root.path().join("avatars");
        std::fs::create_dir_all(&avatar_root)?;

        let db_path = root.path().join("bdd.sqlite");
        File::create(&db_path)?;
        let database_url = format!("sqlite://{}", db_path.to_string_lossy());

        let config = AppConfig {
            database_url: database_url.clone(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            avatar_root: avatar_root.clone(),
            public_url: "http://localhost:3000".into(),
            cookie_secret: "bdd-cookie-secret".into(),
        };

        let db = init_pool(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&db).await?;

        let storage = StorageService::new(config.avatar_root.clone());
        storage.ensure_structure().await?;

        let app = AppState::new(
            config,
            db,
            storage,
            MailerService::new(),
            Arc::new(TripRegistry::new()),
            Arc::new(Broadcaster::new()),
        );
        Ok(Self { app, _root: root })
    }

    fn app(&self) -> &AppState {
        &self.app
    }
}

#[given("a fresh application state")]
async fn given_fresh_state(world: &mut AppWorld) {
    world.state = Some(TestState::new().await.expect("state"));
    world.registered_user = None;
    world.last_registration = None;
    world.issued_token = None;
    world.created_trips.clear();
    world.clients.clear();
}

#[given(
    regex = r#"^a registered user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn given_registered_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    let created = auth::register_user(world.app_state(), &username, &email, &password)
        .await
        .expect("register user");
    world.registered_user = Some(created);
}

#[when(
    regex = r#"^I register a user \"([^\"]+)\" with email \"([^\"]+)\" and password \"([^\"]+)\"$"#
)]
async fn when_register_user(
    world: &mut AppWorld,
    username: String,
    email: String,
    password: String,
) {
    let result = auth::register_user(world.app_state(), &username, &email, &password).await;
    if let Ok(user) = &result {
        world.registered_user = Some(user.clone());
    }
    world.last_registration = Some(result);
}

#[then(regex = r#"^I can authenticate as \"([^\"]+)\" using password \"([^\"]+)\"$"#)]
async fn then_can_authenticate(world: &mut AppWorld, email: String, password: String) {
    let authed = auth::authenticate_user(world.app_state(), &email, &password)
        .await
        .expect("authentication");
    assert_eq!(authed.email, email);
}

#[then(regex = r#"^authentication fails for \"([^\"]+)\" with password \"([^\"]+)\"$"#)]
async fn then_authentication_fails(world: &mut AppWorld, email: String, password: String) {
    let result = auth::authenticate_user(world.app_state(), &email, &password).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[then("registration is rejected with a conflict")]
async fn then_registration_conflict(world: &mut AppWorld) {
    assert!(matches!(
        &world.last_registration,
        Some(Err(AppError::Conflict(_)))
    ));
}

#[when(regex = r#"^I request a password reset for \"([^\"]+)\"$"#)]
async fn when_request_reset(world: &mut AppWorld, email: String) {
    let token = auth::issue_reset_token(world.app_state(), &email)
        .await
        .expect("issue reset token")
        .expect("email must be registered");
    world.issued_token = Some(token.token);
}

#[when(regex = r#"^I reset the password using the issued token to \"([^\"]+)\"$"#)]
async fn when_reset_password(world: &mut AppWorld, password: String) {
    let token = world.issued_token.clone().expect("a token must be issued");
    auth::reset_password(world.app_state(), &token, &password)
        .await
        .expect("reset password");
}

#[then("the reset token can no longer be used")]
async fn then_token_consumed(world: &mut AppWorld) {
    let token = world.issued_token.clone().expect("a token must be issued");
    let result = auth::find_valid_reset_token(world.app_state(), &token).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[given(regex = r#"^a connected websocket client \"([^\"]+)\"$"#)]
async fn given_connected_client(world: &mut AppWorld, name: String) {
    let (tx, rx) = mpsc::unbounded_channel();
    let id = world.app_state().broadcaster.connect(tx).await;
    world.clients.insert(name, TestClient { id, rx });
}

#[when(
    regex = r#"^\"([^\"]+)\" creates a 4-wheeler trip from \"([^\"]+)\" to \"([^\"]+)\" on \"([^\"]+)\" at \"([^\"]+)\" with (\d+) seats costing (\d+) per person$"#
)]
async fn when_create_trip(
    world: &mut AppWorld,
    _username: String,
    from: String,
    to: String,
    date: String,
    time: String,
    seats: u32,
    cost: u32,
) {
    let user = world
        .registered_user
        .clone()
        .expect("user must exist before creating trips");
    let input = NewTrip {
        vehicle_type: VehicleType::FourWheeler,
        from,
        to,
        date,
        time,
        seats,
        cost_per_person: f64::from(cost),
    };
    let driver = ParticipantRef {
        id: user.uuid,
        name: user.name,
        avatar: user.avatar,
    };

    let state = world.app_state();
    let trip = state.registry.create(input, driver).await;
    state.broadcaster.broadcast_trip_created(&trip).await;
    world.created_trips.push(trip);
}

#[then("the created trip is active with no passengers and a fresh id")]
async fn then_trip_lifecycle_fields(world: &mut AppWorld) {
    let trip = world.last_trip();
    assert!(!trip.id.is_empty());
    assert_eq!(trip.status, TripStatus::Active);
    assert!(trip.passengers.is_empty());
    assert!(trip.created_at <= chrono::Utc::now());
}

#[then(regex = r#"^client \"([^\"]+)\" received exactly one \"tripCreated\" event for the created trip$"#)]
async fn then_client_received_trip(world: &mut AppWorld, name: String) {
    let expected = serde_json::to_value(world.last_trip()).expect("serialize trip");
    let events = world.drain_client(&name);
    let trip_events: Vec<_> = events
        .into_iter()
        .filter(|(event, _)| event == "tripCreated")
        .collect();
    assert_eq!(trip_events.len(), 1, "expected exactly one tripCreated");
    assert_eq!(trip_events[0].1, expected);
}

#[then(regex = r"^listing trips returns (\d+) trips in creation order$")]
async fn then_listing_in_order(world: &mut AppWorld, expected: usize) {
    let listed = world.app_state().registry.list().await;
    assert_eq!(listed.len(), expected);
    let listed_ids: Vec<&str> = listed.iter().map(|t| t.id.as_str()).collect();
    let created_ids: Vec<&str> = world.created_trips.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(listed_ids, created_ids);
}

#[then("fetching an unknown trip id yields not found")]
async fn then_unknown_trip_not_found(world: &mut AppWorld) {
    let result = world.app_state().registry.get("no-such-trip").await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[when(regex = r#"^client \"([^\"]+)\" joins the created trip's room$"#)]
async fn when_join_room(world: &mut AppWorld, name: String) {
    let trip_id = world.last_trip().id.clone();
    let client_id = world.clients.get(&name).expect("unknown client").id;
    world
        .app_state()
        .broadcaster
        .join_room(client_id, &trip_id)
        .await;
}

#[when(regex = r#"^a \"([^\"]+)\" event is emitted to the created trip's room$"#)]
async fn when_emit_to_room(world: &mut AppWorld, event: String) {
    let trip_id = world.last_trip().id.clone();
    world
        .app_state()
        .broadcaster
        .emit_to_room(&trip_id, &event, &serde_json::json!({ "lat": 1.5, "lng": 2.5 }))
        .await;
}

#[then(regex = r#"^client \"([^\"]+)\" received a \"([^\"]+)\" room event$"#)]
async fn then_client_received_room_event(world: &mut AppWorld, name: String, event: String) {
    let events = world.drain_client(&name);
    let count = events.iter().filter(|(e, _)| *e == event).count();
    assert_eq!(count, 1, "expected exactly one {event} event");
}

#[then(regex = r#"^client \"([^\"]+)\" received no \"([^\"]+)\" event$"#)]
async fn then_client_received_no_event(world: &mut AppWorld, name: String, event: String) {
    let events = world.drain_client(&name);
    assert!(
        events.iter().all(|(e, _)| *e != event),
        "client {name} unexpectedly received {event}"
    );
}

#[tokio::main]
async fn main() {
    AppWorld::cucumber()
        .fail_on_skipped()
        .with_default_cli()
        .run("tests/features")
        .await;
}
