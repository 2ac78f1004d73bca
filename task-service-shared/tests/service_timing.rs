/// Integration tests checking that service operations are timed
///
/// A capturing `tracing` layer records each event's level, message and
/// fields while a service call runs over the in-memory store.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use task_service_shared::password::{PasswordConfig, PasswordHasher};
use task_service_shared::repository::MemoryStore;
use task_service_shared::services::{ServiceError, TaskService, UserService};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

#[derive(Debug, Clone)]
struct Captured {
    level: Level,
    message: String,
    fields: String,
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<Captured>>>);

impl Capture {
    fn find(&self, level: Level, needle: &str) -> Option<Captured> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.level == level && e.message.contains(needle))
            .cloned()
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.0.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: String,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields.push_str(&format!("{}={:?} ", field.name(), value));
        }
    }
}

fn capture() -> (Capture, tracing::subscriber::DefaultGuard) {
    let capture = Capture::default();
    let guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
    (capture, guard)
}

#[tokio::test]
async fn test_failed_task_operation_logs_warning_with_error() {
    let (capture, _guard) = capture();
    let store = Arc::new(MemoryStore::new());
    let service = TaskService::new(store.clone(), store);

    let result = service.soft_delete_task(4242).await;
    assert!(matches!(result, Err(ServiceError::EntityNotFound { entity: "Task", id: 4242 })));

    let event = capture
        .find(Level::WARN, "Method TaskService.soft_delete_task failed after")
        .expect("timing warning for soft_delete_task");
    assert!(event.fields.contains("Task with id 4242 not found"));
}

#[tokio::test]
async fn test_successful_user_operation_logs_timing() {
    let (capture, _guard) = capture();
    let store = Arc::new(MemoryStore::new());
    let hasher = PasswordHasher::new(&PasswordConfig {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap();
    let service = UserService::new(store.clone(), store, hasher);

    assert!(service.find_by_username("nobody").await.unwrap().is_empty());
    assert!(capture
        .find(Level::INFO, "Method UserService.find_by_username executed in")
        .is_some());

    let missing = service
        .assign_roles("nobody", &BTreeSet::from(["ROLE_USER".to_string()]))
        .await;
    assert!(matches!(missing, Err(ServiceError::UserNotFound(_))));

    let event = capture
        .find(Level::WARN, "Method UserService.assign_roles failed after")
        .expect("timing warning for assign_roles");
    assert!(event.fields.contains("User not found: nobody"));
}
