use axum::{
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
};
use classroom_collab::{CollabEvent, EventReceiver, PrimaryKey, Role, Status};
use futures_util::Stream;
use log::{info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    task::{Context, Poll, Waker},
    thread,
};
use utoipa::ToSchema;

use crate::{auth::Session, context::ServerContext, Router};

type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// A user logged in or registered
    #[serde(rename_all = "camelCase")]
    SessionStarted {
        user_id: PrimaryKey,
        #[schema(value_type = String)]
        role: Role,
    },
    /// A user logged out
    #[serde(rename_all = "camelCase")]
    SessionEnded { user_id: PrimaryKey },
    /// An admin activated or deactivated a user
    #[serde(rename_all = "camelCase")]
    UserStatusChanged {
        user_id: PrimaryKey,
        #[schema(value_type = String)]
        status: Status,
    },
    #[serde(rename_all = "camelCase")]
    UserDeleted { user_id: PrimaryKey },
    /// A course was activated or deactivated
    #[serde(rename_all = "camelCase")]
    CourseStatusChanged {
        course_id: PrimaryKey,
        #[schema(value_type = String)]
        status: Status,
    },
    #[serde(rename_all = "camelCase")]
    CourseDeleted { course_id: PrimaryKey },
    #[serde(rename_all = "camelCase")]
    Enrolled {
        student_id: PrimaryKey,
        course_id: PrimaryKey,
    },
    #[serde(rename_all = "camelCase")]
    LessonCompleted {
        student_id: PrimaryKey,
        course_id: PrimaryKey,
        lesson_id: PrimaryKey,
        /// The new completion percentage of the course
        progress_percentage: f64,
    },
    #[serde(rename_all = "camelCase")]
    SubmissionReceived {
        assignment_id: PrimaryKey,
        student_id: PrimaryKey,
    },
    #[serde(rename_all = "camelCase")]
    SubmissionGraded {
        submission_id: PrimaryKey,
        student_id: PrimaryKey,
    },
}

impl From<CollabEvent> for ServerEvent {
    fn from(value: CollabEvent) -> Self {
        match value {
            CollabEvent::SessionStarted { user_id, role } => {
                Self::SessionStarted { user_id, role }
            }
            CollabEvent::SessionEnded { user_id } => Self::SessionEnded { user_id },
            CollabEvent::UserStatusChanged { user_id, status } => {
                Self::UserStatusChanged { user_id, status }
            }
            CollabEvent::UserDeleted { user_id } => Self::UserDeleted { user_id },
            CollabEvent::CourseStatusChanged { course_id, status } => {
                Self::CourseStatusChanged { course_id, status }
            }
            CollabEvent::CourseDeleted { course_id } => Self::CourseDeleted { course_id },
            CollabEvent::Enrolled {
                student_id,
                course_id,
            } => Self::Enrolled {
                student_id,
                course_id,
            },
            CollabEvent::LessonCompleted {
                student_id,
                course_id,
                lesson_id,
                progress_percentage,
            } => Self::LessonCompleted {
                student_id,
                course_id,
                lesson_id,
                progress_percentage,
            },
            CollabEvent::SubmissionReceived {
                assignment_id,
                student_id,
            } => Self::SubmissionReceived {
                assignment_id,
                student_id,
            },
            CollabEvent::SubmissionGraded {
                submission_id,
                student_id,
            } => Self::SubmissionGraded {
                submission_id,
                student_id,
            },
        }
    }
}

/// Events waiting for a client, and the task to wake once there are some
#[derive(Default)]
struct Outbox {
    events: VecDeque<ServerEvent>,
    waker: Option<Waker>,
}

type SharedOutbox = Arc<Mutex<Outbox>>;

/// Fans events out to every connected SSE client
pub struct ServerSentEvents {
    me: Weak<Self>,
    outboxes: Mutex<HashMap<ConnectionId, SharedOutbox>>,
}

/// The stream half of a connection. Dropping it disconnects the client.
pub struct ConnectionHandle {
    id: ConnectionId,
    outbox: SharedOutbox,
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            outboxes: Default::default(),
        })
    }

    pub fn broadcast(&self, event: ServerEvent) {
        for outbox in self.outboxes.lock().values() {
            let mut outbox = outbox.lock();
            outbox.events.push_back(event.clone());

            if let Some(waker) = outbox.waker.take() {
                waker.wake()
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.outboxes.lock().len()
    }

    fn connect(&self) -> ConnectionHandle {
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let outbox = SharedOutbox::default();

        self.outboxes.lock().insert(id, outbox.clone());

        ConnectionHandle {
            id,
            outbox,
            manager: self.me.clone(),
        }
    }

    fn disconnect(&self, id: ConnectionId) {
        self.outboxes.lock().remove(&id);
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut outbox = self.outbox.lock();

        while let Some(event) = outbox.events.pop_front() {
            match Event::default().json_data(&event) {
                Ok(event) => return Poll::Ready(Some(Ok(event))),
                Err(e) => warn!("Dropped an event that could not be serialized: {}", e),
            }
        }

        outbox.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

/// Logs every collab event and broadcasts it to connected clients, until the collab system is gone
pub fn forward_events(events: EventReceiver, sse: Arc<ServerSentEvents>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in events.iter() {
            info!("{:?}", event);
            sse.broadcast(event.into());
        }
    })
}

#[utoipa::path(
    get,
    path = "/v1/events",
    tag = "events",
    params(
        ("token" = Option<String>, Query, description = "Session token, for clients that can't set headers")
    ),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "A stream of events from the classroom",
            body = ServerEvent
        )
    )
)]
async fn event_stream(_session: Session, context: ServerContext) -> Sse<ConnectionHandle> {
    Sse::new(context.sse.connect()).keep_alive(KeepAlive::default())
}

pub fn router() -> Router {
    Router::new().route("/", get(event_stream))
}

#[cfg(test)]
mod test {
    use classroom_collab::{CollabEvent, Status};
    use futures_util::StreamExt;

    use super::{ServerEvent, ServerSentEvents};

    #[tokio::test]
    async fn delivers_in_order_and_disconnects_on_drop() {
        let sse = ServerSentEvents::new();
        let mut handle = sse.connect();

        sse.broadcast(ServerEvent::CourseDeleted { course_id: 1 });
        sse.broadcast(ServerEvent::CourseDeleted { course_id: 2 });

        assert!(handle.next().await.is_some());
        assert!(handle.next().await.is_some());
        assert!(handle.outbox.lock().events.is_empty());

        assert_eq!(sse.connection_count(), 1);
        drop(handle);
        assert_eq!(sse.connection_count(), 0);
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = ServerEvent::from(CollabEvent::CourseStatusChanged {
            course_id: 4,
            status: Status::Inactive,
        });

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "course-status-changed");
        assert_eq!(json["courseId"], 4);
        assert_eq!(json["status"], "inactive");
    }
}
