//! Notification domain: turns task events into per-member notification
//! records, a push broadcast to the project's group, and emails.

pub mod error;
pub mod fanout;
pub mod hub;
pub mod memory;
pub mod models;
pub mod providers;
pub mod repository;
pub mod sender;

pub use error::{NotificationError, NotificationResult};
pub use fanout::NotificationFanout;
pub use hub::{
    connect_for_user, project_group, InProcessHub, MockPushHub, PushEnvelope, PushHub,
    TASK_NOTIFICATION_EVENT,
};
pub use memory::InMemoryNotificationRepository;
pub use models::{Notification, NotificationContent};
pub use providers::{SmtpConfig, SmtpSender};
pub use repository::{MockNotificationRepository, NotificationRepository};
pub use sender::{EmailSender, MockEmailSender};
