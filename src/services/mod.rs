pub mod auth;
pub mod notifications;
pub mod submissions;
pub mod tasks;
pub mod users;

pub use auth::AuthService;
pub use notifications::NotificationService;
pub use submissions::SubmissionService;
pub use tasks::TaskService;
pub use users::UserService;
