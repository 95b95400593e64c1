pub mod auth;

pub mod tasks;

pub mod submissions;

pub mod notifications;

pub mod users;

pub use auth::configure_auth_routes;
pub use notifications::configure_notifications_routes;
pub use submissions::configure_submissions_routes;
pub use tasks::configure_tasks_routes;
pub use users::configure_users_routes;
