//! 预导入模块，方便使用

pub use super::notifications::{
    ActiveModel as NotificationActiveModel, Entity as Notifications, Model as NotificationModel,
};
pub use super::submission_files::{
    ActiveModel as SubmissionFileActiveModel, Entity as SubmissionFiles,
    Model as SubmissionFileModel,
};
pub use super::submissions::{
    ActiveModel as SubmissionActiveModel, Entity as Submissions, Model as SubmissionModel,
};
pub use super::task_files::{
    ActiveModel as TaskFileActiveModel, Entity as TaskFiles, Model as TaskFileModel,
};
pub use super::tasks::{ActiveModel as TaskActiveModel, Entity as Tasks, Model as TaskModel};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
