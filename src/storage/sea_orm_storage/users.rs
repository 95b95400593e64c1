use super::SeaOrmStorage;
use crate::entity::users::{ActiveModel, Column, Entity as Users};
use crate::errors::{Result, TrackerError};
use crate::models::users::{
    entities::{User, UserRole, UserStatus},
    requests::CreateUserRequest,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};

impl SeaOrmStorage {
    /// 创建用户
    pub async fn create_user_impl(&self, req: CreateUserRequest) -> Result<User> {
        let now = chrono::Utc::now().timestamp();

        let model = ActiveModel {
            username: Set(req.username),
            password_hash: Set(req.password_hash),
            display_name: Set(req.display_name),
            role: Set(req.role.to_string()),
            status: Set(UserStatus::Active.to_string()),
            department: Set(req.department),
            year: Set(req.year),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = model
            .insert(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("创建用户失败: {e}")))?;

        Ok(result.into_user())
    }

    /// 通过 ID 获取用户
    pub async fn get_user_by_id_impl(&self, id: i64) -> Result<Option<User>> {
        let result = Users::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 通过用户名获取用户
    pub async fn get_user_by_username_impl(&self, username: &str) -> Result<Option<User>> {
        let result = Users::find()
            .filter(Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询用户失败: {e}")))?;

        Ok(result.map(|m| m.into_user()))
    }

    /// 用户总数
    pub async fn count_users_impl(&self) -> Result<u64> {
        Users::find()
            .count(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("统计用户失败: {e}")))
    }

    /// 学生名录
    ///
    /// 年级在数据库中过滤，院系比较与任务分配一致，去空白后不区分大小写。
    pub async fn list_students_impl(
        &self,
        department: Option<&str>,
        year: Option<i32>,
    ) -> Result<Vec<User>> {
        let mut query = Users::find().filter(Column::Role.eq(UserRole::Student.to_string()));
        if let Some(year) = year {
            query = query.filter(Column::Year.eq(year));
        }

        let models = query
            .order_by_asc(Column::Username)
            .all(&self.db)
            .await
            .map_err(|e| TrackerError::database_operation(format!("查询学生失败: {e}")))?;

        let department = department.map(str::trim).filter(|d| !d.is_empty());
        Ok(models
            .into_iter()
            .map(|m| m.into_user())
            .filter(|u| match department {
                Some(dept) => u
                    .department
                    .as_deref()
                    .is_some_and(|d| d.trim().eq_ignore_ascii_case(dept)),
                None => true,
            })
            .collect())
    }
}
