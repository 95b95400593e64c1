use crate::blob_store::create_blob_store;
use crate::cache::{MokaCacheWrapper, ObjectCache};
use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::users::entities::UserRole;
use crate::models::users::requests::CreateUserRequest;
use crate::notifier::NotifierHandle;
use crate::services::submissions::UploadSettings;
use crate::services::{
    AuthService, NotificationService, SubmissionService, TaskService, UserService,
};
use crate::storage::{Storage, create_storage};
use crate::utils::SystemClock;
use crate::utils::password::hash_password;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub cache: Arc<dyn ObjectCache>,
    pub auth_service: Arc<AuthService>,
    pub task_service: Arc<TaskService>,
    pub submission_service: Arc<SubmissionService>,
    pub notification_service: Arc<NotificationService>,
    pub user_service: Arc<UserService>,
}

/// 生成随机密码
fn generate_random_password(length: usize) -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%";
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// 初始化默认管理员账号
/// 如果数据库中没有任何用户，则按配置创建一个管理员
async fn seed_admin(storage: &Arc<dyn Storage>) {
    let config = AppConfig::get();

    match storage.count_users().await {
        Ok(count) if count > 0 => {
            debug!(
                "Database already has {} user(s), skipping admin seed",
                count
            );
            return;
        }
        Ok(_) => {
            info!("No users found in database, creating default admin account...");
        }
        Err(e) => {
            warn!("Failed to count users: {}, skipping admin seed", e);
            return;
        }
    }

    // 优先使用配置（含 ADMIN_PASSWORD 覆盖），否则生成随机密码
    let password = if config.app.admin_password.is_empty() {
        let pwd = generate_random_password(16);
        warn!("==========================================================");
        warn!("  ADMIN PASSWORD NOT SET - USING GENERATED PASSWORD");
        warn!("  Generated admin password: {}", pwd);
        warn!("  Please save this password or set ADMIN_PASSWORD env var");
        warn!("==========================================================");
        pwd
    } else {
        config.app.admin_password.clone()
    };

    let password_hash = match hash_password(&password) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Failed to hash admin password: {}, skipping admin seed", e);
            return;
        }
    };

    let admin_request = CreateUserRequest {
        username: config.app.admin_username.clone(),
        password_hash,
        display_name: Some("Administrator".to_string()),
        role: UserRole::Admin,
        department: None,
        year: None,
    };

    match storage.create_user(admin_request).await {
        Ok(user) => {
            info!(
                "Default admin account created successfully (ID: {}, username: {})",
                user.id, user.username
            );
        }
        Err(e) => {
            warn!("Failed to create admin account: {}", e);
        }
    }
}

/// 准备服务器启动的上下文
/// 依次初始化存储（含迁移）、文件存储、缓存、通知器与各业务服务
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let config = AppConfig::get();

    let storage = create_storage(&config.database).await?;
    warn!("Storage backend initialized and migrations completed");

    seed_admin(&storage).await;

    let blobs = create_blob_store(&config.upload).await?;
    warn!("Blob store initialized: {}", blobs.backend_name());

    let cache: Arc<dyn ObjectCache> = Arc::new(MokaCacheWrapper::new(&config.cache));
    warn!("Moka (in-memory) cache backend initialized");

    let notifier = NotifierHandle::from_config(&config.notifier, storage.clone());
    if !notifier.is_enabled() {
        warn!("Submission notifications are disabled");
    }

    let submission_service = SubmissionService::new(
        storage.clone(),
        blobs.clone(),
        notifier,
        Arc::new(SystemClock),
        UploadSettings::from(&config.upload),
    );

    Ok(StartupContext {
        auth_service: Arc::new(AuthService::new(storage.clone())),
        task_service: Arc::new(TaskService::new(
            storage.clone(),
            blobs.clone(),
            UploadSettings::from(&config.upload),
        )),
        submission_service: Arc::new(submission_service),
        notification_service: Arc::new(NotificationService::new(storage.clone())),
        user_service: Arc::new(UserService::new(storage.clone())),
        storage,
        cache,
    })
}
