use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub cors: CorsConfig,
    pub upload: UploadConfig,
    pub notifier: NotifierConfig,
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub system_name: String,
    pub environment: String,
    pub log_level: String,
    /// 库中没有任何用户时创建的管理员账号
    pub admin_username: String,
    /// 留空则生成随机密码并打印到日志
    #[serde(skip_serializing, default)]
    pub admin_password: String,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub unix_socket_path: String,
    pub workers: usize,
    pub max_workers: usize,
    pub timeouts: TimeoutConfig,
    pub limits: LimitConfig,
}

/// 超时配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub client_request: u64,
    pub client_disconnect: u64,
    pub keep_alive: u64,
}

/// 限制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    pub max_payload_size: usize,
    /// 登录接口每个 IP 在窗口期内允许的请求数
    pub login_requests: u64,
    pub login_window_secs: u64,
}

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    #[serde(skip_serializing, default)] // 不序列化到JSON响应中
    pub secret: String,
    pub access_token_expiry: i64, // 访问令牌有效期（分钟）
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,    // 数据库连接 URL（从 scheme 自动推断类型）
    pub pool_size: u32, // 连接池大小
    pub timeout: u64,   // 连接超时 (秒)
}

/// 缓存配置（进程内 Moka）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub default_ttl: u64,
    pub max_capacity: u64,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default)] // 空列表序列化后会丢失
    pub allowed_origins: Vec<String>,
    pub max_age: usize,
}

/// 上传与文件存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 存储后端：`local` 或 `memory`
    pub backend: String,
    pub dir: String,          // 本地后端的存储目录
    pub max_size: usize,      // 单文件硬上限（任务自身的限制另行校验）
    pub max_files: usize,     // 单次提交最多文件数
    pub io_timeout_ms: u64,   // 单次存储调用超时
    pub store_retries: u32,   // 存储失败后的重试次数
}

/// 通知配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub timeout_ms: u64,
}
