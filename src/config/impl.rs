use config::{Config, ConfigError, Environment, File};
use std::sync::OnceLock;

use super::{
    AppConfig, AppSettings, CacheConfig, CorsConfig, DatabaseConfig, JwtConfig, LimitConfig,
    NotifierConfig, ServerConfig, TimeoutConfig, UploadConfig,
};

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                system_name: "Assignment Tracker".to_string(),
                environment: "development".to_string(),
                log_level: "info".to_string(),
                admin_username: "admin".to_string(),
                admin_password: String::new(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                unix_socket_path: String::new(),
                workers: 0,
                max_workers: 16,
                timeouts: TimeoutConfig {
                    client_request: 30_000,
                    client_disconnect: 5_000,
                    keep_alive: 30,
                },
                limits: LimitConfig {
                    max_payload_size: 64 * 1024 * 1024,
                    login_requests: 10,
                    login_window_secs: 60,
                },
            },
            jwt: JwtConfig {
                secret: String::new(),
                access_token_expiry: 60 * 12,
            },
            database: DatabaseConfig {
                url: "sqlite://tracker.db?mode=rwc".to_string(),
                pool_size: 8,
                timeout: 10,
            },
            cache: CacheConfig {
                default_ttl: 300,
                max_capacity: 10_000,
            },
            cors: CorsConfig {
                allowed_origins: vec![],
                max_age: 3600,
            },
            upload: UploadConfig {
                backend: "local".to_string(),
                dir: "uploads".to_string(),
                max_size: 50 * 1024 * 1024,
                max_files: 5,
                io_timeout_ms: 10_000,
                store_retries: 2,
            },
            notifier: NotifierConfig {
                enabled: true,
                timeout_ms: 5_000,
            },
        }
    }
}

impl AppConfig {
    /// 加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // 内置默认值，保证缺少配置文件时也能启动
            .add_source(Config::try_from(&AppConfig::default())?)
            // 加载默认配置文件
            .add_source(File::with_name("config").required(false))
            // 然后根据环境加载特定配置文件
            .add_source(
                File::with_name(&format!(
                    "config.{}",
                    std::env::var("APP_ENV").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // 最后加载环境变量覆盖，例如 TRACKER__UPLOAD__MAX_FILES=3
            .add_source(
                Environment::with_prefix("TRACKER")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        // 常用的独立环境变量
        builder = builder
            .set_override_option("app.environment", std::env::var("APP_ENV").ok())?
            .set_override_option("app.log_level", std::env::var("RUST_LOG").ok())?
            .set_override_option("app.admin_username", std::env::var("ADMIN_USERNAME").ok())?
            .set_override_option("app.admin_password", std::env::var("ADMIN_PASSWORD").ok())?
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("server.unix_socket_path", std::env::var("UNIX_SOCKET").ok())?
            .set_override_option("server.workers", std::env::var("CPU_COUNT").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("upload.dir", std::env::var("UPLOAD_DIR").ok())?
            .set_override_option("upload.backend", std::env::var("UPLOAD_BACKEND").ok())?;

        let config = builder.build()?;
        let mut app_config: AppConfig = config.try_deserialize()?;

        // 处理工作线程数
        if app_config.server.workers == 0 {
            app_config.server.workers = num_cpus::get().min(app_config.server.max_workers);
        }

        app_config.validate()?;

        Ok(app_config)
    }

    /// 基本的取值检查，避免带着无意义的配置启动
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload.max_files == 0 {
            return Err(ConfigError::Message(
                "upload.max_files must be greater than 0".to_string(),
            ));
        }
        if self.upload.max_size == 0 {
            return Err(ConfigError::Message(
                "upload.max_size must be greater than 0".to_string(),
            ));
        }
        if !matches!(self.upload.backend.as_str(), "local" | "memory") {
            return Err(ConfigError::Message(format!(
                "unknown upload.backend '{}', expected 'local' or 'memory'",
                self.upload.backend
            )));
        }
        Ok(())
    }

    /// 获取全局配置实例
    pub fn get() -> &'static AppConfig {
        APP_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                eprintln!("Failed to load configuration: {e}");
                std::process::exit(1);
            })
        })
    }

    /// 初始化配置 (在应用启动时调用)
    pub fn init() -> Result<(), ConfigError> {
        let config = Self::load()?;
        APP_CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("Configuration already initialized".to_string()))?;
        Ok(())
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }

    /// 获取服务器绑定地址
    pub fn server_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 获取 Unix 套接字路径 (如果配置了)
    #[cfg(unix)]
    pub fn unix_socket_path(&self) -> Option<&str> {
        if self.server.unix_socket_path.is_empty() {
            None
        } else {
            Some(&self.server.unix_socket_path)
        }
    }
}
