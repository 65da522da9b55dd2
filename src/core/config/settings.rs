use super::parsing::{
    env_optional, env_or_default, normalize_prefix, parse_bool, parse_cors_origins,
    parse_environment, parse_u16, parse_u32, parse_u64,
};
use super::types::{
    ApiSettings, ConfigError, CorsSettings, DatabaseSettings, IdentitySettings, RedisSettings,
    RuntimeSettings, ServerHost, ServerPort, ServerSettings, Settings, StorageSettings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("EXAM_CONNECT_HOST", "0.0.0.0");
        let port = env_or_default("EXAM_CONNECT_PORT", "8000");

        let environment = parse_environment(
            env_optional("EXAM_CONNECT_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("EXAM_CONNECT_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Exam Connect API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let institution = env_or_default("INSTITUTION_NAME", "MNSK College of Engineering");
        let api_prefix = normalize_prefix(env_or_default("API_PREFIX", "/api"))?;

        let identity_url =
            env_or_default("SUPABASE_URL", "http://localhost:54321").trim_end_matches('/').to_string();
        let anon_key = env_or_default("SUPABASE_ANON_KEY", "");
        let service_role_key = env_or_default("SUPABASE_SERVICE_ROLE_KEY", "");
        let jwt_secret = env_or_default("SUPABASE_JWT_SECRET", "");
        let jwt_audience = env_or_default("SUPABASE_JWT_AUDIENCE", "authenticated");
        let identity_timeout = parse_u64(
            "IDENTITY_REQUEST_TIMEOUT",
            env_or_default("IDENTITY_REQUEST_TIMEOUT", "30"),
        )?;

        let cors_origins = parse_cors_origins(env_optional("CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "postgres");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "postgres");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DATABASE_MAX_CONNECTIONS", env_or_default("DATABASE_MAX_CONNECTIONS", "20"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let s3_endpoint =
            env_or_default("S3_ENDPOINT", &format!("{identity_url}/storage/v1/s3"));
        let s3_access_key = env_or_default("S3_ACCESS_KEY", "");
        let s3_secret_key = env_or_default("S3_SECRET_KEY", "");
        let s3_bucket = env_or_default("S3_BUCKET", "answers");
        let s3_region = env_or_default("S3_REGION", "us-east-1");
        let public_url_base = env_or_default(
            "STORAGE_PUBLIC_URL_BASE",
            &format!("{identity_url}/storage/v1/object/public"),
        );
        let presigned_url_expire_minutes = parse_u64(
            "PRESIGNED_URL_EXPIRE_MINUTES",
            env_or_default("PRESIGNED_URL_EXPIRE_MINUTES", "15"),
        )?;

        let log_level = env_or_default("LOG_LEVEL", "info");
        let json = env_optional("LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Settings {
            server: ServerSettings { host: ServerHost::parse(host)?, port: ServerPort::parse(port)? },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, institution, api_prefix },
            identity: IdentitySettings {
                url: identity_url,
                anon_key,
                service_role_key,
                jwt_secret,
                jwt_audience,
                request_timeout_seconds: identity_timeout,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            storage: StorageSettings {
                endpoint: s3_endpoint,
                access_key: s3_access_key,
                secret_key: s3_secret_key,
                bucket: s3_bucket,
                region: s3_region,
                public_url_base,
                presigned_url_expire_minutes,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn identity(&self) -> &IdentitySettings {
        &self.identity
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn storage(&self) -> &StorageSettings {
        &self.storage
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.trim().is_empty() || self.storage.bucket.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "S3_BUCKET",
                value: self.storage.bucket.clone(),
            });
        }

        if self.storage.presigned_url_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PRESIGNED_URL_EXPIRE_MINUTES",
                value: "0".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if !self.runtime.strict_config {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.identity.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecret("SUPABASE_JWT_SECRET"));
        }
        if self.identity.anon_key.is_empty() {
            return Err(ConfigError::MissingSecret("SUPABASE_ANON_KEY"));
        }
        if self.identity.service_role_key.is_empty() {
            return Err(ConfigError::MissingSecret("SUPABASE_SERVICE_ROLE_KEY"));
        }
        if !self.storage.is_configured() {
            return Err(ConfigError::MissingSecret("S3_ACCESS_KEY/S3_SECRET_KEY"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use crate::core::config::{ConfigError, Environment};
    use crate::test_support;

    #[tokio::test]
    async fn defaults_load_outside_production() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");

        assert_eq!(settings.runtime().environment, Environment::Test);
        assert_eq!(settings.api().api_prefix, "/api");
        assert_eq!(settings.storage().bucket, "answers");
        assert!(!settings.storage().is_configured());
    }

    #[tokio::test]
    async fn strict_mode_requires_identity_secrets() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("EXAM_CONNECT_STRICT_CONFIG", "1");
        std::env::set_var("DATABASE_URL", "postgresql://u:p@localhost/db");
        std::env::remove_var("SUPABASE_JWT_SECRET");

        let result = Settings::load();
        std::env::set_var("EXAM_CONNECT_STRICT_CONFIG", "0");

        assert!(matches!(result, Err(ConfigError::MissingSecret("SUPABASE_JWT_SECRET"))));
    }

    #[tokio::test]
    async fn public_url_joins_bucket_and_key() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("STORAGE_PUBLIC_URL_BASE", "https://proj.example.co/storage/v1/object/public/");

        let settings = Settings::load().expect("settings");
        std::env::remove_var("STORAGE_PUBLIC_URL_BASE");

        assert_eq!(
            settings.storage().public_url("submissions/a.pdf"),
            "https://proj.example.co/storage/v1/object/public/answers/submissions/a.pdf"
        );
    }
}
