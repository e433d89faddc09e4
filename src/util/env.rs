use std::sync::LazyLock;

use thiserror::Error;
use tokio::sync::OnceCell;

static ENV_VARS: LazyLock<OnceCell<Env>> = LazyLock::new(OnceCell::new);
pub async fn get_var(var: Var) -> EnvResult<&'static str> {
    let vars = ENV_VARS.get_or_try_init(|| async { Env::new() }).await?;
    Ok(match var {
        Var::DatabaseUrl => &vars.database_url,
        Var::RedisUrl => &vars.redis_url,
        Var::ServerApiPort => &vars.server_api_port,
        Var::TrendingIntervalSecs => &vars.trending_interval_secs,
        Var::ScanDeadlineSecs => &vars.scan_deadline_secs,
        Var::CorsAllowOrigins => &vars.cors_allow_origins,
        Var::OtelExporterEndpoint => &vars.otel_exporter_otlp_endpoint,
        Var::OtelExporterProto => &vars.otel_exporter_otlp_protocol,
        Var::ApiServiceName => &vars.api_service_name,
        Var::ApiTracerName => &vars.api_tracer_name,
    })
}

#[derive(Debug, Clone)]
pub struct Env {
    pub database_url: String,
    pub redis_url: String,
    pub server_api_port: String,
    pub trending_interval_secs: String,
    pub scan_deadline_secs: String,
    pub cors_allow_origins: String,
    pub otel_exporter_otlp_endpoint: String,
    pub otel_exporter_otlp_protocol: String,
    pub api_service_name: String,
    pub api_tracer_name: String,
}

impl Env {
    pub fn new() -> EnvResult<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            server_api_port: required("SERVER_API_PORT")?,
            trending_interval_secs: optional("TRENDING_INTERVAL_SECS", "300"),
            scan_deadline_secs: optional("SCAN_DEADLINE_SECS", "30"),
            cors_allow_origins: optional("CORS_ALLOW_ORIGINS", "*"),
            otel_exporter_otlp_endpoint: required("OTEL_EXPORTER_OTLP_ENDPOINT")?,
            otel_exporter_otlp_protocol: optional("OTEL_EXPORTER_OTLP_PROTOCOL", "grpc"),
            api_service_name: optional("API_SERVICE_NAME", "tagwatch-server"),
            api_tracer_name: optional("API_TRACER_NAME", "tagwatch"),
        })
    }
}

fn required(name: &'static str) -> EnvResult<String> {
    match dotenvy::var(name) {
        Ok(val) => Ok(val),
        Err(dotenvy::Error::EnvVar(std::env::VarError::NotPresent)) => {
            Err(EnvErr::MissingValue(name))
        }
        Err(e) => Err(e.into()),
    }
}

fn optional(name: &'static str, default: &str) -> String {
    dotenvy::var(name).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug)]
pub enum Var {
    DatabaseUrl,
    RedisUrl,
    ServerApiPort,
    TrendingIntervalSecs,
    ScanDeadlineSecs,
    CorsAllowOrigins,
    OtelExporterEndpoint,
    OtelExporterProto,
    ApiServiceName,
    ApiTracerName,
}

#[macro_export]
macro_rules! var {
    ($ev:expr) => {
        $crate::util::env::get_var($ev)
    };
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error(transparent)]
    Dotenvy(#[from] dotenvy::Error),

    #[error("missing required environment variable '{0}'")]
    MissingValue(&'static str),
}
