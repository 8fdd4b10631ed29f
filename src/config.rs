use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub razorpay: RazorpayConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub api_base: String,
}

/// Object storage settings. `bucket = None` selects the in-memory store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: Option<String>,
    pub region: String,
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string()),
        );
        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        let razorpay = RazorpayConfig {
            key_id: env::var("RAZORPAY_KEY_ID")
                .map_err(|_| anyhow::anyhow!("RAZORPAY_KEY_ID is not set"))?,
            key_secret: env::var("RAZORPAY_KEY_SECRET")
                .map_err(|_| anyhow::anyhow!("RAZORPAY_KEY_SECRET is not set"))?,
            api_base: env::var("RAZORPAY_API_BASE")
                .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string()),
        };

        let storage = StorageConfig {
            bucket: env::var("S3_BUCKET").ok().filter(|b| !b.is_empty()),
            region: env::var("S3_REGION").unwrap_or_else(|_| "ap-south-1".to_string()),
            endpoint: env::var("S3_ENDPOINT").ok().filter(|e| !e.is_empty()),
            public_base_url: env::var("S3_PUBLIC_BASE_URL").ok().filter(|u| !u.is_empty()),
        };

        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            cors_origins,
            request_timeout_secs,
            razorpay,
            storage,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
