use partsync_supplier::SupplierConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Bearer token required on `/api/v1` routes. `None` disables the check
    /// (local development only).
    pub admin_token: Option<String>,
    /// Upstream inventory provider settings.
    pub supplier: SupplierConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                        |
    /// |------------------------|--------------------------------|
    /// | `HOST`                 | `0.0.0.0`                      |
    /// | `PORT`                 | `3000`                         |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                           |
    /// | `ADMIN_TOKEN`          | unset (auth disabled)          |
    /// | `SUPPLIER_BASE_URL`    | `http://localhost:8080/almacen`|
    /// | `SUPPLIER_API_KEY`     | empty                          |
    /// | `SUPPLIER_COMPANY_ID`  | `0`                            |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let admin_token = std::env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty());

        let supplier = SupplierConfig {
            base_url: std::env::var("SUPPLIER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080/almacen".into()),
            api_key: std::env::var("SUPPLIER_API_KEY").unwrap_or_default(),
            company_id: std::env::var("SUPPLIER_COMPANY_ID")
                .unwrap_or_else(|_| "0".into())
                .parse()
                .expect("SUPPLIER_COMPANY_ID must be a valid i64"),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            admin_token,
            supplier,
        }
    }
}
