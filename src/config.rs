use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub backend_url: String,
    pub backend_timeout_secs: u64,
    pub public_base_url: String,
    pub approval_url: Option<String>,
    pub cancel_url: Option<String>,
    pub fail_url: Option<String>,
    pub confirmation_url: String,
    pub order_id_prefix: String,
    pub default_unit_price: i64,
    pub default_item_name: String,
    pub mock_venues_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "nightstage.db".to_string()),
            backend_url: env::var("BACKEND_URL")
                .unwrap_or_else(|_| "http://localhost:4000/api".to_string()),
            backend_timeout_secs: env::var("BACKEND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            approval_url: non_empty_var("PAYMENT_APPROVAL_URL"),
            cancel_url: non_empty_var("PAYMENT_CANCEL_URL"),
            fail_url: non_empty_var("PAYMENT_FAIL_URL"),
            confirmation_url: env::var("CONFIRMATION_URL").unwrap_or_else(|_| "/".to_string()),
            order_id_prefix: env::var("ORDER_ID_PREFIX").unwrap_or_else(|_| "NSTG".to_string()),
            default_unit_price: env::var("DEFAULT_UNIT_PRICE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15000),
            default_item_name: env::var("DEFAULT_ITEM_NAME")
                .unwrap_or_else(|_| "NightStage venue reservation".to_string()),
            mock_venues_path: non_empty_var("MOCK_VENUES_PATH"),
        }
    }

    /// Where the gateway sends the browser back after approval. Explicit
    /// overrides win over the routes derived from `public_base_url`.
    pub fn callback_base(&self, route: &str) -> String {
        let explicit = match route {
            "approve" => self.approval_url.as_ref(),
            "cancel" => self.cancel_url.as_ref(),
            "fail" => self.fail_url.as_ref(),
            _ => None,
        };
        explicit.cloned().unwrap_or_else(|| {
            format!("{}/payment/{route}", self.public_base_url.trim_end_matches('/'))
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
