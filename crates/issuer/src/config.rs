use std::path::PathBuf;

pub const DEFAULT_OUT_DIR: &str = "coupons";
pub const DEFAULT_KEY_PATH: &str = "coupon_signing_key.hex";

#[derive(Clone, Debug)]
pub struct IssuerConfig {
    /// Hex private key straight from the environment
    pub signing_key: Option<String>,
    /// File holding the hex private key, used when `signing_key` is unset
    pub key_path: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            signing_key: None,
            key_path: None,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl IssuerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let signing_key = std::env::var("COUPON_SIGNING_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let key_path = std::env::var("COUPON_KEY_PATH")
            .ok()
            .map(|p| PathBuf::from(shellexpand::tilde(&p).to_string()))
            .or_else(|| Some(PathBuf::from(DEFAULT_KEY_PATH)));

        let out_dir = std::env::var("COUPON_OUT_DIR")
            .map(|p| PathBuf::from(shellexpand::tilde(&p).to_string()))
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUT_DIR));

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match std::env::var("PORT") {
            Ok(s) => s
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT {}: {}", s, e))?,
            Err(_) => 8080,
        };

        Ok(Self {
            signing_key,
            key_path,
            out_dir,
            host,
            port,
        })
    }

    pub fn with_key_path(mut self, path: PathBuf) -> Self {
        self.key_path = Some(path);
        self
    }

    pub fn with_out_dir(mut self, dir: PathBuf) -> Self {
        self.out_dir = dir;
        self
    }
}
