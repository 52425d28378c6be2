//! # Shop Configuration
//!
//! Configuration for pricing, checkout and storage.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     KASSA_SITE_URL=https://example.se                                  │
//! │     KASSA_DATABASE_PATH=/srv/kassa/kassa.db                            │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/kassa/kassa.toml (Linux)                                 │
//! │     ~/Library/Application Support/se.kassa.kassa/kassa.toml (macOS)    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     6 % / 25 % moms, whole-krona rounding, the three shipping options  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [pricing.rates]
//! reduced = 600      # basis points
//! standard = 2500
//!
//! [pricing.rounding]
//! unit = 100         # öre
//! cash_unit = 100
//!
//! [[shipping]]
//! id = "sweden"
//! name = "Inom Sverige"
//! region = "domestic"
//! price = 3900       # öre, moms included
//!
//! [[discounts]]
//! code = "välkommen10"
//! percent = 10
//!
//! [gateway]
//! site_url = "https://example.se"
//! fees_file = "fees.json"
//!
//! [database]
//! path = "/srv/kassa/kassa.db"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use kassa_core::checkout::SESSION_ID_PLACEHOLDER;
use kassa_core::validation::{validate_discount_percent, validate_price, validate_tax_rate_bps};
use kassa_core::{
    CheckoutSettings, DiscountCatalog, DiscountCode, PricingConfig, ShippingCatalog,
    ShippingOption, TaxRate, ValidationError,
};

const CONFIG_FILE: &str = "kassa.toml";
const DATABASE_FILE: &str = "kassa.db";
const CART_FILE: &str = "cart.json";

/// Platform directories for config and data.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("se", "kassa", "kassa")
}

// =============================================================================
// Gateway Settings
// =============================================================================

/// How checkout sessions are opened and where fees come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Public origin of the shop; success and cancel URLs hang off it.
    #[serde(default = "default_site_url")]
    pub site_url: String,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_locale")]
    pub locale: String,

    /// Countries the gateway may ship to (ISO 3166-1 alpha-2).
    #[serde(default = "default_allowed_countries")]
    pub allowed_countries: Vec<String>,

    #[serde(default = "default_true")]
    pub require_billing_address: bool,

    /// JSON fee export from the processor dashboard.
    #[serde(default)]
    pub fees_file: Option<PathBuf>,
}

fn default_site_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_currency() -> String {
    "sek".to_string()
}

fn default_locale() -> String {
    "sv".to_string()
}

fn default_allowed_countries() -> Vec<String> {
    ["SE", "NO", "DK", "FI"].iter().map(|c| c.to_string()).collect()
}

fn default_true() -> bool {
    true
}

impl Default for GatewaySettings {
    fn default() -> Self {
        GatewaySettings {
            site_url: default_site_url(),
            currency: default_currency(),
            locale: default_locale(),
            allowed_countries: default_allowed_countries(),
            require_billing_address: true,
            fees_file: None,
        }
    }
}

impl GatewaySettings {
    /// The session settings handed to the payload builder.
    pub fn checkout_settings(&self) -> CheckoutSettings {
        let origin = self.site_url.trim_end_matches('/');
        CheckoutSettings {
            currency: self.currency.clone(),
            locale: self.locale.clone(),
            success_url: format!("{}/success?session_id={}", origin, SESSION_ID_PLACEHOLDER),
            cancel_url: format!("{}/butik", origin),
            allowed_countries: self.allowed_countries.clone(),
            require_billing_address: self.require_billing_address,
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Shop Configuration
// =============================================================================

/// Complete shop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopConfig {
    #[serde(default)]
    pub pricing: PricingConfig,

    #[serde(default = "default_shipping")]
    pub shipping: Vec<ShippingOption>,

    #[serde(default = "default_discounts")]
    pub discounts: Vec<DiscountCode>,

    #[serde(default)]
    pub gateway: GatewaySettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

fn default_shipping() -> Vec<ShippingOption> {
    ShippingCatalog::default().options().to_vec()
}

fn default_discounts() -> Vec<DiscountCode> {
    DiscountCatalog::default().codes().to_vec()
}

impl Default for ShopConfig {
    fn default() -> Self {
        ShopConfig {
            pricing: PricingConfig::default(),
            shipping: default_shipping(),
            discounts: default_discounts(),
            gateway: GatewaySettings::default(),
            database: DatabaseSettings::default(),
        }
    }
}

impl ShopConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (kassa.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading shop config from file");
                config = Self::from_toml(&std::fs::read_to_string(&path)?)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration, falling back to defaults on any error.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load shop config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a config file body.
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)?;

        info!(?path, "Shop config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        let rates = &self.pricing.rates;
        validate_tax_rate_bps(rates.reduced.bps())?;
        validate_tax_rate_bps(rates.standard.bps())?;
        if rates.reduced > rates.standard {
            return Err(ConfigError::Invalid(format!(
                "reduced rate {} is above the standard rate {}",
                rates.reduced, rates.standard
            )));
        }
        self.pricing.rounding.validate()?;

        if self.shipping.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one shipping option is required".into(),
            ));
        }
        let mut ids = HashSet::new();
        for option in &self.shipping {
            if !ids.insert(option.id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: "shipping.id".to_string(),
                    value: option.id.clone(),
                }
                .into());
            }
            validate_price("shipping.price", option.price)?;
        }

        let mut codes = HashSet::new();
        for discount in &self.discounts {
            let code = discount.code.trim().to_lowercase();
            if code.is_empty() {
                return Err(ValidationError::Required {
                    field: "discounts.code".to_string(),
                }
                .into());
            }
            if !codes.insert(code) {
                return Err(ValidationError::Duplicate {
                    field: "discounts.code".to_string(),
                    value: discount.code.clone(),
                }
                .into());
            }
            validate_discount_percent(discount.percent)?;
        }

        let url = &self.gateway.site_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "site_url must start with http:// or https://, got: {}",
                url
            )));
        }
        if self.gateway.currency.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "gateway.currency".to_string(),
            }
            .into());
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `KASSA_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("KASSA_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(url) = var("KASSA_SITE_URL") {
            debug!(url = %url, "Overriding site URL from environment");
            self.gateway.site_url = url;
        }

        if let Some(file) = var("KASSA_FEES_FILE") {
            self.gateway.fees_file = Some(PathBuf::from(file));
        }

        if let Some(currency) = var("KASSA_CURRENCY") {
            self.gateway.currency = currency.to_lowercase();
        }

        for (key, slot) in [
            ("KASSA_ROUNDING_UNIT", &mut self.pricing.rounding.unit),
            ("KASSA_CASH_UNIT", &mut self.pricing.rounding.cash_unit),
        ] {
            if let Some(value) = var(key) {
                match value.parse::<i64>() {
                    Ok(v) => *slot = v,
                    Err(_) => warn!(key, value = %value, "Ignoring non-numeric override"),
                }
            }
        }

        for (key, slot) in [
            ("KASSA_REDUCED_RATE_BPS", &mut self.pricing.rates.reduced),
            ("KASSA_STANDARD_RATE_BPS", &mut self.pricing.rates.standard),
        ] {
            if let Some(value) = var(key) {
                match value.parse::<u32>() {
                    Ok(bps) => *slot = TaxRate::from_bps(bps),
                    Err(_) => warn!(key, value = %value, "Ignoring non-numeric override"),
                }
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn shipping_catalog(&self) -> ShippingCatalog {
        ShippingCatalog::new(self.shipping.clone())
    }

    pub fn discount_catalog(&self) -> DiscountCatalog {
        DiscountCatalog::new(self.discounts.clone())
    }

    pub fn checkout_settings(&self) -> CheckoutSettings {
        self.gateway.checkout_settings()
    }

    /// The SQLite file: configured, else `<data dir>/kassa.db`.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        self.database
            .path
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().join(DATABASE_FILE)))
            .ok_or_else(|| ConfigError::Invalid("No data directory for the database".into()))
    }

    /// Where the local cart file lives next to the database.
    pub fn cart_path(&self) -> ConfigResult<PathBuf> {
        let db = self.database_path()?;
        Ok(db
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join(CART_FILE))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
