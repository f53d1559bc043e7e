//! # Station Profile
//!
//! Everything the coupon prints that does not come from the sale itself.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. --config <path>  (highest priority)                                │
//! │                                                                         │
//! │  2. NFCE_CONFIG=<path>                                                 │
//! │                                                                         │
//! │  3. Platform config dir                                                │
//! │     ~/.config/nfce-demo/station.toml (Linux)                           │
//! │     ~/Library/Application Support/br.nfce.demo/station.toml (macOS)    │
//! │                                                                         │
//! │  4. Built-in defaults (lowest priority)                                │
//! │                                                                         │
//! │  Then NFCE_PIX_KEY / NFCE_STATION_CNPJ override single fields.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # station.toml
//! [station]
//! name = "AUTO POSTO EXEMPLO LTDA"
//! cnpj = "12.345.678/0001-95"
//! city = "São Paulo"
//! state = "SP"
//! address = "Av. Paulista, 1000"
//!
//! [pix]
//! key = "12345678000195"
//! key_type = "cnpj"   # phone | cpf | cnpj | email | random
//!
//! [fiscal]
//! series = 1
//! number = 123
//! emission_type = 1
//!
//! [taxes]
//! federal = "13,45"
//! state = "18"
//! municipal = "0,75"
//!
//! [[fuels]]
//! code = "1"
//! name = "GASOLINA COMUM"
//! cash_price = "5,79"
//! card_price = "5,89"
//! ```

use std::path::{Path, PathBuf};

use nfce_core::access_key::state_code_for_uf;
use nfce_core::pix::PixKeyType;
use nfce_core::validation::validate_cnpj;
use nfce_core::{FuelPrice, TaxRateSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

// =============================================================================
// Station
// =============================================================================

/// The issuing establishment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationConfig {
    #[serde(default = "default_station_name")]
    pub name: String,

    /// Tax id, punctuation allowed.
    #[serde(default = "default_cnpj")]
    pub cnpj: String,

    #[serde(default = "default_city")]
    pub city: String,

    /// Federative unit abbreviation (`SP`, `MG`, ...).
    #[serde(default = "default_state")]
    pub state: String,

    #[serde(default = "default_address")]
    pub address: String,
}

fn default_station_name() -> String {
    "AUTO POSTO EXEMPLO LTDA".to_string()
}

fn default_cnpj() -> String {
    "12.345.678/0001-95".to_string()
}

fn default_city() -> String {
    "São Paulo".to_string()
}

fn default_state() -> String {
    "SP".to_string()
}

fn default_address() -> String {
    "Av. Paulista, 1000".to_string()
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            name: default_station_name(),
            cnpj: default_cnpj(),
            city: default_city(),
            state: default_state(),
            address: default_address(),
        }
    }
}

// =============================================================================
// Pix
// =============================================================================

/// Receiving key for Pix payments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixConfig {
    /// Empty means "not configured": the coupon prints without a payment code.
    #[serde(default = "default_pix_key")]
    pub key: String,

    #[serde(default = "default_key_type")]
    pub key_type: PixKeyType,
}

fn default_pix_key() -> String {
    "12345678000195".to_string()
}

fn default_key_type() -> PixKeyType {
    PixKeyType::Cnpj
}

impl Default for PixConfig {
    fn default() -> Self {
        PixConfig {
            key: default_pix_key(),
            key_type: default_key_type(),
        }
    }
}

// =============================================================================
// Fiscal Numbering
// =============================================================================

/// Invoice numbering fields of the access key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiscalConfig {
    #[serde(default = "default_series")]
    pub series: u32,

    #[serde(default = "default_number")]
    pub number: u64,

    /// `1` = normal emission, `9` = offline contingency.
    #[serde(default = "default_emission_type")]
    pub emission_type: u8,
}

fn default_series() -> u32 {
    1
}

fn default_number() -> u64 {
    1
}

fn default_emission_type() -> u8 {
    1
}

impl Default for FiscalConfig {
    fn default() -> Self {
        FiscalConfig {
            series: default_series(),
            number: default_number(),
            emission_type: default_emission_type(),
        }
    }
}

// =============================================================================
// Taxes
// =============================================================================

/// Approximate tax rates as stored strings (`"13,45"` or `"13.45"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxConfig {
    #[serde(default = "default_federal_rate")]
    pub federal: String,

    #[serde(default = "default_state_rate")]
    pub state: String,

    #[serde(default = "default_municipal_rate")]
    pub municipal: String,
}

fn default_federal_rate() -> String {
    "13,45".to_string()
}

fn default_state_rate() -> String {
    "18".to_string()
}

fn default_municipal_rate() -> String {
    "0".to_string()
}

impl Default for TaxConfig {
    fn default() -> Self {
        TaxConfig {
            federal: default_federal_rate(),
            state: default_state_rate(),
            municipal: default_municipal_rate(),
        }
    }
}

impl TaxConfig {
    /// Parses the three rates; malformed entries become 0%.
    pub fn rate_set(&self) -> TaxRateSet {
        TaxRateSet::parse(&self.federal, &self.state, &self.municipal)
    }
}

// =============================================================================
// Fuels
// =============================================================================

/// One pump product with its posted prices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuelConfig {
    pub code: String,
    pub name: String,

    #[serde(default)]
    pub cash_price: String,

    #[serde(default)]
    pub card_price: String,
}

impl FuelConfig {
    fn new(code: &str, name: &str, cash_price: &str, card_price: &str) -> Self {
        FuelConfig {
            code: code.to_string(),
            name: name.to_string(),
            cash_price: cash_price.to_string(),
            card_price: card_price.to_string(),
        }
    }

    /// Posted prices; an empty card price falls back to the cash price.
    pub fn price(&self) -> FuelPrice {
        let card = if self.card_price.trim().is_empty() {
            &self.cash_price
        } else {
            &self.card_price
        };
        FuelPrice::parse_locale(&self.cash_price, card)
    }
}

fn default_fuels() -> Vec<FuelConfig> {
    vec![
        FuelConfig::new("1", "GASOLINA COMUM", "5,79", "5,89"),
        FuelConfig::new("2", "ETANOL HIDRATADO", "3,79", "3,89"),
        FuelConfig::new("3", "OLEO DIESEL S10", "6,15", "6,25"),
    ]
}

// =============================================================================
// Station Profile
// =============================================================================

/// Complete station profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationProfile {
    #[serde(default)]
    pub station: StationConfig,

    #[serde(default)]
    pub pix: PixConfig,

    #[serde(default)]
    pub fiscal: FiscalConfig,

    #[serde(default)]
    pub taxes: TaxConfig,

    #[serde(default = "default_fuels")]
    pub fuels: Vec<FuelConfig>,
}

impl Default for StationProfile {
    fn default() -> Self {
        StationProfile {
            station: StationConfig::default(),
            pix: PixConfig::default(),
            fiscal: FiscalConfig::default(),
            taxes: TaxConfig::default(),
            fuels: default_fuels(),
        }
    }
}

impl StationProfile {
    /// Loads the profile.
    ///
    /// `explicit_path` is the `--config` flag (clap already folds
    /// `NFCE_CONFIG` into it). An explicit path that does not exist is an
    /// error; a missing platform file silently means defaults.
    pub fn load(explicit_path: Option<PathBuf>) -> AppResult<Self> {
        let mut profile = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::ConfigNotFound(path));
                }
                Self::from_file(&path)?
            }
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Station profile not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        profile.apply_env_overrides();
        profile.validate()?;

        Ok(profile)
    }

    /// Reads and parses one TOML file.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        info!(?path, "Loading station profile");
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> AppResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Rejects profiles the coupon cannot be printed from.
    ///
    /// A CNPJ with bad check digits only warns: key generation zero-pads and
    /// proceeds, and the demo keeps that behavior visible instead of hiding it.
    pub fn validate(&self) -> AppResult<()> {
        if self.state_code().is_none() {
            return Err(AppError::InvalidConfig(format!(
                "unknown state '{}', expected a UF such as SP or MG",
                self.station.state
            )));
        }

        if self.fuels.is_empty() {
            return Err(AppError::InvalidConfig(
                "at least one [[fuels]] entry is required".into(),
            ));
        }

        if let Err(err) = validate_cnpj(&self.station.cnpj) {
            warn!(cnpj = %self.station.cnpj, %err, "Station CNPJ is not valid; the access key will still be generated");
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("NFCE_PIX_KEY") {
            debug!("Overriding Pix key from environment");
            self.pix.key = key;
        }

        if let Ok(cnpj) = std::env::var("NFCE_STATION_CNPJ") {
            debug!(cnpj = %cnpj, "Overriding station CNPJ from environment");
            self.station.cnpj = cnpj;
        }
    }

    /// Returns the default profile path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("br", "nfce", "demo")
            .map(|dirs| dirs.config_dir().join("station.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// IBGE code of the configured state.
    pub fn state_code(&self) -> Option<&'static str> {
        state_code_for_uf(&self.station.state)
    }

    /// Finds a fuel by code, or by name prefix (case-insensitive).
    pub fn find_fuel(&self, requested: &str) -> AppResult<&FuelConfig> {
        let wanted = requested.trim().to_uppercase();

        self.fuels
            .iter()
            .find(|fuel| fuel.code == requested.trim())
            .or_else(|| {
                self.fuels
                    .iter()
                    .find(|fuel| !wanted.is_empty() && fuel.name.to_uppercase().starts_with(&wanted))
            })
            .ok_or_else(|| AppError::UnknownFuel {
                requested: requested.to_string(),
                available: self
                    .fuels
                    .iter()
                    .map(|fuel| fuel.code.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = StationProfile::default();
        assert_eq!(profile.state_code(), Some("35"));
        assert_eq!(profile.fuels.len(), 3);
        assert_eq!(profile.pix.key_type, PixKeyType::Cnpj);
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let profile = StationProfile::from_toml(
            r#"
            [station]
            name = "POSTO BOA VIAGEM"
            state = "mg"

            [pix]
            key = "(31) 99876-5432"
            key_type = "phone"
            "#,
        )
        .unwrap();

        assert_eq!(profile.station.name, "POSTO BOA VIAGEM");
        assert_eq!(profile.station.city, "São Paulo");
        assert_eq!(profile.state_code(), Some("31"));
        assert_eq!(profile.pix.key_type, PixKeyType::Phone);
        assert_eq!(profile.fiscal.series, 1);
        assert_eq!(profile.fuels.len(), 3);
    }

    #[test]
    fn test_fuels_table() {
        let profile = StationProfile::from_toml(
            r#"
            [[fuels]]
            code = "7"
            name = "GNV"
            cash_price = "4,99"
            "#,
        )
        .unwrap();

        let fuel = profile.find_fuel("7").unwrap();
        assert_eq!(fuel.price().cash.cents(), 499);
        assert_eq!(fuel.price().card.cents(), 499);
    }

    #[test]
    fn test_find_fuel() {
        let profile = StationProfile::default();
        assert_eq!(profile.find_fuel("2").unwrap().name, "ETANOL HIDRATADO");
        assert!(profile.find_fuel("diesel").is_err());
        assert_eq!(profile.find_fuel("oleo").unwrap().code, "3");

        match profile.find_fuel("9").unwrap_err() {
            AppError::UnknownFuel { available, .. } => assert_eq!(available, "1, 2, 3"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_validation() {
        let mut profile = StationProfile::default();
        profile.station.state = "XX".to_string();
        assert!(matches!(profile.validate(), Err(AppError::InvalidConfig(_))));

        let mut profile = StationProfile::default();
        profile.fuels.clear();
        assert!(profile.validate().is_err());

        // bad check digits warn but load
        let mut profile = StationProfile::default();
        profile.station.cnpj = "12.345.678/0001-00".to_string();
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let err = StationProfile::load(Some(PathBuf::from("/nonexistent/station.toml"))).unwrap_err();
        assert!(matches!(err, AppError::ConfigNotFound(_)));
    }

    #[test]
    fn test_rate_set() {
        let rates = TaxConfig::default().rate_set();
        assert_eq!(rates.federal.to_display_string(), "13,45");
        assert!(rates.municipal.is_zero());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&StationProfile::default()).unwrap();
        assert!(toml_str.contains("[station]"));
        assert!(toml_str.contains("[[fuels]]"));
    }
}
