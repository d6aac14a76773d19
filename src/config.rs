use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{LedgerError, Result};
use crate::types::CompanyId;

/// ledger configuration for one company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub defaults: CompanyDefaults,
    #[serde(default)]
    pub allocation_policy: AllocationPolicy,
    #[serde(default)]
    pub vale_policy: ValeBalancePolicy,
}

/// default rates used when a sale line is entered without them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyDefaults {
    /// imposto padrão
    pub tax_rate: Option<Rate>,
    /// capital padrão
    pub capital_rate: Option<Rate>,
}

/// how settlement allocations are checked before closing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AllocationPolicy {
    /// shares must be non-negative, unique per participant and sum to 100%
    #[default]
    Strict,
    /// accept any allocation as given
    Permissive,
}

/// how a client's vale balance is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ValeBalancePolicy {
    /// negative balances are shown as zero
    #[default]
    ClampAtZero,
    /// the signed fold is shown as is
    Signed,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            company_id: None,
            defaults: CompanyDefaults::default(),
            allocation_policy: AllocationPolicy::Strict,
            vale_policy: ValeBalancePolicy::ClampAtZero,
        }
    }
}

impl LedgerConfig {
    /// configuration for one company with strict allocation checks
    pub fn for_company(company_id: CompanyId) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    /// configuration reproducing the legacy system: no allocation checks,
    /// vale balances floored at zero
    pub fn compatible(company_id: CompanyId) -> Self {
        Self {
            company_id: Some(company_id),
            defaults: CompanyDefaults::default(),
            allocation_policy: AllocationPolicy::Permissive,
            vale_policy: ValeBalancePolicy::ClampAtZero,
        }
    }

    pub fn with_defaults(mut self, tax_rate: Option<Rate>, capital_rate: Option<Rate>) -> Self {
        self.defaults = CompanyDefaults { tax_rate, capital_rate };
        self
    }

    pub fn with_allocation_policy(mut self, policy: AllocationPolicy) -> Self {
        self.allocation_policy = policy;
        self
    }

    pub fn with_vale_policy(mut self, policy: ValeBalancePolicy) -> Self {
        self.vale_policy = policy;
        self
    }

    /// load and validate from json
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, rate) in [
            ("tax_rate", self.defaults.tax_rate),
            ("capital_rate", self.defaults.capital_rate),
        ] {
            if let Some(rate) = rate {
                if rate.is_negative() {
                    return Err(LedgerError::InvalidConfiguration {
                        message: format!("default {} must not be negative, got {}", name, rate),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_default_is_strict_and_clamped() {
        let config = LedgerConfig::default();
        assert_eq!(config.allocation_policy, AllocationPolicy::Strict);
        assert_eq!(config.vale_policy, ValeBalancePolicy::ClampAtZero);
        assert!(config.company_id.is_none());
    }

    #[test]
    fn test_compatible_is_permissive() {
        let company = Uuid::new_v4();
        let config = LedgerConfig::compatible(company);
        assert_eq!(config.company_id, Some(company));
        assert_eq!(config.allocation_policy, AllocationPolicy::Permissive);
    }

    #[test]
    fn test_json_round_trip_with_missing_sections() {
        let json = r#"{
            "company_id": null,
            "defaults": { "tax_rate": "0.115", "capital_rate": null }
        }"#;
        let config = LedgerConfig::from_json(json).unwrap();
        assert_eq!(config.defaults.tax_rate, Some(Rate::from_percent(dec!(11.5))));
        assert_eq!(config.defaults.capital_rate, None);
        assert_eq!(config.allocation_policy, AllocationPolicy::Strict);

        let again = LedgerConfig::from_json(&config.to_json_pretty().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_negative_default_rejected() {
        let config = LedgerConfig::default()
            .with_defaults(Some(Rate::from_percent(dec!(-1))), None);
        assert!(matches!(
            config.validate(),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        assert!(matches!(
            LedgerConfig::from_json("{ not json"),
            Err(LedgerError::Serialization(_))
        ));
    }
}
