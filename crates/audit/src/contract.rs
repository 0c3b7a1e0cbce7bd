use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::model::Zone;

/// Negotiated rate card. Supplied by a preset, a file, or an extraction
/// service; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRules {
    pub zone_a_rate: f64,
    pub zone_b_rate: f64,
    pub zone_c_rate: f64,
    pub cod_fee_percentage: f64,
    #[serde(default)]
    pub rto_flat_fee: f64,
    /// Display-only. Not applied by the discrepancy rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_surcharge_percentage: Option<f64>,
    /// Display-only. Not applied by the discrepancy rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docket_charge: Option<f64>,
    /// Display-only. Not applied by the discrepancy rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst_percentage: Option<f64>,
}

impl ContractRules {
    pub fn base_rate(&self, zone: Zone) -> f64 {
        match zone {
            Zone::A => self.zone_a_rate,
            Zone::B => self.zone_b_rate,
            Zone::C => self.zone_c_rate,
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, AuditError> {
        let rules: ContractRules =
            toml::from_str(input).map_err(|e| AuditError::ContractParse(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn from_json(input: &str) -> Result<Self, AuditError> {
        let rules: ContractRules =
            serde_json::from_str(input).map_err(|e| AuditError::ContractParse(e.to_string()))?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        let required = [
            ("zone_a_rate", self.zone_a_rate),
            ("zone_b_rate", self.zone_b_rate),
            ("zone_c_rate", self.zone_c_rate),
            ("cod_fee_percentage", self.cod_fee_percentage),
            ("rto_flat_fee", self.rto_flat_fee),
        ];
        let optional = [
            ("fuel_surcharge_percentage", self.fuel_surcharge_percentage),
            ("docket_charge", self.docket_charge),
            ("gst_percentage", self.gst_percentage),
        ];

        let values = required
            .into_iter()
            .chain(optional.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));
        for (name, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(AuditError::ContractValidation(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
