// Built-in rate card presets

use shipaudit_audit::ContractRules;

#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub rules: ContractRules,
}

fn card(a: f64, b: f64, c: f64, cod_pct: f64, rto: f64, fuel: Option<f64>) -> ContractRules {
    ContractRules {
        zone_a_rate: a,
        zone_b_rate: b,
        zone_c_rate: c,
        cod_fee_percentage: cod_pct,
        rto_flat_fee: rto,
        fuel_surcharge_percentage: fuel,
        docket_charge: None,
        gst_percentage: Some(18.0),
    }
}

pub fn presets() -> Vec<Preset> {
    vec![
        Preset {
            name: "standard",
            description: "Surface network, per-kg zone rates",
            rules: card(40.0, 55.0, 75.0, 1.5, 35.0, None),
        },
        Preset {
            name: "economy",
            description: "Deferred surface, lower rates with a higher COD fee",
            rules: card(32.0, 45.0, 62.0, 2.0, 30.0, None),
        },
        Preset {
            name: "express",
            description: "Air network with fuel surcharge",
            rules: card(55.0, 72.0, 98.0, 1.75, 45.0, Some(12.0)),
        },
    ]
}

/// Look up a preset by name, case-insensitively.
pub fn preset(name: &str) -> Option<Preset> {
    presets()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
}

pub fn preset_names() -> Vec<&'static str> {
    presets().iter().map(|p| p.name).collect()
}
