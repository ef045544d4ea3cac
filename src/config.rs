use crate::state;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::Path,
};

pub const DEFAULT_COLLECTION_PATH: &str = "collection.json";

/// Price and per-transaction cap applied when a sale phase starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhasePreset {
    /// Decimal amount in native currency, e.g. "0.05".
    pub mint_cost: String,
    pub max_mint_amount_per_tx: u64,
}

impl PhasePreset {
    pub fn cost_units(&self) -> Result<u64> {
        state::parse_units(&self.mint_cost)
    }
}

/// Deployment-side facts the console cannot read from the chain: which
/// contract to drive, on which network, and the presets applied when
/// advancing the sale phase.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub contract_id: String,
    pub chain_id: u64,
    pub base_metadata_uri: String,
    pub presale: PhasePreset,
    pub public_sale: PhasePreset,
}

impl CollectionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).wrap_err_with(|| {
            format!("Failed to read collection config at {}", path.display())
        })?;
        let config: Self = serde_json::from_slice(&data).wrap_err_with(|| {
            format!("Failed to parse collection config at {}", path.display())
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.presale
            .cost_units()
            .wrap_err("Invalid presale mint cost")?;
        self.public_sale
            .cost_units()
            .wrap_err("Invalid public sale mint cost")?;
        if self.presale.max_mint_amount_per_tx == 0 {
            return Err(eyre!("Presale max mint amount per tx must be positive"));
        }
        if self.public_sale.max_mint_amount_per_tx == 0 {
            return Err(eyre!(
                "Public sale max mint amount per tx must be positive"
            ));
        }
        if self.base_metadata_uri.is_empty() {
            return Err(eyre!("Base metadata URI must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn sample() -> CollectionConfig {
        CollectionConfig {
            contract_id: "0x".to_string() + &"ab".repeat(32),
            chain_id: 0,
            base_metadata_uri: "ipfs://QmBaseUri/".to_string(),
            presale: PhasePreset {
                mint_cost: "0.05".to_string(),
                max_mint_amount_per_tx: 3,
            },
            public_sale: PhasePreset {
                mint_cost: "0.1".to_string(),
                max_mint_amount_per_tx: 5,
            },
        }
    }

    #[test]
    fn validate__accepts_a_well_formed_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate__rejects_unparseable_costs_and_zero_caps() {
        let mut bad_cost = sample();
        bad_cost.presale.mint_cost = "five".to_string();
        assert!(bad_cost.validate().is_err());

        let mut zero_cap = sample();
        zero_cap.public_sale.max_mint_amount_per_tx = 0;
        assert!(zero_cap.validate().is_err());

        let mut no_uri = sample();
        no_uri.base_metadata_uri.clear();
        assert!(no_uri.validate().is_err());
    }

    #[test]
    fn load__round_trips_through_json() {
        let json = serde_json::to_string(&sample()).unwrap();
        let parsed: CollectionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chain_id, 0);
        assert_eq!(parsed.presale.cost_units().unwrap(), 50_000_000_000_000_000);
        assert_eq!(parsed.public_sale.max_mint_amount_per_tx, 5);
    }
}
