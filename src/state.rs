use color_eyre::eyre::{
    Result,
    eyre,
};

/// Decimals of the native currency the contract prices mints in. Costs are
/// stored on-chain as integers in the smallest unit and shown as decimals.
pub const NATIVE_DECIMALS: u32 = 18;

const NATIVE_SCALE: u128 = 10u128.pow(NATIVE_DECIMALS);

/// Raw flags as the contract stores them.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ContractFlags {
    pub paused: bool,
    pub revealed: bool,
    pub whitelist_mint_enabled: bool,
}

/// The sale phase the contract is in. The contract enforces the ordering
/// `Paused -> Whitelisting -> Presale -> PublicSale`; the console only derives
/// the label and decides which controls to show.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    Paused,
    Whitelisting,
    Presale,
    PublicSale,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Control {
    Withdraw,
    EditMintCost,
    EditMaxPerTx,
    StartWhitelisting,
    StartPresale,
    StartPublicSale,
}

impl Phase {
    /// Collapse the raw flags into a single phase. Pause wins over every
    /// other flag, whitelisting over the sale flags, and presale is the
    /// unpaused, un-whitelisted, unrevealed remainder.
    pub fn derive(flags: ContractFlags) -> Self {
        if flags.paused {
            Phase::Paused
        } else if flags.whitelist_mint_enabled {
            Phase::Whitelisting
        } else if !flags.revealed {
            Phase::Presale
        } else {
            Phase::PublicSale
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Paused => "Paused",
            Phase::Whitelisting => "Whitelisting",
            Phase::Presale => "Presale",
            Phase::PublicSale => "Public Sale",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Phase::Paused => "Contract is paused; minting is halted",
            Phase::Whitelisting => "Whitelist-only minting is open",
            Phase::Presale => "Presale minting is open",
            Phase::PublicSale => "Metadata revealed; public minting is open",
        }
    }

    /// Label of the action that advances out of this phase, if any.
    pub fn advance_label(self) -> Option<&'static str> {
        match self {
            Phase::Paused => Some("Start Whitelisting"),
            Phase::Whitelisting => Some("Start Presale"),
            Phase::Presale => Some("Start Public Sale"),
            Phase::PublicSale => None,
        }
    }

    /// Fixed phase -> control-set table driving the dashboard.
    pub fn controls(self) -> &'static [Control] {
        use Control::*;
        match self {
            Phase::Paused => {
                &[Withdraw, EditMintCost, EditMaxPerTx, StartWhitelisting]
            }
            Phase::Whitelisting => {
                &[Withdraw, EditMintCost, EditMaxPerTx, StartPresale]
            }
            Phase::Presale => {
                &[Withdraw, EditMintCost, EditMaxPerTx, StartPublicSale]
            }
            Phase::PublicSale => &[Withdraw, EditMintCost, EditMaxPerTx],
        }
    }
}

/// Immutable snapshot of the contract, rebuilt wholesale on every fetch and
/// replaced rather than mutated.
#[derive(Clone, Debug)]
pub struct MintingState {
    pub balance: u64,
    pub max_mint_amount_per_tx: u64,
    pub mint_cost: u64,
    pub flags: ContractFlags,
    pub phase: Phase,
}

impl MintingState {
    pub fn new(
        balance: u64,
        max_mint_amount_per_tx: u64,
        mint_cost: u64,
        flags: ContractFlags,
    ) -> Self {
        Self {
            balance,
            max_mint_amount_per_tx,
            mint_cost,
            flags,
            phase: Phase::derive(flags),
        }
    }
}

/// Render a smallest-unit amount as a decimal string, trimming trailing
/// fractional zeros ("0.05", not "0.050000000000000000").
pub fn format_units(value: u128) -> String {
    let whole = value / NATIVE_SCALE;
    let frac = value % NATIVE_SCALE;
    if frac == 0 {
        return whole.to_string();
    }
    let mut frac = format!("{:0width$}", frac, width = NATIVE_DECIMALS as usize);
    while frac.ends_with('0') {
        frac.pop();
    }
    format!("{whole}.{frac}")
}

/// Parse a decimal string into the smallest-unit integer the contract
/// expects. Rejects malformed input, more fractional digits than the
/// denomination carries, and amounts that overflow u64.
pub fn parse_units(text: &str) -> Result<u64> {
    let text = text.trim();
    if text.is_empty() {
        return Err(eyre!("empty amount"));
    }
    let (whole, frac) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(eyre!("'{text}' is not a decimal amount"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return Err(eyre!("'{text}' is not a decimal amount"));
    }
    if frac.len() > NATIVE_DECIMALS as usize {
        return Err(eyre!(
            "'{text}' has more than {NATIVE_DECIMALS} fractional digits"
        ));
    }
    let whole_part: u128 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|_| eyre!("'{text}' is out of range"))?
    };
    let frac_part: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<width$}", width = NATIVE_DECIMALS as usize);
        padded
            .parse()
            .map_err(|_| eyre!("'{text}' is out of range"))?
    };
    let value = whole_part
        .checked_mul(NATIVE_SCALE)
        .and_then(|v| v.checked_add(frac_part))
        .ok_or_else(|| eyre!("'{text}' is out of range"))?;
    u64::try_from(value).map_err(|_| eyre!("'{text}' exceeds the contract's range"))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    fn flags(paused: bool, revealed: bool, whitelist: bool) -> ContractFlags {
        ContractFlags {
            paused,
            revealed,
            whitelist_mint_enabled: whitelist,
        }
    }

    #[test]
    fn derive__selects_exactly_one_phase_for_every_flag_combination() {
        // given: all 8 combinations of (paused, revealed, whitelist)
        let expected = [
            (flags(false, false, false), Phase::Presale),
            (flags(false, false, true), Phase::Whitelisting),
            (flags(false, true, false), Phase::PublicSale),
            (flags(false, true, true), Phase::Whitelisting),
            (flags(true, false, false), Phase::Paused),
            (flags(true, false, true), Phase::Paused),
            (flags(true, true, false), Phase::Paused),
            (flags(true, true, true), Phase::Paused),
        ];

        // when / then
        for (input, want) in expected {
            assert_eq!(Phase::derive(input), want, "flags {input:?}");
        }
    }

    #[test]
    fn derive__presale_iff_not_revealed_not_whitelisting_not_paused() {
        for paused in [false, true] {
            for revealed in [false, true] {
                for whitelist in [false, true] {
                    let derived = Phase::derive(flags(paused, revealed, whitelist));
                    let presale_expected = !revealed && !whitelist && !paused;
                    assert_eq!(
                        derived == Phase::Presale,
                        presale_expected,
                        "paused={paused} revealed={revealed} whitelist={whitelist}"
                    );
                }
            }
        }
    }

    #[test]
    fn controls__match_the_fixed_phase_table() {
        use Control::*;
        assert_eq!(
            Phase::Paused.controls(),
            &[Withdraw, EditMintCost, EditMaxPerTx, StartWhitelisting]
        );
        assert_eq!(
            Phase::Whitelisting.controls(),
            &[Withdraw, EditMintCost, EditMaxPerTx, StartPresale]
        );
        assert_eq!(
            Phase::Presale.controls(),
            &[Withdraw, EditMintCost, EditMaxPerTx, StartPublicSale]
        );
        assert_eq!(
            Phase::PublicSale.controls(),
            &[Withdraw, EditMintCost, EditMaxPerTx]
        );
    }

    #[test]
    fn controls__only_public_sale_has_no_advance_action() {
        assert!(Phase::Paused.advance_label().is_some());
        assert!(Phase::Whitelisting.advance_label().is_some());
        assert!(Phase::Presale.advance_label().is_some());
        assert!(Phase::PublicSale.advance_label().is_none());
    }

    #[test]
    fn format_units__renders_the_on_chain_cost_as_a_decimal() {
        assert_eq!(format_units(50_000_000_000_000_000), "0.05");
    }

    #[test]
    fn format_units__trims_trailing_zeros_and_keeps_whole_amounts_bare() {
        assert_eq!(format_units(0), "0");
        assert_eq!(format_units(1_000_000_000_000_000_000), "1");
        assert_eq!(format_units(1_500_000_000_000_000_000), "1.5");
        assert_eq!(format_units(1), "0.000000000000000001");
    }

    #[test]
    fn parse_units__accepts_decimal_amounts() {
        assert_eq!(parse_units("0.05").unwrap(), 50_000_000_000_000_000);
        assert_eq!(parse_units("1").unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(parse_units(".5").unwrap(), 500_000_000_000_000_000);
        assert_eq!(parse_units("0").unwrap(), 0);
    }

    #[test]
    fn parse_units__rejects_malformed_input() {
        assert!(parse_units("").is_err());
        assert!(parse_units(".").is_err());
        assert!(parse_units("abc").is_err());
        assert!(parse_units("1.2.3").is_err());
        assert!(parse_units("-1").is_err());
        assert!(parse_units("0.0000000000000000001").is_err());
        // u64::MAX is ~18.4 native units at 18 decimals
        assert!(parse_units("19").is_err());
    }

    #[test]
    fn minting_state__derives_its_phase_from_the_flags() {
        let state = MintingState::new(0, 5, 0, flags(false, false, true));
        assert_eq!(state.phase, Phase::Whitelisting);
    }

    proptest! {
        #[test]
        fn parse_units__inverts_format_units(value in any::<u64>()) {
            let rendered = format_units(u128::from(value));
            prop_assert_eq!(parse_units(&rendered).unwrap(), value);
        }
    }
}
