use crate::{
    config::CollectionConfig,
    minter_types::NftMinter,
    state::{
        self,
        ContractFlags,
        MintingState,
        Phase,
    },
    ui,
    wallets,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use fuels::prelude::{
    AssetId,
    ContractId,
    Execution,
    Provider,
    Wallet,
};
use std::{
    path::PathBuf,
    str::FromStr,
    time::Duration,
};
use tokio::time;
use tracing::{
    error,
    info,
    warn,
};

pub const DEFAULT_TESTNET_RPC_URL: &str = "https://testnet.fuel.network";
pub const DEFAULT_DEVNET_RPC_URL: &str = "https://devnet.fuel.network";
pub const DEFAULT_LOCAL_RPC_URL: &str = "http://localhost:4000/";

const POLL_INTERVAL: Duration = Duration::from_millis(5000);
const MAX_ERRORS: usize = 50;

#[derive(Clone, Debug)]
pub enum NetworkTarget {
    Testnet { url: String },
    Devnet { url: String },
    LocalNode { url: String },
}

impl NetworkTarget {
    pub fn url(&self) -> &str {
        match self {
            NetworkTarget::Testnet { url }
            | NetworkTarget::Devnet { url }
            | NetworkTarget::LocalNode { url } => url,
        }
    }
}

#[derive(Clone, Debug)]
pub enum WalletConfig {
    ForcKeystore { owner: String, dir: PathBuf },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub network: NetworkTarget,
    pub wallets: WalletConfig,
    pub collection: CollectionConfig,
}

/// One full read of the contract's owner-relevant storage plus its native
/// asset balance.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContractReadout {
    pub balance: u64,
    pub cost: u64,
    pub max_mint_amount_per_tx: u64,
    pub flags: ContractFlags,
}

/// The calls the console makes against the minting contract. The live
/// implementation talks to a Fuel node; tests substitute an in-memory fake.
/// Every mutating call resolves only once the transaction is confirmed.
pub trait MinterClient {
    fn read_state(&self) -> impl Future<Output = Result<ContractReadout>>;
    fn set_cost(&self, new_cost: u64) -> impl Future<Output = Result<()>>;
    fn set_max_mint_amount_per_tx(
        &self,
        new_max: u64,
    ) -> impl Future<Output = Result<()>>;
    fn pause(&self, state: bool) -> impl Future<Output = Result<()>>;
    fn set_whitelist_mint_enabled(
        &self,
        state: bool,
    ) -> impl Future<Output = Result<()>>;
    fn reveal(&self, base_uri: String) -> impl Future<Output = Result<()>>;
    fn withdraw(&self) -> impl Future<Output = Result<()>>;
}

pub struct FuelMinter {
    instance: NftMinter<Wallet>,
    contract_id: ContractId,
    base_asset_id: AssetId,
    provider: Provider,
}

impl FuelMinter {
    /// Connect to the node, unlock the owner wallet, and bind the contract
    /// instance. Returns the chain id the node reports so the caller can
    /// compare it against the collection config.
    pub async fn connect(
        url: &str,
        wallet_config: &WalletConfig,
        contract_id_str: &str,
    ) -> Result<(Self, u64)> {
        info!("Connecting to node at URL: {url}");
        let provider = Provider::connect(url)
            .await
            .wrap_err_with(|| format!("Failed to connect to provider at {url}"))?;

        let WalletConfig::ForcKeystore { owner, dir } = wallet_config;
        let keystore = wallets::find_wallet(dir, owner)
            .wrap_err("Unable to locate owner wallet")?;
        let wallet = wallets::unlock_wallet(owner, &keystore, &provider)?;

        let contract_id = ContractId::from_str(contract_id_str).map_err(|e| {
            eyre!("Collection config contains an invalid contract id: {e:?}")
        })?;

        let consensus_parameters = provider.consensus_parameters().await?;
        let chain_id = u64::from(consensus_parameters.chain_id());
        let base_asset_id = *consensus_parameters.base_asset_id();

        let instance = NftMinter::new(contract_id, wallet);
        Ok((
            Self {
                instance,
                contract_id,
                base_asset_id,
                provider,
            },
            chain_id,
        ))
    }
}

impl MinterClient for FuelMinter {
    async fn read_state(&self) -> Result<ContractReadout> {
        let methods = self.instance.methods();
        let cost = methods
            .cost()
            .simulate(Execution::state_read_only())
            .await?
            .value;
        let max_mint_amount_per_tx = methods
            .max_mint_amount_per_tx()
            .simulate(Execution::state_read_only())
            .await?
            .value;
        let paused = methods
            .paused()
            .simulate(Execution::state_read_only())
            .await?
            .value;
        let revealed = methods
            .revealed()
            .simulate(Execution::state_read_only())
            .await?
            .value;
        let whitelist_mint_enabled = methods
            .whitelist_mint_enabled()
            .simulate(Execution::state_read_only())
            .await?
            .value;
        let balance = self
            .provider
            .get_contract_asset_balance(&self.contract_id, &self.base_asset_id)
            .await?;
        Ok(ContractReadout {
            balance,
            cost,
            max_mint_amount_per_tx,
            flags: ContractFlags {
                paused,
                revealed,
                whitelist_mint_enabled,
            },
        })
    }

    async fn set_cost(&self, new_cost: u64) -> Result<()> {
        self.instance.methods().set_cost(new_cost).call().await?;
        Ok(())
    }

    async fn set_max_mint_amount_per_tx(&self, new_max: u64) -> Result<()> {
        self.instance
            .methods()
            .set_max_mint_amount_per_tx(new_max)
            .call()
            .await?;
        Ok(())
    }

    async fn pause(&self, state: bool) -> Result<()> {
        self.instance.methods().pause(state).call().await?;
        Ok(())
    }

    async fn set_whitelist_mint_enabled(&self, state: bool) -> Result<()> {
        self.instance
            .methods()
            .set_whitelist_mint_enabled(state)
            .call()
            .await?;
        Ok(())
    }

    async fn reveal(&self, base_uri: String) -> Result<()> {
        self.instance.methods().reveal(base_uri).call().await?;
        Ok(())
    }

    async fn withdraw(&self) -> Result<()> {
        self.instance.methods().withdraw().call().await?;
        Ok(())
    }
}

/// What the UI renders. Rebuilt from the controller on every draw.
#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub contract_id: String,
    pub expected_chain_id: u64,
    pub connected_chain_id: u64,
    pub network_ok: bool,
    pub state: Option<MintingState>,
    pub busy: bool,
    pub status: String,
    pub errors: Vec<String>,
}

pub struct AppController<C> {
    minter: C,
    collection: CollectionConfig,
    connected_chain_id: u64,
    state: Option<MintingState>,
    busy: bool,
    status: String,
    errors: Vec<String>,
}

impl<C> AppController<C> {
    pub fn new(
        minter: C,
        collection: CollectionConfig,
        connected_chain_id: u64,
    ) -> Self {
        let mut controller = Self {
            minter,
            collection,
            connected_chain_id,
            state: None,
            busy: false,
            status: String::from("Loading contract state..."),
            errors: Vec::new(),
        };
        if !controller.network_ok() {
            controller.push_errors(vec![format!(
                "Connected to chain id {} but the collection targets chain id {}; \
                 fetches and transactions are disabled",
                controller.connected_chain_id, controller.collection.chain_id
            )]);
            controller.status = String::from("Wrong network");
        }
        controller
    }

    pub fn network_ok(&self) -> bool {
        self.connected_chain_id == self.collection.chain_id
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    pub fn phase(&self) -> Option<Phase> {
        self.state.as_ref().map(|s| s.phase)
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            contract_id: self.collection.contract_id.clone(),
            expected_chain_id: self.collection.chain_id,
            connected_chain_id: self.connected_chain_id,
            network_ok: self.network_ok(),
            state: self.state.clone(),
            busy: self.busy,
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    fn push_errors(&mut self, mut items: Vec<String>) {
        if items.is_empty() {
            return;
        }
        for item in &items {
            error!("{}", item);
        }
        self.errors.append(&mut items);
        if self.errors.len() > MAX_ERRORS {
            let drain = self.errors.len() - MAX_ERRORS;
            self.errors.drain(0..drain);
        }
    }

    /// Common preconditions for every mutating action.
    fn action_ready(&mut self, action: &'static str) -> bool {
        if self.busy {
            warn!("{action} ignored; a transaction is already in flight");
            return false;
        }
        if !self.network_ok() {
            warn!("{action} ignored; connected to the wrong network");
            return false;
        }
        if self.state.is_none() {
            self.status = String::from("Contract state not loaded yet");
            return false;
        }
        true
    }

    fn phase_ready(&mut self, required: Phase, action: &'static str) -> bool {
        if !self.action_ready(action) {
            return false;
        }
        if self.phase() == Some(required) {
            return true;
        }
        self.status = format!(
            "{action} is only available in the {} phase",
            required.label()
        );
        false
    }
}

impl<C: MinterClient> AppController<C> {
    /// Replace the cached snapshot with a fresh read. Skipped entirely when
    /// the node's chain id does not match the collection config.
    pub async fn refresh(&mut self) -> Result<()> {
        if !self.network_ok() {
            warn!(
                connected = self.connected_chain_id,
                expected = self.collection.chain_id,
                "skipping state fetch on wrong network"
            );
            return Ok(());
        }
        let readout = self
            .minter
            .read_state()
            .await
            .wrap_err("Failed to read contract state")?;
        self.state = Some(MintingState::new(
            readout.balance,
            readout.max_mint_amount_per_tx,
            readout.cost,
            readout.flags,
        ));
        Ok(())
    }

    /// Record the action result and refetch so the dashboard reflects what
    /// actually landed on-chain, including after a mid-sequence failure.
    async fn conclude(&mut self, ok_status: &'static str, result: Result<()>) {
        match result {
            Ok(()) => {
                self.status = ok_status.to_string();
            }
            Err(err) => {
                self.status = String::from("An error occurred, please try again");
                self.push_errors(vec![format!("{err:#}")]);
            }
        }
        if let Err(err) = self.refresh().await {
            self.push_errors(vec![format!("State refetch failed: {err:#}")]);
        }
    }

    /// Unpause the contract and open whitelist-only minting. Only valid
    /// while the contract is paused.
    pub async fn start_whitelisting(&mut self) -> Result<()> {
        if !self.phase_ready(Phase::Paused, "Start Whitelisting") {
            return Ok(());
        }
        self.busy = true;
        self.status = String::from("Starting whitelist minting...");
        let result: Result<()> = async {
            self.minter
                .pause(false)
                .await
                .wrap_err("Unpausing the contract failed")?;
            self.minter
                .set_whitelist_mint_enabled(true)
                .await
                .wrap_err(
                    "Enabling whitelist minting failed; the contract is already \
                     unpaused on-chain",
                )?;
            Ok(())
        }
        .await;
        self.busy = false;
        self.conclude("Whitelist minting started", result).await;
        Ok(())
    }

    /// Close the whitelist and apply the presale price and cap. Only valid
    /// during whitelisting.
    pub async fn start_presale(&mut self) -> Result<()> {
        if !self.phase_ready(Phase::Whitelisting, "Start Presale") {
            return Ok(());
        }
        let cost = self.collection.presale.cost_units()?;
        let cap = self.collection.presale.max_mint_amount_per_tx;
        self.busy = true;
        self.status = String::from("Starting presale...");
        let result: Result<()> = async {
            self.minter
                .set_whitelist_mint_enabled(false)
                .await
                .wrap_err("Disabling whitelist minting failed")?;
            self.minter.set_cost(cost).await.wrap_err(
                "Setting the presale cost failed; whitelist minting is already \
                 disabled on-chain",
            )?;
            self.minter
                .set_max_mint_amount_per_tx(cap)
                .await
                .wrap_err(
                    "Setting the presale mint cap failed; the whitelist flag and \
                     cost are already committed on-chain",
                )?;
            Ok(())
        }
        .await;
        self.busy = false;
        self.conclude("Presale started", result).await;
        Ok(())
    }

    /// Reveal the metadata and apply the public sale price and cap. Only
    /// valid during the presale.
    pub async fn start_public_sale(&mut self) -> Result<()> {
        if !self.phase_ready(Phase::Presale, "Start Public Sale") {
            return Ok(());
        }
        let base_uri = self.collection.base_metadata_uri.clone();
        let cost = self.collection.public_sale.cost_units()?;
        let cap = self.collection.public_sale.max_mint_amount_per_tx;
        self.busy = true;
        self.status = String::from("Starting public sale...");
        let result: Result<()> = async {
            self.minter
                .reveal(base_uri)
                .await
                .wrap_err("Revealing the collection metadata failed")?;
            self.minter.set_cost(cost).await.wrap_err(
                "Setting the public sale cost failed; the metadata is already \
                 revealed on-chain",
            )?;
            self.minter
                .set_max_mint_amount_per_tx(cap)
                .await
                .wrap_err(
                    "Setting the public sale mint cap failed; the reveal and \
                     cost are already committed on-chain",
                )?;
            Ok(())
        }
        .await;
        self.busy = false;
        self.conclude("Public sale started", result).await;
        Ok(())
    }

    /// Set a new mint cost from the operator's decimal input, e.g. "0.05".
    pub async fn change_mint_cost(&mut self, input: &str) -> Result<()> {
        if !self.action_ready("Change mint cost") {
            return Ok(());
        }
        let new_cost = match state::parse_units(input) {
            Ok(value) => value,
            Err(err) => {
                self.status = String::from("Invalid mint cost");
                self.push_errors(vec![format!("Rejected mint cost: {err:#}")]);
                return Ok(());
            }
        };
        self.busy = true;
        self.status = format!(
            "Setting mint cost to {}...",
            state::format_units(u128::from(new_cost))
        );
        let result = self
            .minter
            .set_cost(new_cost)
            .await
            .wrap_err("Setting the mint cost failed");
        self.busy = false;
        self.conclude("Mint cost updated", result).await;
        Ok(())
    }

    pub async fn change_max_mint_amount(&mut self, new_max: u64) -> Result<()> {
        if !self.action_ready("Change max mint amount") {
            return Ok(());
        }
        if new_max == 0 {
            self.status = String::from("Invalid mint cap");
            self.push_errors(vec![String::from(
                "Rejected mint cap: the per-transaction cap must be positive",
            )]);
            return Ok(());
        }
        self.busy = true;
        self.status = format!("Setting max mint amount per tx to {new_max}...");
        let result = self
            .minter
            .set_max_mint_amount_per_tx(new_max)
            .await
            .wrap_err("Setting the max mint amount failed");
        self.busy = false;
        self.conclude("Max mint amount updated", result).await;
        Ok(())
    }

    /// Sweep the contract's native asset balance to the owner wallet.
    /// Available in every phase.
    pub async fn withdraw(&mut self) -> Result<()> {
        if !self.action_ready("Withdraw") {
            return Ok(());
        }
        self.busy = true;
        self.status = String::from("Withdrawing contract balance...");
        let result = self
            .minter
            .withdraw()
            .await
            .wrap_err("Withdrawing the contract balance failed");
        self.busy = false;
        self.conclude("Withdrawal confirmed", result).await;
        Ok(())
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let AppConfig {
        network,
        wallets,
        collection,
    } = config;
    let (minter, chain_id) =
        FuelMinter::connect(network.url(), &wallets, &collection.contract_id).await?;
    let mut controller = AppController::new(minter, collection, chain_id);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    info!("Starting UI");
    // UI bootstrap
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(&mut controller, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

fn show_processing<C>(
    controller: &mut AppController<C>,
    ui_state: &mut ui::UiState,
    message: &str,
) -> Result<()> {
    controller.set_status(message);
    ui::draw(ui_state, &controller.snapshot())
}

async fn run_loop<C: MinterClient>(
    controller: &mut AppController<C>,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    info!("Running app loop");
    let mut ticker = time::interval(POLL_INTERVAL);
    if let Err(err) = controller.refresh().await {
        controller.push_errors(vec![format!("{err:#}")]);
    } else if controller.network_ok() {
        controller.set_status("Ready");
    }
    ui::draw(ui_state, &controller.snapshot())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => { break; }
            _ = ticker.tick() => {
                if let Err(err) = controller.refresh().await {
                    controller.push_errors(vec![format!("{err:#}")]);
                }
                ui::draw(ui_state, &controller.snapshot())?;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, &controller.snapshot(), event)
                else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Refresh => {
                        show_processing(controller, ui_state, "Refreshing...")?;
                        if let Err(err) = controller.refresh().await {
                            controller.push_errors(vec![format!("{err:#}")]);
                        } else if controller.network_ok() {
                            controller.set_status("Ready");
                        }
                    }
                    ui::UserEvent::ConfirmAdvance => {
                        match controller.phase() {
                            Some(Phase::Paused) => {
                                show_processing(
                                    controller,
                                    ui_state,
                                    "Starting whitelist minting...",
                                )?;
                                controller.start_whitelisting().await?;
                            }
                            Some(Phase::Whitelisting) => {
                                show_processing(
                                    controller,
                                    ui_state,
                                    "Starting presale...",
                                )?;
                                controller.start_presale().await?;
                            }
                            Some(Phase::Presale) => {
                                show_processing(
                                    controller,
                                    ui_state,
                                    "Starting public sale...",
                                )?;
                                controller.start_public_sale().await?;
                            }
                            // Nothing to advance from the public sale
                            _ => {}
                        }
                    }
                    ui::UserEvent::ConfirmWithdraw => {
                        show_processing(
                            controller,
                            ui_state,
                            "Withdrawing contract balance...",
                        )?;
                        controller.withdraw().await?;
                    }
                    ui::UserEvent::SetCost(input) => {
                        show_processing(controller, ui_state, "Setting mint cost...")?;
                        controller.change_mint_cost(&input).await?;
                    }
                    ui::UserEvent::SetCap(new_max) => {
                        show_processing(controller, ui_state, "Setting mint cap...")?;
                        controller.change_max_mint_amount(new_max).await?;
                    }
                    ui::UserEvent::Redraw => {
                        // UI-only update; redraw without hitting the chain
                        ui::draw(ui_state, &controller.snapshot())?;
                        continue;
                    }
                }
                ui::draw(ui_state, &controller.snapshot())?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::config::PhasePreset;
    use std::sync::{
        Arc,
        Mutex,
    };

    #[derive(Debug, Default)]
    struct FakeChain {
        balance: u64,
        cost: u64,
        max_mint_amount_per_tx: u64,
        paused: bool,
        revealed: bool,
        whitelist_mint_enabled: bool,
        base_uri: Option<String>,
        calls: Vec<&'static str>,
        read_count: usize,
        fail_on: Option<&'static str>,
    }

    impl FakeChain {
        fn check(&mut self, call: &'static str) -> Result<()> {
            self.calls.push(call);
            if self.fail_on == Some(call) {
                return Err(eyre!("node rejected {call}"));
            }
            Ok(())
        }
    }

    #[derive(Clone)]
    struct FakeMinter {
        chain: Arc<Mutex<FakeChain>>,
    }

    impl MinterClient for FakeMinter {
        async fn read_state(&self) -> Result<ContractReadout> {
            let mut chain = self.chain.lock().unwrap();
            chain.read_count += 1;
            Ok(ContractReadout {
                balance: chain.balance,
                cost: chain.cost,
                max_mint_amount_per_tx: chain.max_mint_amount_per_tx,
                flags: ContractFlags {
                    paused: chain.paused,
                    revealed: chain.revealed,
                    whitelist_mint_enabled: chain.whitelist_mint_enabled,
                },
            })
        }

        async fn set_cost(&self, new_cost: u64) -> Result<()> {
            let mut chain = self.chain.lock().unwrap();
            chain.check("set_cost")?;
            chain.cost = new_cost;
            Ok(())
        }

        async fn set_max_mint_amount_per_tx(&self, new_max: u64) -> Result<()> {
            let mut chain = self.chain.lock().unwrap();
            chain.check("set_max_mint_amount_per_tx")?;
            chain.max_mint_amount_per_tx = new_max;
            Ok(())
        }

        async fn pause(&self, state: bool) -> Result<()> {
            let mut chain = self.chain.lock().unwrap();
            chain.check("pause")?;
            chain.paused = state;
            Ok(())
        }

        async fn set_whitelist_mint_enabled(&self, state: bool) -> Result<()> {
            let mut chain = self.chain.lock().unwrap();
            chain.check("set_whitelist_mint_enabled")?;
            chain.whitelist_mint_enabled = state;
            Ok(())
        }

        async fn reveal(&self, base_uri: String) -> Result<()> {
            let mut chain = self.chain.lock().unwrap();
            chain.check("reveal")?;
            chain.revealed = true;
            chain.base_uri = Some(base_uri);
            Ok(())
        }

        async fn withdraw(&self) -> Result<()> {
            let mut chain = self.chain.lock().unwrap();
            chain.check("withdraw")?;
            chain.balance = 0;
            Ok(())
        }
    }

    const CHAIN_ID: u64 = 0;

    fn collection() -> CollectionConfig {
        CollectionConfig {
            contract_id: "0x".to_string() + &"ab".repeat(32),
            chain_id: CHAIN_ID,
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

    async fn controller_on(
        chain: FakeChain,
        connected_chain_id: u64,
    ) -> (AppController<FakeMinter>, Arc<Mutex<FakeChain>>) {
        let chain = Arc::new(Mutex::new(chain));
        let minter = FakeMinter {
            chain: chain.clone(),
        };
        let mut controller =
            AppController::new(minter, collection(), connected_chain_id);
        controller.refresh().await.unwrap();
        (controller, chain)
    }

    fn paused_chain() -> FakeChain {
        FakeChain {
            balance: 1_000,
            cost: 10,
            max_mint_amount_per_tx: 1,
            paused: true,
            ..FakeChain::default()
        }
    }

    fn whitelisting_chain() -> FakeChain {
        FakeChain {
            balance: 1_000,
            cost: 10,
            max_mint_amount_per_tx: 1,
            whitelist_mint_enabled: true,
            ..FakeChain::default()
        }
    }

    fn presale_chain() -> FakeChain {
        FakeChain {
            balance: 1_000,
            cost: 50_000_000_000_000_000,
            max_mint_amount_per_tx: 3,
            ..FakeChain::default()
        }
    }

    #[tokio::test]
    async fn refresh__skips_the_fetch_on_a_chain_id_mismatch() {
        // given: the node reports a different chain than the collection targets
        let (controller, chain) = controller_on(presale_chain(), CHAIN_ID + 1).await;

        // then: nothing was read and no snapshot exists
        assert_eq!(chain.lock().unwrap().read_count, 0);
        assert!(controller.state.is_none());
        assert!(!controller.network_ok());
    }

    #[tokio::test]
    async fn refresh__derives_the_phase_from_the_fetched_flags() {
        let (controller, chain) = controller_on(whitelisting_chain(), CHAIN_ID).await;

        assert_eq!(chain.lock().unwrap().read_count, 1);
        assert_eq!(controller.phase(), Some(Phase::Whitelisting));
        let state = controller.state.unwrap();
        assert_eq!(state.balance, 1_000);
        assert_eq!(state.mint_cost, 10);
    }

    #[tokio::test]
    async fn change_mint_cost__submits_nothing_on_the_wrong_network() {
        let (mut controller, chain) =
            controller_on(presale_chain(), CHAIN_ID + 1).await;

        controller.change_mint_cost("0.05").await.unwrap();

        let chain = chain.lock().unwrap();
        assert!(chain.calls.is_empty());
        assert_eq!(chain.cost, 50_000_000_000_000_000);
    }

    #[tokio::test]
    async fn change_mint_cost__parses_the_decimal_input_into_smallest_units() {
        let (mut controller, chain) =
            controller_on(whitelisting_chain(), CHAIN_ID).await;

        controller.change_mint_cost("0.07").await.unwrap();

        let chain = chain.lock().unwrap();
        assert_eq!(chain.calls, vec!["set_cost"]);
        assert_eq!(chain.cost, 70_000_000_000_000_000);
        // one initial fetch plus exactly one refetch after the action
        assert_eq!(chain.read_count, 2);
        assert!(!controller.busy());
    }

    #[tokio::test]
    async fn change_mint_cost__rejects_malformed_input_without_submitting() {
        let (mut controller, chain) = controller_on(presale_chain(), CHAIN_ID).await;

        controller.change_mint_cost("five").await.unwrap();

        assert!(chain.lock().unwrap().calls.is_empty());
        assert!(!controller.errors.is_empty());
    }

    #[tokio::test]
    async fn change_max_mint_amount__rejects_a_zero_cap() {
        let (mut controller, chain) = controller_on(presale_chain(), CHAIN_ID).await;

        controller.change_max_mint_amount(0).await.unwrap();

        assert!(chain.lock().unwrap().calls.is_empty());
        assert!(!controller.errors.is_empty());
    }

    #[tokio::test]
    async fn withdraw__sweeps_the_balance_and_refetches_exactly_once() {
        let (mut controller, chain) = controller_on(presale_chain(), CHAIN_ID).await;

        controller.withdraw().await.unwrap();

        let snapshot = controller.snapshot();
        let chain = chain.lock().unwrap();
        assert_eq!(chain.calls, vec!["withdraw"]);
        assert_eq!(chain.read_count, 2);
        assert!(!snapshot.busy);
        assert_eq!(snapshot.state.unwrap().balance, 0);
    }

    #[tokio::test]
    async fn withdraw__is_available_in_every_phase() {
        for chain in [paused_chain(), whitelisting_chain(), presale_chain()] {
            let (mut controller, chain) = controller_on(chain, CHAIN_ID).await;
            controller.withdraw().await.unwrap();
            assert_eq!(chain.lock().unwrap().calls, vec!["withdraw"]);
        }
    }

    #[tokio::test]
    async fn start_whitelisting__unpauses_then_enables_the_whitelist() {
        let (mut controller, chain) = controller_on(paused_chain(), CHAIN_ID).await;

        controller.start_whitelisting().await.unwrap();

        let chain = chain.lock().unwrap();
        assert_eq!(chain.calls, vec!["pause", "set_whitelist_mint_enabled"]);
        assert!(!chain.paused);
        assert!(chain.whitelist_mint_enabled);
        assert_eq!(controller.phase(), Some(Phase::Whitelisting));
    }

    #[tokio::test]
    async fn start_whitelisting__requires_the_paused_phase() {
        let (mut controller, chain) = controller_on(presale_chain(), CHAIN_ID).await;

        controller.start_whitelisting().await.unwrap();

        assert!(chain.lock().unwrap().calls.is_empty());
        assert_eq!(controller.phase(), Some(Phase::Presale));
    }

    #[tokio::test]
    async fn start_presale__applies_the_configured_presets_in_order() {
        let (mut controller, chain) =
            controller_on(whitelisting_chain(), CHAIN_ID).await;

        controller.start_presale().await.unwrap();

        let chain = chain.lock().unwrap();
        assert_eq!(
            chain.calls,
            vec![
                "set_whitelist_mint_enabled",
                "set_cost",
                "set_max_mint_amount_per_tx"
            ]
        );
        assert_eq!(chain.cost, 50_000_000_000_000_000);
        assert_eq!(chain.max_mint_amount_per_tx, 3);
        assert_eq!(controller.phase(), Some(Phase::Presale));
    }

    #[tokio::test]
    async fn start_presale__surfaces_a_mid_sequence_failure_and_refetches() {
        // given: the cost update will be rejected after the whitelist flag lands
        let mut chain = whitelisting_chain();
        chain.fail_on = Some("set_cost");
        let (mut controller, chain) = controller_on(chain, CHAIN_ID).await;

        // when
        controller.start_presale().await.unwrap();

        // then: the sequence stopped at the failed step and the refetched
        // snapshot reflects the partially committed state
        let chain = chain.lock().unwrap();
        assert_eq!(chain.calls, vec!["set_whitelist_mint_enabled", "set_cost"]);
        assert!(!chain.whitelist_mint_enabled);
        assert_eq!(chain.cost, 10);
        assert!(!controller.busy());
        assert_eq!(controller.phase(), Some(Phase::Presale));
        assert!(
            controller
                .errors
                .iter()
                .any(|e| e.contains("already") && e.contains("disabled"))
        );
    }

    #[tokio::test]
    async fn start_public_sale__reveals_with_the_configured_base_uri() {
        let (mut controller, chain) = controller_on(presale_chain(), CHAIN_ID).await;

        controller.start_public_sale().await.unwrap();

        let chain = chain.lock().unwrap();
        assert_eq!(
            chain.calls,
            vec!["reveal", "set_cost", "set_max_mint_amount_per_tx"]
        );
        assert_eq!(chain.base_uri.as_deref(), Some("ipfs://QmBaseUri/"));
        assert_eq!(chain.cost, 100_000_000_000_000_000);
        assert_eq!(chain.max_mint_amount_per_tx, 5);
        assert_eq!(controller.phase(), Some(Phase::PublicSale));
    }

    #[tokio::test]
    async fn start_public_sale__requires_the_presale_phase() {
        let (mut controller, chain) = controller_on(paused_chain(), CHAIN_ID).await;

        controller.start_public_sale().await.unwrap();

        assert!(chain.lock().unwrap().calls.is_empty());
        assert_eq!(controller.phase(), Some(Phase::Paused));
    }

    #[tokio::test]
    async fn push_errors__caps_the_error_log() {
        let (mut controller, _chain) = controller_on(presale_chain(), CHAIN_ID).await;

        controller.push_errors(
            (0..2 * MAX_ERRORS).map(|i| format!("err {i}")).collect(),
        );

        assert_eq!(controller.errors.len(), MAX_ERRORS);
        assert_eq!(controller.errors.last().unwrap(), "err 99");
    }
}
