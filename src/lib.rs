pub mod client;
pub mod config;
pub mod state;
pub mod ui;
pub mod wallets;

pub mod minter_types {
    use fuels::macros::abigen;

    abigen!(Contract(
        name = "NftMinter",
        abi = "abi/nft-minter-abi.json"
    ));
}
