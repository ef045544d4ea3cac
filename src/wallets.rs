use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use fuels::{
    crypto::SecretKey,
    prelude::{
        Provider,
        Wallet,
        derivation::DEFAULT_DERIVATION_PATH,
        private_key::PrivateKeySigner,
    },
};
use rpassword::prompt_password;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub fn default_wallet_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".fuel").join("wallets"))
}

pub fn resolve_wallet_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => {
            let expanded = shellexpand::tilde(raw);
            Ok(PathBuf::from(expanded.into_owned()))
        }
        None => default_wallet_dir(),
    }
}

/// Locate the keystore file for a forc-wallet profile by name.
pub fn find_wallet(dir: &Path, name: &str) -> Result<PathBuf> {
    if !dir.exists() {
        return Err(eyre!(
            "Wallet directory {} does not exist",
            dir.to_string_lossy()
        ));
    }
    for entry in fs::read_dir(dir).wrap_err("Failed to read wallet directory")? {
        let path = entry.wrap_err("Failed to read wallet entry")?.path();
        if !path.is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some("wallet")
        {
            continue;
        }
        if path.file_stem().and_then(|stem| stem.to_str()) == Some(name) {
            return Ok(path);
        }
    }
    Err(eyre!(
        "Wallet '{name}' not found in {}",
        dir.to_string_lossy()
    ))
}

/// Prompt for the keystore password and turn the decrypted material into a
/// signing wallet. Keystores hold either a raw secret key or a mnemonic.
pub fn unlock_wallet(name: &str, path: &Path, provider: &Provider) -> Result<Wallet> {
    let password = prompt_password(format!("Enter password for wallet '{name}': "))
        .wrap_err("Failed to read wallet password")?;

    let secret = decrypt_key(path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for wallet '{name}'"))?;

    if let Ok(secret_key) = SecretKey::try_from(secret.as_slice()) {
        let signer = PrivateKeySigner::new(secret_key);
        return Ok(Wallet::new(signer, provider.clone()));
    }

    if let Ok(mnemonic) = std::str::from_utf8(&secret)
        && mnemonic.split_whitespace().count() >= 12
    {
        let secret_key = SecretKey::new_from_mnemonic_phrase_with_path(
            mnemonic,
            DEFAULT_DERIVATION_PATH,
        )?;
        return Ok(Wallet::new(
            PrivateKeySigner::new(secret_key),
            provider.clone(),
        ));
    }

    Err(eyre!("Wallet '{name}' contained unsupported key material"))
}
