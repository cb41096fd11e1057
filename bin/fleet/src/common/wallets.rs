use std::path::Path;

use fleet_deployer::Wallet;
use tracing::info;

use super::WalletError;

/// Loads wallets from a file holding one hex private key per line.
///
/// Blank lines and lines starting with `#` are skipped. File order is the batch order.
pub fn load_wallets(path: &Path) -> Result<Vec<Wallet>, WalletError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| WalletError::Read { path: path.to_path_buf(), source })?;
    let wallets = parse_wallets(&content)?;
    if wallets.is_empty() {
        return Err(WalletError::Empty(path.to_path_buf()));
    }
    info!(count = wallets.len(), path = %path.display(), "Loaded wallets");
    Ok(wallets)
}

/// Parses wallet file content. See [`load_wallets`].
pub fn parse_wallets(content: &str) -> Result<Vec<Wallet>, WalletError> {
    content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, key)| {
            key.parse::<Wallet>()
                .map_err(|e| WalletError::InvalidKey { line, reason: e.to_string() })
        })
        .collect()
}
