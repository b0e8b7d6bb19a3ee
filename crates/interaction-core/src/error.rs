use std::path::PathBuf;

use thiserror::Error;

/// Problems found while building the command table. All of them are fatal at
/// startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("command token `{token}` of `{incoming}` is already taken by `{existing}`")]
    AliasCollision {
        token: String,
        existing: String,
        incoming: String,
    },
    #[error("command token `{token}` of `{command}` shadows a built-in command")]
    ReservedToken { token: String, command: String },
    #[error("command `{command}` has an empty name or alias")]
    EmptyToken { command: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("asset directory {} for command `{command}` does not exist", path.display())]
    MissingAssetDirectory { command: String, path: PathBuf },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
