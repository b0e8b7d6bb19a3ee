use std::{collections::HashMap, sync::Arc};

use tracing::debug;

use crate::{
    error::{ConfigError, RegistryError},
    model::{Category, CommandDefinition, PayloadSource},
};

/// Built-in command names, matched before the interaction table.
pub const HELP_COMMAND: &str = "help";
pub const ENABLE_COMMAND: &str = "on";
pub const DISABLE_COMMAND: &str = "off";

const RESERVED: [&str; 3] = [HELP_COMMAND, ENABLE_COMMAND, DISABLE_COMMAND];

/// Alias-aware lookup table for interaction commands.
///
/// Filled once at startup and then shared read-only; every name and alias
/// points at the same `Arc<CommandDefinition>`.
#[derive(Debug, Clone)]
pub struct CommandRegistry {
    prefix: char,
    definitions: Vec<Arc<CommandDefinition>>,
    by_token: HashMap<String, usize>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new(prefix: char) -> Self {
        Self {
            prefix,
            definitions: Vec::new(),
            by_token: HashMap::new(),
        }
    }

    /// Build a registry from definitions in order, failing on the first
    /// collision.
    pub fn from_definitions(
        prefix: char,
        definitions: impl IntoIterator<Item = CommandDefinition>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new(prefix);
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    #[must_use]
    pub const fn prefix(&self) -> char {
        self.prefix
    }

    /// Insert the canonical name and every alias. A token may repeat within one
    /// definition but must not belong to another one.
    pub fn register(&mut self, definition: CommandDefinition) -> Result<(), RegistryError> {
        let tokens = core::iter::once(definition.name.as_str())
            .chain(definition.aliases.iter().map(String::as_str))
            .map(|raw| self.normalize(raw))
            .collect::<Vec<_>>();

        for token in &tokens {
            if token.chars().count() <= 1 {
                return Err(RegistryError::EmptyToken {
                    command: definition.name.clone(),
                });
            }
            if RESERVED.iter().any(|r| self.normalize(r) == *token) {
                return Err(RegistryError::ReservedToken {
                    token: token.clone(),
                    command: definition.name.clone(),
                });
            }
            if let Some(&idx) = self.by_token.get(token) {
                return Err(RegistryError::AliasCollision {
                    token: token.clone(),
                    existing: self.definitions[idx].name.clone(),
                    incoming: definition.name.clone(),
                });
            }
        }

        let idx = self.definitions.len();
        debug!(command = %definition.name, tokens = ?tokens, "Registered command");
        self.definitions.push(Arc::new(definition));
        for token in tokens {
            self.by_token.insert(token, idx);
        }
        Ok(())
    }

    /// Case-insensitive exact match on a prefixed token such as `!Hug`.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&Arc<CommandDefinition>> {
        let token = token.trim();
        if !token.starts_with(self.prefix) {
            return None;
        }
        self.by_token
            .get(&token.to_lowercase())
            .map(|&idx| &self.definitions[idx])
    }

    /// Definitions of one category in registration order. The iterator is
    /// `Clone`, so it can be walked more than once.
    pub fn list_by_category(
        &self,
        category: Category,
    ) -> impl Iterator<Item = &Arc<CommandDefinition>> + Clone {
        self.definitions
            .iter()
            .filter(move |def| def.category == category)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &Arc<CommandDefinition>> {
        self.definitions.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Every local asset directory must exist before messages are accepted.
    pub fn verify_assets(&self) -> Result<(), ConfigError> {
        for def in &self.definitions {
            if let PayloadSource::Local { directory } = &def.source
                && !directory.is_dir()
            {
                return Err(ConfigError::MissingAssetDirectory {
                    command: def.name.clone(),
                    path: directory.clone(),
                });
            }
        }
        Ok(())
    }

    /// Prefixed, lowercased form of a configured name.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let bare = trimmed.strip_prefix(self.prefix).unwrap_or(trimmed);
        format!("{}{}", self.prefix, bare.to_lowercase())
    }
}
