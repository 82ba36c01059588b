//! Command table.
//!
//! An ordered registry of named commands and responses. Identifiers are
//! assigned by registration position, so host and firmware must register the
//! same entries in the same order. The table is assembled through a
//! [`CommandTableBuilder`] and is immutable once built.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::codec::FieldType;
use crate::error::{CommandRef, ProtocolError, ProtocolResult};
use crate::schema::CommandSpec;

/// One registered command or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    /// Symbolic name.
    pub name: String,
    /// Wire identifier (registration position).
    pub id: u16,
    /// Ordered field types.
    pub signature: Vec<FieldType>,
}

impl CommandEntry {
    /// Number of wire tokens a frame for this entry carries after its id.
    pub fn token_count(&self) -> usize {
        self.signature.iter().map(FieldType::token_count).sum()
    }
}

/// Accumulates registrations before the table is frozen.
#[derive(Debug, Default)]
pub struct CommandTableBuilder {
    entries: Vec<CommandEntry>,
    by_name: HashMap<String, u16>,
}

impl CommandTableBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its id.
    pub fn register(&mut self, name: &str, signature: &[FieldType]) -> ProtocolResult<u16> {
        if self.by_name.contains_key(name) {
            return Err(ProtocolError::DuplicateCommand(name.to_string()));
        }
        let id = u16::try_from(self.entries.len())
            .map_err(|_| ProtocolError::TableFull(name.to_string()))?;
        self.by_name.insert(name.to_string(), id);
        self.entries.push(CommandEntry {
            name: name.to_string(),
            id,
            signature: signature.to_vec(),
        });
        Ok(id)
    }

    /// Freeze the registrations.
    pub fn build(self) -> CommandTable {
        CommandTable {
            entries: self.entries,
            by_name: self.by_name,
        }
    }
}

/// Immutable, ordered command table.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
    by_name: HashMap<String, u16>,
}

impl CommandTable {
    /// Start a new table.
    pub fn builder() -> CommandTableBuilder {
        CommandTableBuilder::new()
    }

    /// Register every spec in order.
    pub fn from_schema(specs: &[CommandSpec]) -> ProtocolResult<Self> {
        let mut builder = CommandTableBuilder::new();
        for spec in specs {
            builder.register(spec.name, spec.signature)?;
        }
        Ok(builder.build())
    }

    /// Look up an entry by name.
    pub fn lookup_by_name(&self, name: &str) -> ProtocolResult<&CommandEntry> {
        self.by_name
            .get(name)
            .and_then(|id| self.entries.get(*id as usize))
            .ok_or_else(|| ProtocolError::UnknownCommand(CommandRef::Name(name.to_string())))
    }

    /// Look up an entry by wire id.
    pub fn lookup_by_id(&self, id: u16) -> ProtocolResult<&CommandEntry> {
        self.entries
            .get(id as usize)
            .ok_or(ProtocolError::UnknownCommand(CommandRef::Id(id)))
    }

    /// All entries in id order.
    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hex SHA-256 digest over every entry's id, name and signature.
    ///
    /// Two tables with the same fingerprint assign the same ids to the same
    /// signatures.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(entry.id.to_le_bytes());
            hasher.update(entry.name.as_bytes());
            hasher.update([0u8]);
            for ty in &entry.signature {
                hasher.update(ty.to_string().as_bytes());
                hasher.update([0u8]);
            }
            hasher.update([0xFFu8]);
        }
        hex::encode(hasher.finalize())
    }
}
