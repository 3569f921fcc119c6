//! Register: a named, tenant-owned ledger chain.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::RegisterId;

/// Maximum register name length, in characters.
pub const MAX_REGISTER_NAME_LEN: usize = 38;

/// Operational status of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterStatus {
    Offline,
    Online,
    Checking,
    Recovery,
}

/// A register and its chain head.
///
/// Only `height` and `status` change after creation. `height` is the number
/// of sealed dockets and advances solely through an atomic seal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub id: RegisterId,
    pub name: String,
    pub height: u64,
    pub status: RegisterStatus,
    pub advertise: bool,
    pub is_full_replica: bool,
    pub tenant_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Parameters for creating a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRegister {
    pub name: String,
    pub tenant_id: String,
    pub advertise: bool,
    pub is_full_replica: bool,
}

impl NewRegister {
    pub fn new(name: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tenant_id: tenant_id.into(),
            advertise: false,
            is_full_replica: true,
        }
    }

    pub fn advertise(mut self, advertise: bool) -> Self {
        self.advertise = advertise;
        self
    }

    pub fn full_replica(mut self, full: bool) -> Self {
        self.is_full_replica = full;
        self
    }

    /// Check name and tenant rules.
    pub fn validate(&self) -> Result<(), CoreError> {
        let chars = self.name.chars().count();
        if chars == 0 || chars > MAX_REGISTER_NAME_LEN {
            return Err(CoreError::InvalidRegister(format!(
                "name must be 1..={MAX_REGISTER_NAME_LEN} characters, got {chars}"
            )));
        }
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidRegister("name is blank".into()));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(CoreError::InvalidRegister("tenant id is empty".into()));
        }
        Ok(())
    }

    /// Validate and materialize a fresh register at height 0.
    pub fn into_register(self, id: RegisterId, now: i64) -> Result<Register, CoreError> {
        self.validate()?;
        Ok(Register {
            id,
            name: self.name,
            height: 0,
            status: RegisterStatus::Offline,
            advertise: self.advertise,
            is_full_replica: self.is_full_replica,
            tenant_id: self.tenant_id,
            created_at: now,
            updated_at: now,
        })
    }
}
