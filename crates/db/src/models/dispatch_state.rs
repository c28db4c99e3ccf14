//! Maps to the `dispatch_state` table.

use chaincast_core::cursor::{DispatchState, VersionedState};
use chaincast_core::error::CoreError;
use chaincast_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `dispatch_state` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DispatchStateRow {
    pub bot_id: String,
    pub last_index: i32,
    pub last_dispatch_at: Option<Timestamp>,
    pub window_count: i32,
    pub window_start: Timestamp,
    pub version: i64,
    pub lease_token: Option<Uuid>,
    pub lease_expires_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl DispatchStateRow {
    /// Convert the cursor columns into the domain state.
    pub fn to_versioned(&self) -> Result<VersionedState, CoreError> {
        let last_index = usize::try_from(self.last_index).map_err(|_| {
            CoreError::Validation(format!("negative last_index {}", self.last_index))
        })?;
        let window_count = u32::try_from(self.window_count).map_err(|_| {
            CoreError::Validation(format!("negative window_count {}", self.window_count))
        })?;
        Ok(VersionedState {
            state: DispatchState {
                last_index,
                last_dispatch_at: self.last_dispatch_at,
                window_count,
                window_start: self.window_start,
            },
            version: self.version,
        })
    }
}

/// Cursor columns as bound into INSERT/UPDATE statements.
#[derive(Debug, Clone, Copy)]
pub struct StateColumns {
    pub last_index: i32,
    pub last_dispatch_at: Option<Timestamp>,
    pub window_count: i32,
    pub window_start: Timestamp,
}

impl TryFrom<&DispatchState> for StateColumns {
    type Error = CoreError;

    fn try_from(state: &DispatchState) -> Result<Self, Self::Error> {
        Ok(Self {
            last_index: i32::try_from(state.last_index).map_err(|_| {
                CoreError::Validation(format!("last_index {} out of range", state.last_index))
            })?,
            last_dispatch_at: state.last_dispatch_at,
            window_count: i32::try_from(state.window_count).map_err(|_| {
                CoreError::Validation(format!(
                    "window_count {} out of range",
                    state.window_count
                ))
            })?,
            window_start: state.window_start,
        })
    }
}
