//! The IO resource manager.
//!
//! Owns the per-pin state table. `claim` checks capability and ownership and
//! applies the mode under one lock, so concurrent claims on a pin resolve to
//! exactly one winner.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use marionette_types::error::{MarionetteError, Result};

use crate::board::{self, PinSpec};
use crate::hal::PadDriver;
use crate::pin::{CapabilityMask, PadMode, PinId, Subsystem, owner_name};

/// Live state of one pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinState {
    pub id: PinId,
    pub capability: CapabilityMask,
    pub default_mode: PadMode,
    pub default_owner: Option<Subsystem>,
    pub current_mode: PadMode,
    pub current_owner: Option<Subsystem>,
}

impl From<PinSpec> for PinState {
    fn from(spec: PinSpec) -> Self {
        Self {
            id: spec.id,
            capability: spec.capability,
            default_mode: spec.default_mode,
            default_owner: spec.default_owner,
            current_mode: spec.default_mode,
            current_owner: spec.default_owner,
        }
    }
}

impl PinState {
    fn restore_defaults(&mut self) {
        self.current_mode = self.default_mode;
        self.current_owner = self.default_owner;
    }
}

/// Gatekeeper for every pad mode change.
pub struct IoManager {
    pins: Mutex<BTreeMap<PinId, PinState>>,
    driver: Arc<dyn PadDriver>,
}

impl IoManager {
    /// Build from an explicit table and push every pad to its default mode.
    pub fn new(table: Vec<PinSpec>, driver: Arc<dyn PadDriver>) -> Self {
        let pins: BTreeMap<PinId, PinState> = table
            .into_iter()
            .map(|spec| (spec.id, PinState::from(spec)))
            .collect();
        for state in pins.values() {
            driver.apply_mode(state.id, state.default_mode);
        }
        log::debug!("io manager tracking {} pins", pins.len());
        Self {
            pins: Mutex::new(pins),
            driver,
        }
    }

    /// Build with the stock board table.
    pub fn with_board(driver: Arc<dyn PadDriver>) -> Self {
        Self::new(board::pin_table(), driver)
    }

    pub fn driver(&self) -> &dyn PadDriver {
        self.driver.as_ref()
    }

    fn table(&self) -> MutexGuard<'_, BTreeMap<PinId, PinState>> {
        self.pins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unknown(pin: PinId) -> MarionetteError {
        MarionetteError::Argument(format!("pin {pin} is not on this board"))
    }

    /// Take ownership of `pin` for `subsystem` and apply `mode`.
    ///
    /// Succeeds when the subsystem is in the pin's capability mask and the pin
    /// is unowned or already owned by the same subsystem. On failure nothing
    /// changes.
    pub fn claim(&self, pin: PinId, mode: PadMode, subsystem: Subsystem) -> Result<()> {
        let mut table = self.table();
        let state = table.get_mut(&pin).ok_or_else(|| Self::unknown(pin))?;

        let owner_ok = state.current_owner.is_none() || state.current_owner == Some(subsystem);
        if !state.capability.contains(subsystem) || !owner_ok {
            log::debug!(
                "claim {pin} by {subsystem} refused (owner {})",
                owner_name(state.current_owner)
            );
            return Err(MarionetteError::ResourceConflict {
                pin: pin.to_string(),
                owner: owner_name(state.current_owner).to_string(),
                requested: subsystem.name().to_string(),
            });
        }

        self.driver.apply_mode(pin, mode);
        state.current_mode = mode;
        state.current_owner = Some(subsystem);
        Ok(())
    }

    /// Return `pin` to its default mode and owner. Idempotent.
    pub fn release(&self, pin: PinId) -> Result<()> {
        let mut table = self.table();
        let state = table.get_mut(&pin).ok_or_else(|| Self::unknown(pin))?;
        state.restore_defaults();
        self.driver.apply_mode(pin, state.default_mode);
        Ok(())
    }

    /// Current `(mode, owner)` of a pin.
    pub fn query(&self, pin: PinId) -> Result<(PadMode, Option<Subsystem>)> {
        let state = self.state(pin)?;
        Ok((state.current_mode, state.current_owner))
    }

    pub fn state(&self, pin: PinId) -> Result<PinState> {
        self.table().get(&pin).copied().ok_or_else(|| Self::unknown(pin))
    }

    /// Whether `subsystem` may ever claim `pin`.
    pub fn is_capable(&self, pin: PinId, subsystem: Subsystem) -> Result<bool> {
        Ok(self.state(pin)?.capability.contains(subsystem))
    }

    /// Pins currently held by `subsystem`, in table order.
    pub fn owned_by(&self, subsystem: Subsystem) -> Vec<PinId> {
        self.table()
            .values()
            .filter(|s| s.current_owner == Some(subsystem) && s.default_owner != Some(subsystem))
            .map(|s| s.id)
            .collect()
    }

    /// Release every pin.
    pub fn reset_all(&self) {
        let mut table = self.table();
        for state in table.values_mut() {
            state.restore_defaults();
            self.driver.apply_mode(state.id, state.default_mode);
        }
        log::info!("all pins restored to defaults");
    }
}
