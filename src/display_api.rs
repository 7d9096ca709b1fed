//! Seam between the profile logic and the OS display stack
//!
//! Everything the tool needs from the OS is behind [`DisplayApi`]:
//! adapter inventory, the current topology, and the two-phase
//! validate/commit primitive. The Win32 implementation lives in
//! `win32`; tests script a fake.

use crate::adapter::AdapterDescriptor;
use crate::display_config::DisplayConfigSnapshot;
use crate::error::ProfileError;

/// Which phase of the two-phase set protocol to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Test the configuration without touching OS state.
    Validate,
    /// Make the configuration live. Atomic: fully applies or fails.
    Apply,
}

pub trait DisplayApi {
    /// Current adapter inventory, in a performance-preference order that
    /// is stable across runs absent real topology changes (ordinal
    /// positions in this sequence are load-bearing for matching).
    fn enumerate_adapters(&self) -> Result<Vec<AdapterDescriptor>, ProfileError>;

    /// Snapshot of the active display topology. Must retry internally on
    /// the transient buffer-size race and raise a typed error once the
    /// retry budget is exhausted.
    fn query_display_config(&self) -> Result<DisplayConfigSnapshot, ProfileError>;

    /// The OS set primitive. `Validate` never mutates OS state.
    fn set_display_config(
        &self,
        config: &DisplayConfigSnapshot,
        mode: SetMode,
    ) -> Result<(), ProfileError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Scripted [`DisplayApi`] for protocol and orchestration tests.
    ///
    /// `validate_ok` decides which snapshots pass the validate phase;
    /// every `set_display_config` call is recorded in order.
    pub struct FakeDisplay {
        pub adapters: Vec<AdapterDescriptor>,
        pub current: DisplayConfigSnapshot,
        pub validate_ok: Box<dyn Fn(&DisplayConfigSnapshot) -> bool>,
        pub calls: RefCell<Vec<SetMode>>,
        pub applied: RefCell<Option<DisplayConfigSnapshot>>,
    }

    impl FakeDisplay {
        pub fn new(adapters: Vec<AdapterDescriptor>) -> Self {
            Self {
                adapters,
                current: DisplayConfigSnapshot::default(),
                validate_ok: Box::new(|_| true),
                calls: RefCell::new(Vec::new()),
                applied: RefCell::new(None),
            }
        }

        /// Accept only snapshots for which `pred` holds.
        pub fn validating(mut self, pred: impl Fn(&DisplayConfigSnapshot) -> bool + 'static) -> Self {
            self.validate_ok = Box::new(pred);
            self
        }

        pub fn rejecting_everything(self) -> Self {
            self.validating(|_| false)
        }
    }

    impl DisplayApi for FakeDisplay {
        fn enumerate_adapters(&self) -> Result<Vec<AdapterDescriptor>, ProfileError> {
            Ok(self.adapters.clone())
        }

        fn query_display_config(&self) -> Result<DisplayConfigSnapshot, ProfileError> {
            Ok(self.current.clone())
        }

        fn set_display_config(
            &self,
            config: &DisplayConfigSnapshot,
            mode: SetMode,
        ) -> Result<(), ProfileError> {
            self.calls.borrow_mut().push(mode);
            if !(self.validate_ok)(config) {
                return Err(ProfileError::SetDisplayConfig { code: 31 });
            }
            if mode == SetMode::Apply {
                *self.applied.borrow_mut() = Some(config.clone());
            }
            Ok(())
        }
    }
}
