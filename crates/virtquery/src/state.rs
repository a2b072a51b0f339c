//! Domain lifecycle state and reason decoding.
//!
//! The daemon reports a domain's lifecycle as a pair of integers: a
//! coarse state code and a reason code scoped to that state. Both are
//! decoded through fixed tables matching the `virDomainState` and
//! `virDomain*Reason` enumerations. A code without an entry is a
//! version mismatch with the daemon and surfaces as an error rather
//! than being defaulted.

use std::fmt;

use crate::error::{Error, Result};

/// Coarse lifecycle state of a domain (`virDomainState`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    NoState,
    Running,
    Blocked,
    Paused,
    Shutdown,
    Shutoff,
    Crashed,
    PmSuspended,
}

const NOSTATE_REASONS: &[&str] = &["VIR_DOMAIN_NOSTATE_UNKNOWN"];

const RUNNING_REASONS: &[&str] = &[
    "VIR_DOMAIN_RUNNING_UNKNOWN",
    "VIR_DOMAIN_RUNNING_BOOTED",
    "VIR_DOMAIN_RUNNING_MIGRATED",
    "VIR_DOMAIN_RUNNING_RESTORED",
    "VIR_DOMAIN_RUNNING_FROM_SNAPSHOT",
    "VIR_DOMAIN_RUNNING_UNPAUSED",
    "VIR_DOMAIN_RUNNING_MIGRATION_CANCELED",
    "VIR_DOMAIN_RUNNING_SAVE_CANCELED",
    "VIR_DOMAIN_RUNNING_WAKEUP",
    "VIR_DOMAIN_RUNNING_CRASHED",
    "VIR_DOMAIN_RUNNING_POSTCOPY",
];

const BLOCKED_REASONS: &[&str] = &["VIR_DOMAIN_BLOCKED_UNKNOWN"];

const PAUSED_REASONS: &[&str] = &[
    "VIR_DOMAIN_PAUSED_UNKNOWN",
    "VIR_DOMAIN_PAUSED_USER",
    "VIR_DOMAIN_PAUSED_MIGRATION",
    "VIR_DOMAIN_PAUSED_SAVE",
    "VIR_DOMAIN_PAUSED_DUMP",
    "VIR_DOMAIN_PAUSED_IOERROR",
    "VIR_DOMAIN_PAUSED_WATCHDOG",
    "VIR_DOMAIN_PAUSED_FROM_SNAPSHOT",
    "VIR_DOMAIN_PAUSED_SHUTTING_DOWN",
    "VIR_DOMAIN_PAUSED_SNAPSHOT",
    "VIR_DOMAIN_PAUSED_CRASHED",
    "VIR_DOMAIN_PAUSED_STARTING_UP",
    "VIR_DOMAIN_PAUSED_POSTCOPY",
    "VIR_DOMAIN_PAUSED_POSTCOPY_FAILED",
];

const SHUTDOWN_REASONS: &[&str] = &[
    "VIR_DOMAIN_SHUTDOWN_UNKNOWN",
    "VIR_DOMAIN_SHUTDOWN_USER",
];

const SHUTOFF_REASONS: &[&str] = &[
    "VIR_DOMAIN_SHUTOFF_UNKNOWN",
    "VIR_DOMAIN_SHUTOFF_SHUTDOWN",
    "VIR_DOMAIN_SHUTOFF_DESTROYED",
    "VIR_DOMAIN_SHUTOFF_CRASHED",
    "VIR_DOMAIN_SHUTOFF_MIGRATED",
    "VIR_DOMAIN_SHUTOFF_SAVED",
    "VIR_DOMAIN_SHUTOFF_FAILED",
    "VIR_DOMAIN_SHUTOFF_FROM_SNAPSHOT",
    "VIR_DOMAIN_SHUTOFF_DAEMON",
];

const CRASHED_REASONS: &[&str] = &[
    "VIR_DOMAIN_CRASHED_UNKNOWN",
    "VIR_DOMAIN_CRASHED_PANICKED",
];

const PMSUSPENDED_REASONS: &[&str] = &["VIR_DOMAIN_PMSUSPENDED_DISK_UNKNOWN"];

impl DomainState {
    /// All states, in state-code order.
    pub const ALL: [DomainState; 8] = [
        DomainState::NoState,
        DomainState::Running,
        DomainState::Blocked,
        DomainState::Paused,
        DomainState::Shutdown,
        DomainState::Shutoff,
        DomainState::Crashed,
        DomainState::PmSuspended,
    ];

    /// Decode a state code.
    pub fn from_code(code: i32) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(Error::UnknownStateCode(code))
    }

    /// The symbolic `VIR_DOMAIN_*` name of this state.
    pub const fn name(self) -> &'static str {
        match self {
            DomainState::NoState => "VIR_DOMAIN_NOSTATE",
            DomainState::Running => "VIR_DOMAIN_RUNNING",
            DomainState::Blocked => "VIR_DOMAIN_BLOCKED",
            DomainState::Paused => "VIR_DOMAIN_PAUSED",
            DomainState::Shutdown => "VIR_DOMAIN_SHUTDOWN",
            DomainState::Shutoff => "VIR_DOMAIN_SHUTOFF",
            DomainState::Crashed => "VIR_DOMAIN_CRASHED",
            DomainState::PmSuspended => "VIR_DOMAIN_PMSUSPENDED",
        }
    }

    /// The reason table for this state, indexed by reason code.
    pub const fn reasons(self) -> &'static [&'static str] {
        match self {
            DomainState::NoState => NOSTATE_REASONS,
            DomainState::Running => RUNNING_REASONS,
            DomainState::Blocked => BLOCKED_REASONS,
            DomainState::Paused => PAUSED_REASONS,
            DomainState::Shutdown => SHUTDOWN_REASONS,
            DomainState::Shutoff => SHUTOFF_REASONS,
            DomainState::Crashed => CRASHED_REASONS,
            DomainState::PmSuspended => PMSUSPENDED_REASONS,
        }
    }

    /// Decode a reason code scoped to this state.
    pub fn reason_name(self, code: i32) -> Result<&'static str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.reasons().get(i).copied())
            .ok_or(Error::UnknownReasonCode {
                state: self.name(),
                code,
            })
    }
}

impl fmt::Display for DomainState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded (state, reason) snapshot of a domain at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainStatus {
    pub state: DomainState,
    pub reason: &'static str,
}

impl DomainStatus {
    /// Decode a raw (state_code, reason_code) pair from the daemon.
    pub fn from_codes(state_code: i32, reason_code: i32) -> Result<Self> {
        let state = DomainState::from_code(state_code)?;
        let reason = state.reason_name(reason_code)?;
        Ok(Self { state, reason })
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.state.name(), self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn every_state_code_decodes() {
        for (code, state) in DomainState::ALL.iter().enumerate() {
            assert_eq!(DomainState::from_code(code as i32).unwrap(), *state);
        }
    }

    #[test]
    fn reason_tables_are_total_and_scoped() {
        let expected_lens = [1, 11, 1, 14, 2, 9, 2, 1];
        for (state, len) in DomainState::ALL.iter().zip(expected_lens) {
            assert_eq!(state.reasons().len(), len, "{state}");
            for code in 0..len {
                let reason = state.reason_name(code as i32).unwrap();
                assert!(!reason.is_empty());
                // Reason names belong to their parent state's namespace.
                assert!(reason.starts_with(state.name()));
            }
        }
    }

    #[test]
    fn paused_migration_decodes() {
        let status = DomainStatus::from_codes(3, 2).unwrap();
        assert_eq!(status.state.name(), "VIR_DOMAIN_PAUSED");
        assert_eq!(status.reason, "VIR_DOMAIN_PAUSED_MIGRATION");
    }

    #[test]
    fn unknown_state_code_is_an_error() {
        assert!(matches!(
            DomainState::from_code(8),
            Err(Error::UnknownStateCode(8))
        ));
        assert!(matches!(
            DomainState::from_code(-1),
            Err(Error::UnknownStateCode(-1))
        ));
    }

    #[test]
    fn unknown_reason_code_is_an_error() {
        assert!(matches!(
            DomainState::Blocked.reason_name(1),
            Err(Error::UnknownReasonCode {
                state: "VIR_DOMAIN_BLOCKED",
                code: 1
            })
        ));
    }
}
