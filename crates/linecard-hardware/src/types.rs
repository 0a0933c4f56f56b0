//! Line card state as seen by observers and callers.

use linecard_core::{CardType, Result, SlotIndex};
use linecard_protocol::SlotStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the card seated in a slot.
///
/// Recorded when the card becomes ready or active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInfo {
    /// Raw card type code as reported by the firmware.
    pub card_type: u8,

    /// Hardware revision of the card.
    pub hw_revision: u16,

    /// Version of the INI blob the card was provisioned with.
    pub ini_version: u16,
}

impl CardInfo {
    /// Decode the card type code.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProtocolMismatch` for codes outside the catalogue.
    pub fn card_type(&self) -> Result<CardType> {
        CardType::try_from(self.card_type)
    }
}

impl From<&SlotStatus> for CardInfo {
    fn from(status: &SlotStatus) -> Self {
        Self {
            card_type: status.card_type,
            hw_revision: status.hw_revision,
            ini_version: status.minor_version,
        }
    }
}

/// Lifecycle stage of a slot, derived from its three flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// No card provisioned.
    Empty,
    /// Card provisioned, not yet ready.
    Provisioned,
    /// Card ready, activation requested.
    Ready,
    /// Card active and usable.
    Active,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Provisioned => write!(f, "provisioned"),
            Self::Ready => write!(f, "ready"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Point-in-time view of one slot.
///
/// `card` is present only while the card is ready or active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCardSnapshot {
    /// Slot this snapshot describes.
    pub slot_index: SlotIndex,

    /// Firmware has provisioned a card in the slot.
    pub provisioned: bool,

    /// Card is powered and ready to be activated.
    pub ready: bool,

    /// Card is active.
    pub active: bool,

    /// Identity of the card, valid while ready or active.
    pub card: Option<CardInfo>,
}

impl LineCardSnapshot {
    /// Most advanced lifecycle stage the flags describe.
    #[must_use]
    pub fn state(&self) -> SlotState {
        if self.active {
            SlotState::Active
        } else if self.ready {
            SlotState::Ready
        } else if self.provisioned {
            SlotState::Provisioned
        } else {
            SlotState::Empty
        }
    }
}

/// Flags a processing pass changed, each with its new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotChanges {
    pub provisioned: Option<bool>,
    pub ready: Option<bool>,
    pub active: Option<bool>,
}

impl SlotChanges {
    /// Check if the pass changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.provisioned.is_none() && self.ready.is_none() && self.active.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn snapshot(provisioned: bool, ready: bool, active: bool) -> LineCardSnapshot {
        LineCardSnapshot {
            slot_index: SlotIndex::new(1).unwrap(),
            provisioned,
            ready,
            active,
            card: None,
        }
    }

    #[rstest]
    #[case(false, false, false, SlotState::Empty)]
    #[case(true, false, false, SlotState::Provisioned)]
    #[case(true, true, false, SlotState::Ready)]
    #[case(true, true, true, SlotState::Active)]
    #[case(true, false, true, SlotState::Active)]
    fn test_state_from_flags(
        #[case] provisioned: bool,
        #[case] ready: bool,
        #[case] active: bool,
        #[case] expected: SlotState,
    ) {
        assert_eq!(snapshot(provisioned, ready, active).state(), expected);
    }

    #[test]
    fn test_card_info_from_status() {
        let status = SlotStatus {
            slot_index: 2,
            hw_revision: 0x0003,
            minor_version: 0x0011,
            card_type: 0x02,
            ..SlotStatus::default()
        };
        let info = CardInfo::from(&status);
        assert_eq!(info.ini_version, 0x0011);
        assert_eq!(info.card_type().unwrap(), CardType::Qsfp56x8);
    }

    #[test]
    fn test_unknown_card_type_is_reported() {
        let info = CardInfo {
            card_type: 0x7f,
            hw_revision: 0,
            ini_version: 0,
        };
        assert!(info.card_type().is_err());
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut snap = snapshot(true, true, true);
        snap.card = Some(CardInfo {
            card_type: 1,
            hw_revision: 2,
            ini_version: 3,
        });
        let json = serde_json::to_string(&snap).unwrap();
        let back: LineCardSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_slot_changes_is_empty() {
        assert!(SlotChanges::default().is_empty());
        let changes = SlotChanges {
            ready: Some(false),
            ..SlotChanges::default()
        };
        assert!(!changes.is_empty());
    }
}
