//! Gear button state machine

use tracing::trace;

use crate::quantize::bucket;
use crate::types::{GearId, ShiftTable};

/// Default button of gear 1.
pub const DEFAULT_BUTTON_BASE: usize = 10;

/// Button edges to apply after a lever update, in order: release, then press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GearChange {
    pub release: Option<usize>,
    pub press: Option<usize>,
}

impl GearChange {
    pub fn is_empty(&self) -> bool {
        self.release.is_none() && self.press.is_none()
    }
}

/// Lever position tracker. Owns the current gear; the caller owns the
/// buttons and applies each [`GearChange`].
#[derive(Debug, Clone)]
pub struct Shifter {
    table: ShiftTable,
    button_base: usize,
    current: GearId,
}

impl Shifter {
    pub fn new(table: ShiftTable, button_base: usize) -> Self {
        Self {
            table,
            button_base,
            current: GearId::NEUTRAL,
        }
    }

    /// Gear for a raw lever position. Pure.
    pub fn gear_for(&self, x: i32, y: i32) -> GearId {
        let bx = bucket(x, self.table.x_buckets());
        let by = bucket(y, self.table.y_buckets());
        self.table.lookup(bx, by)
    }

    /// Button asserted while in `gear`; neutral has none, nor does a gear
    /// whose button number would overflow.
    pub fn button_for(&self, gear: GearId) -> Option<usize> {
        match gear.0 {
            0 => None,
            g => self.button_base.checked_add(usize::from(g - 1)),
        }
    }

    pub fn button_base(&self) -> usize {
        self.button_base
    }

    /// Feed a new lever position and get the button edges it causes.
    pub fn update(&mut self, x: i32, y: i32) -> GearChange {
        let gear = self.gear_for(x, y);
        if gear == self.current {
            return GearChange::default();
        }
        let change = GearChange {
            release: self.button_for(self.current),
            press: self.button_for(gear),
        };
        trace!(from = self.current.0, to = gear.0, "gear change");
        self.current = gear;
        change
    }

    pub fn current(&self) -> GearId {
        self.current
    }

    pub fn is_neutral(&self) -> bool {
        self.current.is_neutral()
    }

    pub fn table(&self) -> &ShiftTable {
        &self.table
    }

    /// Buttons this shifter may assert, lowest first.
    pub fn buttons(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=self.table.max_gear()).filter_map(|g| self.button_for(GearId(g)))
    }
}

impl Default for Shifter {
    fn default() -> Self {
        Self::new(ShiftTable::default(), DEFAULT_BUTTON_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gear_for_default_gate() {
        let shifter = Shifter::default();
        assert_eq!(shifter.gear_for(-32767, -32767), GearId(2));
        assert_eq!(shifter.gear_for(-32767, 32767), GearId(1));
        assert_eq!(shifter.gear_for(32767, 32767), GearId(7));
        assert_eq!(shifter.gear_for(0, 0), GearId::NEUTRAL);
    }

    #[test]
    fn test_button_numbering() {
        let shifter = Shifter::default();
        assert_eq!(shifter.button_for(GearId::NEUTRAL), None);
        assert_eq!(shifter.button_for(GearId(1)), Some(10));
        assert_eq!(shifter.button_for(GearId(8)), Some(17));
        assert_eq!(shifter.buttons().collect::<Vec<_>>(), (10..=17).collect::<Vec<_>>());
    }

    #[test]
    fn test_button_numbering_saturates_without_overflow() {
        let shifter = Shifter::new(ShiftTable::default(), usize::MAX);
        assert_eq!(shifter.button_for(GearId(1)), Some(usize::MAX));
        assert_eq!(shifter.button_for(GearId(2)), None);
        assert_eq!(shifter.buttons().collect::<Vec<_>>(), vec![usize::MAX]);
    }

    #[test]
    fn test_update_emits_release_then_press() {
        let mut shifter = Shifter::default();
        let change = shifter.update(-32767, 32767);
        assert_eq!(
            change,
            GearChange {
                release: None,
                press: Some(10)
            }
        );
        let change = shifter.update(-32767, -32767);
        assert_eq!(
            change,
            GearChange {
                release: Some(10),
                press: Some(11)
            }
        );
        assert!(shifter.update(-32767, -32767).is_empty());
        let change = shifter.update(0, 0);
        assert_eq!(
            change,
            GearChange {
                release: Some(11),
                press: None
            }
        );
        assert!(shifter.is_neutral());
    }
}
