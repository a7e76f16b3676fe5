//! Shifter type definitions

use serde::{Deserialize, Serialize};

use crate::{ShifterError, ShifterResult};

pub const NEUTRAL_GEAR: u8 = 0;

/// Default gate layout: x buckets are rows, y buckets are columns.
pub const DEFAULT_TABLE: [[u8; 3]; 4] = [[2, 0, 1], [4, 0, 3], [6, 0, 5], [8, 0, 7]];

/// Gear selected by the lever. `0` is neutral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GearId(pub u8);

impl GearId {
    pub const NEUTRAL: Self = Self(NEUTRAL_GEAR);

    pub fn is_neutral(self) -> bool {
        self.0 == NEUTRAL_GEAR
    }
}

/// Static 2-D lookup from `(x bucket, y bucket)` to gear.
///
/// Serialized as a list of rows, one per x bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct ShiftTable {
    rows: Vec<Vec<u8>>,
    y_buckets: usize,
}

impl ShiftTable {
    /// Build a table; every row must have the same, non-zero length.
    pub fn new(rows: Vec<Vec<u8>>) -> ShifterResult<Self> {
        let y_buckets = rows.first().map(Vec::len).unwrap_or(0);
        if y_buckets == 0 {
            return Err(ShifterError::EmptyTable);
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != y_buckets) {
            return Err(ShifterError::RaggedTable {
                row,
                expected: y_buckets,
                actual: r.len(),
            });
        }
        Ok(Self { rows, y_buckets })
    }

    pub fn x_buckets(&self) -> usize {
        self.rows.len()
    }

    pub fn y_buckets(&self) -> usize {
        self.y_buckets
    }

    /// Gear at `(bx, by)`; out-of-range buckets read as neutral.
    pub fn lookup(&self, bx: usize, by: usize) -> GearId {
        self.rows
            .get(bx)
            .and_then(|row| row.get(by))
            .copied()
            .map(GearId)
            .unwrap_or(GearId::NEUTRAL)
    }

    /// Highest gear in the table.
    pub fn max_gear(&self) -> u8 {
        self.rows.iter().flatten().copied().max().unwrap_or(NEUTRAL_GEAR)
    }
}

impl Default for ShiftTable {
    fn default() -> Self {
        Self {
            rows: DEFAULT_TABLE.iter().map(|row| row.to_vec()).collect(),
            y_buckets: 3,
        }
    }
}

impl TryFrom<Vec<Vec<u8>>> for ShiftTable {
    type Error = ShifterError;

    fn try_from(rows: Vec<Vec<u8>>) -> ShifterResult<Self> {
        Self::new(rows)
    }
}

impl From<ShiftTable> for Vec<Vec<u8>> {
    fn from(table: ShiftTable) -> Self {
        table.rows
    }
}
