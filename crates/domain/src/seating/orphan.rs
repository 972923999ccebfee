//! Orphan-seat layout check.
//!
//! A selection is rejected when it would strand a single unsellable seat
//! between occupied seats or against a row boundary. The check is a
//! per-row tally heuristic, not a constraint solver; its exact edge-case
//! behavior is what the seating UX depends on, so the rules below are
//! deliberately literal:
//!
//! - around every selected seat, look one and two seats to each side
//!   (row boundaries count as occupied)
//! - "selected, available, selected" on either side rejects immediately
//! - "available then occupied" tallies a stray orphan; "available then
//!   available" tallies a safe gap
//! - two or more stray orphans across the whole selection reject
//! - a row with both a stray orphan and a safe gap rejects (ambiguous
//!   layout outcome, treated conservatively)

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Occupancy code for one seat position during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    /// Untouched and sellable.
    Available,
    /// Any existing non-available status (held or sold).
    Occupied,
    /// Part of the selection being validated.
    Selected,
}

/// One row's occupancy, indexed by seat number starting at 1.
#[derive(Debug, Clone)]
pub struct RowOccupancy {
    pub row: String,
    pub slots: Vec<Slot>,
}

impl RowOccupancy {
    /// Creates a row from its slots (index 0 = seat number 1).
    pub fn new(row: impl Into<String>, slots: Vec<Slot>) -> Self {
        Self {
            row: row.into(),
            slots,
        }
    }

    /// The code at a 0-based index; out-of-bounds counts as occupied.
    fn code(&self, index: i64) -> Slot {
        if index < 0 || index >= self.slots.len() as i64 {
            Slot::Occupied
        } else {
            self.slots[index as usize]
        }
    }
}

/// Why a selection was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrphanViolation {
    /// A single available seat is trapped between two selected seats.
    #[error("Selection traps a single available seat in row {row} next to seat {seat_number}")]
    TrappedSeat { row: String, seat_number: u32 },

    /// The selection creates two or more independent single-seat traps.
    #[error("Selection leaves {count} stranded single seats")]
    TooManyStrays { count: u32 },

    /// A row would end up with both a stray orphan and a safe gap.
    #[error("Selection leaves an ambiguous gap layout in row {row}")]
    AmbiguousRow { row: String },
}

/// Validates a selection against the affected rows.
///
/// The stray-orphan tally accumulates across all rows of the selection; the
/// stray/safe-gap conflict is evaluated per row.
pub fn validate_selection(rows: &[RowOccupancy]) -> Result<(), OrphanViolation> {
    let mut stray_total: u32 = 0;

    for row in rows {
        let mut stray: u32 = 0;
        let mut safe: u32 = 0;

        for (i, slot) in row.slots.iter().enumerate() {
            if *slot != Slot::Selected {
                continue;
            }

            for step in [-1i64, 1i64] {
                let near = row.code(i as i64 + step);
                if near != Slot::Available {
                    continue;
                }

                match row.code(i as i64 + 2 * step) {
                    Slot::Selected => {
                        return Err(OrphanViolation::TrappedSeat {
                            row: row.row.clone(),
                            seat_number: (i as i64 + step + 1) as u32,
                        });
                    }
                    Slot::Occupied => stray += 1,
                    Slot::Available => safe += 1,
                }
            }
        }

        if stray > 0 && safe > 0 {
            return Err(OrphanViolation::AmbiguousRow {
                row: row.row.clone(),
            });
        }

        stray_total += stray;
    }

    if stray_total >= 2 {
        return Err(OrphanViolation::TooManyStrays { count: stray_total });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a row from a compact pattern: '.' available, 'x' occupied,
    /// 's' selected.
    fn row(pattern: &str) -> RowOccupancy {
        let slots = pattern
            .chars()
            .map(|c| match c {
                '.' => Slot::Available,
                'x' => Slot::Occupied,
                's' => Slot::Selected,
                other => panic!("bad pattern char: {other}"),
            })
            .collect();
        RowOccupancy::new("A", slots)
    }

    #[test]
    fn lone_seat_in_empty_row_is_legal() {
        // Ten available seats, seat 5 selected: gaps on both sides are wide.
        assert!(validate_selection(&[row("....s.....")]).is_ok());
    }

    #[test]
    fn seat_between_two_occupied_neighbors_is_rejected() {
        // Seats 3 and 7 occupied, selecting 5 strands seats 4 and 6.
        let result = validate_selection(&[row("..x.s.x...")]);
        assert_eq!(
            result,
            Err(OrphanViolation::TooManyStrays { count: 2 })
        );
    }

    #[test]
    fn adjacent_pair_leaving_no_single_gap_is_legal() {
        // Seats 3 and 7 occupied, selecting 4 and 5 leaves only seat 6
        // stranded — a single stray, which is tolerated.
        assert!(validate_selection(&[row("..xss.x...")]).is_ok());
    }

    #[test]
    fn trapping_a_seat_between_selections_is_rejected() {
        // Selecting 4 and 6 traps seat 5.
        let result = validate_selection(&[row("...s.s....")]);
        assert!(matches!(result, Err(OrphanViolation::TrappedSeat { .. })));
    }

    #[test]
    fn stranding_the_first_seat_is_ambiguous() {
        // Selecting seat 2 leaves seat 1 against the boundary (stray) while
        // the right side still has a wide gap (safe): conservative reject.
        let result = validate_selection(&[row(".s........")]);
        assert!(matches!(result, Err(OrphanViolation::AmbiguousRow { .. })));
    }

    #[test]
    fn selecting_the_boundary_seat_is_legal() {
        assert!(validate_selection(&[row("s.........")]).is_ok());
    }

    #[test]
    fn filling_the_last_gap_is_legal() {
        // Row nearly full: x x s x — selecting the only gap creates nothing.
        assert!(validate_selection(&[row("xxsx")]).is_ok());
    }

    #[test]
    fn strays_accumulate_across_rows() {
        // One stray in each of two rows: rejected as two independent traps.
        let row_a = RowOccupancy::new(
            "A",
            row("s.x.......").slots,
        );
        let row_b = RowOccupancy::new(
            "B",
            row("s.x.......").slots,
        );
        // "s.x": selecting seat 1 leaves seat 2 stranded before occupied 3;
        // left side of seat 1 is the boundary so no safe gap appears.
        let result = validate_selection(&[row_a, row_b]);
        assert_eq!(result, Err(OrphanViolation::TooManyStrays { count: 2 }));
    }

    #[test]
    fn single_stray_within_one_row_is_tolerated() {
        assert!(validate_selection(&[row("s.x")]).is_ok());
    }

    #[test]
    fn selection_next_to_occupied_block_is_legal() {
        // Sitting directly next to an occupied block creates no gap at all.
        assert!(validate_selection(&[row("xs........")]).is_ok());
    }
}
