//! FILENAME: core/layout-engine/src/anchor.rs
//! PURPOSE: Classifies formula row references against a section chain and
//! resolves them against the final plan.
//! CONTEXT: A reference is captured once, in template coordinates, as an
//! anchor that says what it points at ("the same record one section up",
//! "the last record of section C", "the second trailer row of D"). After
//! the reshape the anchor is resolved through the plan, never by adding an
//! offset to the old row.

use crate::plan::RowShiftPlan;
use crate::section::{RowSlot, SectionChain};
use parser::{RefPosition, RowRefSite};

/// Which record of a section a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordIndex {
    /// Same record as the formula's own, shifted by `delta`. `original` is
    /// the template record, used when the shifted index leaves the section.
    Relative { delta: i64, original: u32 },
    /// Opening bound of a range over the whole section.
    First,
    /// A specific template record, wherever it ends up.
    Nth(u32),
    /// Closing bound of a range over the whole section.
    Last,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAnchor {
    Fixed(u32),
    Record {
        section: usize,
        index: RecordIndex,
        phase: u32,
    },
    Trailer {
        section: usize,
        offset: u32,
    },
    Below {
        offset: u32,
    },
}

/// Classifies one reference into `target`. `home` is the formula's own slot
/// on its sheet (`Above` when that sheet is not reshaped). `partner` is the
/// row of the other bound when the reference opens or closes a range.
pub fn classify(
    site: &RowRefSite,
    row: u32,
    partner: Option<u32>,
    home: RowSlot,
    same_sheet: bool,
    target: &SectionChain,
) -> RowAnchor {
    match target.locate(row) {
        RowSlot::Above => RowAnchor::Fixed(row),
        RowSlot::Below { offset } => RowAnchor::Below { offset },
        RowSlot::Trailer { section, offset } => RowAnchor::Trailer { section, offset },
        RowSlot::Record {
            section,
            record,
            phase,
        } => {
            let last = target.sections[section].last_record();
            // A range inside the formula's own record (`SUM(I74:T74)` on row
            // 74) is row-local, not a bound of the whole section.
            let spans_records = partner.is_some_and(|other| match target.locate(other) {
                RowSlot::Record {
                    section: s, record: r, ..
                } => s != section || r != record,
                _ => true,
            });
            let on_own_record = same_sheet
                && matches!(home, RowSlot::Record { section: s, record: r, .. } if s == section && r == record);
            let section_bound = spans_records || !on_own_record;
            let index = match site.position {
                RefPosition::RangeStart | RefPosition::RowSpanStart if record == 0 && section_bound => {
                    RecordIndex::First
                }
                RefPosition::RangeEnd | RefPosition::RowSpanEnd if record == last && section_bound => {
                    RecordIndex::Last
                }
                _ => match home {
                    RowSlot::Record { record: own, .. } if !site.absolute => RecordIndex::Relative {
                        delta: record as i64 - own as i64,
                        original: record,
                    },
                    _ => RecordIndex::Nth(record),
                },
            };
            RowAnchor::Record {
                section,
                index,
                phase,
            }
        }
    }
}

/// True when the sheet-local insertion primitive already leaves this
/// reference pointing at the right row, so the formula need not be rebuilt.
pub fn survives_insertion(anchor: &RowAnchor, same_sheet: bool, home: RowSlot, target: &SectionChain) -> bool {
    match *anchor {
        RowAnchor::Fixed(_) => true,
        RowAnchor::Below { .. } | RowAnchor::Record { index: RecordIndex::Nth(_), .. } => same_sheet,
        RowAnchor::Trailer { .. } => false,
        RowAnchor::Record {
            index: RecordIndex::First | RecordIndex::Last,
            ..
        } => false,
        RowAnchor::Record {
            section,
            index: RecordIndex::Relative { original, .. },
            ..
        } => {
            let RowSlot::Record {
                section: own_section,
                record: own,
                ..
            } = home
            else {
                return false;
            };
            let template = target.sections[section].template_record;
            same_sheet && own_section == section && (own <= template) == (original <= template)
        }
    }
}

/// Final row of an anchor. `own_record` is the formula's final record index
/// when it lives in a data block. Only `Fixed` anchors resolve without a plan.
pub fn resolve(anchor: &RowAnchor, plan: Option<&RowShiftPlan>, own_record: Option<u32>) -> Option<u32> {
    if let RowAnchor::Fixed(row) = *anchor {
        return Some(row);
    }
    let plan = plan?;
    let row = match *anchor {
        RowAnchor::Fixed(row) => row,
        RowAnchor::Below { offset } => plan.below_row(offset),
        RowAnchor::Trailer { section, offset } => plan.trailer_row(section, offset),
        RowAnchor::Record {
            section,
            index,
            phase,
        } => {
            let count = plan.record_count(section);
            let record = match index {
                RecordIndex::First => 0,
                RecordIndex::Last => count - 1,
                RecordIndex::Nth(k) => plan.remap_record(section, k),
                RecordIndex::Relative { delta, original } => {
                    let shifted = own_record.map(|own| own as i64 + delta);
                    match shifted {
                        Some(k) if k >= 0 && k < count as i64 => k as u32,
                        _ => plan.remap_record(section, original),
                    }
                }
            };
            plan.record_row(section, record, phase)
        }
    };
    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;

    fn chain() -> SectionChain {
        SectionChain::from_config(&LayoutConfig::default().primary.chain).unwrap()
    }

    fn site(position: RefPosition, absolute: bool) -> RowRefSite {
        RowRefSite {
            sheet: None,
            col: Some("I".to_string()),
            absolute,
            position,
        }
    }

    fn record_home(section: usize, record: u32) -> RowSlot {
        RowSlot::Record {
            section,
            record,
            phase: 0,
        }
    }

    #[test]
    fn range_bounds_become_first_and_last() {
        let chain = chain();
        let start = classify(&site(RefPosition::RangeStart, false), 55, Some(74), RowSlot::Above, false, &chain);
        let end = classify(&site(RefPosition::RangeEnd, false), 74, Some(55), RowSlot::Above, false, &chain);
        assert_eq!(
            start,
            RowAnchor::Record { section: 0, index: RecordIndex::First, phase: 0 }
        );
        assert_eq!(
            end,
            RowAnchor::Record { section: 0, index: RecordIndex::Last, phase: 0 }
        );
    }

    #[test]
    fn ranges_inside_the_own_record_stay_relative() {
        let chain = chain();
        let home = record_home(0, 19);
        let start = classify(&site(RefPosition::RangeStart, false), 74, Some(74), home, true, &chain);
        let end = classify(&site(RefPosition::RangeEnd, false), 74, Some(74), home, true, &chain);
        let relative = RowAnchor::Record {
            section: 0,
            index: RecordIndex::Relative { delta: 0, original: 19 },
            phase: 0,
        };
        assert_eq!(start, relative);
        assert_eq!(end, relative);
        assert!(survives_insertion(&end, true, home, &chain));

        // The same range seen from another record or sheet is a section bound.
        let elsewhere = classify(&site(RefPosition::RangeEnd, false), 74, Some(74), record_home(0, 3), true, &chain);
        assert!(matches!(elsewhere, RowAnchor::Record { index: RecordIndex::Last, .. }));
        let other_sheet = classify(&site(RefPosition::RangeEnd, false), 74, Some(74), home, false, &chain);
        assert!(matches!(other_sheet, RowAnchor::Record { index: RecordIndex::Last, .. }));

        // A running total from the template record still closes on the section.
        let running = classify(&site(RefPosition::RangeEnd, false), 74, Some(55), home, true, &chain);
        assert!(matches!(running, RowAnchor::Record { index: RecordIndex::Last, .. }));
    }

    #[test]
    fn record_homes_get_relative_anchors() {
        let chain = chain();
        let home = record_home(4, 3);
        let anchor = classify(&site(RefPosition::Cell, false), 58, None, home, true, &chain);
        assert_eq!(
            anchor,
            RowAnchor::Record {
                section: 0,
                index: RecordIndex::Relative { delta: 0, original: 3 },
                phase: 0
            }
        );
        assert!(!survives_insertion(&anchor, true, home, &chain));

        let absolute = classify(&site(RefPosition::Cell, true), 58, None, home, true, &chain);
        assert!(matches!(absolute, RowAnchor::Record { index: RecordIndex::Nth(3), .. }));
    }

    #[test]
    fn same_section_same_side_survives() {
        let chain = chain();
        let home = record_home(1, 19);
        let own_row = classify(&site(RefPosition::Cell, false), 97, None, home, true, &chain);
        let previous = classify(&site(RefPosition::Cell, false), 96, None, home, true, &chain);
        assert!(survives_insertion(&own_row, true, home, &chain));
        assert!(survives_insertion(&previous, true, home, &chain));
        assert!(!survives_insertion(&own_row, false, home, &chain));
        let header = classify(&site(RefPosition::Cell, true), 53, None, home, true, &chain);
        assert!(survives_insertion(&header, false, home, &chain));
    }

    #[test]
    fn trailer_references_are_rebuilt() {
        let chain = chain();
        let anchor = classify(&site(RefPosition::Cell, true), 146, None, record_home(4, 0), true, &chain);
        assert_eq!(anchor, RowAnchor::Trailer { section: 3, offset: 2 });
        assert!(!survives_insertion(&anchor, true, record_home(4, 0), &chain));
    }

    #[test]
    fn resolves_against_plan() {
        let chain = chain();
        let plan = RowShiftPlan::compute(&chain, 25, 500).unwrap();
        let relative = RowAnchor::Record {
            section: 1,
            index: RecordIndex::Relative { delta: 0, original: 19 },
            phase: 0,
        };
        assert_eq!(resolve(&relative, Some(&plan), Some(22)), Some(83 + 22));
        assert_eq!(resolve(&relative, Some(&plan), None), Some(83 + 19));

        let last = RowAnchor::Record { section: 2, index: RecordIndex::Last, phase: 0 };
        assert_eq!(resolve(&last, Some(&plan), None), Some(111 + 24));
        assert_eq!(resolve(&RowAnchor::Trailer { section: 3, offset: 2 }, Some(&plan), None), Some(166));
        assert_eq!(resolve(&RowAnchor::Below { offset: 0 }, Some(&plan), None), Some(195));
        assert_eq!(resolve(&RowAnchor::Fixed(53), None, None), Some(53));
        assert_eq!(resolve(&last, None, None), None);
    }

    #[test]
    fn out_of_range_relative_falls_back_to_template_record() {
        let chain = chain();
        let plan = RowShiftPlan::compute(&chain, 22, 500).unwrap();
        let running = RowAnchor::Record {
            section: 0,
            index: RecordIndex::Relative { delta: 5, original: 5 },
            phase: 0,
        };
        assert_eq!(resolve(&running, Some(&plan), Some(21)), Some(60));
    }
}
