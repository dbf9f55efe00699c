//! FILENAME: core/layout-engine/src/plan.rs
//! PURPOSE: Row-shift planning for one batch.
//! CONTEXT: Given the number of records and a chain, computes how far every
//! section moves once the sections above it have grown. The plan is the
//! single source of truth for final row positions: the insertion engine,
//! the reconciler and record placement all ask it instead of doing their
//! own arithmetic.

use crate::error::StructuralError;
use crate::section::{RowSlot, Section, SectionChain};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionShift {
    /// Records added beyond the section's capacity.
    pub extra_records: u32,
    /// Rows added to the section (`extra_records * stride`).
    pub extra_rows: u32,
    /// Rows added by all sections above this one.
    pub cumulative_offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowShiftPlan {
    pub chain: SectionChain,
    pub total_count: u32,
    pub shifts: Vec<SectionShift>,
}

impl RowShiftPlan {
    pub fn compute(chain: &SectionChain, total_count: u32, ceiling: u32) -> Result<Self, StructuralError> {
        if total_count > ceiling {
            return Err(StructuralError::CapacityExceeded {
                count: total_count,
                ceiling,
            });
        }
        let mut shifts: Vec<SectionShift> = Vec::with_capacity(chain.sections.len());
        for (index, section) in chain.sections.iter().enumerate() {
            let extra_records = total_count.saturating_sub(section.capacity);
            let cumulative_offset = chain
                .depends_on(index)
                .map(|above| shifts[above].cumulative_offset + shifts[above].extra_rows)
                .unwrap_or(0);
            shifts.push(SectionShift {
                extra_records,
                extra_rows: extra_records * section.stride,
                cumulative_offset,
            });
        }
        Ok(RowShiftPlan {
            chain: chain.clone(),
            total_count,
            shifts,
        })
    }

    pub fn sheet(&self) -> &str {
        &self.chain.sheet
    }

    pub fn section(&self, index: usize) -> &Section {
        &self.chain.sections[index]
    }

    pub fn shift(&self, index: usize) -> SectionShift {
        self.shifts[index]
    }

    pub fn extra_records(&self, index: usize) -> u32 {
        self.shifts[index].extra_records
    }

    /// Largest per-section growth, i.e. the number of insertion passes.
    pub fn passes(&self) -> u32 {
        self.shifts.iter().map(|s| s.extra_records).max().unwrap_or(0)
    }

    pub fn total_inserted(&self) -> u32 {
        self.shifts.iter().map(|s| s.extra_rows).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.total_inserted() == 0
    }

    pub fn section_start(&self, index: usize) -> u32 {
        self.section(index).header_row + self.shifts[index].cumulative_offset
    }

    /// Records the section holds after the reshape.
    pub fn record_count(&self, index: usize) -> u32 {
        self.section(index).capacity + self.shifts[index].extra_records
    }

    pub fn data_row_count(&self, index: usize) -> u32 {
        self.record_count(index) * self.section(index).stride
    }

    pub fn record_row(&self, index: usize, record: u32, phase: u32) -> u32 {
        self.section_start(index) + record * self.section(index).stride + phase
    }

    pub fn trailer_row(&self, index: usize, offset: u32) -> u32 {
        self.section_start(index) + self.data_row_count(index) + offset
    }

    pub fn below_row(&self, offset: u32) -> u32 {
        self.chain.end() + self.total_inserted() + offset
    }

    /// Final index of an original record. Records up to the template stay
    /// put; the copies go right after the template and push the rest down.
    pub fn remap_record(&self, index: usize, record: u32) -> u32 {
        if record <= self.section(index).template_record {
            record
        } else {
            record + self.shifts[index].extra_records
        }
    }

    /// Final row of an original template row.
    pub fn map_original_row(&self, row: u32) -> u32 {
        match self.chain.locate(row) {
            RowSlot::Above => row,
            RowSlot::Record {
                section,
                record,
                phase,
            } => self.record_row(section, self.remap_record(section, record), phase),
            RowSlot::Trailer { section, offset } => self.trailer_row(section, offset),
            RowSlot::Below { offset } => self.below_row(offset),
        }
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            sheet: self.chain.sheet.clone(),
            sections: (0..self.chain.sections.len())
                .map(|i| SectionSummary {
                    id: self.section(i).id.clone(),
                    start_row: self.section_start(i),
                    records: self.record_count(i),
                    extra_rows: self.shifts[i].extra_rows,
                    summary_row: self.trailer_row(i, 0),
                    trailer_rows: self.section(i).trailer_len(),
                })
                .collect(),
        }
    }
}

/// Plans for every configured sheet in one batch.
#[derive(Debug, Clone, Default)]
pub struct WorkbookPlan {
    pub plans: Vec<RowShiftPlan>,
}

impl WorkbookPlan {
    pub fn get(&self, sheet: &str) -> Option<&RowShiftPlan> {
        self.plans
            .iter()
            .find(|p| p.chain.sheet.to_lowercase() == sheet.to_lowercase())
    }

    /// Plans that actually move rows.
    pub fn reshaping(&self) -> impl Iterator<Item = &RowShiftPlan> {
        self.plans.iter().filter(|p| !p.is_noop())
    }

    pub fn is_noop(&self) -> bool {
        self.plans.iter().all(|p| p.is_noop())
    }

    pub fn summaries(&self) -> Vec<PlanSummary> {
        self.plans.iter().map(|p| p.summary()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionSummary {
    pub id: String,
    pub start_row: u32,
    pub records: u32,
    pub extra_rows: u32,
    pub summary_row: u32,
    pub trailer_rows: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub sheet: String,
    pub sections: Vec<SectionSummary>,
}
