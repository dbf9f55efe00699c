//! FILENAME: core/layout-engine/src/section.rs
//! PURPOSE: Resolved section chains and row classification.
//! CONTEXT: A chain is built once from configuration and never mutated.
//! Rows are 1-based, matching formula text. Every row of a sheet falls in
//! exactly one slot: above the chain, inside a section's data block, inside
//! a section's trailer, or below the chain.

use crate::config::{column, ChainConfig};
use crate::error::{LayoutError, StructuralError};
use engine::Sheet;

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    /// First data row in the untouched template.
    pub header_row: u32,
    pub capacity: u32,
    pub stride: u32,
    /// First row after the section's trailer.
    pub region_end: u32,
    pub template_record: u32,
    /// 0-based sequence column and whether every row is numbered.
    pub sequence: Option<(u32, bool)>,
}

impl Section {
    pub fn data_rows(&self) -> u32 {
        self.capacity * self.stride
    }

    /// First trailer row of the untouched template (the summary row).
    pub fn summary_row(&self) -> u32 {
        self.header_row + self.data_rows()
    }

    pub fn trailer_len(&self) -> u32 {
        self.region_end - self.summary_row()
    }

    pub fn last_record(&self) -> u32 {
        self.capacity - 1
    }
}

/// Where an original template row sits relative to a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSlot {
    Above,
    Record { section: usize, record: u32, phase: u32 },
    Trailer { section: usize, offset: u32 },
    Below { offset: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionChain {
    pub sheet: String,
    pub sections: Vec<Section>,
}

impl SectionChain {
    /// Resolves a validated chain configuration.
    pub fn from_config(config: &ChainConfig) -> Result<Self, LayoutError> {
        let mut sections = Vec::with_capacity(config.sections.len());
        for (i, section) in config.sections.iter().enumerate() {
            let data_end = section.header_row + section.capacity * section.stride;
            let region_end = match config.sections.get(i + 1) {
                Some(next) => next.header_row,
                None => data_end + section.trailer_rows,
            };
            if region_end < data_end {
                return Err(LayoutError::Config(format!(
                    "section {} on '{}' overlaps the next section",
                    section.id, config.sheet
                )));
            }
            let sequence = match &section.sequence {
                Some(seq) => Some((column(&seq.column)?, seq.every_row)),
                None => None,
            };
            sections.push(Section {
                id: section.id.clone(),
                header_row: section.header_row,
                capacity: section.capacity,
                stride: section.stride,
                region_end,
                template_record: section.template_record.unwrap_or(section.capacity - 1),
                sequence,
            });
        }
        if sections.is_empty() {
            return Err(LayoutError::Config(format!("chain on '{}' has no sections", config.sheet)));
        }
        Ok(SectionChain {
            sheet: config.sheet.clone(),
            sections,
        })
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }

    /// Index of the section directly above, whose growth moves section `index`.
    pub fn depends_on(&self, index: usize) -> Option<usize> {
        index.checked_sub(1).filter(|&i| i < self.sections.len())
    }

    pub fn start(&self) -> u32 {
        self.sections.first().map(|s| s.header_row).unwrap_or(0)
    }

    /// First row below the whole chain.
    pub fn end(&self) -> u32 {
        self.sections.last().map(|s| s.region_end).unwrap_or(0)
    }

    /// Bottom-up processing order.
    pub fn reverse_order(&self) -> Vec<usize> {
        (0..self.sections.len()).rev().collect()
    }

    pub fn ids(&self, order: &[usize]) -> Vec<String> {
        order
            .iter()
            .filter_map(|&i| self.sections.get(i))
            .map(|s| s.id.clone())
            .collect()
    }

    pub fn locate(&self, row: u32) -> RowSlot {
        if row < self.start() {
            return RowSlot::Above;
        }
        if row >= self.end() {
            return RowSlot::Below {
                offset: row - self.end(),
            };
        }
        for (index, section) in self.sections.iter().enumerate() {
            if row >= section.region_end {
                continue;
            }
            let local = row - section.header_row;
            if row < section.summary_row() {
                return RowSlot::Record {
                    section: index,
                    record: local / section.stride,
                    phase: local % section.stride,
                };
            }
            return RowSlot::Trailer {
                section: index,
                offset: row - section.summary_row(),
            };
        }
        RowSlot::Below { offset: 0 }
    }

    /// Fails when the sheet is too short to hold every section's first row.
    pub fn verify_present(&self, sheet: &Sheet) -> Result<(), StructuralError> {
        let rows = sheet.row_count();
        for section in &self.sections {
            if rows < section.header_row {
                return Err(StructuralError::MissingSection {
                    sheet: self.sheet.clone(),
                    section: section.id.clone(),
                    row: section.header_row,
                    rows,
                });
            }
        }
        Ok(())
    }
}
