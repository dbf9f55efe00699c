//! FILENAME: core/layout-engine/src/purchase.rs
//! PURPOSE: Lays out one closing-cost block per settlement on the
//! new-property sheet.
//! CONTEXT: The sheet ships with a single block in its top-left corner: a
//! name row, one row per cost item and a total row whose formula sums them.
//! Every further settlement gets a copy of that block, five across and then
//! down, and its figures are written into the copy.

use crate::config::{LayoutConfig, PurchaseConfig};
use crate::error::LayoutError;
use crate::record::{PurchaseCosts, SettlementRecord};
use crate::report::PropertyResult;
use engine::{coord_to_a1, CellValue, Workbook};
use std::collections::BTreeMap;

pub struct PurchaseWriter<'a> {
    purchase: &'a PurchaseConfig,
}

impl<'a> PurchaseWriter<'a> {
    /// `None` when cost blocks are switched off.
    pub fn new(config: &'a LayoutConfig) -> Option<Self> {
        config.purchase.as_ref().map(|purchase| PurchaseWriter { purchase })
    }

    /// Writes the settlements that itemise their costs, in input order.
    /// Settlements without costs are not reported here.
    pub fn write(&self, workbook: &mut Workbook, settlements: &[SettlementRecord]) -> Result<Vec<PropertyResult>, LayoutError> {
        let costed: Vec<(&str, &PurchaseCosts)> = settlements
            .iter()
            .filter_map(|s| s.costs.as_ref().map(|costs| (s.property_name.trim(), costs)))
            .collect();
        if costed.is_empty() {
            return Ok(Vec::new());
        }

        let purchase = self.purchase;
        let Some(sheet) = workbook.sheet_mut(&purchase.sheet) else {
            log::warn!("sheet '{}' not found, {} cost block(s) skipped", purchase.sheet, costed.len());
            return Ok(costed
                .iter()
                .map(|(name, _)| {
                    PropertyResult::error(
                        Some(name).filter(|n| !n.is_empty()).copied(),
                        format!("sheet '{}' not found; costs not written", purchase.sheet),
                    )
                })
                .collect());
        };

        for index in 1..costed.len() as u32 {
            sheet.copy_range((0, 0), purchase.block_rows, purchase.block_cols, purchase.block_origin(index));
        }

        let mut results = Vec::with_capacity(costed.len());
        for (index, (name, costs)) in costed.iter().enumerate() {
            let (top, left) = purchase.block_origin(index as u32);
            if !name.is_empty() {
                sheet.set_value(top, left + purchase.name_offset, CellValue::Text(name.to_string()));
            }
            for (item, amount) in costs.amounts().iter().enumerate() {
                sheet.set_value(top + 1 + item as u32, left + purchase.amount_offset, CellValue::Number(*amount));
            }
            if let Some(months) = costs.management_fee_months {
                sheet.set_value(
                    top + purchase.management_fee_row,
                    left + purchase.months_offset,
                    CellValue::Number(months),
                );
            }

            let origin = coord_to_a1((top, left));
            log::debug!("costs of '{}' -> {} block at {}", name, purchase.sheet, origin);
            let message = format!("costs {} written to block {} at {}", costs.total(), index + 1, origin);
            results.push(if name.is_empty() {
                PropertyResult::error(None, format!("{}; property name could not be extracted", message))
            } else {
                let mut rows = BTreeMap::new();
                rows.insert("costs".to_string(), top + 1);
                PropertyResult::success(name, message, rows)
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NEW_PROPERTY_SHEET;
    use engine::Sheet;

    fn template() -> Workbook {
        let mut sheet = Sheet::new(NEW_PROPERTY_SHEET);
        sheet.set_value(0, 0, CellValue::Text("物件名".to_string()));
        sheet.set_value(1, 0, CellValue::Text("ローン事務手数料".to_string()));
        sheet.set_value(8, 0, CellValue::Text("管理費・修繕積立金".to_string()));
        sheet.set_formula(14, 3, "=SUM(D2:D14)");
        sheet.column_widths.insert(1, 20.0);
        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);
        workbook
    }

    fn settlement(name: &str, loan_fee: f64) -> SettlementRecord {
        SettlementRecord {
            property_name: name.to_string(),
            costs: Some(PurchaseCosts {
                loan_fee,
                certificate_fee: 700.0,
                management_fee_months: Some(2.0),
                ..PurchaseCosts::default()
            }),
            ..SettlementRecord::default()
        }
    }

    #[test]
    fn blocks_tile_across_then_down() {
        let config = LayoutConfig::default();
        let writer = PurchaseWriter::new(&config).unwrap();
        let mut workbook = template();
        let mut settlements: Vec<SettlementRecord> =
            (0..6).map(|i| settlement(&format!("物件{}", i), 1000.0 * (i + 1) as f64)).collect();
        settlements.insert(2, SettlementRecord::default());

        let results = writer.write(&mut workbook, &settlements).unwrap();
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.is_success()));
        assert_eq!(results[5].rows.get("costs"), Some(&17));

        let sheet = workbook.sheet(NEW_PROPERTY_SHEET).unwrap();
        assert_eq!(sheet.value(0, 1), Some(&CellValue::Text("物件0".to_string())));
        assert_eq!(sheet.value(1, 3), Some(&CellValue::Number(1000.0)));
        assert_eq!(sheet.value(13, 3), Some(&CellValue::Number(700.0)));
        assert_eq!(sheet.value(8, 2), Some(&CellValue::Number(2.0)));
        assert_eq!(sheet.value(2, 3), Some(&CellValue::Number(0.0)));

        // Second block: columns F..J, labels and total copied from the template.
        assert_eq!(sheet.value(0, 6), Some(&CellValue::Text("物件1".to_string())));
        assert_eq!(sheet.value(1, 5), Some(&CellValue::Text("ローン事務手数料".to_string())));
        assert_eq!(sheet.value(1, 8), Some(&CellValue::Number(2000.0)));
        assert_eq!(sheet.formula(14, 8), Some("=SUM(I2:I14)"));
        assert_eq!(sheet.column_widths.get(&6), Some(&20.0));

        // Sixth block starts the second band, one blank row below the first.
        assert_eq!(sheet.value(16, 1), Some(&CellValue::Text("物件5".to_string())));
        assert_eq!(sheet.formula(30, 3), Some("=SUM(D18:D30)"));
        assert_eq!(sheet.value(17, 3), Some(&CellValue::Number(6000.0)));
    }

    #[test]
    fn settlements_without_costs_write_nothing() {
        let config = LayoutConfig::default();
        let writer = PurchaseWriter::new(&config).unwrap();
        let mut workbook = Workbook::new();
        let plain = SettlementRecord {
            property_name: "ハイツ松".to_string(),
            ..SettlementRecord::default()
        };
        assert!(writer.write(&mut workbook, &[plain]).unwrap().is_empty());

        let results = writer.write(&mut workbook, &[settlement("ハイツ松", 1.0)]).unwrap();
        assert!(!results[0].is_success());
        assert!(results[0].message.contains(NEW_PROPERTY_SHEET));

        let off = LayoutConfig {
            purchase: None,
            ..LayoutConfig::default()
        };
        assert!(PurchaseWriter::new(&off).is_none());
    }
}
