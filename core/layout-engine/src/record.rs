//! FILENAME: core/layout-engine/src/record.rs
//! PURPOSE: Parsed statement data handed to the layout engine.
//! CONTEXT: Records come out of document parsing (outside this crate) as
//! JSON. They are read-only here: placement borrows them and never edits.

use crate::config::ExpenseSection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Twelve monthly figures, January first.
pub type Months = [f64; 12];

/// One annual rental statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyRecord {
    pub property_name: Option<String>,
    pub tenant_name: Option<String>,
    pub contract_start: Option<String>,
    pub contract_end: Option<String>,
    pub rental_area: Option<f64>,
    /// Annual income as printed on the statement.
    pub annual_total: Option<f64>,
    pub income: Months,
    pub management_fee: Months,
    pub advertising: Months,
    pub repairs: Months,
    /// Free-text expense items, booked through the item mapping.
    pub other_items: BTreeMap<String, Months>,
}

impl PropertyRecord {
    /// Trimmed property name, if the statement yielded one.
    pub fn name(&self) -> Option<&str> {
        self.property_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn income_total(&self) -> f64 {
        self.annual_total.unwrap_or_else(|| sum(&self.income))
    }

    /// Monthly figures for an expense section: the statement's own column
    /// plus every other item mapped to it.
    pub fn expenses(&self, section: ExpenseSection, mapping: &BTreeMap<String, ExpenseSection>) -> Months {
        let mut months = match section {
            ExpenseSection::B => self.management_fee,
            ExpenseSection::C => self.advertising,
            ExpenseSection::D => self.repairs,
        };
        for (item, figures) in &self.other_items {
            if mapping.get(item) == Some(&section) {
                for (total, value) in months.iter_mut().zip(figures) {
                    *total += value;
                }
            }
        }
        months
    }
}

pub fn sum(months: &Months) -> f64 {
    months.iter().sum()
}

/// A settlement statement: the purchase price split, plus the closing costs
/// when the statement itemises them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementRecord {
    pub property_name: String,
    pub land_price: f64,
    pub building_price: f64,
    pub costs: Option<PurchaseCosts>,
}

/// Closing costs of a purchase, in the order the new-property block lists them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseCosts {
    pub loan_fee: f64,
    pub business_fee: f64,
    pub insurance_fee: f64,
    pub transfer_fee: f64,
    pub registration_fee: f64,
    pub property_tax_building: f64,
    pub property_tax_land: f64,
    pub management_fee: f64,
    pub stamp_sales: f64,
    pub stamp_loan: f64,
    pub travel_fee: f64,
    pub loan_transfer_fee: f64,
    pub certificate_fee: f64,
    /// Months the management fee covers.
    pub management_fee_months: Option<f64>,
}

impl PurchaseCosts {
    pub const ITEMS: usize = 13;

    pub fn amounts(&self) -> [f64; Self::ITEMS] {
        [
            self.loan_fee,
            self.business_fee,
            self.insurance_fee,
            self.transfer_fee,
            self.registration_fee,
            self.property_tax_building,
            self.property_tax_land,
            self.management_fee,
            self.stamp_sales,
            self.stamp_loan,
            self.travel_fee,
            self.loan_transfer_fee,
            self.certificate_fee,
        ]
    }

    pub fn total(&self) -> f64 {
        self.amounts().iter().sum()
    }
}

/// A transfer deed: when the building was completed and when it changed hands.
/// Dates are `YYYY/MM/DD` as extracted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferRecord {
    pub property_name: Option<String>,
    pub completion_date: Option<String>,
    pub transfer_date: Option<String>,
}

impl TransferRecord {
    pub fn name(&self) -> Option<&str> {
        self.property_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// A document that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionError {
    pub source: String,
    pub message: String,
}

/// One input document: either a parsed record or the reason it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub source: String,
    #[serde(default)]
    pub record: Option<PropertyRecord>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SourceDocument {
    pub fn parsed(source: &str, record: PropertyRecord) -> Self {
        SourceDocument {
            source: source.to_string(),
            record: Some(record),
            error: None,
        }
    }

    pub fn failed(source: &str, message: &str) -> Self {
        SourceDocument {
            source: source.to_string(),
            record: None,
            error: Some(message.to_string()),
        }
    }

    pub fn outcome(&self) -> Result<&PropertyRecord, ExtractionError> {
        match (&self.record, &self.error) {
            (Some(record), None) => Ok(record),
            (_, error) => Err(ExtractionError {
                source: self.source.clone(),
                message: error
                    .clone()
                    .unwrap_or_else(|| "document produced no record".to_string()),
            }),
        }
    }
}

/// Everything one batch places.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchInput {
    pub documents: Vec<SourceDocument>,
    pub settlements: Vec<SettlementRecord>,
    pub transfers: Vec<TransferRecord>,
}

impl BatchInput {
    /// Splits documents into parsed records (in input order) and failures.
    pub fn partition(&self) -> (Vec<&PropertyRecord>, Vec<ExtractionError>) {
        let mut records = Vec::new();
        let mut errors = Vec::new();
        for document in &self.documents {
            match document.outcome() {
                Ok(record) => records.push(record),
                Err(error) => errors.push(error),
            }
        }
        (records, errors)
    }

    /// Other-expense items with no section mapping, sorted.
    pub fn unclassified_items(&self, mapping: &BTreeMap<String, ExpenseSection>) -> Vec<String> {
        let (records, _) = self.partition();
        let unknown: BTreeSet<&String> = records
            .iter()
            .flat_map(|record| record.other_items.keys())
            .filter(|item| !mapping.contains_key(*item))
            .collect();
        unknown.into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn months(value: f64) -> Months {
        [value; 12]
    }

    #[test]
    fn expenses_include_mapped_items() {
        let mut record = PropertyRecord {
            repairs: months(100.0),
            ..PropertyRecord::default()
        };
        record.other_items.insert("修繕費".to_string(), months(50.0));
        record.other_items.insert("広告料".to_string(), months(7.0));

        let mapping = crate::config::LayoutConfig::default().item_mapping;
        assert_eq!(record.expenses(ExpenseSection::D, &mapping), months(150.0));
        assert_eq!(record.expenses(ExpenseSection::C, &mapping), months(7.0));
        assert_eq!(record.expenses(ExpenseSection::B, &mapping), months(0.0));
    }

    #[test]
    fn income_total_falls_back_to_months() {
        let mut record = PropertyRecord {
            income: months(10.0),
            ..PropertyRecord::default()
        };
        assert_eq!(record.income_total(), 120.0);
        record.annual_total = Some(99.0);
        assert_eq!(record.income_total(), 99.0);
    }

    #[test]
    fn blank_names_are_missing() {
        let record = PropertyRecord {
            property_name: Some("  ".to_string()),
            ..PropertyRecord::default()
        };
        assert_eq!(record.name(), None);
    }

    #[test]
    fn partitions_documents_and_finds_unknown_items() {
        let mut odd = PropertyRecord::default();
        odd.other_items.insert("謎の費用".to_string(), months(1.0));
        let input = BatchInput {
            documents: vec![
                SourceDocument::parsed("a.pdf", PropertyRecord::default()),
                SourceDocument::failed("b.pdf", "no text layer"),
                SourceDocument::parsed("c.pdf", odd),
            ],
            ..BatchInput::default()
        };
        let (records, errors) = input.partition();
        assert_eq!(records.len(), 2);
        assert_eq!(errors[0].source, "b.pdf");
        let mapping = crate::config::LayoutConfig::default().item_mapping;
        assert_eq!(input.unclassified_items(&mapping), vec!["謎の費用".to_string()]);
    }

    #[test]
    fn documents_deserialize_from_json() {
        let input: BatchInput = serde_json::from_str(
            r#"{
                "documents": [
                    { "source": "a.pdf", "record": { "property_name": "メゾン青山", "income": [1,2,3,4,5,6,7,8,9,10,11,12] } },
                    { "source": "b.pdf", "error": "unreadable" }
                ]
            }"#,
        )
        .unwrap();
        let (records, errors) = input.partition();
        assert_eq!(records[0].name(), Some("メゾン青山"));
        assert_eq!(records[0].income[11], 12.0);
        assert_eq!(errors[0].message, "unreadable");
        assert!(input.settlements.is_empty());
        assert!(input.transfers.is_empty());
    }

    #[test]
    fn transfers_and_costs_deserialize_from_json() {
        let input: BatchInput = serde_json::from_str(
            r#"{
                "settlements": [
                    { "property_name": "ハイツ松", "land_price": 1.0,
                      "costs": { "loan_fee": 33000, "certificate_fee": 700, "management_fee_months": 2 } }
                ],
                "transfers": [
                    { "property_name": " ハイツ松 ", "completion_date": "2010/02/24", "transfer_date": "2024/12/27" },
                    { "completion_date": "2001/04/01" }
                ]
            }"#,
        )
        .unwrap();
        let costs = input.settlements[0].costs.as_ref().unwrap();
        assert_eq!(costs.amounts()[0], 33000.0);
        assert_eq!(costs.amounts()[12], 700.0);
        assert_eq!(costs.total(), 33700.0);
        assert_eq!(costs.management_fee_months, Some(2.0));
        assert_eq!(input.transfers[0].name(), Some("ハイツ松"));
        assert_eq!(input.transfers[1].name(), None);
        assert_eq!(input.transfers[1].transfer_date, None);
    }
}
