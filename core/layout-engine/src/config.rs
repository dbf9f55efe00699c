//! FILENAME: core/layout-engine/src/config.rs
//! PURPOSE: Declarative description of the statement template.
//! CONTEXT: Section header rows, capacities, trailer sizes, placement
//! columns and the expense-item mapping all live here instead of being
//! scattered as literals. `LayoutConfig::default()` encodes the production
//! template; a JSON file can override any part of it.

use crate::error::LayoutError;
use crate::record::PurchaseCosts;
use engine::col_to_index;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Hard ceiling on records per batch.
pub const DEFAULT_MAX_RECORDS: u32 = 500;

pub const INCOME_SHEET: &str = "【不】①不動産収入";
pub const INTEREST_SHEET: &str = "【不】⑤利息";
pub const USEFUL_LIFE_SHEET: &str = "【不】④耐用年数";
pub const DEPRECIATION_SHEET: &str = "【不】②減価償却（新規入力用）";
pub const DEPRECIATION_EXPORT_SHEET: &str = "【不】③減価償却（JDLよりエクスポート）";
pub const NEW_PROPERTY_SHEET: &str = "【不】新規不動産";

// ============================================================================
// CHAIN CONFIGURATION
// ============================================================================

/// Where a section writes its running record numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceConfig {
    pub column: String,
    /// Number every physical row instead of every record.
    #[serde(default)]
    pub every_row: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub id: String,
    /// 1-based row of the first data record in the untouched template.
    pub header_row: u32,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Rows per record.
    #[serde(default = "default_stride")]
    pub stride: u32,
    /// Summary rows after the data block. Only read for the last section of
    /// a chain; the others own every row up to the next header.
    #[serde(default)]
    pub trailer_rows: u32,
    /// 0-based record duplicated to grow the section. Defaults to the last.
    #[serde(default)]
    pub template_record: Option<u32>,
    #[serde(default)]
    pub sequence: Option<SequenceConfig>,
}

fn default_capacity() -> u32 {
    20
}

fn default_stride() -> u32 {
    1
}

impl SectionConfig {
    pub fn new(id: &str, header_row: u32) -> Self {
        SectionConfig {
            id: id.to_string(),
            header_row,
            capacity: default_capacity(),
            stride: default_stride(),
            trailer_rows: 0,
            template_record: None,
            sequence: None,
        }
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_trailer(mut self, rows: u32) -> Self {
        self.trailer_rows = rows;
        self
    }

    pub fn with_sequence(mut self, column: &str, every_row: bool) -> Self {
        self.sequence = Some(SequenceConfig {
            column: column.to_string(),
            every_row,
        });
        self
    }
}

/// An ordered run of sections on one sheet, top to bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub sheet: String,
    pub sections: Vec<SectionConfig>,
}

// ============================================================================
// PRIMARY SHEET
// ============================================================================

/// Columns written for every placed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementColumns {
    pub label: String,
    pub property: String,
    /// First of twelve consecutive month columns.
    pub first_month: String,
    pub total: String,
}

impl Default for PlacementColumns {
    fn default() -> Self {
        PlacementColumns {
            label: "G".to_string(),
            property: "H".to_string(),
            first_month: "I".to_string(),
            total: "U".to_string(),
        }
    }
}

/// Which section id plays which role in the income statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionRoles {
    pub income: String,
    pub management_fee: String,
    pub advertising: String,
    pub repairs: String,
    pub sublease: String,
}

impl Default for SectionRoles {
    fn default() -> Self {
        SectionRoles {
            income: "A".to_string(),
            management_fee: "B".to_string(),
            advertising: "C".to_string(),
            repairs: "D".to_string(),
            sublease: "E".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionLabels {
    pub income: String,
    pub management_fee: String,
    pub advertising: String,
    pub repairs: String,
}

impl Default for SectionLabels {
    fn default() -> Self {
        SectionLabels {
            income: "収入合計①".to_string(),
            management_fee: "管理手数料".to_string(),
            advertising: "宣伝広告費".to_string(),
            repairs: "設備交換費".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrimaryConfig {
    pub chain: ChainConfig,
    pub columns: PlacementColumns,
    pub roles: SectionRoles,
    pub labels: SectionLabels,
    /// Columns whose formulas placement must never overwrite.
    pub protected_columns: Vec<String>,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        let section = |id: &str, header_row: u32| {
            SectionConfig::new(id, header_row).with_sequence("A", false)
        };
        PrimaryConfig {
            chain: ChainConfig {
                sheet: INCOME_SHEET.to_string(),
                sections: vec![
                    section("A", 55),
                    section("B", 78),
                    section("C", 101),
                    section("D", 124),
                    section("E", 147).with_trailer(3),
                ],
            },
            columns: PlacementColumns::default(),
            roles: SectionRoles::default(),
            labels: SectionLabels::default(),
            protected_columns: vec!["V".to_string(), "W".to_string(), "X".to_string()],
        }
    }
}

// ============================================================================
// REGISTRY / SETTLEMENT / ITEM MAPPING
// ============================================================================

/// Property registry table: one row per property, referenced from every
/// section's property column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Defaults to the primary sheet.
    pub sheet: Option<String>,
    pub first_row: u32,
    pub last_row: u32,
    pub name: String,
    pub tenant: String,
    pub contract_start: String,
    pub contract_end: String,
    pub area: String,
    pub annual_rent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            sheet: None,
            first_row: 4,
            last_row: 50,
            name: "G".to_string(),
            tenant: "H".to_string(),
            contract_start: "I".to_string(),
            contract_end: "J".to_string(),
            area: "M".to_string(),
            annual_rent: "P".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    pub sheet: String,
    pub section: String,
    pub land_price: String,
    pub building_price: String,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        SettlementConfig {
            sheet: INTEREST_SHEET.to_string(),
            section: "mirror".to_string(),
            land_price: "C".to_string(),
            building_price: "D".to_string(),
        }
    }
}

/// Expense sections an "other" item can be booked under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExpenseSection {
    B,
    C,
    D,
}

fn default_item_mapping() -> BTreeMap<String, ExpenseSection> {
    [
        ("管理手数料", ExpenseSection::B),
        ("管理費", ExpenseSection::B),
        ("宣伝広告費", ExpenseSection::C),
        ("広告料", ExpenseSection::C),
        ("設備交換費", ExpenseSection::D),
        ("修繕費", ExpenseSection::D),
    ]
    .into_iter()
    .map(|(item, section)| (item.to_string(), section))
    .collect()
}

fn default_auxiliary() -> Vec<ChainConfig> {
    vec![
        ChainConfig {
            sheet: INTEREST_SHEET.to_string(),
            sections: vec![
                SectionConfig::new("mirror", 10),
                SectionConfig::new("pairs", 41).with_stride(2).with_trailer(2),
            ],
        },
        ChainConfig {
            sheet: USEFUL_LIFE_SHEET.to_string(),
            sections: vec![SectionConfig::new("assets", 5)
                .with_stride(2)
                .with_trailer(2)
                .with_sequence("B", true)],
        },
        ChainConfig {
            sheet: DEPRECIATION_SHEET.to_string(),
            sections: vec![SectionConfig::new("schedule", 21).with_trailer(2)],
        },
    ]
}

// ============================================================================
// TRANSFERS / DEPRECIATION EXPORT / NEW PROPERTIES
// ============================================================================

/// Where transfer deeds land: one record of the useful-life chain per
/// registry row, the structure and equipment rows of each record labelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub sheet: String,
    pub section: String,
    pub kind: String,
    pub completion_date: String,
    pub acquired: String,
    /// Useful-life rate, referenced by the depreciation export.
    pub rate: String,
    /// Labels of the rows of one record, top to bottom.
    pub kinds: Vec<String>,
    pub date_format: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            sheet: USEFUL_LIFE_SHEET.to_string(),
            section: "assets".to_string(),
            kind: "E".to_string(),
            completion_date: "F".to_string(),
            acquired: "G".to_string(),
            rate: "L".to_string(),
            kinds: vec!["躯体".to_string(), "設備".to_string()],
            date_format: "yyyy/mm/dd".to_string(),
        }
    }
}

/// Flat list of labelled useful-life rows rebuilt on the export sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub sheet: String,
    pub first_row: u32,
    pub name: String,
    pub acquired: String,
    pub rate: String,
    pub interest: String,
    /// Interest section whose rows pair up with the useful-life rows.
    pub interest_sheet: String,
    pub interest_section: String,
    pub interest_column: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            sheet: DEPRECIATION_EXPORT_SHEET.to_string(),
            first_row: 4,
            name: "E".to_string(),
            acquired: "G".to_string(),
            rate: "I".to_string(),
            interest: "J".to_string(),
            interest_sheet: INTEREST_SHEET.to_string(),
            interest_section: "pairs".to_string(),
            interest_column: "D".to_string(),
        }
    }
}

/// Cost blocks for settlements that itemise closing costs. The first block
/// is the template; the others are tiled across, then down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseConfig {
    pub sheet: String,
    pub block_rows: u32,
    pub block_cols: u32,
    pub blocks_per_row: u32,
    /// Blank rows between two bands of blocks.
    pub gap_rows: u32,
    /// Column offsets inside a block.
    pub name_offset: u32,
    pub months_offset: u32,
    pub amount_offset: u32,
    /// Block row (0-based) of the management fee.
    pub management_fee_row: u32,
}

impl Default for PurchaseConfig {
    fn default() -> Self {
        PurchaseConfig {
            sheet: NEW_PROPERTY_SHEET.to_string(),
            block_rows: 15,
            block_cols: 5,
            blocks_per_row: 5,
            gap_rows: 1,
            name_offset: 1,
            months_offset: 2,
            amount_offset: 3,
            management_fee_row: 8,
        }
    }
}

impl PurchaseConfig {
    /// 0-based top-left cell of block `index`.
    pub fn block_origin(&self, index: u32) -> (u32, u32) {
        let band = index / self.blocks_per_row;
        let across = index % self.blocks_per_row;
        (band * (self.block_rows + self.gap_rows), across * self.block_cols)
    }
}

// ============================================================================
// LAYOUT CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub max_records: u32,
    pub primary: PrimaryConfig,
    /// Chains on other sheets that grow with the primary record count.
    pub auxiliary: Vec<ChainConfig>,
    pub registry: RegistryConfig,
    pub settlement: SettlementConfig,
    pub item_mapping: BTreeMap<String, ExpenseSection>,
    pub transfer: TransferConfig,
    /// `None` turns the depreciation export off.
    pub export: Option<ExportConfig>,
    /// `None` leaves settlement costs unwritten.
    pub purchase: Option<PurchaseConfig>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            max_records: DEFAULT_MAX_RECORDS,
            primary: PrimaryConfig::default(),
            auxiliary: default_auxiliary(),
            registry: RegistryConfig::default(),
            settlement: SettlementConfig::default(),
            item_mapping: default_item_mapping(),
            transfer: TransferConfig::default(),
            export: Some(ExportConfig::default()),
            purchase: Some(PurchaseConfig::default()),
        }
    }
}

impl LayoutConfig {
    /// Parses a JSON override. Missing fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, LayoutError> {
        let config: LayoutConfig =
            serde_json::from_str(text).map_err(|e| LayoutError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LayoutError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Every chain, primary first.
    pub fn chains(&self) -> impl Iterator<Item = &ChainConfig> {
        std::iter::once(&self.primary.chain).chain(self.auxiliary.iter())
    }

    pub fn registry_sheet(&self) -> &str {
        self.registry
            .sheet
            .as_deref()
            .unwrap_or(&self.primary.chain.sheet)
    }

    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.max_records == 0 {
            return Err(config_error("max_records must be positive"));
        }

        for chain in self.chains() {
            validate_chain(chain)?;
        }
        let mut sheets: Vec<String> = self.chains().map(|c| c.sheet.to_lowercase()).collect();
        sheets.sort();
        sheets.dedup();
        if sheets.len() != 1 + self.auxiliary.len() {
            return Err(config_error("two chains are configured on the same sheet"));
        }

        let primary = &self.primary;
        let roles = &primary.roles;
        for id in [
            &roles.income,
            &roles.management_fee,
            &roles.advertising,
            &roles.repairs,
            &roles.sublease,
        ] {
            if !primary.chain.sections.iter().any(|s| &s.id == id) {
                return Err(config_error(&format!("primary chain has no section '{}'", id)));
            }
        }

        let columns = &primary.columns;
        let first_month = column(&columns.first_month)?;
        let mut placement = vec![column(&columns.label)?, column(&columns.property)?, column(&columns.total)?];
        placement.extend(first_month..first_month + 12);
        for protected in &primary.protected_columns {
            if placement.contains(&column(protected)?) {
                return Err(config_error(&format!(
                    "protected column {} is also a placement column",
                    protected
                )));
            }
        }

        let registry = &self.registry;
        if registry.first_row == 0 || registry.first_row > registry.last_row {
            return Err(config_error("registry rows are empty"));
        }
        for col in [
            &registry.name,
            &registry.tenant,
            &registry.contract_start,
            &registry.contract_end,
            &registry.area,
            &registry.annual_rent,
        ] {
            column(col)?;
        }
        for chain in self.chains() {
            if !chain.sheet.eq_ignore_ascii_case(self.registry_sheet()) {
                continue;
            }
            let (start, end) = chain_extent(chain);
            if registry.first_row < end && start <= registry.last_row {
                return Err(config_error(&format!(
                    "registry rows {}..{} overlap the chain on '{}'",
                    registry.first_row, registry.last_row, chain.sheet
                )));
            }
        }

        let settlement = &self.settlement;
        column(&settlement.land_price)?;
        column(&settlement.building_price)?;
        let known = self.chains().any(|c| {
            c.sheet.eq_ignore_ascii_case(&settlement.sheet)
                && c.sections.iter().any(|s| s.id == settlement.section)
        });
        if !known {
            return Err(config_error(&format!(
                "settlement section '{}' on '{}' is not configured",
                settlement.section, settlement.sheet
            )));
        }

        let transfer = &self.transfer;
        for col in [&transfer.kind, &transfer.completion_date, &transfer.acquired, &transfer.rate] {
            column(col)?;
        }
        let stride = self
            .section_config(&transfer.sheet, &transfer.section)
            .map(|s| s.stride)
            .ok_or_else(|| {
                config_error(&format!(
                    "transfer section '{}' on '{}' is not configured",
                    transfer.section, transfer.sheet
                ))
            })?;
        if transfer.kinds.is_empty() || transfer.kinds.len() as u32 > stride {
            return Err(config_error(&format!(
                "{} transfer row label(s) for records of {} row(s)",
                transfer.kinds.len(),
                stride
            )));
        }

        if let Some(export) = &self.export {
            if export.first_row == 0 {
                return Err(config_error("export has no first row"));
            }
            for col in [&export.name, &export.acquired, &export.rate, &export.interest, &export.interest_column] {
                column(col)?;
            }
            if self.chains().any(|c| c.sheet.eq_ignore_ascii_case(&export.sheet)) {
                return Err(config_error(&format!("export sheet '{}' is also a chain", export.sheet)));
            }
            if self.section_config(&export.interest_sheet, &export.interest_section).is_none() {
                return Err(config_error(&format!(
                    "export interest section '{}' on '{}' is not configured",
                    export.interest_section, export.interest_sheet
                )));
            }
        }

        if let Some(purchase) = &self.purchase {
            if purchase.block_rows < PurchaseCosts::ITEMS as u32 + 1
                || purchase.block_cols == 0
                || purchase.blocks_per_row == 0
            {
                return Err(config_error("purchase blocks are too small"));
            }
            let offsets = [purchase.name_offset, purchase.months_offset, purchase.amount_offset];
            if offsets.iter().any(|&o| o >= purchase.block_cols)
                || purchase.management_fee_row >= purchase.block_rows
            {
                return Err(config_error("purchase block offsets fall outside the block"));
            }
        }
        Ok(())
    }

    /// Looks a section up by sheet and id across every chain.
    pub fn section_config(&self, sheet: &str, id: &str) -> Option<&SectionConfig> {
        self.chains()
            .filter(|c| c.sheet.eq_ignore_ascii_case(sheet))
            .flat_map(|c| c.sections.iter())
            .find(|s| s.id == id)
    }
}

fn config_error(message: &str) -> LayoutError {
    LayoutError::Config(message.to_string())
}

/// Resolves a column letter, rejecting anything that is not one.
pub(crate) fn column(letters: &str) -> Result<u32, LayoutError> {
    col_to_index(letters).ok_or_else(|| config_error(&format!("'{}' is not a column", letters)))
}

/// First row of the chain and the row just past its last trailer (1-based).
fn chain_extent(chain: &ChainConfig) -> (u32, u32) {
    let start = chain.sections.first().map(|s| s.header_row).unwrap_or(0);
    let end = chain
        .sections
        .last()
        .map(|s| s.header_row + s.capacity * s.stride + s.trailer_rows)
        .unwrap_or(0);
    (start, end)
}

fn validate_chain(chain: &ChainConfig) -> Result<(), LayoutError> {
    if chain.sections.is_empty() {
        return Err(config_error(&format!("chain on '{}' has no sections", chain.sheet)));
    }
    let mut ids: Vec<&str> = Vec::new();
    for (i, section) in chain.sections.iter().enumerate() {
        let name = format!("section {} on '{}'", section.id, chain.sheet);
        if ids.contains(&section.id.as_str()) {
            return Err(config_error(&format!("duplicate {}", name)));
        }
        ids.push(&section.id);
        if section.header_row == 0 {
            return Err(config_error(&format!("{} has no header row", name)));
        }
        if section.capacity == 0 || section.stride == 0 {
            return Err(config_error(&format!("{} has zero capacity or stride", name)));
        }
        if let Some(template) = section.template_record {
            if template >= section.capacity {
                return Err(config_error(&format!(
                    "{}: template record {} is outside its {} records",
                    name, template, section.capacity
                )));
            }
        }
        if let Some(sequence) = &section.sequence {
            column(&sequence.column)?;
        }
        if let Some(next) = chain.sections.get(i + 1) {
            let data_end = section.header_row + section.capacity * section.stride;
            if next.header_row <= section.header_row {
                return Err(config_error(&format!("{}: header rows must increase", name)));
            }
            if next.header_row < data_end {
                return Err(config_error(&format!(
                    "{} overlaps section {}",
                    name, next.id
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = LayoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.primary.chain.sections.len(), 5);
        assert_eq!(config.registry_sheet(), INCOME_SHEET);
        assert_eq!(config.item_mapping.get("修繕費"), Some(&ExpenseSection::D));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = LayoutConfig::from_json_str(r#"{ "max_records": 100 }"#).unwrap();
        assert_eq!(config.max_records, 100);
        assert_eq!(config.primary.chain.sections[1].header_row, 78);
        assert_eq!(config.auxiliary.len(), 3);
    }

    #[test]
    fn overlapping_sections_are_rejected() {
        let mut config = LayoutConfig::default();
        config.primary.chain.sections[1].header_row = 70;
        assert!(matches!(config.validate(), Err(LayoutError::Config(_))));
    }

    #[test]
    fn decreasing_header_rows_are_rejected() {
        let mut config = LayoutConfig::default();
        config.primary.chain.sections[2].header_row = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn template_outside_section_is_rejected() {
        let mut config = LayoutConfig::default();
        config.auxiliary[0].sections[0].template_record = Some(20);
        assert!(config.validate().is_err());
    }

    #[test]
    fn protected_placement_column_is_rejected() {
        let mut config = LayoutConfig::default();
        config.primary.protected_columns.push("U".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn registry_overlapping_chain_is_rejected() {
        let mut config = LayoutConfig::default();
        config.registry.last_row = 60;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_settlement_section_is_rejected() {
        let mut config = LayoutConfig::default();
        config.settlement.section = "nowhere".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn transfer_labels_must_fit_the_record() {
        let mut config = LayoutConfig::default();
        assert_eq!(config.section_config(USEFUL_LIFE_SHEET, "assets").map(|s| s.stride), Some(2));
        config.transfer.kinds.push("付属".to_string());
        assert!(config.validate().is_err());
        config.transfer.kinds.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn export_and_purchase_can_be_switched_off() {
        let config = LayoutConfig::from_json_str(r#"{ "export": null, "purchase": null }"#).unwrap();
        assert!(config.export.is_none());
        assert!(config.purchase.is_none());
        assert_eq!(config.transfer.kinds, vec!["躯体".to_string(), "設備".to_string()]);

        let mut config = LayoutConfig::default();
        if let Some(export) = config.export.as_mut() {
            export.interest_section = "nowhere".to_string();
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn purchase_blocks_tile_across_then_down() {
        let purchase = PurchaseConfig::default();
        assert_eq!(purchase.block_origin(0), (0, 0));
        assert_eq!(purchase.block_origin(1), (0, 5));
        assert_eq!(purchase.block_origin(4), (0, 20));
        assert_eq!(purchase.block_origin(5), (16, 0));
        assert_eq!(purchase.block_origin(11), (32, 5));
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, r#"{ "item_mapping": { "清掃費": "B" } }"#).unwrap();
        let config = LayoutConfig::load(&path).unwrap();
        assert_eq!(config.item_mapping.len(), 1);
        assert_eq!(config.item_mapping.get("清掃費"), Some(&ExpenseSection::B));
        assert!(LayoutConfig::load(&dir.path().join("missing.json")).is_err());
    }
}
