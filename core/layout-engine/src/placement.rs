//! FILENAME: core/layout-engine/src/placement.rs
//! PURPOSE: Writes parsed records into their final rows.
//! CONTEXT: Runs after the reshape, so every destination row comes from the
//! plan. Record k lands on row `section_start + k` of every primary section.
//! The property name is stored once in the registry table and every
//! section refers back to it by formula.

use crate::config::{column, ExpenseSection, LayoutConfig};
use crate::error::{LayoutError, StructuralError};
use crate::plan::{RowShiftPlan, WorkbookPlan};
use crate::record::{sum, Months, PropertyRecord, SettlementRecord};
use crate::report::PropertyResult;
use engine::{index_to_col, CellValue, Sheet, Workbook};
use once_cell::sync::Lazy;
use parser::{to_formula, Expression};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Registry key: whitespace removed (including full-width spaces), lower case.
pub fn normalize_name(name: &str) -> String {
    WHITESPACE.replace_all(name, "").to_lowercase()
}

/// Result of looking a property up in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySlot {
    Existing(u32),
    Vacant(u32),
    Full,
}

#[derive(Debug, Clone)]
struct RegistryColumns {
    name: u32,
    tenant: u32,
    contract_start: u32,
    contract_end: u32,
    area: u32,
    annual_rent: u32,
}

#[derive(Debug, Clone, Copy)]
struct Roles {
    income: usize,
    management_fee: usize,
    advertising: usize,
    repairs: usize,
    sublease: usize,
}

impl Roles {
    fn all(&self) -> [usize; 5] {
        [
            self.income,
            self.management_fee,
            self.advertising,
            self.repairs,
            self.sublease,
        ]
    }
}

pub struct RecordPlacer<'a> {
    config: &'a LayoutConfig,
    plan: &'a RowShiftPlan,
    settlement: Option<(&'a RowShiftPlan, usize)>,
    roles: Roles,
    label: u32,
    property: u32,
    first_month: u32,
    total: u32,
    protected: Vec<u32>,
    registry: RegistryColumns,
}

impl<'a> RecordPlacer<'a> {
    pub fn new(config: &'a LayoutConfig, plans: &'a WorkbookPlan) -> Result<Self, LayoutError> {
        let primary = &config.primary;
        let plan = plans
            .get(&primary.chain.sheet)
            .ok_or_else(|| StructuralError::MissingSheet(primary.chain.sheet.clone()))?;
        let role = |id: &str| {
            plan.chain
                .index_of(id)
                .ok_or_else(|| LayoutError::Config(format!("primary chain has no section '{}'", id)))
        };
        let roles = Roles {
            income: role(&primary.roles.income)?,
            management_fee: role(&primary.roles.management_fee)?,
            advertising: role(&primary.roles.advertising)?,
            repairs: role(&primary.roles.repairs)?,
            sublease: role(&primary.roles.sublease)?,
        };
        let settlement = plans.get(&config.settlement.sheet).and_then(|p| {
            p.chain
                .index_of(&config.settlement.section)
                .map(|index| (p, index))
        });
        let registry = &config.registry;
        Ok(RecordPlacer {
            config,
            plan,
            settlement,
            roles,
            label: column(&primary.columns.label)?,
            property: column(&primary.columns.property)?,
            first_month: column(&primary.columns.first_month)?,
            total: column(&primary.columns.total)?,
            protected: primary
                .protected_columns
                .iter()
                .map(|c| column(c))
                .collect::<Result<_, _>>()?,
            registry: RegistryColumns {
                name: column(&registry.name)?,
                tenant: column(&registry.tenant)?,
                contract_start: column(&registry.contract_start)?,
                contract_end: column(&registry.contract_end)?,
                area: column(&registry.area)?,
                annual_rent: column(&registry.annual_rent)?,
            },
        })
    }

    /// Places annual records first, then settlements, in input order.
    /// `progress` is called with (placed, total) after every record.
    pub fn place(
        &self,
        workbook: &mut Workbook,
        records: &[&PropertyRecord],
        settlements: &[SettlementRecord],
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<Vec<PropertyResult>, LayoutError> {
        let total = records.len() + settlements.len();
        self.check_capacity(records, settlements)?;

        let mut results = Vec::with_capacity(total);
        let mut claimed = BTreeSet::new();
        for (k, record) in records.iter().enumerate() {
            let result = self.place_statement(workbook, k as u32, record, &mut claimed)?;
            results.push(result);
            progress(k + 1, total);
        }
        for (i, settlement) in settlements.iter().enumerate() {
            let k = records.len() + i;
            let result = self.place_settlement(workbook, k as u32, settlement, &mut claimed)?;
            results.push(result);
            progress(k + 1, total);
        }
        Ok(results)
    }

    /// Fails before writing anything if a slot has no row.
    fn check_capacity(&self, records: &[&PropertyRecord], settlements: &[SettlementRecord]) -> Result<(), LayoutError> {
        let total = (records.len() + settlements.len()) as u32;
        let name_of = |k: u32| -> String {
            let k = k as usize;
            match records.get(k) {
                Some(record) => record.name().unwrap_or("(unnamed)").to_string(),
                None => settlements
                    .get(k - records.len())
                    .map(|s| s.property_name.clone())
                    .unwrap_or_default(),
            }
        };
        for index in self.roles.all() {
            let capacity = self.plan.record_count(index);
            if total > capacity {
                return Err(LayoutError::PlacementCapacity {
                    index: capacity + 1,
                    property: name_of(capacity),
                    section: self.plan.section(index).id.clone(),
                    capacity,
                });
            }
        }
        if let Some((plan, index)) = self.settlement {
            let capacity = plan.record_count(index);
            if !settlements.is_empty() && total > capacity {
                return Err(LayoutError::PlacementCapacity {
                    index: capacity + 1,
                    property: name_of(capacity),
                    section: plan.section(index).id.clone(),
                    capacity,
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // REGISTRY
    // ========================================================================

    /// Finds the registry row for `name`. An exact match on the normalised
    /// name wins. Otherwise a row whose name contains (or is contained in)
    /// `name` is reused, provided it is the only such row and was not
    /// claimed earlier in this batch. Else the first empty row.
    pub fn lookup(&self, sheet: &Sheet, name: &str, claimed: &BTreeSet<u32>) -> RegistrySlot {
        let wanted = normalize_name(name);
        let mut vacant = None;
        let mut partial = Vec::new();
        for row in self.config.registry.first_row..=self.config.registry.last_row {
            let existing = sheet
                .value(row - 1, self.registry.name)
                .and_then(|v| v.as_text())
                .map(normalize_name)
                .unwrap_or_default();
            if existing.is_empty() {
                vacant.get_or_insert(row);
                continue;
            }
            if wanted.is_empty() {
                continue;
            }
            if existing == wanted {
                return RegistrySlot::Existing(row);
            }
            if !claimed.contains(&row) && (existing.contains(&wanted) || wanted.contains(&existing)) {
                partial.push(row);
            }
        }
        match partial.as_slice() {
            [row] => RegistrySlot::Existing(*row),
            _ => {
                if partial.len() > 1 {
                    log::debug!("registry: '{}' matches rows {:?} partially, none reused", name, partial);
                }
                vacant.map(RegistrySlot::Vacant).unwrap_or(RegistrySlot::Full)
            }
        }
    }

    /// Claims (or reuses) the registry row and fills in what the statement
    /// knows. `None` when the registry is full.
    fn register(
        &self,
        workbook: &mut Workbook,
        name: &str,
        record: Option<&PropertyRecord>,
        claimed: &mut BTreeSet<u32>,
    ) -> Result<Option<u32>, LayoutError> {
        let sheet_name = self.config.registry_sheet();
        let sheet = workbook
            .sheet_mut(sheet_name)
            .ok_or_else(|| StructuralError::MissingSheet(sheet_name.to_string()))?;
        let row = match self.lookup(sheet, name, claimed) {
            RegistrySlot::Existing(row) => row,
            RegistrySlot::Vacant(row) => {
                sheet.set_value(row - 1, self.registry.name, CellValue::Text(name.to_string()));
                log::debug!("registry: '{}' claims row {}", name, row);
                claimed.insert(row);
                row
            }
            RegistrySlot::Full => return Ok(None),
        };
        if let Some(record) = record {
            let cols = &self.registry;
            let texts = [
                (cols.tenant, &record.tenant_name),
                (cols.contract_start, &record.contract_start),
                (cols.contract_end, &record.contract_end),
            ];
            for (col, text) in texts {
                if let Some(text) = text {
                    sheet.set_value(row - 1, col, CellValue::Text(text.clone()));
                }
            }
            if let Some(area) = record.rental_area {
                sheet.set_value(row - 1, cols.area, CellValue::Number(area));
            }
            sheet.set_value(row - 1, cols.annual_rent, CellValue::Number(record.income_total()));
        }
        Ok(Some(row))
    }

    // ========================================================================
    // SECTIONS
    // ========================================================================

    fn place_statement(
        &self,
        workbook: &mut Workbook,
        k: u32,
        record: &PropertyRecord,
        claimed: &mut BTreeSet<u32>,
    ) -> Result<PropertyResult, LayoutError> {
        let Some(name) = record.name() else {
            return Ok(PropertyResult::error(
                None,
                format!("record {}: property name could not be extracted; its rows stay empty", k + 1),
            ));
        };
        let Some(registry_row) = self.register(workbook, name, Some(record), claimed)? else {
            return Ok(self.registry_full(name));
        };

        let labels = &self.config.primary.labels;
        let mapping = &self.config.item_mapping;
        let roles = self.roles;
        let sheet = self.primary_sheet(workbook)?;
        let mut rows = BTreeMap::new();

        let row = self.write_head(sheet, roles.income, k, Some(labels.income.as_str()), registry_row, &mut rows)?;
        self.write_months(sheet, row, &record.income, |v| v != 0.0)?;
        self.write_value(sheet, row, self.total, CellValue::Number(record.income_total()))?;

        let expenses = [
            (roles.management_fee, &labels.management_fee, ExpenseSection::B, true),
            (roles.advertising, &labels.advertising, ExpenseSection::C, false),
            (roles.repairs, &labels.repairs, ExpenseSection::D, false),
        ];
        for (index, label, category, always_total) in expenses {
            let row = self.write_head(sheet, index, k, Some(label.as_str()), registry_row, &mut rows)?;
            let months = record.expenses(category, mapping);
            self.write_months(sheet, row, &months, |v| v > 0.0)?;
            let total = sum(&months);
            if always_total || total > 0.0 {
                self.write_value(sheet, row, self.total, CellValue::Number(total))?;
            }
        }
        self.write_sublease(sheet, k, &mut rows)?;

        Ok(PropertyResult::success(
            name,
            format!("record {} placed (registry row {})", k + 1, registry_row),
            rows,
        ))
    }

    fn place_settlement(
        &self,
        workbook: &mut Workbook,
        k: u32,
        settlement: &SettlementRecord,
        claimed: &mut BTreeSet<u32>,
    ) -> Result<PropertyResult, LayoutError> {
        let name = settlement.property_name.trim();
        if name.is_empty() {
            return Ok(PropertyResult::error(
                None,
                format!("settlement {}: property name could not be extracted", k + 1),
            ));
        }
        let Some(registry_row) = self.register(workbook, name, None, claimed)? else {
            return Ok(self.registry_full(name));
        };

        let roles = self.roles;
        let sheet = self.primary_sheet(workbook)?;
        let mut rows = BTreeMap::new();
        for index in [roles.income, roles.management_fee, roles.advertising, roles.repairs] {
            self.write_head(sheet, index, k, None, registry_row, &mut rows)?;
        }
        self.write_sublease(sheet, k, &mut rows)?;

        let mut message = format!("settlement placed as record {} (registry row {})", k + 1, registry_row);
        match self.settlement {
            Some((plan, index)) => {
                let row = plan.record_row(index, k, 0);
                let settlement_config = &self.config.settlement;
                let sheet = workbook
                    .sheet_mut(plan.sheet())
                    .ok_or_else(|| StructuralError::MissingSheet(plan.sheet().to_string()))?;
                sheet.set_value(row - 1, column(&settlement_config.land_price)?, CellValue::Number(settlement.land_price));
                sheet.set_value(
                    row - 1,
                    column(&settlement_config.building_price)?,
                    CellValue::Number(settlement.building_price),
                );
                rows.insert(plan.section(index).id.clone(), row);
            }
            None => message.push_str("; no settlement section configured, prices skipped"),
        }
        Ok(PropertyResult::success(name, message, rows))
    }

    fn registry_full(&self, name: &str) -> PropertyResult {
        let registry = &self.config.registry;
        PropertyResult::error(
            Some(name),
            format!(
                "property registry is full (rows {}-{})",
                registry.first_row, registry.last_row
            ),
        )
    }

    fn primary_sheet<'w>(&self, workbook: &'w mut Workbook) -> Result<&'w mut Sheet, LayoutError> {
        let name = self.plan.sheet();
        workbook
            .sheet_mut(name)
            .ok_or_else(|| StructuralError::MissingSheet(name.to_string()).into())
    }

    /// Label and registry reference of record `k` in one section.
    fn write_head(
        &self,
        sheet: &mut Sheet,
        index: usize,
        k: u32,
        label: Option<&str>,
        registry_row: u32,
        rows: &mut BTreeMap<String, u32>,
    ) -> Result<u32, LayoutError> {
        let row = self.plan.record_row(index, k, 0);
        if let Some(label) = label {
            self.write_value(sheet, row, self.label, CellValue::Text(label.to_string()))?;
        }
        self.write_formula(sheet, row, self.property, &self.registry_reference(registry_row))?;
        rows.insert(self.plan.section(index).id.clone(), row);
        Ok(row)
    }

    /// `=G4`, or `='Sheet'!G4` when the registry lives on another sheet.
    fn registry_reference(&self, registry_row: u32) -> String {
        let col = index_to_col(self.registry.name);
        let registry_sheet = self.config.registry_sheet();
        let cell = if registry_sheet.eq_ignore_ascii_case(self.plan.sheet()) {
            Expression::cell(&col, registry_row)
        } else {
            Expression::sheet_cell(registry_sheet, &col, registry_row)
        };
        to_formula(&cell)
    }

    /// The sublease section only mirrors the repairs section's property.
    fn write_sublease(&self, sheet: &mut Sheet, k: u32, rows: &mut BTreeMap<String, u32>) -> Result<(), LayoutError> {
        let row = self.plan.record_row(self.roles.sublease, k, 0);
        let source = self.plan.record_row(self.roles.repairs, k, 0);
        let property = index_to_col(self.property);
        self.write_formula(sheet, row, self.property, &format!("={}{}", property, source))?;
        rows.insert(self.plan.section(self.roles.sublease).id.clone(), row);
        Ok(())
    }

    fn write_months(&self, sheet: &mut Sheet, row: u32, months: &Months, keep: impl Fn(f64) -> bool) -> Result<(), LayoutError> {
        for (offset, value) in months.iter().enumerate() {
            if keep(*value) {
                self.write_value(sheet, row, self.first_month + offset as u32, CellValue::Number(*value))?;
            }
        }
        Ok(())
    }

    fn guard(&self, sheet: &Sheet, col: u32) -> Result<(), LayoutError> {
        if self.protected.contains(&col) {
            return Err(LayoutError::ProtectedColumn {
                sheet: sheet.name.clone(),
                column: index_to_col(col),
            });
        }
        Ok(())
    }

    fn write_value(&self, sheet: &mut Sheet, row: u32, col: u32, value: CellValue) -> Result<(), LayoutError> {
        self.guard(sheet, col)?;
        sheet.set_value(row - 1, col, value);
        Ok(())
    }

    fn write_formula(&self, sheet: &mut Sheet, row: u32, col: u32, formula: &str) -> Result<(), LayoutError> {
        self.guard(sheet, col)?;
        sheet.set_formula(row - 1, col, formula);
        Ok(())
    }
}
