//! Simulated basket token: supply, manager, module statuses and the position list.

use std::collections::HashMap;

use crate::position::{ModuleStatus, Position, PositionKind};
use crate::types::{Address, Amount, Unit};

#[derive(Debug, Clone)]
pub struct BasketToken {
    pub address: Address,
    pub manager: Address,
    pub total_supply: Amount,
    positions: Vec<Position>,
    modules: HashMap<Address, ModuleStatus>,
}

impl BasketToken {
    pub fn new(address: Address, manager: Address, total_supply: Amount) -> Self {
        Self {
            address,
            manager,
            total_supply,
            positions: Vec::new(),
            modules: HashMap::new(),
        }
    }

    /// Positions grouped by component in first-seen order, Default before External.
    pub fn positions(&self) -> Vec<Position> {
        self.positions.clone()
    }

    pub fn default_unit(&self, component: Address) -> Unit {
        self.find(component, PositionKind::Default, None)
            .map(|index| self.positions[index].unit)
            .unwrap_or_else(Unit::zero)
    }

    pub fn external_unit(&self, component: Address, module: Address) -> Unit {
        self.find(component, PositionKind::External, Some(module))
            .map(|index| self.positions[index].unit)
            .unwrap_or_else(Unit::zero)
    }

    pub fn set_default(&mut self, component: Address, unit: Unit) {
        self.upsert(Position::default_position(component, unit));
    }

    pub fn set_external(&mut self, component: Address, module: Address, unit: Unit) {
        self.upsert(Position::external_position(component, module, unit));
    }

    pub fn module_status(&self, module: Address) -> ModuleStatus {
        self.modules.get(&module).copied().unwrap_or(ModuleStatus::None)
    }

    pub fn set_module_status(&mut self, module: Address, status: ModuleStatus) {
        if status == ModuleStatus::None {
            self.modules.remove(&module);
        } else {
            self.modules.insert(module, status);
        }
    }

    fn find(&self, component: Address, kind: PositionKind, module: Option<Address>) -> Option<usize> {
        self.positions
            .iter()
            .position(|p| p.component == component && p.kind == kind && p.module == module)
    }

    // zero removes; a new entry goes after the component's existing entries
    fn upsert(&mut self, position: Position) {
        match self.find(position.component, position.kind, position.module) {
            Some(index) if position.unit.is_zero() => {
                self.positions.remove(index);
            }
            Some(index) => self.positions[index].unit = position.unit,
            None if position.unit.is_zero() => {}
            None => {
                let insert_at = self
                    .positions
                    .iter()
                    .rposition(|p| p.component == position.component)
                    .map(|last| {
                        if position.kind == PositionKind::Default {
                            last + 1 - self.component_len(position.component)
                        } else {
                            last + 1
                        }
                    })
                    .unwrap_or(self.positions.len());
                self.positions.insert(insert_at, position);
            }
        }
    }

    fn component_len(&self, component: Address) -> usize {
        self.positions.iter().filter(|p| p.component == component).count()
    }
}
