// Entity registry - stable index and color per observed tank
use super::tank::TankId;
use std::collections::HashMap;

/// Chart colors, handed out in first-seen order.
pub const PALETTE: [&str; 16] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac", "#1f77b4", "#2ca02c", "#d62728", "#9467bd", "#17becf", "#bcbd22",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    pub id: TankId,
    pub index: usize,
    pub color: &'static str,
}

/// Session-long registry of every tank seen so far.
///
/// Colors depend on arrival order, not on the id value: two sessions that observe
/// the same tanks in a different order assign different colors. Records are never
/// removed, so a tank that stops reporting keeps its slot.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    index_by_id: HashMap<TankId, usize>,
    records: Vec<EntityRecord>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, id: &TankId) -> &EntityRecord {
        let index = match self.index_by_id.get(id) {
            Some(&index) => index,
            None => {
                let index = self.records.len();
                self.records.push(EntityRecord {
                    id: id.clone(),
                    index,
                    color: PALETTE[index % PALETTE.len()],
                });
                self.index_by_id.insert(id.clone(), index);
                tracing::debug!("Registered tank {} at index {}", id, index);
                index
            }
        };
        &self.records[index]
    }

    pub fn get(&self, id: &TankId) -> Option<&EntityRecord> {
        self.index_by_id.get(id).map(|&index| &self.records[index])
    }

    /// Records in assignment order.
    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    pub fn ids(&self) -> Vec<TankId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
