// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

use crate::ids::VehicleId;

pub const COMPARE_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("you can only compare {capacity} vehicles at a time -- deselect one first")]
    Full { capacity: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Added(VehicleId),
    Removed(VehicleId),
}

/// Vehicles picked for side-by-side comparison, in pick order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSelection {
    ids: Vec<VehicleId>,
}

impl FavoriteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: VehicleId) -> Result<SelectionChange, SelectionError> {
        if let Some(position) = self.ids.iter().position(|selected| *selected == id) {
            self.ids.remove(position);
            return Ok(SelectionChange::Removed(id));
        }
        if self.ids.len() >= COMPARE_CAPACITY {
            return Err(SelectionError::Full {
                capacity: COMPARE_CAPACITY,
            });
        }
        self.ids.push(id);
        Ok(SelectionChange::Added(id))
    }

    pub fn contains(&self, id: VehicleId) -> bool {
        self.ids.contains(&id)
    }

    pub fn ids(&self) -> &[VehicleId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn can_compare(&self) -> bool {
        self.ids.len() == COMPARE_CAPACITY
    }

    pub fn pair(&self) -> Option<(VehicleId, VehicleId)> {
        match self.ids.as_slice() {
            [first, second] => Some((*first, *second)),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops every selected id that is no longer a favorite and returns
    /// the dropped ids.
    pub fn reconcile(&mut self, favorites: &[VehicleId]) -> Vec<VehicleId> {
        let (kept, dropped): (Vec<VehicleId>, Vec<VehicleId>) = self
            .ids
            .iter()
            .partition(|id| favorites.contains(id));
        self.ids = kept;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::{FavoriteSelection, SelectionChange, SelectionError};
    use crate::VehicleId;

    fn id(value: i64) -> VehicleId {
        VehicleId::new(value)
    }

    #[test]
    fn third_pick_is_rejected_and_deselect_frees_a_slot() {
        let mut selection = FavoriteSelection::new();
        assert_eq!(selection.toggle(id(5)), Ok(SelectionChange::Added(id(5))));
        assert_eq!(selection.toggle(id(9)), Ok(SelectionChange::Added(id(9))));
        assert!(selection.can_compare());

        let error = selection
            .toggle(id(14))
            .expect_err("third vehicle should not fit");
        assert_eq!(error, SelectionError::Full { capacity: 2 });
        assert!(error.to_string().contains("deselect one first"));
        assert_eq!(selection.ids(), &[id(5), id(9)]);

        assert_eq!(selection.toggle(id(5)), Ok(SelectionChange::Removed(id(5))));
        assert_eq!(selection.ids(), &[id(9)]);
        assert!(!selection.can_compare());
    }

    #[test]
    fn pair_keeps_pick_order() {
        let mut selection = FavoriteSelection::new();
        assert_eq!(selection.pair(), None);
        selection.toggle(id(9)).expect("first pick");
        selection.toggle(id(5)).expect("second pick");
        assert_eq!(selection.pair(), Some((id(9), id(5))));
    }

    #[test]
    fn reconcile_drops_unfavorited_ids() {
        let mut selection = FavoriteSelection::new();
        selection.toggle(id(1)).expect("first pick");
        selection.toggle(id(2)).expect("second pick");

        let dropped = selection.reconcile(&[id(2), id(3)]);
        assert_eq!(dropped, vec![id(1)]);
        assert_eq!(selection.ids(), &[id(2)]);
        assert!(selection.contains(id(2)));
    }
}
