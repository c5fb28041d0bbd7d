// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub const DEFAULT_PAGE_STEP: usize = 20;

/// Incremental reveal over an in-memory filtered set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    step: usize,
    visible_count: usize,
    generation: Option<u64>,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_STEP)
    }
}

impl Paginator {
    pub fn new(step: usize) -> Self {
        let step = step.max(1);
        Self {
            step,
            visible_count: step,
            generation: None,
        }
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn visible_count(&self) -> usize {
        self.visible_count
    }

    /// Grows the window by one step. Returns false when the window
    /// already covers `total`.
    pub fn load_more(&mut self, total: usize) -> bool {
        if self.visible_count >= total {
            return false;
        }
        self.visible_count += self.step;
        true
    }

    pub fn window(&self, total: usize) -> usize {
        self.visible_count.min(total)
    }

    pub fn has_more(&self, total: usize) -> bool {
        self.visible_count < total
    }

    pub fn reset(&mut self) {
        self.visible_count = self.step;
    }

    /// Resets when the filtered set's generation differs from the last one
    /// seen. Returns true if it reset.
    pub fn observe(&mut self, generation: u64) -> bool {
        if self.generation == Some(generation) {
            return false;
        }
        self.generation = Some(generation);
        self.reset();
        true
    }

    pub fn page<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.window(items.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PAGE_STEP, Paginator};

    #[test]
    fn grows_by_step_until_covering_total() {
        let mut paginator = Paginator::default();
        assert_eq!(paginator.visible_count(), DEFAULT_PAGE_STEP);

        assert!(paginator.load_more(45));
        assert!(paginator.load_more(45));
        assert_eq!(paginator.visible_count(), 60);
        assert_eq!(paginator.window(45), 45);
        assert!(!paginator.has_more(45));

        assert!(!paginator.load_more(45));
        assert_eq!(paginator.visible_count(), 60);
    }

    #[test]
    fn small_sets_never_grow() {
        let mut paginator = Paginator::new(20);
        assert!(!paginator.load_more(7));
        assert_eq!(paginator.window(7), 7);
        assert_eq!(paginator.window(0), 0);
    }

    #[test]
    fn new_generation_resets_window() {
        let mut paginator = Paginator::default();
        assert!(paginator.observe(1));
        paginator.load_more(100);
        assert_eq!(paginator.visible_count(), 40);

        assert!(!paginator.observe(1));
        assert_eq!(paginator.visible_count(), 40);

        assert!(paginator.observe(2));
        assert_eq!(paginator.visible_count(), 20);
    }

    #[test]
    fn page_slices_the_window() {
        let items: Vec<u32> = (0..25).collect();
        let mut paginator = Paginator::new(10);
        assert_eq!(paginator.page(&items).len(), 10);
        paginator.load_more(items.len());
        paginator.load_more(items.len());
        assert_eq!(paginator.page(&items).len(), 25);
    }

    #[test]
    fn zero_step_is_clamped() {
        let paginator = Paginator::new(0);
        assert_eq!(paginator.step(), 1);
    }
}
