// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde_json::Value;
use std::collections::BTreeSet;

use crate::fence::{RequestFence, Ticket};
use crate::ids::VehicleId;
use crate::model::Vehicle;
use crate::normalize::Normalizer;
use crate::paging::Paginator;
use crate::query::{FilterCriteria, FilterEdit, QueryCache, VehicleList};
use crate::selection::{FavoriteSelection, SelectionChange};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load vehicles. Check your connection.";

/// What the runtime should fetch for a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    Catalog,
    Filtered(FilterCriteria),
    Favorites,
    ToggleFavorite { vehicle: VehicleId, code: String },
}

/// A finished fetch. Toggling a favorite completes with the refreshed
/// favorites list.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Vehicles(Result<Vec<Value>, String>),
    Favorites(Result<Vec<Value>, String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingCommand {
    Reload,
    SetQuery(String),
    OpenFilters,
    EditFilter(FilterEdit),
    ApplyFilters,
    ClearFilters,
    CloseFilters,
    LoadMore,
    RefreshFavorites,
    ToggleFavorite(VehicleId),
    ToggleSelection(VehicleId),
    Compare,
    DismissNotice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingEvent {
    FetchRequested { ticket: Ticket, request: FetchRequest },
    VehiclesLoaded { count: usize, rejected: usize },
    FavoritesLoaded { count: usize },
    FetchFailed(String),
    StaleResponseDiscarded(Ticket),
    QueryChanged(String),
    FilterPanelOpened,
    FilterPanelClosed,
    FilterDraftChanged,
    FiltersApplied(FilterCriteria),
    FiltersCleared,
    PageExtended { visible: usize },
    NoMorePages,
    SelectionChanged(Vec<VehicleId>),
    CompareReady(VehicleId, VehicleId),
    Notice(String),
    NoticeCleared,
}

/// View state of the vehicle listing screen.
#[derive(Debug, Clone)]
pub struct ListingState {
    pub query: String,
    pub criteria: FilterCriteria,
    pub draft: Option<FilterCriteria>,
    pub selection: FavoriteSelection,
    pub favorited: BTreeSet<VehicleId>,
    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
    list: VehicleList,
    cache: QueryCache,
    paginator: Paginator,
    list_fence: RequestFence,
    favorites_fence: RequestFence,
    normalizer: Normalizer,
}

impl ListingState {
    pub fn new(normalizer: Normalizer, page_step: usize) -> Self {
        let mut state = Self {
            query: String::new(),
            criteria: FilterCriteria::default(),
            draft: None,
            selection: FavoriteSelection::new(),
            favorited: BTreeSet::new(),
            loading: false,
            error: None,
            notice: None,
            list: VehicleList::default(),
            cache: QueryCache::new(),
            paginator: Paginator::new(page_step),
            list_fence: RequestFence::new(),
            favorites_fence: RequestFence::new(),
            normalizer,
        };
        state.sync();
        state
    }

    pub fn dispatch(&mut self, command: ListingCommand) -> Vec<ListingEvent> {
        match command {
            ListingCommand::Reload => vec![self.request_list()],
            ListingCommand::SetQuery(query) => {
                self.query = query;
                self.sync();
                vec![ListingEvent::QueryChanged(self.query.clone())]
            }
            ListingCommand::OpenFilters => {
                self.draft = Some(FilterCriteria::default());
                vec![ListingEvent::FilterPanelOpened]
            }
            ListingCommand::EditFilter(edit) => match self.draft.as_mut() {
                Some(draft) => {
                    draft.apply(edit);
                    vec![ListingEvent::FilterDraftChanged]
                }
                None => Vec::new(),
            },
            ListingCommand::ApplyFilters => {
                let Some(draft) = self.draft.take() else {
                    return Vec::new();
                };
                self.criteria = draft.normalized();
                self.sync();
                vec![
                    ListingEvent::FiltersApplied(self.criteria.clone()),
                    ListingEvent::FilterPanelClosed,
                    self.request_list(),
                ]
            }
            ListingCommand::ClearFilters => {
                if self.draft.is_some() {
                    self.draft = Some(FilterCriteria::default());
                }
                self.criteria = FilterCriteria::default();
                self.sync();
                vec![ListingEvent::FiltersCleared, self.request_list()]
            }
            ListingCommand::CloseFilters => {
                self.draft = None;
                vec![ListingEvent::FilterPanelClosed]
            }
            ListingCommand::LoadMore => {
                let total = self.cache.len();
                if self.paginator.load_more(total) {
                    vec![ListingEvent::PageExtended {
                        visible: self.paginator.window(total),
                    }]
                } else {
                    vec![ListingEvent::NoMorePages]
                }
            }
            ListingCommand::RefreshFavorites => vec![ListingEvent::FetchRequested {
                ticket: self.favorites_fence.issue(),
                request: FetchRequest::Favorites,
            }],
            ListingCommand::ToggleFavorite(id) => match self.list.get(id) {
                Some(vehicle) => {
                    let code = vehicle.code.clone();
                    vec![ListingEvent::FetchRequested {
                        ticket: self.favorites_fence.issue(),
                        request: FetchRequest::ToggleFavorite { vehicle: id, code },
                    }]
                }
                None => vec![self.set_notice(format!("vehicle {id} is not in the list"))],
            },
            ListingCommand::ToggleSelection(id) => match self.selection.toggle(id) {
                Ok(SelectionChange::Added(_) | SelectionChange::Removed(_)) => {
                    vec![ListingEvent::SelectionChanged(self.selection.ids().to_vec())]
                }
                Err(error) => vec![self.set_notice(error.to_string())],
            },
            ListingCommand::Compare => match self.selection.pair() {
                Some((left, right)) => vec![ListingEvent::CompareReady(left, right)],
                None => vec![self.set_notice(
                    "select exactly two vehicles to compare".to_owned(),
                )],
            },
            ListingCommand::DismissNotice => {
                self.notice = None;
                vec![ListingEvent::NoticeCleared]
            }
        }
    }

    /// Applies a fetch result if its ticket is still the latest for its lane.
    pub fn complete_fetch(&mut self, ticket: Ticket, outcome: FetchOutcome) -> Vec<ListingEvent> {
        match outcome {
            FetchOutcome::Vehicles(result) => {
                if !self.list_fence.is_current(ticket) {
                    tracing::debug!(%ticket, "discarding stale vehicle response");
                    return vec![ListingEvent::StaleResponseDiscarded(ticket)];
                }
                self.loading = false;
                match result {
                    Ok(raw) => {
                        let batch = self.normalizer.normalize_all(&raw);
                        let rejected = batch.rejected.len();
                        self.list.replace(batch.vehicles);
                        self.error = None;
                        self.sync();
                        vec![ListingEvent::VehiclesLoaded {
                            count: self.list.len(),
                            rejected,
                        }]
                    }
                    Err(message) => {
                        self.error = Some(message.clone());
                        vec![ListingEvent::FetchFailed(message)]
                    }
                }
            }
            FetchOutcome::Favorites(result) => {
                if !self.favorites_fence.is_current(ticket) {
                    tracing::debug!(%ticket, "discarding stale favorites response");
                    return vec![ListingEvent::StaleResponseDiscarded(ticket)];
                }
                match result {
                    Ok(raw) => {
                        let batch = self.normalizer.normalize_all(&raw);
                        self.favorited = batch.vehicles.iter().map(|vehicle| vehicle.id).collect();
                        let favorites: Vec<VehicleId> = self.favorited.iter().copied().collect();
                        let dropped = self.selection.reconcile(&favorites);

                        let mut events = vec![ListingEvent::FavoritesLoaded {
                            count: self.favorited.len(),
                        }];
                        if !dropped.is_empty() {
                            events.push(ListingEvent::SelectionChanged(
                                self.selection.ids().to_vec(),
                            ));
                        }
                        events
                    }
                    Err(message) => vec![
                        ListingEvent::FetchFailed(message.clone()),
                        self.set_notice(message),
                    ],
                }
            }
        }
    }

    /// The currently revealed slice of the filtered list.
    pub fn visible(&self) -> Vec<&Vehicle> {
        self.cache
            .resolve(&self.list, self.paginator.visible_count())
    }

    pub fn matched_count(&self) -> usize {
        self.cache.len()
    }

    pub fn total_count(&self) -> usize {
        self.list.len()
    }

    pub fn has_more(&self) -> bool {
        self.paginator.has_more(self.cache.len())
    }

    pub fn visible_count(&self) -> usize {
        self.paginator.visible_count()
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.list.get(id)
    }

    /// Loaded vehicle whose catalog code matches `code`, ignoring
    /// surrounding whitespace.
    pub fn find_by_code(&self, code: &str) -> Option<VehicleId> {
        let code = code.trim();
        self.list
            .items()
            .iter()
            .find(|vehicle| vehicle.code.trim() == code)
            .map(|vehicle| vehicle.id)
    }

    pub fn is_favorited(&self, id: VehicleId) -> bool {
        self.favorited.contains(&id)
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    fn request_list(&mut self) -> ListingEvent {
        self.loading = true;
        self.error = None;
        let request = if self.criteria.is_empty() {
            FetchRequest::Catalog
        } else {
            FetchRequest::Filtered(self.criteria.clone())
        };
        ListingEvent::FetchRequested {
            ticket: self.list_fence.issue(),
            request,
        }
    }

    fn sync(&mut self) {
        self.cache.refresh(&self.list, &self.query, &self.criteria);
        self.paginator.observe(self.cache.generation());
    }

    fn set_notice(&mut self, message: String) -> ListingEvent {
        self.notice = Some(message.clone());
        ListingEvent::Notice(message)
    }
}

#[cfg(test)]
mod tests {
    use super::{FetchOutcome, FetchRequest, ListingCommand, ListingEvent, ListingState};
    use crate::VehicleId;
    use crate::normalize::Normalizer;
    use crate::query::{FilterCriteria, FilterEdit};
    use serde_json::{Value, json};

    fn records(count: i64) -> Vec<Value> {
        (1..=count)
            .map(|id| {
                let brand = if id % 2 == 0 { "Fiat" } else { "Toyota" };
                json!({ "veiculo_id": id, "marca": brand })
            })
            .collect()
    }

    fn requested_ticket(events: &[ListingEvent]) -> super::Ticket {
        events
            .iter()
            .find_map(|event| match event {
                ListingEvent::FetchRequested { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("a fetch should have been requested")
    }

    fn loaded_state(count: i64) -> ListingState {
        let mut state = ListingState::new(Normalizer::new("http://api.test"), 20);
        let ticket = requested_ticket(&state.dispatch(ListingCommand::Reload));
        state.complete_fetch(ticket, FetchOutcome::Vehicles(Ok(records(count))));
        state
    }

    #[test]
    fn reload_then_load_more_reveals_pages() {
        let mut state = loaded_state(45);
        assert_eq!(state.visible().len(), 20);

        state.dispatch(ListingCommand::LoadMore);
        let events = state.dispatch(ListingCommand::LoadMore);
        assert_eq!(events, vec![ListingEvent::PageExtended { visible: 45 }]);
        assert_eq!(state.visible_count(), 60);
        assert_eq!(state.visible().len(), 45);
        assert!(!state.has_more());
        assert_eq!(state.dispatch(ListingCommand::LoadMore), vec![ListingEvent::NoMorePages]);
    }

    #[test]
    fn changing_query_resets_pagination() {
        let mut state = loaded_state(45);
        state.dispatch(ListingCommand::LoadMore);
        assert_eq!(state.visible_count(), 40);

        state.dispatch(ListingCommand::SetQuery("toyota".to_owned()));
        assert_eq!(state.visible_count(), 20);
        assert_eq!(state.matched_count(), 23);
        assert!(state.visible().iter().all(|vehicle| vehicle.id.get() % 2 == 1));
    }

    #[test]
    fn stale_response_is_discarded() {
        let mut state = ListingState::new(Normalizer::new("http://api.test"), 20);
        let first = requested_ticket(&state.dispatch(ListingCommand::Reload));
        let second = requested_ticket(&state.dispatch(ListingCommand::Reload));

        let late = state.complete_fetch(first, FetchOutcome::Vehicles(Ok(records(3))));
        assert_eq!(late, vec![ListingEvent::StaleResponseDiscarded(first)]);
        assert_eq!(state.total_count(), 0);
        assert!(state.loading);

        let fresh = state.complete_fetch(second, FetchOutcome::Vehicles(Ok(records(5))));
        assert_eq!(fresh, vec![ListingEvent::VehiclesLoaded { count: 5, rejected: 0 }]);
        assert!(!state.loading);
    }

    #[test]
    fn network_failure_sets_screen_error() {
        let mut state = ListingState::new(Normalizer::new("http://api.test"), 20);
        let ticket = requested_ticket(&state.dispatch(ListingCommand::Reload));
        let events = state.complete_fetch(
            ticket,
            FetchOutcome::Vehicles(Err(super::LOAD_FAILED_MESSAGE.to_owned())),
        );
        assert_eq!(
            events,
            vec![ListingEvent::FetchFailed(super::LOAD_FAILED_MESSAGE.to_owned())]
        );
        assert_eq!(state.error.as_deref(), Some(super::LOAD_FAILED_MESSAGE));
        assert!(!state.loading);
    }

    #[test]
    fn filter_draft_is_applied_once() {
        let mut state = loaded_state(4);
        assert!(state.dispatch(ListingCommand::EditFilter(FilterEdit::Brand(Some("x".to_owned())))).is_empty());

        state.dispatch(ListingCommand::OpenFilters);
        state.dispatch(ListingCommand::EditFilter(FilterEdit::Brand(Some(" fiat ".to_owned()))));
        let events = state.dispatch(ListingCommand::ApplyFilters);

        let applied = FilterCriteria {
            brand: Some("fiat".to_owned()),
            ..FilterCriteria::default()
        };
        assert_eq!(events[0], ListingEvent::FiltersApplied(applied.clone()));
        assert!(matches!(
            &events[2],
            ListingEvent::FetchRequested { request: FetchRequest::Filtered(criteria), .. } if *criteria == applied
        ));
        assert_eq!(state.draft, None);
        assert_eq!(state.matched_count(), 2);
        assert!(state.dispatch(ListingCommand::ApplyFilters).is_empty());
    }

    #[test]
    fn clearing_filters_reloads_catalog() {
        let mut state = loaded_state(4);
        state.dispatch(ListingCommand::OpenFilters);
        state.dispatch(ListingCommand::EditFilter(FilterEdit::Brand(Some("fiat".to_owned()))));
        state.dispatch(ListingCommand::ApplyFilters);

        let events = state.dispatch(ListingCommand::ClearFilters);
        assert_eq!(events[0], ListingEvent::FiltersCleared);
        assert!(matches!(
            events[1],
            ListingEvent::FetchRequested { request: FetchRequest::Catalog, .. }
        ));
        assert!(state.criteria.is_empty());
        assert_eq!(state.matched_count(), 4);
    }

    #[test]
    fn selection_is_capped_and_reconciled_with_favorites() {
        let mut state = loaded_state(20);
        state.dispatch(ListingCommand::ToggleSelection(VehicleId::new(5)));
        state.dispatch(ListingCommand::ToggleSelection(VehicleId::new(9)));

        let rejected = state.dispatch(ListingCommand::ToggleSelection(VehicleId::new(14)));
        assert!(matches!(&rejected[0], ListingEvent::Notice(message) if message.contains("deselect")));
        assert_eq!(state.selection.ids(), &[VehicleId::new(5), VehicleId::new(9)]);

        let compare = state.dispatch(ListingCommand::Compare);
        assert_eq!(
            compare,
            vec![ListingEvent::CompareReady(VehicleId::new(5), VehicleId::new(9))]
        );

        let ticket = requested_ticket(&state.dispatch(ListingCommand::RefreshFavorites));
        let events = state.complete_fetch(
            ticket,
            FetchOutcome::Favorites(Ok(vec![json!({ "veiculo_id": 9 })])),
        );
        assert_eq!(
            events,
            vec![
                ListingEvent::FavoritesLoaded { count: 1 },
                ListingEvent::SelectionChanged(vec![VehicleId::new(9)]),
            ]
        );
        assert!(state.is_favorited(VehicleId::new(9)));
    }

    #[test]
    fn toggle_favorite_requests_with_vehicle_code() {
        let mut state = loaded_state(3);
        let events = state.dispatch(ListingCommand::ToggleFavorite(VehicleId::new(2)));
        assert!(matches!(
            &events[0],
            ListingEvent::FetchRequested {
                request: FetchRequest::ToggleFavorite { code, .. },
                ..
            } if code == "2"
        ));

        let missing = state.dispatch(ListingCommand::ToggleFavorite(VehicleId::new(99)));
        assert!(matches!(&missing[0], ListingEvent::Notice(_)));
    }

    #[test]
    fn vehicles_are_found_by_code() {
        let state = loaded_state(3);
        assert_eq!(state.find_by_code(" 2 "), Some(VehicleId::new(2)));
        assert_eq!(state.find_by_code("99"), None);
    }
}
