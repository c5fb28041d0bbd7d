// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use smvbr_api::{ApiError, Client};
use smvbr_app::{
    ComparisonReport, FetchOutcome, FetchRequest, FormPayload, LOAD_FAILED_MESSAGE,
    ListingCommand, ListingEvent, ListingState, SessionContext, Vehicle,
};
use std::fmt::Write as _;

pub const SIGN_IN_MESSAGE: &str = "sign in first: run `smvbr login <email> <password>`";

/// Result of a submitted form: the text to show and the session to persist
/// when the submission created or changed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub message: String,
    pub session: Option<SessionContext>,
}

/// Runs listing commands against the remote API, feeding every requested
/// fetch back into the state under its ticket.
pub struct ApiRuntime<'a> {
    client: &'a Client,
    session: Option<SessionContext>,
    search: Option<String>,
    server_note: Option<String>,
}

impl<'a> ApiRuntime<'a> {
    pub fn new(client: &'a Client, session: Option<SessionContext>) -> Self {
        Self {
            client,
            session,
            search: None,
            server_note: None,
        }
    }

    /// Sends `search` to the server on catalog loads instead of filtering
    /// locally.
    pub fn with_remote_search(mut self, search: &str) -> Self {
        self.search = Some(search.trim().to_owned()).filter(|search| !search.is_empty());
        self
    }

    /// The note the server attached to the last catalog page, if any.
    pub fn server_note(&self) -> Option<&str> {
        self.server_note.as_deref()
    }

    /// Validates `payload` locally, then sends it to the matching endpoint.
    /// Account changes need a session; sign-in and registration do not.
    pub async fn submit_form(&self, payload: &FormPayload) -> Result<Submitted> {
        let kind = payload.kind();
        payload.validate()?;
        tracing::debug!(?kind, "submitting form");

        match payload {
            FormPayload::Login(form) => {
                let response = self.client.login(form).await.context("sign in")?;
                let user_id = response.user_id.ok_or_else(|| {
                    anyhow!(
                        "the server accepted the login but returned no usuario_id; update the API so /login includes it"
                    )
                })?;
                let session = SessionContext::new(user_id)
                    .with_name(response.name.unwrap_or_default())
                    .with_email(form.email.trim());
                let message = response
                    .message
                    .unwrap_or_else(|| format!("signed in as {}", session.greeting_name()));
                Ok(Submitted {
                    message,
                    session: Some(session),
                })
            }
            FormPayload::Registration(form) => {
                let user = self.client.register(form).await.context("register")?;
                let session = user.session();
                Ok(Submitted {
                    message: format!("welcome, {}", session.greeting_name()),
                    session: Some(session),
                })
            }
            FormPayload::ChangeName(form) => {
                let session = self.signed_in()?;
                let note = self
                    .client
                    .change_name(session, form)
                    .await
                    .context("change name")?;
                Ok(account_updated(note, session.clone().with_name(form.name.trim())))
            }
            FormPayload::ChangeEmail(form) => {
                let session = self.signed_in()?;
                let note = self
                    .client
                    .change_email(session, form)
                    .await
                    .context("change email")?;
                Ok(account_updated(note, session.clone().with_email(form.email.trim())))
            }
            FormPayload::ChangePassword(form) => {
                let session = self.signed_in()?;
                let note = self
                    .client
                    .change_password(session, form)
                    .await
                    .context("change password")?;
                Ok(Submitted {
                    message: note.unwrap_or_else(|| "account updated".to_owned()),
                    session: None,
                })
            }
        }
    }

    /// Loads the catalog, flips the favorite flag of the vehicle with `code`
    /// and reports the outcome.
    pub async fn toggle_favorite_code(
        &mut self,
        state: &mut ListingState,
        code: &str,
    ) -> Result<String> {
        self.signed_in()?;
        self.run(state, ListingCommand::Reload).await;
        if let Some(error) = state.error.clone() {
            bail!(error);
        }
        let id = state
            .find_by_code(code)
            .ok_or_else(|| anyhow!("no vehicle with code {:?} in the catalog", code.trim()))?;

        self.server_note = None;
        state.notice = None;
        self.run(state, ListingCommand::ToggleFavorite(id)).await;
        if let Some(notice) = state.notice.clone() {
            bail!(notice);
        }
        Ok(self.server_note.clone().unwrap_or_else(|| {
            if state.is_favorited(id) {
                format!("vehicle {id} added to favorites")
            } else {
                format!("vehicle {id} removed from favorites")
            }
        }))
    }

    fn signed_in(&self) -> Result<&SessionContext> {
        self.session.as_ref().ok_or_else(|| anyhow!(SIGN_IN_MESSAGE))
    }

    pub async fn run(
        &mut self,
        state: &mut ListingState,
        command: ListingCommand,
    ) -> Vec<ListingEvent> {
        let dispatched = state.dispatch(command);
        let mut events = Vec::with_capacity(dispatched.len());
        for event in dispatched {
            let pending = match &event {
                ListingEvent::FetchRequested { ticket, request } => {
                    Some((*ticket, request.clone()))
                }
                _ => None,
            };
            events.push(event);
            if let Some((ticket, request)) = pending {
                let outcome = self.fetch(request).await;
                events.extend(state.complete_fetch(ticket, outcome));
            }
        }
        events
    }

    async fn fetch(&mut self, request: FetchRequest) -> FetchOutcome {
        match request {
            FetchRequest::Catalog => {
                let page = self.client.list_vehicles(self.search.as_deref()).await;
                match page {
                    Ok(page) => {
                        self.server_note = page.message;
                        FetchOutcome::Vehicles(Ok(page.records))
                    }
                    Err(error) => FetchOutcome::Vehicles(Err(load_failure(&error))),
                }
            }
            FetchRequest::Filtered(criteria) => FetchOutcome::Vehicles(
                self.client
                    .filter_vehicles(&criteria)
                    .await
                    .map_err(|error| load_failure(&error)),
            ),
            FetchRequest::Favorites => {
                let Some(session) = self.session.as_ref() else {
                    return FetchOutcome::Favorites(Err(SIGN_IN_MESSAGE.to_owned()));
                };
                FetchOutcome::Favorites(
                    self.client
                        .favorites(session)
                        .await
                        .map_err(|error| error.user_message()),
                )
            }
            FetchRequest::ToggleFavorite { vehicle, code } => {
                let Some(session) = self.session.as_ref() else {
                    return FetchOutcome::Favorites(Err(SIGN_IN_MESSAGE.to_owned()));
                };
                match self.client.toggle_favorite(session, &code).await {
                    Ok(note) => self.server_note = note,
                    Err(error) => {
                        tracing::warn!(%vehicle, error = %error, "favorite toggle failed");
                        return FetchOutcome::Favorites(Err(error.user_message()));
                    }
                }
                FetchOutcome::Favorites(
                    self.client
                        .favorites(session)
                        .await
                        .map_err(|error| error.user_message()),
                )
            }
        }
    }
}

fn account_updated(note: Option<String>, session: SessionContext) -> Submitted {
    Submitted {
        message: note.unwrap_or_else(|| "account updated".to_owned()),
        session: Some(session),
    }
}

fn load_failure(error: &ApiError) -> String {
    tracing::warn!(error = %error, "vehicle fetch failed");
    LOAD_FAILED_MESSAGE.to_owned()
}

pub fn render_vehicle_line(vehicle: &Vehicle, favorited: bool) -> String {
    let marker = if favorited { '*' } else { ' ' };
    format!(
        "{marker} #{:<5} {} ({}) | {} | {} | score {}",
        vehicle.id.to_string(),
        vehicle.title(),
        vehicle.year,
        vehicle.category,
        vehicle.fuel_type,
        vehicle.score,
    )
}

pub fn render_listing(state: &ListingState, server_note: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(note) = server_note {
        let _ = writeln!(out, "{note}");
    }
    if let Some(error) = &state.error {
        let _ = writeln!(out, "{error}");
        return out;
    }
    if let Some(notice) = &state.notice {
        let _ = writeln!(out, "{notice}");
    }

    let visible = state.visible();
    if visible.is_empty() {
        let _ = writeln!(out, "no vehicles match");
        return out;
    }
    for vehicle in &visible {
        let _ = writeln!(
            out,
            "{}",
            render_vehicle_line(vehicle, state.is_favorited(vehicle.id))
        );
    }
    let _ = writeln!(
        out,
        "showing {} of {} matched ({} loaded)",
        visible.len(),
        state.matched_count(),
        state.total_count()
    );
    if state.has_more() {
        let _ = writeln!(out, "more available: raise --pages to see them");
    }
    out
}

pub fn render_detail(vehicle: &Vehicle) -> String {
    let rows = [
        ("Brand", vehicle.brand.to_string()),
        ("Model", vehicle.model.to_string()),
        ("Version", vehicle.version.to_string()),
        ("Year", vehicle.year.to_string()),
        ("Category", vehicle.category.to_string()),
        ("Engine", vehicle.engine.to_string()),
        ("Transmission", vehicle.transmission.to_string()),
        ("Air conditioning", vehicle.air_conditioning_label().to_owned()),
        ("Power steering", vehicle.power_steering.to_string()),
        ("Fuel", vehicle.fuel_type.to_string()),
        ("CO (g/km)", vehicle.emissions.co.to_string()),
        ("CO2 (g/km)", vehicle.emissions.co2.to_string()),
        ("NOx (g/km)", vehicle.emissions.nox.to_string()),
        ("NMHC (g/km)", vehicle.emissions.nmhc.to_string()),
        ("Ethanol city (km/l)", vehicle.yields.ethanol_city.to_string()),
        ("Ethanol highway (km/l)", vehicle.yields.ethanol_highway.to_string()),
        ("Gasoline city (km/l)", vehicle.yields.gasoline_city.to_string()),
        ("Gasoline highway (km/l)", vehicle.yields.gasoline_highway.to_string()),
        ("Energy (MJ/km)", vehicle.energy_consumption.to_string()),
        ("Score", vehicle.score.to_string()),
        ("Image", vehicle.image_url.clone()),
    ];

    let mut out = format!("{} (#{}, code {})\n", vehicle.title(), vehicle.id, vehicle.code);
    for (label, value) in rows {
        let _ = writeln!(out, "  {label:<24} {value}");
    }
    out
}

pub fn render_comparison(report: &ComparisonReport) -> String {
    let left = report.left.title();
    let right = report.right.title();
    let mut out = format!("{left} vs {right}\n");
    for row in &report.rows {
        let _ = writeln!(
            out,
            "  {:<26} {:>10} {:<7} [{:>3.0}%]  {:>10} {:<7} [{:>3.0}%]",
            row.metric.label(),
            row.left.to_string(),
            row.left_verdict.as_str(),
            row.left_bar,
            row.right.to_string(),
            row.right_verdict.as_str(),
            row.right_bar,
        );
    }
    let (left_wins, right_wins) = report.tally();
    let _ = writeln!(out, "wins: {left} {left_wins}, {right} {right_wins}");
    out
}
