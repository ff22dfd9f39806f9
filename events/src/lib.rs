use chrono::{NaiveDate, Utc};
use club_common::http::{self, Reply};
use club_common::model::Event;
use club_common::regions::{self, Region};
use club_common::store::Table;
use club_common::{AccessError, ClubError, Permission, Principal, RegionScope};
use lambda_http::http::Method;
use lambda_http::Request;
use serde::Deserialize;
use tracing::info;

pub const EVENTS_TABLE: &str = "EVENTS_TABLE";

#[derive(Debug, Clone, Deserialize)]
pub struct EventRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub region: String,
    #[serde(default)]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub price_cents: u64,
    #[serde(default)]
    pub max_participants: Option<u32>,
}

impl EventRequest {
    /// Builds the stored event; `existing` keeps id and creation data on updates.
    pub fn into_event(self, event_id: String, principal: &Principal, existing: Option<&Event>) -> Result<Event, ClubError> {
        let now = Utc::now();
        let region = if regions::is_national(&self.region) {
            regions::NATIONAL.to_string()
        } else {
            Region::normalize(&self.region)
                .map(|r| r.name().to_string())
                .ok_or_else(|| ClubError::bad_request(format!("unknown region {}", self.region)))?
        };
        let event = Event {
            event_id,
            title: self.title.trim().to_string(),
            description: self.description,
            region,
            location: self.location,
            start_date: self.start_date,
            end_date: self.end_date.unwrap_or(self.start_date),
            price_cents: self.price_cents,
            max_participants: self.max_participants,
            created_by: existing.map_or_else(|| principal.sub.to_owned(), |e| e.created_by.to_owned()),
            created_at: existing.map_or(now, |e| e.created_at),
            updated_at: now,
        };
        event.validate()?;
        Ok(event)
    }
}

fn check_manage(scope: &RegionScope, event: &Event) -> Result<(), ClubError> {
    if event.manageable_in(scope) {
        Ok(())
    } else {
        Err(AccessError::OutOfScope(event.region.to_owned()).into())
    }
}

/// True when `updated` differs from `existing` only in its update time.
pub fn is_unchanged(existing: &Event, updated: &Event) -> bool {
    let comparable = Event { updated_at: existing.updated_at, ..updated.clone() };
    comparable == *existing
}

/// Events visible in `scope`, optionally only those not yet finished, by start date.
pub fn visible_events(events: Vec<Event>, scope: &RegionScope, from: Option<NaiveDate>) -> Vec<Event> {
    let mut visible: Vec<Event> = events
        .into_iter()
        .filter(|e| e.visible_in(scope))
        .filter(|e| from.map_or(true, |day| e.end_date >= day))
        .collect();
    visible.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.title.cmp(&b.title)));
    visible
}

pub struct Events {
    table: Table,
}

impl Events {
    pub fn new(table: Table) -> Events {
        Events { table }
    }

    pub async fn handle(&self, event: &Request) -> Result<Reply, ClubError> {
        let principal = http::principal(event)?;
        let id = http::path_param(event, "id");
        match (event.method(), id.as_deref()) {
            (&Method::GET, None) => {
                let upcoming = http::query_param(event, "upcoming").map_or(false, |v| v == "true");
                self.list(&principal, upcoming).await
            }
            (&Method::GET, Some(id)) => self.get(&principal, id).await,
            (&Method::POST, None) => self.create(&principal, http::parse_body(event)?).await,
            (&Method::PUT, Some(id)) => self.update(&principal, id, http::parse_body(event)?).await,
            (&Method::DELETE, Some(id)) => self.delete(&principal, id).await,
            (method, _) => Err(ClubError::bad_request(format!("unsupported route {} {}", method, event.uri().path()))),
        }
    }

    async fn list(&self, principal: &Principal, upcoming: bool) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::EventsRead])?;
        let from = if upcoming { Some(Utc::now().date_naive()) } else { None };
        let events = visible_events(self.table.scan::<Event>().await?, &scope, from);
        Reply::ok(&events)
    }

    async fn get(&self, principal: &Principal, id: &str) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::EventsRead])?;
        let event: Event = self.table.fetch(id).await?;
        if !event.visible_in(&scope) {
            return Err(AccessError::OutOfScope(event.region).into());
        }
        Reply::ok(&event)
    }

    async fn create(&self, principal: &Principal, request: EventRequest) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::EventsManage])?;
        let event = request.into_event(uuid::Uuid::new_v4().to_string(), principal, None)?;
        check_manage(&scope, &event)?;
        self.table.put(&event).await?;
        info!("{} created event {} ({})", principal.sub, event.event_id, event.region);
        Reply::created(&event)
    }

    async fn update(&self, principal: &Principal, id: &str, request: EventRequest) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::EventsManage])?;
        let existing: Event = self.table.fetch(id).await?;
        check_manage(&scope, &existing)?;
        let event = request.into_event(id.to_string(), principal, Some(&existing))?;
        check_manage(&scope, &event)?;
        if is_unchanged(&existing, &event) {
            info!("event {} unchanged, skipping update", id);
            return Reply::ok(&existing);
        }
        self.table.put(&event).await?;
        info!("{} updated event {}", principal.sub, id);
        Reply::ok(&event)
    }

    async fn delete(&self, principal: &Principal, id: &str) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::EventsManage])?;
        let existing: Event = self.table.fetch(id).await?;
        check_manage(&scope, &existing)?;
        self.table.delete::<Event>(id).await?;
        info!("{} deleted event {}", principal.sub, id);
        Ok(Reply::NoContent)
    }
}
