use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClubError;
use crate::permissions::RegionScope;
use crate::regions;
use crate::store::{self, Item, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A region name, or `Landelijk` for national events.
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub price_cents: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_participants: Option<u32>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_national(&self) -> bool {
        regions::is_national(&self.region)
    }

    /// National events are visible to everyone who may read events.
    pub fn visible_in(&self, scope: &RegionScope) -> bool {
        self.is_national() || scope.allows_name(&self.region)
    }

    /// Managing national events needs every region.
    pub fn manageable_in(&self, scope: &RegionScope) -> bool {
        if self.is_national() {
            scope.is_all()
        } else {
            scope.allows_name(&self.region)
        }
    }

    pub fn validate(&self) -> Result<(), ClubError> {
        if self.title.trim().is_empty() {
            return Err(ClubError::bad_request("event title is required"));
        }
        if self.end_date < self.start_date {
            return Err(ClubError::bad_request("event ends before it starts"));
        }
        if !self.is_national() && crate::regions::Region::normalize(&self.region).is_none() {
            return Err(ClubError::bad_request(format!("unknown region {}", self.region)));
        }
        Ok(())
    }
}

impl Record for Event {
    const KEY: &'static str = "event_id";
    const KIND: &'static str = "event";

    fn key(&self) -> &str {
        &self.event_id
    }

    fn to_item(&self) -> Item {
        let mut item = Item::from([
            ("event_id".to_string(), store::s(&self.event_id)),
            ("title".to_string(), store::s(&self.title)),
            ("region".to_string(), store::s(&self.region)),
            ("start_date".to_string(), store::date(self.start_date)),
            ("end_date".to_string(), store::date(self.end_date)),
            ("price_cents".to_string(), store::n(self.price_cents)),
            ("created_by".to_string(), store::s(&self.created_by)),
            ("created_at".to_string(), store::timestamp(self.created_at)),
            ("updated_at".to_string(), store::timestamp(self.updated_at)),
        ]);
        store::put_opt(&mut item, "description", self.description.as_deref().map(store::s));
        store::put_opt(&mut item, "location", self.location.as_deref().map(store::s));
        store::put_opt(&mut item, "max_participants", self.max_participants.map(store::n));
        item
    }

    fn from_item(item: &Item) -> Result<Self, ClubError> {
        let start_date = store::get_date(item, "start_date")
            .ok_or_else(|| ClubError::Malformed("event without start_date".to_string()))?;
        let created_at = store::get_timestamp(item, "created_at").unwrap_or_else(Utc::now);
        Ok(Event {
            event_id: store::get_s(item, "event_id")?,
            title: store::get_s(item, "title")?,
            description: store::get_s_opt(item, "description"),
            region: store::get_s_opt(item, "region").unwrap_or_else(|| regions::NATIONAL.to_string()),
            location: store::get_s_opt(item, "location"),
            start_date,
            end_date: store::get_date(item, "end_date").unwrap_or(start_date),
            price_cents: store::get_n_opt(item, "price_cents").unwrap_or(0),
            max_participants: store::get_n_opt(item, "max_participants"),
            created_by: store::get_s_opt(item, "created_by").unwrap_or_default(),
            created_at,
            updated_at: store::get_timestamp(item, "updated_at").unwrap_or(created_at),
        })
    }
}
