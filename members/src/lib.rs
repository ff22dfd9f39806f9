use chrono::{NaiveDate, Utc};
use club_common::http::{self, Reply};
use club_common::model::{Member, MemberStatus, MembershipType};
use club_common::store::{Record, Table};
use club_common::{AccessError, ClubError, Permission, Principal, Region, RegionScope};
use lambda_http::http::Method;
use lambda_http::Request;
use serde::Deserialize;
use tracing::info;

pub const MEMBERS_TABLE: &str = "MEMBERS_TABLE";

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemberRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub region: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<MemberStatus>,
    #[serde(default)]
    pub membership_type: Option<MembershipType>,
    #[serde(default)]
    pub member_since: Option<NaiveDate>,
    #[serde(default)]
    pub membership_ends: Option<NaiveDate>,
    #[serde(default)]
    pub cognito_sub: Option<String>,
    #[serde(default)]
    pub motorcycle_brand: Option<String>,
    #[serde(default)]
    pub motorcycle_model: Option<String>,
}

impl CreateMemberRequest {
    pub fn into_member(self, member_id: String) -> Result<Member, ClubError> {
        let region = canonical_region(&self.region)?;
        check_name(&self.first_name, "first_name")?;
        check_name(&self.last_name, "last_name")?;
        check_email(&self.email)?;
        let now = Utc::now();
        Ok(Member {
            member_id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone,
            street: self.street,
            postal_code: self.postal_code,
            city: self.city,
            country: self.country,
            birth_date: self.birth_date,
            region: region.name().to_string(),
            status: self.status.unwrap_or(MemberStatus::Pending),
            membership_type: self.membership_type.unwrap_or(MembershipType::Full),
            member_since: self.member_since.or_else(|| Some(now.date_naive())),
            membership_ends: self.membership_ends,
            cognito_sub: self.cognito_sub,
            motorcycle_brand: self.motorcycle_brand,
            motorcycle_model: self.motorcycle_model,
            reminder_sent_for: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. Contact, address and motorcycle fields may be changed by
/// the member themselves; the rest needs `members_update`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub motorcycle_brand: Option<String>,
    pub motorcycle_model: Option<String>,
    pub region: Option<String>,
    pub status: Option<MemberStatus>,
    pub membership_type: Option<MembershipType>,
    pub member_since: Option<NaiveDate>,
    pub membership_ends: Option<NaiveDate>,
    pub cognito_sub: Option<String>,
}

impl UpdateMemberRequest {
    pub fn touches_administrative_fields(&self) -> bool {
        self.first_name.is_some()
            || self.last_name.is_some()
            || self.email.is_some()
            || self.birth_date.is_some()
            || self.region.is_some()
            || self.status.is_some()
            || self.membership_type.is_some()
            || self.member_since.is_some()
            || self.membership_ends.is_some()
            || self.cognito_sub.is_some()
    }

    pub fn apply(self, member: &mut Member) -> Result<(), ClubError> {
        if let Some(first_name) = self.first_name {
            check_name(&first_name, "first_name")?;
            member.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = self.last_name {
            check_name(&last_name, "last_name")?;
            member.last_name = last_name.trim().to_string();
        }
        if let Some(email) = self.email {
            check_email(&email)?;
            member.email = email.trim().to_lowercase();
        }
        if let Some(region) = self.region {
            member.region = canonical_region(&region)?.name().to_string();
        }
        member.phone = self.phone.or(member.phone.take());
        member.street = self.street.or(member.street.take());
        member.postal_code = self.postal_code.or(member.postal_code.take());
        member.city = self.city.or(member.city.take());
        member.country = self.country.or(member.country.take());
        member.birth_date = self.birth_date.or(member.birth_date);
        member.motorcycle_brand = self.motorcycle_brand.or(member.motorcycle_brand.take());
        member.motorcycle_model = self.motorcycle_model.or(member.motorcycle_model.take());
        member.status = self.status.unwrap_or(member.status);
        member.membership_type = self.membership_type.unwrap_or(member.membership_type);
        member.member_since = self.member_since.or(member.member_since);
        member.membership_ends = self.membership_ends.or(member.membership_ends);
        member.cognito_sub = self.cognito_sub.or(member.cognito_sub.take());
        member.updated_at = Utc::now();
        Ok(())
    }
}

fn canonical_region(raw: &str) -> Result<Region, ClubError> {
    Region::normalize(raw).ok_or_else(|| ClubError::bad_request(format!("unknown region {}", raw)))
}

fn check_name(value: &str, field: &str) -> Result<(), ClubError> {
    if value.trim().is_empty() {
        return Err(ClubError::bad_request(format!("{} is required", field)));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ClubError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ClubError::bad_request(format!("invalid email address {}", email))),
    }
}

fn in_scope(scope: &RegionScope, region: &str) -> Result<(), ClubError> {
    if scope.allows_name(region) {
        Ok(())
    } else {
        Err(AccessError::OutOfScope(region.to_string()).into())
    }
}

pub fn check_read(principal: &Principal, member: &Member) -> Result<(), ClubError> {
    if member.is_owned_by(&principal.sub, principal.email.as_deref()) {
        return Ok(());
    }
    let scope = principal.require(&[Permission::MembersRead])?;
    in_scope(&scope, &member.region)
}

/// `members_update` in scope, or a self-service change to the caller's own record.
pub fn check_update(principal: &Principal, member: &Member, update: &UpdateMemberRequest) -> Result<(), ClubError> {
    let self_service = member.is_owned_by(&principal.sub, principal.email.as_deref())
        && !update.touches_administrative_fields();
    let administrative = principal
        .require(&[Permission::MembersUpdate])
        .map_err(ClubError::from)
        .and_then(|scope| {
            in_scope(&scope, &member.region)?;
            match &update.region {
                Some(region) => in_scope(&scope, canonical_region(region)?.name()),
                None => Ok(()),
            }
        });
    match administrative {
        Err(_) if self_service => Ok(()),
        result => result,
    }
}

#[derive(Debug, Default, Clone)]
pub struct ListFilter {
    pub status: Option<MemberStatus>,
    pub region: Option<Region>,
}

impl ListFilter {
    pub fn from_query(status: Option<String>, region: Option<String>) -> Result<ListFilter, ClubError> {
        let status = match status {
            Some(s) => Some(serde_json::from_value(serde_json::Value::String(s.to_owned()))
                .map_err(|_| ClubError::bad_request(format!("unknown status {}", s)))?),
            None => None,
        };
        let region = match region {
            Some(r) => Some(canonical_region(&r)?),
            None => None,
        };
        Ok(ListFilter { status, region })
    }

    pub fn matches(&self, member: &Member) -> bool {
        self.status.map_or(true, |s| member.status == s)
            && self.region.map_or(true, |r| member.canonical_region() == Some(r))
    }
}

pub fn visible_members(members: Vec<Member>, scope: &RegionScope, filter: &ListFilter) -> Vec<Member> {
    let mut visible: Vec<Member> = members
        .into_iter()
        .filter(|m| scope.allows_name(&m.region) && filter.matches(m))
        .collect();
    visible.sort_by(|a, b| (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name)));
    visible
}

#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    List,
    Me,
    Get(String),
    Create,
    Update(String),
    Delete(String),
}

impl Route {
    pub fn from_request(event: &Request) -> Result<Route, ClubError> {
        let id = http::path_param(event, "id");
        let me = event.uri().path().trim_end_matches('/').ends_with("/members/me");
        match (event.method(), id) {
            (&Method::GET, _) if me => Ok(Route::Me),
            (&Method::GET, None) => Ok(Route::List),
            (&Method::GET, Some(id)) => Ok(Route::Get(id)),
            (&Method::POST, None) => Ok(Route::Create),
            (&Method::PUT, Some(id)) => Ok(Route::Update(id)),
            (&Method::DELETE, Some(id)) => Ok(Route::Delete(id)),
            (method, _) => Err(ClubError::bad_request(format!("unsupported route {} {}", method, event.uri().path()))),
        }
    }
}

pub struct Members {
    table: Table,
}

impl Members {
    pub fn new(table: Table) -> Members {
        Members { table }
    }

    pub async fn handle(&self, event: &Request) -> Result<Reply, ClubError> {
        let principal = http::principal(event)?;
        match Route::from_request(event)? {
            Route::Me => self.me(&principal).await,
            Route::List => {
                let filter = ListFilter::from_query(http::query_param(event, "status"), http::query_param(event, "region"))?;
                self.list(&principal, &filter).await
            }
            Route::Get(id) => self.get(&principal, &id).await,
            Route::Create => self.create(&principal, http::parse_body(event)?).await,
            Route::Update(id) => self.update(&principal, &id, http::parse_body(event)?).await,
            Route::Delete(id) => self.delete(&principal, &id).await,
        }
    }

    async fn list(&self, principal: &Principal, filter: &ListFilter) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::MembersRead])?;
        let members = self.table.scan::<Member>().await?;
        let visible = visible_members(members, &scope, filter);
        info!("{} listed {} members", principal.sub, visible.len());
        Reply::ok(&visible)
    }

    async fn me(&self, principal: &Principal) -> Result<Reply, ClubError> {
        let members = self.table.scan::<Member>().await?;
        let own = members
            .iter()
            .find(|m| m.cognito_sub.as_deref() == Some(principal.sub.as_str()))
            .or_else(|| members.iter().find(|m| m.cognito_sub.is_none() && principal.email_matches(&m.email)));
        match own {
            Some(member) => Reply::ok(member),
            None => Err(ClubError::not_found("member record for this account")),
        }
    }

    async fn get(&self, principal: &Principal, id: &str) -> Result<Reply, ClubError> {
        let member: Member = self.table.fetch(id).await?;
        check_read(principal, &member)?;
        Reply::ok(&member)
    }

    async fn create(&self, principal: &Principal, request: CreateMemberRequest) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::MembersCreate])?;
        let member = request.into_member(uuid::Uuid::new_v4().to_string())?;
        in_scope(&scope, &member.region)?;
        let existing = self.table.scan::<Member>().await?;
        if existing.iter().any(|m| m.email.eq_ignore_ascii_case(&member.email)) {
            return Err(ClubError::Conflict(format!("a member with email {} already exists", member.email)));
        }
        self.table.put(&member).await?;
        info!("{} created member {} in {}", principal.sub, member.key(), member.region);
        Reply::created(&member)
    }

    async fn update(&self, principal: &Principal, id: &str, request: UpdateMemberRequest) -> Result<Reply, ClubError> {
        let mut member: Member = self.table.fetch(id).await?;
        check_update(principal, &member, &request)?;
        request.apply(&mut member)?;
        self.table.put(&member).await?;
        info!("{} updated member {}", principal.sub, id);
        Reply::ok(&member)
    }

    async fn delete(&self, principal: &Principal, id: &str) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::MembersDelete])?;
        let member: Member = self.table.fetch(id).await?;
        in_scope(&scope, &member.region)?;
        self.table.delete::<Member>(id).await?;
        info!("{} deleted member {}", principal.sub, id);
        Ok(Reply::NoContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lambda_http::{Body, RequestExt};
    use std::collections::HashMap;

    fn http_request(method: Method, path: &str, id: Option<&str>) -> Request {
        let event = lambda_http::http::Request::builder()
            .method(method)
            .uri(path)
            .body(Body::Empty)
            .unwrap();
        match id {
            Some(id) => event.with_path_parameters(HashMap::from([("id".to_string(), id.to_string())])),
            None => event,
        }
    }

    fn principal(groups: &[&str]) -> Principal {
        Principal {
            sub: "sub-caller".to_string(),
            email: Some("caller@example.org".to_string()),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn create_request(region: &str) -> CreateMemberRequest {
        serde_json::from_value(serde_json::json!({
            "first_name": " Anne ",
            "last_name": "de Vries",
            "email": "Anne@Example.org",
            "region": region,
        }))
        .unwrap()
    }

    fn member(region: &str) -> Member {
        create_request(region).into_member("m-1".to_string()).unwrap()
    }

    #[test]
    fn create_normalises_input() {
        let m = member("noord holland");
        assert_eq!(m.region, "Noord-Holland");
        assert_eq!(m.first_name, "Anne");
        assert_eq!(m.email, "anne@example.org");
        assert_eq!(m.status, MemberStatus::Pending);
        assert!(m.member_since.is_some());
        assert!(create_request("Atlantis").into_member("x".to_string()).is_err());
        let bad_email = CreateMemberRequest { email: "anne".to_string(), ..create_request("Utrecht") };
        assert!(bad_email.into_member("x".to_string()).is_err());
    }

    #[test]
    fn regional_reader_only_reads_own_region() {
        let reader = principal(&["Members_Read", "Regio_Utrecht"]);
        assert!(check_read(&reader, &member("Utrecht")).is_ok());
        assert!(matches!(check_read(&reader, &member("Limburg")), Err(ClubError::Forbidden(_))));
    }

    #[test]
    fn members_read_their_own_record() {
        let me = principal(&["Club_Members"]);
        let mut own = member("Limburg");
        own.email = "caller@example.org".to_string();
        assert!(check_read(&me, &own).is_ok());
        assert!(check_read(&me, &member("Limburg")).is_err());
    }

    #[test]
    fn self_service_updates_are_limited() {
        let me = principal(&["Club_Members"]);
        let mut own = member("Limburg");
        own.cognito_sub = Some("sub-caller".to_string());
        let contact = UpdateMemberRequest { phone: Some("0611111111".to_string()), ..Default::default() };
        assert!(check_update(&me, &own, &contact).is_ok());
        let status = UpdateMemberRequest { status: Some(MemberStatus::Active), ..Default::default() };
        assert!(check_update(&me, &own, &status).is_err());
    }

    #[test]
    fn regional_admins_edit_their_own_record_elsewhere() {
        let admin = principal(&["Members_CRUD", "Regio_Utrecht"]);
        let mut own = member("Limburg");
        own.cognito_sub = Some("sub-caller".to_string());
        let contact = UpdateMemberRequest { phone: Some("0611111111".to_string()), ..Default::default() };
        assert!(check_update(&admin, &own, &contact).is_ok());
        let status = UpdateMemberRequest { status: Some(MemberStatus::Active), ..Default::default() };
        assert!(matches!(check_update(&admin, &own, &status), Err(ClubError::Forbidden(_))));
        assert!(check_update(&admin, &member("Limburg"), &contact).is_err());
    }

    #[test]
    fn administrators_cannot_move_members_out_of_scope() {
        let admin = principal(&["Members_CRUD", "Regio_Utrecht"]);
        let m = member("Utrecht");
        let move_away = UpdateMemberRequest { region: Some("Limburg".to_string()), ..Default::default() };
        assert!(check_update(&admin, &m, &move_away).is_err());
        let stay = UpdateMemberRequest { region: Some("utrecht".to_string()), ..Default::default() };
        assert!(check_update(&admin, &m, &stay).is_ok());
        let national = principal(&["Members_CRUD", "Regio_All"]);
        assert!(check_update(&national, &m, &move_away).is_ok());
    }

    #[test]
    fn apply_keeps_untouched_fields() {
        let mut m = member("Utrecht");
        m.phone = Some("0600000000".to_string());
        UpdateMemberRequest {
            city: Some("Zeist".to_string()),
            region: Some("gelderland".to_string()),
            ..Default::default()
        }
        .apply(&mut m)
        .unwrap();
        assert_eq!(m.phone.as_deref(), Some("0600000000"));
        assert_eq!(m.city.as_deref(), Some("Zeist"));
        assert_eq!(m.region, "Oost");
    }

    #[test]
    fn listing_respects_scope_and_filters() {
        let mut active = member("Utrecht");
        active.status = MemberStatus::Active;
        active.last_name = "Bakker".to_string();
        let pending = member("Utrecht");
        let elsewhere = member("Friesland");
        let scope = RegionScope::Only([Region::Utrecht].into_iter().collect());

        let all = visible_members(vec![pending.clone(), active.clone(), elsewhere.clone()], &scope, &ListFilter::default());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].last_name, "Bakker");

        let filter = ListFilter::from_query(Some("active".to_string()), None).unwrap();
        let only_active = visible_members(vec![pending, active, elsewhere], &RegionScope::All, &filter);
        assert_eq!(only_active.len(), 1);
        assert!(ListFilter::from_query(Some("sleeping".to_string()), None).is_err());
    }

    #[test]
    fn routes() {
        let route = |method: Method, path: &str, id: Option<&str>| Route::from_request(&http_request(method, path, id));
        assert_eq!(route(Method::GET, "/members/me", None).unwrap(), Route::Me);
        // A stage that maps /members/{id} also matches "me".
        assert_eq!(route(Method::GET, "/prod/members/me/", Some("me")).unwrap(), Route::Me);
        assert_eq!(route(Method::GET, "/members", None).unwrap(), Route::List);
        assert_eq!(route(Method::GET, "/members/m-1", Some("m-1")).unwrap(), Route::Get("m-1".to_string()));
        assert_eq!(route(Method::POST, "/members", None).unwrap(), Route::Create);
        assert_eq!(route(Method::PUT, "/members/m-1", Some("m-1")).unwrap(), Route::Update("m-1".to_string()));
        assert_eq!(route(Method::DELETE, "/members/m-1", Some("m-1")).unwrap(), Route::Delete("m-1".to_string()));
        assert!(matches!(route(Method::PUT, "/members/me", None), Err(ClubError::BadRequest(_))));
        assert!(matches!(route(Method::PATCH, "/members/m-1", Some("m-1")), Err(ClubError::BadRequest(_))));
    }
}
