use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use club_common::http::{self, Reply};
use club_common::model::{Member, Order, OrderStatus, Payment, PaymentKind, PaymentMethod};
use club_common::store::{self, Table};
use club_common::{AccessError, ClubError, Permission, Principal, RegionScope};
use lambda_http::http::Method;
use lambda_http::Request;
use serde::Deserialize;
use tracing::info;

pub const PAYMENTS_TABLE: &str = "PAYMENTS_TABLE";
pub const ORDERS_TABLE: &str = "ORDERS_TABLE";
pub const MEMBERS_TABLE: &str = "MEMBERS_TABLE";

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub order_id: Option<String>,
    pub member_id: Option<String>,
    pub amount_cents: u64,
    pub method: PaymentMethod,
    pub kind: PaymentKind,
    pub reference: Option<String>,
    pub paid_at: Option<NaiveDate>,
}

impl PaymentRequest {
    pub fn into_payment(self, payment_id: String, recorded_by: &str) -> Result<Payment, ClubError> {
        if self.amount_cents == 0 {
            return Err(ClubError::bad_request("amount_cents must be positive"));
        }
        let now = Utc::now();
        Ok(Payment {
            payment_id,
            order_id: self.order_id.filter(|id| !id.trim().is_empty()),
            member_id: self.member_id.filter(|id| !id.trim().is_empty()),
            amount_cents: self.amount_cents,
            method: self.method,
            kind: self.kind,
            reference: self.reference.filter(|r| !r.trim().is_empty()),
            paid_at: self.paid_at.unwrap_or_else(|| now.date_naive()),
            recorded_by: recorded_by.to_string(),
            created_at: now,
        })
    }
}

/// A payment against an order settles it in full.
pub fn settle(order: &mut Order, payment: &Payment) -> Result<(), ClubError> {
    if payment.amount_cents != order.total_cents {
        return Err(ClubError::bad_request(format!(
            "amount {} does not match order total {}",
            payment.amount_cents, order.total_cents
        )));
    }
    order.transition(OrderStatus::Paid)
}

pub fn check_member_scope(scope: &RegionScope, member: &Member) -> Result<(), ClubError> {
    if scope.allows_name(&member.region) {
        Ok(())
    } else {
        Err(AccessError::OutOfScope(member.region.to_owned()).into())
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub order_id: Option<String>,
    pub member_id: Option<String>,
}

impl PaymentFilter {
    pub fn from_query(event: &Request) -> PaymentFilter {
        PaymentFilter {
            order_id: http::query_param(event, "order_id"),
            member_id: http::query_param(event, "member_id"),
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        let order_ok = self.order_id.as_ref().map_or(true, |id| payment.order_id.as_ref() == Some(id));
        let member_ok = self.member_id.as_ref().map_or(true, |id| payment.member_id.as_ref() == Some(id));
        order_ok && member_ok
    }
}

/// Payments the caller may see. Regional callers only see payments linked to
/// a member of their regions; `regions` maps member ids to their region.
pub fn visible_payments(
    payments: Vec<Payment>,
    scope: &RegionScope,
    regions: &HashMap<String, String>,
    filter: &PaymentFilter,
) -> Vec<Payment> {
    let mut visible: Vec<Payment> = payments
        .into_iter()
        .filter(|p| filter.matches(p))
        .filter(|p| {
            scope.is_all()
                || p.member_id
                    .as_ref()
                    .and_then(|id| regions.get(id))
                    .map_or(false, |region| scope.allows_name(region))
        })
        .collect();
    visible.sort_by(|a, b| b.paid_at.cmp(&a.paid_at).then_with(|| b.created_at.cmp(&a.created_at)));
    visible
}

pub struct Payments {
    payments: Table,
    orders: Table,
    members: Table,
}

impl Payments {
    pub fn new(payments: Table, orders: Table, members: Table) -> Payments {
        Payments { payments, orders, members }
    }

    pub async fn handle(&self, event: &Request) -> Result<Reply, ClubError> {
        let principal = http::principal(event)?;
        match (event.method(), http::path_param(event, "id").as_deref()) {
            (&Method::GET, None) => self.list(&principal, &PaymentFilter::from_query(event)).await,
            (&Method::GET, Some(id)) => self.get(&principal, id).await,
            (&Method::POST, None) => self.record(&principal, http::parse_body(event)?).await,
            (method, _) => Err(ClubError::bad_request(format!("unsupported route {} {}", method, event.uri().path()))),
        }
    }

    async fn regions_by_member(&self, scope: &RegionScope) -> Result<HashMap<String, String>, ClubError> {
        if scope.is_all() {
            return Ok(HashMap::new());
        }
        Ok(self
            .members
            .scan::<Member>()
            .await?
            .into_iter()
            .map(|m| (m.member_id, m.region))
            .collect())
    }

    async fn list(&self, principal: &Principal, filter: &PaymentFilter) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::PaymentsRead])?;
        let regions = self.regions_by_member(&scope).await?;
        let payments = self.payments.scan::<Payment>().await?;
        Reply::ok(&visible_payments(payments, &scope, &regions, filter))
    }

    async fn get(&self, principal: &Principal, id: &str) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::PaymentsRead])?;
        let payment: Payment = self.payments.fetch(id).await?;
        if !scope.is_all() {
            let member_id = payment.member_id.as_deref().ok_or(AccessError::OutOfScope("national".to_string()))?;
            let member: Member = self.members.fetch(member_id).await?;
            check_member_scope(&scope, &member)?;
        }
        Reply::ok(&payment)
    }

    async fn record(&self, principal: &Principal, request: PaymentRequest) -> Result<Reply, ClubError> {
        let scope = principal.require(&[Permission::PaymentsManage])?;
        let payment = request.into_payment(uuid::Uuid::new_v4().to_string(), &principal.sub)?;

        if let Some(member_id) = &payment.member_id {
            let member: Member = self.members.fetch(member_id).await?;
            check_member_scope(&scope, &member)?;
        }

        let mut settled = None;
        if let Some(order_id) = &payment.order_id {
            let mut order: Order = self.orders.fetch(order_id).await?;
            settle(&mut order, &payment)?;
            settled = Some(order);
        }

        self.payments.put(&payment).await?;
        if let Some(order) = settled {
            self.orders
                .set_attributes::<Order>(&order.order_id, vec![
                    ("status", store::enum_value(&order.status)),
                    ("updated_at", store::timestamp(order.updated_at)),
                ])
                .await?;
            info!("order {} paid by payment {}", order.order_id, payment.payment_id);
        }
        info!("{} recorded payment {} of {} cents", principal.sub, payment.payment_id, payment.amount_cents);
        Reply::created(&payment)
    }
}
