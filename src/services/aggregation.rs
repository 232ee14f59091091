use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{
    Booking, DisplayStatus, Membership, MembershipStatus, Payment, PaymentStatus,
};
use crate::services::status::derive_status;
use crate::store::{MembershipLookup, PaymentLookup};

#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub display_status: DisplayStatus,
    pub payment: Option<Payment>,
    pub membership: Option<MembershipDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipDetails {
    #[serde(flatten)]
    pub membership: Membership,
    pub services_used: i64,
    pub effective_status: MembershipStatus,
}

impl BookingView {
    pub fn paid_cents(&self) -> i64 {
        self.booking.paid_cents(self.payment.as_ref())
    }

    /// Month bucket: the appointment date, or the purchase date for memberships.
    fn accounting_date(&self) -> NaiveDate {
        self.booking
            .schedule()
            .map(|(date, _)| date)
            .unwrap_or_else(|| self.booking.created_at.date())
    }
}

/// Joins each booking with its payment and membership.
///
/// A missing or failing sub-lookup leaves that field `None` and is logged;
/// it never fails the whole batch.
pub async fn attach_details(
    bookings: Vec<Booking>,
    payments: &dyn PaymentLookup,
    memberships: &dyn MembershipLookup,
    now: NaiveDateTime,
) -> Vec<BookingView> {
    let mut views = Vec::with_capacity(bookings.len());

    for booking in bookings {
        let payment = match booking.payment_id.as_deref() {
            Some(payment_id) => match payments.get_payment(payment_id).await {
                Ok(Some(p)) => Some(p),
                Ok(None) => {
                    tracing::warn!(booking_id = %booking.id, payment_id, "payment record not found");
                    None
                }
                Err(e) => {
                    tracing::warn!(booking_id = %booking.id, payment_id, error = %e, "payment lookup failed");
                    None
                }
            },
            None => None,
        };

        let membership = match booking.membership_id() {
            Some(membership_id) => match memberships.get_membership(membership_id).await {
                Ok(Some(m)) => Some(m),
                Ok(None) => {
                    tracing::warn!(booking_id = %booking.id, membership_id, "membership record not found");
                    None
                }
                Err(e) => {
                    tracing::warn!(booking_id = %booking.id, membership_id, error = %e, "membership lookup failed");
                    None
                }
            },
            None => None,
        };

        let display_status = derive_status(&booking, payment.as_ref(), membership.as_ref(), now);
        let membership = membership.map(|m| MembershipDetails {
            services_used: m.services_used(),
            effective_status: m.effective_status(now.date()),
            membership: m,
        });

        views.push(BookingView {
            booking,
            display_status,
            payment,
            membership,
        });
    }

    views
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue_cents: i64,
}

/// Collected payments bucketed by calendar month, oldest first.
pub fn revenue_by_month(views: &[BookingView]) -> Vec<MonthlyRevenue> {
    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    for view in views {
        let Some(payment) = &view.payment else {
            continue;
        };
        if payment.status != PaymentStatus::Succeeded {
            continue;
        }
        let month = view.accounting_date().format("%Y-%m").to_string();
        let total = buckets.entry(month).or_default();
        *total = total.saturating_add(payment.amount_cents);
    }

    buckets
        .into_iter()
        .map(|(month, revenue_cents)| MonthlyRevenue {
            month,
            revenue_cents,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceShare {
    pub service_name: String,
    pub bookings: usize,
    /// Share of all bookings, one decimal place.
    pub percent: f64,
}

pub fn top_services(views: &[BookingView], n: usize) -> Vec<ServiceShare> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for view in views {
        *counts.entry(view.booking.service_name.as_str()).or_default() += 1;
    }

    let total = views.len();
    let mut shares: Vec<ServiceShare> = counts
        .into_iter()
        .map(|(name, bookings)| ServiceShare {
            service_name: name.to_string(),
            bookings,
            percent: percent_of(bookings, total),
        })
        .collect();
    shares.sort_by(|a, b| {
        b.bookings
            .cmp(&a.bookings)
            .then_with(|| a.service_name.cmp(&b.service_name))
    });
    shares.truncate(n);
    shares
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSpend {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub total_spent_cents: i64,
    pub bookings: usize,
}

pub fn top_customers(views: &[BookingView], n: usize) -> Vec<CustomerSpend> {
    let mut by_customer: HashMap<&str, CustomerSpend> = HashMap::new();
    for view in views {
        let entry = by_customer
            .entry(view.booking.customer_id.as_str())
            .or_insert_with(|| CustomerSpend {
                customer_id: view.booking.customer_id.clone(),
                customer_name: None,
                total_spent_cents: 0,
                bookings: 0,
            });
        entry.total_spent_cents = entry.total_spent_cents.saturating_add(view.paid_cents());
        entry.bookings += 1;
        if entry.customer_name.is_none() {
            entry.customer_name = view.booking.customer_name.clone();
        }
    }

    let mut ranked: Vec<CustomerSpend> = by_customer.into_values().collect();
    ranked.sort_by(|a, b| {
        b.total_spent_cents
            .cmp(&a.total_spent_cents)
            .then_with(|| b.bookings.cmp(&a.bookings))
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub top_services: Vec<ServiceShare>,
    pub top_customers: Vec<CustomerSpend>,
}

pub fn analytics(views: &[BookingView], top_n: usize) -> Analytics {
    Analytics {
        revenue_by_month: revenue_by_month(views),
        top_services: top_services(views, top_n),
        top_customers: top_customers(views, top_n),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub total_bookings: usize,
    pub customers: usize,
    pub revenue_cents: i64,
    pub appointments_today: usize,
    pub by_status: BTreeMap<DisplayStatus, usize>,
}

pub fn overview(views: &[BookingView], today: NaiveDate) -> Overview {
    let mut by_status = BTreeMap::new();
    for view in views {
        *by_status.entry(view.display_status).or_insert(0) += 1;
    }

    Overview {
        total_bookings: views.len(),
        customers: views
            .iter()
            .map(|v| v.booking.customer_id.as_str())
            .collect::<HashSet<_>>()
            .len(),
        revenue_cents: revenue_by_month(views)
            .iter()
            .fold(0i64, |sum, m| sum.saturating_add(m.revenue_cents)),
        appointments_today: views
            .iter()
            .filter(|v| v.booking.is_active())
            .filter(|v| v.booking.schedule().is_some_and(|(date, _)| date == today))
            .count(),
        by_status,
    }
}

fn percent_of(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}
