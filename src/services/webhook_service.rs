//! Payment provider callbacks. The webhook is the only writer that moves an
//! order into a paid state.

use chrono::{Datelike, Utc};
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, Set, SqlErr, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::webhooks::{WebhookAck, WebhookOutcome},
    entity::{
        Orders,
        order_items::ActiveModel as OrderItemActive,
        orders::{ActiveModel as OrderActive, Model as OrderModel},
        sea_orm_active_enums::{EventKind, OrderStatus, StatusLogKind},
    },
    error::{AppError, AppResult},
    order_number,
    payments::{
        Address, CheckoutSession, PaymentEvent, PaymentIntent, parse_event,
        signature::{self, DEFAULT_TOLERANCE_SECS},
    },
    response::ApiResponse,
    services::{
        checkout_service::{CartContext, price_cart},
        order_store, product_service,
    },
    state::AppState,
    telemetry,
};

pub async fn handle_webhook(
    state: &AppState,
    payload: &[u8],
    signature_header: Option<&str>,
) -> AppResult<ApiResponse<WebhookAck>> {
    signature::verify(
        payload,
        signature_header,
        &state.config.stripe.webhook_secret,
        Utc::now().timestamp(),
        DEFAULT_TOLERANCE_SECS,
    )
    .map_err(|err| {
        tracing::warn!(error = %err, "webhook signature rejected");
        AppError::BadRequest(err.to_string())
    })?;

    let event = parse_event(payload)
        .map_err(|err| AppError::BadRequest(format!("malformed webhook payload: {err}")))?;
    tracing::info!(event_id = %event.id, event_type = %event.kind, "webhook received");

    let outcome = match event.event {
        PaymentEvent::SessionCompleted(session) => {
            let target = if session.is_paid() {
                OrderStatus::Completed
            } else {
                OrderStatus::PaymentReceived
            };
            settle_session(state, &session, target).await?
        }
        PaymentEvent::AsyncPaymentSucceeded(session) => {
            settle_session(state, &session, OrderStatus::Completed).await?
        }
        PaymentEvent::AsyncPaymentFailed(session) => {
            let outcome = fail_session(
                state,
                &session,
                &[OrderStatus::Pending, OrderStatus::PaymentReceived],
            )
            .await?;
            telemetry::record(
                &state.orm,
                EventKind::PaymentFailed,
                serde_json::json!({ "session_id": session.id, "reason": "async_payment_failed" }),
            )
            .await;
            outcome
        }
        PaymentEvent::SessionExpired(session) => {
            let outcome = fail_session(state, &session, &[OrderStatus::Pending]).await?;
            telemetry::record(
                &state.orm,
                EventKind::CheckoutCancelled,
                serde_json::json!({ "session_id": session.id, "reason": "expired" }),
            )
            .await;
            outcome
        }
        PaymentEvent::PaymentIntentFailed(intent) => {
            record_payment_failure(state, &intent).await;
            WebhookOutcome::Recorded
        }
        PaymentEvent::Unhandled => WebhookOutcome::Ignored,
    };

    tracing::debug!(event_id = %event.id, ?outcome, "webhook processed");
    Ok(ApiResponse::item(
        "Webhook received",
        WebhookAck {
            event_id: event.id,
            event_type: event.kind,
            outcome,
        },
    ))
}

/// Find the order a session belongs to: by session id first, then by the
/// reconciliation key echoed back by the provider.
async fn locate_order(state: &AppState, session: &CheckoutSession) -> AppResult<Option<OrderModel>> {
    if let Some(order) = order_store::find_by_session(&state.orm, &session.id).await? {
        return Ok(Some(order));
    }

    let reference = session
        .client_reference_id
        .as_deref()
        .or_else(|| session.metadata.get("order_id").map(String::as_str))
        .and_then(|raw| Uuid::parse_str(raw).ok());
    match reference {
        Some(id) => Ok(Orders::find_by_id(id).one(&state.orm).await?),
        None => Ok(None),
    }
}

/// Order total as charged by the provider. Line items are authoritative; the
/// session total is the fallback when they cannot be fetched.
async fn charged_total(state: &AppState, session: &CheckoutSession) -> Option<i64> {
    match state.payments.list_line_items(&session.id).await {
        Ok(items) if !items.is_empty() => Some(items.iter().map(|item| item.amount_total).sum()),
        Ok(_) => session.amount_total,
        Err(err) => {
            tracing::warn!(session_id = %session.id, error = %err, "line items unavailable, using session total");
            session.amount_total
        }
    }
}

/// Contact and address columns copied from the provider's session.
fn customer_changes(session: &CheckoutSession, changes: &mut OrderActive) {
    let details = session.customer_details.clone().unwrap_or_default();
    let shipping = session.shipping().cloned().unwrap_or_default();
    let name = shipping.name.or(details.name);
    let address: Address = shipping.address.or(details.address).unwrap_or_default();

    if let Some(email) = details.email {
        changes.customer_email = Set(Some(email.trim().to_lowercase()));
    }
    if details.phone.is_some() {
        changes.customer_phone = Set(details.phone);
    }
    if name.is_some() || address.line1.is_some() {
        changes.shipping_name = Set(name);
        changes.shipping_line1 = Set(address.line1);
        changes.shipping_line2 = Set(address.line2);
        changes.shipping_city = Set(address.city);
        changes.shipping_state = Set(address.state);
        changes.shipping_postal_code = Set(address.postal_code);
        changes.shipping_country = Set(address.country);
    }
}

async fn settle_session(
    state: &AppState,
    session: &CheckoutSession,
    target: OrderStatus,
) -> AppResult<WebhookOutcome> {
    let Some(order) = locate_order(state, session).await? else {
        return create_from_session(state, session, target).await;
    };

    let mut changes: OrderActive = Default::default();
    changes.stripe_session_id = Set(session.id.clone());
    customer_changes(session, &mut changes);
    if let Some(total) = charged_total(state, session).await {
        changes.total = Set(total);
    }
    if target == OrderStatus::Completed {
        changes.completed_at = Set(Some(Utc::now().into()));
    }

    let txn = state.orm.begin().await?;
    let confirmed =
        order_store::transition(&txn, order.id, &[OrderStatus::Pending], target, changes.clone())
            .await?;
    let moved = if confirmed {
        order_store::append_log(
            &txn,
            order.id,
            StatusLogKind::PaymentConfirmed,
            None,
            Some(serde_json::json!({ "session_id": session.id, "status": target.as_str() })),
        )
        .await?;
        true
    } else {
        // Delayed payment methods settle later: payment_received -> completed.
        order_store::transition(
            &txn,
            order.id,
            &[OrderStatus::PaymentReceived],
            target,
            changes,
        )
        .await?
    };
    txn.commit().await?;

    if !moved {
        tracing::info!(order_id = %order.id, status = order.status.as_str(), "duplicate or stale payment event");
        return Ok(WebhookOutcome::AlreadyApplied);
    }

    if target == OrderStatus::Completed {
        telemetry::record(
            &state.orm,
            EventKind::CheckoutCompleted,
            serde_json::json!({ "order_id": order.id, "order_number": order.order_number }),
        )
        .await;
    }
    Ok(WebhookOutcome::Applied)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Payment arrived for a session with no local order. Rebuild the order from
/// the cart context the session carried.
async fn create_from_session(
    state: &AppState,
    session: &CheckoutSession,
    target: OrderStatus,
) -> AppResult<WebhookOutcome> {
    let context = CartContext::from_metadata(&session.metadata);
    let order_id = context
        .as_ref()
        .map(|ctx| ctx.order_id)
        .unwrap_or_else(Uuid::now_v7);
    tracing::warn!(%order_id, session_id = %session.id, "no order for paid session, creating one");

    let lines = context.as_ref().map(|ctx| ctx.items.clone()).unwrap_or_default();
    let catalog = product_service::load_catalog(
        &state.orm,
        lines.iter().map(|line| line.product_id.clone()).collect(),
    )
    .await?;
    let known: Vec<_> = lines
        .into_iter()
        .filter(|line| {
            let found = catalog.contains_key(&line.product_id);
            if !found {
                tracing::warn!(product_id = %line.product_id, "dropping unknown product from recovered order");
            }
            found
        })
        .collect();
    let priced = price_cart(&known, &catalog, Utc::now().month())?;
    let items_total: i64 = priced
        .iter()
        .map(|line| line.unit_price * i64::from(line.quantity))
        .sum();
    let total = charged_total(state, session).await.unwrap_or(items_total);

    let prefix = state.config.order_number_prefix.clone();
    let mut preferred = context
        .as_ref()
        .map(|ctx| ctx.order_number.clone())
        .filter(|number| order_number::is_well_formed(number));
    let number = order_number::allocate(&state.orm, || {
        preferred
            .take()
            .unwrap_or_else(|| order_number::generate(&prefix))
    })
    .await?;

    let now = Utc::now();
    let mut order = OrderActive {
        id: Set(order_id),
        order_number: Set(number.clone()),
        stripe_session_id: Set(session.id.clone()),
        customer_email: Set(None),
        customer_phone: Set(None),
        shipping_name: Set(None),
        shipping_line1: Set(None),
        shipping_line2: Set(None),
        shipping_city: Set(None),
        shipping_state: Set(None),
        shipping_postal_code: Set(None),
        shipping_country: Set(None),
        destination_country: Set(context
            .as_ref()
            .map(|ctx| ctx.country.clone())
            .unwrap_or_default()),
        locale: Set("en".to_string()),
        shipping_cost: Set((total - items_total).max(0)),
        total: Set(total),
        currency: Set(session
            .currency
            .clone()
            .unwrap_or_else(|| state.config.currency.clone())),
        status: Set(target),
        created_at: Set(now.into()),
        completed_at: Set((target == OrderStatus::Completed).then(|| now.into())),
        updated_at: Set(now.into()),
    };
    customer_changes(session, &mut order);

    let txn = state.orm.begin().await?;
    if let Err(err) = order.insert(&txn).await {
        if is_unique_violation(&err) {
            tracing::info!(session_id = %session.id, "order created concurrently, skipping");
            return Ok(WebhookOutcome::AlreadyApplied);
        }
        return Err(err.into());
    }
    for (position, line) in priced.iter().enumerate() {
        OrderItemActive {
            id: Set(Uuid::now_v7()),
            order_id: Set(order_id),
            position: Set(position as i32),
            product_id: Set(line.product_id.clone()),
            product_name: Set(line.name.clone()),
            variety: Set(line.variety.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            preorder: Set(line.preorder),
            shipped: Set(false),
            shipped_at: Set(None),
            shipment_id: Set(None),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
    }
    order_store::append_log(
        &txn,
        order_id,
        StatusLogKind::Created,
        Some("Recovered from payment webhook".to_string()),
        None,
    )
    .await?;
    order_store::append_log(
        &txn,
        order_id,
        StatusLogKind::PaymentConfirmed,
        None,
        Some(serde_json::json!({ "session_id": session.id, "status": target.as_str() })),
    )
    .await?;
    txn.commit().await?;

    if target == OrderStatus::Completed {
        telemetry::record(
            &state.orm,
            EventKind::CheckoutCompleted,
            serde_json::json!({ "order_id": order_id, "order_number": number, "recovered": true }),
        )
        .await;
    }
    Ok(WebhookOutcome::Created)
}

async fn fail_session(
    state: &AppState,
    session: &CheckoutSession,
    from: &[OrderStatus],
) -> AppResult<WebhookOutcome> {
    let Some(order) = locate_order(state, session).await? else {
        tracing::warn!(session_id = %session.id, "no order for failed session");
        return Ok(WebhookOutcome::OrderNotFound);
    };

    let moved = order_store::transition(
        &state.orm,
        order.id,
        from,
        OrderStatus::Failed,
        Default::default(),
    )
    .await?;
    Ok(if moved {
        WebhookOutcome::Applied
    } else {
        WebhookOutcome::AlreadyApplied
    })
}

async fn record_payment_failure(state: &AppState, intent: &PaymentIntent) {
    let error = intent.last_payment_error.clone().unwrap_or_default();
    telemetry::record(
        &state.orm,
        EventKind::PaymentFailed,
        serde_json::json!({
            "payment_intent": intent.id,
            "amount": intent.amount,
            "code": error.code,
            "message": error.message,
            "order_id": intent.metadata.get("order_id"),
        }),
    )
    .await;
}
