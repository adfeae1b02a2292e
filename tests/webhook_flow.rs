mod common;

use avocado_shop_api::{
    dto::{
        orders::{ReconcileRequest, TrackingQuery},
        webhooks::WebhookOutcome,
    },
    entity::{
        Events, Orders,
        events::Column as EventCol,
        sea_orm_active_enums::{EventKind, OrderStatus, StatusLogKind},
    },
    error::AppError,
    services::{checkout_service::CartContext, order_service, order_store, webhook_service},
};
use common::{
    HASS, HASS_PRICE, checkout, deliver, event, line, load_order, paid_session, setup,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

async fn outcome(app: &common::TestApp, payload: &[u8]) -> anyhow::Result<WebhookOutcome> {
    let ack = deliver(app, payload).await?;
    Ok(ack.data.expect("ack").outcome)
}

#[tokio::test]
async fn paid_checkout_is_trackable_without_personal_data() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;

    let payload = event(
        "checkout.session.completed",
        paid_session(&resp.session_id, resp.order_id, "paid"),
    );
    assert_eq!(outcome(&app, &payload).await?, WebhookOutcome::Applied);

    let order = load_order(&app, resp.order_id).await?;
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.completed_at.is_some());
    assert_eq!(order.customer_email.as_deref(), Some("ana@example.com"));
    assert_eq!(order.customer_phone.as_deref(), Some("+34600111222"));
    assert_eq!(order.shipping_city.as_deref(), Some("Malaga"));

    let view = order_service::track_order(
        &app.state,
        TrackingQuery {
            order_number: resp.order_number.to_lowercase(),
        },
    )
    .await?
    .data
    .expect("tracking view");
    assert_eq!(view.status, OrderStatus::Completed);
    assert_eq!(view.total, HASS_PRICE + 500);

    let body = serde_json::to_string(&view)?;
    for field in ["customer_email", "customer_phone", "shipping_line1", "ana@example.com", "Calle Mayor"] {
        assert!(!body.contains(field), "tracking view leaks {field}");
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_completion_is_a_no_op() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 2)]).await?;
    let payload = event(
        "checkout.session.completed",
        paid_session(&resp.session_id, resp.order_id, "paid"),
    );

    assert_eq!(outcome(&app, &payload).await?, WebhookOutcome::Applied);
    let first = load_order(&app, resp.order_id).await?;
    assert_eq!(outcome(&app, &payload).await?, WebhookOutcome::AlreadyApplied);
    let second = load_order(&app, resp.order_id).await?;

    assert_eq!(second.status, OrderStatus::Completed);
    assert_eq!(second.total, first.total);
    assert_eq!(second.completed_at, first.completed_at);
    assert_eq!(Orders::find().count(&app.state.orm).await?, 1);
    assert_eq!(order_store::items_for(&app.state.orm, resp.order_id).await?.len(), 1);

    let confirmations = order_store::logs_for(&app.state.orm, resp.order_id)
        .await?
        .into_iter()
        .filter(|log| log.status == StatusLogKind::PaymentConfirmed)
        .count();
    assert_eq!(confirmations, 1);

    let completed_events = Events::find()
        .filter(EventCol::Name.eq(EventKind::CheckoutCompleted))
        .count(&app.state.orm)
        .await?;
    assert_eq!(completed_events, 1);
    Ok(())
}

#[tokio::test]
async fn expired_session_fails_order_for_good() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;

    let expired = event(
        "checkout.session.expired",
        json!({ "id": resp.session_id, "client_reference_id": resp.order_id.to_string() }),
    );
    assert_eq!(outcome(&app, &expired).await?, WebhookOutcome::Applied);
    assert_eq!(load_order(&app, resp.order_id).await?.status, OrderStatus::Failed);

    let reconciled = order_service::reconcile_status(
        &app.state,
        resp.order_id,
        ReconcileRequest {
            session_id: resp.session_id.clone(),
        },
    )
    .await?
    .data
    .expect("reconcile");
    assert_eq!(reconciled.status, OrderStatus::Failed);
    assert!(!reconciled.waiting_for_webhook);

    // A late completion cannot resurrect a failed order.
    let late = event(
        "checkout.session.completed",
        paid_session(&resp.session_id, resp.order_id, "paid"),
    );
    assert_eq!(outcome(&app, &late).await?, WebhookOutcome::AlreadyApplied);
    assert_eq!(load_order(&app, resp.order_id).await?.status, OrderStatus::Failed);
    Ok(())
}

#[tokio::test]
async fn expiry_does_not_touch_paid_orders() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;
    deliver(
        &app,
        &event(
            "checkout.session.completed",
            paid_session(&resp.session_id, resp.order_id, "paid"),
        ),
    )
    .await?;

    let expired = event("checkout.session.expired", json!({ "id": resp.session_id }));
    assert_eq!(outcome(&app, &expired).await?, WebhookOutcome::AlreadyApplied);
    assert_eq!(load_order(&app, resp.order_id).await?.status, OrderStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn delayed_payment_settles_in_two_steps() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;

    let completed = event(
        "checkout.session.completed",
        paid_session(&resp.session_id, resp.order_id, "unpaid"),
    );
    assert_eq!(outcome(&app, &completed).await?, WebhookOutcome::Applied);
    let order = load_order(&app, resp.order_id).await?;
    assert_eq!(order.status, OrderStatus::PaymentReceived);
    assert!(order.completed_at.is_none());

    let succeeded = event(
        "checkout.session.async_payment_succeeded",
        paid_session(&resp.session_id, resp.order_id, "paid"),
    );
    assert_eq!(outcome(&app, &succeeded).await?, WebhookOutcome::Applied);
    let order = load_order(&app, resp.order_id).await?;
    assert_eq!(order.status, OrderStatus::Completed);
    assert!(order.completed_at.is_some());

    let logs = order_store::logs_for(&app.state.orm, resp.order_id).await?;
    let kinds: Vec<_> = logs.iter().map(|log| log.status).collect();
    assert_eq!(kinds, vec![StatusLogKind::Created, StatusLogKind::PaymentConfirmed]);
    Ok(())
}

#[tokio::test]
async fn async_payment_failure_fails_the_order() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;
    deliver(
        &app,
        &event(
            "checkout.session.completed",
            paid_session(&resp.session_id, resp.order_id, "unpaid"),
        ),
    )
    .await?;

    let failed = event(
        "checkout.session.async_payment_failed",
        json!({ "id": resp.session_id }),
    );
    assert_eq!(outcome(&app, &failed).await?, WebhookOutcome::Applied);
    let order = load_order(&app, resp.order_id).await?;
    assert_eq!(order.status, OrderStatus::Failed);
    assert!(order.completed_at.is_none());
    Ok(())
}

#[tokio::test]
async fn reconcile_after_webhook_keeps_completed() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;
    deliver(
        &app,
        &event(
            "checkout.session.completed",
            paid_session(&resp.session_id, resp.order_id, "paid"),
        ),
    )
    .await?;

    let reconciled = order_service::reconcile_status(
        &app.state,
        resp.order_id,
        ReconcileRequest {
            session_id: resp.session_id.clone(),
        },
    )
    .await?
    .data
    .expect("reconcile");
    assert_eq!(reconciled.status, OrderStatus::Completed);
    assert_eq!(reconciled.order_number, resp.order_number);
    assert!(!reconciled.waiting_for_webhook);
    Ok(())
}

#[tokio::test]
async fn reconcile_before_webhook_waits_and_never_advances() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;

    let reconciled = order_service::reconcile_status(
        &app.state,
        resp.order_id,
        ReconcileRequest {
            session_id: resp.session_id.clone(),
        },
    )
    .await?
    .data
    .expect("reconcile");
    assert_eq!(reconciled.status, OrderStatus::Pending);
    assert!(reconciled.waiting_for_webhook);
    assert_eq!(load_order(&app, resp.order_id).await?.status, OrderStatus::Pending);

    let wrong = order_service::reconcile_status(
        &app.state,
        resp.order_id,
        ReconcileRequest {
            session_id: "cs_someone_else".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn reconcile_backfills_a_placeholder_session() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;

    // Simulate the session id never having been written back.
    let placeholder = order_store::placeholder_session_id(resp.order_id);
    let mut active: avocado_shop_api::entity::orders::ActiveModel = Default::default();
    active.stripe_session_id = sea_orm::Set(placeholder.clone());
    Orders::update_many()
        .set(active)
        .filter(avocado_shop_api::entity::orders::Column::Id.eq(resp.order_id))
        .exec(&app.state.orm)
        .await?;

    let reconciled = order_service::reconcile_status(
        &app.state,
        resp.order_id,
        ReconcileRequest {
            session_id: resp.session_id.clone(),
        },
    )
    .await?
    .data
    .expect("reconcile");
    assert_eq!(reconciled.status, OrderStatus::Pending);
    assert_eq!(
        load_order(&app, resp.order_id).await?.stripe_session_id,
        resp.session_id
    );
    Ok(())
}

#[tokio::test]
async fn completion_for_unknown_order_rebuilds_it_from_metadata() -> anyhow::Result<()> {
    let app = setup().await?;
    let order_id = Uuid::now_v7();
    let context = CartContext {
        order_id,
        order_number: "AVO0000ZZZZ1".into(),
        items: vec![line(HASS, 2)],
        country: "pt".into(),
        weight_grams: 10000,
        multi_variety: false,
        out_of_season: false,
    };
    let mut session = paid_session("cs_orphan_1", order_id, "paid");
    session["metadata"] = serde_json::to_value(context.to_metadata())?;
    session["amount_total"] = json!(2 * HASS_PRICE + 700);

    let payload = event("checkout.session.completed", session);
    assert_eq!(outcome(&app, &payload).await?, WebhookOutcome::Created);

    let order = load_order(&app, order_id).await?;
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(order.order_number, "AVO0000ZZZZ1");
    assert_eq!(order.stripe_session_id, "cs_orphan_1");
    assert_eq!(order.total, 2 * HASS_PRICE + 700);
    assert_eq!(order.shipping_cost, 700);
    assert_eq!(order.destination_country, "pt");

    let items = order_store::items_for(&app.state.orm, order_id).await?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);

    // The same event again finds the recovered order.
    assert_eq!(outcome(&app, &payload).await?, WebhookOutcome::AlreadyApplied);
    assert_eq!(Orders::find().count(&app.state.orm).await?, 1);
    Ok(())
}

#[tokio::test]
async fn failure_events_for_unknown_orders_are_acknowledged() -> anyhow::Result<()> {
    let app = setup().await?;
    let expired = event("checkout.session.expired", json!({ "id": "cs_never_seen" }));
    assert_eq!(outcome(&app, &expired).await?, WebhookOutcome::OrderNotFound);

    let intent = event(
        "payment_intent.payment_failed",
        json!({
            "id": "pi_1",
            "amount": 4000,
            "last_payment_error": { "code": "card_declined", "message": "Your card was declined." }
        }),
    );
    assert_eq!(outcome(&app, &intent).await?, WebhookOutcome::Recorded);
    assert_eq!(Orders::find().count(&app.state.orm).await?, 0);

    let failures = Events::find()
        .filter(EventCol::Name.eq(EventKind::PaymentFailed))
        .count(&app.state.orm)
        .await?;
    assert_eq!(failures, 1);

    let unknown = event("customer.created", json!({ "id": "cus_1" }));
    assert_eq!(outcome(&app, &unknown).await?, WebhookOutcome::Ignored);
    Ok(())
}

#[tokio::test]
async fn unsigned_or_tampered_events_are_rejected() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;
    let payload = event(
        "checkout.session.completed",
        paid_session(&resp.session_id, resp.order_id, "paid"),
    );

    let unsigned = webhook_service::handle_webhook(&app.state, &payload, None).await;
    assert!(matches!(unsigned, Err(AppError::BadRequest(_))));

    let header = avocado_shop_api::payments::signature::sign(
        &payload,
        "whsec_wrong",
        chrono::Utc::now().timestamp(),
    )?;
    let forged = webhook_service::handle_webhook(&app.state, &payload, Some(&header)).await;
    assert!(matches!(forged, Err(AppError::BadRequest(_))));

    assert_eq!(load_order(&app, resp.order_id).await?.status, OrderStatus::Pending);
    Ok(())
}
