mod common;

use avocado_shop_api::{
    dto::fulfillment::{AppendStatusLogRequest, CreateShipmentRequest, OrderActionRequest},
    entity::sea_orm_active_enums::{OrderStatus, StatusLogKind},
    error::AppError,
    lifecycle::OrderAction,
    middleware::auth::AuthUser,
    services::{fulfillment_service, order_store},
};
use common::{
    HASS, LAMB, TestApp, admin, checkout, deliver, event, insert_order, line, load_order,
    paid_session, setup,
};
use uuid::Uuid;

/// Checkout two lines and confirm payment. Returns the order id and its item ids.
async fn paid_order(app: &TestApp) -> anyhow::Result<(Uuid, Vec<Uuid>)> {
    let resp = checkout(app, vec![line(HASS, 1), line(LAMB, 1)]).await?;
    deliver(
        app,
        &event(
            "checkout.session.completed",
            paid_session(&resp.session_id, resp.order_id, "paid"),
        ),
    )
    .await?;
    let items = order_store::items_for(&app.state.orm, resp.order_id)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();
    Ok((resp.order_id, items))
}

fn shipment(item_ids: Vec<Uuid>, tracking: &str) -> CreateShipmentRequest {
    CreateShipmentRequest {
        tracking_number: Some(tracking.into()),
        carrier: Some("SEUR".into()),
        item_ids,
    }
}

fn action(action: OrderAction) -> OrderActionRequest {
    OrderActionRequest {
        action,
        description: None,
    }
}

#[tokio::test]
async fn split_shipment_marks_only_named_items() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = admin();
    let (order_id, items) = paid_order(&app).await?;

    let first = fulfillment_service::create_shipment(
        &app.state,
        &user,
        order_id,
        shipment(vec![items[0]], "TRK-1"),
    )
    .await?
    .data
    .expect("shipment");
    assert_eq!(first.item_ids, vec![items[0]]);

    let after_first = order_store::items_for(&app.state.orm, order_id).await?;
    assert!(after_first[0].shipped);
    assert_eq!(after_first[0].shipment_id, Some(first.id));
    assert!(after_first[0].shipped_at.is_some());
    assert!(!after_first[1].shipped);
    assert!(after_first[1].shipment_id.is_none());

    let second = fulfillment_service::create_shipment(
        &app.state,
        &user,
        order_id,
        shipment(vec![items[1]], "TRK-2"),
    )
    .await?
    .data
    .expect("shipment");
    assert_ne!(first.id, second.id);

    let all = order_store::items_for(&app.state.orm, order_id).await?;
    assert!(all.iter().all(|item| item.shipped));

    let listed = fulfillment_service::list_shipments(&app.state, &user, order_id)
        .await?
        .data
        .expect("shipments");
    assert_eq!(listed.items.len(), 2);
    assert_eq!(listed.items[1].tracking_number.as_deref(), Some("TRK-2"));

    let shipped_logs = order_store::logs_for(&app.state.orm, order_id)
        .await?
        .into_iter()
        .filter(|log| log.status == StatusLogKind::Shipped)
        .count();
    assert_eq!(shipped_logs, 2);

    // Shipping does not change the order status.
    assert_eq!(load_order(&app, order_id).await?.status, OrderStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn invalid_shipments_change_nothing() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = admin();
    let (order_id, items) = paid_order(&app).await?;

    let empty =
        fulfillment_service::create_shipment(&app.state, &user, order_id, shipment(vec![], "T"))
            .await;
    assert!(matches!(empty, Err(AppError::BadRequest(_))));

    let foreign = fulfillment_service::create_shipment(
        &app.state,
        &user,
        order_id,
        shipment(vec![items[0], Uuid::now_v7()], "T"),
    )
    .await;
    assert!(matches!(foreign, Err(AppError::BadRequest(_))));

    fulfillment_service::create_shipment(&app.state, &user, order_id, shipment(vec![items[0]], "T1"))
        .await?;
    let again = fulfillment_service::create_shipment(
        &app.state,
        &user,
        order_id,
        shipment(vec![items[0], items[1]], "T2"),
    )
    .await;
    assert!(matches!(again, Err(AppError::Conflict(_))));

    let current = order_store::items_for(&app.state.orm, order_id).await?;
    assert!(!current[1].shipped);
    assert_eq!(order_store::shipments_for(&app.state.orm, order_id).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn unpaid_orders_cannot_ship() -> anyhow::Result<()> {
    let app = setup().await?;
    let resp = checkout(&app, vec![line(HASS, 1)]).await?;
    let items = order_store::items_for(&app.state.orm, resp.order_id).await?;

    let result = fulfillment_service::create_shipment(
        &app.state,
        &admin(),
        resp.order_id,
        shipment(vec![items[0].id], "T"),
    )
    .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert!(order_store::shipments_for(&app.state.orm, resp.order_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn status_log_is_append_only_and_ordered() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = admin();
    let order = insert_order(&app, "AVO00000LOG1", OrderStatus::Completed).await?;

    for (kind, note) in [
        (StatusLogKind::CustomerContacted, "Called about delivery window"),
        (StatusLogKind::Returned, "Courier reported damage"),
    ] {
        fulfillment_service::append_status_log(
            &app.state,
            &user,
            order.id,
            AppendStatusLogRequest {
                status: kind,
                description: Some(note.into()),
                metadata: None,
            },
        )
        .await?;
    }

    let logs = fulfillment_service::list_status_logs(&app.state, &user, order.id)
        .await?
        .data
        .expect("logs");
    let kinds: Vec<_> = logs.items.iter().map(|log| log.status).collect();
    assert_eq!(
        kinds,
        vec![StatusLogKind::CustomerContacted, StatusLogKind::Returned]
    );
    assert_eq!(logs.items[1].description.as_deref(), Some("Courier reported damage"));

    // Raw entries never cascade into the order status.
    assert_eq!(load_order(&app, order.id).await?.status, OrderStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn operator_actions_follow_the_lifecycle() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = admin();

    let delivered = insert_order(&app, "AVO00000ACT1", OrderStatus::Completed).await?;
    let resp = fulfillment_service::apply_action(
        &app.state,
        &user,
        delivered.id,
        action(OrderAction::Delivered),
    )
    .await?
    .data
    .expect("action");
    assert_eq!(resp.order.status, OrderStatus::Delivered);
    assert_eq!(resp.log.status, StatusLogKind::Delivered);

    let returned = fulfillment_service::apply_action(
        &app.state,
        &user,
        delivered.id,
        action(OrderAction::Return),
    )
    .await?
    .data
    .expect("action");
    assert_eq!(returned.order.status, OrderStatus::Failed);

    let reship = insert_order(&app, "AVO00000ACT2", OrderStatus::Completed).await?;
    let resp = fulfillment_service::apply_action(
        &app.state,
        &user,
        reship.id,
        action(OrderAction::Reship),
    )
    .await?
    .data
    .expect("action");
    assert_eq!(resp.order.status, OrderStatus::Completed);
    assert_eq!(resp.log.status, StatusLogKind::Reshipped);
    let metadata = resp.log.metadata.expect("metadata");
    assert_eq!(metadata["action"], "reship");
    assert_eq!(metadata["by"], "ops@farm.test");
    Ok(())
}

#[tokio::test]
async fn illegal_actions_are_refused_without_a_log() -> anyhow::Result<()> {
    let app = setup().await?;
    let user = admin();
    let pending = insert_order(&app, "AVO00000ILL1", OrderStatus::Pending).await?;
    let failed = insert_order(&app, "AVO00000ILL2", OrderStatus::Failed).await?;

    for order in [&pending, &failed] {
        let result = fulfillment_service::apply_action(
            &app.state,
            &user,
            order.id,
            action(OrderAction::Delivered),
        )
        .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(order_store::logs_for(&app.state.orm, order.id).await?.is_empty());
        assert_eq!(load_order(&app, order.id).await?.status, order.status);
    }
    Ok(())
}

#[tokio::test]
async fn fulfillment_requires_the_admin_role() -> anyhow::Result<()> {
    let app = setup().await?;
    let order = insert_order(&app, "AVO00000RBC1", OrderStatus::Completed).await?;
    let customer = AuthUser {
        subject: "someone@example.com".into(),
        role: "customer".into(),
    };

    let shipments = fulfillment_service::list_shipments(&app.state, &customer, order.id).await;
    assert!(matches!(shipments, Err(AppError::Forbidden)));

    let refused =
        fulfillment_service::apply_action(&app.state, &customer, order.id, action(OrderAction::Return))
            .await;
    assert!(matches!(refused, Err(AppError::Forbidden)));
    assert_eq!(load_order(&app, order.id).await?.status, OrderStatus::Completed);

    let missing = fulfillment_service::list_status_logs(&app.state, &admin(), Uuid::now_v7()).await;
    assert!(matches!(missing, Err(AppError::NotFound)));
    Ok(())
}
