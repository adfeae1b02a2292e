use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    completion::{ChatRole, ChatTurn},
    dto::{
        auth::{AdminLoginRequest, LoginResponse},
        chat::{ChatRequest, ChatResponse},
        checkout::{CartLine, CheckoutRequest, CheckoutResponse},
        events::{Metrics, TrackEventRequest},
        fulfillment::{
            AppendStatusLogRequest, CreateShipmentRequest, OrderActionRequest,
            OrderActionResponse, ShipmentList, StatusLogList,
        },
        orders::{
            CustomerMessageRequest, OperatorMessageRequest, OrderDetail, OrderList,
            ReconcileRequest, ReconcileResponse, TrackedItem, TrackedShipment, TrackingView,
        },
        products::ProductList,
        webhooks::{WebhookAck, WebhookOutcome},
    },
    entity::sea_orm_active_enums::{EventKind, OrderStatus, StatusLogKind},
    lifecycle::OrderAction,
    models::{Order, OrderItem, OrderMessage, Product, Shipment, ShippingAddress, StatusLog},
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, chat, checkout, events, fulfillment, health, orders, params,
        products as product_routes, webhooks,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        product_routes::list_products,
        product_routes::get_product,
        checkout::create_checkout,
        webhooks::payment_webhook,
        orders::reconcile_status,
        orders::track_order,
        orders::post_customer_message,
        fulfillment::create_shipment,
        fulfillment::list_shipments,
        fulfillment::append_status_log,
        fulfillment::list_status_logs,
        fulfillment::apply_action,
        auth::admin_login,
        admin::list_all_orders,
        admin::pending_orders,
        admin::get_order_detail,
        admin::reply_message,
        admin::metrics,
        chat::chat,
        events::track_event
    ),
    components(
        schemas(
            Product,
            Order,
            OrderItem,
            OrderMessage,
            Shipment,
            ShippingAddress,
            StatusLog,
            OrderStatus,
            StatusLogKind,
            EventKind,
            OrderAction,
            CartLine,
            CheckoutRequest,
            CheckoutResponse,
            WebhookAck,
            WebhookOutcome,
            ReconcileRequest,
            ReconcileResponse,
            TrackingView,
            TrackedItem,
            TrackedShipment,
            CustomerMessageRequest,
            OperatorMessageRequest,
            OrderDetail,
            OrderList,
            CreateShipmentRequest,
            AppendStatusLogRequest,
            OrderActionRequest,
            OrderActionResponse,
            ShipmentList,
            StatusLogList,
            AdminLoginRequest,
            LoginResponse,
            ChatRole,
            ChatTurn,
            ChatRequest,
            ChatResponse,
            TrackEventRequest,
            Metrics,
            ProductList,
            params::Pagination,
            params::OrderListQuery,
            params::PendingOrdersQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CheckoutResponse>,
            ApiResponse<TrackingView>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Avocado catalog"),
        (name = "Checkout", description = "Hosted payment sessions"),
        (name = "Webhooks", description = "Payment provider callbacks"),
        (name = "Orders", description = "Customer-facing order endpoints"),
        (name = "Fulfillment", description = "Shipments, timeline and operator actions"),
        (name = "Admin", description = "Admin endpoints"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Chat", description = "Support assistant"),
        (name = "Events", description = "Storefront analytics"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
