//! Order lifecycle rules.
//!
//! [`OrderStatus::can_transition_to`] is the only place that decides which
//! status changes are legal, and [`StatusLogKind::order_status_cascade`] is the
//! only place that decides which timeline entries also move the order status.
//! Every writer (webhooks, operator actions) goes through these two tables.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::sea_orm_active_enums::{OrderStatus, StatusLogKind};

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentReceived => "payment_received",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// States from which `self` may be entered.
    pub fn predecessors(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending => &[],
            OrderStatus::PaymentReceived => &[OrderStatus::Pending],
            OrderStatus::Completed => &[OrderStatus::Pending, OrderStatus::PaymentReceived],
            OrderStatus::Delivered => &[OrderStatus::Completed],
            OrderStatus::Failed => &[
                OrderStatus::Pending,
                OrderStatus::PaymentReceived,
                OrderStatus::Completed,
                OrderStatus::Delivered,
            ],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        next.predecessors().contains(&self)
    }

    /// Payment has been confirmed by the provider at some point.
    pub fn is_paid(self) -> bool {
        matches!(
            self,
            OrderStatus::PaymentReceived | OrderStatus::Completed | OrderStatus::Delivered
        )
    }
}

impl StatusLogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusLogKind::Created => "created",
            StatusLogKind::PaymentConfirmed => "payment_confirmed",
            StatusLogKind::Shipped => "shipped",
            StatusLogKind::CustomerContacted => "customer_contacted",
            StatusLogKind::Reshipped => "reshipped",
            StatusLogKind::Returned => "returned",
            StatusLogKind::Delivered => "delivered",
        }
    }

    /// Order status an operator-driven entry of this kind moves the order to.
    ///
    /// Only entries that end the order's lifecycle cascade. Operational
    /// entries (shipping, reshipping, contacting the customer) leave it alone,
    /// and the lifecycle entries written by checkout and the webhook follow
    /// the status change instead of causing it.
    pub fn order_status_cascade(self) -> Option<OrderStatus> {
        match self {
            StatusLogKind::Returned => Some(OrderStatus::Failed),
            StatusLogKind::Delivered => Some(OrderStatus::Delivered),
            StatusLogKind::Created
            | StatusLogKind::PaymentConfirmed
            | StatusLogKind::Shipped
            | StatusLogKind::CustomerContacted
            | StatusLogKind::Reshipped => None,
        }
    }
}

/// Named operator actions. Nothing else may change an order from the admin side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderAction {
    Return,
    Reship,
    CustomerContacted,
    Shipped,
    Delivered,
}

impl OrderAction {
    pub fn log_kind(self) -> StatusLogKind {
        match self {
            OrderAction::Return => StatusLogKind::Returned,
            OrderAction::Reship => StatusLogKind::Reshipped,
            OrderAction::CustomerContacted => StatusLogKind::CustomerContacted,
            OrderAction::Shipped => StatusLogKind::Shipped,
            OrderAction::Delivered => StatusLogKind::Delivered,
        }
    }

    /// Order status this action moves the order to, if any.
    pub fn target_status(self) -> Option<OrderStatus> {
        self.log_kind().order_status_cascade()
    }
}
