pub mod admin_service;
pub mod auth_service;
pub mod chat_service;
pub mod checkout_service;
pub mod fulfillment_service;
pub mod order_service;
pub mod order_store;
pub mod product_service;
pub mod webhook_service;
