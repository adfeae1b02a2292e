pub mod auth;
pub mod chat;
pub mod checkout;
pub mod events;
pub mod fulfillment;
pub mod orders;
pub mod products;
pub mod webhooks;
