pub mod events;
pub mod order_items;
pub mod order_messages;
pub mod order_status_logs;
pub mod orders;
pub mod products;
pub mod sea_orm_active_enums;
pub mod shipments;

pub use events::Entity as Events;
pub use order_items::Entity as OrderItems;
pub use order_messages::Entity as OrderMessages;
pub use order_status_logs::Entity as OrderStatusLogs;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use shipments::Entity as Shipments;
