// Host-side records the gateway reads and writes
pub mod cart;
pub mod order;
pub mod product;
pub mod subscription;

pub use cart::{Cart, CartItem, CheckoutSession, Notice, NoticeLevel};
pub use order::{
    BillingContact, LineItem, NewOrder, Order, OrderId, OrderNote, OrderStatus,
    PAYER_ACTION_META_KEY,
};
pub use product::{Product, ProductId, ProductKind, Variation};
pub use subscription::{NewSubscription, Subscription, SubscriptionId, SubscriptionStatus};
