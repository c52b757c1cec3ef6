// Order lifecycle
pub mod order_status;
pub mod transaction_id;

// Checkout payment flows
pub mod checkout_eligibility;
pub mod payment_session;
pub mod setup_token;

pub use checkout_eligibility::CheckoutEligibility;
pub use order_status::OrderStatusService;
pub use payment_session::PaymentSessionService;
pub use setup_token::SetupTokenService;
