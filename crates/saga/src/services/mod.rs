//! External service traits for saga steps, with in-memory doubles and
//! HTTP-backed production implementations.

pub mod carrier;
pub mod payment;
pub mod renderer;

pub use carrier::{
    CarrierDispatcher, DispatchError, DispatchReceipt, InMemoryCarrierDispatcher,
    LobCarrierDispatcher,
};
pub use payment::{InMemoryPaymentGateway, PaymentError, PaymentGateway, SquarePaymentGateway};
pub use renderer::{DocumentRenderer, HtmlNoticeRenderer, InMemoryRenderer, RenderError};
