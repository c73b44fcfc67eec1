//! Payment-gated delivery saga.
//!
//! One paid request drives a 3-step saga (charge → render → dispatch) with
//! a compensating refund when a step after the charge fails:
//! 1. Charge the customer's card.
//! 2. Render the notice document.
//! 3. Hand the document to the carrier for certified delivery.
//!
//! A charged customer either receives a dispatched document or gets their
//! money back; when even the refund fails, an operator is alerted and the
//! user is told to contact support with the payment reference.

pub mod coordinator;
pub mod error;
pub mod outcome;
pub mod request;
pub mod services;

pub use coordinator::{NOTICE_PRICE, SagaCoordinator};
pub use error::SagaError;
pub use outcome::{FailureCause, SagaOutcome};
pub use request::NoticeRequest;
pub use services::{
    CarrierDispatcher, DispatchError, DispatchReceipt, DocumentRenderer, HtmlNoticeRenderer,
    InMemoryCarrierDispatcher, InMemoryPaymentGateway, InMemoryRenderer, LobCarrierDispatcher,
    PaymentError, PaymentGateway, RenderError, SquarePaymentGateway,
};
