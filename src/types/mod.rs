//! Request, response and record types shared across the service.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`exam`] | Explanation requests, questions and cached records |
//! | [`payment`] | Create/capture order bodies and provider results |

pub mod exam;
pub mod payment;

pub use exam::{ExplanationRecord, ExplanationRequest, Explanations, Question, UNTITLED_EXAM};
pub use payment::{
    CaptureOrderRequest, CapturedOrder, CreateOrderRequest, CreatedOrder, OrderDraft,
    DEFAULT_CURRENCY,
};
