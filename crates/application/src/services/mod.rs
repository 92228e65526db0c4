pub mod payment_service;
pub mod priority_service;
pub mod recommendation_service;
pub mod recurring_service;

pub use payment_service::PaymentService;
pub use priority_service::{PriorityService, RecalculationReport, ScoredItem};
pub use recommendation_service::RecommendationService;
pub use recurring_service::{AdvanceOutcome, RecurringService};
