pub mod account_service;
pub mod admin_service;
pub mod event_form;
pub mod event_service;
pub mod rating_service;
pub mod reservation_service;

pub use account_service::AccountService;
pub use admin_service::AdminService;
pub use event_service::{EventError, EventService};
pub use rating_service::RatingService;
pub use reservation_service::{ReservationError, ReservationService};
