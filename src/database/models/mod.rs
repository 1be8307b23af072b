pub mod ban;
pub mod event;
pub mod rating;
pub mod reservation;
pub mod user;

pub use ban::Ban;
pub use event::{
    EventDetail, EventDocument, EventFields, EventFilter, EventImage, EventLink, EventRow, EventStatus,
    EventSummary, ImportantInfo, LinkInput, StoredFile, Ticket, TicketInput,
};
pub use rating::{Rating, RatingSummary};
pub use reservation::{Attendee, Reservation, UserReservation};
pub use user::{NewUser, UserAccess, UserCredentials, UserListItem, UserProfile};
