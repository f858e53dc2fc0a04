pub mod payment;
pub mod pricing;
pub mod reservation;
pub mod slot;
pub mod venue;

pub use payment::{
    Order, OrderId, PaymentRecord, PaymentSession, PaymentState, TransitionError,
};
pub use pricing::PriceQuote;
pub use reservation::{
    ReservationOutcome, ReservationSelection, ValidatedSelection, ValidationError,
};
pub use slot::{SlotSet, SlotSource, TimeSlot};
pub use venue::{RawVenue, Venue};
