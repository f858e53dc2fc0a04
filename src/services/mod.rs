pub mod availability;
pub mod backend;
pub mod gateway;
pub mod in_flight;
pub mod order_id;
pub mod payment;
pub mod pricing;
pub mod reservation;
pub mod venues;
