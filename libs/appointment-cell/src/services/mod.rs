pub mod adapters;
pub mod booking;
pub mod clock;
pub mod locks;
pub mod pricing;
pub mod repository;
pub mod store;
pub mod validator;

pub use booking::AppointmentBookingService;
pub use repository::AppointmentRepository;
