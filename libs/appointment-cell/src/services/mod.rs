pub mod appointment;
pub mod notify;

pub use appointment::AppointmentService;
