pub mod doctor;
pub mod nurse;
pub mod optimistic;
pub mod patient;

pub use doctor::DoctorAppointments;
pub use nurse::NurseView;
pub use patient::PatientAppointments;
