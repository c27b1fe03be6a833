pub mod create_appointment_command;

pub use create_appointment_command::{CreateAppointmentCommand, NewAppointment};
