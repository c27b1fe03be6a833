pub mod create_staff_command;

pub use create_staff_command::{CreateStaffCommand, NewStaff};
