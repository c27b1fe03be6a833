pub mod create_customer_command;
pub mod delete_customer_command;

pub use create_customer_command::{CreateCustomerCommand, NewCustomer};
pub use delete_customer_command::DeleteCustomerCommand;
