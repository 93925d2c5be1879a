// Wire shapes for the Salesforce records this server touches

pub mod appointment;
pub mod contact;
pub mod query;

pub use appointment::{Appointment, AppointmentUpdate, NewAppointment};
pub use contact::{Contact, ContactUpdate, NewContact};
pub use query::{CreateResult, QueryResult};
