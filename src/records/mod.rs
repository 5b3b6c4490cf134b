// Records module - visitor counting and the contact inbox, kept in one JSON file
mod error;
mod handlers;
mod store;
mod types;

pub use error::RecordsError;
pub use handlers::{
    delete_contact_handler, list_contacts_handler, record_visit_handler, submit_contact_handler,
    visitor_count_handler, visitor_data_handler,
};
pub use store::RecordStore;
pub use types::*;
