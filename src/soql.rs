// Fixed SOQL statements used by the list operations

/// Default number of rows returned by list operations
pub const DEFAULT_LIST_LIMIT: u32 = 10;

/// Fields returned by `list_contacts`
pub const CONTACT_LIST_FIELDS: &[&str] = &["Id", "FirstName", "LastName", "Phone", "Email"];

/// Fields returned by `list_appointments`
pub const APPOINTMENT_LIST_FIELDS: &[&str] =
    &["Id", "Subject", "StartDateTime", "EndDateTime", "WhoId"];

/// Most recently created Contacts first
pub fn list_contacts(limit: u32) -> String {
    recent(CONTACT_LIST_FIELDS, "Contact", "CreatedDate", limit)
}

/// Latest-starting Events first
pub fn list_appointments(limit: u32) -> String {
    recent(APPOINTMENT_LIST_FIELDS, "Event", "StartDateTime", limit)
}

fn recent(fields: &[&str], sobject: &str, order_by: &str, limit: u32) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY {} DESC LIMIT {}",
        fields.join(", "),
        sobject,
        order_by,
        limit
    )
}
