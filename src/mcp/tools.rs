// Tool registry: names, input schemas and dispatch onto the Salesforce client

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use super::protocol::ToolDefinition;
use crate::client::SalesforceClient;
use crate::error::SalesforceError;
use crate::models::{AppointmentUpdate, ContactUpdate, NewAppointment, NewContact};
use crate::soql::DEFAULT_LIST_LIMIT;

pub const CREATE_CONTACT: &str = "salesforce_create_contact";
pub const GET_CONTACT: &str = "salesforce_get_contact";
pub const UPDATE_CONTACT: &str = "salesforce_update_contact";
pub const DELETE_CONTACT: &str = "salesforce_delete_contact";
pub const LIST_CONTACTS: &str = "salesforce_list_contacts";
pub const CREATE_APPOINTMENT: &str = "salesforce_create_appointment";
pub const GET_APPOINTMENT: &str = "salesforce_get_appointment";
pub const UPDATE_APPOINTMENT: &str = "salesforce_update_appointment";
pub const DELETE_APPOINTMENT: &str = "salesforce_delete_appointment";
pub const LIST_APPOINTMENTS: &str = "salesforce_list_appointments";
pub const QUERY: &str = "salesforce_query";

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Salesforce(#[from] SalesforceError),

    #[error("Failed to encode result of {tool}: {source}")]
    Encode {
        tool: String,
        source: serde_json::Error,
    },
}

// ==================================================================================================
// Arguments
// ==================================================================================================

#[derive(Debug, Deserialize)]
struct CreateContactArgs {
    data: NewContact,
}

#[derive(Debug, Deserialize)]
struct ContactIdArgs {
    contact_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateContactArgs {
    contact_id: String,
    data: ContactUpdate,
}

#[derive(Debug, Deserialize)]
struct CreateAppointmentArgs {
    data: NewAppointment,
}

#[derive(Debug, Deserialize)]
struct EventIdArgs {
    event_id: String,
}

#[derive(Debug, Deserialize)]
struct UpdateAppointmentArgs {
    event_id: String,
    data: AppointmentUpdate,
}

#[derive(Debug, Deserialize)]
struct ListArgs {
    #[serde(default = "default_limit")]
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    soql: String,
}

fn default_limit() -> u32 {
    DEFAULT_LIST_LIMIT
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    // Missing arguments behave like an empty object so defaults still apply
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|source| ToolError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

// ==================================================================================================
// Dispatch
// ==================================================================================================

/// Run a tool and return its JSON result
pub async fn call_tool(
    client: &SalesforceClient,
    name: &str,
    arguments: Value,
) -> Result<Value, ToolError> {
    match name {
        CREATE_CONTACT => {
            let args: CreateContactArgs = parse_args(name, arguments)?;
            let id = client.create_contact(&args.data).await?;
            Ok(json!({ "Id": id }))
        }
        GET_CONTACT => {
            let args: ContactIdArgs = parse_args(name, arguments)?;
            let contact = client.get_contact(&args.contact_id).await?;
            to_json(name, &contact)
        }
        UPDATE_CONTACT => {
            let args: UpdateContactArgs = parse_args(name, arguments)?;
            client.update_contact(&args.contact_id, &args.data).await?;
            Ok(json!({ "status": "success", "contact_id": args.contact_id }))
        }
        DELETE_CONTACT => {
            let args: ContactIdArgs = parse_args(name, arguments)?;
            client.delete_contact(&args.contact_id).await?;
            Ok(json!({ "status": "success" }))
        }
        LIST_CONTACTS => {
            let args: ListArgs = parse_args(name, arguments)?;
            let result = client.list_contacts(args.limit).await?;
            to_json(name, &result)
        }
        CREATE_APPOINTMENT => {
            let args: CreateAppointmentArgs = parse_args(name, arguments)?;
            let id = client.create_appointment(&args.data).await?;
            Ok(json!({ "Id": id }))
        }
        GET_APPOINTMENT => {
            let args: EventIdArgs = parse_args(name, arguments)?;
            let appointment = client.get_appointment(&args.event_id).await?;
            to_json(name, &appointment)
        }
        UPDATE_APPOINTMENT => {
            let args: UpdateAppointmentArgs = parse_args(name, arguments)?;
            client.update_appointment(&args.event_id, &args.data).await?;
            Ok(json!({ "status": "success", "event_id": args.event_id }))
        }
        DELETE_APPOINTMENT => {
            let args: EventIdArgs = parse_args(name, arguments)?;
            client.delete_appointment(&args.event_id).await?;
            Ok(json!({ "status": "success" }))
        }
        LIST_APPOINTMENTS => {
            let args: ListArgs = parse_args(name, arguments)?;
            let result = client.list_appointments(args.limit).await?;
            to_json(name, &result)
        }
        QUERY => {
            let args: QueryArgs = parse_args(name, arguments)?;
            let result = client.query(&args.soql).await?;
            to_json(name, &result)
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn to_json<T: serde::Serialize>(tool: &str, value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|source| ToolError::Encode {
        tool: tool.to_string(),
        source,
    })
}

// ==================================================================================================
// Definitions
// ==================================================================================================

fn contact_properties() -> Value {
    json!({
        "FirstName": { "type": "string" },
        "LastName": { "type": "string" },
        "Phone": { "type": "string" },
        "Email": { "type": "string", "format": "email" }
    })
}

fn appointment_properties() -> Value {
    json!({
        "Subject": { "type": "string" },
        "StartDateTime": {
            "type": "string",
            "format": "date-time",
            "description": "ISO-8601 datetime with timezone offset"
        },
        "EndDateTime": {
            "type": "string",
            "format": "date-time",
            "description": "ISO-8601 datetime with timezone offset"
        },
        "WhoId": { "type": "string", "description": "Contact ID to link the event to" }
    })
}

fn id_schema(field: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": { field: { "type": "string", "description": description } },
        "required": [field]
    })
}

fn list_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "limit": {
                "type": "integer",
                "minimum": 0,
                "default": DEFAULT_LIST_LIMIT,
                "description": "Maximum number of rows to return"
            }
        }
    })
}

/// All tools exposed by this server
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: CREATE_CONTACT,
            description: "Create a Salesforce Contact. Returns the new contact Id.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": "object",
                        "properties": contact_properties(),
                        "required": ["FirstName", "LastName", "Phone", "Email"]
                    }
                },
                "required": ["data"]
            }),
        },
        ToolDefinition {
            name: GET_CONTACT,
            description: "Fetch a Salesforce Contact by Id.",
            input_schema: id_schema("contact_id", "Salesforce Contact Id"),
        },
        ToolDefinition {
            name: UPDATE_CONTACT,
            description: "Update a Salesforce Contact by Id. Only the fields provided are changed.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "contact_id": { "type": "string", "description": "Salesforce Contact Id" },
                    "data": { "type": "object", "properties": contact_properties() }
                },
                "required": ["contact_id", "data"]
            }),
        },
        ToolDefinition {
            name: DELETE_CONTACT,
            description: "Delete a Salesforce Contact by Id.",
            input_schema: id_schema("contact_id", "Salesforce Contact Id"),
        },
        ToolDefinition {
            name: LIST_CONTACTS,
            description: "List the most recently created Salesforce Contacts.",
            input_schema: list_schema(),
        },
        ToolDefinition {
            name: CREATE_APPOINTMENT,
            description: "Create a Salesforce appointment (Event). Returns the new event Id.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "data": {
                        "type": "object",
                        "properties": appointment_properties(),
                        "required": ["Subject", "StartDateTime", "EndDateTime", "WhoId"]
                    }
                },
                "required": ["data"]
            }),
        },
        ToolDefinition {
            name: GET_APPOINTMENT,
            description: "Fetch a Salesforce appointment (Event) by Id.",
            input_schema: id_schema("event_id", "Salesforce Event Id"),
        },
        ToolDefinition {
            name: UPDATE_APPOINTMENT,
            description: "Update a Salesforce appointment (Event) by Id. Only the fields provided are changed.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": { "type": "string", "description": "Salesforce Event Id" },
                    "data": { "type": "object", "properties": appointment_properties() }
                },
                "required": ["event_id", "data"]
            }),
        },
        ToolDefinition {
            name: DELETE_APPOINTMENT,
            description: "Delete a Salesforce appointment (Event) by Id.",
            input_schema: id_schema("event_id", "Salesforce Event Id"),
        },
        ToolDefinition {
            name: LIST_APPOINTMENTS,
            description: "List Salesforce appointments (Events), latest start time first.",
            input_schema: list_schema(),
        },
        ToolDefinition {
            name: QUERY,
            description: "Run a SOQL query via the Salesforce /query endpoint.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "soql": { "type": "string", "description": "SOQL query string" }
                },
                "required": ["soql"]
            }),
        },
    ]
}
