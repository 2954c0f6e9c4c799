use crate::Error;
use std::time::Duration;

/// Handler registered for the host form's OnSave event.
pub type SaveHandler = Box<dyn FnMut(&dyn SaveEvent)>;

/// Capability surface both host form API variants provide: form and
/// organization metadata, the user id, and the OnSave registration hook.
pub trait FormScope {
    /// Label of the currently selected form.
    fn form_label(&self) -> String;

    /// Id of the record the form displays, possibly brace-wrapped.
    fn entity_id(&self) -> String;

    /// Logical name of the entity the form displays.
    fn entity_name(&self) -> String;

    /// Numeric form type code, mapped through [`get_form_type_name`].
    fn form_type(&self) -> i32;

    /// Unique name of the organization.
    fn org_unique_name(&self) -> String;

    /// Version of the organization.
    fn org_version(&self) -> String;

    /// Id of the signed-in user, possibly brace-wrapped.
    fn user_id(&self) -> String;

    /// Address of the hosting page.
    fn page_url(&self) -> String;

    /// Time from response end to load end, when the host has finished
    /// measuring it.
    fn page_load_time(&self) -> Option<Duration> {
        None
    }

    /// Register a handler for the form's OnSave event.
    fn add_on_save(&self, handler: SaveHandler);
}

/// The execution context a form lifecycle event hands to its handlers.
pub trait ExecutionContext {
    /// The form scope, when this context variant carries one.
    fn form_context(&self) -> Option<&dyn FormScope>;
}

/// Event args of one OnSave invocation.
pub trait SaveEvent {
    /// Numeric save mode code, mapped through [`get_save_mode_name`].
    fn save_mode(&self) -> i32;
}

/// Immutable snapshot of the business-entity context, captured once per
/// session and attached to every telemetry item.
#[derive(Debug, Clone)]
pub struct FormContext {
    /// Record id, braces stripped.
    pub entity_id: String,
    /// Entity logical name.
    pub entity_name: String,
    /// Human-readable form type.
    pub form_type: String,
    /// Organization unique name.
    pub org_name: String,
    /// Organization version.
    pub org_version: String,
    /// User id, braces stripped.
    pub user_id: String,
    /// Label of the current form.
    pub form_name: String,
    /// Address of the hosting page.
    pub page_url: String,
}

/// Pick whichever host form API variant is usable and capture a context
/// snapshot from it: the execution-context variant wins over the legacy
/// page handle.
pub(crate) fn resolve<'a>(
    execution_context: Option<&'a dyn ExecutionContext>,
    legacy_page: Option<&'a dyn FormScope>,
) -> Result<(FormContext, &'a dyn FormScope), Error> {
    let scope = execution_context
        .and_then(|context| context.form_context())
        .or(legacy_page)
        .ok_or(Error::MissingContext)?;
    Ok((capture(scope), scope))
}

fn capture(scope: &dyn FormScope) -> FormContext {
    FormContext {
        entity_id: normalize_guid(&scope.entity_id()).to_string(),
        entity_name: scope.entity_name(),
        form_type: get_form_type_name(scope.form_type()).to_string(),
        org_name: scope.org_unique_name(),
        org_version: scope.org_version(),
        user_id: normalize_guid(&scope.user_id()).to_string(),
        form_name: scope.form_label(),
        page_url: scope.page_url(),
    }
}

/// Strip the enclosing braces off a GUID-shaped value. Input without braces
/// is returned unchanged.
pub fn normalize_guid(value: &str) -> &str {
    value.trim_start_matches('{').trim_end_matches('}')
}

/// Whether a value is a GUID in 8-4-4-4-12 form, with or without enclosing
/// braces.
pub(crate) fn is_guid(value: &str) -> bool {
    let value = normalize_guid(value);
    let groups: Vec<&str> = value.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Human-readable label for a numeric form type code.
pub fn get_form_type_name(form_type: i32) -> &'static str {
    match form_type {
        1 => "Create",
        2 => "Update",
        3 => "Read Only",
        4 => "Disabled",
        6 => "Bulk Edit",
        _ => "Undefined",
    }
}

/// Human-readable label for a numeric save mode code.
pub fn get_save_mode_name(save_mode: i32) -> &'static str {
    match save_mode {
        1 => "Save",
        2 => "Save and Close",
        5 => "Deactivate",
        6 => "Reactivate",
        7 => "Send",
        15 => "Disqualify",
        16 => "Qualify",
        47 => "Assign",
        58 => "Save as Completed",
        59 => "Save and New",
        70 => "Auto Save",
        _ => "Undefined",
    }
}
