//! C FFI bindings for gridkit-core
//!
//! Exposes a grid session backed by the headless grid so a host written in
//! another language can drive it. Structured values cross the boundary as
//! JSON strings. Returned strings must be freed with `gk_free_string`.

use gridkit_core::{
    CellValueChanged, ColumnSortState, CommandOutcome, GridConfig, GridInput, GridSession,
    GridWidget, HeadlessGrid, RecordedOutputs, RowId, SelectionChanged, SelectionSource,
};
use serde::Serialize;
use serde_json::Value;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;
use std::time::Instant;
use tracing::warn;

/// Success
pub const GK_OK: i32 = 0;
/// The command reached the session but was skipped (reported as a notice)
pub const GK_SKIPPED: i32 = 1;
/// A required pointer was null
pub const GK_NULL_POINTER: i32 = -1;
/// A string argument was not valid UTF-8
pub const GK_INVALID_UTF8: i32 = -2;
/// A JSON argument could not be parsed
pub const GK_INVALID_JSON: i32 = -3;
/// The referenced row or grid does not exist
pub const GK_NOT_FOUND: i32 = -4;

type Session = GridSession<HeadlessGrid, RecordedOutputs>;

/// Opaque handle to a grid session
pub struct FfiSession {
    inner: Session,
}

unsafe fn read_str<'a>(s: *const c_char) -> Result<&'a str, i32> {
    if s.is_null() {
        return Err(GK_NULL_POINTER);
    }
    CStr::from_ptr(s).to_str().map_err(|err| {
        warn!(error = %err, "string argument is not valid UTF-8");
        GK_INVALID_UTF8
    })
}

unsafe fn read_json<T: serde::de::DeserializeOwned>(s: *const c_char) -> Result<T, i32> {
    let text = read_str(s)?;
    serde_json::from_str(text).map_err(|err| {
        warn!(error = %err, "JSON argument could not be parsed");
        GK_INVALID_JSON
    })
}

fn no_grid(call: &str) -> i32 {
    warn!(call, "no grid mounted");
    GK_NOT_FOUND
}

fn json_string<T: Serialize + ?Sized>(value: &T) -> *mut c_char {
    serde_json::to_string(value)
        .ok()
        .and_then(|s| CString::new(s).ok())
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

fn outcome_status(outcome: CommandOutcome) -> i32 {
    match outcome {
        CommandOutcome::Done => GK_OK,
        CommandOutcome::Skipped(_) => GK_SKIPPED,
    }
}

fn status<T>(result: Result<T, i32>) -> i32 {
    match result {
        Ok(_) => GK_OK,
        Err(code) => code,
    }
}

/// Create a session from a JSON options object
///
/// # Safety
/// - `config_json` must be a valid C string or null (null uses the defaults)
/// - Returns null if the options cannot be parsed
/// - Free the session with `gk_session_free`
#[no_mangle]
pub unsafe extern "C" fn gk_session_new(config_json: *const c_char) -> *mut FfiSession {
    let config = if config_json.is_null() {
        GridConfig::default()
    } else {
        match read_str(config_json).ok().map(GridConfig::from_json) {
            Some(Ok(config)) => config,
            _ => return ptr::null_mut(),
        }
    };

    let inner = GridSession::new(config, RecordedOutputs::new());
    Box::into_raw(Box::new(FfiSession { inner }))
}

/// Free a session
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new` or null
#[no_mangle]
pub unsafe extern "C" fn gk_session_free(session: *mut FfiSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Deliver the host input (`{"rowData": ..., "alternativeData": ..., "columnDefs": [...]}`)
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - `input_json` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gk_set_input(session: *mut FfiSession, input_json: *const c_char) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    status(read_json::<GridInput>(input_json).map(|input| session.inner.set_input(input)))
}

/// Mount a fresh headless grid
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
#[no_mangle]
pub unsafe extern "C" fn gk_mount(session: *mut FfiSession) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    session.inner.mount(HeadlessGrid::new());
    GK_OK
}

/// Unmount the grid
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
#[no_mangle]
pub unsafe extern "C" fn gk_unmount(session: *mut FfiSession) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    match session.inner.unmount() {
        Some(_) => GK_OK,
        None => no_grid("gk_unmount"),
    }
}

/// Report that the grid finished initializing
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
#[no_mangle]
pub unsafe extern "C" fn gk_on_ready(session: *mut FfiSession) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    session.inner.on_ready(Instant::now());
    GK_OK
}

/// Report a selection change with the grid's event source tag
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - `source` must be a valid C string or null (null means user interaction)
#[no_mangle]
pub unsafe extern "C" fn gk_on_selection_changed(session: *mut FfiSession, source: *const c_char) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    let source = if source.is_null() {
        SelectionSource::UserInteraction
    } else {
        match read_str(source) {
            Ok(tag) => SelectionSource::from_tag(tag),
            Err(code) => return code,
        }
    };
    session.inner.on_selection_changed(SelectionChanged::new(source));
    GK_OK
}

/// Report a cell edit made outside the headless grid
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - `event_json` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gk_on_cell_value_changed(session: *mut FfiSession, event_json: *const c_char) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    status(read_json::<CellValueChanged>(event_json).map(|event| session.inner.on_cell_value_changed(event)))
}

/// Report a filter change
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
#[no_mangle]
pub unsafe extern "C" fn gk_on_filter_changed(session: *mut FfiSession) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    session.inner.on_filter_changed();
    GK_OK
}

/// Report a sort change
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
#[no_mangle]
pub unsafe extern "C" fn gk_on_sort_changed(session: *mut FfiSession) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    session.inner.on_sort_changed();
    GK_OK
}

/// Select rows by id (JSON array of strings) and report the change
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - `ids_json` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gk_select_rows(session: *mut FfiSession, ids_json: *const c_char) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    let ids: Vec<RowId> = match read_json(ids_json) {
        Ok(ids) => ids,
        Err(code) => return code,
    };
    let Some(grid) = session.inner.widget_mut() else {
        return no_grid("gk_select_rows");
    };
    let event = grid.select(&ids);
    session.inner.on_selection_changed(event);
    GK_OK
}

/// Edit one cell of the headless grid and report the change
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - `row_id`, `field` and `value_json` must be valid C strings
#[no_mangle]
pub unsafe extern "C" fn gk_edit_cell(
    session: *mut FfiSession,
    row_id: *const c_char,
    field: *const c_char,
    value_json: *const c_char,
) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    let (id, field, value) = match (read_str(row_id), read_str(field), read_json::<Value>(value_json)) {
        (Ok(id), Ok(field), Ok(value)) => (RowId::new(id), field, value),
        (Err(code), _, _) | (_, Err(code), _) | (_, _, Err(code)) => return code,
    };
    let Some(grid) = session.inner.widget_mut() else {
        return no_grid("gk_edit_cell");
    };
    match grid.edit_cell(&id, field, value) {
        Some(event) => {
            session.inner.on_cell_value_changed(event);
            GK_OK
        }
        None => {
            warn!(%id, field, "cell edit rejected: unknown row or read-only column");
            GK_NOT_FOUND
        }
    }
}

/// Set the quick filter of the headless grid (null clears it)
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - `text` must be a valid C string or null
#[no_mangle]
pub unsafe extern "C" fn gk_set_quick_filter(session: *mut FfiSession, text: *const c_char) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    let text = if text.is_null() {
        None
    } else {
        match read_str(text) {
            Ok(t) => Some(t.to_string()),
            Err(code) => return code,
        }
    };
    let Some(grid) = session.inner.widget_mut() else {
        return no_grid("gk_set_quick_filter");
    };
    grid.set_quick_filter(text);
    session.inner.on_filter_changed();
    GK_OK
}

/// Apply column sort state (JSON array) to the headless grid
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - `state_json` must be a valid C string
#[no_mangle]
pub unsafe extern "C" fn gk_apply_column_state(session: *mut FfiSession, state_json: *const c_char) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    let state: Vec<ColumnSortState> = match read_json(state_json) {
        Ok(state) => state,
        Err(code) => return code,
    };
    let Some(grid) = session.inner.widget_mut() else {
        return no_grid("gk_apply_column_state");
    };
    if grid.apply_column_state(&state).is_err() {
        return GK_SKIPPED;
    }
    session.inner.on_sort_changed();
    GK_OK
}

/// Reload the last input, discarding edits
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
#[no_mangle]
pub unsafe extern "C" fn gk_reload(session: *mut FfiSession) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    if session.inner.reload(Instant::now()) {
        GK_OK
    } else {
        GK_SKIPPED
    }
}

macro_rules! command_fn {
    ($(#[$doc:meta])* $name:ident => $method:ident) => {
        $(#[$doc])*
        ///
        /// # Safety
        /// - `session` must be a valid pointer returned by `gk_session_new`
        #[no_mangle]
        pub unsafe extern "C" fn $name(session: *mut FfiSession) -> i32 {
            let Some(session) = session.as_mut() else {
                return GK_NULL_POINTER;
            };
            outcome_status(session.inner.$method())
        }
    };
}

command_fn!(
    /// Export every displayed row to CSV
    gk_export_all => export_all
);
command_fn!(
    /// Export the selected rows to CSV
    gk_export_selected => export_selected
);
command_fn!(
    /// Remove every filter
    gk_clear_filters => clear_filters
);
command_fn!(
    /// Fit every column to its content
    gk_auto_size_columns => auto_size_columns
);
command_fn!(
    /// Restore the initial column state
    gk_reset_column_state => reset_column_state
);
command_fn!(
    /// Deselect every row
    gk_clear_selection => clear_selection
);

/// Run deferred work that is due. Returns 1 if a task ran, 0 otherwise.
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
#[no_mangle]
pub unsafe extern "C" fn gk_poll(session: *mut FfiSession) -> i32 {
    let Some(session) = session.as_mut() else {
        return GK_NULL_POINTER;
    };
    match session.inner.poll(Instant::now()) {
        Some(_) => 1,
        None => 0,
    }
}

/// Milliseconds until `gk_poll` has work, or -1 if nothing is pending
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
#[no_mangle]
pub unsafe extern "C" fn gk_next_deadline_ms(session: *const FfiSession) -> i64 {
    let Some(session) = session.as_ref() else {
        return -1;
    };
    match session.inner.next_deadline() {
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            i64::try_from(remaining.as_millis()).unwrap_or(i64::MAX)
        }
        None => -1,
    }
}

/// Drain the commands the grid received, as a JSON array
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - Returns null if no grid is mounted
/// - Caller must free the returned string with `gk_free_string`
#[no_mangle]
pub unsafe extern "C" fn gk_take_commands(session: *mut FfiSession) -> *mut c_char {
    let Some(grid) = session.as_mut().and_then(|s| s.inner.widget_mut()) else {
        return ptr::null_mut();
    };
    json_string(&grid.take_commands())
}

/// Drain pending notices, as a JSON array
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - Caller must free the returned string with `gk_free_string`
#[no_mangle]
pub unsafe extern "C" fn gk_take_notices(session: *mut FfiSession) -> *mut c_char {
    let Some(session) = session.as_mut() else {
        return ptr::null_mut();
    };
    json_string(&session.inner.outputs_mut().take_notices())
}

/// Current output views (`selectedRows`, `editedData`, `changedRows`) as JSON
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - Caller must free the returned string with `gk_free_string`
#[no_mangle]
pub unsafe extern "C" fn gk_output_views(session: *const FfiSession) -> *mut c_char {
    let Some(session) = session.as_ref() else {
        return ptr::null_mut();
    };
    json_string(session.inner.outputs().views())
}

/// Grid stats as JSON
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - Caller must free the returned string with `gk_free_string`
#[no_mangle]
pub unsafe extern "C" fn gk_stats(session: *const FfiSession) -> *mut c_char {
    let Some(session) = session.as_ref() else {
        return ptr::null_mut();
    };
    json_string(&session.inner.stats())
}

/// Options for creating the grid (default column def, columns, selection, paging) as JSON
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - Caller must free the returned string with `gk_free_string`
#[no_mangle]
pub unsafe extern "C" fn gk_widget_options(session: *const FfiSession) -> *mut c_char {
    let Some(session) = session.as_ref() else {
        return ptr::null_mut();
    };
    json_string(&session.inner.widget_options())
}

/// Session state (`"empty"`, `"loaded"` or `"dirty"`) as JSON
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - Caller must free the returned string with `gk_free_string`
#[no_mangle]
pub unsafe extern "C" fn gk_state(session: *const FfiSession) -> *mut c_char {
    let Some(session) = session.as_ref() else {
        return ptr::null_mut();
    };
    json_string(&session.inner.state())
}

/// Why the last input could not be loaded, as JSON
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - Returns null when the last input loaded fine
/// - Caller must free the returned string with `gk_free_string`
#[no_mangle]
pub unsafe extern "C" fn gk_diagnostic(session: *const FfiSession) -> *mut c_char {
    match session.as_ref().and_then(|s| s.inner.diagnostic()) {
        Some(diagnostic) => json_string(diagnostic),
        None => ptr::null_mut(),
    }
}

/// Collected errors, newest first, as JSON
///
/// # Safety
/// - `session` must be a valid pointer returned by `gk_session_new`
/// - Caller must free the returned string with `gk_free_string`
#[no_mangle]
pub unsafe extern "C" fn gk_errors(session: *const FfiSession) -> *mut c_char {
    let Some(session) = session.as_ref() else {
        return ptr::null_mut();
    };
    json_string(&session.inner.diagnostics().errors())
}

/// Install a log subscriber writing to stderr
///
/// `filter` uses `RUST_LOG` syntax; null reads `RUST_LOG` and defaults to
/// `info`. Returns `GK_SKIPPED` if a subscriber is already installed.
///
/// # Safety
/// - `filter` must be a valid C string or null
#[no_mangle]
pub unsafe extern "C" fn gk_init_logging(filter: *const c_char) -> i32 {
    let env_filter = if filter.is_null() {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    } else {
        match read_str(filter) {
            Ok(directives) => match tracing_subscriber::EnvFilter::try_new(directives) {
                Ok(env_filter) => env_filter,
                Err(_) => return GK_INVALID_JSON,
            },
            Err(code) => return code,
        }
    };

    match tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(()) => GK_OK,
        Err(_) => GK_SKIPPED,
    }
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a gk_* function or null
#[no_mangle]
pub unsafe extern "C" fn gk_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
