use folio_types::Value;
use uuid::Uuid;

use super::{FieldHook, ON_CREATE, ON_FETCH_AND_CREATE};
use crate::error::EntriesResult;
use crate::event::{Event, HookContext};

/// Fills a field with a configured value when it is absent or null.
#[derive(Debug, Clone)]
pub struct DefaultValueHook {
    field: &'static str,
    default: Value,
}

impl DefaultValueHook {
    pub fn new(field: &'static str, default: Value) -> Self {
        Self { field, default }
    }
}

impl FieldHook for DefaultValueHook {
    fn name(&self) -> &'static str {
        self.field
    }

    fn events(&self) -> &'static [Event] {
        ON_FETCH_AND_CREATE
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()> {
        if !ctx.field_is_set(self.field) {
            ctx.set_field(self.field, self.default.clone());
        }
        Ok(())
    }
}

/// Assigns a time-ordered UUID to new entries.
#[derive(Debug, Clone, Copy)]
pub struct UuidHook;

impl FieldHook for UuidHook {
    fn name(&self) -> &'static str {
        "uuid"
    }

    fn events(&self) -> &'static [Event] {
        ON_CREATE
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()> {
        if !ctx.field_is_set("uuid") {
            ctx.set_field("uuid", Uuid::now_v7().to_string());
        }
        Ok(())
    }
}
