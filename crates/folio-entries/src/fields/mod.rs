//! Built-in field hooks.
//!
//! Each hook computes or normalizes one field of an entry while it is being
//! fetched or created. The set is fixed: [`BUILTIN_HOOKS`] lists every hook
//! with its config flag, and [`install`] subscribes the enabled ones to an
//! [`EventBus`] in table order.
//!
//! Hooks only fill in what is missing or normalize what is present, so
//! running them twice over the same registry changes nothing.

mod dates;
mod defaults;
mod identity;

use std::sync::Arc;

use tracing::debug;

use crate::config::Settings;
use crate::error::EntriesResult;
use crate::event::{Event, EventBus, HookContext};

pub use dates::{normalize_date, DateFieldHook};
pub use defaults::{DefaultValueHook, UuidHook};
pub use identity::{IdHook, ModifiedAtHook, SlugHook};

/// A field computation attached to one or more lifecycle events.
pub trait FieldHook: Send + Sync {
    /// Name used in logs and in [`EventBus::subscribers`].
    fn name(&self) -> &'static str;

    /// Events this hook subscribes to.
    fn events(&self) -> &'static [Event];

    fn apply(&self, ctx: &mut HookContext<'_>) -> EntriesResult<()>;
}

/// One row of the built-in hook table.
pub struct FieldHookEntry {
    pub name: &'static str,
    pub enabled: fn(&Settings) -> bool,
    pub build: fn(&Settings) -> Box<dyn FieldHook>,
}

/// Events a fetch-time-only hook listens on.
pub(crate) const ON_FETCH: &[Event] = &[Event::FetchSingleHasResult];
/// Events a hook that also seeds new entries listens on.
pub(crate) const ON_FETCH_AND_CREATE: &[Event] = &[Event::FetchSingleHasResult, Event::Create];
pub(crate) const ON_CREATE: &[Event] = &[Event::Create];

/// Every built-in hook, in installation order.
pub static BUILTIN_HOOKS: &[FieldHookEntry] = &[
    FieldHookEntry {
        name: "id",
        enabled: |s| s.fields.id.enabled,
        build: |_| Box::new(IdHook),
    },
    FieldHookEntry {
        name: "slug",
        enabled: |s| s.fields.slug.enabled,
        build: |_| Box::new(SlugHook),
    },
    FieldHookEntry {
        name: "modified_at",
        enabled: |s| s.fields.modified_at.enabled,
        build: |_| Box::new(ModifiedAtHook),
    },
    FieldHookEntry {
        name: "published_at",
        enabled: |s| s.fields.published_at.enabled,
        build: |_| Box::new(DateFieldHook::new("published_at")),
    },
    FieldHookEntry {
        name: "published_by",
        enabled: |s| s.fields.published_by.enabled,
        build: |s| {
            Box::new(DefaultValueHook::new(
                "published_by",
                s.fields.published_by.default_or("".into()),
            ))
        },
    },
    FieldHookEntry {
        name: "created_at",
        enabled: |s| s.fields.created_at.enabled,
        build: |_| Box::new(DateFieldHook::new("created_at")),
    },
    FieldHookEntry {
        name: "created_by",
        enabled: |s| s.fields.created_by.enabled,
        build: |s| {
            Box::new(DefaultValueHook::new(
                "created_by",
                s.fields.created_by.default_or("".into()),
            ))
        },
    },
    FieldHookEntry {
        name: "uuid",
        enabled: |s| s.fields.uuid.enabled,
        build: |_| Box::new(UuidHook),
    },
    FieldHookEntry {
        name: "visibility",
        enabled: |s| s.fields.visibility.enabled,
        build: |s| {
            Box::new(DefaultValueHook::new(
                "visibility",
                s.fields.visibility.default_or("visible".into()),
            ))
        },
    },
    FieldHookEntry {
        name: "routable",
        enabled: |s| s.fields.routable.enabled,
        build: |s| {
            Box::new(DefaultValueHook::new(
                "routable",
                s.fields.routable.default_or(true.into()),
            ))
        },
    },
];

/// Subscribe every enabled built-in hook to `bus`.
///
/// Returns the names of the installed hooks.
pub fn install(bus: &mut EventBus, settings: &Settings) -> Vec<&'static str> {
    let mut installed = Vec::new();
    for entry in BUILTIN_HOOKS {
        if !(entry.enabled)(settings) {
            debug!(hook = entry.name, "field hook disabled");
            continue;
        }
        let hook: Arc<dyn FieldHook> = Arc::from((entry.build)(settings));
        let name = hook.name();
        for &event in hook.events() {
            let hook = Arc::clone(&hook);
            bus.subscribe_named(event, name, move |ctx| hook.apply(ctx));
        }
        installed.push(entry.name);
    }
    debug!(hooks = ?installed, "field hooks installed");
    installed
}
