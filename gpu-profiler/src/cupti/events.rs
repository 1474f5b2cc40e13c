//! Event-group backed counter reader
//!
//! One single-event group per monitored context, collected in continuous mode.

use super::api::ContextHandle;
use super::bindings::{self, CUpti_EventGroup, CUpti_EventID};
use crate::error::CuptiError;
use crate::sampling::EventReader;
use dashmap::DashMap;

/// `CUpti_EventGroup` kept as an address
#[derive(Debug, Clone, Copy)]
struct EventGroup(usize);

impl EventGroup {
    fn as_raw(self) -> CUpti_EventGroup {
        self.0 as CUpti_EventGroup
    }
}

/// [`EventReader`] over the CUPTI event API
#[derive(Debug, Default)]
pub struct SysEventReader {
    groups: DashMap<ContextHandle, EventGroup>,
}

impl SysEventReader {
    pub fn new() -> Self {
        Self::default()
    }

    unsafe fn create_group(context: ContextHandle, event: CUpti_EventID) -> Result<EventGroup, CuptiError> {
        let ctx = context.as_raw();
        CuptiError::check(
            "cuptiSetEventCollectionMode",
            bindings::cuptiSetEventCollectionMode(ctx, bindings::CUPTI_EVENT_COLLECTION_MODE_CONTINUOUS),
        )?;

        let mut group: CUpti_EventGroup = std::ptr::null_mut();
        CuptiError::check("cuptiEventGroupCreate", bindings::cuptiEventGroupCreate(ctx, &mut group, 0))?;

        let added = CuptiError::check("cuptiEventGroupAddEvent", bindings::cuptiEventGroupAddEvent(group, event))
            .and_then(|_| CuptiError::check("cuptiEventGroupEnable", bindings::cuptiEventGroupEnable(group)));
        if let Err(e) = added {
            bindings::cuptiEventGroupDestroy(group);
            return Err(e);
        }

        Ok(EventGroup(group as usize))
    }
}

impl EventReader for SysEventReader {
    fn current_context(&self) -> Option<ContextHandle> {
        let mut ctx: bindings::CUcontext = std::ptr::null_mut();
        let res = unsafe { bindings::cuCtxGetCurrent(&mut ctx) };
        let ctx = ContextHandle::from_raw(ctx);
        (res == 0 && !ctx.is_null()).then_some(ctx)
    }

    fn start(&self, context: ContextHandle, event: CUpti_EventID) -> Result<(), CuptiError> {
        let group = unsafe { Self::create_group(context, event)? };
        if let Some(old) = self.groups.insert(context, group) {
            unsafe {
                bindings::cuptiEventGroupDisable(old.as_raw());
                bindings::cuptiEventGroupDestroy(old.as_raw());
            }
        }
        Ok(())
    }

    fn read(&self, context: ContextHandle, event: CUpti_EventID) -> Result<u64, CuptiError> {
        let group = self
            .groups
            .get(&context)
            .map(|g| *g)
            .ok_or(CuptiError::new("cuptiEventGroupReadEvent", bindings::CUPTI_ERROR_INVALID_CONTEXT))?;

        let mut value = 0u64;
        let mut size = std::mem::size_of::<u64>();
        let res = unsafe {
            bindings::cuptiEventGroupReadEvent(
                group.as_raw(),
                bindings::CUPTI_EVENT_READ_FLAG_NONE,
                event,
                &mut size,
                &mut value,
            )
        };
        CuptiError::check("cuptiEventGroupReadEvent", res).map(|_| value)
    }

    fn stop(&self, context: ContextHandle) -> Result<(), CuptiError> {
        let Some((_, group)) = self.groups.remove(&context) else {
            return Ok(());
        };

        let disabled = CuptiError::check("cuptiEventGroupDisable", unsafe {
            bindings::cuptiEventGroupDisable(group.as_raw())
        });
        let destroyed = CuptiError::check("cuptiEventGroupDestroy", unsafe {
            bindings::cuptiEventGroupDestroy(group.as_raw())
        });
        disabled.and(destroyed)
    }
}
