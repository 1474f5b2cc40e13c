//! In-memory host and CUPTI doubles for integration tests

#![allow(dead_code)]

use aperture_cupti::cupti::bindings::{
    self, CUptiResult, CUpti_CallbackData, CUpti_CallbackDomain, CUpti_CallbackFunc, CUpti_CallbackId,
    CUpti_EventID, CUpti_NvtxData, CUpti_ResourceData, CUpti_SynchronizeData, nvtxRangePushA_params,
};
use aperture_cupti::{
    CallbackDomain, ContextHandle, CuptiApi, CuptiConfig, CuptiError, CuptiService, EventReader,
    ServiceError, StreamHandle, SubscriberHandle,
};
use aperture_shared::{
    AttrProperty, AttrType, AttributeKey, Entry, FinishHook, HostEvents, PostInitHook, SnapshotHook,
    SnapshotScope, SnapshotSink, TracingHost, Value, Variant,
};
use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::sync::{Arc, Mutex};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn ctx(addr: usize) -> ContextHandle {
    ContextHandle::from_raw(addr as *mut c_void)
}

pub fn stream(addr: usize) -> StreamHandle {
    StreamHandle::from_raw(addr as *mut c_void)
}

/// String value as stored with its terminator
pub fn tag(s: &str) -> Value {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    Value::Str(bytes)
}

/// String value stored without terminator
pub fn text(s: &str) -> Value {
    Value::Str(s.as_bytes().to_vec())
}

/// One observable effect, in the order it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Begin(String, Value),
    End(String),
    Set(String, Value),
    Snapshot(Vec<(String, Value)>),
    SamplingStarted(ContextHandle),
    SamplingStopped(ContextHandle),
}

/// [`TracingHost`] that journals every call by attribute name
#[derive(Default)]
pub struct RecordingHost {
    attributes: Mutex<Vec<(String, AttrType, AttrProperty)>>,
    journal: Mutex<Vec<HostCall>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record(&self, call: HostCall) {
        self.journal.lock().unwrap().push(call);
    }

    pub fn journal(&self) -> Vec<HostCall> {
        self.journal.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.journal.lock().unwrap().clear();
    }

    pub fn snapshots(&self) -> Vec<Vec<(String, Value)>> {
        self.journal()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Snapshot(entries) => Some(entries),
                _ => None,
            })
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<(AttributeKey, AttrType, AttrProperty)> {
        let attributes = self.attributes.lock().unwrap();
        attributes
            .iter()
            .position(|(n, _, _)| n == name)
            .map(|i| (AttributeKey::new(i as u64), attributes[i].1, attributes[i].2))
    }

    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _, _)| n.clone())
            .collect()
    }

    fn name(&self, attr: AttributeKey) -> String {
        self.attributes
            .lock()
            .unwrap()
            .get(attr.id() as usize)
            .map(|(n, _, _)| n.clone())
            .unwrap_or_else(|| attr.to_string())
    }
}

impl TracingHost for RecordingHost {
    fn create_attribute(&self, name: &str, ty: AttrType, property: AttrProperty) -> AttributeKey {
        let mut attributes = self.attributes.lock().unwrap();
        if let Some(i) = attributes.iter().position(|(n, _, _)| n == name) {
            return AttributeKey::new(i as u64);
        }
        attributes.push((name.to_string(), ty, property));
        AttributeKey::new(attributes.len() as u64 - 1)
    }

    fn begin(&self, attr: AttributeKey, value: Variant<'_>) {
        self.record(HostCall::Begin(self.name(attr), value.to_value()));
    }

    fn end(&self, attr: AttributeKey) {
        self.record(HostCall::End(self.name(attr)));
    }

    fn set(&self, attr: AttributeKey, value: Variant<'_>) {
        self.record(HostCall::Set(self.name(attr), value.to_value()));
    }

    fn push_snapshot(&self, scope: SnapshotScope, trigger_info: &[Entry<'_>]) {
        assert_eq!(scope, SnapshotScope::PROCESS_THREAD);
        let entries = trigger_info
            .iter()
            .map(|e| (self.name(e.attr), e.value.to_value()))
            .collect();
        self.record(HostCall::Snapshot(entries));
    }
}

/// Collects entries appended by the snapshot hook
#[derive(Debug, Default)]
pub struct VecSink(pub Vec<(AttributeKey, Value)>);

impl SnapshotSink for VecSink {
    fn append(&mut self, attr: AttributeKey, value: Variant<'_>) {
        self.0.push((attr, value.to_value()));
    }
}

/// [`HostEvents`] that keeps the hooks so tests can fire them
#[derive(Default)]
pub struct RecordingEvents {
    post_init: Vec<PostInitHook>,
    snapshot: Vec<SnapshotHook>,
    finish: Vec<FinishHook>,
}

impl RecordingEvents {
    pub fn post_init(&self, host: &dyn TracingHost) {
        for hook in &self.post_init {
            hook(host);
        }
    }

    pub fn snapshot(&self, host: &dyn TracingHost, sink: &mut dyn SnapshotSink) {
        for hook in &self.snapshot {
            hook(host, SnapshotScope::PROCESS_THREAD, &[], &mut *sink);
        }
    }

    pub fn finish(&self, host: &dyn TracingHost) {
        for hook in &self.finish {
            hook(host);
        }
    }

    pub fn hook_counts(&self) -> (usize, usize, usize) {
        (self.post_init.len(), self.snapshot.len(), self.finish.len())
    }
}

impl HostEvents for RecordingEvents {
    fn on_post_init(&mut self, hook: PostInitHook) {
        self.post_init.push(hook);
    }

    fn on_snapshot(&mut self, hook: SnapshotHook) {
        self.snapshot.push(hook);
    }

    fn on_finish(&mut self, hook: FinishHook) {
        self.finish.push(hook);
    }
}

#[derive(Default)]
pub struct FakeState {
    callback: Option<CUpti_CallbackFunc>,
    userdata: usize,
    pub enabled: Vec<CallbackDomain>,
    pub subscribed: usize,
    pub unsubscribed: usize,
    pub finalized: usize,
}

/// [`CuptiApi`] double that fires callbacks through the registered entry point
#[derive(Default)]
pub struct FakeCupti {
    state: Mutex<FakeState>,
    contexts: Mutex<HashMap<ContextHandle, (u32, u32)>>,
    streams: Mutex<HashMap<StreamHandle, u32>>,
    pub fail_subscribe: Option<CUptiResult>,
    pub fail_enable: Option<CallbackDomain>,
}

impl FakeCupti {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_subscribe(code: CUptiResult) -> Arc<Self> {
        Arc::new(Self {
            fail_subscribe: Some(code),
            ..Self::default()
        })
    }

    pub fn failing_enable(domain: CallbackDomain) -> Arc<Self> {
        Arc::new(Self {
            fail_enable: Some(domain),
            ..Self::default()
        })
    }

    /// Make `context` resolvable to `(device_id, context_id)`
    pub fn add_context(&self, context: ContextHandle, device_id: u32, context_id: u32) {
        self.contexts.lock().unwrap().insert(context, (device_id, context_id));
    }

    pub fn add_stream(&self, stream: StreamHandle, stream_id: u32) {
        self.streams.lock().unwrap().insert(stream, stream_id);
    }

    pub fn enabled(&self) -> Vec<CallbackDomain> {
        self.state.lock().unwrap().enabled.clone()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&FakeState) -> R) -> R {
        f(&self.state.lock().unwrap())
    }

    /// Invoke the subscriber if `domain` is enabled
    pub fn fire(&self, domain: CUpti_CallbackDomain, cbid: CUpti_CallbackId, payload: *const c_void) {
        let target = {
            let state = self.state.lock().unwrap();
            match state.callback {
                Some(callback) if state.enabled.iter().any(|d| d.raw() == domain) => {
                    Some((callback, state.userdata))
                }
                _ => None,
            }
        };

        if let Some((callback, userdata)) = target {
            unsafe { callback(userdata as *mut c_void, domain, cbid, payload) };
        }
    }

    pub fn resource(&self, cbid: CUpti_CallbackId, context: ContextHandle, stream: Option<StreamHandle>) {
        let data = CUpti_ResourceData {
            context: context.as_raw(),
            resourceHandle: stream.map_or(std::ptr::null_mut(), StreamHandle::as_raw),
            resourceDescriptor: std::ptr::null_mut(),
        };
        self.fire(
            bindings::CUPTI_CB_DOMAIN_RESOURCE,
            cbid,
            &data as *const CUpti_ResourceData as *const c_void,
        );
    }

    pub fn sync(&self, cbid: CUpti_CallbackId, context: ContextHandle, stream: Option<StreamHandle>) {
        let data = CUpti_SynchronizeData {
            context: context.as_raw(),
            stream: stream.map_or(std::ptr::null_mut(), StreamHandle::as_raw),
        };
        self.fire(
            bindings::CUPTI_CB_DOMAIN_SYNCHRONIZE,
            cbid,
            &data as *const CUpti_SynchronizeData as *const c_void,
        );
    }

    pub fn api(&self, domain: CallbackDomain, enter: bool, function: &str, symbol: Option<&str>) {
        let function = CString::new(function).unwrap();
        let symbol = symbol.map(|s| CString::new(s).unwrap());
        let data = CUpti_CallbackData {
            callbackSite: if enter {
                bindings::CUPTI_API_ENTER
            } else {
                bindings::CUPTI_API_EXIT
            },
            functionName: function.as_ptr(),
            functionParams: std::ptr::null(),
            functionReturnValue: std::ptr::null_mut(),
            symbolName: symbol.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
            context: std::ptr::null_mut(),
            contextUid: 0,
            correlationData: std::ptr::null_mut(),
            correlationId: 0,
        };
        self.fire(domain.raw(), 0, &data as *const CUpti_CallbackData as *const c_void);
    }

    pub fn nvtx_push(&self, message: &str) {
        let message = CString::new(message).unwrap();
        let params = nvtxRangePushA_params {
            message: message.as_ptr(),
        };
        let data = CUpti_NvtxData {
            functionName: std::ptr::null(),
            functionParams: &params as *const nvtxRangePushA_params as *const c_void,
            functionReturnValue: std::ptr::null(),
        };
        self.fire(
            bindings::CUPTI_CB_DOMAIN_NVTX,
            bindings::CUPTI_CBID_NVTX_nvtxRangePushA,
            &data as *const CUpti_NvtxData as *const c_void,
        );
    }

    pub fn nvtx_pop(&self) {
        let data = CUpti_NvtxData {
            functionName: std::ptr::null(),
            functionParams: std::ptr::null(),
            functionReturnValue: std::ptr::null(),
        };
        self.fire(
            bindings::CUPTI_CB_DOMAIN_NVTX,
            bindings::CUPTI_CBID_NVTX_nvtxRangePop,
            &data as *const CUpti_NvtxData as *const c_void,
        );
    }
}

impl CuptiApi for FakeCupti {
    fn subscribe(&self, callback: CUpti_CallbackFunc, userdata: *mut c_void) -> Result<SubscriberHandle, CuptiError> {
        if let Some(code) = self.fail_subscribe {
            return Err(CuptiError::new("cuptiSubscribe", code));
        }
        let mut state = self.state.lock().unwrap();
        state.callback = Some(callback);
        state.userdata = userdata as usize;
        state.subscribed += 1;
        Ok(SubscriberHandle::from_raw(0x5b5_usize as *mut c_void))
    }

    fn unsubscribe(&self, _subscriber: SubscriberHandle) -> Result<(), CuptiError> {
        let mut state = self.state.lock().unwrap();
        state.callback = None;
        state.enabled.clear();
        state.unsubscribed += 1;
        Ok(())
    }

    fn enable_domain(&self, _subscriber: SubscriberHandle, domain: CallbackDomain) -> Result<(), CuptiError> {
        if self.fail_enable == Some(domain) {
            return Err(CuptiError::new("cuptiEnableDomain", bindings::CUPTI_ERROR_NOT_SUPPORTED));
        }
        self.state.lock().unwrap().enabled.push(domain);
        Ok(())
    }

    fn device_id(&self, context: ContextHandle) -> Result<u32, CuptiError> {
        self.contexts
            .lock()
            .unwrap()
            .get(&context)
            .map(|ids| ids.0)
            .ok_or(CuptiError::new("cuptiGetDeviceId", bindings::CUPTI_ERROR_INVALID_CONTEXT))
    }

    fn context_id(&self, context: ContextHandle) -> Result<u32, CuptiError> {
        self.contexts
            .lock()
            .unwrap()
            .get(&context)
            .map(|ids| ids.1)
            .ok_or(CuptiError::new("cuptiGetContextId", bindings::CUPTI_ERROR_INVALID_CONTEXT))
    }

    fn stream_id(&self, _context: ContextHandle, stream: StreamHandle) -> Result<u32, CuptiError> {
        self.streams
            .lock()
            .unwrap()
            .get(&stream)
            .copied()
            .ok_or(CuptiError::new("cuptiGetStreamId", bindings::CUPTI_ERROR_INVALID_PARAMETER))
    }

    fn finalize(&self) -> Result<(), CuptiError> {
        self.state.lock().unwrap().finalized += 1;
        Ok(())
    }
}

/// [`EventReader`] that journals start/stop into the host
pub struct FakeReader {
    host: Arc<RecordingHost>,
    current: Mutex<Option<ContextHandle>>,
    pub value: u64,
}

impl FakeReader {
    pub fn new(host: Arc<RecordingHost>, value: u64) -> Arc<Self> {
        Arc::new(Self {
            host,
            current: Mutex::new(None),
            value,
        })
    }

    pub fn make_current(&self, context: Option<ContextHandle>) {
        *self.current.lock().unwrap() = context;
    }
}

impl EventReader for FakeReader {
    fn current_context(&self) -> Option<ContextHandle> {
        *self.current.lock().unwrap()
    }

    fn start(&self, context: ContextHandle, _event: CUpti_EventID) -> Result<(), CuptiError> {
        self.host.record(HostCall::SamplingStarted(context));
        Ok(())
    }

    fn read(&self, _context: ContextHandle, _event: CUpti_EventID) -> Result<u64, CuptiError> {
        Ok(self.value)
    }

    fn stop(&self, context: ContextHandle) -> Result<(), CuptiError> {
        self.host.record(HostCall::SamplingStopped(context));
        Ok(())
    }
}

/// A registered service wired to the doubles
pub struct Harness {
    pub host: Arc<RecordingHost>,
    pub cupti: Arc<FakeCupti>,
    pub reader: Arc<FakeReader>,
    pub events: RecordingEvents,
    pub service: Arc<CuptiService>,
}

impl Harness {
    /// Register with `overrides` and run the post-init hook
    pub fn start(overrides: &[(&str, &str)]) -> Result<Self, ServiceError> {
        Self::start_with(FakeCupti::new(), overrides)
    }

    pub fn start_with(cupti: Arc<FakeCupti>, overrides: &[(&str, &str)]) -> Result<Self, ServiceError> {
        let h = Self::register(cupti, overrides)?;
        h.events.post_init(h.host.as_ref());
        Ok(h)
    }

    /// Register only; the host has not reached post-init yet
    pub fn register(cupti: Arc<FakeCupti>, overrides: &[(&str, &str)]) -> Result<Self, ServiceError> {
        init_tracing();

        let host = RecordingHost::new();
        let reader = FakeReader::new(Arc::clone(&host), 1234);
        let config = CuptiConfig::load(overrides.iter().copied())?;

        let mut events = RecordingEvents::default();
        let service = CuptiService::builder(config, host.clone(), cupti.clone())
            .event_reader(reader.clone())
            .register(&mut events)?;

        Ok(Self {
            host,
            cupti,
            reader,
            events,
            service,
        })
    }

    pub fn finish(&self) {
        self.events.finish(self.host.as_ref());
    }
}
