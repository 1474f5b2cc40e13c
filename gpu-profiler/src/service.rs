//! CUPTI service lifecycle
//!
//! Registration subscribes the callback router, enables the configured
//! domains and connects the host hooks. Finish reports counters, stops event
//! sampling and releases the subscription.

use crate::config::CuptiConfig;
use crate::counters::CounterSnapshot;
use crate::cupti::api::{CuptiApi, SubscriberHandle};
use crate::domain::DomainSelection;
use crate::error::{CuptiError, ServiceError};
use crate::router::{cupti_callback, CallbackRouter};
use crate::sampling::{EventReader, EventSampling, EventSamplingController};
use aperture_shared::{Entry, HostEvents, SnapshotScope, SnapshotSink, TracingHost};
use std::ffi::c_void;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn, Level};

/// A registered CUPTI callback service
pub struct CuptiService {
    router: Arc<CallbackRouter>,
    api: Arc<dyn CuptiApi>,
    config: CuptiConfig,
    domains: DomainSelection,
    subscriber: Mutex<Option<SubscriberHandle>>,
}

/// Assembles a [`CuptiService`] from its collaborators
pub struct CuptiServiceBuilder {
    config: CuptiConfig,
    host: Arc<dyn TracingHost>,
    api: Arc<dyn CuptiApi>,
    sampling: Option<Arc<dyn EventSampling>>,
    reader: Option<Arc<dyn EventReader>>,
}

impl CuptiServiceBuilder {
    /// Counter reader used when `sample_event_id` is set
    pub fn event_reader(mut self, reader: Arc<dyn EventReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Use `sampling` instead of building an [`EventSamplingController`]
    pub fn sampling(mut self, sampling: Arc<dyn EventSampling>) -> Self {
        self.sampling = Some(sampling);
        self
    }

    fn build_sampling(&mut self) -> Arc<dyn EventSampling> {
        if let Some(sampling) = self.sampling.take() {
            return sampling;
        }
        if !self.config.sampling_requested() {
            return Arc::new(EventSamplingController::disabled());
        }

        let Ok(event) = u32::try_from(self.config.sample_event_id) else {
            warn!(
                "cupti: sample_event_id {} is not a valid CUPTI event id, event sampling disabled",
                self.config.sample_event_id
            );
            return Arc::new(EventSamplingController::disabled());
        };
        match self.reader.take() {
            Some(reader) => Arc::new(EventSamplingController::new(event, reader)),
            None => {
                warn!("cupti: no event reader available, event sampling disabled");
                Arc::new(EventSamplingController::disabled())
            }
        }
    }

    /// Subscribe to CUPTI, enable the configured domains and connect the
    /// service to the host's lifecycle events.
    ///
    /// On error nothing stays subscribed and no hook is connected.
    pub fn register(mut self, events: &mut dyn HostEvents) -> Result<Arc<CuptiService>, ServiceError> {
        let sampling = self.build_sampling();
        let domains = DomainSelection::resolve(self.config.domain_tokens(), sampling.is_enabled());

        let router = Arc::new(CallbackRouter::new(
            self.host,
            Arc::clone(&self.api),
            sampling,
            self.config.record_symbol,
        ));

        let subscriber = subscribe(self.api.as_ref(), &router, &domains)?;

        let service = Arc::new(CuptiService {
            router,
            api: self.api,
            config: self.config,
            domains,
            subscriber: Mutex::new(Some(subscriber)),
        });
        CuptiService::connect(&service, events);

        info!("Registered cupti service");
        Ok(service)
    }
}

fn subscribe(
    api: &dyn CuptiApi,
    router: &Arc<CallbackRouter>,
    domains: &DomainSelection,
) -> Result<SubscriberHandle, ServiceError> {
    // The router outlives the subscription: the service owns it and only
    // drops it after unsubscribing.
    let userdata = Arc::as_ptr(router) as *mut c_void;

    let subscriber = api.subscribe(cupti_callback, userdata).map_err(|source| {
        let message = api.result_string(source.code);
        error!("cupti: cuptiSubscribe: error: {}", message);
        ServiceError::Subscribe { message, source }
    })?;

    for &domain in domains.domains() {
        if let Err(source) = api.enable_domain(subscriber, domain) {
            let message = api.result_string(source.code);
            error!("cupti: cuptiEnableDomain: error: {}", message);
            release(api, subscriber);
            return Err(ServiceError::EnableDomain {
                domain,
                message,
                source,
            });
        }
        debug!("cupti: enabled \"{}\" callback domain.", domain);
    }

    Ok(subscriber)
}

fn release(api: &dyn CuptiApi, subscriber: SubscriberHandle) {
    if let Err(e) = api.unsubscribe(subscriber) {
        warn!("{}", e);
    }
}

fn log_failure(result: Result<(), CuptiError>) {
    if let Err(e) = result {
        warn!("{}", e);
    }
}

impl CuptiService {
    pub fn builder(
        config: CuptiConfig,
        host: Arc<dyn TracingHost>,
        api: Arc<dyn CuptiApi>,
    ) -> CuptiServiceBuilder {
        CuptiServiceBuilder {
            config,
            host,
            api,
            sampling: None,
            reader: None,
        }
    }

    /// Register against the linked CUPTI library with configuration from the
    /// environment
    #[cfg(feature = "cuda")]
    pub fn register_default(
        host: Arc<dyn TracingHost>,
        events: &mut dyn HostEvents,
    ) -> Result<Arc<CuptiService>, ServiceError> {
        use crate::cupti::api::SysCupti;
        use crate::cupti::events::SysEventReader;

        let config = CuptiConfig::from_env()?;
        Self::builder(config, host, Arc::new(SysCupti))
            .event_reader(Arc::new(SysEventReader::new()))
            .register(events)
    }

    fn connect(this: &Arc<Self>, events: &mut dyn HostEvents) {
        let service = Arc::clone(this);
        events.on_post_init(Box::new(move |host: &dyn TracingHost| service.post_init(host)));

        if this.router.sampling().is_enabled() {
            let service = Arc::clone(this);
            events.on_snapshot(Box::new(
                move |host: &dyn TracingHost,
                      _scope: SnapshotScope,
                      trigger_info: &[Entry<'_>],
                      snapshot: &mut dyn SnapshotSink| {
                    service
                        .router
                        .sampling()
                        .snapshot(host, trigger_info, snapshot)
                },
            ));
        }

        let service = Arc::clone(this);
        events.on_finish(Box::new(move |_host: &dyn TracingHost| service.finish()));
    }

    /// Create attribute keys. Runs after the host's core services are up.
    pub fn post_init(&self, host: &dyn TracingHost) {
        self.router.create_attributes(host);
        self.router.sampling().post_init(host);
    }

    /// Report, stop sampling and release CUPTI. Only the first call has an
    /// effect.
    pub fn finish(&self) {
        let subscriber = match self.subscriber.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(subscriber) = subscriber else {
            return;
        };

        if tracing::enabled!(Level::DEBUG) {
            debug!("cupti: processed {}.", self.counters());

            let sampling = self.router.sampling();
            if sampling.is_enabled() {
                let mut stats = String::new();
                if sampling.print_statistics(&mut stats).is_ok() {
                    debug!("{}", stats);
                }
            }
        }

        self.router.sampling().stop_all();

        release(self.api.as_ref(), subscriber);
        log_failure(self.api.finalize());
    }

    pub fn is_active(&self) -> bool {
        match self.subscriber.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.router.counters().snapshot()
    }

    pub fn config(&self) -> &CuptiConfig {
        &self.config
    }

    /// Domains enabled at registration
    pub fn domains(&self) -> &DomainSelection {
        &self.domains
    }

    pub fn router(&self) -> &CallbackRouter {
        &self.router
    }
}

impl Drop for CuptiService {
    fn drop(&mut self) {
        self.finish();
    }
}
