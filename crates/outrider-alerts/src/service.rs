//! Service composition: one running alert pipeline.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use outrider_core::config::Config;
use outrider_dispatch::Dispatcher;
use outrider_store::RealtimeStore;

use crate::accident::AccidentEvaluator;
use crate::drowsiness::DrowsinessEvaluator;
use crate::error::Result;
use crate::escalation::EscalationTracker;
use crate::evaluator::{run_evaluator, AlertContext, Evaluator};
use crate::geofence::GeofenceEvaluator;
use crate::intruder::IntruderEvaluator;
use crate::limiter::RateLimiter;
use crate::settings::SettingsResolver;

/// The running alert pipeline: one spawned task per evaluator, all feeding
/// off their own subscription to the vehicle change stream.
pub struct AlertService {
    tasks: Vec<JoinHandle<()>>,
}

impl AlertService {
    /// Wire the pipeline and start listening.
    ///
    /// Sweeps the store for accident windows left pending by an earlier run
    /// before any evaluator subscribes, then spawns the evaluator tasks.
    pub async fn start(
        config: &Config,
        store: Arc<dyn RealtimeStore>,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Self> {
        let settings = SettingsResolver::new(store.clone());
        let limiter = Arc::new(RateLimiter::with_system_clock());
        let escalation = Arc::new(EscalationTracker::new(
            store.clone(),
            dispatcher.clone(),
            settings.clone(),
        ));

        let resumed = escalation.resume_pending().await?;
        if resumed > 0 {
            info!(windows = resumed, "resumed pending accident confirmation windows");
        }

        let ctx = Arc::new(AlertContext {
            store,
            dispatcher,
            settings,
            limiter,
            alerts: config.alerts.clone(),
        });
        let evaluators: Vec<Arc<dyn Evaluator>> = vec![
            Arc::new(GeofenceEvaluator),
            Arc::new(DrowsinessEvaluator),
            Arc::new(IntruderEvaluator),
            Arc::new(AccidentEvaluator::new(escalation)),
        ];
        let tasks = evaluators
            .into_iter()
            .map(|evaluator| tokio::spawn(run_evaluator(ctx.clone(), evaluator)))
            .collect();
        info!("alert listeners started");
        Ok(Self { tasks })
    }

    /// Stop all evaluator tasks. In-flight escalation timers are dropped
    /// with the runtime; their pending records survive in the store for the
    /// next start's sweep.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for AlertService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
