//! # Watch Loop
//!
//! Runs the PagerdutyService and PagerdutyRuleset controllers side by side
//! until a shutdown signal arrives.

use crate::controller::reconciler::{ruleset, service, Reconciler, ReconcilerError};
use crate::controller::server::ServerState;
use crate::crd::{PagerdutyRuleset, PagerdutyService};
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::runtime::initialization::InitializationResult;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use k8s_openapi::NamespaceResourceScope;
use kube::api::Api;
use kube::{Client, Resource};
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run every enabled controller until shutdown
///
/// # Errors
/// Currently infallible once initialization has succeeded.
pub async fn run_watch_loop(init: InitializationResult) -> Result<(), anyhow::Error> {
    let InitializationResult {
        client,
        config,
        reconciler,
        server_state,
    } = init;
    let namespace = config.watch_namespace.as_deref();

    match namespace {
        Some(ns) => info!("Watching namespace {}", ns),
        None => info!("Watching all namespaces"),
    }

    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, waiting for in-flight reconciliations to complete...");
            shutdown_state.is_ready.store(false, Ordering::Relaxed);
        }
    });

    let mut controllers: Vec<BoxFuture<'static, ()>> = vec![run_controller(
        api::<PagerdutyService>(&client, namespace),
        service::reconcile,
        Arc::clone(&reconciler),
    )
    .boxed()];

    if config.disable_ruleset_controller {
        info!("PagerdutyRuleset controller disabled");
    } else {
        controllers.push(
            run_controller(
                api::<PagerdutyRuleset>(&client, namespace),
                ruleset::reconcile,
                Arc::clone(&reconciler),
            )
            .boxed(),
        );
    }

    server_state.is_ready.store(true, Ordering::Relaxed);
    info!("Started {} controller(s)", controllers.len());

    futures::future::join_all(controllers).await;

    server_state.is_ready.store(false, Ordering::Relaxed);
    info!("Operator stopped gracefully");
    Ok(())
}

fn api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// One controller for kind `K`, driven until the stream ends
async fn run_controller<K, F, Fut>(api: Api<K>, reconcile: F, ctx: Arc<Reconciler>)
where
    K: Resource<DynamicType = ()>
        + Clone
        + Debug
        + DeserializeOwned
        + Send
        + Sync
        + 'static,
    F: FnMut(Arc<K>, Arc<Reconciler>) -> Fut,
    Fut: Future<Output = Result<Action, ReconcilerError>> + Send + 'static,
{
    let kind = K::kind(&()).to_string();
    info!("Starting {} controller", kind);

    Controller::new(api, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error::<K>, ctx)
        .for_each(|result| {
            match result {
                Ok((object, action)) => debug!("Reconciled {}: {:?}", object, action),
                Err(e) => log_controller_error(&e),
            }
            futures::future::ready(())
        })
        .await;

    info!("{} controller stopped", kind);
}

fn log_controller_error(error: &controller::Error<ReconcilerError, watcher::Error>) {
    match error {
        // Already logged and counted by the error policy
        controller::Error::ReconcilerFailed(_, object) => {
            debug!("Reconcile of {} failed, requeued with backoff", object);
        }
        controller::Error::ObjectNotFound(object) => {
            debug!("{} no longer exists, skipping", object);
        }
        controller::Error::QueueError(e) => {
            warn!("Watch error, the watcher will retry: {}", e);
        }
        other => warn!("Controller error: {}", other),
    }
}
