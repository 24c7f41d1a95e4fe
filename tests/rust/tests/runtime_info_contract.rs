//! Publish contract of the runtime info hook, driven through the dispatcher
//!
//! Each test wires a fresh message hub and a hand-built run context, fires
//! lifecycle events in order, and checks the keys downstream readers see.

use anyhow::Result;
use lifecycle::{
    keys, DatasetInfo, Error, Hook, HookDispatcher, Iteration, LifecycleEvent, OptimizerState,
    Priority, RunContext, RuntimeInfoHook, ScalarMap,
};
use message_hub::{MessageHub, MessageHubHandle};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

struct ScenarioContext {
    epoch: u64,
    iter: u64,
    lr: Value,
    meta: Option<Value>,
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self {
            epoch: 0,
            iter: 0,
            lr: json!({"lr": [0.1]}),
            meta: None,
        }
    }
}

struct Optimizer(Value);

impl OptimizerState for Optimizer {
    fn get_lr(&self) -> Value {
        self.0.clone()
    }
}

struct Dataset(Option<Value>);

impl DatasetInfo for Dataset {
    fn metainfo(&self) -> Option<Value> {
        self.0.clone()
    }
}

/// Owns its collaborators so `optimizer()` and `train_dataset()` can lend them out
struct Scenario {
    ctx: ScenarioContext,
    optimizer: Optimizer,
    dataset: Dataset,
}

impl Scenario {
    fn new(ctx: ScenarioContext) -> Self {
        Self {
            optimizer: Optimizer(ctx.lr.clone()),
            dataset: Dataset(ctx.meta.clone()),
            ctx,
        }
    }
}

impl RunContext for Scenario {
    fn epoch(&self) -> u64 {
        self.ctx.epoch
    }

    fn iter(&self) -> u64 {
        self.ctx.iter
    }

    fn max_epochs(&self) -> Option<u64> {
        Some(12)
    }

    fn max_iters(&self) -> Option<u64> {
        Some(1200)
    }

    fn seed(&self) -> u64 {
        42
    }

    fn experiment_name(&self) -> &str {
        "exp1"
    }

    fn config_text(&self) -> &str {
        "model=resnet"
    }

    fn version(&self) -> String {
        "1.2.3+abc1234".to_string()
    }

    fn optimizer(&self) -> &dyn OptimizerState {
        &self.optimizer
    }

    fn train_dataset(&self) -> Option<&dyn DatasetInfo> {
        Some(&self.dataset)
    }
}

fn setup() -> (MessageHubHandle, HookDispatcher) {
    let hub = Arc::new(MessageHub::new("contract"));
    let mut dispatcher = HookDispatcher::new();
    dispatcher.register(Arc::new(RuntimeInfoHook::new(Arc::clone(&hub))));
    (hub, dispatcher)
}

fn start_training(dispatcher: &mut HookDispatcher, scenario: &Scenario) -> Result<()> {
    dispatcher.dispatch(scenario, LifecycleEvent::BeforeRun)?;
    dispatcher.dispatch(scenario, LifecycleEvent::BeforeTrain)?;
    dispatcher.dispatch(scenario, LifecycleEvent::BeforeTrainEpoch)?;
    Ok(())
}

#[test]
fn test_before_run_publishes_run_metadata() -> Result<()> {
    let (hub, mut dispatcher) = setup();
    let scenario = Scenario::new(ScenarioContext::default());

    dispatcher.dispatch(&scenario, LifecycleEvent::BeforeRun)?;

    assert_eq!(hub.get_info(keys::SEED)?, json!(42));
    assert_eq!(hub.get_info(keys::EXPERIMENT_NAME)?, json!("exp1"));
    assert_eq!(hub.get_info(keys::CFG)?, json!("model=resnet"));
    assert_eq!(hub.get_info(keys::VERSION)?, json!("1.2.3+abc1234"));
    assert!(hub.get_info(keys::EPOCH).unwrap_err().is_not_found());
    Ok(())
}

#[test]
fn test_before_train_publishes_resumed_state_and_dataset_meta() -> Result<()> {
    let (hub, mut dispatcher) = setup();
    let scenario = Scenario::new(ScenarioContext {
        epoch: 4,
        iter: 400,
        meta: Some(json!({"classes": ["a", "b", "c"]})),
        ..ScenarioContext::default()
    });

    dispatcher.dispatch(&scenario, LifecycleEvent::BeforeRun)?;
    dispatcher.dispatch(&scenario, LifecycleEvent::BeforeTrain)?;

    assert_eq!(hub.get_info_as::<u64>(keys::EPOCH)?, 4);
    assert_eq!(hub.get_info_as::<u64>(keys::ITER)?, 400);
    assert_eq!(hub.get_info_as::<u64>(keys::MAX_EPOCHS)?, 12);
    assert_eq!(hub.get_info_as::<u64>(keys::MAX_ITERS)?, 1200);
    assert_eq!(
        hub.get_info(keys::DATASET_META)?,
        json!({"classes": ["a", "b", "c"]})
    );
    Ok(())
}

#[test]
fn test_learning_rate_per_group_uses_first_value() -> Result<()> {
    let (hub, mut dispatcher) = setup();
    let scenario = Scenario::new(ScenarioContext {
        lr: json!({"backbone": [0.01, 0.01], "head": [0.1]}),
        ..ScenarioContext::default()
    });
    start_training(&mut dispatcher, &scenario)?;

    dispatcher.dispatch(
        &scenario,
        LifecycleEvent::BeforeTrainIter {
            batch_idx: 0,
            data_batch: None,
        },
    )?;

    assert_eq!(hub.get_scalar("train/backbone")?.values(), vec![0.01]);
    assert_eq!(hub.get_scalar("train/head")?.values(), vec![0.1]);
    assert_eq!(hub.get_scalar("train/head")?.entries()[0].step, None);
    Ok(())
}

#[test]
fn test_non_mapping_learning_rate_aborts_dispatch() -> Result<()> {
    let (hub, mut dispatcher) = setup();
    let scenario = Scenario::new(ScenarioContext {
        lr: json!([0.01, 0.1]),
        ..ScenarioContext::default()
    });
    start_training(&mut dispatcher, &scenario)?;

    let err = dispatcher
        .dispatch(
            &scenario,
            LifecycleEvent::BeforeTrainIter {
                batch_idx: 0,
                data_batch: None,
            },
        )
        .unwrap_err();

    assert!(matches!(err, Error::ContractViolation { .. }));
    assert!(err.is_fatal());
    assert!(hub.scalar_keys().is_empty());
    Ok(())
}

#[test]
fn test_optional_payloads_are_skipped() -> Result<()> {
    let (hub, mut dispatcher) = setup();
    let scenario = Scenario::new(ScenarioContext::default());
    start_training(&mut dispatcher, &scenario)?;

    dispatcher.dispatch(
        &scenario,
        LifecycleEvent::BeforeTrainIter {
            batch_idx: 0,
            data_batch: None,
        },
    )?;
    dispatcher.dispatch(
        &scenario,
        LifecycleEvent::AfterTrainIter {
            batch_idx: 0,
            data_batch: None,
            outputs: None,
        },
    )?;
    let before = hub.snapshot();
    dispatcher.dispatch(&scenario, LifecycleEvent::AfterValEpoch { metrics: None })?;
    dispatcher.dispatch(&scenario, LifecycleEvent::AfterTestEpoch { metrics: None })?;

    assert_eq!(hub.snapshot(), before);
    assert_eq!(hub.scalar_keys(), vec!["train/lr"]);
    Ok(())
}

#[test]
fn test_metrics_land_under_mode_prefixes() -> Result<()> {
    let (hub, mut dispatcher) = setup();
    let scenario = Scenario::new(ScenarioContext::default());
    dispatcher.dispatch(&scenario, LifecycleEvent::BeforeRun)?;

    let metrics = ScalarMap::from([("accuracy".to_string(), 0.9)]);
    dispatcher.dispatch(
        &scenario,
        LifecycleEvent::AfterValEpoch {
            metrics: Some(&metrics),
        },
    )?;
    dispatcher.dispatch(
        &scenario,
        LifecycleEvent::AfterTestEpoch {
            metrics: Some(&metrics),
        },
    )?;

    assert_eq!(hub.get_scalar("val/accuracy")?.values(), vec![0.9]);
    assert_eq!(hub.get_scalar("test/accuracy")?.values(), vec![0.9]);
    Ok(())
}

/// Reads `iter` and `train/lr` from the hub in the phase that publishes them
struct DependentHook {
    hub: MessageHubHandle,
    seen: Mutex<Vec<(u64, Option<f64>)>>,
}

impl Hook for DependentHook {
    fn name(&self) -> &str {
        "DependentHook"
    }

    fn before_train_iter(
        &self,
        _ctx: &dyn RunContext,
        _batch_idx: Iteration,
        _data_batch: Option<&Value>,
    ) -> lifecycle::Result<()> {
        let iter: u64 = self.hub.get_info_as(keys::ITER)?;
        let lr = self.hub.with_scalar("train/lr", |h| h.current())?;
        self.seen.lock().push((iter, lr));
        Ok(())
    }
}

#[test]
fn test_dependent_hooks_see_current_iteration() -> Result<()> {
    let hub = Arc::new(MessageHub::new("contract"));
    let dependent = Arc::new(DependentHook {
        hub: Arc::clone(&hub),
        seen: Mutex::new(Vec::new()),
    });

    // Registered first, but runs second because of its lower priority
    let mut dispatcher = HookDispatcher::new();
    dispatcher.register(dependent.clone());
    dispatcher.register(Arc::new(RuntimeInfoHook::new(Arc::clone(&hub))));
    assert_eq!(dependent.priority(), Priority::NORMAL);
    assert_eq!(
        dispatcher.hook_names(),
        vec!["RuntimeInfoHook", "DependentHook"]
    );

    let mut scenario = Scenario::new(ScenarioContext::default());
    start_training(&mut dispatcher, &scenario)?;
    for iter in 0..3 {
        scenario.ctx.iter = iter;
        dispatcher.dispatch(
            &scenario,
            LifecycleEvent::BeforeTrainIter {
                batch_idx: iter,
                data_batch: None,
            },
        )?;
        dispatcher.dispatch(
            &scenario,
            LifecycleEvent::AfterTrainIter {
                batch_idx: iter,
                data_batch: None,
                outputs: None,
            },
        )?;
    }

    assert_eq!(
        *dependent.seen.lock(),
        vec![(0, Some(0.1)), (1, Some(0.1)), (2, Some(0.1))]
    );
    Ok(())
}

#[test]
fn test_info_write_to_scalar_key_is_rejected() -> Result<()> {
    let (hub, mut dispatcher) = setup();
    hub.update_scalar(keys::SEED, 1.0, None)?;

    let scenario = Scenario::new(ScenarioContext::default());
    let err = dispatcher
        .dispatch(&scenario, LifecycleEvent::BeforeRun)
        .unwrap_err();

    assert!(matches!(err, Error::KeyKindMismatch { .. }));
    // The batch is all or nothing
    assert!(!hub.contains(keys::CFG));
    Ok(())
}
