//! Given steps for task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use trellis::object::{
    domain::{ObjectDraft, ObjectId, ObjectPriority, ObjectStatus, TrellisObject},
    ports::ObjectRepository,
};
use mockable::DefaultClock;

fn store(world: &LifecycleWorld, draft: ObjectDraft) -> Result<(), eyre::Report> {
    let object = TrellisObject::new(draft, &DefaultClock);
    run_async(world.repository.save_object(&object)).wrap_err("seed scenario object")
}

fn task(id: &str) -> Result<ObjectDraft, eyre::Report> {
    Ok(ObjectDraft::new(ObjectId::new(id)?, format!("Task {id}"))?)
}

#[given(r#"an open task "{id}""#)]
fn open_task(world: &mut LifecycleWorld, id: String) -> Result<(), eyre::Report> {
    store(world, task(&id)?)
}

#[given(r#"a finished task "{id}""#)]
fn finished_task(world: &mut LifecycleWorld, id: String) -> Result<(), eyre::Report> {
    store(world, task(&id)?.with_status(ObjectStatus::Done))
}

#[given(r#"a blocked task "{id}" waiting on "{prerequisite}""#)]
fn blocked_task(
    world: &mut LifecycleWorld,
    id: String,
    prerequisite: String,
) -> Result<(), eyre::Report> {
    let blocker = ObjectId::new(prerequisite)?;
    store(world, task(&id)?.with_prerequisites([blocker]))
}

#[given(r#"a "{priority}" priority task "{id}""#)]
fn prioritized_task(
    world: &mut LifecycleWorld,
    priority: String,
    id: String,
) -> Result<(), eyre::Report> {
    let level = ObjectPriority::try_from(priority.as_str())?;
    store(world, task(&id)?.with_priority(level))
}

#[given(r#"a task "{id}" whose body reads "{body}""#)]
fn task_with_body(world: &mut LifecycleWorld, id: String, body: String) -> Result<(), eyre::Report> {
    store(world, task(&id)?.with_body(body))
}
