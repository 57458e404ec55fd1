//! When steps for task lifecycle BDD scenarios.

use super::world::{LifecycleWorld, run_async};
use rstest_bdd_macros::when;
use trellis::object::{
    domain::ObjectId,
    services::{ClaimTaskRequest, CompleteTaskRequest, PruneClosedRequest, ReplaceBodyRequest},
};

#[when(r#"task "{id}" is claimed"#)]
fn claim_task(world: &mut LifecycleWorld, id: String) -> Result<(), eyre::Report> {
    let request = ClaimTaskRequest::for_task(ObjectId::new(id)?);
    let result = run_async(world.lifecycle.claim_task(request));
    world.record(result);
    Ok(())
}

#[when("the next available task is claimed")]
fn claim_next_task(world: &mut LifecycleWorld) {
    let result = run_async(world.lifecycle.claim_task(ClaimTaskRequest::next_available()));
    world.record(result);
}

#[when(r#"task "{id}" is completed"#)]
fn complete_task(world: &mut LifecycleWorld, id: String) -> Result<(), eyre::Report> {
    let request = CompleteTaskRequest::new(ObjectId::new(id)?);
    let result = run_async(world.lifecycle.complete_task(request));
    world.record(result);
    Ok(())
}

#[when("closed objects are pruned")]
fn prune_closed(world: &mut LifecycleWorld) {
    let result = run_async(world.lifecycle.prune_closed(PruneClosedRequest::new()));
    world.last_prune = world.record(result);
}

#[when(r#""{pattern}" is replaced with "{replacement}" in task "{id}""#)]
fn replace_once(
    world: &mut LifecycleWorld,
    pattern: String,
    replacement: String,
    id: String,
) -> Result<(), eyre::Report> {
    let request = ReplaceBodyRequest::new(ObjectId::new(id)?, pattern, replacement);
    let result = run_async(world.content.replace_body(request));
    world.record(result);
    Ok(())
}

#[when(r#"every "{pattern}" is replaced with "{replacement}" in task "{id}""#)]
fn replace_everywhere(
    world: &mut LifecycleWorld,
    pattern: String,
    replacement: String,
    id: String,
) -> Result<(), eyre::Report> {
    let request = ReplaceBodyRequest::new(ObjectId::new(id)?, pattern, replacement)
        .allow_multiple_occurrences(true);
    let result = run_async(world.content.replace_body(request));
    world.record(result);
    Ok(())
}
