//! Then steps for task lifecycle BDD scenarios.

use super::world::LifecycleWorld;
use rstest_bdd_macros::then;
use trellis::object::{
    domain::{ObjectDomainError, ObjectStatus},
    error::TrellisError,
};

#[then(r#"task "{id}" has status "{status}""#)]
fn task_has_status(world: &LifecycleWorld, id: String, status: String) -> Result<(), eyre::Report> {
    let expected = ObjectStatus::try_from(status.as_str())?;
    let task = world
        .find(&id)?
        .ok_or_else(|| eyre::eyre!("task {id} is missing"))?;
    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected {id} to be {expected}, found {}",
            task.status()
        ));
    }
    Ok(())
}

#[then(r#"task "{id}" has body "{body}""#)]
fn task_has_body(world: &LifecycleWorld, id: String, body: String) -> Result<(), eyre::Report> {
    let task = world
        .find(&id)?
        .ok_or_else(|| eyre::eyre!("task {id} is missing"))?;
    if task.body() != body {
        return Err(eyre::eyre!("unexpected body for {id}: {:?}", task.body()));
    }
    Ok(())
}

#[then(r#"the claim fails with an unmet prerequisite naming "{prerequisite}""#)]
fn claim_fails_with_unmet_prerequisite(
    world: &LifecycleWorld,
    prerequisite: String,
) -> Result<(), eyre::Report> {
    let error = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the claim to fail"))?;
    let named = matches!(
        error,
        TrellisError::Domain(ObjectDomainError::UnmetPrerequisite { prerequisite: blocker, .. })
            if blocker.as_str() == prerequisite
    );
    if !named {
        return Err(eyre::eyre!(
            "expected UnmetPrerequisite naming {prerequisite}, got {error:?}"
        ));
    }
    Ok(())
}

#[then(r#"the operation fails with kind "{kind}""#)]
fn operation_fails_with_kind(world: &LifecycleWorld, kind: String) -> Result<(), eyre::Report> {
    let error = world
        .last_error
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected the operation to fail"))?;
    if error.kind().as_str() != kind {
        return Err(eyre::eyre!(
            "expected {kind}, got {} ({error})",
            error.kind()
        ));
    }
    Ok(())
}

#[then(r#"task "{id}" no longer exists"#)]
fn task_is_gone(world: &LifecycleWorld, id: String) -> Result<(), eyre::Report> {
    if world.find(&id)?.is_some() {
        return Err(eyre::eyre!("task {id} should have been pruned"));
    }
    let summary = world
        .last_prune
        .as_ref()
        .ok_or_else(|| eyre::eyre!("prune did not run"))?;
    if !summary.deleted.iter().any(|deleted| deleted.as_str() == id) {
        return Err(eyre::eyre!("task {id} missing from prune summary"));
    }
    Ok(())
}

#[then(r#"task "{id}" still exists"#)]
fn task_still_exists(world: &LifecycleWorld, id: String) -> Result<(), eyre::Report> {
    if world.find(&id)?.is_none() {
        return Err(eyre::eyre!("task {id} should still exist"));
    }
    Ok(())
}
