//! Service tests for claiming and completing tasks.

use std::sync::Arc;
use std::time::Duration;

use super::fixtures::{draft, id, load, repository, seed, seed_task};
use crate::config::TrellisConfig;
use crate::object::{
    adapters::InMemoryObjectRepository,
    domain::{ObjectDomainError, ObjectId, ObjectKind, ObjectPriority, ObjectStatus, TrellisObject},
    error::{ErrorKind, TrellisError},
    ports::{ObjectFilter, ObjectRepository, ObjectRepositoryError, ObjectRepositoryResult},
    services::{ClaimTaskRequest, CompleteTaskRequest, TaskLifecycleService},
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::rstest;

type TestService = TaskLifecycleService<InMemoryObjectRepository, DefaultClock>;

fn service(repository: &Arc<InMemoryObjectRepository>) -> TestService {
    TaskLifecycleService::new(Arc::clone(repository), Arc::new(DefaultClock))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claim_waits_for_prerequisite_to_finish() {
    let repository = repository();
    seed_task(&repository, "T-schema", None, ObjectStatus::Open).await;
    seed(&repository, draft("T-api").with_prerequisites([id("T-schema")])).await;
    let service = service(&repository);

    let blocked = service
        .claim_task(ClaimTaskRequest::for_task(id("T-api")))
        .await
        .expect_err("prerequisite is still open");
    assert_eq!(blocked.kind(), ErrorKind::UnmetPrerequisite);
    assert!(matches!(
        blocked,
        TrellisError::Domain(ObjectDomainError::UnmetPrerequisite {
            ref prerequisite,
            status: Some(ObjectStatus::Open),
            ..
        }) if prerequisite.as_str() == "T-schema"
    ));
    assert_eq!(
        load(&repository, "T-api").await.map(|task| task.status()),
        Some(ObjectStatus::Open)
    );

    service
        .claim_task(ClaimTaskRequest::for_task(id("T-schema")))
        .await
        .expect("schema task is claimable");
    service
        .complete_task(CompleteTaskRequest::new(id("T-schema")))
        .await
        .expect("schema task completes");

    let claimed = service
        .claim_task(ClaimTaskRequest::for_task(id("T-api")))
        .await
        .expect("prerequisite is done");
    assert_eq!(claimed.status(), ObjectStatus::InProgress);
    assert_eq!(
        claimed.log(),
        ["Task claimed; status set to in-progress".to_owned()]
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_blocking_prerequisite_is_reported() {
    let repository = repository();
    seed_task(&repository, "T-a", None, ObjectStatus::Done).await;
    seed_task(&repository, "T-b", None, ObjectStatus::Closed).await;
    seed_task(&repository, "T-c", None, ObjectStatus::InProgress).await;
    seed(
        &repository,
        draft("T-target").with_prerequisites([id("T-a"), id("T-b"), id("T-missing"), id("T-c")]),
    )
    .await;

    let err = service(&repository)
        .claim_task(ClaimTaskRequest::for_task(id("T-target")))
        .await
        .expect_err("T-missing blocks the claim");

    assert!(matches!(
        err,
        TrellisError::Domain(ObjectDomainError::UnmetPrerequisite {
            ref prerequisite,
            status: None,
            ..
        }) if prerequisite.as_str() == "T-missing"
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn forced_claim_skips_prerequisites_only() {
    let repository = repository();
    seed_task(&repository, "T-blocker", None, ObjectStatus::Open).await;
    seed(&repository, draft("T-urgent").with_prerequisites([id("T-blocker")])).await;
    seed_task(&repository, "T-draft", None, ObjectStatus::Draft).await;
    let service = service(&repository);

    let claimed = service
        .claim_task(ClaimTaskRequest::for_task(id("T-urgent")).forced())
        .await
        .expect("force bypasses prerequisites");
    assert_eq!(claimed.status(), ObjectStatus::InProgress);

    let err = service
        .claim_task(ClaimTaskRequest::for_task(id("T-draft")).forced())
        .await
        .expect_err("draft tasks are never claimable");
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn claiming_unknown_or_non_task_objects_fails() {
    let repository = repository();
    seed(&repository, draft("F-login")).await;
    let service = service(&repository);

    let missing = service
        .claim_task(ClaimTaskRequest::for_task(id("T-ghost")))
        .await
        .expect_err("unknown task");
    let feature = service
        .claim_task(ClaimTaskRequest::for_task(id("F-login")))
        .await
        .expect_err("features cannot be claimed");

    assert_eq!(missing.kind(), ErrorKind::NotFound);
    assert_eq!(feature.kind(), ErrorKind::InvalidTransition);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn next_available_prefers_priority_then_age() {
    let repository = repository();
    seed(&repository, draft("T-low").with_priority(ObjectPriority::Low)).await;
    seed(&repository, draft("T-high-old").with_priority(ObjectPriority::High)).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    seed(&repository, draft("T-high-new").with_priority(ObjectPriority::High)).await;
    seed_task(&repository, "T-blocker", None, ObjectStatus::Open).await;
    seed(
        &repository,
        draft("T-blocked")
            .with_priority(ObjectPriority::High)
            .with_prerequisites([id("T-blocker")]),
    )
    .await;
    let service = service(&repository);

    let mut order = Vec::new();
    for _ in 0..4 {
        let claimed = service
            .claim_task(ClaimTaskRequest::next_available())
            .await
            .expect("a task is available");
        order.push(claimed.id().to_string());
    }

    assert_eq!(
        order,
        ["T-high-old", "T-high-new", "T-blocker", "T-low"]
    );
    let exhausted = service
        .claim_task(ClaimTaskRequest::next_available())
        .await
        .expect_err("only the blocked task remains");
    assert_eq!(exhausted.kind(), ErrorKind::NoAvailableTask);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn next_available_respects_scope() {
    let repository = repository();
    seed(&repository, draft("E-auth").with_parent(id("P-app"))).await;
    seed(&repository, draft("F-login").with_parent(id("E-auth"))).await;
    seed(&repository, draft("F-billing")).await;
    seed(
        &repository,
        draft("T-invoice")
            .with_parent(id("F-billing"))
            .with_priority(ObjectPriority::High),
    )
    .await;
    seed_task(&repository, "T-form", Some("F-login"), ObjectStatus::Open).await;

    let claimed = service(&repository)
        .claim_task(ClaimTaskRequest::next_available().within(id("E-auth")))
        .await
        .expect("scoped task is available");

    assert_eq!(claimed.id(), &id("T-form"));
    assert_eq!(
        load(&repository, "T-invoice").await.map(|task| task.status()),
        Some(ObjectStatus::Open)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_claims_on_one_task_admit_exactly_one() {
    let repository = repository();
    seed_task(&repository, "T-contended", None, ObjectStatus::Open).await;
    let service = Arc::new(service(&repository));

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let shared = Arc::clone(&service);
            tokio::spawn(async move {
                shared
                    .claim_task(ClaimTaskRequest::for_task(id("T-contended")))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    for attempt in attempts {
        match attempt.await.expect("claim task joins") {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::InvalidTransition),
        }
    }
    assert_eq!(successes, 1);
    let task = load(&repository, "T-contended").await.expect("task exists");
    assert_eq!(task.log().len(), 1);
}

#[rstest]
#[case(ObjectStatus::Open)]
#[case(ObjectStatus::Done)]
#[case(ObjectStatus::Closed)]
#[tokio::test(flavor = "multi_thread")]
async fn complete_requires_claimed_task(#[case] status: ObjectStatus) {
    let repository = repository();
    let seeded = seed_task(&repository, "T-idle", None, status).await;

    let err = service(&repository)
        .complete_task(CompleteTaskRequest::new(id("T-idle")))
        .await
        .expect_err("task is not in progress");

    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    assert_eq!(load(&repository, "T-idle").await, Some(seeded));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_records_summary_and_files() {
    let repository = repository();
    seed_task(&repository, "T-form", None, ObjectStatus::InProgress).await;

    let done = service(&repository)
        .complete_task(
            CompleteTaskRequest::new(id("T-form"))
                .with_summary("Built the form")
                .with_files_changed([("src/form.rs".to_owned(), "new component".to_owned())]),
        )
        .await
        .expect("completion succeeds");

    assert_eq!(done.status(), ObjectStatus::Done);
    assert_eq!(done.log().last().map(String::as_str), Some("Built the form"));
    assert_eq!(
        done.affected_files().get("src/form.rs").map(String::as_str),
        Some("new component")
    );
    assert_eq!(load(&repository, "T-form").await, Some(done));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn finishing_last_task_completes_ancestors() {
    let repository = repository();
    seed(&repository, draft("P-app")).await;
    seed(&repository, draft("E-auth").with_parent(id("P-app"))).await;
    seed(&repository, draft("F-login").with_parent(id("E-auth"))).await;
    seed_task(&repository, "T-done", Some("F-login"), ObjectStatus::Done).await;
    seed_task(&repository, "T-last", Some("F-login"), ObjectStatus::InProgress).await;
    seed(&repository, draft("F-signup").with_parent(id("E-auth"))).await;

    service(&repository)
        .complete_task(CompleteTaskRequest::new(id("T-last")))
        .await
        .expect("completion succeeds");

    let feature = load(&repository, "F-login").await.expect("feature exists");
    assert_eq!(feature.status(), ObjectStatus::Done);
    assert_eq!(
        feature.log(),
        ["All child objects completed; status set to done".to_owned()]
    );
    assert_eq!(
        load(&repository, "E-auth").await.map(|epic| epic.status()),
        Some(ObjectStatus::Open),
        "F-signup is still open"
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn parent_completion_can_be_disabled() {
    let repository = repository();
    seed(&repository, draft("F-login")).await;
    seed_task(&repository, "T-last", Some("F-login"), ObjectStatus::InProgress).await;

    service(&repository)
        .with_auto_complete_parents(false)
        .complete_task(CompleteTaskRequest::new(id("T-last")))
        .await
        .expect("completion succeeds");

    assert_eq!(
        load(&repository, "F-login").await.map(|feature| feature.status()),
        Some(ObjectStatus::Open)
    );
}

/// Delegates to memory storage but refuses to save anything except tasks.
struct TaskOnlyRepository {
    inner: Arc<InMemoryObjectRepository>,
}

#[async_trait]
impl ObjectRepository for TaskOnlyRepository {
    async fn get_object_by_id(&self, id: &ObjectId) -> ObjectRepositoryResult<Option<TrellisObject>> {
        self.inner.get_object_by_id(id).await
    }

    async fn get_objects(&self, filter: &ObjectFilter) -> ObjectRepositoryResult<Vec<TrellisObject>> {
        self.inner.get_objects(filter).await
    }

    async fn save_object(&self, object: &TrellisObject) -> ObjectRepositoryResult<()> {
        if object.kind() != ObjectKind::Task {
            return Err(ObjectRepositoryError::persistence(std::io::Error::other(
                "disk full",
            )));
        }
        self.inner.save_object(object).await
    }

    async fn delete_object(&self, id: &ObjectId) -> ObjectRepositoryResult<()> {
        self.inner.delete_object(id).await
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_parent_completion_still_reports_completed_task() {
    let repository = repository();
    seed(&repository, draft("F-solo")).await;
    seed_task(&repository, "T-only", Some("F-solo"), ObjectStatus::Open).await;
    let service = TaskLifecycleService::new(
        Arc::new(TaskOnlyRepository {
            inner: Arc::clone(&repository),
        }),
        Arc::new(DefaultClock),
    );
    service
        .claim_task(ClaimTaskRequest::for_task(id("T-only")))
        .await
        .expect("claim succeeds");

    let done = service
        .complete_task(CompleteTaskRequest::new(id("T-only")))
        .await
        .expect("completion is reported despite the parent save failing");

    assert_eq!(done.status(), ObjectStatus::Done);
    assert_eq!(load(&repository, "T-only").await, Some(done));
    assert_eq!(
        load(&repository, "F-solo").await.map(|feature| feature.status()),
        Some(ObjectStatus::Open)
    );
}

#[rstest]
#[case(true, ObjectStatus::Done)]
#[case(false, ObjectStatus::Open)]
#[tokio::test(flavor = "multi_thread")]
async fn configuration_controls_parent_completion(
    #[case] enabled: bool,
    #[case] expected: ObjectStatus,
) {
    let repository = repository();
    seed(&repository, draft("F-login")).await;
    seed_task(&repository, "T-last", Some("F-login"), ObjectStatus::InProgress).await;
    let config = TrellisConfig::new("/work/app").with_auto_complete_parents(enabled);

    TaskLifecycleService::from_config(Arc::clone(&repository), Arc::new(DefaultClock), &config)
        .complete_task(CompleteTaskRequest::new(id("T-last")))
        .await
        .expect("completion succeeds");

    assert_eq!(
        load(&repository, "F-login").await.map(|feature| feature.status()),
        Some(expected)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn prerequisite_cycle_is_never_claimable() {
    let repository = repository();
    seed(&repository, draft("T-a").with_prerequisites([id("T-b")])).await;
    seed(&repository, draft("T-b").with_prerequisites([id("T-a")])).await;
    let service = service(&repository);

    for task in ["T-a", "T-b"] {
        let err = service
            .claim_task(ClaimTaskRequest::for_task(id(task)))
            .await
            .expect_err("cycle blocks claim");
        assert_eq!(err.kind(), ErrorKind::UnmetPrerequisite);
    }
    let none = service
        .claim_task(ClaimTaskRequest::next_available())
        .await
        .expect_err("nothing is claimable");
    assert_eq!(none.kind(), ErrorKind::NoAvailableTask);
}
