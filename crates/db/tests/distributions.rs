//! Integration tests for the transactional allocation store.

use assert_matches::assert_matches;
use mediaplan_core::allocation::BudgetAllocation;
use mediaplan_core::audit::audit_distributions;
use mediaplan_core::draft::PartialFailureReason;
use mediaplan_core::flatten::{flatten_allocations, AllocationMap};
use mediaplan_core::generator::{GenerateError, GenerateRequest};
use mediaplan_core::hierarchy::{BranchPath, HierarchyLevel, HierarchyOrder};
use mediaplan_core::store::AllocationStore;
use mediaplan_core::tree::build_hierarchy_tree;
use mediaplan_db::models::budget_distribution::into_nodes;
use mediaplan_db::models::media_line::CreateMediaLine;
use mediaplan_db::models::media_plan::{CreateMediaPlan, MediaPlan};
use mediaplan_db::repositories::{BudgetDistributionRepo, MediaLineRepo, MediaPlanRepo};
use mediaplan_db::store::{generate_plan_distributions, replace_plan_distributions, PgAllocationStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::PgPool;

use HierarchyLevel::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn order() -> HierarchyOrder {
    HierarchyOrder::new(vec![Subdivision, Moment]).unwrap()
}

async fn create_plan(pool: &PgPool) -> MediaPlan {
    MediaPlanRepo::create(
        pool,
        &CreateMediaPlan {
            name: "Plano".to_string(),
            total_budget: dec!(3000),
            hierarchy_order: order(),
            start_date: None,
            end_date: None,
        },
    )
    .await
    .unwrap()
}

fn two_by_two() -> AllocationMap {
    let mut map = AllocationMap::new();
    map.insert(
        BranchPath::root(),
        vec![
            BudgetAllocation::new(Some(1), dec!(50)),
            BudgetAllocation::new(Some(2), dec!(50)),
        ],
    );
    for sub in [1, 2] {
        map.insert(
            BranchPath::root().child(Subdivision, Some(sub)),
            vec![
                BudgetAllocation::new(Some(10), dec!(50)),
                BudgetAllocation::new(Some(20), dec!(50)),
            ],
        );
    }
    map
}

fn line(budget: Decimal, sub: Option<i64>, moment: Option<i64>) -> CreateMediaLine {
    CreateMediaLine {
        name: "linha".to_string(),
        budget,
        subdivision_id: sub,
        moment_id: moment,
        funnel_stage_id: None,
    }
}

// ---------------------------------------------------------------------------
// Replacement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_replace_writes_linked_tree(pool: PgPool) {
    let plan = create_plan(&pool).await;
    let draft = flatten_allocations(&order(), plan.total_budget, &two_by_two()).unwrap();

    let outcome = replace_plan_distributions(&pool, plan.id, &draft).await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.inserted, 6);

    let rows = BudgetDistributionRepo::list_by_plan(&pool, plan.id).await.unwrap();
    let nodes = into_nodes(rows).unwrap();
    assert!(audit_distributions(&nodes, &order(), plan.total_budget).is_empty());

    let tree = build_hierarchy_tree(&nodes, &[], &order(), plan.total_budget, |_, id| {
        id.to_string()
    });
    assert_eq!(tree.roots.len(), 2);
    assert!(tree.roots.iter().all(|r| r.children.len() == 2));
    assert!(tree.warnings.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_replace_discards_previous_rows(pool: PgPool) {
    let plan = create_plan(&pool).await;
    let draft = flatten_allocations(&order(), plan.total_budget, &two_by_two()).unwrap();
    replace_plan_distributions(&pool, plan.id, &draft).await.unwrap();

    let simple = flatten_allocations(&order(), plan.total_budget, &AllocationMap::new()).unwrap();
    replace_plan_distributions(&pool, plan.id, &simple).await.unwrap();

    assert_eq!(BudgetDistributionRepo::count_by_plan(&pool, plan.id).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_rejected_rows_do_not_abort_transaction(pool: PgPool) {
    // No plan 424242, so every root insert violates the plan foreign key.
    let draft = flatten_allocations(&order(), dec!(100), &two_by_two()).unwrap();
    let outcome = replace_plan_distributions(&pool, 424242, &draft).await.unwrap();

    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.failures.len(), 6);
    let storage = outcome
        .failures
        .iter()
        .filter(|f| matches!(f.reason, PartialFailureReason::Storage(_)))
        .count();
    assert_eq!(storage, 2);
    assert!(outcome
        .failures
        .iter()
        .filter(|f| f.level == Moment)
        .all(|f| f.reason == PartialFailureReason::MissingParent));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_uncommitted_store_is_rolled_back(pool: PgPool) {
    let plan = create_plan(&pool).await;
    let draft = flatten_allocations(&order(), plan.total_budget, &two_by_two()).unwrap();
    replace_plan_distributions(&pool, plan.id, &draft).await.unwrap();

    let store = PgAllocationStore::begin(&pool).await.unwrap();
    assert_eq!(store.delete_all(plan.id).await.unwrap(), 6);
    store.rollback().await.unwrap();

    assert_eq!(BudgetDistributionRepo::count_by_plan(&pool, plan.id).await.unwrap(), 6);
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_generate_from_lines(pool: PgPool) {
    let plan = create_plan(&pool).await;
    for (budget, sub, moment) in [
        (dec!(1000), Some(1), Some(10)),
        (dec!(500), Some(1), Some(20)),
        (dec!(1500), Some(2), Some(10)),
    ] {
        MediaLineRepo::create(&pool, plan.id, &line(budget, sub, moment))
            .await
            .unwrap();
    }
    let lines: Vec<_> = MediaLineRepo::list_by_plan(&pool, plan.id)
        .await
        .unwrap()
        .iter()
        .map(|l| l.to_ref())
        .collect();

    let request = GenerateRequest {
        plan_id: plan.id,
        hierarchy_order: order(),
        lines,
        total_budget: plan.total_budget,
        clear_existing: false,
    };
    let report = generate_plan_distributions(&pool, &request).await.unwrap();
    assert!(report.success);
    assert_eq!(report.count, 5);

    let nodes = into_nodes(BudgetDistributionRepo::list_by_plan(&pool, plan.id).await.unwrap())
        .unwrap();
    assert!(audit_distributions(&nodes, &order(), plan.total_budget).is_empty());

    // A second run without clearing is refused and leaves the rows alone.
    let again = generate_plan_distributions(&pool, &request).await;
    assert_matches!(again, Err(GenerateError::AlreadyGenerated { existing: 5, .. }));
    assert_eq!(BudgetDistributionRepo::count_by_plan(&pool, plan.id).await.unwrap(), 5);

    let cleared = generate_plan_distributions(
        &pool,
        &GenerateRequest {
            clear_existing: true,
            ..request
        },
    )
    .await
    .unwrap();
    assert_eq!(cleared.cleared, 5);
    assert_eq!(cleared.count, 5);
}
