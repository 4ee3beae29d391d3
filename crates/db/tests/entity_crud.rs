//! Integration tests for plan, line, and dimension repositories.

use mediaplan_core::hierarchy::{HierarchyLevel, HierarchyOrder};
use mediaplan_db::models::dimension::CreateDimension;
use mediaplan_db::models::media_line::{CreateMediaLine, UpdateMediaLine};
use mediaplan_db::models::media_plan::{CreateMediaPlan, UpdateMediaPlan};
use mediaplan_db::names::NameDirectory;
use mediaplan_db::repositories::{DimensionRepo, MediaLineRepo, MediaPlanRepo};
use rust_decimal_macros::dec;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_plan(name: &str) -> CreateMediaPlan {
    CreateMediaPlan {
        name: name.to_string(),
        total_budget: dec!(3000),
        hierarchy_order: HierarchyOrder::new(vec![HierarchyLevel::Subdivision, HierarchyLevel::Moment])
            .unwrap(),
        start_date: None,
        end_date: None,
    }
}

fn new_line(name: &str, subdivision_id: Option<i64>) -> CreateMediaLine {
    CreateMediaLine {
        name: name.to_string(),
        budget: dec!(750),
        subdivision_id,
        moment_id: None,
        funnel_stage_id: None,
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_plan_crud(pool: PgPool) {
    let plan = MediaPlanRepo::create(&pool, &new_plan("Verão")).await.unwrap();
    assert_eq!(plan.name, "Verão");
    assert_eq!(plan.total_budget, dec!(3000));
    assert_eq!(plan.hierarchy_order, vec!["subdivision", "moment"]);
    assert_eq!(plan.order().unwrap().len(), 2);

    let found = MediaPlanRepo::find_by_id(&pool, plan.id).await.unwrap().unwrap();
    assert_eq!(found.id, plan.id);

    let updated = MediaPlanRepo::update(
        &pool,
        plan.id,
        &UpdateMediaPlan {
            total_budget: Some(dec!(4000)),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.total_budget, dec!(4000));
    assert_eq!(updated.name, "Verão");

    let reordered = MediaPlanRepo::update_hierarchy_order(
        &pool,
        plan.id,
        &HierarchyOrder::new(vec![HierarchyLevel::FunnelStage]).unwrap(),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(reordered.hierarchy_order, vec!["funnel_stage"]);

    assert_eq!(MediaPlanRepo::list(&pool).await.unwrap().len(), 1);
    assert!(MediaPlanRepo::delete(&pool, plan.id).await.unwrap());
    assert!(MediaPlanRepo::find_by_id(&pool, plan.id).await.unwrap().is_none());
    assert!(!MediaPlanRepo::delete(&pool, plan.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_missing_plan_returns_none(pool: PgPool) {
    let result = MediaPlanRepo::update(&pool, 999, &UpdateMediaPlan::default())
        .await
        .unwrap();
    assert!(result.is_none());
}

// ---------------------------------------------------------------------------
// Media lines
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_line_crud_and_cascade(pool: PgPool) {
    let plan = MediaPlanRepo::create(&pool, &new_plan("p")).await.unwrap();
    let sub = DimensionRepo::create(
        &pool,
        HierarchyLevel::Subdivision,
        &CreateDimension { name: "SP".into() },
    )
    .await
    .unwrap();

    let line = MediaLineRepo::create(&pool, plan.id, &new_line("TV", Some(sub.id)))
        .await
        .unwrap();
    assert_eq!(line.to_ref().subdivision_id, Some(sub.id));

    let updated = MediaLineRepo::update(
        &pool,
        line.id,
        &UpdateMediaLine {
            budget: Some(dec!(800)),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.budget, dec!(800));
    assert_eq!(updated.subdivision_id, Some(sub.id));

    MediaPlanRepo::delete(&pool, plan.id).await.unwrap();
    assert!(MediaLineRepo::find_by_id(&pool, line.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_line_update_can_clear_dimension(pool: PgPool) {
    let plan = MediaPlanRepo::create(&pool, &new_plan("p")).await.unwrap();
    let sub = DimensionRepo::create(
        &pool,
        HierarchyLevel::Subdivision,
        &CreateDimension { name: "RJ".into() },
    )
    .await
    .unwrap();
    let line = MediaLineRepo::create(&pool, plan.id, &new_line("Radio", Some(sub.id)))
        .await
        .unwrap();

    let updated = MediaLineRepo::update(
        &pool,
        line.id,
        &UpdateMediaLine {
            subdivision_id: Some(sub.id),
            clear_dimensions: vec![HierarchyLevel::Subdivision],
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.subdivision_id, None);
    assert_eq!(updated.budget, dec!(750));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_many_is_scoped_to_plan(pool: PgPool) {
    let a = MediaPlanRepo::create(&pool, &new_plan("a")).await.unwrap();
    let b = MediaPlanRepo::create(&pool, &new_plan("b")).await.unwrap();
    let la = MediaLineRepo::create(&pool, a.id, &new_line("x", None)).await.unwrap();
    let lb = MediaLineRepo::create(&pool, b.id, &new_line("y", None)).await.unwrap();

    let removed = MediaLineRepo::delete_many_in_plan(&pool, a.id, &[la.id, lb.id])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(MediaLineRepo::find_by_id(&pool, lb.id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleting_dimension_nulls_line_reference(pool: PgPool) {
    let plan = MediaPlanRepo::create(&pool, &new_plan("p")).await.unwrap();
    let sub = DimensionRepo::create(
        &pool,
        HierarchyLevel::Subdivision,
        &CreateDimension { name: "RJ".into() },
    )
    .await
    .unwrap();
    let line = MediaLineRepo::create(&pool, plan.id, &new_line("TV", Some(sub.id)))
        .await
        .unwrap();

    sqlx::query("DELETE FROM subdivisions WHERE id = $1")
        .bind(sub.id)
        .execute(&pool)
        .await
        .unwrap();
    let line = MediaLineRepo::find_by_id(&pool, line.id).await.unwrap().unwrap();
    assert_eq!(line.subdivision_id, None);
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dimension_names_are_unique_per_library(pool: PgPool) {
    let input = CreateDimension { name: "Topo".into() };
    DimensionRepo::create(&pool, HierarchyLevel::FunnelStage, &input).await.unwrap();
    let dup = DimensionRepo::create(&pool, HierarchyLevel::FunnelStage, &input).await;
    assert!(dup.is_err());
    // Same name in another library is fine.
    DimensionRepo::create(&pool, HierarchyLevel::Moment, &input).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_name_directory_loads_requested_levels(pool: PgPool) {
    let moment = DimensionRepo::create(
        &pool,
        HierarchyLevel::Moment,
        &CreateDimension { name: "Lançamento".into() },
    )
    .await
    .unwrap();
    let names = NameDirectory::load(&pool, &[HierarchyLevel::Moment]).await.unwrap();
    assert_eq!(names.resolve(HierarchyLevel::Moment, moment.id), "Lançamento");
    assert_eq!(DimensionRepo::list(&pool, HierarchyLevel::Moment).await.unwrap().len(), 1);
}
