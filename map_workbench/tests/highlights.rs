mod common;

use std::sync::Arc;

use common::{rect, MockCapability, RecordingSurface, SurfaceEvent};
use map_workbench::analysis::AnalysisRequest;
use map_workbench::dataset::{AttributeValue, Dataset, Feature, FieldDef, FieldType};
use map_workbench::engine::{Publish, QueryTarget};
use map_workbench::geometry::{Geometry, GeometryKind};
use map_workbench::query::{Criterion, CriterionOp, QueryGroup};
use map_workbench::styles::HighlightStyle;
use map_workbench::units::LinearUnit;
use map_workbench::Workbench;

fn dataset() -> Dataset {
    let mut dataset = Dataset::new(
        "sites",
        "Sites",
        GeometryKind::Point,
        vec![FieldDef::new("name", FieldType::Text)],
    );
    for (id, name, x) in [(1, "alpha", 0.0), (2, "beta", 10.0), (3, "gamma", 20.0)] {
        dataset.add_feature(
            Feature::new(id, Geometry::point(x, 0.0))
                .with_attribute("name", AttributeValue::text(name)),
        );
    }
    dataset
}

fn name_query(value: &str) -> QueryGroup {
    QueryGroup::with(Criterion::new(
        "name",
        CriterionOp::Contains,
        AttributeValue::text(value),
    ))
}

#[tokio::test]
async fn rerunning_a_query_replaces_highlights_atomically() {
    let surface = Arc::new(RecordingSurface::new());
    let mut wb = Workbench::new(Arc::new(MockCapability::new()), surface.clone());
    wb.register_dataset(dataset());

    wb.run_query(&name_query("a"), &QueryTarget::All)
        .await
        .unwrap();
    // "alpha", "beta" and "gamma" all contain an 'a'.
    assert_eq!(wb.highlight_count(), 3);

    wb.run_query(&name_query("beta"), &QueryTarget::All)
        .await
        .unwrap();
    assert_eq!(wb.highlight_count(), 1);

    // Exactly the second run's highlight is active, and every removal of
    // the first set happened before any addition of the second.
    let events = surface.events();
    assert_eq!(surface.active().len(), 1);
    let first_second_add = events
        .iter()
        .position(|e| matches!(e, SurfaceEvent::Added(h) if *h > 3))
        .unwrap();
    let last_removal = events
        .iter()
        .rposition(|e| matches!(e, SurfaceEvent::Removed(h) if *h <= 3))
        .unwrap();
    assert!(last_removal < first_second_add);
}

#[tokio::test]
async fn queries_zoom_to_the_combined_extent() {
    let surface = Arc::new(RecordingSurface::new());
    let mut wb = Workbench::new(Arc::new(MockCapability::new()), surface.clone());
    wb.register_dataset(dataset());

    wb.run_query(&name_query("a"), &QueryTarget::All)
        .await
        .unwrap();
    let zoom = surface
        .events()
        .into_iter()
        .find_map(|e| match e {
            SurfaceEvent::Zoomed(extent) => Some(extent),
            _ => None,
        })
        .unwrap();
    assert_eq!(zoom.min_x, 0.0);
    assert_eq!(zoom.max_x, 20.0);
}

#[tokio::test]
async fn superseded_search_results_are_discarded() {
    let surface = Arc::new(RecordingSurface::new());
    let mut wb = Workbench::new(Arc::new(MockCapability::new()), surface.clone());
    wb.register_dataset(dataset());

    let (stale, stale_result) = wb.build_search(&name_query("alpha"), &QueryTarget::All).unwrap();
    let (fresh, fresh_result) = wb.build_search(&name_query("beta"), &QueryTarget::All).unwrap();

    // The older run resolves after the newer one started: discarded.
    assert_eq!(
        wb.publish_search(stale, stale_result).await.unwrap(),
        Publish::Superseded
    );
    assert!(surface.events().is_empty());
    assert!(wb.results().is_none());

    assert_eq!(
        wb.publish_search(fresh, fresh_result).await.unwrap(),
        Publish::Applied
    );
    assert_eq!(wb.results().unwrap().total_count, 1);
}

#[tokio::test]
async fn cancel_inflight_supersedes_pending_runs() {
    let surface = Arc::new(RecordingSurface::new());
    let mut wb = Workbench::new(Arc::new(MockCapability::new()), surface.clone());
    wb.register_dataset(dataset());

    let (generation, result) = wb.build_search(&name_query("alpha"), &QueryTarget::All).unwrap();
    wb.cancel_inflight();
    assert_eq!(
        wb.publish_search(generation, result).await.unwrap(),
        Publish::Superseded
    );
}

#[tokio::test]
async fn analysis_highlights_use_the_request_style() {
    let surface = Arc::new(RecordingSurface::new());
    let mut wb = Workbench::new(Arc::new(MockCapability::new()), surface.clone());

    let style = HighlightStyle::new([255, 0, 0, 64], [255, 0, 0], 3.0);
    let request = AnalysisRequest::Buffer {
        sources: vec![Geometry::point(0.0, 0.0)],
        distance: 50.0,
        unit: LinearUnit::Meters,
        dissolve: false,
        style,
    };
    let result = wb.run_analysis(&request).await.unwrap();
    assert_eq!(result.style, style);
    assert_eq!(wb.highlight_count(), 1);
    assert_eq!(wb.results().unwrap().groups[0].key, "Buffer");
}

#[tokio::test]
async fn superseded_analysis_results_are_discarded() {
    let surface = Arc::new(RecordingSurface::new());
    let mut wb = Workbench::new(Arc::new(MockCapability::new()), surface.clone());

    let request = AnalysisRequest::Area {
        sources: vec![rect(0.0, 0.0, 100.0, 50.0)],
        style: HighlightStyle::default(),
    };
    let stale = wb.prepare_analysis(&request).unwrap();
    let fresh = wb.prepare_analysis(&request).unwrap();
    let result = map_workbench::analysis::analyze(&MockCapability::new(), &request)
        .await
        .unwrap();

    assert_eq!(
        wb.publish_analysis(stale, result.clone()).await.unwrap(),
        Publish::Superseded
    );
    assert!(surface.events().is_empty());
    assert_eq!(
        wb.publish_analysis(fresh, result).await.unwrap(),
        Publish::Applied
    );
}
