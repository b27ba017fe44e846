//! The workbench engine: one explicit instance owning all session state.
//!
//! The engine holds the dataset registry, the draw session, the active
//! highlight set and the subscription list, and coordinates query and
//! analysis runs against the external collaborators. It replaces the
//! ambient widget/window globals of a map UI with a single value whose
//! state changes are observable through subscription hooks.
//!
//! Superseding: every query and analysis run takes a fresh generation.
//! Publishing a result whose generation is no longer current is a no-op
//! reported as [`Publish::Superseded`], so in-flight results of an
//! abandoned request are discarded when they resolve.

use std::sync::Arc;

use log::{debug, info};

use crate::aggregate::{aggregate_analysis, aggregate_search, GroupedResult, HighlightSet};
use crate::analysis::{analyze, AnalysisError, AnalysisRequest, AnalysisResult};
use crate::capability::{CapabilityError, GeometryCapability, RenderSurface};
use crate::dataset::{Dataset, DatasetRegistry, Feature};
use crate::draw::{DrawError, DrawSession, DrawState, DrawTool};
use crate::error::WorkbenchError;
use crate::geometry::{Geometry, Point};
use crate::query::{compile, run, DatasetHits, QueryGroup, SearchResult, ValidationError};
use crate::styles::HighlightStyle;

/// Engine events delivered to subscribers after a state transition
/// completes, never before.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A dataset was registered, unregistered or had features changed.
    DatasetChanged { dataset_id: String },
    /// The draw session moved to a new state.
    DrawStateChanged { state: DrawState },
    /// The active result set was replaced.
    ResultsChanged,
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::DatasetChanged { .. } => EventKind::DatasetChanged,
            Self::DrawStateChanged { .. } => EventKind::DrawStateChanged,
            Self::ResultsChanged => EventKind::ResultsChanged,
        }
    }
}

/// Event categories a subscriber can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    DatasetChanged,
    DrawStateChanged,
    ResultsChanged,
}

/// Token identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Generation token for one query or analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Whether a publish landed or was superseded by a newer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    Applied,
    Superseded,
}

/// Which datasets a query runs against.
#[derive(Debug, Clone)]
pub enum QueryTarget {
    Dataset(String),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResultOrigin {
    Search,
    Analysis,
}

struct ActiveResults {
    origin: ResultOrigin,
    grouped: GroupedResult,
}

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    callback: Box<dyn Fn(&EngineEvent)>,
}

/// The interactive spatial query and analysis engine.
pub struct Workbench {
    capability: Arc<dyn GeometryCapability>,
    surface: Arc<dyn RenderSurface>,
    registry: DatasetRegistry,
    draw: DrawSession,
    highlights: HighlightSet,
    results: Option<ActiveResults>,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
    query_gen: u64,
    analysis_gen: u64,
}

impl Workbench {
    /// Creates an engine over the given collaborators.
    pub fn new(capability: Arc<dyn GeometryCapability>, surface: Arc<dyn RenderSurface>) -> Self {
        Self {
            capability,
            surface,
            registry: DatasetRegistry::new(),
            draw: DrawSession::new(),
            highlights: HighlightSet::new(),
            results: None,
            subscriptions: Vec::new(),
            next_subscription: 0,
            query_gen: 0,
            analysis_gen: 0,
        }
    }

    // --- datasets -------------------------------------------------------

    /// Registers a dataset. Re-registering an id replaces the previous
    /// entry (last write wins) and invalidates cached results that
    /// referenced it.
    pub fn register_dataset(&mut self, dataset: Dataset) {
        let dataset_id = dataset.id.clone();
        let replaced = self.registry.register(dataset);
        if replaced {
            info!("dataset '{dataset_id}' replaced");
            self.invalidate_results_for(&dataset_id);
            self.query_gen += 1;
        }
        self.notify(&EngineEvent::DatasetChanged { dataset_id });
    }

    /// Removes a dataset, invalidating cached results that referenced it.
    pub fn unregister_dataset(&mut self, id: &str) -> Option<Dataset> {
        let removed = self.registry.unregister(id)?;
        self.invalidate_results_for(id);
        self.query_gen += 1;
        self.notify(&EngineEvent::DatasetChanged {
            dataset_id: id.to_string(),
        });
        Some(removed)
    }

    /// Appends a feature to a registered dataset.
    pub fn add_feature(&mut self, dataset_id: &str, feature: Feature) -> Result<(), WorkbenchError> {
        let dataset = self
            .registry
            .get_mut(dataset_id)
            .ok_or_else(|| ValidationError::UnknownDataset(dataset_id.to_string()))?;
        dataset.add_feature(feature);
        self.notify(&EngineEvent::DatasetChanged {
            dataset_id: dataset_id.to_string(),
        });
        Ok(())
    }

    /// Removes a feature from a registered dataset.
    pub fn remove_feature(
        &mut self,
        dataset_id: &str,
        feature_id: u64,
    ) -> Result<Option<Feature>, WorkbenchError> {
        let dataset = self
            .registry
            .get_mut(dataset_id)
            .ok_or_else(|| ValidationError::UnknownDataset(dataset_id.to_string()))?;
        let removed = dataset.remove_feature(feature_id);
        self.notify(&EngineEvent::DatasetChanged {
            dataset_id: dataset_id.to_string(),
        });
        Ok(removed)
    }

    pub fn registry(&self) -> &DatasetRegistry {
        &self.registry
    }

    fn invalidate_results_for(&mut self, dataset_id: &str) {
        let invalidated = matches!(
            &self.results,
            Some(ActiveResults {
                origin: ResultOrigin::Search,
                grouped,
            }) if grouped.groups.iter().any(|g| g.key == dataset_id)
        );
        if invalidated {
            debug!("cached results invalidated by dataset '{dataset_id}'");
            self.results = None;
        }
    }

    // --- subscriptions --------------------------------------------------

    /// Subscribes to one event kind. The callback fires synchronously
    /// after each matching state transition.
    pub fn subscribe(
        &mut self,
        kind: EventKind,
        callback: impl Fn(&EngineEvent) + 'static,
    ) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscriptions.push(Subscription {
            id,
            kind,
            callback: Box::new(callback),
        });
        id
    }

    /// Drops a subscription. Returns `false` when the id is unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    fn notify(&self, event: &EngineEvent) {
        for subscription in &self.subscriptions {
            if subscription.kind == event.kind() {
                (subscription.callback)(event);
            }
        }
    }

    // --- draw session ---------------------------------------------------

    /// Arms the draw tool. A session still drawing is implicitly cancelled
    /// first; a completed or cancelled session is reset.
    pub fn arm_draw_tool(&mut self, tool: DrawTool) -> Result<(), DrawError> {
        if self.draw.state() == DrawState::Drawing {
            self.draw.cancel()?;
            self.notify(&EngineEvent::DrawStateChanged {
                state: DrawState::Cancelled,
            });
        }
        if self.draw.state() != DrawState::Idle {
            self.draw.reset();
        }
        self.draw.arm(tool)?;
        self.notify(&EngineEvent::DrawStateChanged {
            state: DrawState::Drawing,
        });
        Ok(())
    }

    /// Feeds one pointer position into the draw session.
    pub fn add_draw_vertex(&mut self, p: Point) -> Result<(), DrawError> {
        self.draw.add_vertex(p)?;
        if self.draw.state() == DrawState::Complete {
            self.notify(&EngineEvent::DrawStateChanged {
                state: DrawState::Complete,
            });
        }
        Ok(())
    }

    /// Completes the active capture and returns its geometry.
    pub fn finish_draw(&mut self) -> Result<Geometry, DrawError> {
        let geometry = self.draw.finish()?;
        self.notify(&EngineEvent::DrawStateChanged {
            state: DrawState::Complete,
        });
        Ok(geometry)
    }

    /// Cancels the active capture.
    pub fn cancel_draw(&mut self) -> Result<(), DrawError> {
        self.draw.cancel()?;
        self.notify(&EngineEvent::DrawStateChanged {
            state: DrawState::Cancelled,
        });
        Ok(())
    }

    /// Takes the completed geometry out of the session, resetting it to
    /// idle for the next capture.
    pub fn take_drawn_geometry(&mut self) -> Option<Geometry> {
        if self.draw.state() != DrawState::Complete {
            return None;
        }
        let geometry = self.draw.result_geometry().cloned();
        self.draw.reset();
        self.notify(&EngineEvent::DrawStateChanged {
            state: DrawState::Idle,
        });
        geometry
    }

    pub fn draw_session(&self) -> &DrawSession {
        &self.draw
    }

    // --- queries --------------------------------------------------------

    /// Validates a query group against the target without running it.
    pub fn build_query(
        &self,
        group: &QueryGroup,
        target: &QueryTarget,
    ) -> Result<(), ValidationError> {
        if group.is_empty() {
            return Err(ValidationError::EmptyGroup);
        }
        match target {
            QueryTarget::Dataset(id) => {
                let dataset = self
                    .registry
                    .get(id)
                    .ok_or_else(|| ValidationError::UnknownDataset(id.clone()))?;
                compile(group, dataset).map(|_| ())
            }
            QueryTarget::All => {
                let mut first_error = None;
                for dataset in self.registry.list() {
                    match compile(group, dataset) {
                        Ok(_) => return Ok(()),
                        Err(e) => first_error = first_error.or(Some(e)),
                    }
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }
        }
    }

    /// Evaluates `group` against the target datasets and takes a new
    /// generation for the run. Purely synchronous; publishing is separate.
    pub fn build_search(
        &mut self,
        group: &QueryGroup,
        target: &QueryTarget,
    ) -> Result<(Generation, SearchResult), ValidationError> {
        if group.is_empty() {
            return Err(ValidationError::EmptyGroup);
        }
        let mut result = SearchResult::default();
        match target {
            QueryTarget::Dataset(id) => {
                let dataset = self
                    .registry
                    .get(id)
                    .ok_or_else(|| ValidationError::UnknownDataset(id.clone()))?;
                let predicate = compile(group, dataset)?;
                let features: Vec<Feature> =
                    run(&predicate, dataset).into_iter().cloned().collect();
                if !features.is_empty() {
                    result.hits.push(DatasetHits {
                        dataset_id: dataset.id.clone(),
                        features,
                    });
                }
            }
            QueryTarget::All => {
                for dataset in self.registry.list() {
                    let predicate = match compile(group, dataset) {
                        Ok(p) => p,
                        Err(e) => {
                            debug!("dataset '{}' skipped: {e}", dataset.id);
                            result.skipped_datasets += 1;
                            continue;
                        }
                    };
                    let features: Vec<Feature> =
                        run(&predicate, dataset).into_iter().cloned().collect();
                    if !features.is_empty() {
                        result.hits.push(DatasetHits {
                            dataset_id: dataset.id.clone(),
                            features,
                        });
                    }
                }
            }
        }
        self.query_gen += 1;
        info!(
            "search matched {} features across {} datasets",
            result.total_count(),
            result.dataset_count()
        );
        Ok((Generation(self.query_gen), result))
    }

    /// Publishes a search run: replaces the highlight set and zooms to the
    /// combined extent. A stale generation is discarded untouched.
    pub async fn publish_search(
        &mut self,
        generation: Generation,
        result: SearchResult,
    ) -> Result<Publish, CapabilityError> {
        if generation.0 != self.query_gen {
            info!("discarding superseded search result");
            return Ok(Publish::Superseded);
        }
        let grouped = aggregate_search(&result);
        let geometries: Vec<Geometry> = result
            .hits
            .iter()
            .flat_map(|h| h.features.iter().map(|f| f.geometry.clone()))
            .collect();
        let surface = Arc::clone(&self.surface);
        self.highlights
            .replace(surface.as_ref(), &geometries, &HighlightStyle::default())
            .await?;
        if let Some(extent) = grouped.zoom_extent {
            surface.zoom_to(&extent).await?;
        }
        self.results = Some(ActiveResults {
            origin: ResultOrigin::Search,
            grouped,
        });
        self.notify(&EngineEvent::ResultsChanged);
        Ok(Publish::Applied)
    }

    /// Runs and publishes a query in one step.
    pub async fn run_query(
        &mut self,
        group: &QueryGroup,
        target: &QueryTarget,
    ) -> Result<SearchResult, WorkbenchError> {
        let (generation, result) = self.build_search(group, target)?;
        self.publish_search(generation, result.clone()).await?;
        Ok(result)
    }

    // --- analysis -------------------------------------------------------

    /// Validates an analysis request and takes a new generation for it.
    pub fn prepare_analysis(
        &mut self,
        request: &AnalysisRequest,
    ) -> Result<Generation, AnalysisError> {
        request.validate()?;
        self.analysis_gen += 1;
        Ok(Generation(self.analysis_gen))
    }

    /// Publishes an analysis run. A stale generation is discarded.
    pub async fn publish_analysis(
        &mut self,
        generation: Generation,
        result: AnalysisResult,
    ) -> Result<Publish, CapabilityError> {
        if generation.0 != self.analysis_gen {
            info!("discarding superseded analysis result");
            return Ok(Publish::Superseded);
        }
        let grouped = aggregate_analysis(&result);
        let geometries: Vec<Geometry> =
            result.outputs.iter().map(|o| o.geometry.clone()).collect();
        let surface = Arc::clone(&self.surface);
        self.highlights
            .replace(surface.as_ref(), &geometries, &result.style)
            .await?;
        if let Some(extent) = grouped.zoom_extent {
            surface.zoom_to(&extent).await?;
        }
        self.results = Some(ActiveResults {
            origin: ResultOrigin::Analysis,
            grouped,
        });
        self.notify(&EngineEvent::ResultsChanged);
        Ok(Publish::Applied)
    }

    /// Runs an analysis request against the geometry capability and
    /// publishes its result.
    pub async fn run_analysis(
        &mut self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, WorkbenchError> {
        let generation = self.prepare_analysis(request)?;
        let capability = Arc::clone(&self.capability);
        let result = analyze(capability.as_ref(), request).await?;
        self.publish_analysis(generation, result.clone()).await?;
        Ok(result)
    }

    // --- shared result state -------------------------------------------

    /// Invalidates any in-flight query and analysis runs. Called when the
    /// surrounding UI abandons pending work, e.g. a panel closes.
    pub fn cancel_inflight(&mut self) {
        self.query_gen += 1;
        self.analysis_gen += 1;
    }

    /// The grouped view of the most recent published run.
    pub fn results(&self) -> Option<&GroupedResult> {
        self.results.as_ref().map(|r| &r.grouped)
    }

    /// Number of highlights currently active on the surface.
    pub fn highlight_count(&self) -> usize {
        self.highlights.len()
    }
}
