//! Selection controller.
//!
//! Owns the current [`Selection`] and the [`RenderSnapshot`] that the map
//! renderer and the legend read from. Every selection change that alters the
//! dataset key issues a [`FetchTicket`] tagged with a new generation number;
//! when a fetch resolves, its result is applied only if its generation is
//! still the latest. Older results are dropped regardless of the order in
//! which fetches resolve.

use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{Catalog, LayerDescriptor};
use crate::colormaps::{ColorScale, Colormap, DEFAULT_DOMAIN};
use crate::error::{HexlayerError, Result};
use crate::fetcher::{DatasetFetcher, Record};
use crate::logging::log_error;
use crate::selection::{DatasetKey, Month, Selection, SelectionChange};

/// Everything one render cycle needs, replaced as a unit
#[derive(Debug, Clone)]
pub struct RenderSnapshot {
    /// Generation of the fetch that produced `records` (0 before any)
    pub generation: u64,
    /// The selection `records` were fetched for
    pub dataset_key: Option<DatasetKey>,
    pub records: Arc<Vec<Record>>,
    /// Scale for the currently selected layer
    pub scale: Arc<ColorScale>,
}

/// Permission to fetch one dataset on behalf of one selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub key: DatasetKey,
    /// Record property to read values from
    pub field: String,
}

/// What happened to a fetch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Completion {
    /// Records replaced the previous set
    Applied { generation: u64, record_count: usize },
    /// A newer selection was made while this fetch was in flight
    Discarded { generation: u64, latest: u64 },
    /// The fetch failed; the previous records stay in place
    Failed { generation: u64, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching { generation: u64 },
}

/// Serializable view of the controller for the API
#[derive(Debug, Clone, Serialize)]
pub struct SelectionStatus {
    pub selection: Selection,
    /// Key of the current selection
    pub key: Option<String>,
    pub generation: u64,
    pub phase: Phase,
    pub depth_selector_enabled: bool,
    pub depths: Vec<i32>,
    pub domain: [f64; 2],
    /// Key the rendered records belong to
    pub dataset_key: Option<String>,
    pub record_count: usize,
    pub last_error: Option<String>,
}

struct ControllerState {
    selection: Selection,
    /// Latest generation handed out
    generation: u64,
    phase: Phase,
    snapshot: Arc<RenderSnapshot>,
    last_error: Option<String>,
}

pub struct SelectionController {
    catalog: Arc<Catalog>,
    months: Vec<Month>,
    colormap: Arc<dyn Colormap>,
    value_field: Option<String>,
    fetcher: Arc<DatasetFetcher>,
    state: Mutex<ControllerState>,
}

impl SelectionController {
    /// Create a controller selecting the first catalog layer at `default_month`
    pub fn new(
        catalog: Arc<Catalog>,
        months: Vec<Month>,
        default_month: Month,
        colormap: Arc<dyn Colormap>,
        value_field: Option<String>,
        fetcher: Arc<DatasetFetcher>,
    ) -> Result<Self> {
        if !months.contains(&default_month) {
            return Err(HexlayerError::invalid_param(
                "month",
                format!("Default month {} is not offered", default_month),
            ));
        }

        let layer = catalog.first().cloned();
        let depth = layer.as_ref().map(|l| l.default_depth()).unwrap_or(0);
        let scale = Arc::new(build_scale(layer.as_ref(), &colormap));

        let state = ControllerState {
            selection: Selection {
                layer,
                month: default_month,
                depth,
            },
            generation: 0,
            phase: Phase::Idle,
            snapshot: Arc::new(RenderSnapshot {
                generation: 0,
                dataset_key: None,
                records: Arc::new(Vec::new()),
                scale,
            }),
            last_error: None,
        };

        Ok(Self {
            catalog,
            months,
            colormap,
            value_field,
            fetcher,
            state: Mutex::new(state),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn months(&self) -> &[Month] {
        &self.months
    }

    pub fn selection(&self) -> Selection {
        self.state.lock().selection.clone()
    }

    /// The snapshot to render from; take it once per render cycle
    pub fn snapshot(&self) -> Arc<RenderSnapshot> {
        self.state.lock().snapshot.clone()
    }

    pub fn depth_selector_enabled(&self) -> bool {
        self.state.lock().selection.depth_selector_enabled()
    }

    pub fn status(&self) -> SelectionStatus {
        let state = self.state.lock();
        let selection = state.selection.clone();
        SelectionStatus {
            key: selection.key().map(|k| k.to_string()),
            generation: state.generation,
            phase: state.phase,
            depth_selector_enabled: selection.depth_selector_enabled(),
            depths: selection
                .layer
                .as_ref()
                .map(|l| l.depths.clone())
                .unwrap_or_else(|| vec![0]),
            domain: state.snapshot.scale.domain(),
            dataset_key: state.snapshot.dataset_key.as_ref().map(|k| k.to_string()),
            record_count: state.snapshot.records.len(),
            last_error: state.last_error.clone(),
            selection,
        }
    }

    /// Issue a ticket for the current selection even if nothing changed.
    /// Used for the initial load.
    pub fn refresh(&self) -> Option<FetchTicket> {
        let mut state = self.state.lock();
        self.issue_ticket(&mut state)
    }

    pub fn select_layer(&self, id: &str) -> Result<Option<FetchTicket>> {
        self.select(SelectionChange {
            layer: Some(id.to_string()),
            ..Default::default()
        })
    }

    pub fn select_month(&self, month: &str) -> Result<Option<FetchTicket>> {
        self.select(SelectionChange {
            month: Some(month.to_string()),
            ..Default::default()
        })
    }

    pub fn select_depth(&self, depth: i32) -> Result<Option<FetchTicket>> {
        self.select(SelectionChange {
            depth: Some(depth),
            ..Default::default()
        })
    }

    /// Apply a selection change. Returns a ticket exactly when the dataset
    /// key changed; invalid changes leave the selection untouched.
    pub fn select(&self, change: SelectionChange) -> Result<Option<FetchTicket>> {
        let mut state = self.state.lock();
        let current = state.selection.clone();

        let layer = match change.layer.as_deref() {
            Some(id) => Some(
                self.catalog
                    .get(id)
                    .cloned()
                    .ok_or_else(|| HexlayerError::invalid_param("layer", format!("Unknown layer: {}", id)))?,
            ),
            None => current.layer.clone(),
        };

        let month = match change.month.as_deref() {
            Some(raw) => {
                let month: Month = raw.parse()?;
                if !self.months.contains(&month) {
                    return Err(HexlayerError::invalid_param(
                        "month",
                        format!("Month {} is not available", month),
                    ));
                }
                month
            }
            None => current.month.clone(),
        };

        let mut depth = current.depth;
        if let Some(layer) = &layer {
            if !layer.depths.contains(&depth) {
                depth = layer.default_depth();
            }
        }
        if let Some(requested) = change.depth {
            match &layer {
                Some(layer) if layer.depths.len() > 1 => {
                    if !layer.depths.contains(&requested) {
                        return Err(HexlayerError::invalid_param(
                            "depth",
                            format!("Depth {} is not offered by layer {}", requested, layer.id),
                        ));
                    }
                    depth = requested;
                }
                _ => debug!(depth = requested, "Depth selector disabled, ignoring depth change"),
            }
        }

        let layer_changed = layer.as_ref().map(|l| &l.id) != current.layer.as_ref().map(|l| &l.id);
        let next = Selection {
            layer,
            month,
            depth,
        };
        let key_changed = next.key() != current.key();
        state.selection = next;

        if layer_changed {
            // The scale always follows the selected layer; records stay until replaced
            let scale = Arc::new(build_scale(state.selection.layer.as_ref(), &self.colormap));
            let snapshot = RenderSnapshot {
                scale,
                ..(*state.snapshot).clone()
            };
            state.snapshot = Arc::new(snapshot);
        }

        if !key_changed {
            return Ok(None);
        }
        Ok(self.issue_ticket(&mut state))
    }

    fn issue_ticket(&self, state: &mut ControllerState) -> Option<FetchTicket> {
        let layer = state.selection.layer.as_ref()?;
        let key = state.selection.key()?;
        let field = layer.value_field(self.value_field.as_deref()).to_string();

        state.generation += 1;
        state.phase = Phase::Fetching {
            generation: state.generation,
        };
        debug!(generation = state.generation, key = %key, "Issued fetch ticket");

        Some(FetchTicket {
            generation: state.generation,
            key,
            field,
        })
    }

    /// Hand back the result of a ticket's fetch
    pub fn complete(&self, ticket: &FetchTicket, result: Result<Vec<Record>>) -> Completion {
        let mut state = self.state.lock();

        if ticket.generation != state.generation {
            debug!(
                generation = ticket.generation,
                latest = state.generation,
                key = %ticket.key,
                "Discarding stale fetch result"
            );
            return Completion::Discarded {
                generation: ticket.generation,
                latest: state.generation,
            };
        }

        state.phase = Phase::Idle;
        match result {
            Ok(records) => {
                let record_count = records.len();
                let snapshot = RenderSnapshot {
                    generation: ticket.generation,
                    dataset_key: Some(ticket.key.clone()),
                    records: Arc::new(records),
                    scale: state.snapshot.scale.clone(),
                };
                state.snapshot = Arc::new(snapshot);
                state.last_error = None;
                info!(
                    generation = ticket.generation,
                    key = %ticket.key,
                    record_count = record_count,
                    "Applied dataset"
                );
                Completion::Applied {
                    generation: ticket.generation,
                    record_count,
                }
            }
            Err(error) => {
                log_error(&error, &format!("fetching dataset {}", ticket.key));
                let message = error.to_string();
                state.last_error = Some(message.clone());
                Completion::Failed {
                    generation: ticket.generation,
                    error: message,
                }
            }
        }
    }

    /// Fetch the ticket's dataset and complete it
    pub async fn run(&self, ticket: FetchTicket) -> Completion {
        let result = self
            .fetcher
            .fetch(&ticket.key, &ticket.field)
            .await
            .map(|dataset| dataset.records);
        self.complete(&ticket, result)
    }

    /// Select and, if the key changed, fetch. `None` means nothing to fetch.
    pub async fn apply(&self, change: SelectionChange) -> Result<Option<Completion>> {
        match self.select(change)? {
            Some(ticket) => Ok(Some(self.run(ticket).await)),
            None => Ok(None),
        }
    }
}

fn build_scale(layer: Option<&LayerDescriptor>, colormap: &Arc<dyn Colormap>) -> ColorScale {
    let domain = layer.map(|l| l.domain).unwrap_or(DEFAULT_DOMAIN);
    ColorScale::new(domain, colormap.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormaps::get_colormap;
    use crate::source::{Payload, ResourceSource, SourceError};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    /// In-memory source; paths with a gate block until the gate is released
    #[derive(Default)]
    struct MemorySource {
        files: HashMap<String, Vec<u8>>,
        gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
        requests: Mutex<Vec<String>>,
        fetch_count: AtomicUsize,
    }

    impl MemorySource {
        fn with(mut self, path: &str, body: &str) -> Self {
            self.files.insert(path.to_string(), body.as_bytes().to_vec());
            self
        }

        fn gate(&self, path: &str) -> oneshot::Sender<()> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().insert(path.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl ResourceSource for MemorySource {
        async fn fetch(&self, path: &str) -> std::result::Result<Payload, SourceError> {
            self.fetch_count.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(path.to_string());
            let gate = self.gates.lock().remove(path);
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.files
                .get(path)
                .map(|bytes| Payload::new(bytes.clone(), None))
                .ok_or_else(|| SourceError::NotFound(path.to_string()))
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    const CATALOG: &str = r#"[
        {"id": "traffic_density", "name": "Traffic density", "domain": [0, 10], "depths": [0]},
        {"id": "temperature", "name": "Temperature", "domain": [-2, 30], "depths": [0, 10, 50]}
    ]"#;

    fn controller(source: Arc<MemorySource>) -> SelectionController {
        let catalog = Arc::new(Catalog::from_slice(CATALOG.as_bytes()).unwrap());
        let months: Vec<Month> = ["202306", "202307", "202308"]
            .iter()
            .map(|m| m.parse().unwrap())
            .collect();
        let fetcher = Arc::new(DatasetFetcher::new(source, "data", vec![".json".to_string()]));
        SelectionController::new(
            catalog,
            months,
            "202307".parse().unwrap(),
            get_colormap("viridis").unwrap(),
            None,
            fetcher,
        )
        .unwrap()
    }

    fn records(value: f64) -> Vec<Record> {
        vec![Record::new("861f18a07ffffff", value)]
    }

    #[test]
    fn test_defaults_select_first_layer() {
        let controller = controller(Arc::new(MemorySource::default()));
        let selection = controller.selection();

        assert_eq!(selection.layer.as_ref().unwrap().id, "traffic_density");
        assert_eq!(selection.month.as_str(), "202307");
        assert_eq!(selection.depth, 0);
        assert_eq!(controller.snapshot().scale.domain(), [0.0, 10.0]);
        assert!(controller.snapshot().records.is_empty());
    }

    #[test]
    fn test_empty_catalog_uses_default_domain() {
        let fetcher = Arc::new(DatasetFetcher::new(
            Arc::new(MemorySource::default()),
            "data",
            vec![".json".to_string()],
        ));
        let controller = SelectionController::new(
            Arc::new(Catalog::default()),
            vec!["202307".parse().unwrap()],
            "202307".parse().unwrap(),
            get_colormap("viridis").unwrap(),
            None,
            fetcher,
        )
        .unwrap();

        assert_eq!(controller.snapshot().scale.domain(), DEFAULT_DOMAIN);
        assert!(controller.refresh().is_none());
        assert!(controller.select_month("202307").unwrap().is_none());
    }

    #[test]
    fn test_ticket_only_on_key_change() {
        let controller = controller(Arc::new(MemorySource::default()));

        let ticket = controller.select_month("202306").unwrap().unwrap();
        assert_eq!(ticket.key.to_string(), "202306-0-traffic_density");
        assert_eq!(ticket.field, "traffic_density");
        assert_eq!(ticket.generation, 1);

        // Same month again: no fetch
        assert!(controller.select_month("202306").unwrap().is_none());
        // Same layer again: no fetch
        assert!(controller.select_layer("traffic_density").unwrap().is_none());
    }

    #[test]
    fn test_single_depth_layer_ignores_depth() {
        let controller = controller(Arc::new(MemorySource::default()));
        assert!(!controller.depth_selector_enabled());

        assert!(controller.select_depth(50).unwrap().is_none());
        assert_eq!(controller.selection().depth, 0);
        assert_eq!(
            controller.selection().key().unwrap().to_string(),
            "202307-0-traffic_density"
        );
    }

    #[test]
    fn test_multi_depth_layer() {
        let controller = controller(Arc::new(MemorySource::default()));
        controller.select_layer("temperature").unwrap().unwrap();
        assert!(controller.depth_selector_enabled());

        let ticket = controller.select_depth(10).unwrap().unwrap();
        assert_eq!(ticket.key.to_string(), "202307-10-temperature");

        assert!(controller.select_depth(11).is_err());
        assert_eq!(controller.selection().depth, 10);

        // Switching to a single-depth layer resets the depth
        let ticket = controller.select_layer("traffic_density").unwrap().unwrap();
        assert_eq!(ticket.key.to_string(), "202307-0-traffic_density");
    }

    #[test]
    fn test_invalid_changes_leave_selection() {
        let controller = controller(Arc::new(MemorySource::default()));
        let before = controller.selection();

        assert!(controller.select_layer("salinity").is_err());
        assert!(controller.select_month("202401").is_err());
        assert!(controller.select_month("July").is_err());

        // A bad field in a combined change rejects the whole change
        let change = SelectionChange {
            layer: Some("temperature".to_string()),
            month: Some("199901".to_string()),
            depth: None,
        };
        assert!(controller.select(change).is_err());
        assert_eq!(controller.selection(), before);
    }

    #[test]
    fn test_scale_follows_layer() {
        let controller = controller(Arc::new(MemorySource::default()));
        let ticket = controller.refresh().unwrap();
        controller.complete(&ticket, Ok(records(5.0)));
        let before = controller.snapshot();

        controller.select_layer("temperature").unwrap();
        let after = controller.snapshot();

        assert_eq!(after.scale.domain(), [-2.0, 30.0]);
        assert!(!Arc::ptr_eq(&before.scale, &after.scale));
        // Records are still labelled with the selection they came from
        assert!(Arc::ptr_eq(&before.records, &after.records));
        assert_eq!(
            after.dataset_key.as_ref().unwrap().to_string(),
            "202307-0-traffic_density"
        );
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let controller = controller(Arc::new(MemorySource::default()));
        let s1 = controller.select_month("202306").unwrap().unwrap();
        let s2 = controller.select_month("202308").unwrap().unwrap();

        // Newer result arrives first, older one afterwards
        assert_eq!(
            controller.complete(&s2, Ok(records(2.0))),
            Completion::Applied {
                generation: 2,
                record_count: 1
            }
        );
        assert_eq!(
            controller.complete(&s1, Ok(records(1.0))),
            Completion::Discarded {
                generation: 1,
                latest: 2
            }
        );

        let snapshot = controller.snapshot();
        assert_eq!(*snapshot.records, records(2.0));
        assert_eq!(snapshot.dataset_key, Some(s2.key));
    }

    #[test]
    fn test_stale_result_discarded_in_order_too() {
        let controller = controller(Arc::new(MemorySource::default()));
        let s1 = controller.select_month("202306").unwrap().unwrap();
        let s2 = controller.select_month("202308").unwrap().unwrap();

        assert!(matches!(
            controller.complete(&s1, Ok(records(1.0))),
            Completion::Discarded { .. }
        ));
        assert!(matches!(controller.status().phase, Phase::Fetching { generation: 2 }));
        assert!(matches!(
            controller.complete(&s2, Ok(records(2.0))),
            Completion::Applied { .. }
        ));
        assert_eq!(*controller.snapshot().records, records(2.0));
        assert_eq!(controller.status().phase, Phase::Idle);
    }

    #[test]
    fn test_failure_keeps_previous_records() {
        let controller = controller(Arc::new(MemorySource::default()));
        let first = controller.refresh().unwrap();
        controller.complete(&first, Ok(records(3.0)));

        let second = controller.select_month("202306").unwrap().unwrap();
        let completion = controller.complete(
            &second,
            Err(HexlayerError::Parse {
                message: "truncated".to_string(),
            }),
        );
        assert!(matches!(completion, Completion::Failed { .. }));

        let snapshot = controller.snapshot();
        assert_eq!(*snapshot.records, records(3.0));
        assert_eq!(snapshot.dataset_key, Some(first.key));

        let status = controller.status();
        assert_eq!(status.phase, Phase::Idle);
        assert!(status.last_error.unwrap().contains("truncated"));
    }

    #[tokio::test]
    async fn test_each_change_fetches_once() {
        let source = Arc::new(
            MemorySource::default()
                .with("data/202306-0-traffic_density.json", r#"[{"h3": "861f18a07ffffff", "traffic_density": 1}]"#),
        );
        let controller = controller(source.clone());

        let completion = controller
            .apply(SelectionChange {
                month: Some("202306".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(completion, Some(Completion::Applied { record_count: 1, .. })));
        assert_eq!(source.fetch_count.load(Ordering::SeqCst), 1);

        // No key change, no fetch
        let completion = controller
            .apply(SelectionChange {
                depth: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(completion.is_none());
        assert_eq!(source.fetch_count.load(Ordering::SeqCst), 1);
        assert_eq!(
            *source.requests.lock(),
            vec!["data/202306-0-traffic_density.json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_overlapping_fetches_last_write_wins() {
        let source = Arc::new(
            MemorySource::default()
                .with("data/202306-0-traffic_density.json", r#"[{"h3": "861f18a07ffffff", "traffic_density": 1}]"#)
                .with("data/202308-0-traffic_density.json", r#"[{"h3": "861f18a07ffffff", "traffic_density": 8}]"#),
        );
        let release_s1 = source.gate("data/202306-0-traffic_density.json");
        let release_s2 = source.gate("data/202308-0-traffic_density.json");
        let controller = Arc::new(controller(source));

        let s1 = controller.select_month("202306").unwrap().unwrap();
        let task1 = tokio::spawn({
            let controller = controller.clone();
            async move { controller.run(s1).await }
        });
        let s2 = controller.select_month("202308").unwrap().unwrap();
        let task2 = tokio::spawn({
            let controller = controller.clone();
            async move { controller.run(s2).await }
        });

        // S2 resolves first, S1 last
        release_s2.send(()).unwrap();
        assert!(matches!(task2.await.unwrap(), Completion::Applied { .. }));
        release_s1.send(()).unwrap();
        assert!(matches!(task1.await.unwrap(), Completion::Discarded { .. }));

        let snapshot = controller.snapshot();
        assert_eq!(*snapshot.records, records(8.0));
        assert_eq!(
            snapshot.dataset_key.as_ref().unwrap().to_string(),
            "202308-0-traffic_density"
        );
    }
}
