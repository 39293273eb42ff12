use crate::compose;
use crate::config::ComposerConfig;
use crate::download;
use crate::error::Result;
use crate::metadata;
use crate::transport::Transport;
use crate::types::{CompositeImage, Coordinate, PipelineStage};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

/// Receives each finished panorama, e.g. to texture a sphere with it.
///
/// Called after the run is already done; a sink cannot fail the run.
pub trait PanoramaSink: Send + Sync {
    fn apply(&self, composite: &CompositeImage);
}

impl<F> PanoramaSink for F
where
    F: Fn(&CompositeImage) + Send + Sync,
{
    fn apply(&self, composite: &CompositeImage) {
        self(composite)
    }
}

/// Observable state of a composer, shared by all clones.
struct PipelineState {
    downloading: watch::Sender<bool>,
    stage: watch::Sender<PipelineStage>,
    latest: watch::Sender<Option<Arc<CompositeImage>>>,
}

impl PipelineState {
    fn new() -> Self {
        Self {
            downloading: watch::Sender::new(false),
            stage: watch::Sender::new(PipelineStage::Idle),
            latest: watch::Sender::new(None),
        }
    }
}

/// Marks a run as in progress for as long as it is alive.
///
/// Dropping it clears the download flag and, unless `finish` was called,
/// marks the run failed. This covers `?` returns and panics alike.
struct RunGuard<'a> {
    state: &'a PipelineState,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    fn start(state: &'a PipelineState) -> Self {
        state.downloading.send_replace(true);
        state.stage.send_replace(PipelineStage::Resolving);
        Self {
            state,
            finished: false,
        }
    }

    fn advance(&self, stage: PipelineStage) {
        self.state.stage.send_replace(stage);
    }

    fn finish(mut self, composite: Arc<CompositeImage>) {
        self.finished = true;
        self.state.latest.send_replace(Some(composite));
        self.state.stage.send_replace(PipelineStage::Done);
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.stage.send_replace(PipelineStage::Failed);
        }
        self.state.downloading.send_replace(false);
    }
}

/// Turns a coordinate into a stitched equirectangular Street View panorama.
///
/// Cloning is cheap; clones share the transport, sinks and observable state.
/// Running two compositions on the same composer at once is not guarded
/// against; check `is_downloading()` first.
#[derive(Clone)]
pub struct StreetViewComposer {
    transport: Arc<dyn Transport>,
    config: Arc<ComposerConfig>,
    sinks: Arc<Vec<Arc<dyn PanoramaSink>>>,
    state: Arc<PipelineState>,
}

impl StreetViewComposer {
    /// Create a composer that talks to Google over a fresh `reqwest::Client`.
    pub fn new(config: ComposerConfig) -> Result<Self> {
        Self::with_transport(config, reqwest::Client::new())
    }

    /// Create a composer over a custom transport, such as a `reqwest::Client`
    /// built with a timeout or proxy.
    pub fn with_transport(config: ComposerConfig, transport: impl Transport + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport: Arc::new(transport),
            config: Arc::new(config),
            sinks: Arc::new(Vec::new()),
            state: Arc::new(PipelineState::new()),
        })
    }

    /// Register a sink that receives every finished panorama.
    pub fn with_sink(mut self, sink: impl PanoramaSink + 'static) -> Self {
        Arc::make_mut(&mut self.sinks).push(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn is_downloading(&self) -> bool {
        *self.state.downloading.borrow()
    }

    pub fn stage(&self) -> PipelineStage {
        *self.state.stage.borrow()
    }

    /// The most recent successful composite.
    pub fn latest(&self) -> Option<Arc<CompositeImage>> {
        self.state.latest.borrow().clone()
    }

    pub fn subscribe_downloading(&self) -> watch::Receiver<bool> {
        self.state.downloading.subscribe()
    }

    pub fn subscribe_stage(&self) -> watch::Receiver<PipelineStage> {
        self.state.stage.subscribe()
    }

    pub fn subscribe_latest(&self) -> watch::Receiver<Option<Arc<CompositeImage>>> {
        self.state.latest.subscribe()
    }

    /// Compose the panorama nearest to `coordinate`.
    ///
    /// Resolves a panorama id, downloads every tile, trims black padding when
    /// tiles are missing and stitches the result. On success the composite is
    /// published to subscribers and handed to each sink.
    #[instrument(skip(self))]
    pub async fn compose(&self, coordinate: Coordinate) -> Result<Arc<CompositeImage>> {
        let run = RunGuard::start(&self.state);
        let transport = self.transport.as_ref();

        let metadata = metadata::resolve(transport, &self.config, coordinate).await?;
        let pano_id = metadata.panorama_id()?;

        run.advance(PipelineStage::Fetching);
        let fetch = download::fetch_tiles(transport, &self.config, pano_id).await?;

        let valid_height = if fetch.any_failed() {
            run.advance(PipelineStage::Detecting);
            let tile_height = compose::reference_tile_size(&fetch.grid)?.1;
            let height = compose::detect_valid_height(&fetch.grid.column(0), tile_height);
            if height.is_none() {
                warn!(pano_id, "Could not find panorama bounds, using the full grid");
            }
            height
        } else {
            None
        };

        run.advance(PipelineStage::Compositing);
        let image = compose::compose(&fetch.grid, valid_height)?;
        let composite = Arc::new(CompositeImage {
            pano_id: pano_id.to_string(),
            tile_size: compose::reference_tile_size(&fetch.grid)?,
            image,
            valid_height,
        });

        run.finish(Arc::clone(&composite));
        info!(
            pano_id,
            width = composite.width(),
            height = composite.height(),
            failed_tiles = fetch.failed,
            "Street View panorama composed"
        );

        for sink in self.sinks.iter() {
            sink.apply(&composite);
        }

        Ok(composite)
    }

    /// Like `compose`, reporting only whether it worked.
    pub async fn compose_street_view(&self, coordinate: Coordinate) -> bool {
        match self.compose(coordinate).await {
            Ok(_) => true,
            Err(e) => {
                warn!(%coordinate, error = %e, "No street view available nearby");
                false
            }
        }
    }
}
