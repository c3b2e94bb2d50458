//! Dashboard session: one grid, its store and its panel.
//!
//! The session is the only owner of the live layout. Every mutation runs the
//! same sequence within one call: change the grid, take the layout events,
//! persist on `LayoutEnd`, re-render the panel. A layout equal to the
//! baseline is never stored; its override is deleted instead.

use std::path::PathBuf;

use portlet_grid::{
    codec, ConfigurationDocument, DefaultsPolicy, GridLayout, LayoutEvent, Reconciler,
    WidgetDefinition, WidgetInstance,
};

use crate::config::error::ConfigError;
use crate::config::loader::ConfigLoader;
use crate::config::schema::Config;
use crate::presenter::{ClipboardError, ClipboardSink, PanelPresenter, PanelView};
use crate::project::ProjectId;
use crate::store::{ConfigStore, StoreError};

/// Failure of a session operation.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The grid refused the change; nothing was modified.
    #[error(transparent)]
    Grid(#[from] portlet_grid::Error),

    /// The change was applied but could not be persisted.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Live dashboard state for one project.
#[derive(Debug)]
pub struct DashboardSession {
    grid: Reconciler<GridLayout>,
    store: ConfigStore,
    presenter: PanelPresenter,
    policy: DefaultsPolicy,
    project: ProjectId,
    unavailable: Vec<String>,
    /// Baseline ids the registry doesn't know, reported with every document
    baseline_unavailable: Vec<String>,
}

impl DashboardSession {
    /// Session over `grid`. Call [`DashboardSession::init`] before use.
    ///
    /// The store's baseline is narrowed to installed widgets in minimal-diff
    /// form; the ids it loses are kept for the unavailable warning.
    pub fn new(
        grid: Reconciler<GridLayout>,
        mut store: ConfigStore,
        policy: DefaultsPolicy,
        project: ProjectId,
    ) -> Self {
        let baseline_unavailable = store.restrict_baseline(grid.registry());
        let presenter = PanelPresenter::new(store.variant());
        Self {
            grid,
            store,
            presenter,
            policy,
            project,
            unavailable: baseline_unavailable.clone(),
            baseline_unavailable,
        }
    }

    /// Builds a session from the application config.
    ///
    /// `project` overrides `dashboard.project`; `config_path` is passed to a
    /// lazily started daemon.
    ///
    /// # Errors
    ///
    /// Returns an error if the widget definitions or the baseline cannot be
    /// loaded, or the remote settings are invalid.
    pub fn from_config(
        config: &Config,
        project: Option<&str>,
        config_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let registry = ConfigLoader::load_registry(&config.portlets_path())?;
        let baseline = ConfigLoader::load_baseline(config.baseline_path().as_deref(), &registry)?;

        let project = ProjectId::resolve(project.unwrap_or(&config.dashboard.project));
        tracing::debug!(project = %project, slug = project.slug(), "resolved project");

        let store = ConfigStore::from_config(config, &project, baseline, config_path)?;
        let grid = Reconciler::new(registry, GridLayout::new());
        Ok(Self::new(grid, store, config.dashboard.defaults, project))
    }

    /// Loads the stored layout (or the baseline) and renders the panel.
    ///
    /// A store failure falls back to the baseline and is shown on the panel.
    pub async fn init(&mut self) {
        let (document, failure) = match self.store.load().await {
            Ok(document) => (document, None),
            Err(e) => {
                tracing::warn!("Loading the stored layout failed, using the baseline: {}", e);
                (self.store.baseline().clone(), Some(e))
            }
        };
        self.show_document(&document);
        if let Some(e) = failure {
            self.presenter.set_error(e.to_string());
        }
    }

    /// Places a hidden widget. Missing attributes use the widget defaults.
    ///
    /// # Errors
    ///
    /// `Grid` if the widget is unknown or already placed (nothing changes),
    /// `Store` if the new layout could not be persisted.
    pub async fn add(
        &mut self,
        id: &str,
        width: Option<u32>,
        height: Option<u32>,
        color: Option<&str>,
    ) -> SessionResult<WidgetInstance> {
        let def = self
            .grid
            .registry()
            .get(id)
            .cloned()
            .ok_or_else(|| portlet_grid::Error::UnknownWidget { id: id.to_string() });
        let result = def.and_then(|def| {
            self.grid.add(
                id,
                width.unwrap_or(def.default_width),
                height.unwrap_or(def.default_height),
                color.unwrap_or(def.default_color.as_str()),
            )
        });
        let instance = self.refuse_on_grid_error(result)?;
        self.settle().await?;
        Ok(instance)
    }

    /// Hides a widget.
    ///
    /// # Errors
    ///
    /// See [`DashboardSession::add`].
    pub async fn remove(&mut self, id: &str) -> SessionResult<()> {
        let result = self.grid.remove(id);
        self.refuse_on_grid_error(result)?;
        self.settle().await
    }

    /// Moves a placed widget to `index` among the visible widgets.
    ///
    /// # Errors
    ///
    /// See [`DashboardSession::add`].
    pub async fn move_to(&mut self, id: &str, index: usize) -> SessionResult<()> {
        let result = self.grid.move_to(id, index);
        self.refuse_on_grid_error(result)?;
        self.settle().await
    }

    /// Changes the span of a placed widget.
    ///
    /// # Errors
    ///
    /// See [`DashboardSession::add`].
    pub async fn resize(&mut self, id: &str, width: u32, height: u32) -> SessionResult<()> {
        let result = self.grid.resize(id, width, height);
        self.refuse_on_grid_error(result)?;
        self.settle().await
    }

    /// Changes the color of a placed widget.
    ///
    /// # Errors
    ///
    /// See [`DashboardSession::add`].
    pub async fn recolor(&mut self, id: &str, color: &str) -> SessionResult<()> {
        let result = self.grid.recolor(id, color);
        self.refuse_on_grid_error(result)?;
        self.settle().await
    }

    /// Deletes the stored override and shows the baseline.
    ///
    /// # Errors
    ///
    /// `Store` if the override could not be deleted; the grid is unchanged.
    pub async fn reset(&mut self) -> SessionResult<()> {
        match self.store.reset().await {
            Ok(baseline) => {
                self.show_document(&baseline);
                self.presenter.set_info("Layout reset to the baseline");
                Ok(())
            }
            Err(e) => {
                self.presenter.set_error(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Copies the displayed configuration to `sink`.
    ///
    /// # Errors
    ///
    /// Returns the clipboard error, which is also shown on the panel.
    pub fn copy(&mut self, sink: &mut dyn ClipboardSink) -> Result<String, ClipboardError> {
        self.presenter.copy(sink)
    }

    /// Canonical document of the live grid, per the defaults policy.
    pub fn current_document(&self) -> ConfigurationDocument {
        self.grid.current_document(self.policy)
    }

    /// `true` if the live grid equals the baseline.
    pub fn is_synced(&self) -> bool {
        let current = self.grid.current_document(DefaultsPolicy::Omit);
        self.store.is_default(&codec::normalize(&current, self.grid.registry()))
    }

    /// Visible widgets in grid order.
    pub fn visible(&self) -> Vec<&WidgetInstance> {
        self.grid.visible()
    }

    /// Widgets that can be added.
    pub fn selectable(&self) -> Vec<&WidgetDefinition> {
        self.grid.selectable()
    }

    /// Ids the baseline or the loaded document names that are not installed.
    pub fn unavailable(&self) -> &[String] {
        &self.unavailable
    }

    /// Current panel.
    pub fn view(&self) -> &PanelView {
        self.presenter.view()
    }

    /// The panel presenter, for status messages from the caller.
    pub fn presenter_mut(&mut self) -> &mut PanelPresenter {
        &mut self.presenter
    }

    /// The store.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// The project.
    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    /// Applies `document` without persisting. Used at load and reset.
    fn show_document(&mut self, document: &ConfigurationDocument) {
        let mut unavailable = self.baseline_unavailable.clone();
        for id in codec::unavailable_ids(document, self.grid.registry()) {
            if !unavailable.contains(&id) {
                unavailable.push(id);
            }
        }
        self.unavailable = unavailable;
        for id in &self.unavailable {
            tracing::info!("Configuration names unavailable widget '{}'", id);
        }
        self.grid.apply(document);
        self.grid.drain_events();
        self.render();
    }

    fn refuse_on_grid_error<T>(&mut self, result: portlet_grid::Result<T>) -> SessionResult<T> {
        result.map_err(|e| {
            self.grid.drain_events();
            self.presenter.set_error(e.to_string());
            SessionError::Grid(e)
        })
    }

    /// Persists and re-renders if the grid settled since the last call.
    async fn settle(&mut self) -> SessionResult<()> {
        let events = self.grid.drain_events();
        if !events.iter().any(|e| matches!(e, LayoutEvent::LayoutEnd)) {
            self.render();
            return Ok(());
        }

        let current = self.grid.current_document(self.policy);
        let result = if self.is_synced() {
            tracing::debug!("Layout equals the baseline, clearing the override");
            self.store.reset().await.map(|_| ())
        } else {
            self.store.save(&current).await
        };

        self.render();
        if let Err(e) = result {
            tracing::warn!("Persisting the layout failed: {}", e);
            self.presenter.set_error(e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    fn render(&mut self) {
        let current = self.grid.current_document(self.policy);
        let synced = self.is_synced();
        self.presenter
            .render(&current, self.store.baseline(), synced, &self.unavailable);
    }
}
