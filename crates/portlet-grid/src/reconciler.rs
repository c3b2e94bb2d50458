//! Reconciler
//!
//! Owns the registry and a layout engine for one dashboard, applies
//! configuration documents onto the grid and performs the user-level
//! mutations (add, remove, move, resize, recolor).

use crate::codec;
use crate::error::{Error, Result};
use crate::layout::{LayoutEngine, LayoutEvent, WidgetInstance};
use crate::registry::WidgetRegistry;
use crate::types::{ConfigurationDocument, DefaultsPolicy, WidgetDefinition};

/// Applies documents to a grid and keeps its instances consistent with the
/// registry.
///
/// Invariants: every grid item references a registered definition, and at
/// most one item per id is active.
#[derive(Debug)]
pub struct Reconciler<E: LayoutEngine> {
    registry: WidgetRegistry,
    engine: E,
}

impl<E: LayoutEngine> Reconciler<E> {
    /// Seeds `engine` with one inactive instance per definition.
    ///
    /// Items already held by the engine that are not registered, or that
    /// repeat an id, are removed.
    pub fn new(registry: WidgetRegistry, mut engine: E) -> Self {
        let mut seen = Vec::new();
        let stale: Vec<String> = engine
            .items()
            .iter()
            .filter_map(|item| {
                if registry.contains(&item.id) && !seen.contains(&item.id) {
                    seen.push(item.id.clone());
                    None
                } else {
                    Some(item.id.clone())
                }
            })
            .collect();
        for id in stale {
            log::debug!("Removing unregistered grid item: {}", id);
            engine.remove_item(&id);
        }

        for def in registry.iter() {
            if engine.item(&def.id).is_none() {
                engine.add_item(WidgetInstance::inactive(def));
            }
        }

        Self { registry, engine }
    }

    /// The widget registry.
    pub fn registry(&self) -> &WidgetRegistry {
        &self.registry
    }

    /// The underlying layout engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access for gestures the engine performs on its own.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Takes pending layout notifications.
    pub fn drain_events(&mut self) -> Vec<LayoutEvent> {
        self.engine.drain_events()
    }

    /// Makes the grid show exactly the widgets named by `document`.
    ///
    /// Named widgets are styled from their entry (falling back to the
    /// definition defaults), activated and ordered first, in document
    /// order. Every other item keeps its relative order after them and
    /// stays hidden. Entries naming unknown widgets are skipped, as are
    /// repeated ids after the first.
    ///
    /// Returns the visible instances in order. Applying the same document
    /// twice yields the same grid.
    pub fn apply(&mut self, document: &ConfigurationDocument) -> Vec<WidgetInstance> {
        let all: Vec<String> = self.engine.items().iter().map(|i| i.id.clone()).collect();
        self.engine.hide_items(&all, true);

        let mut shown: Vec<String> = Vec::new();
        for entry in document {
            let Some(def) = self.registry.get(&entry.id) else {
                log::debug!("Skipping unavailable widget: {}", entry.id);
                continue;
            };
            if shown.contains(&entry.id) {
                log::debug!("Skipping repeated widget: {}", entry.id);
                continue;
            }

            let width = entry.width.unwrap_or(def.default_width);
            let height = entry.height.unwrap_or(def.default_height);
            let color = entry.color.as_deref().unwrap_or(&def.default_color);
            self.engine.set_style(&entry.id, width, height, color);
            shown.push(entry.id.clone());
        }

        let mut order = shown.clone();
        order.extend(all.into_iter().filter(|id| !shown.contains(id)));
        self.engine.sort_items(&order);
        self.engine.show_items(&shown);

        self.engine.visible().into_iter().cloned().collect()
    }

    /// Places a hidden widget on the grid with the given style.
    ///
    /// The widget keeps its current position among the grid items.
    ///
    /// # Errors
    ///
    /// - `Error::UnknownWidget` if the id is not registered
    /// - `Error::DuplicateWidget` if the widget is already active (the grid
    ///   is left unchanged)
    /// - `Error::InvalidSpan` if either span is zero
    pub fn add(&mut self, id: &str, width: u32, height: u32, color: &str) -> Result<WidgetInstance> {
        self.definition(id)?;
        if self.is_active(id) {
            return Err(Error::DuplicateWidget { id: id.to_string() });
        }
        check_span(id, width, height)?;

        self.engine.set_style(id, width, height, color);
        self.engine.show_items(&[id.to_string()]);
        self.instance(id)
    }

    /// Places a hidden widget using its definition defaults.
    ///
    /// # Errors
    ///
    /// Same as [`Reconciler::add`].
    pub fn add_with_defaults(&mut self, id: &str) -> Result<WidgetInstance> {
        let def = self.definition(id)?.clone();
        self.add(id, def.default_width, def.default_height, &def.default_color)
    }

    /// Hides a widget. Its definition stays registered so it can be added
    /// again. Removing a hidden widget does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownWidget` if the id is not registered.
    pub fn remove(&mut self, id: &str) -> Result<()> {
        self.definition(id)?;
        if self.is_active(id) {
            self.engine.hide_items(&[id.to_string()], false);
        }
        Ok(())
    }

    /// Moves an active widget to `index` among the visible widgets.
    ///
    /// # Errors
    ///
    /// `Error::UnknownWidget` or `Error::NotPlaced`.
    pub fn move_to(&mut self, id: &str, index: usize) -> Result<()> {
        self.placed(id)?;
        self.engine.move_item(id, index);
        Ok(())
    }

    /// Changes the span of an active widget.
    ///
    /// # Errors
    ///
    /// `Error::UnknownWidget`, `Error::NotPlaced` or `Error::InvalidSpan`.
    pub fn resize(&mut self, id: &str, width: u32, height: u32) -> Result<()> {
        let current = self.placed(id)?;
        check_span(id, width, height)?;
        self.engine.set_style(id, width, height, &current.color);
        Ok(())
    }

    /// Changes the color of an active widget.
    ///
    /// # Errors
    ///
    /// `Error::UnknownWidget` or `Error::NotPlaced`.
    pub fn recolor(&mut self, id: &str, color: &str) -> Result<()> {
        let current = self.placed(id)?;
        self.engine.set_style(id, current.width, current.height, color);
        Ok(())
    }

    /// Canonical document for the current grid.
    pub fn current_document(&self, policy: DefaultsPolicy) -> ConfigurationDocument {
        codec::serialize(self.engine.items(), &self.registry, policy)
    }

    /// Visible instances in grid order.
    pub fn visible(&self) -> Vec<&WidgetInstance> {
        self.engine.visible()
    }

    /// Registered widgets that can be added (not currently active), in
    /// registry order.
    pub fn selectable(&self) -> Vec<&WidgetDefinition> {
        self.registry.iter().filter(|d| !self.is_active(&d.id)).collect()
    }

    /// Returns `true` if the widget is on the grid.
    pub fn is_active(&self, id: &str) -> bool {
        self.engine.item(id).is_some_and(|i| i.active)
    }

    fn definition(&self, id: &str) -> Result<&WidgetDefinition> {
        self.registry
            .get(id)
            .ok_or_else(|| Error::UnknownWidget { id: id.to_string() })
    }

    fn instance(&self, id: &str) -> Result<WidgetInstance> {
        self.engine
            .item(id)
            .cloned()
            .ok_or_else(|| Error::UnknownWidget { id: id.to_string() })
    }

    fn placed(&self, id: &str) -> Result<WidgetInstance> {
        self.definition(id)?;
        let instance = self.instance(id)?;
        if !instance.active {
            return Err(Error::NotPlaced { id: id.to_string() });
        }
        Ok(instance)
    }
}

/// Stored documents only carry positive spans, so zero is refused here.
fn check_span(id: &str, width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidSpan {
            id: id.to_string(),
            width,
            height,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_document;
    use crate::layout::GridLayout;

    fn reconciler() -> Reconciler<GridLayout> {
        let registry = WidgetRegistry::new(vec![
            WidgetDefinition::new("A", 1, 1, "blue"),
            WidgetDefinition::new("B", 2, 1, "red"),
            WidgetDefinition::new("C", 1, 2, "white"),
        ]);
        let mut rec = Reconciler::new(registry, GridLayout::new());
        rec.drain_events();
        rec
    }

    fn visible_ids(rec: &Reconciler<GridLayout>) -> Vec<String> {
        rec.visible().iter().map(|i| i.id.clone()).collect()
    }

    #[test]
    fn test_new_seeds_inactive_instances() {
        let rec = reconciler();
        assert_eq!(rec.engine().items().len(), 3);
        assert!(rec.visible().is_empty());
        assert_eq!(rec.selectable().len(), 3);
    }

    #[test]
    fn test_new_drops_unregistered_engine_items() {
        let mut engine = GridLayout::new();
        engine.add_item(WidgetInstance {
            id: "ghost".to_string(),
            active: true,
            width: 1,
            height: 1,
            color: "white".to_string(),
        });
        let registry = WidgetRegistry::new(vec![WidgetDefinition::new("A", 1, 1, "blue")]);
        let rec = Reconciler::new(registry, engine);
        let ids: Vec<&str> = rec.engine().items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["A"]);
    }

    #[test]
    fn test_apply_orders_named_first() {
        let mut rec = reconciler();
        let doc = parse_document(r#"[{"id":"C"},{"id":"A","color":"green"}]"#).expect("valid");
        let visible = rec.apply(&doc);

        let ids: Vec<&str> = visible.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A"]);
        assert_eq!(visible[1].color, "green");

        let all: Vec<&str> = rec.engine().items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(all, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_apply_resets_previous_layout() {
        let mut rec = reconciler();
        rec.apply(&parse_document(r#"["A","B","C"]"#).expect("valid"));
        rec.apply(&parse_document(r#"["B"]"#).expect("valid"));
        assert_eq!(visible_ids(&rec), vec!["B"]);
    }

    #[test]
    fn test_apply_restores_defaults_for_omitted_fields() {
        let mut rec = reconciler();
        rec.apply(&parse_document(r#"[{"id":"B","width":4,"color":"green"}]"#).expect("valid"));
        rec.apply(&parse_document(r#"[{"id":"B"}]"#).expect("valid"));
        let b = rec.engine().item("B").expect("B exists");
        assert_eq!((b.width, b.height, b.color.as_str()), (2, 1, "red"));
    }

    #[test]
    fn test_apply_skips_repeated_ids() {
        let mut rec = reconciler();
        let visible = rec.apply(&parse_document(r#"[{"id":"A","width":2},{"id":"A","width":3}]"#).expect("valid"));
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].width, 2);
    }

    #[test]
    fn test_add_duplicate_leaves_grid_unchanged() {
        let mut rec = reconciler();
        rec.apply(&parse_document(r#"[{"id":"A","color":"green"}]"#).expect("valid"));
        rec.drain_events();
        let before = rec.engine().items().to_vec();

        let err = rec.add("A", 3, 3, "red").expect_err("A is already placed");
        assert_eq!(err, Error::DuplicateWidget { id: "A".to_string() });
        assert_eq!(rec.engine().items(), before.as_slice());
        assert!(rec.drain_events().is_empty());
    }

    #[test]
    fn test_add_unknown_widget() {
        let mut rec = reconciler();
        let err = rec.add_with_defaults("Z").expect_err("Z is not registered");
        assert_eq!(err, Error::UnknownWidget { id: "Z".to_string() });
    }

    #[test]
    fn test_add_then_remove_reenables_selection() {
        let mut rec = reconciler();
        let added = rec.add("B", 3, 2, "green").expect("B can be added");
        assert!(added.active);
        assert_eq!((added.width, added.height), (3, 2));
        assert!(!rec.selectable().iter().any(|d| d.id == "B"));

        rec.remove("B").expect("B can be removed");
        assert!(rec.visible().is_empty());
        assert!(rec.selectable().iter().any(|d| d.id == "B"));
        assert!(rec.registry().contains("B"));
    }

    #[test]
    fn test_remove_hidden_widget_is_noop() {
        let mut rec = reconciler();
        rec.remove("A").expect("removing hidden widget succeeds");
        assert!(rec.drain_events().is_empty());
    }

    #[test]
    fn test_move_resize_recolor() {
        let mut rec = reconciler();
        rec.apply(&parse_document(r#"["A","B","C"]"#).expect("valid"));
        rec.move_to("C", 0).expect("C is placed");
        rec.resize("A", 2, 2).expect("A is placed");
        rec.recolor("B", "orange").expect("B is placed");

        assert_eq!(
            rec.current_document(DefaultsPolicy::Omit).to_json(),
            r#"[{"id":"C"},{"id":"A","width":2,"height":2},{"id":"B","color":"orange"}]"#
        );
    }

    #[test]
    fn test_mutating_hidden_widget_fails() {
        let mut rec = reconciler();
        assert_eq!(
            rec.resize("A", 2, 2),
            Err(Error::NotPlaced { id: "A".to_string() })
        );
        assert_eq!(rec.move_to("Z", 0), Err(Error::UnknownWidget { id: "Z".to_string() }));
    }

    #[test]
    fn test_zero_span_is_refused() {
        let mut rec = reconciler();
        rec.apply(&parse_document(r#"["A"]"#).expect("valid"));
        rec.drain_events();

        let err = rec.add("B", 0, 1, "red").expect_err("zero width");
        assert!(matches!(err, Error::InvalidSpan { width: 0, height: 1, .. }));
        assert!(!rec.is_active("B"));

        assert!(matches!(rec.resize("A", 1, 0), Err(Error::InvalidSpan { .. })));
        assert_eq!(rec.visible()[0].height, 1);
        assert!(rec.drain_events().is_empty());
    }
}
