//! Scripted host events
//!
//! A script is a JSON array of [`HostEvent`]s replayed against the tree.
//! Host mutations queue notifications like the real host would; they are
//! delivered to the engine right after each event.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Mode, Settings, Theme};
use crate::dom::{Document, NodeId, Selector, markup};
use crate::engine::{Engine, Outcome};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// Render new markup under `parent`, before `before` if given
    Insert {
        parent: String,
        markup: String,
        #[serde(default)]
        before: Option<String>,
    },
    Remove {
        target: String,
    },
    SetAttribute {
        target: String,
        name: String,
        value: String,
    },
    RemoveAttribute {
        target: String,
        name: String,
    },
    SetText {
        target: String,
        text: String,
    },
    /// A notification with no visible change
    Notify,
    /// Let virtual time pass
    Wait {
        ms: u64,
    },
    /// User asked for a manual refresh
    Refresh,
    SwitchProfile {
        mode: Mode,
        theme: Theme,
    },
}

pub fn load_script(path: &Path) -> Result<Vec<HostEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event script {}", path.display()))?;
    let events = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse event script {}", path.display()))?;
    Ok(events)
}

fn find(tree: &dyn Document, selector: &str) -> Result<NodeId> {
    let parsed = Selector::parse(selector)?;
    tree.query(&parsed)
        .ok_or_else(|| anyhow!("No element matches '{selector}'"))
}

pub fn handle_event(
    engine: &mut Engine,
    tree: &mut dyn Document,
    settings: &Settings,
    event: HostEvent,
) -> Result<Vec<Outcome>> {
    debug!(event = ?event, "Host event");
    match event {
        HostEvent::Insert { parent, markup: source, before } => {
            let parent = find(tree, &parent)?;
            let reference = before.as_deref().map(|s| find(tree, s)).transpose()?;
            let parsed = markup::parse(&source)?;
            let node = markup::instantiate(tree, &parsed);
            tree.insert_before(parent, node, reference);
        }
        HostEvent::Remove { target } => {
            let node = find(tree, &target)?;
            tree.remove(node);
        }
        HostEvent::SetAttribute { target, name, value } => {
            let node = find(tree, &target)?;
            tree.set_attribute(node, &name, &value);
        }
        HostEvent::RemoveAttribute { target, name } => {
            let node = find(tree, &target)?;
            tree.remove_attribute(node, &name);
        }
        HostEvent::SetText { target, text } => {
            let node = find(tree, &target)?;
            tree.set_own_text(node, &text);
        }
        HostEvent::Notify => {
            if !tree.is_subscribed() {
                return Ok(Vec::new());
            }
            return Ok(vec![engine.on_notification(tree)]);
        }
        HostEvent::Wait { ms } => {
            let ran = engine.advance(tree, ms);
            if ran > 0 {
                debug!(ran, "Deferred retries ran");
            }
        }
        HostEvent::Refresh => {
            tree.take_notifications();
            return Ok(vec![engine.refresh(tree, None)]);
        }
        HostEvent::SwitchProfile { mode, theme } => {
            info!(mode = %mode, theme = %theme, "Switching profile");
            tree.take_notifications();
            let profile = settings.profile(mode, theme);
            return Ok(vec![engine.refresh(tree, Some(profile))]);
        }
    }
    Ok(engine.pump(tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryStore;
    use crate::constants::{attrs, ids};
    use crate::context::EngineLimits;
    use crate::dom::MemoryTree;
    use crate::engine::LoopState;

    fn setup() -> (Engine, MemoryTree, Settings) {
        let settings = Settings::from_store(&MemoryStore::with_defaults()).unwrap();
        let engine = Engine::new(settings.active_profile(), EngineLimits::from(&settings.global)).unwrap();
        let tree = MemoryTree::from_markup(include_str!("../demos/page.xml")).unwrap();
        (engine, tree, settings)
    }

    #[test]
    fn test_parse_script() {
        let script = r##"[
            {"event": "set_attribute", "target": "#chips-bar", "name": "hidden", "value": ""},
            {"event": "wait", "ms": 250},
            {"event": "switch_profile", "mode": "minimal", "theme": "dark"},
            {"event": "insert", "parent": "#popups", "markup": "<div role=\"tooltip\">Notifications</div>"}
        ]"##;
        let events: Vec<HostEvent> = serde_json::from_str(script).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[2],
            HostEvent::SwitchProfile {
                mode: Mode::Minimal,
                theme: Theme::Dark
            }
        );
        assert!(matches!(&events[3], HostEvent::Insert { before: None, .. }));
    }

    #[test]
    fn test_host_mutation_is_delivered() {
        let (mut engine, mut tree, settings) = setup();
        engine.start(&mut tree);

        let outcomes = handle_event(
            &mut engine,
            &mut tree,
            &settings,
            HostEvent::Insert {
                parent: "#popups".to_string(),
                markup: r#"<div role="tooltip">Notifications</div>"#.to_string(),
                before: None,
            },
        )
        .unwrap();
        assert_eq!(outcomes, vec![Outcome::NarrowUpdate]);
        let tip = tree.query(&Selector::parse("[data-retrofit-id=\"tooltip-1\"]").unwrap()).unwrap();
        assert_eq!(tree.text(tip), "NotificationsInbox");
    }

    #[test]
    fn test_marker_loss_triggers_full_pass() {
        let (mut engine, mut tree, settings) = setup();
        engine.start(&mut tree);

        let outcomes = handle_event(
            &mut engine,
            &mut tree,
            &settings,
            HostEvent::RemoveAttribute {
                target: "#masthead".to_string(),
                name: attrs::SUCCESS_MARKER.to_string(),
            },
        )
        .unwrap();
        assert_eq!(outcomes, vec![Outcome::FullPass]);
        assert_eq!(engine.state(), LoopState::Converged);
    }

    #[test]
    fn test_switch_profile_event() {
        let (mut engine, mut tree, settings) = setup();
        engine.start(&mut tree);

        let event = HostEvent::SwitchProfile {
            mode: Mode::Disabled,
            theme: Theme::Light,
        };
        assert_eq!(
            handle_event(&mut engine, &mut tree, &settings, event).unwrap(),
            vec![Outcome::Ignored]
        );
        assert!(tree.query(&Selector::id(ids::CONTEXT_HEADER)).is_none());
        assert!(engine.context().registry.is_empty());
        assert!(handle_event(&mut engine, &mut tree, &settings, HostEvent::Notify).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_target_is_an_error() {
        let (mut engine, mut tree, settings) = setup();
        let event = HostEvent::Remove {
            target: "#nowhere".to_string(),
        };
        let err = handle_event(&mut engine, &mut tree, &settings, event).unwrap_err();
        assert!(err.to_string().contains("#nowhere"));
    }
}
