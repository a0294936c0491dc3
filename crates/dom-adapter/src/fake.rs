//! Scripted in-memory page.
//!
//! Test backend for [`DomPort`]: a small node tree with class/attribute
//! matching plus scripted effects, enough to imitate the GitLab form's
//! behavior (click a toggle and a popup gains its `show` class, type into a
//! search box and an option list filters). Every click and value write is
//! recorded so tests can assert that a pass performed zero interactions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::selector::{self, SimpleSelector};
use crate::{DomError, DomPort, NodeHandle};

/// Scripted reaction to a click or a value write.
#[derive(Clone, Debug)]
pub enum Effect {
    AddClass(NodeHandle, &'static str),
    RemoveClass(NodeHandle, &'static str),
    /// Hide children of the list whose visible text does not contain the
    /// written value (case-insensitive); an empty value shows all of them.
    FilterByValue(NodeHandle),
}

#[derive(Debug)]
struct FakeNode {
    tag: String,
    attrs: BTreeMap<String, String>,
    own_text: String,
    children: Vec<usize>,
    parent: Option<usize>,
    detached: bool,
    hidden: bool,
}

#[derive(Default)]
struct PageState {
    nodes: Vec<FakeNode>,
    roots: Vec<usize>,
    path: String,
    clicks: Vec<NodeHandle>,
    writes: Vec<(NodeHandle, String)>,
    click_effects: HashMap<usize, Vec<Effect>>,
    input_effects: HashMap<usize, Vec<Effect>>,
}

pub struct FakePage {
    state: Mutex<PageState>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PageState {
                path: "/".to_string(),
                ..PageState::default()
            }),
        }
    }

    pub fn set_path(&self, path: &str) {
        self.state.lock().unwrap().path = path.to_string();
    }

    /// Add an element; `parent: None` appends a document root.
    pub fn element(
        &self,
        parent: Option<NodeHandle>,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> NodeHandle {
        let mut state = self.state.lock().unwrap();
        let id = state.nodes.len();
        state.nodes.push(FakeNode {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            own_text: text.to_string(),
            children: Vec::new(),
            parent: parent.map(|p| p.0 as usize),
            detached: false,
            hidden: false,
        });
        match parent {
            Some(p) => state.nodes[p.0 as usize].children.push(id),
            None => state.roots.push(id),
        }
        NodeHandle(id as u64)
    }

    pub fn on_click(&self, node: NodeHandle, effect: Effect) {
        self.state
            .lock()
            .unwrap()
            .click_effects
            .entry(node.0 as usize)
            .or_default()
            .push(effect);
    }

    pub fn on_input(&self, node: NodeHandle, effect: Effect) {
        self.state
            .lock()
            .unwrap()
            .input_effects
            .entry(node.0 as usize)
            .or_default()
            .push(effect);
    }

    pub fn add_class(&self, node: NodeHandle, class: &str) {
        let mut state = self.state.lock().unwrap();
        add_class_inner(&mut state, node.0 as usize, class);
    }

    pub fn remove_class(&self, node: NodeHandle, class: &str) {
        let mut state = self.state.lock().unwrap();
        remove_class_inner(&mut state, node.0 as usize, class);
    }

    pub fn detach(&self, node: NodeHandle) {
        self.state.lock().unwrap().nodes[node.0 as usize].detached = true;
    }

    /// Clicks recorded so far, oldest first.
    pub fn click_log(&self) -> Vec<NodeHandle> {
        self.state.lock().unwrap().clicks.clone()
    }

    /// Value writes recorded so far, oldest first.
    pub fn write_log(&self) -> Vec<(NodeHandle, String)> {
        self.state.lock().unwrap().writes.clone()
    }

    /// Total interactions (clicks + value writes) performed on the page.
    pub fn interaction_count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.clicks.len() + state.writes.len()
    }

    pub fn value_of(&self, node: NodeHandle) -> Option<String> {
        self.state.lock().unwrap().nodes[node.0 as usize]
            .attrs
            .get("value")
            .cloned()
    }

    fn parse(&self, raw: &str) -> Result<SimpleSelector, DomError> {
        selector::parse(raw).map_err(DomError::Selector)
    }
}

fn add_class_inner(state: &mut PageState, idx: usize, class: &str) {
    let attrs = &mut state.nodes[idx].attrs;
    let current = attrs.get("class").cloned().unwrap_or_default();
    if !current.split_whitespace().any(|c| c == class) {
        let joined = if current.is_empty() {
            class.to_string()
        } else {
            format!("{current} {class}")
        };
        attrs.insert("class".to_string(), joined);
    }
}

fn remove_class_inner(state: &mut PageState, idx: usize, class: &str) {
    let attrs = &mut state.nodes[idx].attrs;
    if let Some(current) = attrs.get("class").cloned() {
        let kept: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
        attrs.insert("class".to_string(), kept.join(" "));
    }
}

fn apply_effect(state: &mut PageState, effect: &Effect, written: &str) {
    match effect {
        Effect::AddClass(node, class) => add_class_inner(state, node.0 as usize, class),
        Effect::RemoveClass(node, class) => remove_class_inner(state, node.0 as usize, class),
        Effect::FilterByValue(list) => {
            let needle = written.trim().to_lowercase();
            let children = state.nodes[list.0 as usize].children.clone();
            for child in children {
                let text = collect_text(state, child).to_lowercase();
                state.nodes[child].hidden = !needle.is_empty() && !text.contains(&needle);
            }
        }
    }
}

fn is_live(state: &PageState, idx: usize) -> bool {
    let mut cursor = Some(idx);
    while let Some(i) = cursor {
        let node = &state.nodes[i];
        if node.detached || node.hidden {
            return false;
        }
        cursor = node.parent;
    }
    true
}

fn collect_text(state: &PageState, idx: usize) -> String {
    let node = &state.nodes[idx];
    let mut parts = Vec::new();
    if !node.own_text.trim().is_empty() {
        parts.push(node.own_text.trim().to_string());
    }
    for &child in &node.children {
        let c = &state.nodes[child];
        if c.detached || c.hidden {
            continue;
        }
        let text = collect_text(state, child);
        if !text.is_empty() {
            parts.push(text);
        }
    }
    parts.join(" ")
}

fn node_matches(state: &PageState, idx: usize, sel: &SimpleSelector) -> bool {
    let node = &state.nodes[idx];
    selector::matches(sel, &node.tag, |name| node.attrs.get(name).cloned())
}

fn walk(state: &PageState, scope: Option<usize>, sel: &SimpleSelector, out: &mut Vec<usize>) {
    let starts: Vec<usize> = match scope {
        Some(idx) => state.nodes[idx].children.clone(),
        None => state.roots.clone(),
    };
    for idx in starts {
        let node = &state.nodes[idx];
        if node.detached || node.hidden {
            continue;
        }
        if node_matches(state, idx, sel) {
            out.push(idx);
        }
        walk(state, Some(idx), sel, out);
    }
}

#[async_trait]
impl DomPort for FakePage {
    async fn location_path(&self) -> Result<String, DomError> {
        Ok(self.state.lock().unwrap().path.clone())
    }

    async fn query(
        &self,
        scope: Option<&NodeHandle>,
        selector: &str,
    ) -> Result<Option<NodeHandle>, DomError> {
        Ok(self.query_all(scope, selector).await?.into_iter().next())
    }

    async fn query_all(
        &self,
        scope: Option<&NodeHandle>,
        selector: &str,
    ) -> Result<Vec<NodeHandle>, DomError> {
        let sel = self.parse(selector)?;
        let state = self.state.lock().unwrap();
        let scope_idx = match scope {
            Some(handle) => {
                let idx = handle.0 as usize;
                if idx >= state.nodes.len() || !is_live(&state, idx) {
                    // popup vanished mid-interaction; reads as no match
                    return Ok(Vec::new());
                }
                Some(idx)
            }
            None => None,
        };
        let mut out = Vec::new();
        walk(&state, scope_idx, &sel, &mut out);
        Ok(out.into_iter().map(|i| NodeHandle(i as u64)).collect())
    }

    async fn attribute(
        &self,
        node: &NodeHandle,
        name: &str,
    ) -> Result<Option<String>, DomError> {
        let state = self.state.lock().unwrap();
        let idx = node.0 as usize;
        if idx >= state.nodes.len() {
            return Err(DomError::Stale(*node));
        }
        Ok(state.nodes[idx].attrs.get(name).cloned())
    }

    async fn text(&self, node: &NodeHandle) -> Result<String, DomError> {
        let state = self.state.lock().unwrap();
        let idx = node.0 as usize;
        if idx >= state.nodes.len() {
            return Err(DomError::Stale(*node));
        }
        Ok(collect_text(&state, idx))
    }

    async fn in_closest(&self, node: &NodeHandle, selector: &str) -> Result<bool, DomError> {
        let sel = self.parse(selector)?;
        let state = self.state.lock().unwrap();
        let mut cursor = Some(node.0 as usize);
        while let Some(idx) = cursor {
            if idx >= state.nodes.len() {
                return Err(DomError::Stale(*node));
            }
            if node_matches(&state, idx, &sel) {
                return Ok(true);
            }
            cursor = state.nodes[idx].parent;
        }
        Ok(false)
    }

    async fn click(&self, node: &NodeHandle) -> Result<(), DomError> {
        let mut state = self.state.lock().unwrap();
        let idx = node.0 as usize;
        if idx >= state.nodes.len() || !is_live(&state, idx) {
            return Err(DomError::Stale(*node));
        }
        state.clicks.push(*node);
        let effects = state.click_effects.get(&idx).cloned().unwrap_or_default();
        for effect in &effects {
            apply_effect(&mut state, effect, "");
        }
        Ok(())
    }

    async fn set_value(&self, node: &NodeHandle, value: &str) -> Result<(), DomError> {
        let mut state = self.state.lock().unwrap();
        let idx = node.0 as usize;
        if idx >= state.nodes.len() || !is_live(&state, idx) {
            return Err(DomError::Stale(*node));
        }
        state.nodes[idx]
            .attrs
            .insert("value".to_string(), value.to_string());
        state.writes.push((*node, value.to_string()));
        let effects = state.input_effects.get(&idx).cloned().unwrap_or_default();
        for effect in &effects {
            apply_effect(&mut state, effect, value);
        }
        Ok(())
    }
}
