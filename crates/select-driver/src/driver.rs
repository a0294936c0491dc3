use std::sync::Arc;

use mrfill_core_types::{FieldKind, SelectOutcome};
use mrfill_dom_adapter::{DomError, DomPort, NodeHandle};
use mrfill_page_catalog::{
    profile, FieldProfile, OPEN_POPUP_SELECTORS, SEARCH_BOX_SELECTORS, TOGGLE_TESTID_FRAGMENT,
};
use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::errors::SelectError;
use crate::policy::SelectPolicy;
use crate::wait;

/// How a control opens its popup.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InteractionMode {
    /// A click opens the popup.
    Toggle,
    /// Typing into the control opens/filters the popup.
    TextInput,
}

pub struct SelectDriver {
    dom: Arc<dyn DomPort>,
    policy: SelectPolicy,
}

impl SelectDriver {
    pub fn new(dom: Arc<dyn DomPort>, policy: SelectPolicy) -> Self {
        Self { dom, policy }
    }

    /// Drive one value into the field's popup via the full open flow.
    #[instrument(skip(self, control), fields(kind = %kind, value = target))]
    pub async fn select(
        &self,
        control: &NodeHandle,
        target: &str,
        kind: FieldKind,
    ) -> Result<SelectOutcome, SelectError> {
        let profile = profile(kind);
        let mode = self.interaction_mode(control, profile).await?;
        debug!(?mode, "opening popup");

        self.dom.click(control).await?;
        if mode == InteractionMode::TextInput {
            self.dom.set_value(control, target).await?;
        }

        let budget = match mode {
            InteractionMode::Toggle => self.policy.popup_budget,
            InteractionMode::TextInput => self.policy.popup_budget_typed,
        };
        let popup = wait::until(budget, self.policy.poll_interval, || async {
            self.resolve_popup(profile).await.ok().flatten()
        })
        .await;
        let Some(popup) = popup else {
            debug!("no popup appeared");
            return Ok(SelectOutcome::NotFound);
        };

        self.search_and_pick(&popup, target, profile).await
    }

    /// Drive the configured reviewers in order: the first through the full
    /// open flow, the rest through the popup that selection left open. If
    /// the host page closes the popup in between, the remaining reviewers
    /// read as not-found.
    pub async fn select_reviewers(
        &self,
        control: &NodeHandle,
        reviewers: &[String],
    ) -> Result<Vec<(String, SelectOutcome)>, SelectError> {
        let profile = profile(FieldKind::Reviewer);
        let mut outcomes = Vec::with_capacity(reviewers.len());
        for (index, name) in reviewers.iter().enumerate() {
            let outcome = if index == 0 {
                self.select(control, name, FieldKind::Reviewer).await?
            } else {
                self.select_in_open_popup(name, profile).await?
            };
            outcomes.push((name.clone(), outcome));
            sleep(self.policy.reviewer_gap).await;
        }
        Ok(outcomes)
    }

    /// Drive the configured labels in order, each through the full open
    /// flow, pausing between items for the host page to process the change.
    pub async fn select_labels(
        &self,
        control: &NodeHandle,
        labels: &[String],
    ) -> Result<Vec<(String, SelectOutcome)>, SelectError> {
        let mut outcomes = Vec::with_capacity(labels.len());
        for name in labels {
            let outcome = self.select(control, name, FieldKind::Label).await?;
            outcomes.push((name.clone(), outcome));
            sleep(self.policy.label_gap).await;
        }
        Ok(outcomes)
    }

    async fn select_in_open_popup(
        &self,
        target: &str,
        profile: &FieldProfile,
    ) -> Result<SelectOutcome, SelectError> {
        let Some(popup) = self.resolve_popup(profile).await? else {
            debug!(value = target, "popup no longer open, skipping");
            return Ok(SelectOutcome::NotFound);
        };
        if let Some(search) = self.find_search_box(&popup).await? {
            self.dom.set_value(&search, "").await?;
            sleep(self.policy.clear_gap).await;
        }
        self.search_and_pick(&popup, target, profile).await
    }

    /// Toggle when the test-id names a dropdown or the control carries a
    /// kind search class; a plain text input otherwise.
    async fn interaction_mode(
        &self,
        control: &NodeHandle,
        profile: &FieldProfile,
    ) -> Result<InteractionMode, SelectError> {
        if let Some(testid) = self.dom.attribute(control, "data-testid").await? {
            if testid.contains(TOGGLE_TESTID_FRAGMENT) {
                return Ok(InteractionMode::Toggle);
            }
        }
        let class = self.dom.attribute(control, "class").await?.unwrap_or_default();
        let classes: Vec<&str> = class.split_whitespace().collect();
        if profile.toggle_classes.iter().any(|c| classes.contains(c)) {
            return Ok(InteractionMode::Toggle);
        }
        Ok(InteractionMode::TextInput)
    }

    /// Kind-specific popup selectors first; otherwise scan every open
    /// generic popup for one containing the kind's marker elements.
    async fn resolve_popup(
        &self,
        profile: &FieldProfile,
    ) -> Result<Option<NodeHandle>, DomError> {
        for selector in profile.popup.direct_selectors {
            if let Some(popup) = self.dom.query(None, selector).await? {
                return Ok(Some(popup));
            }
        }
        for open_selector in OPEN_POPUP_SELECTORS {
            for popup in self.dom.query_all(None, open_selector).await? {
                for marker in profile.popup.marker_selectors {
                    if self.dom.query(Some(&popup), marker).await?.is_some() {
                        return Ok(Some(popup));
                    }
                }
            }
        }
        Ok(None)
    }

    async fn find_search_box(&self, popup: &NodeHandle) -> Result<Option<NodeHandle>, DomError> {
        for selector in SEARCH_BOX_SELECTORS {
            if let Some(node) = self.dom.query(Some(popup), selector).await? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    async fn search_and_pick(
        &self,
        popup: &NodeHandle,
        target: &str,
        profile: &FieldProfile,
    ) -> Result<SelectOutcome, SelectError> {
        if let Some(search) = self.find_search_box(popup).await? {
            self.dom.set_value(&search, target).await?;
            wait::until(self.policy.filter_budget, self.policy.poll_interval, || async {
                match self.matching_option(popup, target, profile).await {
                    Ok(Some(_)) => Some(()),
                    _ => None,
                }
            })
            .await;
        }

        match self.matching_option(popup, target, profile).await? {
            Some(option) => {
                self.dom.click(&option).await?;
                info!(value = target, kind = %profile.kind, "option committed, popup left open");
                Ok(SelectOutcome::Committed)
            }
            None => {
                debug!(value = target, kind = %profile.kind, "no option matched, clicking nothing");
                // leave the search box empty so a manual attempt starts clean
                if let Some(search) = self.find_search_box(popup).await? {
                    self.dom.set_value(&search, "").await?;
                }
                Ok(SelectOutcome::NotFound)
            }
        }
    }

    /// First option whose trimmed text contains the target
    /// case-insensitively. Options that vanish mid-enumeration are skipped.
    async fn matching_option(
        &self,
        popup: &NodeHandle,
        target: &str,
        profile: &FieldProfile,
    ) -> Result<Option<NodeHandle>, DomError> {
        let needle = target.trim().to_lowercase();
        for selector in profile.popup.option_selectors {
            for option in self.dom.query_all(Some(popup), selector).await? {
                let Ok(text) = self.dom.text(&option).await else {
                    continue;
                };
                let text = text.trim().to_lowercase();
                if !text.is_empty() && text.contains(&needle) {
                    return Ok(Some(option));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrfill_dom_adapter::{Effect, FakePage};

    struct UserField {
        page: Arc<FakePage>,
        control: NodeHandle,
        popup: NodeHandle,
        options: Vec<NodeHandle>,
        search: NodeHandle,
    }

    /// A reviewer-style field: toggle control, popup with a search box and
    /// a user-link option list, filtering wired to the search box.
    fn user_field(kind_class: &'static str, names: &[&str]) -> UserField {
        let page = Arc::new(FakePage::new());
        let control = page.element(None, "button", &[("class", kind_class)], "");
        let popup = page.element(None, "div", &[("class", "dropdown-menu")], "");
        let search = page.element(Some(popup), "input", &[("type", "search")], "");
        let list = page.element(Some(popup), "ul", &[], "");
        let options = names
            .iter()
            .map(|name| {
                page.element(Some(list), "li", &[("class", "dropdown-menu-user-link")], name)
            })
            .collect();
        page.on_click(control, Effect::AddClass(popup, "show"));
        page.on_input(search, Effect::FilterByValue(list));
        UserField {
            page,
            control,
            popup,
            options,
            search,
        }
    }

    fn driver(page: &Arc<FakePage>) -> SelectDriver {
        SelectDriver::new(page.clone() as Arc<dyn DomPort>, SelectPolicy::immediate())
    }

    #[tokio::test]
    async fn toggle_flow_commits_and_leaves_popup_open() {
        let f = user_field("js-assignee-search", &["Alice Smith", "Bob Jones"]);
        let outcome = driver(&f.page)
            .select(&f.control, "alice", FieldKind::Assignee)
            .await
            .unwrap();

        assert_eq!(outcome, SelectOutcome::Committed);
        assert_eq!(f.page.click_log(), vec![f.control, f.options[0]]);
        // popup deliberately not closed
        assert_eq!(
            f.page.query(None, ".dropdown-menu.show").await.unwrap(),
            Some(f.popup)
        );
    }

    #[tokio::test]
    async fn no_match_clicks_nothing_and_clears_the_search_box() {
        let f = user_field("js-assignee-search", &["Alice Smith", "Bob Jones"]);
        let outcome = driver(&f.page)
            .select(&f.control, "zed", FieldKind::Assignee)
            .await
            .unwrap();

        assert_eq!(outcome, SelectOutcome::NotFound);
        // only the toggle was clicked; no fallback option pick
        assert_eq!(f.page.click_log(), vec![f.control]);
        assert_eq!(f.page.value_of(f.search), Some(String::new()));
    }

    #[tokio::test]
    async fn text_input_mode_types_to_open() {
        let page = Arc::new(FakePage::new());
        let control = page.element(
            None,
            "input",
            &[("placeholder", "Search assignee"), ("class", "assignee-dropdown-input")],
            "",
        );
        let popup = page.element(None, "div", &[("class", "dropdown-menu")], "");
        let list = page.element(Some(popup), "ul", &[], "");
        let option = page.element(
            Some(list),
            "li",
            &[("class", "dropdown-item"), ("data-user-id", "7")],
            "Alice Smith",
        );
        page.element(
            Some(list),
            "li",
            &[("class", "dropdown-item"), ("data-user-id", "8")],
            "Bob Jones",
        );
        page.on_input(control, Effect::AddClass(popup, "show"));

        let outcome = driver(&page)
            .select(&control, "alice", FieldKind::Assignee)
            .await
            .unwrap();
        assert_eq!(outcome, SelectOutcome::Committed);
        assert_eq!(page.write_log()[0], (control, "alice".to_string()));
        assert_eq!(page.click_log(), vec![control, option]);
    }

    #[tokio::test]
    async fn reviewers_reuse_the_open_popup_in_configured_order() {
        let f = user_field(
            "js-reviewer-search",
            &["Alice Smith", "Bob Jones", "Carol White"],
        );
        let reviewers: Vec<String> =
            ["alice", "bob", "carol"].iter().map(|s| s.to_string()).collect();
        let outcomes = driver(&f.page)
            .select_reviewers(&f.control, &reviewers)
            .await
            .unwrap();

        assert!(outcomes.iter().all(|(_, o)| o.is_committed()));
        // exactly one toggle click, then one click per reviewer, in order
        assert_eq!(
            f.page.click_log(),
            vec![f.control, f.options[0], f.options[1], f.options[2]]
        );
    }

    #[tokio::test]
    async fn popup_closing_midway_degrades_remaining_reviewers_to_not_found() {
        let f = user_field("js-reviewer-search", &["Alice Smith", "Bob Jones"]);
        // host page closes the popup right after the first commit
        f.page.on_click(f.options[0], Effect::RemoveClass(f.popup, "show"));

        let reviewers: Vec<String> = ["alice", "bob"].iter().map(|s| s.to_string()).collect();
        let outcomes = driver(&f.page)
            .select_reviewers(&f.control, &reviewers)
            .await
            .unwrap();

        assert_eq!(outcomes[0].1, SelectOutcome::Committed);
        assert_eq!(outcomes[1].1, SelectOutcome::NotFound);
        assert_eq!(f.page.click_log(), vec![f.control, f.options[0]]);
    }

    #[tokio::test]
    async fn labels_run_the_full_flow_per_item() {
        let page = Arc::new(FakePage::new());
        let control = page.element(
            None,
            "button",
            &[("data-testid", "issuable-label-dropdown")],
            "Labels",
        );
        let popup = page.element(None, "div", &[("class", "dropdown-menu")], "");
        let list = page.element(Some(popup), "ul", &[], "");
        let bug = page.element(Some(list), "li", &[("data-testid", "labels-list")], "bug");
        let feature = page.element(Some(list), "li", &[("data-testid", "labels-list")], "feature");
        page.on_click(control, Effect::AddClass(popup, "show"));

        let labels: Vec<String> = ["bug", "feature"].iter().map(|s| s.to_string()).collect();
        let outcomes = driver(&page).select_labels(&control, &labels).await.unwrap();

        assert!(outcomes.iter().all(|(_, o)| o.is_committed()));
        assert_eq!(page.click_log(), vec![control, bug, control, feature]);
    }
}
