use std::sync::Arc;

use mrfill_core_types::FieldKind;
use mrfill_dom_adapter::{DomPort, NodeHandle};
use mrfill_page_catalog::{profile, FieldProfile};
use tracing::debug;

use crate::errors::LocatorError;

pub struct FieldLocator {
    dom: Arc<dyn DomPort>,
}

impl FieldLocator {
    pub fn new(dom: Arc<dyn DomPort>) -> Self {
        Self { dom }
    }

    /// Resolve the form control for `kind` against the current DOM
    /// snapshot. No retries; the orchestrator's next pass is the retry.
    pub async fn locate(&self, kind: FieldKind) -> Result<Option<NodeHandle>, LocatorError> {
        let profile = profile(kind);
        for &selector in profile.control_selectors {
            let Some(node) = self.dom.query(None, selector).await? else {
                continue;
            };
            if self.confirm(&node, profile).await? {
                debug!(%kind, selector, "field control located");
                return Ok(Some(node));
            }
            debug!(%kind, selector, "candidate rejected by confirmation");
        }
        debug!(%kind, "no control found");
        Ok(None)
    }

    /// The disambiguation predicate: a candidate is accepted only with a
    /// stronger kind signal than the selector that matched it.
    async fn confirm(
        &self,
        node: &NodeHandle,
        profile: &FieldProfile,
    ) -> Result<bool, LocatorError> {
        if let Some(testid) = self.dom.attribute(node, "data-testid").await? {
            if profile.exact_testids.contains(&testid.as_str())
                || testid.contains(profile.testid_fragment)
            {
                return Ok(true);
            }
        }
        for container in profile.container_selectors {
            if self.dom.in_closest(node, container).await? {
                return Ok(true);
            }
        }
        let text = self.dom.text(node).await?.to_lowercase();
        if profile.keywords.iter().any(|k| text.contains(k)) {
            return Ok(true);
        }
        if let Some(placeholder) = self.dom.attribute(node, "placeholder").await? {
            let placeholder = placeholder.to_lowercase();
            if profile.keywords.iter().any(|k| placeholder.contains(k)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrfill_dom_adapter::FakePage;

    fn locator(page: &Arc<FakePage>) -> FieldLocator {
        FieldLocator::new(page.clone() as Arc<dyn DomPort>)
    }

    #[tokio::test]
    async fn tagged_candidate_wins_over_untagged_one() {
        let page = Arc::new(FakePage::new());
        // untagged element first in document order, matching a generic
        // assignee class
        page.element(None, "div", &[("class", "assignee-dropdown")], "");
        let tagged = page.element(
            None,
            "button",
            &[("data-testid", "assignee-dropdown"), ("class", "assignee-dropdown")],
            "",
        );

        let found = locator(&page).locate(FieldKind::Assignee).await.unwrap();
        assert_eq!(found, Some(tagged));
    }

    #[tokio::test]
    async fn reviewer_rejects_candidates_without_reviewer_signal() {
        let page = Arc::new(FakePage::new());
        // both match generic reviewer selectors but neither is
        // reviewer-tagged
        page.element(None, "div", &[("class", "reviewer-dropdown")], "");
        page.element(None, "div", &[("class", "reviewer-select")], "");

        let found = locator(&page).locate(FieldKind::Reviewer).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn container_ancestry_confirms_a_generic_match() {
        let page = Arc::new(FakePage::new());
        let holder = page.element(None, "div", &[("data-field-name", "assignee_ids")], "");
        let control = page.element(Some(holder), "div", &[("class", "assignee-dropdown")], "");

        let found = locator(&page).locate(FieldKind::Assignee).await.unwrap();
        assert_eq!(found, Some(control));
    }

    #[tokio::test]
    async fn visible_text_keyword_confirms_bilingually() {
        let page = Arc::new(FakePage::new());
        let toggle = page.element(
            None,
            "button",
            &[("class", "assignee-dropdown-toggle")],
            "Unassigned",
        );
        let found = locator(&page).locate(FieldKind::Assignee).await.unwrap();
        assert_eq!(found, Some(toggle));

        let page = Arc::new(FakePage::new());
        let input = page.element(
            None,
            "input",
            &[("class", "label-dropdown-input"), ("placeholder", "Hledat štítek")],
            "",
        );
        let found = locator(&page).locate(FieldKind::Label).await.unwrap();
        assert_eq!(found, Some(input));
    }

    #[tokio::test]
    async fn assignee_does_not_steal_the_reviewer_control() {
        let page = Arc::new(FakePage::new());
        let reviewer = page.element(None, "div", &[("class", "js-reviewer-search")], "");
        let assignee = page.element(None, "div", &[("class", "js-assignee-search")], "");

        let loc = locator(&page);
        assert_eq!(loc.locate(FieldKind::Assignee).await.unwrap(), Some(assignee));
        assert_eq!(loc.locate(FieldKind::Reviewer).await.unwrap(), Some(reviewer));
    }
}
