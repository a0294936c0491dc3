//! The versioned DOM contract with the GitLab merge-request form.
//!
//! Everything that couples mrfill to the host page's markup lives here as
//! ordered data: form-readiness signatures, per-field control selectors with
//! their confirmation vocabulary, and popup specs. The host UI is bilingual
//! (English and Czech), so the placeholder patterns and keyword lists carry
//! both languages. Orchestration code never hardcodes a selector; revising
//! this crate is how the tool tracks GitLab markup drift.

use mrfill_core_types::FieldKind;

/// Bumped whenever the tables change shape against a new GitLab release.
pub const CONTRACT_VERSION: &str = "gitlab-mr-form/1";

/// Path fragment identifying the merge-request creation route.
pub const TARGET_ROUTE_FRAGMENT: &str = "/merge_requests/new";

/// Structural signatures indicating the merge-request form has mounted,
/// in priority order.
pub const FORM_SIGNATURES: &[&str] = &[
    ".merge-request-form",
    "[data-testid=\"merge-request-form\"]",
    ".js-merge-request-form",
    ".new-merge-request",
    "[data-testid=\"new-merge-request\"]",
    ".merge-request-create-form",
];

/// Generic "some popup is open" selectors, used by the marker fallback scan.
pub const OPEN_POPUP_SELECTORS: &[&str] = &[".dropdown-menu.show", ".gl-dropdown-menu.show"];

/// Search-box candidates inside an open popup, in priority order.
pub const SEARCH_BOX_SELECTORS: &[&str] = &[
    "input[type=\"search\"]",
    "input[placeholder*=\"Search\" i]",
    ".dropdown-input-field",
];

/// Controls whose `data-testid` contains this fragment open a popup on
/// click rather than on typing.
pub const TOGGLE_TESTID_FRAGMENT: &str = "dropdown";

/// How to find and read the popup belonging to one field kind.
pub struct PopupSpec {
    /// Kind-specific popup selectors, tried before the marker fallback.
    pub direct_selectors: &'static [&'static str],
    /// Elements that identify a generic open popup as belonging to this
    /// kind (e.g. a user-link item, a label list).
    pub marker_selectors: &'static [&'static str],
    /// Option elements to enumerate inside the popup, in priority order.
    pub option_selectors: &'static [&'static str],
}

/// Everything needed to locate and drive one semantic field.
pub struct FieldProfile {
    pub kind: FieldKind,
    /// Ordered control-selector candidates; each raw match still has to
    /// pass the confirmation vocabulary below.
    pub control_selectors: &'static [&'static str],
    /// `data-testid` values that confirm the kind outright.
    pub exact_testids: &'static [&'static str],
    /// Substring of `data-testid` that confirms the kind.
    pub testid_fragment: &'static str,
    /// The element or an ancestor matching one of these confirms the kind.
    pub container_selectors: &'static [&'static str],
    /// Words in visible text or placeholder that confirm the kind
    /// (lowercase; English and Czech).
    pub keywords: &'static [&'static str],
    /// Class names marking the control as a click-to-open toggle.
    pub toggle_classes: &'static [&'static str],
    pub popup: PopupSpec,
}

const USER_OPTION_SELECTORS: &[&str] = &[
    ".dropdown-menu-user-link",
    ".dropdown-item",
    ".gl-dropdown-item",
    "[role=\"menuitem\"]",
];

const USER_MARKER_SELECTORS: &[&str] = &[".dropdown-menu-user-link", "[data-user-id]"];

static ASSIGNEE: FieldProfile = FieldProfile {
    kind: FieldKind::Assignee,
    control_selectors: &[
        "[data-testid=\"assignee-ids-dropdown-toggle\"]",
        ".js-assignee-search",
        "[data-testid=\"issuable-assignee-dropdown\"]",
        "[data-testid=\"assignee-dropdown\"]",
        "[data-testid=\"assignee-input\"]",
        ".assignee-dropdown",
        "input[name=\"assignee_ids[]\"]",
        ".assignee-dropdown-toggle",
        "[data-testid=\"assignee-select\"]",
        ".assignee-select",
        "input[placeholder*=\"assignee\" i]",
        "input[placeholder*=\"přiřadit\" i]",
        ".js-assignee-dropdown",
        ".assignee-dropdown-input",
    ],
    exact_testids: &["assignee-ids-dropdown-toggle"],
    testid_fragment: "assignee",
    container_selectors: &[".js-assignee-search", "[data-field-name*=\"assignee\"]"],
    keywords: &["assignee", "unassigned", "přiřadit"],
    toggle_classes: &["js-assignee-search", "js-user-search"],
    popup: PopupSpec {
        direct_selectors: &[".dropdown-menu-assignee.show", ".dropdown-menu-user.show"],
        marker_selectors: USER_MARKER_SELECTORS,
        option_selectors: USER_OPTION_SELECTORS,
    },
};

static REVIEWER: FieldProfile = FieldProfile {
    kind: FieldKind::Reviewer,
    control_selectors: &[
        ".js-reviewer-search",
        "[data-testid=\"issuable-reviewer-dropdown\"]",
        "[data-testid=\"reviewer-dropdown\"]",
        "[data-testid=\"reviewer-input\"]",
        ".reviewer-dropdown",
        "input[name=\"reviewer_ids[]\"]",
        ".reviewer-dropdown-toggle",
        "[data-testid=\"reviewer-select\"]",
        ".reviewer-select",
        "input[placeholder*=\"reviewer\" i]",
        "input[placeholder*=\"revizor\" i]",
        ".js-reviewer-dropdown",
        ".reviewer-dropdown-input",
    ],
    exact_testids: &[],
    testid_fragment: "reviewer",
    container_selectors: &[".js-reviewer-search", "[data-field-name*=\"reviewer\"]"],
    keywords: &["reviewer", "select reviewers", "revizor"],
    toggle_classes: &["js-reviewer-search", "js-user-search"],
    popup: PopupSpec {
        direct_selectors: &[".dropdown-menu-reviewer.show", ".dropdown-menu-user.show"],
        marker_selectors: USER_MARKER_SELECTORS,
        option_selectors: USER_OPTION_SELECTORS,
    },
};

static LABEL: FieldProfile = FieldProfile {
    kind: FieldKind::Label,
    control_selectors: &[
        "[data-testid=\"issuable-label-dropdown\"]",
        "[data-testid=\"sidebar-labels\"]",
        ".labels-select-wrapper",
        ".issuable-form-label-select-holder",
        ".js-label-select",
        "[data-testid=\"label-input\"]",
        ".label-dropdown",
        "input[name=\"label_ids[]\"]",
        ".label-dropdown-toggle",
        "[data-testid=\"label-select\"]",
        ".label-select",
        "input[placeholder*=\"label\" i]",
        "input[placeholder*=\"štítek\" i]",
        ".js-label-dropdown",
        ".label-dropdown-input",
        ".labels-select",
    ],
    exact_testids: &["issuable-label-dropdown"],
    testid_fragment: "label",
    container_selectors: &["[data-testid=\"sidebar-labels\"]", ".labels-select-wrapper"],
    keywords: &["label", "štítek"],
    toggle_classes: &[],
    popup: PopupSpec {
        direct_selectors: &["[data-testid=\"labels-select-dropdown-contents\"]"],
        marker_selectors: &["[data-testid=\"labels-list\"]", ".dropdown-label-box"],
        option_selectors: &[
            "[data-testid=\"labels-list\"]",
            ".dropdown-item",
            ".gl-dropdown-item",
        ],
    },
};

pub fn profile(kind: FieldKind) -> &'static FieldProfile {
    match kind {
        FieldKind::Assignee => &ASSIGNEE,
        FieldKind::Reviewer => &REVIEWER,
        FieldKind::Label => &LABEL,
    }
}

/// Every selector the catalogue carries, for contract tests.
pub fn all_selectors() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    out.extend(FORM_SIGNATURES);
    out.extend(OPEN_POPUP_SELECTORS);
    out.extend(SEARCH_BOX_SELECTORS);
    for kind in [FieldKind::Assignee, FieldKind::Reviewer, FieldKind::Label] {
        let p = profile(kind);
        out.extend(p.control_selectors);
        out.extend(p.container_selectors);
        out.extend(p.popup.direct_selectors);
        out.extend(p.popup.marker_selectors);
        out.extend(p.popup.option_selectors);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrfill_dom_adapter::{DomPort, FakePage};

    #[test]
    fn profiles_are_kind_consistent() {
        for kind in [FieldKind::Assignee, FieldKind::Reviewer, FieldKind::Label] {
            let p = profile(kind);
            assert_eq!(p.kind, kind);
            assert!(!p.control_selectors.is_empty());
            assert!(!p.keywords.is_empty());
            assert!(!p.popup.option_selectors.is_empty());
        }
    }

    #[test]
    fn strongest_selector_comes_first() {
        assert!(profile(FieldKind::Assignee).control_selectors[0].contains("data-testid"));
        assert_eq!(
            profile(FieldKind::Reviewer).control_selectors[0],
            ".js-reviewer-search"
        );
        assert!(profile(FieldKind::Label).control_selectors[0].contains("issuable-label-dropdown"));
    }

    #[tokio::test]
    async fn every_selector_is_executable() {
        // The fake page rejects selector syntax it cannot evaluate, so an
        // empty query against an empty document proves each entry parses.
        let page = FakePage::new();
        for selector in all_selectors() {
            let result = page.query(None, selector).await;
            assert!(result.is_ok(), "catalogue selector rejected: {selector}");
        }
    }
}
