//! Comment widget embedding (utterances)
//!
//! The widget is a script element inside a comments container. Keeping it
//! in sync is a pure transition from the current embed to the desired one:
//! [`sync`] returns the operations to apply and the resulting state, and
//! [`CommentsBox::apply`] performs them on a container.

use crate::helpers::html_escape;

/// Script source of the widget
pub const UTTERANCES_SRC: &str = "https://utteranc.es/client.js";

/// Element id of the comments container
pub const CONTAINER_ID: &str = "commentsBox";

/// How the widget maps a page to a GitHub issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueMapping {
    /// `issue-term`: `pathname`, `url`, `title`, `og:title` or a literal term
    Term(String),
    /// `issue-number`: a fixed issue
    Number(u64),
}

impl Default for IssueMapping {
    fn default() -> Self {
        IssueMapping::Term("pathname".to_string())
    }
}

/// Widget configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetConfig {
    pub src: String,
    pub repo: String,
    pub theme: String,
    pub issue: IssueMapping,
    pub label: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            src: UTTERANCES_SRC.to_string(),
            repo: "Eduardo-H/galaxy-explorer-comments".to_string(),
            theme: "github-dark".to_string(),
            issue: IssueMapping::default(),
            label: None,
        }
    }
}

impl WidgetConfig {
    /// The script element this configuration embeds
    pub fn script(&self) -> ScriptElement {
        let mut attributes = vec![
            ("src".to_string(), self.src.clone()),
            ("crossorigin".to_string(), "anonymous".to_string()),
            ("async".to_string(), "true".to_string()),
            ("repo".to_string(), self.repo.clone()),
        ];

        match &self.issue {
            IssueMapping::Term(term) => attributes.push(("issue-term".to_string(), term.clone())),
            IssueMapping::Number(number) => {
                attributes.push(("issue-number".to_string(), number.to_string()))
            }
        }

        attributes.push(("theme".to_string(), self.theme.clone()));

        if let Some(label) = &self.label {
            attributes.push(("label".to_string(), label.clone()));
        }

        ScriptElement { attributes }
    }
}

/// A script element with ordered attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub attributes: Vec<(String, String)>,
}

impl ScriptElement {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn to_html(&self) -> String {
        let attributes: String = self
            .attributes
            .iter()
            .map(|(key, value)| format!(r#" {}="{}""#, key, html_escape(value)))
            .collect();
        format!("<script{}></script>", attributes)
    }
}

/// What should be embedded: a widget configuration for one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedTarget {
    pub config: WidgetConfig,
    pub page_path: String,
}

/// What is currently embedded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedState {
    current: Option<EmbedTarget>,
}

impl EmbedState {
    pub fn current(&self) -> Option<&EmbedTarget> {
        self.current.as_ref()
    }
}

/// A change to the comments container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedOp {
    /// Remove the widget currently embedded
    Remove,
    /// Insert a widget script
    Insert(ScriptElement),
}

/// Compute the operations that take a container holding `embedded` to
/// exactly one widget for `desired` (or none). Nothing is skipped unless
/// both the tracked state and the container already match.
pub fn sync(
    previous: &EmbedState,
    embedded: &[ScriptElement],
    desired: Option<&EmbedTarget>,
) -> (Vec<EmbedOp>, EmbedState) {
    let in_place = match desired {
        Some(target) => {
            previous.current.as_ref() == Some(target)
                && embedded.len() == 1
                && embedded[0] == target.config.script()
        }
        None => embedded.is_empty(),
    };
    if in_place {
        return (Vec::new(), previous.clone());
    }

    let mut ops = Vec::new();
    if !embedded.is_empty() {
        ops.push(EmbedOp::Remove);
    }
    if let Some(target) = desired {
        ops.push(EmbedOp::Insert(target.config.script()));
    }

    let state = EmbedState {
        current: desired.cloned(),
    };
    (ops, state)
}

/// The container the widget lives in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentsBox {
    scripts: Vec<ScriptElement>,
}

impl CommentsBox {
    pub fn scripts(&self) -> &[ScriptElement] {
        &self.scripts
    }

    pub fn apply(&mut self, ops: &[EmbedOp]) {
        for op in ops {
            match op {
                EmbedOp::Remove => self.scripts.clear(),
                EmbedOp::Insert(script) => self.scripts.push(script.clone()),
            }
        }
    }

    pub fn to_html(&self) -> String {
        let scripts: String = self.scripts.iter().map(ScriptElement::to_html).collect();
        format!(r#"<div id="{}">{}</div>"#, CONTAINER_ID, scripts)
    }
}

/// Keeps one container in sync across renders
#[derive(Debug, Default)]
pub struct CommentsWidget {
    state: EmbedState,
}

impl CommentsWidget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring `container` in line with `desired`. Without a container
    /// nothing happens and the state is left as it was.
    pub fn mount(&mut self, container: Option<&mut CommentsBox>, desired: Option<&EmbedTarget>) {
        let Some(container) = container else {
            tracing::debug!("No comments container, skipping widget");
            return;
        };

        let (ops, state) = sync(&self.state, container.scripts(), desired);
        container.apply(&ops);
        self.state = state;
    }

    pub fn state(&self) -> &EmbedState {
        &self.state
    }
}

/// Container markup for a page rendered from scratch
pub fn render(config: &WidgetConfig, page_path: &str) -> String {
    let target = EmbedTarget {
        config: config.clone(),
        page_path: page_path.to_string(),
    };
    let mut container = CommentsBox::default();
    CommentsWidget::new().mount(Some(&mut container), Some(&target));
    container.to_html()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(path: &str) -> EmbedTarget {
        EmbedTarget {
            config: WidgetConfig::default(),
            page_path: path.to_string(),
        }
    }

    #[test]
    fn test_script_attributes() {
        let script = WidgetConfig::default().script();
        assert_eq!(script.attribute("src"), Some(UTTERANCES_SRC));
        assert_eq!(script.attribute("repo"), Some("Eduardo-H/galaxy-explorer-comments"));
        assert_eq!(script.attribute("issue-term"), Some("pathname"));
        assert_eq!(script.attribute("theme"), Some("github-dark"));
        assert_eq!(script.attribute("crossorigin"), Some("anonymous"));
        assert_eq!(script.attribute("issue-number"), None);
        assert_eq!(script.attribute("label"), None);
    }

    #[test]
    fn test_issue_number_and_label() {
        let config = WidgetConfig {
            repo: "owner/repo".to_string(),
            issue: IssueMapping::Number(7),
            label: Some("comments".to_string()),
            ..Default::default()
        };
        let script = config.script();
        assert_eq!(script.attribute("issue-number"), Some("7"));
        assert_eq!(script.attribute("issue-term"), None);
        assert_eq!(script.attribute("label"), Some("comments"));
    }

    #[test]
    fn test_sync_from_empty_inserts() {
        let (ops, state) = sync(&EmbedState::default(), &[], Some(&target("/post/a/")));
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], EmbedOp::Insert(_)));
        assert_eq!(state.current(), Some(&target("/post/a/")));
    }

    #[test]
    fn test_sync_same_target_is_noop() {
        let mut container = CommentsBox::default();
        let (ops, state) = sync(&EmbedState::default(), &[], Some(&target("/post/a/")));
        container.apply(&ops);

        let (ops, again) = sync(&state, container.scripts(), Some(&target("/post/a/")));
        assert!(ops.is_empty());
        assert_eq!(again, state);
    }

    #[test]
    fn test_sync_removes_before_insert() {
        let mut container = CommentsBox::default();
        let (ops, state) = sync(&EmbedState::default(), &[], Some(&target("/post/a/")));
        container.apply(&ops);

        let (ops, _) = sync(&state, container.scripts(), Some(&target("/post/b/")));
        assert_eq!(ops[0], EmbedOp::Remove);
        assert!(matches!(ops[1], EmbedOp::Insert(_)));

        let (ops, state) = sync(&state, container.scripts(), None);
        assert_eq!(ops, vec![EmbedOp::Remove]);
        assert_eq!(state.current(), None);
    }

    #[test]
    fn test_same_target_in_rerendered_container() {
        let mut widget = CommentsWidget::new();
        let mut first = CommentsBox::default();
        widget.mount(Some(&mut first), Some(&target("/post/a/")));

        let mut rerendered = CommentsBox::default();
        widget.mount(Some(&mut rerendered), Some(&target("/post/a/")));
        assert_eq!(rerendered.scripts().len(), 1);
    }

    #[test]
    fn test_fresh_state_replaces_existing_widget() {
        let mut container = CommentsBox::default();
        CommentsWidget::new().mount(Some(&mut container), Some(&target("/post/a/")));

        let mut widget = CommentsWidget::new();
        widget.mount(Some(&mut container), Some(&target("/post/a/")));
        assert_eq!(container.scripts().len(), 1);
        assert_eq!(
            widget.state().current().map(|t| t.page_path.as_str()),
            Some("/post/a/")
        );
    }

    #[test]
    fn test_two_mounts_leave_one_widget() {
        let mut widget = CommentsWidget::new();
        let mut container = CommentsBox::default();

        widget.mount(Some(&mut container), Some(&target("/post/first/")));
        widget.mount(Some(&mut container), Some(&target("/post/second/")));

        assert_eq!(container.scripts().len(), 1);
        assert_eq!(
            widget.state().current().map(|t| t.page_path.as_str()),
            Some("/post/second/")
        );
    }

    #[test]
    fn test_mount_without_container() {
        let mut widget = CommentsWidget::new();
        widget.mount(None, Some(&target("/post/a/")));
        assert_eq!(widget.state().current(), None);
    }

    #[test]
    fn test_render() {
        let html = render(&WidgetConfig::default(), "/post/a/");
        assert!(html.starts_with(r#"<div id="commentsBox"><script src="https://utteranc.es/client.js""#));
        assert!(html.contains(r#"theme="github-dark""#));
        assert_eq!(html.matches("<script").count(), 1);
    }
}
