//! Post-page controller.
//!
//! Binds the edit and like buttons of a rendered feed page to handlers. The
//! document is reached through the [`Dom`] trait and the like endpoint through
//! [`LikeTransport`], so the same logic runs against [`MemoryDom`] in tests.
//! The inline script served by [`crate::ui`] follows the same contract.

use crate::models::LikeResponse;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use tracing::{error, info, warn};

pub const EDIT_CLASS: &str = "edit";
pub const LIKE_CLASS: &str = "like-button";
pub const EDIT_TARGET_ATTR: &str = "data-edit-target";
pub const CONTENT_TARGET_ATTR: &str = "data-content-target";
pub const LIKE_TARGET_ATTR: &str = "data-like-target";
pub const ACTION_ATTR: &str = "action-type";
pub const POST_ID_ATTR: &str = "post-id";
pub const HIDDEN_ATTR: &str = "hidden";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

pub trait Dom {
    fn element_by_id(&self, id: &str) -> Option<NodeId>;
    fn elements_by_class(&self, class: &str) -> Vec<NodeId>;
    fn id_of(&self, node: NodeId) -> Option<String>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);
    fn set_text(&mut self, node: NodeId, text: &str);
}

pub trait LikeTransport {
    /// Issues `GET /update-like/{action}/{post_id}` and decodes the body.
    fn fetch_like(
        &self,
        action: &str,
        post_id: u64,
    ) -> impl Future<Output = Result<LikeResponse, PageError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    MissingAttribute { attribute: &'static str },
    InvalidPostId(String),
    MissingElement(String),
    Transport(String),
    Status(u16),
    Decode(String),
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::MissingAttribute { attribute } => write!(f, "button has no '{attribute}' attribute"),
            PageError::InvalidPostId(raw) => write!(f, "'{raw}' is not a post id"),
            PageError::MissingElement(id) => write!(f, "no element with id '{id}'"),
            PageError::Transport(msg) => write!(f, "request failed: {msg}"),
            PageError::Status(code) => write!(f, "server answered {code}"),
            PageError::Decode(msg) => write!(f, "unreadable response: {msg}"),
        }
    }
}

impl std::error::Error for PageError {}

/// Reveals an item's edit form and hides its content block.
///
/// There is no way back: clicking again leaves the form visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditToggle {
    pub button: NodeId,
    pub form: NodeId,
    pub content: NodeId,
}

impl EditToggle {
    pub fn click(&self, dom: &mut impl Dom) {
        dom.remove_attribute(self.form, HIDDEN_ATTR);
        dom.set_attribute(self.content, HIDDEN_ATTR, "true");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    pub button: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    Updated { post_id: u64, likes: u64 },
    Unchanged,
    Failed(PageError),
}

impl LikeToggle {
    /// Sends the like request for this button and patches the counter.
    ///
    /// Failures are logged and reported in the outcome; the counter is only
    /// written after a successful response.
    pub async fn click(&self, dom: &mut impl Dom, transport: &impl LikeTransport) -> LikeOutcome {
        match self.try_click(dom, transport).await {
            Ok(Some((post_id, likes))) => LikeOutcome::Updated { post_id, likes },
            Ok(None) => LikeOutcome::Unchanged,
            Err(err) => {
                error!("like request failed: {err}");
                LikeOutcome::Failed(err)
            }
        }
    }

    async fn try_click(
        &self,
        dom: &mut impl Dom,
        transport: &impl LikeTransport,
    ) -> Result<Option<(u64, u64)>, PageError> {
        let action = dom
            .attribute(self.button, ACTION_ATTR)
            .ok_or(PageError::MissingAttribute { attribute: ACTION_ATTR })?;
        let raw_id = dom
            .attribute(self.button, POST_ID_ATTR)
            .ok_or(PageError::MissingAttribute { attribute: POST_ID_ATTR })?;
        let post_id = parse_post_id(&raw_id)?;

        let response = transport.fetch_like(&action, post_id).await?;
        let Some(likes) = response.likes else {
            info!(post_id, status = %response.status, "like response carried no count");
            return Ok(None);
        };

        let counter_id = dom
            .attribute(self.button, LIKE_TARGET_ATTR)
            .unwrap_or_else(|| format!("likeCount{post_id}"));
        let counter = dom
            .element_by_id(&counter_id)
            .ok_or(PageError::MissingElement(counter_id))?;
        dom.set_text(counter, &like_label(likes));
        Ok(Some((post_id, likes)))
    }
}

/// Reads a `post-id` attribute. Only a plain run of ASCII digits is a post
/// id; the page script applies the same rule before fetching.
pub fn parse_post_id(raw: &str) -> Result<u64, PageError> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PageError::InvalidPostId(raw.to_string()));
    }
    digits
        .parse()
        .map_err(|_| PageError::InvalidPostId(raw.to_string()))
}

pub fn like_label(likes: u64) -> String {
    format!("{likes} Likes")
}

#[derive(Debug, Clone, Default)]
pub struct PageController {
    pub edits: Vec<EditToggle>,
    pub likes: Vec<LikeToggle>,
}

impl PageController {
    /// Binds a handler to every edit and like button currently in `dom`.
    pub fn bind(dom: &impl Dom) -> Self {
        let edits = dom
            .elements_by_class(EDIT_CLASS)
            .into_iter()
            .filter_map(|button| bind_edit(dom, button))
            .collect::<Vec<_>>();
        let likes = dom
            .elements_by_class(LIKE_CLASS)
            .into_iter()
            .map(|button| LikeToggle { button })
            .collect::<Vec<_>>();
        info!(edits = edits.len(), likes = likes.len(), "page handlers bound");
        Self { edits, likes }
    }

    pub fn edit_for(&self, button: NodeId) -> Option<&EditToggle> {
        self.edits.iter().find(|toggle| toggle.button == button)
    }

    pub fn like_for(&self, button: NodeId) -> Option<LikeToggle> {
        self.likes.iter().copied().find(|toggle| toggle.button == button)
    }
}

fn bind_edit(dom: &impl Dom, button: NodeId) -> Option<EditToggle> {
    let suffix = dom.id_of(button).unwrap_or_default();
    let form_id = dom
        .attribute(button, EDIT_TARGET_ATTR)
        .unwrap_or_else(|| format!("edit{suffix}"));
    let content_id = dom
        .attribute(button, CONTENT_TARGET_ATTR)
        .unwrap_or_else(|| format!("content{suffix}"));

    match (dom.element_by_id(&form_id), dom.element_by_id(&content_id)) {
        (Some(form), Some(content)) => Some(EditToggle {
            button,
            form,
            content,
        }),
        _ => {
            warn!("edit button '{suffix}' has no '{form_id}'/'{content_id}' pair, skipping");
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// Flat in-memory document.
#[derive(Debug, Clone, Default)]
pub struct MemoryDom {
    elements: Vec<Element>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: Element) -> NodeId {
        self.elements.push(element);
        NodeId(self.elements.len() - 1)
    }

    pub fn get(&self, node: NodeId) -> &Element {
        &self.elements[node.0]
    }

    pub fn by_id(&self, id: &str) -> Option<&Element> {
        self.element_by_id(id).map(|node| self.get(node))
    }

    pub fn is_hidden(&self, id: &str) -> bool {
        self.by_id(id)
            .is_some_and(|element| element.attributes.contains_key(HIDDEN_ATTR))
    }

    pub fn text_of(&self, id: &str) -> Option<&str> {
        self.by_id(id).map(|element| element.text.as_str())
    }
}

impl Dom for MemoryDom {
    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements
            .iter()
            .position(|element| element.id.as_deref() == Some(id))
            .map(NodeId)
    }

    fn elements_by_class(&self, class: &str) -> Vec<NodeId> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, element)| element.classes.iter().any(|c| c == class))
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    fn id_of(&self, node: NodeId) -> Option<String> {
        self.elements.get(node.0).and_then(|element| element.id.clone())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.elements
            .get(node.0)
            .and_then(|element| element.attributes.get(name).cloned())
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.elements.get_mut(node.0) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(element) = self.elements.get_mut(node.0) {
            element.attributes.remove(name);
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(element) = self.elements.get_mut(node.0) {
            element.text = text.to_string();
        }
    }
}
