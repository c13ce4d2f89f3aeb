//! Queryable HTML documents
//!
//! A thin layer over `scraper` exposing only what the harvester needs: parse raw
//! markup, select nodes by CSS selector, read text and attributes, and remove nodes.
//!
//! `scraper::Html` is not `Send`, so a [`Document`] must never be held across an
//! `.await`. Callers parse, query, and drop it inside one synchronous stretch.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Errors raised by the document layer
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document is empty")]
    Empty,

    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

fn compile(selector: &str) -> Result<Selector, DocumentError> {
    Selector::parse(selector).map_err(|e| DocumentError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// A parsed HTML document
#[derive(Debug)]
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses raw markup
    ///
    /// html5ever recovers from any malformed input, so the only rejected document is
    /// one with no markup at all.
    pub fn parse(raw: &str) -> Result<Self, DocumentError> {
        if raw.trim().is_empty() {
            return Err(DocumentError::Empty);
        }

        Ok(Self {
            html: Html::parse_document(raw),
        })
    }

    /// Selects every element matching `selector`, in document order
    pub fn select(&self, selector: &str) -> Result<Vec<Node<'_>>, DocumentError> {
        let selector = compile(selector)?;
        Ok(self.html.select(&selector).map(Node::new).collect())
    }

    /// Removes every element matching `selector` and returns how many were removed
    pub fn remove(&mut self, selector: &str) -> Result<usize, DocumentError> {
        let selector = compile(selector)?;
        let ids: Vec<_> = self.html.select(&selector).map(|e| e.id()).collect();

        let mut removed = 0;
        for id in ids {
            if let Some(mut node) = self.html.tree.get_mut(id) {
                node.detach();
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// One element of a [`Document`]
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
}

impl<'a> Node<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Descendant text nodes joined by single spaces
    ///
    /// Useful where the markup separates values with `<br>` only.
    pub fn text_spaced(&self) -> String {
        self.element
            .text()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Attribute value, if present
    pub fn attr(&self, name: &str) -> Option<String> {
        self.element.value().attr(name).map(str::to_string)
    }

    /// Descendants matching `selector`, in document order
    pub fn select(&self, selector: &str) -> Result<Vec<Node<'a>>, DocumentError> {
        let selector = compile(selector)?;
        Ok(self.element.select(&selector).map(Node::new).collect())
    }

    /// The next sibling that is an element
    pub fn next_element(&self) -> Option<Node<'a>> {
        self.element
            .next_siblings()
            .find_map(ElementRef::wrap)
            .map(Node::new)
    }

    /// Direct element children
    pub fn children(&self) -> Vec<Node<'a>> {
        self.element
            .children()
            .filter_map(ElementRef::wrap)
            .map(Node::new)
            .collect()
    }

    /// Tag name, lowercase
    pub fn name(&self) -> &str {
        self.element.value().name()
    }

    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }
}
